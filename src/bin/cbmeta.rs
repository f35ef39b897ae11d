use _cbmeta_core::batch::{APPLY_VERB, DELETE_VERB};
use _cbmeta_core::{
    library, logging, ArchiveHandle, BatchResult, BatchRunner, Field, FieldUpdate, PerFileUpdate,
    Sequence, Settings,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cbmeta")]
#[command(about = "Read and write ComicInfo.xml metadata in comic archives", long_about = None)]
struct Cli {
    /// YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Archives processed at once (overrides the settings file)
    #[arg(long, global = true)]
    workers: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metadata record of an archive as JSON
    Show { path: PathBuf },
    /// List the entries of an archive
    Entries { path: PathBuf },
    /// Merge fields into the metadata of every archive
    Apply(ApplyArgs),
    /// Remove the metadata entry from every archive
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the comic archives in a folder
    Scan { folder: PathBuf },
}

#[derive(Args)]
struct ApplyArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Field to write, as key=value; repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,
    /// Normalize values the way the editor form does
    #[arg(long)]
    form: bool,
    /// Number the archives in order, starting here
    #[arg(long)]
    number_from: Option<i64>,
    /// Field that receives the running number
    #[arg(long, default_value = "number")]
    number_field: String,
    /// Field that receives the number of archives in the batch
    #[arg(long, requires = "number_from")]
    count_field: Option<String>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_field(key: &str) -> Result<Field> {
    Ok(key.parse::<Field>()?)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(workers) = cli.workers {
        settings.workers = workers;
    }
    settings.validate()?;
    Ok(settings)
}

fn finish(result: &BatchResult, verb: &str) -> ExitCode {
    for (from, to) in result.renamed() {
        println!("{} -> {}", from.display(), to.display());
    }
    println!("{}", result.summary(verb));
    if result.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn apply(runner: &BatchRunner, args: ApplyArgs) -> Result<ExitCode> {
    let update = if args.form {
        FieldUpdate::from_form(args.set.iter().map(|(key, value)| (key, value)))
    } else {
        FieldUpdate::from_pairs(args.set)
    }?;
    let per_file: Option<Arc<dyn PerFileUpdate>> = match args.number_from {
        Some(start) => {
            let mut sequence = Sequence::new(parse_field(&args.number_field)?, start);
            if let Some(count_field) = &args.count_field {
                sequence = sequence.with_count(parse_field(count_field)?);
            }
            Some(Arc::new(sequence) as Arc<dyn PerFileUpdate>)
        }
        None => None,
    };
    let result = runner.apply_batch(&args.paths, update, per_file).await;
    Ok(finish(&result, APPLY_VERB))
}

fn handle(path: &Path) -> Result<ArchiveHandle> {
    ArchiveHandle::new(path).with_context(|| format!("cannot open {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::setup_logger(true);
    let settings = load_settings(&cli)?;
    let runner = BatchRunner::from_settings(&settings)?;
    let archives = runner.archives();

    match cli.command {
        Commands::Show { path } => {
            let record = archives
                .read_record(&handle(&path)?)
                .with_context(|| format!("failed to read {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Entries { path } => {
            let names = archives
                .list_entries(&handle(&path)?)
                .with_context(|| format!("failed to read {}", path.display()))?;
            for name in names {
                println!("{name}");
            }
        }
        Commands::Apply(args) => return apply(&runner, args).await,
        Commands::Delete { paths } => {
            let result = runner.delete_batch(&paths).await;
            return Ok(finish(&result, DELETE_VERB));
        }
        Commands::Scan { folder } => {
            for path in library::scan_folder(&folder, archives.read_only_available())? {
                println!("{}", path.display());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
