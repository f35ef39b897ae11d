use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info";

/// Filter from `RUST_LOG`, falling back to `default` when the variable is
/// unset and to the library default when it is not unicode.
fn get_env_filter(default: &str) -> EnvFilter {
    use std::env::{
        self,
        VarError::{NotPresent, NotUnicode},
    };
    match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::new(directives),
        Err(NotPresent) => EnvFilter::new(default),
        Err(NotUnicode(_)) => EnvFilter::default(),
    }
}

/// Installs a stderr logger. Returns false if a global subscriber was
/// already set, which makes repeated calls harmless.
pub fn setup_logger(ansi: bool) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(ansi)
                .with_writer(std::io::stderr)
                .with_filter(get_env_filter(DEFAULT_DIRECTIVES)),
        )
        .try_init()
        .is_ok()
}
