use _cbmeta_core::settings::{ReadOnlySupport, DEFAULT_ERROR_REPORT_LIMIT};
use _cbmeta_core::{BatchRunner, ConfigError, Settings};
use std::io::Write;

#[test]
fn test_defaults() {
    let settings = Settings::default();
    assert_eq!(settings.workers, 1);
    assert_eq!(settings.error_report_limit, DEFAULT_ERROR_REPORT_LIMIT);
    assert_eq!(settings.read_only_support, ReadOnlySupport::Auto);
}

#[test]
fn test_yaml_overrides_defaults() -> anyhow::Result<()> {
    let settings = Settings::from_yaml_str("workers: 4\nread_only_support: off\n")?;
    assert_eq!(settings.workers, 4);
    assert_eq!(settings.error_report_limit, DEFAULT_ERROR_REPORT_LIMIT);
    assert_eq!(settings.read_only_support, ReadOnlySupport::Off);
    assert!(!settings.archives().read_only_available());

    assert_eq!(Settings::from_yaml_str("  \n")?, Settings::default());
    Ok(())
}

#[test]
fn test_invalid_settings_are_rejected() {
    let zero = Settings::from_yaml_str("workers: 0").unwrap_err();
    assert_eq!(
        zero.downcast_ref::<ConfigError>(),
        Some(&ConfigError::ZeroWorkers)
    );
    assert!(Settings::from_yaml_str("read_only_support: sometimes").is_err());
    assert!(Settings::from_yaml_str("workers: [1, 2]").is_err());

    let settings = Settings {
        workers: 0,
        ..Settings::default()
    };
    assert_eq!(
        BatchRunner::from_settings(&settings).unwrap_err(),
        ConfigError::ZeroWorkers
    );
}

#[test]
fn test_read_only_support_parses_case_insensitively() {
    assert_eq!("AUTO".parse::<ReadOnlySupport>(), Ok(ReadOnlySupport::Auto));
    assert_eq!(" off ".parse::<ReadOnlySupport>(), Ok(ReadOnlySupport::Off));
    assert_eq!(
        "never".parse::<ReadOnlySupport>(),
        Err(ConfigError::UnknownReadOnlySupport("never".to_string()))
    );
}

#[test]
fn test_load_from_file() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "error_report_limit: 10")?;
    let settings = Settings::load(file.path())?;
    assert_eq!(settings.error_report_limit, 10);
    assert_eq!(settings.workers, 1);

    assert!(Settings::load(&file.path().with_extension("missing")).is_err());
    Ok(())
}
