use std::path::Path;

use santa_models::SantaConfig;

use crate::error::RunnerError;

/// Read and parse a TOML configuration file. Omitted settings take their
/// defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<SantaConfig, RunnerError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    toml::from_str(&text).map_err(|e| RunnerError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
sqlite_path = "/tmp/league.db"

[environment]
episode_steps = 500
seed = 7
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database.sqlite_path, "/tmp/league.db");
        assert_eq!(config.environment.episode_steps, 500);
        assert_eq!(config.environment.seed, Some(7));
        assert_eq!(config.environment.bandit_count, 100);
        assert_eq!(config.rating.k_factor, 32.0);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/santa.toml");
        assert_eq!(load_config(path).unwrap(), SantaConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, RunnerError::Io(_)));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[environment]\nbandit_count = \"many\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }
}
