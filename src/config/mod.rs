pub mod model;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

pub use model::AppConfig;

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crabdrop")
        .join("config.toml")
}

/// Load the config named on the command line, or the default one.
pub fn load_config(arg: Option<&str>) -> Result<AppConfig> {
    let path = match arg {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };
    if !path.exists() {
        bail!(
            "No config file at {} (pass a path as the first argument)",
            path.display()
        );
    }
    load_from(&path)
}

pub fn load_from(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"irc.example.com\"\nport = 7000").unwrap();

        let config = load_from(file.path()).unwrap();
        assert_eq!(config.server.host, "irc.example.com");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(missing.to_str()).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml =").unwrap();

        let err = load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
