//! User configuration, loaded from the platform config directory.

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Directory output files are written to. Defaults to each source
    /// file's directory.
    pub output_dir: Option<PathBuf>,
    /// Shell command used to generate instructions when no --generator
    /// flag is given.
    pub generator: Option<String>,
    /// Data rows included in generator previews.
    pub sample_rows: Option<usize>,
}

impl Config {
    /// Load `config.toml` from the user config directory, if it exists.
    /// A missing file is the default config; a broken one is an error.
    pub fn load() -> anyhow::Result<Config> {
        let Some(path) = config_path() else {
            return Ok(Config::default());
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Ok(config)
    }
}

fn config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetflow")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
