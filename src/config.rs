use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};

const CONF_DIR: &str = "nextbus";
const CONF_FILE: &str = "config.yaml";

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Route id (or 1-based number) shown on startup. First route when unset.
    pub default_route: Option<String>,
    /// Path or URL of the route data. Embedded timetable when unset.
    pub data: Option<String>,
    #[serde(skip)]
    dir: PathBuf,
}

impl Config {
    /// Loads config from `path`, or from the user's config directory. A missing
    /// file is created with defaults.
    pub async fn new(path: Option<&Path>) -> Result<Self> {
        let conf_file_path = match path {
            Some(path) => absolute(path)?,
            None => Self::default_dir()?.join(CONF_FILE),
        };
        let dir = conf_file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut config: Self = if conf_file_path.exists() {
            let file_content = fs::read_to_string(&conf_file_path).await?;
            debug!(path = %conf_file_path.display(), "Loaded config");

            serde_yaml::from_str(&file_content)?
        } else {
            Self::create_conf_dir(&dir).await?;
            let config = Self::default();
            config.save(&conf_file_path).await?;
            info!(path = %conf_file_path.display(), "Created default config");

            config
        };
        config.dir = dir;

        Ok(config)
    }

    /// Directory holding the config file and the offline copy of remote data.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn default_dir() -> Result<PathBuf> {
        let mut dir = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        dir.push(CONF_DIR);

        Ok(dir)
    }

    async fn create_conf_dir(path: &Path) -> Result<()> {
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).await?;
        }

        Ok(())
    }

    /// Saves config (serialize) to config YAML file.
    async fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?).await?;

        Ok(())
    }
}

/// Anchors a relative path at the working directory, so its parent is a real
/// directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    Ok(std::env::current_dir()?.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nextbus-config-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn relative_path_gets_a_parent_dir() {
        let path = absolute(Path::new("config.yaml")).unwrap();

        assert!(path.is_absolute());
        assert_eq!(path.parent().unwrap(), std::env::current_dir().unwrap());
        assert!(!path.parent().unwrap().as_os_str().is_empty());

        let already = std::env::temp_dir().join(CONF_FILE);
        assert_eq!(absolute(&already).unwrap(), already);
    }

    #[tokio::test]
    async fn creates_default_config() {
        let dir = scratch_dir("create");
        let path = dir.join(CONF_FILE);

        let config = Config::new(Some(&path)).await.unwrap();

        assert!(path.exists());
        assert_eq!(config.default_route, None);
        assert_eq!(config.data, None);
        assert_eq!(config.dir(), dir.as_path());

        // Second run reads what the first one wrote.
        let again = Config::new(Some(&path)).await.unwrap();
        assert_eq!(again, config);
    }

    #[tokio::test]
    async fn reads_existing_config() {
        let dir = scratch_dir("read");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONF_FILE);
        std::fs::write(
            &path,
            "default_route: praiadomeio-planalto-wm\ndata: /tmp/routes.json\n",
        )
        .unwrap();

        let config = Config::new(Some(&path)).await.unwrap();

        assert_eq!(config.default_route.as_deref(), Some("praiadomeio-planalto-wm"));
        assert_eq!(config.data.as_deref(), Some("/tmp/routes.json"));
    }

    #[tokio::test]
    async fn partial_config_falls_back_to_defaults() {
        let dir = scratch_dir("partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONF_FILE);
        std::fs::write(&path, "default_route: \"2\"\n").unwrap();

        let config = Config::new(Some(&path)).await.unwrap();

        assert_eq!(config.default_route.as_deref(), Some("2"));
        assert_eq!(config.data, None);
    }
}
