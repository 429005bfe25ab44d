use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog::RouteCatalog;
use crate::error::Result;

/// Version of the offline copy format. Copies with another version are stale.
const OFFLINE_COPY_VERSION: u32 = 1;
const OFFLINE_COPY_PREFIX: &str = "routes-v";
const OFFLINE_COPY_SUFFIX: &str = ".yaml";

/// Anything that can produce the route catalog for a session.
#[async_trait]
pub trait RouteSource {
    async fn load(&self) -> Result<RouteCatalog>;
}

/// Timetable compiled into the binary.
pub struct Embedded;

#[async_trait]
impl RouteSource for Embedded {
    async fn load(&self) -> Result<RouteCatalog> {
        RouteCatalog::embedded()
    }
}

/// YAML or JSON file on disk.
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RouteSource for LocalFile {
    async fn load(&self) -> Result<RouteCatalog> {
        let content = fs::read_to_string(&self.path).await?;
        debug!(path = %self.path.display(), "Read route data");

        RouteCatalog::from_yaml(&content)
    }
}

/// Route data downloaded over HTTP. Every good download is kept in
/// `offline_dir` and used when the next download fails.
pub struct Remote {
    url: String,
    offline_dir: PathBuf,
}

impl Remote {
    pub fn new(url: impl Into<String>, offline_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            offline_dir: offline_dir.into(),
        }
    }

    pub fn offline_copy_path(&self) -> PathBuf {
        self.offline_dir.join(offline_copy_name(OFFLINE_COPY_VERSION))
    }

    async fn fetch(&self) -> Result<RouteCatalog> {
        info!(url = %self.url, "Downloading route data");
        let body = reqwest::get(&self.url)
            .await?
            .error_for_status()?
            .text()
            .await?;

        RouteCatalog::from_yaml(&body)
    }

    /// Writes the catalog as the current offline copy and drops older versions.
    async fn store(&self, catalog: &RouteCatalog) -> Result<()> {
        fs::create_dir_all(&self.offline_dir).await?;
        fs::write(self.offline_copy_path(), catalog.to_yaml()?).await?;

        let current = offline_copy_name(OFFLINE_COPY_VERSION);
        let mut entries = fs::read_dir(&self.offline_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_offline_copy(&name) && name != current {
                debug!(file = %name, "Removing stale offline copy");
                fs::remove_file(entry.path()).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl RouteSource for Remote {
    async fn load(&self) -> Result<RouteCatalog> {
        match self.fetch().await {
            Ok(catalog) => {
                if let Err(e) = self.store(&catalog).await {
                    warn!(error = %e, "Failed to store offline copy of route data");
                }

                Ok(catalog)
            }
            Err(e) => {
                let offline = self.offline_copy_path();
                if !offline.exists() {
                    return Err(e);
                }

                warn!(error = %e, path = %offline.display(), "Download failed, using offline copy");
                LocalFile::new(offline).load().await
            }
        }
    }
}

/// Picks a source for a `--data` value: URLs are downloaded, anything else is
/// read from disk. No value means the embedded timetable.
pub fn from_location(location: Option<&str>, offline_dir: &Path) -> Box<dyn RouteSource + Send + Sync> {
    match location {
        Some(url) if url.starts_with("http") => Box::new(Remote::new(url, offline_dir)),
        Some(path) => Box::new(LocalFile::new(path)),
        None => Box::new(Embedded),
    }
}

fn offline_copy_name(version: u32) -> String {
    format!("{}{}{}", OFFLINE_COPY_PREFIX, version, OFFLINE_COPY_SUFFIX)
}

fn is_offline_copy(name: &str) -> bool {
    name.strip_prefix(OFFLINE_COPY_PREFIX)
        .and_then(|rest| rest.strip_suffix(OFFLINE_COPY_SUFFIX))
        .map_or(false, |version| version.parse::<u32>().is_ok())
}
