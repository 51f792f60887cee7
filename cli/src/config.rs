use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use mealplan_core::service::PlannerService;

const DB_ENV: &str = "MEALPLAN_DB";

/// Where recipes and scheduled meals are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    File(PathBuf),
    Memory,
}

pub struct Config {
    pub storage: Storage,
}

impl Config {
    /// Resolve storage: `--ephemeral`, then `--db`, then `$MEALPLAN_DB`, then
    /// `mealplan.db` in the platform data directory.
    pub fn load(db_override: Option<PathBuf>, ephemeral: bool) -> Result<Self> {
        if ephemeral {
            return Ok(Config {
                storage: Storage::Memory,
            });
        }

        let from_env = std::env::var_os(DB_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        if let Some(path) = db_override.or(from_env) {
            return Ok(Config {
                storage: Storage::File(path),
            });
        }

        let proj_dirs =
            ProjectDirs::from("", "", "mealplan").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            storage: Storage::File(data_dir.join("mealplan.db")),
        })
    }

    pub fn open_service(&self) -> Result<PlannerService> {
        match &self.storage {
            Storage::File(path) => {
                tracing::debug!(path = %path.display(), "using database file");
                PlannerService::new(path)
            }
            Storage::Memory => {
                tracing::debug!("using in-memory store");
                PlannerService::new_in_memory()
            }
        }
    }
}
