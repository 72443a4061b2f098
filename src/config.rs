use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::{WorkoutCache, WorkoutPage, WorkoutRecord};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Clone, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub data_dir: Option<PathBuf>,
}

/// Either a bare array of records or a page exported straight from the API.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Records(Vec<WorkoutRecord>),
    Page(WorkoutPage),
}

impl Config {
    pub fn load() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size = var("WORKOUTTERM_PAGE_SIZE")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        Config {
            api_url: var("WORKOUTTERM_API_URL").filter(|value| !value.is_empty()),
            api_token: var("WORKOUTTERM_API_TOKEN").filter(|value| !value.is_empty()),
            page_size,
            data_dir: var("WORKOUTTERM_DATA_DIR").map(PathBuf::from),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .context("Failed to get data directory")?
                .join("workoutterm"),
        };

        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("workoutterm.log"))
    }

    pub fn save_cache(&self, cache: &WorkoutCache) -> Result<()> {
        let path = self.data_dir()?.join("cache.json");
        let json = serde_json::to_string_pretty(cache)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_cache(&self) -> Result<WorkoutCache> {
        let path = self.data_dir()?.join("cache.json");
        let json = fs::read_to_string(&path)
            .with_context(|| format!("No cached workouts at {}", path.display()))?;
        let cache: WorkoutCache = serde_json::from_str(&json)?;
        Ok(cache)
    }

    pub fn load_records_file(path: &Path) -> Result<Vec<WorkoutRecord>> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: RecordsFile = serde_json::from_str(&json)
            .with_context(|| format!("{} is not a list of workouts", path.display()))?;

        Ok(match file {
            RecordsFile::Records(records) => records,
            RecordsFile::Page(page) => page.workouts,
        })
    }
}
