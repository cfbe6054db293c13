use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use config::{Config, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "SCHEDULE";

/// Runtime settings, read from `SCHEDULE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub default_group: String,
    pub docx_path: Option<PathBuf>,
    pub docx_glob: Option<String>,
    /// Hours east of UTC used to decide what "today" is.
    pub utc_offset_hours: i32,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    fn load(env: Environment) -> Result<Self> {
        Config::builder()
            .set_default("db_path", "./schedule.db")?
            .set_default("default_group", "JFR-237")?
            .set_default("utc_offset_hours", 3)?
            .add_source(env.try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| anyhow!("UTC offset out of range: {}h", self.utc_offset_hours))
    }

    pub fn today(&self) -> Result<NaiveDate> {
        Ok(local_date(Utc::now(), self.offset()?))
    }
}

pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}
