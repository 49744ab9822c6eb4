//! CSV Persistence Module
//!
//! Writes realtime feed plans for operator review before anything is sent on
//! chain, and keeps an append-only history of past runs.

use anyhow::{Context, Result};
use chrono::Utc;
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::realtime_feed::FeedPlan;
use crate::types::FeedStatus;

pub const PLAN_FILE: &str = "realtime_feed_plan.csv";
pub const HISTORY_FILE: &str = "realtime_feed_history.csv";

/// One token row of a feed plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub timestamp: i64,
    pub network: String,
    pub symbol: String,
    pub status: String,
    pub token: String,
    pub feed_id: String,
    pub multiplier: String,
}

impl PlanRecord {
    fn from_status(timestamp: i64, network: &str, symbol: &str, status: &FeedStatus) -> Self {
        let (label, token, feed_id, multiplier) = match status {
            FeedStatus::NotConfigured => ("not_configured", String::new(), String::new(), String::new()),
            FeedStatus::AlreadyConfigured => {
                ("already_configured", String::new(), String::new(), String::new())
            }
            FeedStatus::Ready(update) => (
                "ready",
                format!("{:#x}", update.token),
                format!("{:#x}", update.feed_id),
                update.multiplier.to_string(),
            ),
        };

        Self {
            timestamp,
            network: network.to_string(),
            symbol: symbol.to_string(),
            status: label.to_string(),
            token,
            feed_id,
            multiplier,
        }
    }
}

pub fn plan_records(network: &str, plan: &FeedPlan) -> Vec<PlanRecord> {
    let timestamp = Utc::now().timestamp();
    plan.statuses
        .iter()
        .map(|(symbol, status)| PlanRecord::from_status(timestamp, network, symbol, status))
        .collect()
}

pub struct PlanStore {
    data_dir: PathBuf,
}

impl PlanStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        Ok(Self { data_dir })
    }

    /// Overwrite the current plan file and append to the run history.
    pub fn save(&self, network: &str, plan: &FeedPlan) -> Result<PathBuf> {
        let records = plan_records(network, plan);

        let path = self.data_dir.join(PLAN_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .context("Failed to create plan file")?;
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
        for record in &records {
            writer.serialize(record).context("Failed to write plan record")?;
        }
        writer.flush().context("Failed to flush plan writer")?;

        let mut history = Self::create_writer(&self.data_dir, HISTORY_FILE)?;
        for record in &records {
            history
                .serialize(record)
                .context("Failed to write history record")?;
        }
        history.flush().context("Failed to flush history writer")?;

        info!(
            path = %path.display(),
            rows = records.len(),
            "💾 Realtime feed plan saved"
        );
        Ok(path)
    }

    fn create_writer(dir: &Path, filename: &str) -> Result<csv::Writer<std::fs::File>> {
        let path = dir.join(filename);
        let file_has_data =
            path.exists() && fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open CSV file")?;

        Ok(WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file))
    }
}
