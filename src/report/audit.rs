use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{ProjectionInput, ProjectionResult};

pub const ANONYMOUS_RECIPIENT: &str = "anonymous";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audit log csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One audit row: what was asked and what came back, without the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub recorded_at: String,
    pub recipient: String,
    pub current_age: u32,
    pub retire_age: u32,
    pub monthly_basic_expense: f64,
    pub monthly_fun_expense: f64,
    pub monthly_saving: f64,
    pub current_saving: f64,
    pub total_need_basic: f64,
    pub total_need_with_fun: f64,
    pub total_fund: f64,
    pub gap: f64,
}

impl AuditRecord {
    pub fn new(
        recipient: Option<&str>,
        input: &ProjectionInput,
        result: &ProjectionResult,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let recipient = recipient
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(ANONYMOUS_RECIPIENT);

        Self {
            recorded_at: recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            recipient: recipient.to_string(),
            current_age: input.current_age,
            retire_age: input.retire_age,
            monthly_basic_expense: input.monthly_basic_expense,
            monthly_fun_expense: input.monthly_fun_expense,
            monthly_saving: input.monthly_saving,
            current_saving: input.current_saving,
            total_need_basic: result.total_need_basic,
            total_need_with_fun: result.total_need_with_fun,
            total_fund: result.total_fund,
            gap: result.gap,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditLog;

impl AuditSink for NullAuditLog {
    fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Append-only CSV file. The header row is written once, when the file is
/// created or found empty.
#[derive(Debug)]
pub struct CsvAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl AuditSink for CsvAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        debug!("audit row appended to {}", self.path.display());
        Ok(())
    }
}

/// Appends `record`, logging instead of returning any failure.
pub fn record_best_effort(sink: &dyn AuditSink, record: &AuditRecord) -> bool {
    match sink.append(record) {
        Ok(()) => true,
        Err(err) => {
            warn!("dropping audit record for {}: {err}", record.recipient);
            false
        }
    }
}
