//! Collaborators that consume a finished projection: chart rendering,
//! chat notification and the audit log.

pub mod audit;
pub mod chart;
pub mod message;

pub use audit::{
    AuditError, AuditRecord, AuditSink, CsvAuditLog, NullAuditLog, record_best_effort,
};
pub use chart::{ChartError, ChartSeries, downsample_indices, quickchart_url};
pub use message::{
    Delivery, LogNotifier, Notifier, NotifyError, PlanMessage, format_money, notify_plan,
};
