use log::{info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::chart::quickchart_url;
use crate::core::ProjectionResult;

pub const PLAN_ALT_TEXT: &str = "Your retirement plan projection is ready";

const CURRENCY_PREFIX: &str = "NT$";
const ACCENT_COLOR: &str = "#d97706";
const LABEL_COLOR: &str = "#8c7e6c";
const VALUE_COLOR: &str = "#4a4036";
const FUNDED_COLOR: &str = "#10b981";
const SHORTFALL_COLOR: &str = "#ef4444";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("push rejected for {recipient}: {reason}")]
    Rejected { recipient: String, reason: String },
}

/// A structured chat bubble: alt text for clients that cannot render it,
/// plus the bubble document itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanMessage {
    pub alt_text: String,
    pub contents: Value,
}

/// Formats whole currency units with thousands separators, e.g. `NT$ 1,234,567`.
pub fn format_money(value: f64) -> String {
    let units = value.round_ties_even() as i64;
    let digits = units.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if units < 0 { "-" } else { "" };
    format!("{CURRENCY_PREFIX} {sign}{grouped}")
}

fn summary_row(label: &str, value: String, margin: Option<&str>) -> Value {
    let mut row = json!({
        "type": "box",
        "layout": "horizontal",
        "contents": [
            { "type": "text", "text": label, "color": LABEL_COLOR, "size": "sm" },
            { "type": "text", "text": value, "align": "end", "weight": "bold", "color": VALUE_COLOR },
        ],
    });
    if let Some(margin) = margin {
        row["margin"] = json!(margin);
    }
    row
}

impl PlanMessage {
    pub fn build(result: &ProjectionResult, chart_url: &str) -> Self {
        let funded = result.gap <= 0.0;
        let (gap_text, gap_color) = if funded {
            ("Goal reached".to_string(), FUNDED_COLOR)
        } else {
            (format_money(result.gap), SHORTFALL_COLOR)
        };

        let contents = json!({
            "type": "bubble",
            "header": {
                "type": "box",
                "layout": "vertical",
                "contents": [{
                    "type": "text",
                    "text": "Retirement plan projection",
                    "weight": "bold",
                    "size": "xl",
                    "color": ACCENT_COLOR,
                }],
                "backgroundColor": "#fdfbf7",
            },
            "hero": {
                "type": "image",
                "url": chart_url,
                "size": "full",
                "aspectRatio": "3:2",
                "aspectMode": "cover",
            },
            "body": {
                "type": "box",
                "layout": "vertical",
                "contents": [
                    summary_row(
                        "Total need (incl. discretionary)",
                        format_money(result.total_need_with_fun),
                        None,
                    ),
                    summary_row("Total need (basic)", format_money(result.total_need_basic), Some("md")),
                    summary_row("Projected savings", format_money(result.total_fund), Some("md")),
                    { "type": "separator", "margin": "lg", "color": "#d1c7bc" },
                    {
                        "type": "box",
                        "layout": "horizontal",
                        "contents": [
                            {
                                "type": "text",
                                "text": "Funding gap (incl. discretionary)",
                                "color": LABEL_COLOR,
                                "size": "md",
                                "weight": "bold",
                            },
                            {
                                "type": "text",
                                "text": gap_text,
                                "align": "end",
                                "weight": "bold",
                                "color": gap_color,
                            },
                        ],
                        "margin": "lg",
                    },
                ],
                "backgroundColor": "#ffffff",
            },
        });

        Self {
            alt_text: PLAN_ALT_TEXT.to_string(),
            contents,
        }
    }
}

/// Delivery seam for plan messages; implementations talk to a chat vendor.
pub trait Notifier: Send + Sync {
    fn push(&self, recipient: &str, message: &PlanMessage) -> Result<(), NotifyError>;
}

/// Writes each message to the log instead of an external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn push(&self, recipient: &str, message: &PlanMessage) -> Result<(), NotifyError> {
        let body = serde_json::to_string(message)?;
        info!("plan message for {recipient}: {body}");
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    Skipped,
    Sent,
    Failed,
}

/// Renders the chart and pushes the plan summary to `recipient`.
///
/// Without a recipient nothing happens. Failures are logged, never returned.
pub fn notify_plan(
    notifier: &dyn Notifier,
    recipient: Option<&str>,
    result: &ProjectionResult,
) -> Delivery {
    let Some(recipient) = recipient.map(str::trim).filter(|r| !r.is_empty()) else {
        return Delivery::Skipped;
    };

    let chart_url = match quickchart_url(&result.history) {
        Ok(url) => url,
        Err(err) => {
            warn!("chart rendering failed for {recipient}: {err}");
            return Delivery::Failed;
        }
    };

    let message = PlanMessage::build(result, &chart_url);
    match notifier.push(recipient, &message) {
        Ok(()) => Delivery::Sent,
        Err(err) => {
            warn!("plan push failed: {err}");
            Delivery::Failed
        }
    }
}
