use std::fmt::Write;

use anyhow::{bail, Result};
use chrono::{
    format::{Item, StrftimeItems},
    Local, TimeZone,
};

/// Matches the `tr-TR` locale layout: `19.10.2026 14:05:09`.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// `HH:MM:SS`, whole seconds. Hours keep counting past 24.
pub fn format_duration(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Epoch milliseconds in local time. Falls back to the default layout if
/// `format` cannot be rendered.
pub fn format_timestamp(ms: i64, format: &str) -> String {
    let Some(local) = Local.timestamp_millis_opt(ms).single() else {
        return ms.to_string();
    };

    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_ok() {
        return out;
    }

    out.clear();
    match write!(out, "{}", local.format(DEFAULT_TIMESTAMP_FORMAT)) {
        Ok(()) => out,
        Err(_) => ms.to_string(),
    }
}

pub fn validate_timestamp_format(format: &str) -> Result<()> {
    if format.trim().is_empty() {
        bail!("timestamp format must not be empty");
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("'{format}' is not a valid strftime format");
    }
    Ok(())
}
