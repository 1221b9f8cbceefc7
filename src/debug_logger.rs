use crate::config_utils::get_logs_dir;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReport {
    pub generated_at: String,
    pub app_version: String,
    pub base_url: Option<String>,
    pub error_count: usize,
    pub log_entries: Vec<DebugLogEntry>,
}

/// Forward one line to `tracing` at the matching level
pub fn emit(level: &str, message: &str, context: Option<&serde_json::Value>) {
    let context = context.map(|c| c.to_string()).unwrap_or_default();
    match level {
        "ERROR" | "FATAL" => tracing::error!(context = %context, "{}", message),
        "WARN" => tracing::warn!(context = %context, "{}", message),
        "DEBUG" => tracing::debug!(context = %context, "{}", message),
        _ => tracing::info!(context = %context, "{}", message),
    }
}

/// Log through `logger` when there is one, straight to `tracing` otherwise
pub fn record(
    logger: Option<&DebugLogger>,
    level: &str,
    message: String,
    context: Option<serde_json::Value>,
) {
    match logger {
        Some(logger) => logger.log(level, message, context),
        None => emit(level, &message, context.as_ref()),
    }
}

/// In-memory log of recent events, exportable as a JSON report.
///
/// Keeps the raw provider diagnostics (status, XML code, request id) that
/// the user-facing messages deliberately leave out.
pub struct DebugLogger {
    logs: Arc<Mutex<VecDeque<DebugLogEntry>>>,
    error_count: Arc<Mutex<usize>>,
}

impl DebugLogger {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_ENTRIES))),
            error_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn log(&self, level: &str, message: String, context: Option<serde_json::Value>) {
        emit(level, &message, context.as_ref());

        let entry = DebugLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            message,
            context,
        };

        if level == "ERROR" || level == "FATAL" {
            if let Ok(mut count) = self.error_count.lock() {
                *count += 1;
            }
        }

        if let Ok(mut logs) = self.logs.lock() {
            if logs.len() >= MAX_ENTRIES {
                logs.pop_front();
            }
            logs.push_back(entry);
        }
    }

    pub fn info(&self, message: String) {
        self.log("INFO", message, None);
    }

    pub fn warn(&self, message: String) {
        self.log("WARN", message, None);
    }

    pub fn error(&self, message: String) {
        self.log("ERROR", message, None);
    }

    pub fn debug(&self, message: String) {
        self.log("DEBUG", message, None);
    }

    pub fn get_error_count(&self) -> usize {
        *self.error_count.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entries(&self) -> Vec<DebugLogEntry> {
        self.logs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn generate_report(&self, base_url: Option<String>) -> DebugReport {
        DebugReport {
            generated_at: Utc::now().to_rfc3339(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            base_url,
            error_count: self.get_error_count(),
            log_entries: self.entries(),
        }
    }

    pub fn save_report_to_file(&self, base_url: Option<String>) -> Result<PathBuf, String> {
        let logs_dir = get_logs_dir()?;
        self.save_report_in(&logs_dir, base_url)
    }

    /// Write the report as `debug_log_<timestamp>.json` under `logs_dir`
    pub fn save_report_in(&self, logs_dir: &std::path::Path, base_url: Option<String>) -> Result<PathBuf, String> {
        let report = self.generate_report(base_url);

        fs::create_dir_all(logs_dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let log_path = logs_dir.join(format!("debug_log_{}.json", timestamp));

        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;

        let mut file = File::create(&log_path)
            .map_err(|e| format!("Failed to create log file: {}", e))?;

        file.write_all(json.as_bytes())
            .map_err(|e| format!("Failed to write to log file: {}", e))?;

        Ok(log_path)
    }
}

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}
