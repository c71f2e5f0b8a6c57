//! 🎬 *[camera pans across a scheduler console at 00:05]*
//! 🎬 "In a world where every trigger must return 200..."
//! 🎬 "One job dared to fail quietly."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The Job module: the orchestrator, the one who takes the call.
//!
//! 🧠 Knowledge graph:
//! - `Job::run_at`: resolve date → export → (file? transfer) → `JobOutcome`.
//!   Returns `Result`, throws nothing, testable on its own.
//! - `handle`: the hosting boundary. Config result + payload result + a backend builder in,
//!   `InvocationResult { statusCode: 200 }` out. ALWAYS 200. Any `JobError` becomes
//!   exactly one `ErrorRecord`, handed to the injected `RecordSink`.
//! - `RecordSink`: where error records go. `TracingRecordSink` in production,
//!   `InMemoryRecordSink` when a test wants to count them.
//!
//! ⚠️ "Never fail the trigger." Failures are visible in the log sink and only there.

use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app_config::AppConfig;
use crate::backends::{FtpConnectorBackend, LogSourceBackend, SecretStoreBackend};
use crate::dates::{JobTimeZone, yesterday};
use crate::errors::JobError;
use crate::exporter::LogExporter;
use crate::transporter::{FileTransporter, TransferReceipt};

/// 📨 What the trigger sends. `date` absent = yesterday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobPayload {
    #[serde(default)]
    pub date: Option<String>,
}

impl JobPayload {
    pub fn with_date(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
        }
    }

    /// 📨 Parse the invocation JSON. A payload we can't read is a `Validation` error.
    pub fn from_json(json: &str) -> Result<Self, JobError> {
        serde_json::from_str(json).map_err(|e| {
            JobError::Validation(format!("Invocation payload is not usable: {}", e))
        })
    }
}

/// 📬 What the trigger gets back. Every time. No matter what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl InvocationResult {
    pub fn accepted() -> Self {
        Self { status_code: 200 }
    }
}

/// 🏁 How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// 🕳️ Zero events for the day. No file, no transfer.
    NoData { date: String },
    /// ✅ File written and STOR'd.
    Transferred {
        date: String,
        receipt: TransferReceipt,
    },
}

/// 📜 The structured error record written to the log sink on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub error_type: String,
    pub error_message: String,
    pub stack_trace: Vec<String>,
}

impl From<&JobError> for ErrorRecord {
    fn from(error: &JobError) -> Self {
        Self {
            error_type: error.error_type().to_string(),
            error_message: error.to_string(),
            stack_trace: error.cause_chain(),
        }
    }
}

impl ErrorRecord {
    pub fn to_json(&self) -> String {
        // -- 📜 three strings and a Vec of strings. serde_json cannot fail on this shape.
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"errorType\":\"{}\",\"errorMessage\":\"unserializable error\",\"stackTrace\":[]}}",
                self.error_type
            )
        })
    }
}

/// 🕳️ Where error records go to be read by humans, eventually, maybe.
pub trait RecordSink: Send + Sync {
    fn write(&self, record: &ErrorRecord);
}

/// 🍞 Error records as one JSON line at `error` level through tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecordSink;

impl RecordSink for TracingRecordSink {
    fn write(&self, record: &ErrorRecord) {
        error!("{}", record.to_json());
    }
}

/// 🧪 Error records kept in a `Vec`, for counting.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSink {
    records: Arc<std::sync::Mutex<Vec<ErrorRecord>>>,
}

impl InMemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecordSink for InMemoryRecordSink {
    fn write(&self, record: &ErrorRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// 🔌 The three collaborators, already built.
#[derive(Debug)]
pub struct Backends {
    pub log_source: LogSourceBackend,
    pub secret_store: SecretStoreBackend,
    pub ftp: FtpConnectorBackend,
}

/// 🚚 One configured export-and-ship pipeline.
#[derive(Debug)]
pub struct Job {
    exporter: LogExporter,
    transporter: FileTransporter,
    timezone: JobTimeZone,
}

impl Job {
    pub fn new(config: &AppConfig, backends: Backends) -> Self {
        Self {
            exporter: LogExporter::new(backends.log_source, config),
            transporter: FileTransporter::new(backends.secret_store, backends.ftp, config),
            timezone: config.timezone,
        }
    }

    /// 🚀 Run against the wall clock.
    pub async fn run(&self, payload: &JobPayload) -> Result<JobOutcome, JobError> {
        self.run_at(payload, Utc::now()).await
    }

    /// 🚀 Run as if it were `now`. `now` only matters when the payload has no date.
    pub async fn run_at(
        &self,
        payload: &JobPayload,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome, JobError> {
        let date = resolve_date(payload, now, self.timezone);

        let Some(export_path) = self.exporter.export(&date).await? else {
            info!("No data for given time period; processing complete");
            return Ok(JobOutcome::NoData { date });
        };

        let receipt = self.transporter.transfer(&export_path).await?;
        info!(
            "Data file transfer completed: {} ({} bytes)",
            receipt.remote_name, receipt.bytes
        );
        Ok(JobOutcome::Transferred { date, receipt })
    }
}

/// 📅 The payload's date verbatim, or yesterday in `zone`. Format is the exporter's problem.
pub fn resolve_date(payload: &JobPayload, now: DateTime<Utc>, zone: JobTimeZone) -> String {
    match &payload.date {
        Some(date) => {
            info!("Using date provided in parameter: '{}'", date);
            date.clone()
        }
        None => {
            let date = yesterday(now, zone);
            info!("Using yesterday's date: '{}'", date);
            date
        }
    }
}

/// 🛡️ The boundary: run everything, log any failure once, answer 200 regardless.
///
/// Config is checked first, then the payload. Only then is `build_backends`
/// called, so a broken invocation never touches the network. Whatever breaks
/// first becomes the one `ErrorRecord`.
pub async fn handle<B, F>(
    config: Result<AppConfig, JobError>,
    payload: Result<JobPayload, JobError>,
    build_backends: B,
    now: DateTime<Utc>,
    sink: &dyn RecordSink,
) -> InvocationResult
where
    B: FnOnce() -> F,
    F: Future<Output = Backends>,
{
    let outcome = async {
        let config = config?;
        let payload = payload?;
        let backends = build_backends().await;
        Job::new(&config, backends).run_at(&payload, now).await
    }
    .await;

    report(outcome, sink)
}

/// 📜 Turn a run's result into the fixed invocation answer, logging the failure if any.
pub fn report(result: Result<JobOutcome, JobError>, sink: &dyn RecordSink) -> InvocationResult {
    if let Err(e) = result {
        sink.write(&ErrorRecord::from(&e));
    }
    InvocationResult::accepted()
}
