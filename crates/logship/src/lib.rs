//! 📦 logship: one day of CloudWatch logs, one flat file, one FTP upload.
//!
//! 🧠 Knowledge graph:
//! - `app_config`: env vars (and an optional TOML file) → `AppConfig`, required keys checked up front
//! - `dates`: `DD-MM-YYYY` validation, "yesterday", and the day's epoch-millisecond window
//! - `backends`: the log store, secret store and FTP seams, real and in-memory
//! - `exporter`: paginate the day's events into `{prefix}.{DDMMYYYY}`
//! - `credentials`: secret payload → FTP username/password
//! - `transporter`: STOR the file into `upload/`, QUIT on every path
//! - `job`: orchestration plus the always-200 boundary and its `ErrorRecord`
//! - `errors`: the `JobError` taxonomy
//!
//! 🦆

pub mod app_config;
pub mod backends;
pub mod credentials;
pub mod dates;
pub mod errors;
pub mod exporter;
pub mod job;
pub mod transporter;

pub use app_config::{AppConfig, load_config};
pub use errors::JobError;
pub use job::{
    Backends, ErrorRecord, InMemoryRecordSink, InvocationResult, Job, JobOutcome, JobPayload,
    RecordSink, TracingRecordSink, handle,
};
