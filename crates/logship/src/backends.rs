//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 The log store pours the events, the secret store coughs up a password,
//! the FTP server swallows the file. Three collaborators, three seams, and we
//! own none of them.
//!
//! 🎭 Same casting-agency pattern as always: a trait per seam, concrete
//! implementations behind it, and a backend enum that dispatches so the
//! exporter and transporter never learn whether they're talking to AWS or to
//! a `Vec` in RAM.
//!
//! 🧠 Knowledge graph:
//! - `LogSource` → `CloudWatchLogSource` | `InMemoryLogSource` → `LogSourceBackend`
//! - `SecretStore` → `SecretsManagerStore` | `InMemorySecretStore` → `SecretStoreBackend`
//! - `FtpConnector`/`FtpSession` → `SuppaFtpConnector` | `InMemoryFtpServer` → `FtpConnectorBackend`
//! - Log and secret seams are async (AWS SDK). The FTP seam is blocking (suppaftp
//!   sync client) and is driven from `spawn_blocking` by the transporter.
//! - Backends return `anyhow::Result`; the callers decide which `JobError` it becomes.
//!
//! 🦆 The duck is here because every file must have one. This is law.

use std::io::Read;

use anyhow::Result;
use async_trait::async_trait;

use crate::credentials::{FtpCredentials, SecretPayload};

pub mod cloudwatch;
pub mod ftp;
pub mod in_mem;
pub mod secrets_manager;

pub use cloudwatch::CloudWatchLogSource;
pub use ftp::SuppaFtpConnector;
pub use in_mem::{FtpCommand, InMemoryFtpServer, InMemoryLogSource, InMemorySecretStore};
pub use secrets_manager::SecretsManagerStore;

// ===== Log store =====

/// 🔍 One `FilterLogEvents` call's worth of question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub log_group: String,
    pub start_millis: i64,
    pub end_millis: i64,
    /// 🔖 `None` on the first call, the previous page's token after that
    pub next_token: Option<String>,
}

/// 📄 One page of answer. `next_token` present = there is more, ask again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub events: Vec<LogEvent>,
    pub next_token: Option<String>,
}

/// 📜 A log event, as far as the export file cares: its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
}

impl LogEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 🚰 A log store that answers one page per call.
///
/// # Contract 📜
/// - One call = one page. Pagination is the caller's loop, not ours.
/// - Pages come back in the store's native order. Nobody re-sorts anything.
/// - `Err(...)` is passed straight up. No retries live here.
#[async_trait]
pub trait LogSource: std::fmt::Debug {
    async fn filter_log_events(&self, query: &LogQuery) -> Result<LogPage>;
}

/// 🎭 The many faces of a log store.
#[derive(Debug)]
pub enum LogSourceBackend {
    CloudWatch(CloudWatchLogSource),
    InMemory(InMemoryLogSource),
}

#[async_trait]
impl LogSource for LogSourceBackend {
    async fn filter_log_events(&self, query: &LogQuery) -> Result<LogPage> {
        match self {
            LogSourceBackend::CloudWatch(cw) => cw.filter_log_events(query).await,
            LogSourceBackend::InMemory(i) => i.filter_log_events(query).await,
        }
    }
}

// ===== Secret store =====

/// 🔐 A secret store: identifier in, raw payload out. Decoding is `SecretPayload::decode`'s job.
#[async_trait]
pub trait SecretStore: std::fmt::Debug {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload>;
}

#[derive(Debug)]
pub enum SecretStoreBackend {
    SecretsManager(SecretsManagerStore),
    InMemory(InMemorySecretStore),
}

#[async_trait]
impl SecretStore for SecretStoreBackend {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload> {
        match self {
            SecretStoreBackend::SecretsManager(sm) => sm.get_secret_value(secret_id).await,
            SecretStoreBackend::InMemory(i) => i.get_secret_value(secret_id).await,
        }
    }
}

// ===== FTP =====

/// 📠 One open control connection. Blocking. Call `quit` when you're done, always.
pub trait FtpSession: Send {
    /// 🔑 `USER` + `PASS`
    fn login(&mut self, credentials: &FtpCredentials) -> Result<()>;
    /// 📁 `CWD <dir>`
    fn cwd(&mut self, dir: &str) -> Result<()>;
    /// 📤 `TYPE I` + `STOR <remote_name>`, streaming `reader`. Returns bytes sent.
    fn put_binary(&mut self, remote_name: &str, reader: &mut dyn Read) -> Result<u64>;
    /// 👋 `QUIT`. The session is gone afterwards either way.
    fn quit(&mut self) -> Result<()>;
}

/// 🔌 Opens sessions. Cheap to clone, moved into the blocking task.
pub trait FtpConnector: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn FtpSession>>;
}

#[derive(Debug, Clone)]
pub enum FtpConnectorBackend {
    Suppa(SuppaFtpConnector),
    InMemory(InMemoryFtpServer),
}

impl FtpConnector for FtpConnectorBackend {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn FtpSession>> {
        match self {
            FtpConnectorBackend::Suppa(s) => s.connect(host, port),
            FtpConnectorBackend::InMemory(i) => i.connect(host, port),
        }
    }
}
