//! 📠 File Transporter: the export file's last trip, via FTP.
//!
//! 🎬 *[the file sits in /tmp, freshly written, blinking in the light]*
//! "Where am I going?" it asks. "`upload/`," says the transporter. "On a
//! protocol older than your parents' mortgage. Buckle up."
//!
//! 🧠 Knowledge graph:
//! - `transfer(path)`: file name → fresh credentials (secret store, decoded once)
//!   → blocking task: CONNECT, open local file, LOGIN, CWD upload, STOR <name>
//!   → QUIT on every exit path.
//! - The FTP session and the local file handle are both scoped: the file lives
//!   inside `run_session`, the session is quit by `upload` whatever happened.
//! - First error wins. A QUIT that fails afterwards is only logged, the same
//!   way the classic context-managed FTP clients swallow it.
//! - Credentials never get logged. `FtpCredentials` won't even `Debug` its password.

use std::path::Path;

use tracing::{info, warn};

use crate::app_config::AppConfig;
use crate::backends::{
    FtpConnector, FtpConnectorBackend, FtpSession, SecretStore, SecretStoreBackend,
};
use crate::credentials::{FtpCredentials, SECRET_STORE_SERVICE};
use crate::errors::JobError;

/// 📁 Every file lands here on the remote side. Not configurable. Never has been.
pub const UPLOAD_DIR: &str = "upload";

// -- 🏷️ the name that shows up in ExternalServiceError messages
const FTP_SERVICE: &str = "ftp";

/// 🧾 Proof of delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub remote_name: String,
    pub bytes: u64,
}

/// 📠 Resolves credentials and pushes one file to the FTP server.
#[derive(Debug)]
pub struct FileTransporter {
    secret_store: SecretStoreBackend,
    ftp: FtpConnectorBackend,
    ftp_host: String,
    ftp_port: u16,
    secret_name: String,
}

impl FileTransporter {
    pub fn new(
        secret_store: SecretStoreBackend,
        ftp: FtpConnectorBackend,
        config: &AppConfig,
    ) -> Self {
        Self {
            secret_store,
            ftp,
            ftp_host: config.ftp_host.clone(),
            ftp_port: config.ftp_port,
            secret_name: config.secret_name.clone(),
        }
    }

    /// 🚀 Upload `path` as `upload/<file name>`, binary mode.
    pub async fn transfer(&self, path: &Path) -> Result<TransferReceipt, JobError> {
        let remote_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                JobError::io(
                    format!("💀 '{}' has no usable file name to upload as", path.display()),
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
                )
            })?;

        let credentials = self.fetch_credentials().await?;

        let connector = self.ftp.clone();
        let host = self.ftp_host.clone();
        let port = self.ftp_port;
        let local_path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            upload(
                &connector,
                &host,
                port,
                &credentials,
                &local_path,
                &remote_name,
            )
        })
        .await
        .map_err(|e| JobError::external(FTP_SERVICE, "the blocking upload task died", e))?
    }

    /// 🔐 Fetched fresh every time. No caching, no reuse across transfers.
    async fn fetch_credentials(&self) -> Result<FtpCredentials, JobError> {
        self.secret_store
            .get_secret_value(&self.secret_name)
            .await
            .map_err(|e| {
                JobError::external(
                    SECRET_STORE_SERVICE,
                    format!("retrieving secret '{}'", self.secret_name),
                    e,
                )
            })?
            .decode()
    }
}

/// 📠 Connect, do the work, and QUIT no matter how the work went.
fn upload(
    connector: &dyn FtpConnector,
    host: &str,
    port: u16,
    credentials: &FtpCredentials,
    local_path: &Path,
    remote_name: &str,
) -> Result<TransferReceipt, JobError> {
    let mut session = connector.connect(host, port).map_err(|e| {
        JobError::external(FTP_SERVICE, format!("connecting to {}:{}", host, port), e)
    })?;

    let outcome = run_session(session.as_mut(), credentials, local_path, remote_name);

    if let Err(e) = session.quit() {
        warn!("⚠️ FTP QUIT to {}:{} failed, dropping the connection anyway: {:#}", host, port, e);
    }

    outcome.map(|bytes| TransferReceipt {
        remote_name: remote_name.to_string(),
        bytes,
    })
}

/// 📤 The part between hello and goodbye. The local file never outlives this call.
fn run_session(
    session: &mut dyn FtpSession,
    credentials: &FtpCredentials,
    local_path: &Path,
    remote_name: &str,
) -> Result<u64, JobError> {
    let mut file = std::fs::File::open(local_path).map_err(|e| {
        JobError::io(
            format!("💀 Could not open '{}' for upload", local_path.display()),
            e,
        )
    })?;

    session.login(credentials).map_err(|e| {
        JobError::external(
            FTP_SERVICE,
            format!("logging in as '{}'", credentials.username),
            e,
        )
    })?;
    session.cwd(UPLOAD_DIR).map_err(|e| {
        JobError::external(FTP_SERVICE, format!("changing directory to '{}'", UPLOAD_DIR), e)
    })?;

    info!("Transferring file: {}", remote_name);
    session
        .put_binary(remote_name, &mut file)
        .map_err(|e| JobError::external(FTP_SERVICE, format!("STOR {}", remote_name), e))
}
