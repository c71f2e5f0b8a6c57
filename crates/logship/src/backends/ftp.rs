//! 📠 FTP: the suppaftp-backed session.
//!
//! Plain FTP, control port, binary mode, one STOR. suppaftp's sync
//! `FtpStream` does the talking; the transporter runs us on a blocking thread
//! so the runtime never notices we're stuck waiting on a 1985 protocol.

use std::io::Read;

use anyhow::{Context, Result};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::debug;

use crate::backends::{FtpConnector, FtpSession};
use crate::credentials::FtpCredentials;

/// 🔌 Opens real FTP control connections.
#[derive(Debug, Clone, Default)]
pub struct SuppaFtpConnector;

impl FtpConnector for SuppaFtpConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn FtpSession>> {
        let stream = FtpStream::connect((host, port)).context(format!(
            "💀 Could not open an FTP control connection to {}:{}. \
             Is the host right? Is port {} open from here?",
            host, port, port
        ))?;
        debug!("📠 connected to {}:{}", host, port);
        Ok(Box::new(SuppaFtpSession { stream }))
    }
}

/// 📠 One live suppaftp session.
pub struct SuppaFtpSession {
    stream: FtpStream,
}

impl FtpSession for SuppaFtpSession {
    fn login(&mut self, credentials: &FtpCredentials) -> Result<()> {
        self.stream
            .login(credentials.username.as_str(), credentials.password.as_str())
            .context(format!(
                "💀 FTP login refused for user '{}'",
                credentials.username
            ))
    }

    fn cwd(&mut self, dir: &str) -> Result<()> {
        self.stream
            .cwd(dir)
            .context(format!("💀 FTP server would not let us into '{}'", dir))
    }

    fn put_binary(&mut self, remote_name: &str, mut reader: &mut dyn Read) -> Result<u64> {
        self.stream
            .transfer_type(FileType::Binary)
            .context("💀 FTP server refused binary mode")?;
        self.stream
            .put_file(remote_name, &mut reader)
            .context(format!("💀 STOR {} failed", remote_name))
    }

    fn quit(&mut self) -> Result<()> {
        self.stream.quit().context("💀 FTP QUIT failed")
    }
}
