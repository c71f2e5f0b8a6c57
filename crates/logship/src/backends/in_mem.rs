//! # Previously, on logship...
//!
//! 🎬 The logs were real. The FTP server was real. The AWS bill was very real.
//! And every test run wanted to talk to all three. Somebody had to stand in.
//!
//! `in_mem` provides stand-ins for all three collaborators:
//! - [`InMemoryLogSource`] replays scripted pages, in order, and remembers
//!   every query it was asked.
//! - [`InMemorySecretStore`] hands back one fixed payload (or refuses to).
//! - [`InMemoryFtpServer`] accepts sessions, writes down every command, keeps
//!   the uploaded bytes, and can be told to choke on a given verb.
//!
//! All three are `Clone` over an `Arc`'d ledger, so a test can hand one copy to
//! the pipeline and keep the other to peek inside afterwards. 🦆
//!
//! ⚠️ No network. No disk. Not for production. If you deploy this, also deploy a therapist.

use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::{Arc, PoisonError};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;

use crate::backends::{FtpConnector, FtpSession, LogPage, LogQuery, LogSource, SecretStore};
use crate::credentials::{FtpCredentials, SecretPayload};

// ===== Log store =====

#[derive(Debug, Default)]
struct LogScript {
    pages: VecDeque<Result<LogPage, String>>,
    queries: Vec<LogQuery>,
}

/// 📜 A log store that reads from a script.
///
/// Each call pops the next scripted page. Once the script runs out, every
/// further call gets an empty, token-less page.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogSource {
    script: Arc<tokio::sync::Mutex<LogScript>>,
}

impl InMemoryLogSource {
    pub fn new(pages: Vec<LogPage>) -> Self {
        Self {
            script: Arc::new(tokio::sync::Mutex::new(LogScript {
                pages: pages.into_iter().map(Ok).collect(),
                queries: Vec::new(),
            })),
        }
    }

    /// 💀 A log store whose very first answer is an error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Arc::new(tokio::sync::Mutex::new(LogScript {
                pages: VecDeque::from([Err(message.into())]),
                queries: Vec::new(),
            })),
        }
    }

    /// 🔍 Every query received so far, in order.
    pub async fn queries(&self) -> Vec<LogQuery> {
        self.script.lock().await.queries.clone()
    }
}

#[async_trait]
impl LogSource for InMemoryLogSource {
    async fn filter_log_events(&self, query: &LogQuery) -> Result<LogPage> {
        let mut script = self.script.lock().await;
        script.queries.push(query.clone());
        match script.pages.pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(LogPage::default()),
        }
    }
}

// ===== Secret store =====

/// 🔐 A secret store with exactly one secret in it. Or none, if built with `empty()`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    payload: Option<SecretPayload>,
    requests: Arc<tokio::sync::Mutex<Vec<String>>>,
}

impl InMemorySecretStore {
    pub fn new(payload: SecretPayload) -> Self {
        Self {
            payload: Some(payload),
            requests: Arc::default(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// 🔍 Every secret id asked for, in order. One per transfer, or something's caching.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload> {
        self.requests.lock().await.push(secret_id.to_string());
        self.payload
            .clone()
            .ok_or_else(|| anyhow!("ResourceNotFoundException: secret '{}' not found", secret_id))
    }
}

// ===== FTP =====

/// 📝 One line in the FTP server's diary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FtpCommand {
    Connect { host: String, port: u16 },
    Login { username: String },
    Cwd(String),
    Stor(String),
    Quit,
}

impl FtpCommand {
    /// 🏷️ The verb, for `failing_on`.
    pub fn verb(&self) -> &'static str {
        match self {
            FtpCommand::Connect { .. } => "CONNECT",
            FtpCommand::Login { .. } => "LOGIN",
            FtpCommand::Cwd(_) => "CWD",
            FtpCommand::Stor(_) => "STOR",
            FtpCommand::Quit => "QUIT",
        }
    }
}

#[derive(Debug, Default)]
struct FtpLedger {
    commands: Vec<FtpCommand>,
    stored: HashMap<String, Vec<u8>>,
    fail_on: Option<&'static str>,
}

impl FtpLedger {
    // -- 📝 write it down first, then decide whether to fail. the diary sees everything.
    fn record(&mut self, command: FtpCommand) -> Result<()> {
        let the_verb = command.verb();
        self.commands.push(command);
        if self.fail_on == Some(the_verb) {
            bail!("550 {} rejected by the in-memory server", the_verb);
        }
        Ok(())
    }
}

/// 📠 An FTP server made of a `Vec` and a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFtpServer {
    ledger: Arc<std::sync::Mutex<FtpLedger>>,
}

impl InMemoryFtpServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 💀 Make every command with this verb (`"LOGIN"`, `"CWD"`, `"STOR"`, ...) fail.
    pub fn failing_on(self, verb: &'static str) -> Self {
        self.lock().fail_on = Some(verb);
        self
    }

    /// 📝 Every command received, across every session, in order.
    pub fn commands(&self) -> Vec<FtpCommand> {
        self.lock().commands.clone()
    }

    /// 📂 Bytes stored at `dir/name`, if a STOR ever landed there.
    pub fn stored_file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().stored.get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FtpLedger> {
        // -- 🧪 a panicking test thread shouldn't take the diary down with it
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FtpConnector for InMemoryFtpServer {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn FtpSession>> {
        self.lock().record(FtpCommand::Connect {
            host: host.to_string(),
            port,
        })?;
        Ok(Box::new(InMemoryFtpSession {
            server: self.clone(),
            cwd: String::new(),
        }))
    }
}

struct InMemoryFtpSession {
    server: InMemoryFtpServer,
    cwd: String,
}

impl FtpSession for InMemoryFtpSession {
    fn login(&mut self, credentials: &FtpCredentials) -> Result<()> {
        self.server.lock().record(FtpCommand::Login {
            username: credentials.username.clone(),
        })
    }

    fn cwd(&mut self, dir: &str) -> Result<()> {
        self.server.lock().record(FtpCommand::Cwd(dir.to_string()))?;
        self.cwd = dir.to_string();
        Ok(())
    }

    fn put_binary(&mut self, remote_name: &str, reader: &mut dyn Read) -> Result<u64> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let mut the_ledger = self.server.lock();
        the_ledger.record(FtpCommand::Stor(remote_name.to_string()))?;
        let path = if self.cwd.is_empty() {
            remote_name.to_string()
        } else {
            format!("{}/{}", self.cwd, remote_name)
        };
        let len = bytes.len() as u64;
        the_ledger.stored.insert(path, bytes);
        Ok(len)
    }

    fn quit(&mut self) -> Result<()> {
        self.server.lock().record(FtpCommand::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::LogEvent;

    fn query(token: Option<&str>) -> LogQuery {
        LogQuery {
            log_group: "g".to_string(),
            start_millis: 0,
            end_millis: 86_399_000,
            next_token: token.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn the_one_where_the_script_is_read_in_order_then_goes_quiet() {
        let source = InMemoryLogSource::new(vec![
            LogPage {
                events: vec![LogEvent::new("a")],
                next_token: Some("t1".into()),
            },
            LogPage {
                events: vec![LogEvent::new("b")],
                next_token: None,
            },
        ]);

        let first = source.filter_log_events(&query(None)).await.expect("page 1");
        let second = source.filter_log_events(&query(Some("t1"))).await.expect("page 2");
        let third = source.filter_log_events(&query(None)).await.expect("page 3");

        assert_eq!(first.events, vec![LogEvent::new("a")]);
        assert_eq!(second.events, vec![LogEvent::new("b")]);
        assert_eq!(third, LogPage::default());
        assert_eq!(source.queries().await.len(), 3);
    }

    #[test]
    fn the_one_where_the_ftp_diary_records_everything_even_the_failure() {
        let server = InMemoryFtpServer::new().failing_on("CWD");
        let mut session = server.connect("ftp.example.com", 21).expect("connect");

        session
            .login(&FtpCredentials {
                username: "u".into(),
                password: "p".into(),
            })
            .expect("login");
        assert!(session.cwd("upload").is_err());
        session.quit().expect("quit");

        assert_eq!(
            server.commands(),
            vec![
                FtpCommand::Connect {
                    host: "ftp.example.com".into(),
                    port: 21
                },
                FtpCommand::Login { username: "u".into() },
                FtpCommand::Cwd("upload".into()),
                FtpCommand::Quit,
            ]
        );
    }

    #[test]
    fn the_one_where_stored_bytes_land_under_the_working_directory() {
        let server = InMemoryFtpServer::new();
        let mut session = server.connect("h", 21).expect("connect");
        session.cwd("upload").expect("cwd");

        let mut reader: &[u8] = b"line one\nline two\n";
        let sent = session
            .put_binary("app.01022024", &mut reader)
            .expect("stor");

        assert_eq!(sent, 18);
        assert_eq!(
            server.stored_file("upload/app.01022024").as_deref(),
            Some(&b"line one\nline two\n"[..])
        );
    }
}
