//! 💀 Errors: the four ways a day of logs can fail to reach the FTP server.
//!
//! 🎬 COLD OPEN. EXT. SCHEDULER, 00:05 AM
//!
//! The trigger fires. Nobody is watching. Nobody is ever watching.
//! The job either ships yesterday's logs or writes one structured sob story
//! into the log sink and returns 200 anyway. This module names the sob stories.
//!
//! 🧠 Knowledge graph:
//! - `JobError`: the taxonomy. Every component returns it, nobody catches it
//!   except `job::handle`, which turns it into an `ErrorRecord`.
//! - `error_type()`: the stable taxonomy name that lands in `errorType`.
//! - `cause_chain()`: outermost-first list of messages, lands in `stackTrace`.
//! - Opaque collaborator failures ride along as `anyhow::Error` sources,
//!   so the chain keeps whatever context the SDK gave us. 🦆

use thiserror::Error;

/// 🏷️ Everything that can go wrong between "the trigger fired" and "STOR succeeded".
#[derive(Debug, Error)]
pub enum JobError {
    /// 🔧 Required settings are missing. Raised before any external call.
    #[error("Mandatory environment variable(s) undefined: {}", .missing.join(", "))]
    MissingConfiguration { missing: Vec<String> },

    /// 🔧 A setting is present but unusable (bad port, bad timezone, unreadable TOML).
    #[error("{0}")]
    InvalidConfiguration(String),

    /// 📅 The date input is malformed or names a day that does not exist.
    #[error("{0}")]
    Validation(String),

    /// 📡 The log store, the secret store, or the FTP server said no.
    /// Transient or permanent, we make no distinction. Nobody retries.
    #[error("{service} call failed: {context}")]
    ExternalService {
        service: &'static str,
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// 💾 Local file trouble: the export file, or the file we tried to upload.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl JobError {
    /// 📡 Shorthand for wrapping a collaborator failure.
    pub(crate) fn external(
        service: &'static str,
        context: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::ExternalService {
            service,
            context: context.into(),
            source: source.into(),
        }
    }

    /// 💾 Shorthand for wrapping a local I/O failure.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 🏷️ The taxonomy name written to `errorType`.
    pub fn error_type(&self) -> &'static str {
        match self {
            JobError::MissingConfiguration { .. } | JobError::InvalidConfiguration(_) => {
                "ConfigurationError"
            }
            JobError::Validation(_) => "ValidationError",
            JobError::ExternalService { .. } => "ExternalServiceError",
            JobError::Io { .. } => "IOError",
        }
    }

    /// 🧅 Peel the onion: this error's message, then every source under it.
    /// Never empty, the outermost message is always first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = vec![format!("{}: {}", self.error_type(), self)];
        let mut next = std::error::Error::source(self);
        while let Some(cause) = next {
            chain.push(format!("caused by: {}", cause));
            next = cause.source();
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_missing_keys_are_all_named_not_just_the_first() {
        let error = JobError::MissingConfiguration {
            missing: vec!["FTP_HOST".to_string(), "SECRET_NAME".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Mandatory environment variable(s) undefined: FTP_HOST, SECRET_NAME"
        );
        assert_eq!(error.error_type(), "ConfigurationError");
    }

    #[test]
    fn the_one_where_every_variant_gets_its_taxonomy_name() {
        assert_eq!(
            JobError::InvalidConfiguration("nope".into()).error_type(),
            "ConfigurationError"
        );
        assert_eq!(JobError::Validation("nope".into()).error_type(), "ValidationError");
        assert_eq!(
            JobError::external("ftp", "login", anyhow::anyhow!("530")).error_type(),
            "ExternalServiceError"
        );
        assert_eq!(
            JobError::io("write", std::io::Error::other("disk full")).error_type(),
            "IOError"
        );
    }

    #[test]
    fn the_one_where_the_cause_chain_goes_all_the_way_down() {
        let root = anyhow::anyhow!("connection reset").context("STOR refused");
        let error = JobError::external("ftp", "upload of 'app.01022024'", root);

        let chain = error.cause_chain();

        assert_eq!(
            chain,
            vec![
                "ExternalServiceError: ftp call failed: upload of 'app.01022024'".to_string(),
                "caused by: STOR refused".to_string(),
                "caused by: connection reset".to_string(),
            ]
        );
    }

    #[test]
    fn the_one_where_a_lonely_error_still_has_a_stack() {
        let chain = JobError::Validation("bad date".into()).cause_chain();
        assert_eq!(chain, vec!["ValidationError: bad date".to_string()]);
    }
}
