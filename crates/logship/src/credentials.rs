//! 🔐 Credentials: the FTP username and password, and the one place that
//! knows how to unwrap them.
//!
//! The secret store hands back either a string or a blob. The blob is base64
//! wrapped JSON. The string is plain JSON. Both end up as `FtpCredentials`
//! through exactly one `decode()` call, so nobody downstream ever has to ask
//! "wait, which shape was it?" 🦆
//!
//! ⚠️ `FtpCredentials` redacts its password in `Debug`. It is fetched fresh per
//! transfer and never written anywhere. Keep it that way.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::errors::JobError;

// -- 🏷️ the name that shows up in ExternalServiceError messages
pub(crate) const SECRET_STORE_SERVICE: &str = "secret store";

/// 📦 What the secret store gave us, before anyone tried to read it.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// 📝 `SecretString`: JSON, as-is.
    Text(String),
    /// 🧱 `SecretBinary`: base64 of JSON.
    Binary(Vec<u8>),
}

// 🙈 hand-rolled so a stray `{:?}` never prints a password
impl std::fmt::Debug for SecretPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretPayload::Text(s) => write!(f, "SecretPayload::Text(<{} chars>)", s.len()),
            SecretPayload::Binary(b) => write!(f, "SecretPayload::Binary(<{} bytes>)", b.len()),
        }
    }
}

impl SecretPayload {
    /// 🔓 The single decode step: unwrap the union, parse the JSON, hand back credentials.
    pub fn decode(&self) -> Result<FtpCredentials, JobError> {
        match self {
            SecretPayload::Text(json) => parse_credentials(json.as_bytes()),
            SecretPayload::Binary(encoded) => {
                let json = STANDARD.decode(encoded).map_err(|e| {
                    JobError::external(
                        SECRET_STORE_SERVICE,
                        "secret binary is not valid base64",
                        e,
                    )
                })?;
                parse_credentials(&json)
            }
        }
    }
}

fn parse_credentials(json: &[u8]) -> Result<FtpCredentials, JobError> {
    serde_json::from_slice(json).map_err(|e| {
        JobError::external(
            SECRET_STORE_SERVICE,
            "secret is not a JSON object with 'username' and 'password'",
            e,
        )
    })
}

/// 🔑 Who we are to the FTP server.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct FtpCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for FtpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THE_JSON: &str = r#"{"username":"exporter","password":"hunter2"}"#;

    #[test]
    fn the_one_where_a_plain_string_secret_decodes_straight_to_credentials() {
        let credentials = SecretPayload::Text(THE_JSON.to_string())
            .decode()
            .expect("💀 plain JSON secret should decode");

        assert_eq!(credentials.username, "exporter");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn the_one_where_the_binary_secret_is_unwrapped_from_base64_first() {
        let encoded = STANDARD.encode(THE_JSON);
        let credentials = SecretPayload::Binary(encoded.into_bytes())
            .decode()
            .expect("💀 base64 JSON secret should decode");

        assert_eq!(credentials.username, "exporter");
        assert_eq!(credentials.password, "hunter2");
    }

    #[test]
    fn the_one_where_garbage_binary_is_an_external_service_error() {
        let error = SecretPayload::Binary(b"%%% not base64 %%%".to_vec())
            .decode()
            .expect_err("💀 garbage decoded. alchemy achieved.");
        assert_eq!(error.error_type(), "ExternalServiceError");
    }

    #[test]
    fn the_one_where_json_without_a_password_is_rejected() {
        let error = SecretPayload::Text(r#"{"username":"exporter"}"#.to_string())
            .decode()
            .expect_err("💀 half a credential is not a credential");
        assert_eq!(error.error_type(), "ExternalServiceError");
        assert!(error.to_string().contains("secret store"));
    }

    #[test]
    fn the_one_where_debug_output_keeps_the_password_to_itself() {
        let credentials = SecretPayload::Text(THE_JSON.to_string())
            .decode()
            .expect("💀 plain JSON secret should decode");

        let debug = format!("{:?}", credentials);
        assert!(debug.contains("exporter"));
        assert!(!debug.contains("hunter2"));

        let payload_debug = format!("{:?}", SecretPayload::Text(THE_JSON.to_string()));
        assert!(!payload_debug.contains("hunter2"));
    }
}
