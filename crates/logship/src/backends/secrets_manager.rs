//! 🔐 Secrets Manager: `GetSecretValue`, and nothing else.
//!
//! The secret arrives as `SecretString` or `SecretBinary`. We don't open it
//! here, we just label the envelope (`SecretPayload::Text` / `::Binary`) and
//! let `credentials.rs` do the unwrapping. Fetched fresh on every call,
//! cached never. 🦆

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use tracing::debug;

use crate::backends::SecretStore;
use crate::credentials::SecretPayload;

/// 🔐 `SecretStore` backed by `aws-sdk-secretsmanager`.
#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn get_secret_value(&self, secret_id: &str) -> Result<SecretPayload> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .context(format!(
                "💀 GetSecretValue failed for secret '{}'. \
                 The vault stayed shut. Check the secret name and this role's permissions.",
                secret_id
            ))?;

        if let Some(text) = response.secret_string() {
            debug!("🔐 secret '{}' arrived as a string", secret_id);
            return Ok(SecretPayload::Text(text.to_string()));
        }
        if let Some(blob) = response.secret_binary() {
            debug!("🔐 secret '{}' arrived as binary", secret_id);
            return Ok(SecretPayload::Binary(blob.as_ref().to_vec()));
        }

        bail!(
            "💀 Secret '{}' has neither SecretString nor SecretBinary. An empty envelope.",
            secret_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_secretsmanager::config::{BehaviorVersion, Credentials, Region};
    use base64::{Engine, engine::general_purpose::STANDARD};
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> SecretsManagerStore {
        let config = aws_sdk_secretsmanager::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url(server.uri())
            .build();
        SecretsManagerStore::new(Client::from_conf(config))
    }

    async fn mount(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(header("x-amz-target", "secretsmanager.GetSecretValue"))
            .and(body_partial_json(serde_json::json!({ "SecretId": "ftp/creds" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-amz-json-1.1")
                    .set_body_json(body),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn the_one_where_the_secret_is_a_plain_string() {
        let server = MockServer::start().await;
        mount(
            &server,
            serde_json::json!({
                "Name": "ftp/creds",
                "SecretString": "{\"username\":\"exporter\",\"password\":\"hunter2\"}"
            }),
        )
        .await;

        let payload = store_for(&server)
            .get_secret_value("ftp/creds")
            .await
            .expect("💀 mocked Secrets Manager should answer");

        assert_eq!(
            payload,
            SecretPayload::Text(r#"{"username":"exporter","password":"hunter2"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn the_one_where_the_secret_is_binary_and_still_decodes_to_credentials() {
        let server = MockServer::start().await;
        let stored_bytes = STANDARD.encode(r#"{"username":"exporter","password":"hunter2"}"#);
        // -- 🧱 blobs travel base64'd on the wire; the SDK peels that layer off for us
        mount(
            &server,
            serde_json::json!({
                "Name": "ftp/creds",
                "SecretBinary": STANDARD.encode(&stored_bytes)
            }),
        )
        .await;

        let payload = store_for(&server)
            .get_secret_value("ftp/creds")
            .await
            .expect("💀 mocked Secrets Manager should answer");

        assert_eq!(payload, SecretPayload::Binary(stored_bytes.into_bytes()));
        let credentials = payload.decode().expect("💀 binary secret should decode");
        assert_eq!(credentials.username, "exporter");
    }

    #[tokio::test]
    async fn the_one_where_the_envelope_is_empty() {
        let server = MockServer::start().await;
        mount(&server, serde_json::json!({ "Name": "ftp/creds" })).await;

        let error = store_for(&server)
            .get_secret_value("ftp/creds")
            .await
            .expect_err("💀 an empty secret became credentials");

        assert!(error.to_string().contains("neither SecretString nor SecretBinary"));
    }
}
