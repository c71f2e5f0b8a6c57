//! 🚀 logship: the front door. The trigger knocks, we answer 200.
//!
//! 🎬 *[narrator voice]* "It all started with a scheduled event at 00:05..."
//! 📦 Thin binary: sets up logging, reads the invocation, wires the AWS
//! clients, and hands everything to `logship::handle`. Whatever happens in
//! there, stdout gets `{"statusCode":200}`. 🦆

use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use logship::backends::{
    CloudWatchLogSource, FtpConnectorBackend, LogSourceBackend, SecretStoreBackend,
    SecretsManagerStore, SuppaFtpConnector,
};
use logship::{Backends, JobPayload, TracingRecordSink};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 📨 One invocation of the daily log export.
#[derive(Debug, Parser)]
#[command(name = "logship", version, about = "Export one day of CloudWatch logs to FTP")]
struct Args {
    /// 📅 Day to export, DD-MM-YYYY. Defaults to yesterday. Beats anything in --payload.
    #[arg(long)]
    date: Option<String>,

    /// 📨 Raw invocation payload, e.g. '{"date":"01-02-2024"}'
    #[arg(long)]
    payload: Option<String>,

    /// 🔧 Optional TOML file layered over the environment
    #[arg(long, env = "LOGSHIP_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn job_payload(&self) -> Result<JobPayload, logship::JobError> {
        match (&self.date, &self.payload) {
            (Some(date), _) => Ok(JobPayload::with_date(date.clone())),
            (None, Some(json)) => JobPayload::from_json(json),
            (None, None) => Ok(JobPayload::default()),
        }
    }
}

/// 🚀 main(): tracing, args, clients, handle, print. In that order, every time.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 📡 `RUST_LOG` if set, `info` otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let payload = args.job_payload();
    let config = logship::load_config(args.config.as_deref());

    // 🔌 region and credentials come from the usual AWS chain, and only once config and payload check out
    let wire_up_aws = || async {
        let aws = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Backends {
            log_source: LogSourceBackend::CloudWatch(CloudWatchLogSource::new(
                aws_sdk_cloudwatchlogs::Client::new(&aws),
            )),
            secret_store: SecretStoreBackend::SecretsManager(SecretsManagerStore::new(
                aws_sdk_secretsmanager::Client::new(&aws),
            )),
            ftp: FtpConnectorBackend::Suppa(SuppaFtpConnector),
        }
    };

    let answer = logship::handle(
        config,
        payload,
        wire_up_aws,
        chrono::Utc::now(),
        &TracingRecordSink,
    )
    .await;

    // ✅ same answer, success or sob story. the error record already went to the log.
    let json = serde_json::to_string(&answer)
        .context("💀 Could not even serialize the status code. Something is deeply wrong.")?;
    println!("{}", json);
    info!("🏁 invocation finished");
    Ok(())
}
