//! 🔧 App Configuration: the environment, politely interrogated.
//!
//! 📡 "Mandatory environment variable(s) undefined" is the first line of every
//! incident channel message for this job, ever. 🦆
//!
//! 🏗️ Powered by Figment, same as always: environment variables are the base
//! layer, an optional TOML file is merged on top (TOML wins on conflicts).
//! Everything lands in `RawConfig` (all optional, nothing trusted), and
//! `validate_required` + `AppConfig::try_from` turn it into something the job
//! can lean on.
//!
//! 🧠 Knowledge graph:
//! - Required: `DATA_FILE_PREFIX`, `FTP_HOST`, `LOG_GROUP_NAME`, `SECRET_NAME`.
//!   Missing ones are reported ALL AT ONCE, in that order.
//! - Optional: `FTP_PORT` (21), `OUTPUT_DIR` (/tmp), `JOB_TIMEZONE` (local).
//! - Env keys are unprefixed and uppercase. Their values stay strings, exactly
//!   as set: `DATA_FILE_PREFIX=007` means `007`. TOML files use the lowercase
//!   spelling (`ftp_host = "..."`).
//! - Empty values count as missing. An empty FTP host is not a host.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::dates::JobTimeZone;
use crate::errors::JobError;

/// 📋 The four keys the job refuses to start without, in reporting order.
pub const REQUIRED_KEYS: [&str; 4] = [
    "DATA_FILE_PREFIX",
    "FTP_HOST",
    "LOG_GROUP_NAME",
    "SECRET_NAME",
];

// -- 🔍 everything we are allowed to read from the environment. PATH stays out of it.
const KNOWN_KEYS: [&str; 7] = [
    "DATA_FILE_PREFIX",
    "FTP_HOST",
    "LOG_GROUP_NAME",
    "SECRET_NAME",
    "FTP_PORT",
    "OUTPUT_DIR",
    "JOB_TIMEZONE",
];

/// 📠 Port 21. The control port. Older than most of the people reading this.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// 📂 Where the export file lands unless told otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp";

/// 🔢 A port as the providers hand it over: text from the environment, a number from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawPort {
    Number(i64),
    Text(String),
}

/// 📦 Configuration exactly as the providers gave it. Nothing validated yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub data_file_prefix: Option<String>,
    #[serde(default)]
    pub ftp_host: Option<String>,
    #[serde(default)]
    pub log_group_name: Option<String>,
    #[serde(default)]
    pub secret_name: Option<String>,
    #[serde(default)]
    pub ftp_port: Option<RawPort>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub job_timezone: Option<String>,
}

impl RawConfig {
    // -- 🕳️ present and non-blank, or it didn't happen
    fn text(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn required(&self, key: &str) -> Option<String> {
        match key {
            "DATA_FILE_PREFIX" => Self::text(&self.data_file_prefix),
            "FTP_HOST" => Self::text(&self.ftp_host),
            "LOG_GROUP_NAME" => Self::text(&self.log_group_name),
            "SECRET_NAME" => Self::text(&self.secret_name),
            _ => None,
        }
    }

    fn port(&self) -> Result<u16, JobError> {
        let bad_port = |shown: String| {
            JobError::InvalidConfiguration(format!("FTP_PORT '{}' is not a valid TCP port", shown))
        };
        match &self.ftp_port {
            None => Ok(DEFAULT_FTP_PORT),
            Some(RawPort::Number(n)) => u16::try_from(*n).map_err(|_| bad_port(n.to_string())),
            Some(RawPort::Text(t)) if t.trim().is_empty() => Ok(DEFAULT_FTP_PORT),
            Some(RawPort::Text(t)) => t.trim().parse::<u16>().map_err(|_| bad_port(t.clone())),
        }
    }
}

/// ✅ Configuration Validator: every required key present, or a list of every one that isn't.
pub fn validate_required(raw: &RawConfig) -> Result<(), JobError> {
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| raw.required(key).is_none())
        .map(|key| key.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(JobError::MissingConfiguration { missing })
    }
}

/// 📦 The validated configuration. If you're holding one, the required keys exist.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 📂 Export file is `{output_dir}/{data_file_prefix}.{DDMMYYYY}`
    pub data_file_prefix: String,
    /// 📠 Where the file goes
    pub ftp_host: String,
    pub ftp_port: u16,
    /// 📡 Which log group we read the day from
    pub log_group_name: String,
    /// 🔐 Which secret holds the FTP username/password
    pub secret_name: String,
    pub output_dir: PathBuf,
    /// 🌍 The clock "yesterday" and "midnight" are read from
    pub timezone: JobTimeZone,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = JobError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        validate_required(&raw)?;

        let ftp_port = raw.port()?;

        let timezone = match RawConfig::text(&raw.job_timezone) {
            None => JobTimeZone::default(),
            Some(zone) => zone.parse::<JobTimeZone>().map_err(|e| {
                JobError::InvalidConfiguration(format!("JOB_TIMEZONE is unusable: {}", e))
            })?,
        };

        let output_dir = RawConfig::text(&raw.output_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        // -- ✅ validate_required already vouched for these four
        let required = |key: &str| raw.required(key).unwrap_or_default();
        Ok(Self {
            data_file_prefix: required("DATA_FILE_PREFIX"),
            ftp_host: required("FTP_HOST"),
            ftp_port,
            log_group_name: required("LOG_GROUP_NAME"),
            secret_name: required("SECRET_NAME"),
            output_dir,
            timezone,
        })
    }
}

/// 🌱 The environment layer, every value kept as the exact string that was set.
///
/// figment's `Env` provider guesses types (`007` → `7`), and a log group or
/// prefix has to survive byte for byte, so the known keys are read as text and
/// handed to figment already serialized.
fn environment() -> Serialized<BTreeMap<String, String>> {
    let vars: BTreeMap<String, String> = KNOWN_KEYS
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| (key.to_ascii_lowercase(), value))
        })
        .collect();
    Serialized::defaults(vars)
}

/// 🏗️ Assemble the figment: environment first, TOML file on top if one was given.
pub fn figment(config_file_name: Option<&Path>) -> Figment {
    let config = Figment::new().merge(environment());
    match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    }
}

/// 🚀 Load and validate the config. Fails before any external call is made.
///
/// 💀 Missing keys → `MissingConfiguration` naming all of them.
/// Unparseable providers or bad optional values → `InvalidConfiguration`.
pub fn load_config(config_file_name: Option<&Path>) -> Result<AppConfig, JobError> {
    info!(
        "🔧 Loading configuration: environment{}",
        config_file_name
            .map(|p| format!(" + '{}'", p.display()))
            .unwrap_or_default()
    );

    let raw: RawConfig = figment(config_file_name).extract().map_err(|e| {
        JobError::InvalidConfiguration(format!(
            "💀 Failed to parse configuration from the environment{}: {}",
            config_file_name
                .map(|p| format!(" and '{}'", p.display()))
                .unwrap_or_default(),
            e
        ))
    })?;

    AppConfig::try_from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn text(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn complete_raw() -> RawConfig {
        RawConfig {
            data_file_prefix: text("app"),
            ftp_host: text("ftp.example.com"),
            log_group_name: text("/aws/lambda/app"),
            secret_name: text("ftp/creds"),
            ..RawConfig::default()
        }
    }

    #[test]
    fn the_one_where_a_complete_config_sails_through_with_defaults() {
        let config = AppConfig::try_from(complete_raw())
            .expect("💀 complete config should validate");

        assert_eq!(config.data_file_prefix, "app");
        assert_eq!(config.ftp_host, "ftp.example.com");
        assert_eq!(config.ftp_port, 21);
        assert_eq!(config.log_group_name, "/aws/lambda/app");
        assert_eq!(config.secret_name, "ftp/creds");
        assert_eq!(config.output_dir, PathBuf::from("/tmp"));
        assert_eq!(config.timezone, JobTimeZone::Local);
    }

    #[test]
    fn the_one_where_two_missing_keys_are_both_named_and_shamed() {
        let raw = RawConfig {
            ftp_host: None,
            secret_name: None,
            ..complete_raw()
        };

        let error = validate_required(&raw).expect_err("💀 two keys missing, no error");

        match &error {
            JobError::MissingConfiguration { missing } => {
                assert_eq!(missing, &vec!["FTP_HOST".to_string(), "SECRET_NAME".to_string()]);
            }
            honestly_who_knows => panic!("💀 expected MissingConfiguration, got {:?}", honestly_who_knows),
        }
        let message = error.to_string();
        assert!(message.contains("FTP_HOST"));
        assert!(message.contains("SECRET_NAME"));
    }

    #[test]
    fn the_one_where_nothing_is_set_and_all_four_are_reported_in_order() {
        let error = validate_required(&RawConfig::default()).expect_err("💀 empty config validated");
        assert_eq!(
            error.to_string(),
            "Mandatory environment variable(s) undefined: DATA_FILE_PREFIX, FTP_HOST, LOG_GROUP_NAME, SECRET_NAME"
        );
    }

    #[test]
    fn the_one_where_blank_values_count_as_missing() {
        let raw = RawConfig {
            log_group_name: text("   "),
            ..complete_raw()
        };
        let error = validate_required(&raw).expect_err("💀 blank log group accepted");
        assert!(error.to_string().ends_with("LOG_GROUP_NAME"));
    }

    #[test]
    fn the_one_where_a_bad_port_is_a_configuration_error() {
        for nope in [
            RawPort::Text("seventy".into()),
            RawPort::Number(70_000),
            RawPort::Number(-21),
        ] {
            let raw = RawConfig {
                ftp_port: Some(nope),
                ..complete_raw()
            };
            let error = AppConfig::try_from(raw).expect_err("💀 that is not a port");
            assert_eq!(error.error_type(), "ConfigurationError");
            assert!(error.to_string().contains("FTP_PORT"));
        }
    }

    #[test]
    fn the_one_where_a_bad_timezone_is_a_configuration_error() {
        for mars in ["Mars/Olympus_Mons", "+9999999:00", "+-05:00"] {
            let raw = RawConfig {
                job_timezone: text(mars),
                ..complete_raw()
            };
            let error = AppConfig::try_from(raw).expect_err("💀 Mars is not a timezone");
            assert_eq!(error.error_type(), "ConfigurationError");
            assert!(error.to_string().contains("JOB_TIMEZONE"));
        }
    }

    #[test]
    fn the_one_where_the_environment_is_read_without_a_prefix() {
        Jail::expect_with(|jail| {
            jail.set_env("DATA_FILE_PREFIX", "app");
            jail.set_env("FTP_HOST", "10.0.0.7");
            jail.set_env("LOG_GROUP_NAME", "/aws/lambda/app");
            jail.set_env("SECRET_NAME", "ftp/creds");
            jail.set_env("FTP_PORT", "2121");
            jail.set_env("JOB_TIMEZONE", "utc");

            let config = load_config(None).map_err(|e| e.to_string())?;

            assert_eq!(config.ftp_host, "10.0.0.7");
            assert_eq!(config.ftp_port, 2121);
            assert_eq!(config.timezone, JobTimeZone::Utc);
            Ok(())
        });
    }

    #[test]
    fn the_one_where_numbery_strings_come_out_exactly_as_they_went_in() {
        Jail::expect_with(|jail| {
            jail.set_env("DATA_FILE_PREFIX", "007");
            jail.set_env("FTP_HOST", "ftp.example.com");
            jail.set_env("LOG_GROUP_NAME", "0123");
            jail.set_env("SECRET_NAME", "1.10");
            jail.set_env("OUTPUT_DIR", "0042");

            let config = load_config(None).map_err(|e| e.to_string())?;

            assert_eq!(config.data_file_prefix, "007");
            assert_eq!(config.log_group_name, "0123");
            assert_eq!(config.secret_name, "1.10");
            assert_eq!(config.output_dir, PathBuf::from("0042"));
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_environment_is_missing_two_and_says_so() {
        Jail::expect_with(|jail| {
            jail.set_env("DATA_FILE_PREFIX", "app");
            jail.set_env("LOG_GROUP_NAME", "/aws/lambda/app");

            let error = load_config(None).expect_err("💀 half a config loaded");

            assert_eq!(
                error.to_string(),
                "Mandatory environment variable(s) undefined: FTP_HOST, SECRET_NAME"
            );
            Ok(())
        });
    }

    #[test]
    fn the_one_where_the_toml_file_wins_over_the_environment() {
        Jail::expect_with(|jail| {
            jail.set_env("DATA_FILE_PREFIX", "from-env");
            jail.set_env("FTP_HOST", "env.example.com");
            jail.set_env("LOG_GROUP_NAME", "/aws/lambda/app");
            jail.set_env("FTP_PORT", "21");
            jail.create_file(
                "logship.toml",
                r#"
                data_file_prefix = "from-toml"
                secret_name = "ftp/creds"
                output_dir = "/var/spool/logship"
                ftp_port = 2121
                "#,
            )?;

            let config = load_config(Some(Path::new("logship.toml"))).map_err(|e| e.to_string())?;

            assert_eq!(config.data_file_prefix, "from-toml");
            assert_eq!(config.ftp_host, "env.example.com");
            assert_eq!(config.secret_name, "ftp/creds");
            assert_eq!(config.output_dir, PathBuf::from("/var/spool/logship"));
            assert_eq!(config.ftp_port, 2121);
            Ok(())
        });
    }
}
