//! 📤 Log Exporter: one day of a log group, flattened into one file.
//!
//! 🎬 *[INT. LOG GROUP, MIDNIGHT]* Yesterday's events sit in CloudWatch,
//! paginated, waiting. The exporter asks for page one. Then page two. Then
//! it keeps asking until CloudWatch stops handing out tokens, like a kid at a
//! candy store that eventually closes.
//!
//! 🧠 Knowledge graph:
//! - `export(date)`: validate → window → paginate → (zero events? `None`) → write file → `Some(path)`
//! - The date is checked before any network call. Bad dates never cost an API call.
//! - Events are written in arrival order, one `message` per line, `\n` after each.
//! - File: `{output_dir}/{prefix}.{DDMMYYYY}`, truncated if it already exists.
//! - Zero events → no file. The transporter is never bothered.

use std::path::PathBuf;

use tokio::{
    fs::File,
    io::{self, AsyncWriteExt},
};
use tracing::{debug, info};

use crate::app_config::AppConfig;
use crate::backends::{LogEvent, LogQuery, LogSource, LogSourceBackend};
use crate::dates::{JobTimeZone, TimeWindow, file_suffix, parse_job_date};
use crate::errors::JobError;

// -- 🏷️ the name that shows up in ExternalServiceError messages
const LOG_STORE_SERVICE: &str = "log store";

/// 📤 Pulls a day of events out of a `LogSource` and onto disk.
#[derive(Debug)]
pub struct LogExporter {
    log_source: LogSourceBackend,
    log_group: String,
    file_prefix: String,
    output_dir: PathBuf,
    timezone: JobTimeZone,
}

impl LogExporter {
    pub fn new(log_source: LogSourceBackend, config: &AppConfig) -> Self {
        Self {
            log_source,
            log_group: config.log_group_name.clone(),
            file_prefix: config.data_file_prefix.clone(),
            output_dir: config.output_dir.clone(),
            timezone: config.timezone,
        }
    }

    /// 🚀 Export one `DD-MM-YYYY` day. `Ok(None)` means the day was empty and nothing was written.
    pub async fn export(&self, date: &str) -> Result<Option<PathBuf>, JobError> {
        let day = parse_job_date(date)?;
        let window = TimeWindow::for_day(day, self.timezone)?;

        info!("Using log group name: {}", self.log_group);
        info!("Using epoch start time in milliseconds: {}", window.start_millis);
        info!("Using epoch end time in milliseconds: {}", window.end_millis);

        let events = self.collect_events(window).await?;
        if events.is_empty() {
            return Ok(None);
        }

        let path = self
            .output_dir
            .join(format!("{}.{}", self.file_prefix, file_suffix(day)));
        write_events(&path, &events).await?;

        info!(
            "📂 wrote {} events to '{}'",
            events.len(),
            path.display()
        );
        Ok(Some(path))
    }

    /// 🔄 Ask, then keep asking with the token, until a page comes back without one.
    async fn collect_events(&self, window: TimeWindow) -> Result<Vec<LogEvent>, JobError> {
        let mut events = Vec::new();
        let mut query = LogQuery {
            log_group: self.log_group.clone(),
            start_millis: window.start_millis,
            end_millis: window.end_millis,
            next_token: None,
        };
        let mut pages_seen = 0usize;

        loop {
            let page = self
                .log_source
                .filter_log_events(&query)
                .await
                .map_err(|e| {
                    JobError::external(
                        LOG_STORE_SERVICE,
                        format!("filtering events of log group '{}'", self.log_group),
                        e,
                    )
                })?;
            pages_seen += 1;
            debug!(
                "📄 page {} brought {} events (running total {})",
                pages_seen,
                page.events.len(),
                events.len() + page.events.len()
            );

            events.extend(page.events);
            match page.next_token {
                Some(token) => query.next_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

/// 💾 One message per line, buffered, flushed, closed.
async fn write_events(path: &std::path::Path, events: &[LogEvent]) -> Result<(), JobError> {
    let file = File::create(path).await.map_err(|e| {
        JobError::io(
            format!("💀 The export file '{}' could not be created", path.display()),
            e,
        )
    })?;
    let mut writer = io::BufWriter::new(file);

    let write_failed =
        |e| JobError::io(format!("💀 Writing to '{}' failed", path.display()), e);
    for event in events {
        writer
            .write_all(event.message.as_bytes())
            .await
            .map_err(write_failed)?;
        writer.write_all(b"\n").await.map_err(write_failed)?;
    }
    // -- 🚽 no async Drop. flush, or the tail of the day stays in the buffer forever.
    writer.flush().await.map_err(write_failed)?;
    Ok(())
}
