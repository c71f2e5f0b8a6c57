//! 📡 CloudWatch Logs: `FilterLogEvents`, one page at a time.
//!
//! The log group holds yesterday. We ask for it in pages, CloudWatch answers
//! with events and, when it's feeling generous, a `nextToken`. This file is
//! just the translator between `LogQuery` and the SDK's builder. 🦆

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client;
use tracing::trace;

use crate::backends::{LogEvent, LogPage, LogQuery, LogSource};

/// 📡 `LogSource` backed by `aws-sdk-cloudwatchlogs`.
#[derive(Debug, Clone)]
pub struct CloudWatchLogSource {
    client: Client,
}

impl CloudWatchLogSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSource for CloudWatchLogSource {
    async fn filter_log_events(&self, query: &LogQuery) -> Result<LogPage> {
        let response = self
            .client
            .filter_log_events()
            .log_group_name(&query.log_group)
            .start_time(query.start_millis)
            .end_time(query.end_millis)
            .set_next_token(query.next_token.clone())
            .send()
            .await
            .context(format!(
                "💀 FilterLogEvents failed for log group '{}' ({} → {}). \
                 Check the group name, the region, and whether this role may read logs.",
                query.log_group, query.start_millis, query.end_millis
            ))?;

        let events: Vec<LogEvent> = response
            .events()
            .iter()
            // -- 🕳️ a message-less event still gets its line. an empty one.
            .map(|event| LogEvent::new(event.message().unwrap_or_default()))
            .collect();

        trace!(
            "📡 CloudWatch handed over {} events, more pages: {}",
            events.len(),
            response.next_token().is_some()
        );

        Ok(LogPage {
            events,
            next_token: response.next_token().map(str::to_string),
        })
    }
}
