//! Slack collector: messages a user sent during the report year.

use crate::adapters::http::{ApiClient, HttpSettings};
use crate::domain::model::{SlackActivity, SlackMessage};
use crate::domain::services::aggregate::count_by_month;
use crate::utils::error::{Result, ReviewError};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::OnceCell;

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
const MAX_KEPT_MESSAGES: usize = 1000;
const MAX_FALLBACK_CHANNELS: usize = 50;
const SEARCH_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<SlackUser>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    profile: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
struct UserProfile {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    messages: SearchMessages,
}

#[derive(Debug, Default, Deserialize)]
struct SearchMessages {
    #[serde(default)]
    matches: Vec<SearchMatch>,
    #[serde(default)]
    pagination: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct SearchMatch {
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
    channel: Option<ChannelRef>,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    channels: Vec<ChannelRef>,
}

#[derive(Debug, Deserialize)]
struct History {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    user: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
}

fn parse_ts(ts: &str) -> f64 {
    ts.trim().parse().unwrap_or(0.0)
}

fn timestamp_date(ts: f64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(ts.trunc() as i64, 0).map(|dt| dt.date_naive())
}

fn next_cursor(metadata: ResponseMetadata) -> Option<String> {
    metadata.next_cursor.filter(|c| !c.is_empty())
}

/// Totals, month and channel counts over `messages`; keeps at most 1000 messages.
pub fn summarize_messages(mut messages: Vec<SlackMessage>) -> SlackActivity {
    let messages_by_month = count_by_month(messages.iter().filter_map(|m| timestamp_date(m.timestamp)));

    let mut channels = BTreeMap::new();
    for message in &messages {
        *channels.entry(message.channel.clone()).or_insert(0) += 1;
    }

    let total_messages = messages.len();
    messages.truncate(MAX_KEPT_MESSAGES);

    SlackActivity {
        total_messages,
        messages_by_month,
        channels,
        messages,
    }
}

pub struct SlackCollector {
    api: ApiClient,
    base_url: String,
    year: i32,
    /// email -> user id, loaded from `users.list` on first use.
    directory: OnceCell<HashMap<String, String>>,
}

impl SlackCollector {
    pub fn new(token: &str, base_url: &str, year: i32, settings: HttpSettings) -> Result<Self> {
        let headers = [("authorization", format!("Bearer {}", token))];
        Ok(Self {
            api: ApiClient::new("Slack", &headers, settings)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            year,
            directory: OnceCell::new(),
        })
    }

    /// Calls a Web API method and decodes the body once `ok` is confirmed.
    async fn call<T, Q>(&self, method: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, method);
        let body: serde_json::Value = self.api.get_json(&url, query).await?;

        let envelope: Envelope = serde_json::from_value(body.clone())?;
        if !envelope.ok {
            return Err(ReviewError::SourceError {
                service: "Slack".to_string(),
                message: format!(
                    "{} failed: {}",
                    method,
                    envelope.error.as_deref().unwrap_or("unknown")
                ),
            });
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn load_directory(&self) -> Result<HashMap<String, String>> {
        let mut directory = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("limit", "200".to_string())];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }
            let page: UsersPage = self.call("users.list", &query).await?;
            for user in page.members {
                if let Some(email) = user.profile.email {
                    directory.insert(email.to_lowercase(), user.id);
                }
            }

            cursor = next_cursor(page.response_metadata);
            if cursor.is_none() {
                break;
            }
            self.api.pause().await;
        }

        tracing::debug!("Loaded {} Slack users", directory.len());
        Ok(directory)
    }

    pub async fn user_id(&self, email: &str) -> Result<Option<String>> {
        let directory = self
            .directory
            .get_or_try_init(|| self.load_directory())
            .await?;
        Ok(directory.get(&email.to_lowercase()).cloned())
    }

    fn in_year(&self, ts: f64) -> bool {
        timestamp_date(ts).is_some_and(|d| d.year() == self.year)
    }

    async fn search_messages(&self, user_id: &str) -> Result<Vec<SlackMessage>> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("query", format!("from:{}", user_id)),
                ("count", SEARCH_PAGE_SIZE.to_string()),
                ("sort", "timestamp".to_string()),
            ];
            if let Some(c) = &cursor {
                query.push(("cursor", c.clone()));
            }

            let response: SearchResponse = self.call("search.messages", &query).await?;
            if response.messages.matches.is_empty() {
                break;
            }

            for hit in response.messages.matches {
                let timestamp = parse_ts(&hit.ts);
                if !self.in_year(timestamp) {
                    continue;
                }
                let (channel_id, channel) = hit
                    .channel
                    .map(|c| (c.id.unwrap_or_default(), c.name))
                    .unwrap_or_default();
                messages.push(SlackMessage {
                    text: hit.text,
                    channel: channel.unwrap_or_else(|| "unknown".to_string()),
                    channel_id,
                    timestamp,
                    permalink: hit.permalink,
                });
            }

            cursor = next_cursor(response.messages.pagination);
            if cursor.is_none() {
                break;
            }
            self.api.pause().await;
        }

        Ok(messages)
    }

    /// Reads recent history of the first channels when search is unavailable.
    async fn channel_messages(&self, user_id: &str) -> Result<Vec<SlackMessage>> {
        let list: ChannelList = self
            .call(
                "conversations.list",
                &[("types", "public_channel,private_channel")],
            )
            .await?;

        let (oldest, latest) = year_bounds(self.year);
        let mut messages = Vec::new();

        for channel in list.channels.into_iter().take(MAX_FALLBACK_CHANNELS) {
            let Some(channel_id) = channel.id else {
                continue;
            };
            let channel_name = channel.name.unwrap_or_else(|| channel_id.clone());

            let query = [
                ("channel", channel_id.clone()),
                ("oldest", oldest.to_string()),
                ("latest", latest.to_string()),
                ("limit", "100".to_string()),
            ];
            match self.call::<History, _>("conversations.history", &query).await {
                Ok(history) => {
                    for message in history.messages {
                        if message.user.as_deref() != Some(user_id) {
                            continue;
                        }
                        let timestamp = parse_ts(&message.ts);
                        if !self.in_year(timestamp) {
                            continue;
                        }
                        messages.push(SlackMessage {
                            text: message.text,
                            channel: channel_name.clone(),
                            channel_id: channel_id.clone(),
                            timestamp,
                            permalink: String::new(),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("Error fetching messages from channel {}: {}", channel_name, e)
                }
            }
            self.api.pause().await;
        }

        Ok(messages)
    }

    pub async fn collect_user_data(&self, email: &str) -> Result<SlackActivity> {
        let Some(user_id) = self.user_id(email).await? else {
            tracing::info!("User {} not found in Slack", email);
            return Ok(SlackActivity::default());
        };

        tracing::info!("Fetching Slack messages for {} (user_id: {})...", email, user_id);
        let messages = match self.search_messages(&user_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("Error searching messages: {}; reading channel history instead", e);
                self.channel_messages(&user_id).await?
            }
        };

        Ok(summarize_messages(messages))
    }
}

/// Epoch seconds of the first and last second of `year`, UTC.
fn year_bounds(year: i32) -> (i64, i64) {
    let at = |month, day, h, m, s| {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default()
    };
    (at(1, 1, 0, 0, 0), at(12, 31, 23, 59, 59))
}
