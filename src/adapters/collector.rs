use crate::adapters::calendar::CalendarParser;
use crate::adapters::github::GithubCollector;
use crate::adapters::slack::SlackCollector;
use crate::config::TeamConfig;
use crate::domain::model::{Member, MemberData};
use crate::domain::ports::ActivitySource;
use crate::utils::error::{Result, ReviewError};
use async_trait::async_trait;

/// Collects a member's activity from every configured source. A failing
/// source is logged and left empty.
pub struct ActivityCollector {
    github: GithubCollector,
    slack: Option<SlackCollector>,
    calendar: CalendarParser,
    repositories: Vec<String>,
}

impl ActivityCollector {
    pub fn new(
        github: GithubCollector,
        slack: Option<SlackCollector>,
        calendar: CalendarParser,
        repositories: Vec<String>,
    ) -> Self {
        Self {
            github,
            slack,
            calendar,
            repositories,
        }
    }

    pub fn from_config(config: &TeamConfig) -> Result<Self> {
        let settings = config.http_settings();
        let github = GithubCollector::new(
            &config.github_pat,
            &config.github_api_url,
            config.year,
            settings.clone(),
        )?;
        let slack = if config.slack_token.is_empty() {
            None
        } else {
            Some(SlackCollector::new(
                &config.slack_token,
                &config.slack_api_url,
                config.year,
                settings,
            )?)
        };

        Ok(Self::new(
            github,
            slack,
            CalendarParser::new(&config.calendar_folder, config.year),
            config.repositories.clone(),
        ))
    }
}

fn log_failure(source: &str, e: &ReviewError) {
    if e.is_source_failure() {
        tracing::warn!("✗ Error collecting {} data: {}", source, e);
    } else {
        tracing::error!("✗ Error collecting {} data: {}", source, e);
    }
}

#[async_trait]
impl ActivitySource for ActivityCollector {
    async fn collect(&self, member: &Member) -> MemberData {
        tracing::info!("Collecting data for: {}", member.name);
        let mut data = MemberData::default();

        match member.github_login() {
            Some(login) => match self.github.collect_user_data(login, &self.repositories).await {
                Ok(github) => {
                    tracing::info!(
                        "✓ Collected {} PRs, {} reviews",
                        github.prs_authored.len(),
                        github.prs_reviewed.len()
                    );
                    data.github = github;
                }
                Err(e) => log_failure("GitHub", &e),
            },
            None => tracing::info!("⊘ Skipping GitHub (no username)"),
        }

        match (member.slack_email(), &self.slack) {
            (Some(email), Some(slack)) => match slack.collect_user_data(email).await {
                Ok(activity) => {
                    tracing::info!("✓ Collected {} Slack messages", activity.total_messages);
                    data.slack = activity;
                }
                Err(e) => log_failure("Slack", &e),
            },
            (Some(_), None) => tracing::info!("⊘ Skipping Slack (no token)"),
            (None, _) => tracing::info!("⊘ Skipping Slack (no email)"),
        }

        match member.calendar_path() {
            Some(file) => match self.calendar.parse_user_calendar(file) {
                Ok(calendar) => {
                    tracing::info!("✓ Collected {} calendar events", calendar.total_events);
                    data.calendar = calendar;
                }
                Err(e) => log_failure("Calendar", &e),
            },
            None => tracing::info!("⊘ Skipping Calendar (no file or not shared)"),
        }

        data
    }
}
