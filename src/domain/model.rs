use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A team member as listed in the team config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub github: Option<String>,
    /// Slack account email.
    #[serde(default)]
    pub slack: Option<String>,
    #[serde(default)]
    pub has_calendar: bool,
    #[serde(default)]
    pub calendar_file: Option<String>,
}

impl Member {
    /// GitHub username, else the name in snake case. Names cache and page files.
    pub fn key(&self) -> String {
        match self.github.as_deref().map(str::trim) {
            Some(login) if !login.is_empty() => login.to_string(),
            _ => self.name.trim().to_lowercase().replace(' ', "_"),
        }
    }

    pub fn github_login(&self) -> Option<&str> {
        self.github.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn slack_email(&self) -> Option<&str> {
        self.slack.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn calendar_path(&self) -> Option<&str> {
        if !self.has_calendar {
            return None;
        }
        self.calendar_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

impl PullRequest {
    pub fn created_on(&self) -> Option<NaiveDate> {
        self.created_at.map(|dt| dt.date_naive())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub repo: String,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_state: Option<String>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    pub sha: String,
    #[serde(default)]
    pub message: String,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub repo: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GithubActivity {
    #[serde(default)]
    pub prs_authored: Vec<PullRequest>,
    #[serde(default)]
    pub prs_reviewed: Vec<Review>,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlackMessage {
    pub text: String,
    pub channel: String,
    #[serde(default)]
    pub channel_id: String,
    /// Seconds since the epoch, as Slack reports `ts`.
    pub timestamp: f64,
    #[serde(default)]
    pub permalink: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SlackActivity {
    #[serde(default)]
    pub total_messages: usize,
    #[serde(default)]
    pub messages_by_month: BTreeMap<String, usize>,
    #[serde(default)]
    pub channels: BTreeMap<String, usize>,
    #[serde(default)]
    pub messages: Vec<SlackMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub title: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalendarActivity {
    #[serde(default)]
    pub total_events: usize,
    #[serde(default)]
    pub events_by_month: BTreeMap<String, usize>,
    #[serde(default)]
    pub events_by_quarter: BTreeMap<String, usize>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
}

/// Everything collected for one member. Cached as `{key}_data.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemberData {
    #[serde(default)]
    pub github: GithubActivity,
    #[serde(default)]
    pub slack: SlackActivity,
    #[serde(default)]
    pub calendar: CalendarActivity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ai,
    Security,
    Cost,
    Perf,
    Infra,
    Team,
    Feature,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ai => "ai",
            Category::Security => "security",
            Category::Cost => "cost",
            Category::Perf => "perf",
            Category::Infra => "infra",
            Category::Team => "team",
            Category::Feature => "feature",
        }
    }

    pub fn icon_class(&self) -> String {
        format!("icon-{}", self.as_str())
    }

    pub fn icon_emoji(&self) -> &'static str {
        match self {
            Category::Infra => "🏗️",
            Category::Feature => "⚓",
            Category::Perf => "⚡",
            Category::Security => "🔐",
            Category::Ai => "🧠",
            Category::Cost => "💰",
            Category::Team => "👥",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar quarter, rendered as `Q3 2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Quarter {
    pub year: i32,
    pub number: u32,
}

impl Quarter {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            number: (date.month() - 1) / 3 + 1,
        }
    }

    pub fn all(year: i32) -> [Quarter; 4] {
        [1, 2, 3, 4].map(|number| Quarter { year, number })
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{} {}", self.number, self.year)
    }
}

impl From<Quarter> for String {
    fn from(quarter: Quarter) -> Self {
        quarter.to_string()
    }
}

impl TryFrom<String> for Quarter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (q, year) = value
            .trim()
            .split_once(' ')
            .ok_or_else(|| format!("invalid quarter label: {}", value))?;
        let number = q
            .strip_prefix('Q')
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| (1..=4).contains(n))
            .ok_or_else(|| format!("invalid quarter number: {}", value))?;
        let year = year
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("invalid quarter year: {}", value))?;
        Ok(Quarter { year, number })
    }
}

/// `YYYY-MM` bucket key used by every monthly aggregate.
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectLink {
    pub text: String,
    pub url: String,
    /// `YYYY-MM-DD`, empty when the source had no date.
    pub date: String,
}

/// A group of related PRs and calendar events. Cached as part of `{key}_projects.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub name: String,
    pub category: Category,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub quarter: Option<Quarter>,
    pub description: String,
    #[serde(default)]
    pub prs: Vec<PullRequest>,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
    #[serde(default)]
    pub github_links: Vec<ProjectLink>,
    #[serde(default)]
    pub calendar_links: Vec<ProjectLink>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Project {
    /// Number of PRs plus events, used to rank projects and topics.
    pub fn activity(&self) -> usize {
        self.prs.len() + self.events.len()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberStats {
    pub prs_authored: usize,
    pub prs_reviewed: usize,
    pub slack_messages: usize,
    pub calendar_events: usize,
    pub projects: usize,
}

impl MemberStats {
    pub fn from_data(data: &MemberData, projects: &[Project]) -> Self {
        Self {
            prs_authored: data.github.prs_authored.len(),
            prs_reviewed: data.github.prs_reviewed.len(),
            slack_messages: data.slack.total_messages,
            calendar_events: data.calendar.total_events,
            projects: projects.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamStats {
    pub total_prs: usize,
    pub total_reviews: usize,
    pub total_slack_messages: usize,
    pub total_projects: usize,
    pub team_size: usize,
}

impl TeamStats {
    pub fn from_members<'a>(stats: impl IntoIterator<Item = &'a MemberStats>) -> Self {
        stats.into_iter().fold(TeamStats::default(), |mut acc, s| {
            acc.total_prs += s.prs_authored;
            acc.total_reviews += s.prs_reviewed;
            acc.total_slack_messages += s.slack_messages;
            acc.total_projects += s.projects;
            acc.team_size += 1;
            acc
        })
    }
}
