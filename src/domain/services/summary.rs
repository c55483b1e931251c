use crate::domain::model::{MemberStats, Project, TeamStats};
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

const GITHUB_PULLS_URL: &str = "https://github.com/pulls";
const CARD_TOPICS: usize = 3;

/// The two lines and topic chips shown on a member's team-page card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemberSummary {
    pub line1: String,
    pub line2: String,
    pub topics: Vec<String>,
}

pub fn summarize_member(projects: &[Project], stats: &MemberStats, year: i32) -> MemberSummary {
    let topics: BTreeSet<String> = projects
        .iter()
        .flat_map(|p| {
            p.tags
                .iter()
                .cloned()
                .chain(std::iter::once(p.category.to_string()))
        })
        .collect();

    let mut bullets = Vec::new();
    if stats.prs_authored > 0 || stats.prs_reviewed > 0 {
        bullets.push(format!(
            "Authored {} PRs and reviewed {} in {}",
            stats.prs_authored, stats.prs_reviewed, year
        ));
    }
    if stats.calendar_events > 0 {
        let top_topic = topics.iter().next().map(String::as_str).unwrap_or("Meetings");
        bullets.push(format!(
            "Attended {} meetings focusing on {}",
            stats.calendar_events, top_topic
        ));
    }

    let mut bullets = bullets.into_iter();
    MemberSummary {
        line1: bullets
            .next()
            .unwrap_or_else(|| "Active contributor throughout the year.".to_string()),
        line2: bullets
            .next()
            .unwrap_or_else(|| "Focused on team collaboration and code quality.".to_string()),
        topics: topics.into_iter().take(CARD_TOPICS).collect(),
    }
}

pub fn team_summary(team_name: &str, year: i32, stats: &TeamStats) -> String {
    format!(
        "The {} had an outstanding year in {}, with {} pull requests authored and {} reviews \
         completed across {} major projects. The team demonstrated exceptional collaboration \
         and technical excellence throughout the year.",
        team_name, year, stats.total_prs, stats.total_reviews, stats.total_projects
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSearchLinks {
    pub prs: String,
    pub reviews: String,
}

/// Links to GitHub's PR search for everything a user authored or reviewed in `year`.
pub fn github_search_links(login: &str, year: i32) -> Result<GithubSearchLinks> {
    let search = |qualifier: &str| -> Result<String> {
        let query = format!(
            "is:pr {}:{} created:{}-01-01..{}-12-31",
            qualifier, login, year, year
        );
        let url = Url::parse_with_params(GITHUB_PULLS_URL, &[("q", query)])?;
        Ok(url.into())
    };

    Ok(GithubSearchLinks {
        prs: search("author")?,
        reviews: search("reviewed-by")?,
    })
}
