//! Static HTML pages: one per member plus the team `index.html`.

use crate::domain::model::{MemberStats, Project, ProjectLink, TeamStats};
use crate::domain::ports::Storage;
use crate::domain::report::{MemberReport, ReviewReport};
use crate::domain::services::aggregate::{MonthlyCounts, QuarterTopics};
use crate::utils::error::Result;
use askama::Template;
use chrono::NaiveDate;

const INDEX_PAGE: &str = "index.html";
const LINKS_PER_CARD: usize = 5;
const MEETINGS_PER_CARD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthBar {
    pub label: String,
    pub count: usize,
    /// Bar height as a percentage of the busiest month.
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectCard {
    pub name: String,
    pub description: String,
    pub icon: &'static str,
    pub icon_class: String,
    pub date_range: String,
    pub tags: Vec<String>,
    /// Pull request links.
    pub links: Vec<ProjectLink>,
    /// Calendar entries, shown as text since they have no URL.
    pub meetings: Vec<ProjectLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicView {
    pub name: String,
    pub icon: &'static str,
    pub icon_class: String,
    pub projects: Vec<ProjectCard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterView {
    pub label: String,
    pub topics: Vec<TopicView>,
}

#[derive(Template)]
#[template(path = "member.html")]
pub struct MemberPage {
    pub name: String,
    pub year: i32,
    pub generated_on: String,
    pub stats: MemberStats,
    pub prs_url: String,
    pub reviews_url: String,
    pub quarter_prs: Vec<QuarterCount>,
    pub months: Vec<MonthBar>,
    pub quarters: Vec<QuarterView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberCard {
    pub name: String,
    pub page: String,
    pub line1: String,
    pub line2: String,
    pub topics: Vec<String>,
    pub stats: MemberStats,
}

#[derive(Template)]
#[template(path = "team.html")]
pub struct TeamPage {
    pub team_name: String,
    pub year: i32,
    pub generated_on: String,
    pub team_stats: TeamStats,
    pub team_summary: String,
    pub members: Vec<MemberCard>,
}

fn short_date(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    match (start, end) {
        (Some(start), Some(end)) if start != end => {
            format!("{} - {}", short_date(start), short_date(end))
        }
        (Some(date), _) | (None, Some(date)) => short_date(date),
        (None, None) => String::new(),
    }
}

fn project_card(project: &Project) -> ProjectCard {
    ProjectCard {
        name: project.name.clone(),
        description: project.description.clone(),
        icon: project.category.icon_emoji(),
        icon_class: project.category.icon_class(),
        date_range: date_range(project.start_date, project.end_date),
        tags: project.tags.clone(),
        links: project
            .github_links
            .iter()
            .take(LINKS_PER_CARD)
            .cloned()
            .collect(),
        meetings: project
            .calendar_links
            .iter()
            .take(MEETINGS_PER_CARD)
            .cloned()
            .collect(),
    }
}

fn quarter_views(quarters: &[QuarterTopics]) -> Vec<QuarterView> {
    quarters
        .iter()
        .map(|q| QuarterView {
            label: q.quarter.to_string(),
            topics: q
                .topics
                .iter()
                .map(|topic| TopicView {
                    name: topic.category.to_string(),
                    icon: topic.category.icon_emoji(),
                    icon_class: topic.category.icon_class(),
                    projects: topic.projects.iter().map(project_card).collect(),
                })
                .collect(),
        })
        .collect()
}

/// Twelve bars for `year`, scaled to the busiest month.
pub fn month_bars(monthly: &MonthlyCounts, year: i32) -> Vec<MonthBar> {
    (1..=12)
        .map(|month| {
            let count = monthly
                .counts
                .get(&format!("{}-{:02}", year, month))
                .copied()
                .unwrap_or(0);
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b").to_string())
                .unwrap_or_default();
            MonthBar {
                label,
                count,
                height: count * 100 / monthly.max.max(1),
            }
        })
        .collect()
}

pub fn member_page(member: &MemberReport, year: i32, generated_on: &str) -> MemberPage {
    let (prs_url, reviews_url) = match &member.search_links {
        Some(links) => (links.prs.clone(), links.reviews.clone()),
        None => ("#".to_string(), "#".to_string()),
    };

    MemberPage {
        name: member.member.name.clone(),
        year,
        generated_on: generated_on.to_string(),
        stats: member.stats,
        prs_url,
        reviews_url,
        quarter_prs: member
            .quarter_prs
            .iter()
            .enumerate()
            .map(|(i, &count)| QuarterCount {
                label: format!("Q{}", i + 1),
                count,
            })
            .collect(),
        months: month_bars(&member.monthly_prs, year),
        quarters: quarter_views(&member.quarters),
    }
}

pub fn team_page(report: &ReviewReport) -> TeamPage {
    TeamPage {
        team_name: report.team_name.clone(),
        year: report.year,
        generated_on: report.generated_on.clone(),
        team_stats: report.team_stats,
        team_summary: report.team_summary.clone(),
        members: report
            .members
            .iter()
            .map(|m| MemberCard {
                name: m.member.name.clone(),
                page: page_name(m),
                line1: m.summary.line1.clone(),
                line2: m.summary.line2.clone(),
                topics: m.summary.topics.clone(),
                stats: m.stats,
            })
            .collect(),
    }
}

pub fn page_name(member: &MemberReport) -> String {
    format!("{}.html", member.member.key())
}

/// Renders the report and writes every page through `storage`.
pub struct PageGenerator<S: Storage> {
    storage: S,
}

impl<S: Storage> PageGenerator<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the location of the team index page.
    pub async fn generate(&self, report: &ReviewReport) -> Result<String> {
        for member in &report.members {
            let html = member_page(member, report.year, &report.generated_on).render()?;
            let name = page_name(member);
            self.storage.write_file(&name, html.as_bytes()).await?;
            tracing::info!("Generated: {}", self.storage.location(&name));
        }

        let html = team_page(report).render()?;
        self.storage.write_file(INDEX_PAGE, html.as_bytes()).await?;
        let index = self.storage.location(INDEX_PAGE);
        tracing::info!("Generated: {}", index);
        Ok(index)
    }
}
