use crate::domain::model::{Member, MemberData, MemberStats, Project, TeamStats};
use crate::domain::services::aggregate::{MonthlyCounts, QuarterTopics};
use crate::domain::services::summary::{GithubSearchLinks, MemberSummary};

/// One member's raw data as produced by the extract phase.
#[derive(Debug, Clone)]
pub struct MemberActivity {
    pub member: Member,
    pub data: MemberData,
    /// Present when both cache files were reused.
    pub cached_projects: Option<Vec<Project>>,
}

#[derive(Debug, Clone)]
pub struct MemberReport {
    pub member: Member,
    pub data: MemberData,
    pub projects: Vec<Project>,
    /// Projects were computed in this run and still need caching.
    pub projects_fresh: bool,
    pub stats: MemberStats,
    pub summary: MemberSummary,
    pub quarters: Vec<QuarterTopics>,
    pub monthly_prs: MonthlyCounts,
    pub quarter_prs: [usize; 4],
    pub search_links: Option<GithubSearchLinks>,
}

#[derive(Debug, Clone)]
pub struct ReviewReport {
    pub team_name: String,
    pub year: i32,
    /// `Month YYYY`
    pub generated_on: String,
    pub members: Vec<MemberReport>,
    pub team_stats: TeamStats,
    pub team_summary: String,
}
