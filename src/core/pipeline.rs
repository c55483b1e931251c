use crate::app::render::PageGenerator;
use crate::domain::model::{Member, MemberData, MemberStats, Project, TeamStats};
use crate::domain::ports::{ActivitySource, ConfigProvider, Pipeline, Storage};
use crate::domain::report::{MemberActivity, MemberReport, ReviewReport};
use crate::domain::services::aggregate::{monthly_counts, quarter_counts, quarters_by_topic};
use crate::domain::services::analyzer::ProjectAnalyzer;
use crate::domain::services::summary::{github_search_links, summarize_member, team_summary};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

fn data_file(key: &str) -> String {
    format!("{}_data.json", key)
}

fn projects_file(key: &str) -> String {
    format!("{}_projects.json", key)
}

/// Collect, classify and render a year review.
///
/// `cache` holds `{key}_data.json` and `{key}_projects.json` per member; `output`
/// receives the HTML pages.
pub struct ReviewPipeline<S: Storage, C: ConfigProvider, A: ActivitySource> {
    cache: S,
    pages: PageGenerator<S>,
    config: C,
    source: A,
    refresh: bool,
}

impl<S: Storage, C: ConfigProvider, A: ActivitySource> ReviewPipeline<S, C, A> {
    pub fn new(cache: S, output: S, config: C, source: A) -> Self {
        Self {
            cache,
            pages: PageGenerator::new(output),
            config,
            source,
            refresh: false,
        }
    }

    /// Ignore existing cache files and collect everything again.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    async fn load_cached(&self, key: &str) -> Result<(MemberData, Vec<Project>)> {
        let data = self.cache.read_file(&data_file(key)).await?;
        let projects = self.cache.read_file(&projects_file(key)).await?;
        Ok((serde_json::from_slice(&data)?, serde_json::from_slice(&projects)?))
    }

    async fn cache_available(&self, key: &str) -> bool {
        !self.refresh
            && self.cache.exists(&data_file(key)).await
            && self.cache.exists(&projects_file(key)).await
    }

    fn build_member_report(
        &self,
        analyzer: &ProjectAnalyzer,
        activity: MemberActivity,
    ) -> Result<MemberReport> {
        let year = self.config.year();
        let MemberActivity {
            member,
            data,
            cached_projects,
        } = activity;

        let projects_fresh = cached_projects.is_none();
        let projects = match cached_projects {
            Some(projects) => projects,
            None => {
                tracing::info!("Analyzing projects for {}...", member.name);
                let projects =
                    analyzer.analyze(&data.github.prs_authored, &data.calendar.events);
                tracing::info!("✓ Identified {} projects", projects.len());
                projects
            }
        };

        let stats = MemberStats::from_data(&data, &projects);
        let pr_dates: Vec<NaiveDate> = data
            .github
            .prs_authored
            .iter()
            .filter_map(|pr| pr.created_on())
            .collect();
        let search_links = member
            .github_login()
            .map(|login| github_search_links(login, year))
            .transpose()?;

        Ok(MemberReport {
            summary: summarize_member(&projects, &stats, year),
            quarters: quarters_by_topic(&projects, year),
            monthly_prs: monthly_counts(pr_dates.iter().copied(), year),
            quarter_prs: quarter_counts(pr_dates, year),
            search_links,
            stats,
            projects,
            projects_fresh,
            member,
            data,
        })
    }

    async fn collect_member(&self, member: &Member) -> Result<MemberActivity> {
        let key = member.key();

        if self.cache_available(&key).await {
            match self.load_cached(&key).await {
                Ok((data, projects)) => {
                    tracing::info!("Using cached data for {}", member.name);
                    return Ok(MemberActivity {
                        member: member.clone(),
                        data,
                        cached_projects: Some(projects),
                    });
                }
                Err(e) => tracing::warn!(
                    "Ignoring unreadable cache for {}: {}; collecting again",
                    member.name,
                    e
                ),
            }
        }

        let data = self.source.collect(member).await;
        self.cache
            .write_file(&data_file(&key), &serde_json::to_vec_pretty(&data)?)
            .await?;
        tracing::debug!("Cached raw data at {}", self.cache.location(&data_file(&key)));

        Ok(MemberActivity {
            member: member.clone(),
            data,
            cached_projects: None,
        })
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider, A: ActivitySource> Pipeline for ReviewPipeline<S, C, A> {
    async fn extract(&self) -> Result<Vec<MemberActivity>> {
        let members = self.config.members();
        let mut activities = Vec::with_capacity(members.len());
        for member in members {
            activities.push(self.collect_member(member).await?);
        }
        Ok(activities)
    }

    async fn transform(&self, data: Vec<MemberActivity>) -> Result<ReviewReport> {
        let analyzer = ProjectAnalyzer::new(self.config.project_keywords());
        let members = data
            .into_iter()
            .map(|activity| self.build_member_report(&analyzer, activity))
            .collect::<Result<Vec<_>>>()?;

        let team_stats = TeamStats::from_members(members.iter().map(|m| &m.stats));
        let team_name = self.config.team_name();
        let year = self.config.year();

        Ok(ReviewReport {
            team_name: team_name.to_string(),
            year,
            generated_on: chrono::Local::now().format("%B %Y").to_string(),
            team_summary: team_summary(team_name, year, &team_stats),
            team_stats,
            members,
        })
    }

    async fn load(&self, report: ReviewReport) -> Result<String> {
        for member in report.members.iter().filter(|m| m.projects_fresh) {
            let path = projects_file(&member.member.key());
            self.cache
                .write_file(&path, &serde_json::to_vec_pretty(&member.projects)?)
                .await?;
        }

        self.pages.generate(&report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CalendarEvent, PullRequest};
    use crate::utils::error::ReviewError;
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                ReviewError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> bool {
            self.files.lock().await.contains_key(path)
        }

        fn location(&self, path: &str) -> String {
            format!("mock://{}", path)
        }
    }

    struct MockConfig {
        members: Vec<Member>,
        keywords: BTreeMap<String, Vec<String>>,
    }

    impl MockConfig {
        fn new() -> Self {
            let mut keywords = BTreeMap::new();
            keywords.insert("security".to_string(), vec!["rbac".to_string()]);
            Self {
                members: vec![Member {
                    name: "Jane Doe".to_string(),
                    github: Some("jdoe".to_string()),
                    slack: None,
                    has_calendar: false,
                    calendar_file: None,
                }],
                keywords,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn team_name(&self) -> &str {
            "Platform"
        }

        fn year(&self) -> i32 {
            2025
        }

        fn members(&self) -> &[Member] {
            &self.members
        }

        fn project_keywords(&self) -> &BTreeMap<String, Vec<String>> {
            &self.keywords
        }
    }

    struct MockSource {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ActivitySource for MockSource {
        async fn collect(&self, _member: &Member) -> MemberData {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut data = MemberData::default();
            data.github.prs_authored = vec![
                PullRequest {
                    number: 1,
                    title: "RBAC V2 Implementation".to_string(),
                    url: "https://github.com/acme/api/pull/1".to_string(),
                    repo: "acme/api".to_string(),
                    created_at: Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).single(),
                    ..PullRequest::default()
                },
                PullRequest {
                    number: 2,
                    title: "RBAC V2 Implementation follow-up".to_string(),
                    url: "https://github.com/acme/api/pull/2".to_string(),
                    repo: "acme/api".to_string(),
                    created_at: Utc.with_ymd_and_hms(2025, 5, 3, 9, 0, 0).single(),
                    ..PullRequest::default()
                },
            ];
            data.calendar.events = vec![CalendarEvent {
                title: "Kickoff: RBAC V2".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 1, 20),
                ..CalendarEvent::default()
            }];
            data.calendar.total_events = 1;
            data
        }
    }

    struct Fixture {
        cache: MockStorage,
        output: MockStorage,
        calls: Arc<AtomicUsize>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                cache: MockStorage::new(),
                output: MockStorage::new(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn pipeline(&self) -> ReviewPipeline<MockStorage, MockConfig, MockSource> {
            ReviewPipeline::new(
                self.cache.clone(),
                self.output.clone(),
                MockConfig::new(),
                MockSource {
                    calls: self.calls.clone(),
                },
            )
        }
    }

    #[tokio::test]
    async fn test_extract_collects_and_caches_raw_data() {
        let fixture = Fixture::new();
        let activities = fixture.pipeline().extract().await.unwrap();

        assert_eq!(activities.len(), 1);
        assert!(activities[0].cached_projects.is_none());
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);

        let cached = fixture.cache.get_file("jdoe_data.json").await.unwrap();
        let data: MemberData = serde_json::from_slice(&cached).unwrap();
        assert_eq!(data.github.prs_authored.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_reuses_cache_when_both_files_exist() {
        let fixture = Fixture::new();
        fixture
            .cache
            .put_file("jdoe_data.json", br#"{"github": {"prs_authored": []}}"#)
            .await;
        fixture.cache.put_file("jdoe_projects.json", b"[]").await;

        let activities = fixture.pipeline().extract().await.unwrap();

        assert_eq!(fixture.calls.load(Ordering::SeqCst), 0);
        assert_eq!(activities[0].cached_projects, Some(vec![]));
    }

    #[tokio::test]
    async fn test_extract_ignores_partial_refreshed_or_corrupt_cache() {
        let fixture = Fixture::new();
        fixture.cache.put_file("jdoe_data.json", b"{}").await;
        fixture.pipeline().extract().await.unwrap();
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);

        fixture.cache.put_file("jdoe_projects.json", b"[]").await;
        fixture.pipeline().with_refresh(true).extract().await.unwrap();
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 2);

        fixture.cache.put_file("jdoe_projects.json", b"not json").await;
        let activities = fixture.pipeline().extract().await.unwrap();
        assert_eq!(fixture.calls.load(Ordering::SeqCst), 3);
        assert!(activities[0].cached_projects.is_none());
    }

    #[tokio::test]
    async fn test_transform_builds_member_and_team_views() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        let activities = pipeline.extract().await.unwrap();
        let report = pipeline.transform(activities).await.unwrap();

        assert_eq!(report.team_name, "Platform");
        assert_eq!(report.team_stats.team_size, 1);
        assert_eq!(report.team_stats.total_prs, 2);

        let member = &report.members[0];
        assert!(member.projects_fresh);
        assert_eq!(member.projects.len(), 1);
        assert_eq!(member.projects[0].name, "RBAC");
        assert_eq!(member.projects[0].prs.len(), 2);
        assert_eq!(member.projects[0].events.len(), 1);
        assert_eq!(member.quarter_prs, [1, 1, 0, 0]);
        assert_eq!(member.monthly_prs.counts.len(), 12);
        assert_eq!(member.monthly_prs.max, 1);
        assert_eq!(member.summary.line1, "Authored 2 PRs and reviewed 0 in 2025");
        assert!(member
            .search_links
            .as_ref()
            .is_some_and(|l| l.prs.contains("author%3Ajdoe")));
        assert!(report.team_summary.starts_with("The Platform had an outstanding year in 2025"));
    }

    #[tokio::test]
    async fn test_load_writes_projects_cache_and_pages() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();
        let activities = pipeline.extract().await.unwrap();
        let report = pipeline.transform(activities).await.unwrap();

        let index = pipeline.load(report).await.unwrap();

        assert_eq!(index, "mock://index.html");
        let projects = fixture.cache.get_file("jdoe_projects.json").await.unwrap();
        let projects: Vec<Project> = serde_json::from_slice(&projects).unwrap();
        assert_eq!(projects[0].name, "RBAC");
        assert!(fixture.output.get_file("jdoe.html").await.is_some());
        assert!(fixture.output.get_file("index.html").await.is_some());
    }

    #[tokio::test]
    async fn test_cached_projects_are_not_rewritten() {
        let fixture = Fixture::new();
        fixture.cache.put_file("jdoe_data.json", b"{}").await;
        fixture.cache.put_file("jdoe_projects.json", b"[]").await;

        let pipeline = fixture.pipeline();
        let activities = pipeline.extract().await.unwrap();
        let report = pipeline.transform(activities).await.unwrap();
        assert!(!report.members[0].projects_fresh);

        pipeline.load(report).await.unwrap();
        assert_eq!(
            fixture.cache.get_file("jdoe_projects.json").await.unwrap(),
            b"[]"
        );
    }
}
