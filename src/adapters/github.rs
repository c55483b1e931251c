//! GitHub collector: authored PRs, reviewed PRs and commits for one user and year.

use crate::adapters::http::{ApiClient, HttpSettings};
use crate::domain::model::{Commit, GithubActivity, PullRequest, Review};
use crate::domain::services::dedup::{dedup_commits, dedup_prs, dedup_reviews};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;
/// The search API serves at most 1000 results.
const SEARCH_MAX_PAGES: usize = 10;

/// Search endpoints wrap results in `items`; list endpoints return a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum Page<T> {
    Search { items: Vec<T> },
    List(Vec<T>),
}

impl<T> Page<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Page::Search { items } | Page::List(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    html_url: String,
    created_at: Option<DateTime<Utc>>,
    pull_request: Option<PullRequestRef>,
}

impl SearchIssue {
    /// API URL of the pull request behind a search hit.
    fn pull_url(&self) -> Option<String> {
        let url = self
            .pull_request
            .as_ref()
            .and_then(|pr| pr.url.clone())
            .unwrap_or_else(|| self.url.replace("/issues/", "/pulls/"));
        url.contains("/pulls/").then_some(url)
    }
}

#[derive(Debug, Deserialize)]
struct PullRequestRef {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullDetail {
    number: u64,
    #[serde(default)]
    title: String,
    body: Option<String>,
    #[serde(default)]
    state: String,
    created_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    html_url: String,
    base: Option<BaseRef>,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    commits: u64,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct BaseRef {
    repo: Option<RepoRef>,
}

#[derive(Debug, Deserialize)]
struct RepoRef {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

impl From<PullDetail> for PullRequest {
    fn from(detail: PullDetail) -> Self {
        PullRequest {
            number: detail.number,
            title: detail.title,
            body: detail.body.unwrap_or_default(),
            state: detail.state,
            created_at: detail.created_at,
            merged_at: detail.merged_at,
            url: detail.html_url,
            repo: detail
                .base
                .and_then(|b| b.repo)
                .map(|r| r.full_name)
                .unwrap_or_default(),
            labels: detail.labels.into_iter().map(|l| l.name).collect(),
            commits: detail.commits,
            additions: detail.additions,
            deletions: detail.deletions,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReviewItem {
    user: Option<UserRef>,
    state: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    login: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    html_url: Option<String>,
    commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    #[serde(default)]
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    date: Option<DateTime<Utc>>,
}

pub struct GithubCollector {
    api: ApiClient,
    base_url: String,
    year: i32,
}

impl GithubCollector {
    pub fn new(token: &str, base_url: &str, year: i32, settings: HttpSettings) -> Result<Self> {
        let mut headers = vec![
            ("accept", "application/vnd.github.v3+json".to_string()),
            ("user-agent", concat!("year-review/", env!("CARGO_PKG_VERSION")).to_string()),
        ];
        if !token.is_empty() {
            headers.push(("authorization", format!("token {}", token)));
        }

        Ok(Self {
            api: ApiClient::new("GitHub", &headers, settings)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            year,
        })
    }

    fn created_range(&self) -> String {
        format!(
            "{}-01-01T00:00:00Z..{}-12-31T23:59:59Z",
            self.year, self.year
        )
    }

    async fn paginate<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        max_pages: Option<usize>,
    ) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let mut query: Vec<(&str, String)> = params.to_vec();
            query.push(("page", page.to_string()));
            query.push(("per_page", PER_PAGE.to_string()));

            let items = self.api.get_json::<Page<T>, _>(url, &query).await?.into_items();
            let count = items.len();
            all_items.extend(items);

            if count < PER_PAGE || max_pages.is_some_and(|max| page >= max) {
                break;
            }
            page += 1;
            self.api.pause().await;
        }

        Ok(all_items)
    }

    async fn search_prs(&self, qualifier: &str, login: &str) -> Result<Vec<SearchIssue>> {
        let query = format!(
            "{}:{} type:pr created:{}",
            qualifier,
            login,
            self.created_range()
        );
        let url = format!("{}/search/issues", self.base_url);
        self.paginate(
            &url,
            &[
                ("q", query),
                ("sort", "created".to_string()),
                ("order", "asc".to_string()),
            ],
            Some(SEARCH_MAX_PAGES),
        )
        .await
    }

    /// PRs authored by `login` in the year, with per-PR details.
    pub async fn user_prs(&self, login: &str) -> Result<Vec<PullRequest>> {
        tracing::info!("Fetching PRs for {}...", login);
        let hits = self.search_prs("author", login).await?;

        let mut prs = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(pull_url) = hit.pull_url() else {
                continue;
            };
            match self.api.get::<PullDetail>(&pull_url).await {
                Ok(detail) => prs.push(PullRequest::from(detail)),
                Err(e) => tracing::warn!("Error fetching PR {}: {}", hit.number, e),
            }
        }
        Ok(prs)
    }

    /// PRs created in the year on which `login` left at least one review.
    pub async fn user_reviews(&self, login: &str) -> Result<Vec<Review>> {
        tracing::info!("Fetching PR reviews for {}...", login);
        let hits = self.search_prs("reviewed-by", login).await?;
        let repos_prefix = format!("{}/repos/", self.base_url);

        let mut reviewed = Vec::new();
        for hit in hits {
            let Some(pull_url) = hit.pull_url() else {
                continue;
            };
            let Some((repo, number)) = pull_url
                .strip_prefix(&repos_prefix)
                .and_then(|rest| rest.split_once("/pulls/"))
            else {
                continue;
            };

            let reviews_url = format!("{}/repos/{}/pulls/{}/reviews", self.base_url, repo, number);
            let reviews = match self.api.get::<Vec<ReviewItem>>(&reviews_url).await {
                Ok(reviews) => reviews,
                Err(e) => {
                    tracing::warn!("Error fetching reviews for PR {}: {}", hit.number, e);
                    continue;
                }
            };

            let Some(own) = reviews
                .into_iter()
                .find(|r| r.user.as_ref().is_some_and(|u| u.login == login))
            else {
                continue;
            };

            reviewed.push(Review {
                number: hit.number,
                title: hit.title,
                url: hit.html_url,
                repo: repo.to_string(),
                created_at: hit.created_at,
                review_state: own.state,
                reviewed_at: own.submitted_at,
            });
        }
        Ok(reviewed)
    }

    pub async fn repo_commits(&self, repo: &str, login: &str) -> Result<Vec<Commit>> {
        tracing::info!("Fetching commits from {} for {}...", repo, login);
        let url = format!("{}/repos/{}/commits", self.base_url, repo);
        let (since, until) = self
            .created_range()
            .split_once("..")
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .unwrap_or_default();

        let items: Vec<CommitItem> = self
            .paginate(
                &url,
                &[
                    ("author", login.to_string()),
                    ("since", since),
                    ("until", until),
                ],
                None,
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|c| Commit {
                sha: c.sha,
                message: c.commit.message,
                date: c.commit.author.and_then(|a| a.date),
                url: c.html_url,
                repo: repo.to_string(),
            })
            .collect())
    }

    /// Authored and reviewed PRs must succeed; a failing repository only loses its commits.
    pub async fn collect_user_data(&self, login: &str, repos: &[String]) -> Result<GithubActivity> {
        let prs_authored = dedup_prs(self.user_prs(login).await?);
        let prs_reviewed = dedup_reviews(self.user_reviews(login).await?);

        let mut commits = Vec::new();
        for repo in repos {
            match self.repo_commits(repo, login).await {
                Ok(repo_commits) => commits.extend(repo_commits),
                Err(e) => tracing::warn!("Error fetching commits from {}: {}", repo, e),
            }
        }

        Ok(GithubActivity {
            prs_authored,
            prs_reviewed,
            commits: dedup_commits(commits),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn settings() -> HttpSettings {
        HttpSettings {
            request_delay: Duration::ZERO,
            max_retries: 1,
            max_rate_limit_wait: Duration::from_secs(1),
            ..HttpSettings::default()
        }
    }

    fn search_hit(server: &MockServer, repo: &str, number: u64, title: &str) -> serde_json::Value {
        json!({
            "number": number,
            "title": title,
            "url": server.url(format!("/repos/{}/issues/{}", repo, number)),
            "html_url": format!("https://github.com/{}/pull/{}", repo, number),
            "created_at": "2025-03-04T10:00:00Z",
            "pull_request": { "url": server.url(format!("/repos/{}/pulls/{}", repo, number)) }
        })
    }

    #[tokio::test]
    async fn test_user_prs_fetches_details() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search/issues")
                    .query_param("q", "author:octocat type:pr created:2025-01-01T00:00:00Z..2025-12-31T23:59:59Z")
                    .query_param("page", "1")
                    .query_param("per_page", "100");
                then.status(200).json_body(json!({
                    "total_count": 2,
                    "items": [
                        search_hit(&server, "acme/api", 1, "RBAC V2 Implementation"),
                        search_hit(&server, "acme/api", 2, "Broken")
                    ]
                }));
            })
            .await;
        let detail = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/api/pulls/1");
                then.status(200).json_body(json!({
                    "number": 1,
                    "title": "RBAC V2 Implementation",
                    "body": null,
                    "state": "closed",
                    "created_at": "2025-03-04T10:00:00Z",
                    "merged_at": "2025-03-05T10:00:00Z",
                    "html_url": "https://github.com/acme/api/pull/1",
                    "base": { "repo": { "full_name": "acme/api" } },
                    "labels": [{ "name": "security" }],
                    "commits": 3,
                    "additions": 120,
                    "deletions": 4
                }));
            })
            .await;
        let broken = server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/api/pulls/2");
                then.status(404);
            })
            .await;

        let collector = GithubCollector::new("t0ken", &server.base_url(), 2025, settings()).unwrap();
        let prs = collector.user_prs("octocat").await.unwrap();

        search.assert_async().await;
        detail.assert_async().await;
        broken.assert_async().await;
        assert_eq!(prs.len(), 1);
        assert_eq!(prs[0].repo, "acme/api");
        assert_eq!(prs[0].body, "");
        assert_eq!(prs[0].labels, vec!["security"]);
        assert_eq!(prs[0].additions, 120);
        assert!(prs[0].merged_at.is_some());
    }

    #[tokio::test]
    async fn test_user_reviews_keeps_prs_with_own_review() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search/issues")
                    .query_param_exists("q");
                then.status(200).json_body(json!({
                    "items": [
                        search_hit(&server, "acme/web", 10, "Add dashboard"),
                        search_hit(&server, "acme/web", 11, "Fix typo")
                    ]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/web/pulls/10/reviews");
                then.status(200).json_body(json!([
                    { "user": { "login": "someone" }, "state": "COMMENTED", "submitted_at": "2025-05-01T09:00:00Z" },
                    { "user": { "login": "octocat" }, "state": "APPROVED", "submitted_at": "2025-05-02T09:00:00Z" }
                ]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/web/pulls/11/reviews");
                then.status(200).json_body(json!([
                    { "user": { "login": "someone" }, "state": "APPROVED" }
                ]));
            })
            .await;

        let collector = GithubCollector::new("", &server.base_url(), 2025, settings()).unwrap();
        let reviews = collector.user_reviews("octocat").await.unwrap();

        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].number, 10);
        assert_eq!(reviews[0].repo, "acme/web");
        assert_eq!(reviews[0].review_state.as_deref(), Some("APPROVED"));
        assert_eq!(reviews[0].url, "https://github.com/acme/web/pull/10");
    }

    #[tokio::test]
    async fn test_commits_paginate_until_short_page() {
        let server = MockServer::start_async().await;
        let full_page: Vec<serde_json::Value> = (0..100)
            .map(|i| json!({ "sha": format!("sha{}", i), "commit": { "message": "m", "author": { "date": "2025-02-01T00:00:00Z" } } }))
            .collect();
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/commits")
                    .query_param("author", "octocat")
                    .query_param("since", "2025-01-01T00:00:00Z")
                    .query_param("page", "1");
                then.status(200).json_body(json!(full_page));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/api/commits")
                    .query_param("page", "2");
                then.status(200).json_body(json!([
                    { "sha": "last", "html_url": "https://github.com/acme/api/commit/last", "commit": { "message": "done" } }
                ]));
            })
            .await;

        let collector = GithubCollector::new("", &server.base_url(), 2025, settings()).unwrap();
        let commits = collector.repo_commits("acme/api", "octocat").await.unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(commits.len(), 101);
        assert_eq!(commits[100].sha, "last");
        assert_eq!(commits[100].repo, "acme/api");
        assert!(commits[100].date.is_none());
    }

    #[tokio::test]
    async fn test_search_stops_at_result_window() {
        let server = MockServer::start_async().await;
        let hits: Vec<serde_json::Value> = (0..100).map(|i| json!({ "number": i })).collect();
        let search = server
            .mock_async(|when, then| {
                when.method(GET).path("/search/issues");
                then.status(200)
                    .json_body(json!({ "total_count": 5000, "items": hits }));
            })
            .await;

        let collector = GithubCollector::new("", &server.base_url(), 2025, settings()).unwrap();
        let found = collector.search_prs("author", "octocat").await.unwrap();

        assert_eq!(found.len(), 1000);
        search.assert_hits_async(10).await;
    }

    #[tokio::test]
    async fn test_collect_tolerates_failing_repository() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/search/issues");
                then.status(200).json_body(json!({ "total_count": 0, "items": [] }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/repos/acme/private/commits");
                then.status(404).json_body(json!({ "message": "Not Found" }));
            })
            .await;

        let collector = GithubCollector::new("", &server.base_url(), 2025, settings()).unwrap();
        let activity = collector
            .collect_user_data("octocat", &["acme/private".to_string()])
            .await
            .unwrap();

        assert!(activity.prs_authored.is_empty());
        assert!(activity.prs_reviewed.is_empty());
        assert!(activity.commits.is_empty());
    }
}
