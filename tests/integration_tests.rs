use httpmock::prelude::*;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use year_review::domain::model::{Category, Project};
use year_review::{ActivityCollector, EtlEngine, LocalStorage, ReviewPipeline, TeamConfig};

const CALENDAR: &str = "BEGIN:VCALENDAR
VERSION:2.0
PRODID:-//Test//EN
BEGIN:VEVENT
UID:evt-1
SUMMARY:Kickoff: Autoscaler v2 review
DTSTART:20250402T150000Z
DTEND:20250402T160000Z
END:VEVENT
BEGIN:VEVENT
UID:evt-2
SUMMARY:team lunch
DTSTART:20250403T120000Z
END:VEVENT
END:VCALENDAR
";

fn team_config(server: &MockServer, root: &Path) -> TeamConfig {
    let config = json!({
        "team_name": "Platform",
        "year": 2025,
        "github_pat": "ghp_test",
        "repositories": ["acme/api"],
        "calendar_folder": root.join("calendars"),
        "members": [
            { "name": "Jane Doe", "github": "jdoe", "has_calendar": true, "calendar_file": "jdoe.ics" }
        ],
        "project_keywords": { "cost": ["autoscal", "hpa"] },
        "output_dir": root.join("docs"),
        "data_dir": root.join("data").join("raw"),
        "github_api_url": server.base_url(),
        "slack_api_url": server.base_url(),
        "request_delay_ms": 0,
        "max_retries": 1
    });
    TeamConfig::from_json_str(&config.to_string()).unwrap()
}

fn engine(
    config: TeamConfig,
    refresh: bool,
) -> EtlEngine<ReviewPipeline<LocalStorage, TeamConfig, ActivityCollector>> {
    let source = ActivityCollector::from_config(&config).unwrap();
    let cache = LocalStorage::new(&config.data_dir);
    let output = LocalStorage::new(&config.output_dir);
    EtlEngine::new(ReviewPipeline::new(cache, output, config, source).with_refresh(refresh))
}

#[tokio::test]
async fn test_end_to_end_review_and_cached_rerun() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("calendars")).unwrap();
    std::fs::write(root.path().join("calendars").join("jdoe.ics"), CALENDAR).unwrap();

    let server = MockServer::start_async().await;
    let authored = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/search/issues")
                .query_param(
                    "q",
                    "author:jdoe type:pr created:2025-01-01T00:00:00Z..2025-12-31T23:59:59Z",
                )
                .header("authorization", "token ghp_test");
            then.status(200).json_body(json!({
                "total_count": 1,
                "items": [{
                    "number": 7,
                    "title": "Autoscaler v2 rollout",
                    "url": server.url("/repos/acme/api/issues/7"),
                    "html_url": "https://github.com/acme/api/pull/7",
                    "created_at": "2025-04-01T08:00:00Z",
                    "pull_request": { "url": server.url("/repos/acme/api/pulls/7") }
                }]
            }));
        })
        .await;
    let reviewed = server
        .mock_async(|when, then| {
            when.method(GET).path("/search/issues").query_param(
                "q",
                "reviewed-by:jdoe type:pr created:2025-01-01T00:00:00Z..2025-12-31T23:59:59Z",
            );
            then.status(200).json_body(json!({ "total_count": 0, "items": [] }));
        })
        .await;
    let detail = server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/api/pulls/7");
            then.status(200).json_body(json!({
                "number": 7,
                "title": "Autoscaler v2 rollout",
                "body": "Tune HPA thresholds to cut idle spend",
                "state": "closed",
                "created_at": "2025-04-01T08:00:00Z",
                "merged_at": "2025-04-03T08:00:00Z",
                "html_url": "https://github.com/acme/api/pull/7",
                "base": { "repo": { "full_name": "acme/api" } },
                "labels": [],
                "commits": 2,
                "additions": 40,
                "deletions": 10
            }));
        })
        .await;
    let commits = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/acme/api/commits")
                .query_param("author", "jdoe");
            then.status(200).json_body(json!([
                { "sha": "abc123", "commit": { "message": "tune hpa", "author": { "date": "2025-04-02T10:00:00Z" } } }
            ]));
        })
        .await;

    let config = team_config(&server, root.path());
    let index = engine(config.clone(), false).run().await.unwrap();

    authored.assert_hits_async(1).await;
    reviewed.assert_hits_async(1).await;
    detail.assert_hits_async(1).await;
    commits.assert_hits_async(1).await;

    let docs = root.path().join("docs");
    let raw = root.path().join("data").join("raw");
    assert!(index.ends_with("index.html"));
    assert!(docs.join("index.html").is_file());
    assert!(raw.join("jdoe_data.json").is_file());

    let projects: Vec<Project> =
        serde_json::from_slice(&std::fs::read(raw.join("jdoe_projects.json")).unwrap()).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Autoscaler");
    assert_eq!(projects[0].category, Category::Cost);
    assert_eq!(projects[0].prs.len(), 1);
    assert_eq!(projects[0].events.len(), 1);

    let member_page = std::fs::read_to_string(docs.join("jdoe.html")).unwrap();
    assert!(member_page.contains("Jane Doe"));
    assert!(member_page.contains("Autoscaler"));
    assert!(member_page.contains("Q2 2025"));

    let team_page = std::fs::read_to_string(docs.join("index.html")).unwrap();
    assert!(team_page.contains("Platform"));
    assert!(team_page.contains("jdoe.html"));
    assert!(team_page.contains("Authored 1 PRs and reviewed 0 in 2025"));

    // Second run is served from the cache.
    std::fs::remove_file(docs.join("jdoe.html")).unwrap();
    engine(config, false).run().await.unwrap();

    authored.assert_hits_async(1).await;
    detail.assert_hits_async(1).await;
    commits.assert_hits_async(1).await;
    assert!(docs.join("jdoe.html").is_file());
}

#[tokio::test]
async fn test_refresh_collects_again() {
    let root = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    let search = server
        .mock_async(|when, then| {
            when.method(GET).path("/search/issues");
            then.status(200).json_body(json!({ "total_count": 0, "items": [] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/api/commits");
            then.status(200).json_body(json!([]));
        })
        .await;

    let config = team_config(&server, root.path());
    engine(config.clone(), false).run().await.unwrap();
    search.assert_hits_async(2).await;

    engine(config.clone(), false).run().await.unwrap();
    search.assert_hits_async(2).await;

    engine(config, true).run().await.unwrap();
    search.assert_hits_async(4).await;

    // Missing calendar file leaves the member without events.
    let data: serde_json::Value = serde_json::from_slice(
        &std::fs::read(root.path().join("data").join("raw").join("jdoe_data.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(data["calendar"]["total_events"], 0);
}
