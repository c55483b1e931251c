//! Drops repeated records within a single source. Search APIs return the same
//! PR on several pages and calendar exports repeat events across files.

use crate::domain::model::{CalendarEvent, Commit, PullRequest, Review};
use std::collections::HashSet;
use std::hash::Hash;

fn dedup_by_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

fn change_key(url: &str, repo: &str, number: u64) -> String {
    if url.is_empty() {
        format!("{}#{}", repo, number)
    } else {
        url.to_string()
    }
}

pub fn dedup_prs(prs: Vec<PullRequest>) -> Vec<PullRequest> {
    dedup_by_key(prs, |pr| change_key(&pr.url, &pr.repo, pr.number))
}

pub fn dedup_reviews(reviews: Vec<Review>) -> Vec<Review> {
    dedup_by_key(reviews, |r| change_key(&r.url, &r.repo, r.number))
}

pub fn dedup_commits(commits: Vec<Commit>) -> Vec<Commit> {
    dedup_by_key(commits, |c| c.sha.clone())
}

pub fn dedup_events(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    dedup_by_key(events, |e| {
        let start = e
            .start
            .clone()
            .or_else(|| e.date.map(|d| d.to_string()))
            .unwrap_or_default();
        (e.title.clone(), start)
    })
}
