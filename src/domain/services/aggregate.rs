use crate::domain::model::{month_key, Category, Project, Quarter};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

const PROJECTS_PER_TOPIC: usize = 4;
const TOPICS_PER_QUARTER: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterProjects {
    pub quarter: Quarter,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicGroup {
    pub category: Category,
    pub projects: Vec<Project>,
}

impl TopicGroup {
    pub fn activity(&self) -> usize {
        self.projects.iter().map(Project::activity).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuarterTopics {
    pub quarter: Quarter,
    pub topics: Vec<TopicGroup>,
}

/// Buckets projects into Q1..Q4 of `year`. Projects dated outside the year
/// (or undated) land in Q1. Each bucket is ordered by start date, undated first.
pub fn organize_by_quarter(projects: &[Project], year: i32) -> Vec<QuarterProjects> {
    let quarters = Quarter::all(year);
    let mut buckets: Vec<QuarterProjects> = quarters
        .iter()
        .map(|&quarter| QuarterProjects {
            quarter,
            projects: Vec::new(),
        })
        .collect();

    for project in projects {
        let slot = project
            .quarter
            .filter(|q| q.year == year)
            .or_else(|| project.start_date.map(Quarter::of).filter(|q| q.year == year))
            .map(|q| (q.number - 1) as usize)
            .unwrap_or(0);
        buckets[slot].projects.push(project.clone());
    }

    for bucket in &mut buckets {
        bucket.projects.sort_by_key(|p| p.start_date);
    }
    buckets
}

/// Groups a quarter's projects by category, keeping the busiest projects per
/// topic and the busiest topics overall.
pub fn group_by_topic(projects: &[Project]) -> Vec<TopicGroup> {
    let mut groups: Vec<TopicGroup> = Vec::new();
    for project in projects {
        match groups.iter_mut().find(|g| g.category == project.category) {
            Some(group) => group.projects.push(project.clone()),
            None => groups.push(TopicGroup {
                category: project.category,
                projects: vec![project.clone()],
            }),
        }
    }

    for group in &mut groups {
        group
            .projects
            .sort_by_key(|p| std::cmp::Reverse(p.activity()));
        group.projects.truncate(PROJECTS_PER_TOPIC);
    }

    groups.sort_by_key(|g| std::cmp::Reverse(g.activity()));
    groups.truncate(TOPICS_PER_QUARTER);
    groups
}

pub fn quarters_by_topic(projects: &[Project], year: i32) -> Vec<QuarterTopics> {
    organize_by_quarter(projects, year)
        .into_iter()
        .map(|bucket| QuarterTopics {
            quarter: bucket.quarter,
            topics: group_by_topic(&bucket.projects),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCounts {
    /// `YYYY-MM` -> count, covering every month of the year.
    pub counts: BTreeMap<String, usize>,
    /// Largest count, at least 1, for chart scaling.
    pub max: usize,
}

pub fn monthly_counts(dates: impl IntoIterator<Item = NaiveDate>, year: i32) -> MonthlyCounts {
    let mut counts = count_by_month(dates);
    let max = counts.values().copied().max().unwrap_or(0).max(1);
    for month in 1..=12 {
        counts.entry(format!("{}-{:02}", year, month)).or_insert(0);
    }
    MonthlyCounts { counts, max }
}

/// Counts per quarter of `year`; dates in other years are ignored.
pub fn quarter_counts(dates: impl IntoIterator<Item = NaiveDate>, year: i32) -> [usize; 4] {
    let mut counts = [0; 4];
    for date in dates.into_iter().filter(|d| d.year() == year) {
        counts[(Quarter::of(date).number - 1) as usize] += 1;
    }
    counts
}

pub fn count_by_month(dates: impl IntoIterator<Item = NaiveDate>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for date in dates {
        *counts.entry(month_key(date)).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_quarter(dates: impl IntoIterator<Item = NaiveDate>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for date in dates {
        *counts.entry(Quarter::of(date).to_string()).or_insert(0) += 1;
    }
    counts
}
