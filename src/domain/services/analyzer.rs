//! Project detection: groups PRs and calendar events under inferred project
//! names and merges both sources into [`Project`]s.

use crate::domain::model::{
    CalendarEvent, Category, Project, ProjectLink, PullRequest, Quarter,
};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

/// Tried in order; the first capture longer than two characters names the project.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\w+)\s+(?:v2|v3|phase\s+\d+|kickoff|integration|implementation)\b",
        r"(?i)(?:kickoff|review|sync|meeting):\s*([A-Z][a-zA-Z\s]+)",
        r"(?i)([A-Z][a-zA-Z]+)\s+(?:project|initiative|effort)\b",
        r"(?i)([A-Z][a-zA-Z]+)\s+(?:by|from|with)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("project name pattern"))
    .collect()
});

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\b").expect("capitalized phrase pattern")
});

const STOP_WORDS: [&str; 5] = ["the", "and", "for", "with", "from"];

/// Category rules in priority order: keyword categories that select it, then
/// substrings of the project name that select it.
const CATEGORY_RULES: [(Category, &[&str], &[&str]); 6] = [
    (Category::Ai, &["ai"], &["remediation"]),
    (Category::Security, &["security"], &["rbac", "auth"]),
    (Category::Cost, &["cost"], &["finops", "hpa"]),
    (Category::Perf, &["performance", "perf"], &["perf", "optimize"]),
    (
        Category::Infra,
        &["infrastructure", "infra"],
        &["infra", "deployment"],
    ),
    (Category::Team, &["team"], &["interview", "hiring"]),
];

/// Case- and whitespace-insensitive identity of a project name.
pub fn project_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectGroup<T> {
    pub name: String,
    pub items: Vec<T>,
}

/// Items grouped by project, in first-seen order. Names differing only in
/// case or spacing share a group; the first spelling is kept.
#[derive(Debug, Clone)]
pub struct ProjectGroups<T> {
    groups: Vec<ProjectGroup<T>>,
    index: HashMap<String, usize>,
}

impl<T> Default for ProjectGroups<T> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> ProjectGroups<T> {
    pub fn push(&mut self, name: &str, item: T) {
        let key = project_key(name);
        match self.index.get(&key) {
            Some(&i) => self.groups[i].items.push(item),
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(ProjectGroup {
                    name: name.trim().to_string(),
                    items: vec![item],
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProjectGroup<T>> {
        self.index.get(&project_key(name)).map(|&i| &self.groups[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectGroup<T>> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct ProjectAnalyzer {
    /// category -> lowercased keywords
    keywords: BTreeMap<String, Vec<String>>,
}

impl ProjectAnalyzer {
    pub fn new(project_keywords: &BTreeMap<String, Vec<String>>) -> Self {
        let keywords = project_keywords
            .iter()
            .map(|(category, words)| {
                let words = words
                    .iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect();
                (category.clone(), words)
            })
            .collect();
        Self { keywords }
    }

    /// Keyword categories mentioned in `text`, in sorted order.
    pub fn extract_keywords(&self, text: &str) -> BTreeSet<String> {
        if text.is_empty() {
            return BTreeSet::new();
        }
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|(_, words)| words.iter().any(|w| text.contains(w.as_str())))
            .map(|(category, _)| category.clone())
            .collect()
    }

    pub fn detect_project_name(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        for pattern in NAME_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(text) {
                let name = caps[1].trim();
                if name.chars().count() > 2 {
                    return Some(name.to_string());
                }
            }
        }

        CAPITALIZED_PHRASE
            .captures_iter(text)
            .take(3)
            .map(|caps| caps[1].to_string())
            .find(|phrase| {
                phrase.chars().count() > 3 && !STOP_WORDS.contains(&phrase.to_lowercase().as_str())
            })
    }

    pub fn categorize(&self, keywords: &BTreeSet<String>, name: &str) -> Category {
        let name = name.to_lowercase();
        CATEGORY_RULES
            .iter()
            .find(|(_, categories, hints)| {
                categories.iter().any(|c| keywords.contains(*c))
                    || hints.iter().any(|h| name.contains(h))
            })
            .map(|(category, _, _)| *category)
            .unwrap_or(Category::Feature)
    }

    /// Name for text that matched no pattern: the first keyword category, if any.
    fn keyword_project_name(keywords: &BTreeSet<String>) -> Option<String> {
        keywords
            .iter()
            .next()
            .map(|category| format!("{} Initiative", title_case(category)))
    }

    fn name_for(&self, primary: &str, secondary: &str) -> Option<String> {
        self.detect_project_name(primary)
            .or_else(|| self.detect_project_name(secondary))
            .or_else(|| {
                let keywords = self.extract_keywords(&format!("{} {}", primary, secondary));
                Self::keyword_project_name(&keywords)
            })
    }

    /// Every PR lands in a group; unnamed ones go to "Other Work".
    pub fn analyze_prs(&self, prs: &[PullRequest]) -> ProjectGroups<PullRequest> {
        let mut groups = ProjectGroups::default();
        for pr in prs {
            let name = self
                .name_for(&pr.title, &pr.body)
                .unwrap_or_else(|| "Other Work".to_string());
            groups.push(&name, pr.clone());
        }
        groups
    }

    /// Events with neither a detectable name nor a keyword are dropped as generic meetings.
    pub fn analyze_calendar_events(&self, events: &[CalendarEvent]) -> ProjectGroups<CalendarEvent> {
        let mut groups = ProjectGroups::default();
        for event in events {
            let description = event.description.as_deref().unwrap_or_default();
            if let Some(name) = self.name_for(&event.title, description) {
                groups.push(&name, event.clone());
            }
        }
        groups
    }

    /// Joins PR and event groups naming the same project. Output is sorted by name.
    pub fn merge_projects(
        &self,
        pr_groups: &ProjectGroups<PullRequest>,
        event_groups: &ProjectGroups<CalendarEvent>,
    ) -> Vec<Project> {
        let mut names: Vec<&str> = pr_groups.iter().map(|g| g.name.as_str()).collect();
        names.extend(
            event_groups
                .iter()
                .filter(|g| pr_groups.get(&g.name).is_none())
                .map(|g| g.name.as_str()),
        );

        let mut projects: Vec<Project> = names
            .into_iter()
            .filter_map(|name| {
                let prs = pr_groups.get(name).map(|g| g.items.as_slice()).unwrap_or_default();
                let events = event_groups
                    .get(name)
                    .map(|g| g.items.as_slice())
                    .unwrap_or_default();
                self.build_project(name, prs, events)
            })
            .collect();

        projects.sort_by_key(|p| project_key(&p.name));
        projects
    }

    fn build_project(
        &self,
        name: &str,
        prs: &[PullRequest],
        events: &[CalendarEvent],
    ) -> Option<Project> {
        let sample_text = match (prs.first(), events.first()) {
            (Some(pr), _) => format!("{} {}", pr.title, pr.body),
            (None, Some(event)) => format!(
                "{} {}",
                event.title,
                event.description.as_deref().unwrap_or_default()
            ),
            (None, None) => return None,
        };

        let keywords = self.extract_keywords(&sample_text);
        let category = self.categorize(&keywords, name);

        let dates: Vec<NaiveDate> = prs
            .iter()
            .filter_map(PullRequest::created_on)
            .chain(events.iter().filter_map(|e| e.date))
            .collect();
        let start_date = dates.iter().min().copied();
        let end_date = dates.iter().max().copied();

        let github_links = prs
            .iter()
            .filter(|pr| !pr.url.is_empty())
            .map(|pr| ProjectLink {
                text: pr.title.clone(),
                url: pr.url.clone(),
                date: pr.created_on().map(|d| d.to_string()).unwrap_or_default(),
            })
            .collect();
        let calendar_links = events
            .iter()
            .filter(|e| !e.title.is_empty())
            .map(|e| ProjectLink {
                text: e.title.clone(),
                url: "#".to_string(),
                date: e.date.map(|d| d.to_string()).unwrap_or_default(),
            })
            .collect();

        let tags = if keywords.is_empty() {
            vec![category.to_string()]
        } else {
            keywords.into_iter().collect()
        };

        Some(Project {
            name: name.to_string(),
            category,
            start_date,
            end_date,
            quarter: start_date.map(Quarter::of),
            description: self.describe(prs, events, name),
            prs: prs.to_vec(),
            events: events.to_vec(),
            github_links,
            calendar_links,
            tags,
        })
    }

    /// One-line description, at most 100 characters.
    pub fn describe(&self, prs: &[PullRequest], events: &[CalendarEvent], name: &str) -> String {
        let from_pr = prs
            .iter()
            .take(5)
            .map(|pr| pr.title.as_str())
            .find(|title| title.chars().count() > 20);
        let from_event = events
            .iter()
            .take(3)
            .map(|e| e.title.as_str())
            .find(|title| title.chars().count() > 15);

        if let Some(text) = from_pr.or(from_event) {
            return truncate(text, 100);
        }

        let keywords = self.extract_keywords(name);
        if keywords.is_empty() {
            format!("{} project work throughout the year.", name)
        } else {
            let focus: Vec<&str> = keywords.iter().take(2).map(String::as_str).collect();
            format!("{} initiative focusing on {}.", name, focus.join(", "))
        }
    }

    /// PR and calendar grouping followed by the merge.
    pub fn analyze(&self, prs: &[PullRequest], events: &[CalendarEvent]) -> Vec<Project> {
        let pr_groups = self.analyze_prs(prs);
        let event_groups = self.analyze_calendar_events(events);
        tracing::debug!(
            "Detected {} PR groups and {} event groups",
            pr_groups.len(),
            event_groups.len()
        );
        self.merge_projects(&pr_groups, &event_groups)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// `cost_savings` -> `Cost_Savings`
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
