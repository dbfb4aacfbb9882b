//! Search orchestration.
//!
//! Combines repository matching across sections with an optional LLM layer.
//! Two result shapes exist: navigation searches ("show me the projects") get
//! a short summary over the matched items, information searches ("what did
//! you build with Python?") get a composed answer. Exactly one of the two is
//! populated. When no provider is reachable both degrade to deterministic
//! text so the endpoint keeps working.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use folio_data::{paginate, DataStore, PageInfo, Section};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classifier::{classify, Classification, MessageType};
use crate::providers::{GenerateOptions, ProviderManager};

/// Number of top picks per section when the literal query matches nothing.
const TOP_PICKS_PER_SECTION: usize = 3;

#[derive(Clone, Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub include_sections: Option<Vec<String>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Navigation,
    Information,
}

/// One matched record, tagged with the section it came from.
#[derive(Clone, Debug, Serialize)]
pub struct SearchHit {
    pub section: Section,
    pub item: Value,
}

/// Navigation result digest: a heading, a short body and the matched entry
/// names grouped by section.
#[derive(Clone, Debug, Serialize)]
pub struct SearchSummary {
    pub title: String,
    pub body: String,
    pub highlights: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    pub items: Vec<SearchHit>,
    pub total_count: usize,
    pub search_type: SearchType,
    pub pagination: PageInfo,
    /// Populated for navigation searches, mutually exclusive with `answer`.
    pub summary: Option<SearchSummary>,
    /// Populated for information searches, mutually exclusive with `summary`.
    pub answer: Option<String>,
    /// True when top picks replaced literal matches or the LLM layer degraded
    /// to deterministic text.
    pub fallback_used: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

pub struct SearchOrchestrator {
    store: DataStore,
    manager: Arc<ProviderManager>,
}

impl SearchOrchestrator {
    pub fn new(store: DataStore, manager: Arc<ProviderManager>) -> Self {
        Self { store, manager }
    }

    /// Run a search. Infallible by design: data errors in one section leave
    /// that section empty, and LLM failures degrade to deterministic text.
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let started = Instant::now();
        let classification = classify(&query.query);
        let sections = self.requested_sections(query);

        // Each section contributes at most `limit` matches; pagination then
        // runs over the combined capped list.
        let mut hits: Vec<SearchHit> = Vec::new();
        for section in &sections {
            match self.store.search_section(*section, &query.query, query.limit) {
                Ok(matched) => hits.extend(
                    matched.items.into_iter().map(|item| SearchHit { section: *section, item }),
                ),
                Err(error) => {
                    warn!(
                        event_name = "search.section_failed",
                        section = section.as_str(),
                        error = %error,
                        "section skipped"
                    );
                }
            }
        }

        let mut fallback_used = false;
        if hits.is_empty() {
            hits = self.top_picks(&sections, query.limit);
            fallback_used = true;
            debug!(
                event_name = "search.top_picks",
                count = hits.len(),
                "no literal matches, serving top picks"
            );
        }

        let total_count = hits.len();
        let (page, pagination) = paginate(&hits, query.limit, query.offset);

        let search_type = resolve_search_type(&query.query, &classification);
        let (summary, answer, llm_degraded) = match search_type {
            SearchType::Navigation => {
                let (summary, degraded) =
                    self.navigation_summary(&query.query, &page, total_count).await;
                (Some(summary), None, degraded)
            }
            SearchType::Information => {
                let (text, degraded) =
                    self.information_answer(&query.query, &page, fallback_used).await;
                (None, Some(text), degraded)
            }
        };

        info!(
            event_name = "search.completed",
            query = %query.query,
            total = total_count,
            search_type = ?search_type,
            fallback = fallback_used || llm_degraded,
            "search complete"
        );

        SearchOutcome {
            items: page,
            total_count,
            search_type,
            pagination,
            summary,
            answer,
            fallback_used: fallback_used || llm_degraded,
            duration: started.elapsed(),
        }
    }

    fn requested_sections(&self, query: &SearchQuery) -> Vec<Section> {
        match &query.include_sections {
            Some(names) => {
                let sections: Vec<Section> =
                    names.iter().filter_map(|name| Section::parse(name)).collect();
                if sections.is_empty() {
                    Section::ALL.to_vec()
                } else {
                    sections
                }
            }
            None => Section::ALL.to_vec(),
        }
    }

    /// Representative items per requested section: featured projects first,
    /// current jobs first, certificates in file order. At most
    /// `min(TOP_PICKS_PER_SECTION, limit)` from each section.
    fn top_picks(&self, sections: &[Section], limit: usize) -> Vec<SearchHit> {
        let per_section = TOP_PICKS_PER_SECTION.min(limit);
        let mut picks = Vec::new();

        for section in sections {
            match section {
                Section::Projects => {
                    if let Ok(mut projects) = self.store.projects() {
                        projects.sort_by_key(|project| !project.featured);
                        picks.extend(projects.into_iter().take(per_section).filter_map(
                            |project| {
                                serde_json::to_value(project)
                                    .ok()
                                    .map(|item| SearchHit { section: *section, item })
                            },
                        ));
                    }
                }
                Section::Jobs => {
                    if let Ok(mut jobs) = self.store.jobs() {
                        jobs.sort_by_key(|job| !job.is_current);
                        picks.extend(jobs.into_iter().take(per_section).filter_map(|job| {
                            serde_json::to_value(job)
                                .ok()
                                .map(|item| SearchHit { section: *section, item })
                        }));
                    }
                }
                Section::Certificates => {
                    if let Ok(certificates) = self.store.certificates() {
                        picks.extend(certificates.into_iter().take(per_section).filter_map(
                            |certificate| {
                                serde_json::to_value(certificate)
                                    .ok()
                                    .map(|item| SearchHit { section: *section, item })
                            },
                        ));
                    }
                }
            }
        }

        picks
    }

    async fn navigation_summary(
        &self,
        query: &str,
        page: &[SearchHit],
        total: usize,
    ) -> (SearchSummary, bool) {
        let digest = bullet_digest(page);
        let title = format!("Search results for \"{query}\"");
        let highlights = highlights_by_section(page);
        let fallback_body = format!("Found {total} matching entries for \"{query}\".");

        if !self.manager.has_available_provider() {
            return (SearchSummary { title, body: fallback_body, highlights }, true);
        }

        let prompt = format!(
            "Summarize these portfolio search results for the query \"{query}\" in one or two \
             sentences:\n{digest}"
        );
        match self.manager.generate_with_fallback(&prompt, None, &GenerateOptions::default()).await
        {
            Ok(response) => (SearchSummary { title, body: response.text, highlights }, false),
            Err(error) => {
                warn!(event_name = "search.summary_degraded", error = %error);
                (SearchSummary { title, body: fallback_body, highlights }, true)
            }
        }
    }

    async fn information_answer(
        &self,
        query: &str,
        page: &[SearchHit],
        matched_nothing: bool,
    ) -> (String, bool) {
        let digest = bullet_digest(page);

        // When top picks stood in for real matches, merge in the profile so a
        // degraded answer still says who the portfolio belongs to.
        let mut fallback = format!("Based on the portfolio, here is what relates to \"{query}\":\n{digest}");
        if matched_nothing {
            if let Ok(profile) = self.store.profile() {
                fallback = format!("{} - {}. {}\n{fallback}", profile.name, profile.title, profile.bio);
            }
        }

        if !self.manager.has_available_provider() {
            return (fallback, true);
        }

        let prompt = format!(
            "Using only the portfolio entries below, answer the question \"{query}\".\n{digest}"
        );
        match self.manager.generate_with_fallback(&prompt, None, &GenerateOptions::default()).await
        {
            Ok(response) => (response.text, false),
            Err(error) => {
                warn!(event_name = "search.answer_degraded", error = %error);
                (fallback, true)
            }
        }
    }
}

/// Navigation if the query reads like a lookup rather than a question:
/// classified as a search request, a `search_*` intent, a leading display
/// verb, or a short phrase naming a section.
fn resolve_search_type(query: &str, classification: &Classification) -> SearchType {
    if classification.message_type == MessageType::SearchRequest {
        return SearchType::Navigation;
    }
    if classification.intent.starts_with("search_") {
        return SearchType::Navigation;
    }

    let lowered = query.trim().to_lowercase();
    const DISPLAY_VERBS: [&str; 5] = ["show", "open", "view", "list", "display"];
    if DISPLAY_VERBS.iter().any(|verb| lowered.starts_with(verb)) {
        return SearchType::Navigation;
    }

    const SECTION_NOUNS: [&str; 6] =
        ["project", "projects", "experience", "jobs", "certificate", "certificates"];
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    if tokens.len() <= 3 && tokens.iter().any(|token| SECTION_NOUNS.contains(token)) {
        return SearchType::Navigation;
    }

    SearchType::Information
}

fn highlights_by_section(page: &[SearchHit]) -> BTreeMap<String, Vec<String>> {
    let mut highlights: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for hit in page {
        let name = hit
            .item
            .get("name")
            .or_else(|| hit.item.get("title"))
            .and_then(Value::as_str)
            .unwrap_or("(unnamed)");
        highlights.entry(hit.section.as_str().to_string()).or_default().push(name.to_string());
    }
    highlights
}

fn bullet_digest(page: &[SearchHit]) -> String {
    page.iter()
        .map(|hit| {
            let name = hit
                .item
                .get("name")
                .or_else(|| hit.item.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("(unnamed)");
            let description = hit
                .item
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            format!("- [{}] {name}: {description}", hit.section.as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
