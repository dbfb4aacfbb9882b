//! Portfolio content routes.
//!
//! Endpoints:
//! - `GET /api/intro`                     — profile document
//! - `GET /api/layout` / `GET /api/page`  — presentation documents
//! - `GET /api/jobs` / `/api/projects` / `/api/projects/new` / `/api/certificates`
//! - `GET /api/projects/{id}` and friends — single-record lookups
//! - `GET /api/{collection}/paginated`    — filtered, paginated reads
//! - `GET /api/search`                    — literal cross-section search
//! - `GET /api/skills`                    — aggregated skill counts
//! - `GET /api/timeline`                  — jobs and certificates, newest first
//! - `GET /api/stats`                     — collection counts
//!
//! Every success is wrapped in the `{success, message, data, timestamp}`
//! envelope; errors are `{detail}` with a matching status code.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use folio_core::domain::records::Job;
use folio_core::errors::DataError;
use folio_data::{paginate, PageInfo, RecordFilters, Section};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub timestamp: String,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: "ok".to_string(),
            data,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn map_data_error(error: DataError) -> ApiError {
    if error.is_not_found() {
        return (StatusCode::NOT_FOUND, Json(ErrorBody { detail: error.to_string() }));
    }
    warn!(event_name = "api.data_error", error = %error, "data read failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { detail: error.to_string() }))
}

fn not_found(what: &str, id: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorBody { detail: format!("{what} `{id}` not found") }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/intro", get(intro))
        .route("/api/layout", get(layout))
        .route("/api/page", get(page))
        .route("/api/jobs", get(jobs))
        .route("/api/jobs/paginated", get(jobs_paginated))
        .route("/api/jobs/{id}", get(job_by_id))
        .route("/api/projects", get(projects))
        .route("/api/projects/new", get(new_projects))
        .route("/api/projects/paginated", get(projects_paginated))
        .route("/api/projects/{id}", get(project_by_id))
        .route("/api/certificates", get(certificates))
        .route("/api/certificates/paginated", get(certificates_paginated))
        .route("/api/certificates/{id}", get(certificate_by_id))
        .route("/api/search", get(search))
        .route("/api/skills", get(skills))
        .route("/api/timeline", get(timeline))
        .route("/api/stats", get(stats))
}

// ---------------------------------------------------------------------------
// Whole-document reads
// ---------------------------------------------------------------------------

async fn intro(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.raw("intro").map(Envelope::ok).map_err(map_data_error)
}

async fn layout(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.layout().map(Envelope::ok).map_err(map_data_error)
}

async fn page(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.page().map(Envelope::ok).map_err(map_data_error)
}

async fn jobs(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.raw("jobs").map(Envelope::ok).map_err(map_data_error)
}

async fn projects(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.raw("projects").map(Envelope::ok).map_err(map_data_error)
}

async fn new_projects(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.raw("projects_new").map(Envelope::ok).map_err(map_data_error)
}

async fn certificates(State(state): State<AppState>) -> Result<Json<Envelope<Value>>, ApiError> {
    state.store.raw("certificates").map(Envelope::ok).map_err(map_data_error)
}

// ---------------------------------------------------------------------------
// Single-record lookups
// ---------------------------------------------------------------------------

async fn project_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let project = state.store.project_by_id(&id).map_err(map_data_error)?;
    match project {
        Some(project) => Ok(Envelope::ok(to_value(&project)?)),
        None => Err(not_found("project", &id)),
    }
}

async fn job_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let job = state.store.job_by_id(&id).map_err(map_data_error)?;
    match job {
        Some(job) => Ok(Envelope::ok(to_value(&job)?)),
        None => Err(not_found("job", &id)),
    }
}

async fn certificate_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Value>>, ApiError> {
    let certificate = state.store.certificate_by_id(&id).map_err(map_data_error)?;
    match certificate {
        Some(certificate) => Ok(Envelope::ok(to_value(&certificate)?)),
        None => Err(not_found("certificate", &id)),
    }
}

fn to_value<T: Serialize>(record: &T) -> Result<Value, ApiError> {
    serde_json::to_value(record).map_err(|error| {
        warn!(event_name = "api.serialize_error", error = %error, "record serialization failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { detail: error.to_string() }))
    })
}

// ---------------------------------------------------------------------------
// Paginated reads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    /// Comma-separated skill list; all must match.
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

fn default_limit() -> usize {
    10
}

impl PageQuery {
    fn filters(&self) -> RecordFilters {
        RecordFilters {
            skills: self
                .skills
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|skill| !skill.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            featured: self.featured,
            category: self.category.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedBody<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
    /// Echo of the filters that shaped this page.
    pub filters: RecordFilters,
}

async fn projects_paginated(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Envelope<PaginatedBody<Value>>>, ApiError> {
    let records = state.store.projects().map_err(map_data_error)?;
    let filtered = query.filters().apply_to_projects(records);
    paginated_body(&filtered, &query)
}

async fn jobs_paginated(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Envelope<PaginatedBody<Value>>>, ApiError> {
    let records = state.store.jobs().map_err(map_data_error)?;
    let filtered = query.filters().apply_to_jobs(records);
    paginated_body(&filtered, &query)
}

async fn certificates_paginated(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Envelope<PaginatedBody<Value>>>, ApiError> {
    let records = state.store.certificates().map_err(map_data_error)?;
    let filtered = query.filters().apply_to_certificates(records);
    paginated_body(&filtered, &query)
}

fn paginated_body<T: Serialize + Clone>(
    filtered: &[T],
    query: &PageQuery,
) -> Result<Json<Envelope<PaginatedBody<Value>>>, ApiError> {
    let (page, pagination) = paginate(filtered, query.limit, query.offset);
    let items: Result<Vec<Value>, ApiError> = page.iter().map(to_value).collect();
    Ok(Envelope::ok(PaginatedBody { items: items?, pagination, filters: query.filters() }))
}

// ---------------------------------------------------------------------------
// Search and aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Comma-separated section names; all sections when absent.
    #[serde(default)]
    pub include_sections: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Skipped within each section before the limit applies.
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchBody {
    pub query: String,
    pub sections: Vec<SectionResult>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SectionResult {
    pub section: Section,
    pub items: Vec<Value>,
    pub count: usize,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Envelope<SearchBody>>, ApiError> {
    let sections: Vec<Section> = match params.include_sections.as_deref() {
        Some(raw) => {
            let parsed: Vec<Section> = raw.split(',').filter_map(Section::parse).collect();
            if parsed.is_empty() {
                Section::ALL.to_vec()
            } else {
                parsed
            }
        }
        None => Section::ALL.to_vec(),
    };

    let mut results = Vec::new();
    let mut total = 0;
    for section in sections {
        let matched = state
            .store
            .search_section(section, &params.q, params.offset + params.limit)
            .map_err(map_data_error)?;
        let items: Vec<Value> = matched.items.into_iter().skip(params.offset).collect();
        let count = items.len();
        total += count;
        results.push(SectionResult { section, items, count });
    }

    Ok(Envelope::ok(SearchBody { query: params.q, sections: results, total }))
}

#[derive(Debug, Serialize)]
pub struct SkillCount {
    pub name: String,
    pub count: usize,
}

async fn skills(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<SkillCount>>>, ApiError> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut tally = |skills: &[String]| {
        for skill in skills {
            *counts.entry(skill.to_lowercase()).or_default() += 1;
        }
    };

    // A missing collection contributes nothing to the aggregate.
    if let Ok(projects) = state.store.projects() {
        projects.iter().for_each(|project| tally(&project.skills));
    }
    if let Ok(jobs) = state.store.jobs() {
        jobs.iter().for_each(|job| tally(&job.skills));
    }
    if let Ok(certificates) = state.store.certificates() {
        certificates.iter().for_each(|certificate| tally(&certificate.skills));
    }

    let mut aggregated: Vec<SkillCount> =
        counts.into_iter().map(|(name, count)| SkillCount { name, count }).collect();
    aggregated.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

    Ok(Envelope::ok(aggregated))
}

/// One chronological event, either a job or a certificate.
#[derive(Debug, Serialize)]
pub struct TimelineEntry {
    pub kind: &'static str,
    pub title: String,
    pub organization: String,
    pub year: Option<i32>,
    pub end_year: Option<i32>,
    pub is_current: bool,
    pub date: Option<String>,
}

async fn timeline(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<TimelineEntry>>>, ApiError> {
    let jobs: Vec<Job> = state.store.jobs().map_err(map_data_error)?;
    let certificates = match state.store.certificates() {
        Ok(certificates) => certificates,
        Err(error) if error.is_not_found() => Vec::new(),
        Err(error) => return Err(map_data_error(error)),
    };

    let mut entries: Vec<TimelineEntry> = jobs
        .into_iter()
        .map(|job| TimelineEntry {
            kind: "job",
            title: job.title,
            organization: job.company,
            year: job.start_year,
            end_year: job.end_year,
            is_current: job.is_current,
            date: None,
        })
        .chain(certificates.into_iter().map(|certificate| TimelineEntry {
            kind: "certificate",
            title: certificate.name,
            organization: certificate.issuer,
            year: leading_year(certificate.date.as_deref()),
            end_year: None,
            is_current: false,
            date: certificate.date,
        }))
        .collect();
    // Newest first; undated entries sink to the end.
    entries.sort_by_key(|entry| std::cmp::Reverse(entry.year.unwrap_or(i32::MIN)));

    Ok(Envelope::ok(entries))
}

/// Year prefix of a certificate date such as `2021-06` or `2021`.
fn leading_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|date| date.get(..4)).and_then(|year| year.parse().ok())
}

#[derive(Debug, Serialize)]
pub struct StatsBody {
    pub projects: usize,
    pub featured_projects: usize,
    pub jobs: usize,
    pub current_jobs: usize,
    pub certificates: usize,
    pub unique_skills: usize,
}

async fn stats(State(state): State<AppState>) -> Result<Json<Envelope<StatsBody>>, ApiError> {
    let projects = state.store.projects().unwrap_or_default();
    let jobs = state.store.jobs().unwrap_or_default();
    let certificates = state.store.certificates().unwrap_or_default();

    let mut skills: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
    for skill in projects
        .iter()
        .flat_map(|p| &p.skills)
        .chain(jobs.iter().flat_map(|j| &j.skills))
        .chain(certificates.iter().flat_map(|c| &c.skills))
    {
        skills.insert(skill.to_lowercase());
    }

    Ok(Envelope::ok(StatsBody {
        featured_projects: projects.iter().filter(|p| p.featured).count(),
        projects: projects.len(),
        current_jobs: jobs.iter().filter(|j| j.is_current).count(),
        jobs: jobs.len(),
        certificates: certificates.len(),
        unique_skills: skills.len(),
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use folio_agent::AiService;
    use folio_core::config::AppConfig;
    use folio_data::DataStore;
    use tempfile::TempDir;

    use crate::bootstrap::AppState;

    use super::{
        intro, job_by_id, project_by_id, projects_paginated, search, skills, stats, timeline,
        PageQuery, SearchParams,
    };

    fn seeded_state() -> (TempDir, AppState) {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("intro.json"),
            r#"{"name": "Ada Lovelace", "title": "Engineer", "bio": "Builds things."}"#,
        )
        .expect("intro");
        fs::write(
            dir.path().join("projects.json"),
            r#"[
                {"id": "p1", "name": "Folio", "description": "Backend", "category": "web", "featured": true, "skills": ["Python", "FastAPI"]},
                {"id": "p2", "name": "Vision", "description": "Classifier", "category": "ml", "skills": ["Python"]},
                {"id": "p3", "name": "Ledger", "description": "Accounting", "category": "web", "skills": ["React"]}
            ]"#,
        )
        .expect("projects");
        fs::write(
            dir.path().join("jobs.json"),
            r#"[
                {"id": 1, "company": "Acme", "title": "Senior Engineer", "isCurrent": true, "skills": ["Python"], "description": "Platform", "startYear": 2022},
                {"id": 2, "company": "Initech", "title": "Engineer", "skills": ["Python"], "description": "Pipelines", "startYear": 2019, "endYear": 2022}
            ]"#,
        )
        .expect("jobs");
        fs::write(
            dir.path().join("certificates.json"),
            r#"[{"id": "c1", "name": "ML Cert", "issuer": "Coursera", "field": "ml", "date": "2021-06", "skills": ["Python"]}]"#,
        )
        .expect("certificates");

        let store = DataStore::new(dir.path());
        let ai = Arc::new(AiService::new(&AppConfig::default().ai, store.clone()));
        (dir, AppState { store, ai })
    }

    fn page_query() -> PageQuery {
        PageQuery {
            limit: 10,
            offset: 0,
            skills: None,
            featured: None,
            category: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn intro_wraps_the_profile_in_the_envelope() {
        let (_dir, state) = seeded_state();
        let body = intro(State(state)).await.expect("intro").0;
        assert!(body.success);
        assert_eq!(body.data.get("name").and_then(|v| v.as_str()), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn missing_category_is_a_404_detail() {
        let (_dir, state) = seeded_state();
        let (status, body) =
            super::layout(State(state)).await.expect_err("layout file is absent");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.0.detail.contains("layout"));
    }

    #[tokio::test]
    async fn unknown_record_id_is_a_404() {
        let (_dir, state) = seeded_state();
        let (status, _) = project_by_id(State(state.clone()), Path("nope".to_string()))
            .await
            .expect_err("no such project");
        assert_eq!(status, StatusCode::NOT_FOUND);

        let body =
            job_by_id(State(state), Path("1".to_string())).await.expect("numeric id lookup").0;
        assert_eq!(body.data.get("company").and_then(|v| v.as_str()), Some("Acme"));
    }

    #[tokio::test]
    async fn paginated_projects_honor_skill_and_featured_filters() {
        let (_dir, state) = seeded_state();
        let query = PageQuery {
            skills: Some("python".to_string()),
            featured: Some(true),
            ..page_query()
        };

        let body =
            projects_paginated(State(state), Query(query)).await.expect("paginated").0;
        assert_eq!(body.data.pagination.total, 1);
        assert_eq!(body.data.items[0].get("name").and_then(|v| v.as_str()), Some("Folio"));
        assert_eq!(body.data.filters.skills, vec!["python".to_string()]);
        assert_eq!(body.data.filters.featured, Some(true));
    }

    #[tokio::test]
    async fn search_spans_sections_and_respects_the_limit() {
        let (_dir, state) = seeded_state();
        let params = SearchParams {
            q: "python".to_string(),
            include_sections: None,
            limit: 10,
            offset: 0,
        };

        let body = search(State(state), Query(params)).await.expect("search").0;
        // Two projects, two jobs, one certificate mention python.
        assert_eq!(body.data.total, 5);
    }

    #[tokio::test]
    async fn search_offset_skips_within_each_section() {
        let (_dir, state) = seeded_state();
        let params = SearchParams {
            q: "python".to_string(),
            include_sections: Some("projects".to_string()),
            limit: 10,
            offset: 1,
        };

        let body = search(State(state), Query(params)).await.expect("search").0;
        // Two project matches, the first skipped.
        assert_eq!(body.data.total, 1);
        assert_eq!(body.data.sections[0].items[0].get("name").and_then(|v| v.as_str()), Some("Vision"));
    }

    #[tokio::test]
    async fn skills_aggregate_across_collections() {
        let (_dir, state) = seeded_state();
        let body = skills(State(state)).await.expect("skills").0;
        let python = body.data.iter().find(|skill| skill.name == "python").expect("python");
        assert_eq!(python.count, 5);
        // Sorted by count descending, python first.
        assert_eq!(body.data[0].name, "python");
    }

    #[tokio::test]
    async fn timeline_merges_jobs_and_certificates_newest_first() {
        let (_dir, state) = seeded_state();
        let body = timeline(State(state)).await.expect("timeline").0;
        // Acme 2022, ML Cert 2021, Initech 2019.
        assert_eq!(body.data[0].organization, "Acme");
        assert_eq!(body.data[1].kind, "certificate");
        assert_eq!(body.data[1].year, Some(2021));
        assert_eq!(body.data[2].organization, "Initech");
    }

    #[tokio::test]
    async fn stats_count_collections_and_unique_skills() {
        let (_dir, state) = seeded_state();
        let body = stats(State(state)).await.expect("stats").0;
        assert_eq!(body.data.projects, 3);
        assert_eq!(body.data.featured_projects, 1);
        assert_eq!(body.data.current_jobs, 1);
        assert_eq!(body.data.unique_skills, 3);
    }
}
