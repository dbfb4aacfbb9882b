use folio_core::domain::records::{Certificate, Job, Project};
use serde::Serialize;

/// Attribute filters applied to paginated collection reads. Fields that do
/// not apply to a record kind are ignored for that kind.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RecordFilters {
    pub skills: Vec<String>,
    pub featured: Option<bool>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl RecordFilters {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.featured.is_none()
            && self.category.is_none()
            && self.status.is_none()
    }

    pub fn apply_to_projects(&self, projects: Vec<Project>) -> Vec<Project> {
        projects
            .into_iter()
            .filter(|project| self.skills.is_empty() || project.has_all_skills(&self.skills))
            .filter(|project| self.featured.map_or(true, |wanted| project.featured == wanted))
            .filter(|project| {
                self.category
                    .as_deref()
                    .map_or(true, |wanted| project.category.eq_ignore_ascii_case(wanted))
            })
            .filter(|project| {
                self.status.as_deref().map_or(true, |wanted| {
                    project
                        .status
                        .as_deref()
                        .map_or(false, |status| status.eq_ignore_ascii_case(wanted))
                })
            })
            .collect()
    }

    pub fn apply_to_jobs(&self, jobs: Vec<Job>) -> Vec<Job> {
        jobs.into_iter()
            .filter(|job| {
                self.skills.is_empty()
                    || self.skills.iter().all(|wanted| {
                        job.skills.iter().any(|skill| skill.eq_ignore_ascii_case(wanted))
                    })
            })
            // `featured` doubles as a "current position only" switch for jobs.
            .filter(|job| self.featured.map_or(true, |wanted| job.is_current == wanted))
            .collect()
    }

    pub fn apply_to_certificates(&self, certificates: Vec<Certificate>) -> Vec<Certificate> {
        certificates
            .into_iter()
            .filter(|certificate| {
                self.skills.is_empty()
                    || self.skills.iter().all(|wanted| {
                        certificate.skills.iter().any(|skill| skill.eq_ignore_ascii_case(wanted))
                    })
            })
            .filter(|certificate| {
                self.category
                    .as_deref()
                    .map_or(true, |wanted| certificate.field.eq_ignore_ascii_case(wanted))
            })
            .collect()
    }
}

/// Pagination metadata returned alongside every paginated payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Slice `items` by `offset`/`limit`. The offset is clamped into
/// `[0, total]`, and `has_more` is true iff `offset + limit < total`.
pub fn paginate<T: Clone>(items: &[T], limit: usize, offset: usize) -> (Vec<T>, PageInfo) {
    let total = items.len();
    let offset = offset.min(total);
    let page: Vec<T> = items.iter().skip(offset).take(limit).cloned().collect();

    let info = PageInfo { total, limit, offset, has_more: offset + limit < total };
    (page, info)
}
