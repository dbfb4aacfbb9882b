use std::fs;
use std::path::PathBuf;

use folio_core::domain::records::{Certificate, Job, Profile, Project};
use folio_core::errors::DataError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Searchable record category exposed to callers of the search surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Projects,
    Jobs,
    Certificates,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Projects, Section::Jobs, Section::Certificates];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Projects => "projects",
            Section::Jobs => "jobs",
            Section::Certificates => "certificates",
        }
    }

    pub fn parse(value: &str) -> Option<Section> {
        match value.trim().to_ascii_lowercase().as_str() {
            "projects" | "project" => Some(Section::Projects),
            "jobs" | "job" | "experience" => Some(Section::Jobs),
            "certificates" | "certificate" => Some(Section::Certificates),
            _ => None,
        }
    }
}

/// One category's worth of search matches, ordered as found on file.
#[derive(Clone, Debug, Serialize)]
pub struct SearchSection {
    pub section: Section,
    pub items: Vec<Value>,
    pub count: usize,
}

/// Read-only repository over the JSON data directory.
#[derive(Clone, Debug)]
pub struct DataStore {
    data_dir: PathBuf,
}

const REQUIRED_FILES: [&str; 3] = ["intro.json", "jobs.json", "projects.json"];

impl DataStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &PathBuf {
        &self.data_dir
    }

    /// Load the raw JSON document for a category. Missing file is a
    /// `NotFound`, anything unparseable is `Malformed`; there is no
    /// partial-record recovery.
    pub fn raw(&self, category: &str) -> Result<Value, DataError> {
        let path = self.data_dir.join(format!("{category}.json"));

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(DataError::NotFound { category: category.to_string() });
            }
            Err(source) => {
                return Err(DataError::Io { category: category.to_string(), source });
            }
        };

        let value = serde_json::from_str(&contents)
            .map_err(|source| DataError::Malformed { category: category.to_string(), source })?;
        debug!(event_name = "data.store.loaded", category = %category, "loaded data file");
        Ok(value)
    }

    pub fn profile(&self) -> Result<Profile, DataError> {
        self.load_one("intro")
    }

    pub fn jobs(&self) -> Result<Vec<Job>, DataError> {
        self.load_collection("jobs")
    }

    pub fn projects(&self) -> Result<Vec<Project>, DataError> {
        self.load_collection("projects")
    }

    pub fn new_projects(&self) -> Result<Vec<Project>, DataError> {
        self.load_collection("projects_new")
    }

    pub fn certificates(&self) -> Result<Vec<Certificate>, DataError> {
        self.load_collection("certificates")
    }

    pub fn layout(&self) -> Result<Value, DataError> {
        self.raw("layout")
    }

    pub fn page(&self) -> Result<Value, DataError> {
        self.raw("page")
    }

    pub fn project_by_id(&self, id: &str) -> Result<Option<Project>, DataError> {
        Ok(self.projects()?.into_iter().find(|project| project.id.matches(id)))
    }

    pub fn job_by_id(&self, id: &str) -> Result<Option<Job>, DataError> {
        Ok(self.jobs()?.into_iter().find(|job| job.id.matches(id)))
    }

    pub fn certificate_by_id(&self, id: &str) -> Result<Option<Certificate>, DataError> {
        Ok(self.certificates()?.into_iter().find(|certificate| certificate.id.matches(id)))
    }

    /// Substring search over one section's searchable text, capped at `limit`.
    /// A section whose backing file is missing yields an empty result rather
    /// than an error so that one absent file cannot break cross-section search.
    pub fn search_section(
        &self,
        section: Section,
        query: &str,
        limit: usize,
    ) -> Result<SearchSection, DataError> {
        let needle = query.trim().to_lowercase();

        let items: Vec<Value> = match section {
            Section::Projects => collect_matches(self.projects(), |project: &Project| {
                project.searchable_text().contains(&needle)
            })?,
            Section::Jobs => {
                collect_matches(self.jobs(), |job: &Job| job.searchable_text().contains(&needle))?
            }
            Section::Certificates => {
                collect_matches(self.certificates(), |certificate: &Certificate| {
                    certificate.searchable_text().contains(&needle)
                })?
            }
        };

        let items: Vec<Value> = items.into_iter().take(limit).collect();
        let count = items.len();
        Ok(SearchSection { section, items, count })
    }

    /// Report which of the required data files are missing. Used by bootstrap
    /// and the doctor command; absence is a warning, not a startup failure.
    pub fn missing_required_files(&self) -> Vec<String> {
        REQUIRED_FILES
            .iter()
            .filter(|file| !self.data_dir.join(file).exists())
            .map(|file| file.to_string())
            .collect()
    }

    fn load_one<T: DeserializeOwned>(&self, category: &str) -> Result<T, DataError> {
        let value = self.raw(category)?;
        serde_json::from_value(value)
            .map_err(|source| DataError::Malformed { category: category.to_string(), source })
    }

    fn load_collection<T: DeserializeOwned>(&self, category: &str) -> Result<Vec<T>, DataError> {
        let value = self.raw(category)?;

        // Producers ship either a bare array or an object wrapping the array
        // under the category name.
        let array = match value {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => match map.remove(category) {
                Some(inner @ Value::Array(_)) => inner,
                _ => {
                    return Err(DataError::Malformed {
                        category: category.to_string(),
                        source: serde::de::Error::custom(format!(
                            "expected a JSON array or an object with an `{category}` array"
                        )),
                    })
                }
            },
            other => {
                return Err(DataError::Malformed {
                    category: category.to_string(),
                    source: serde::de::Error::custom(format!(
                        "expected a JSON array, got {other}"
                    )),
                })
            }
        };

        serde_json::from_value(array)
            .map_err(|source| DataError::Malformed { category: category.to_string(), source })
    }
}

fn collect_matches<T, F>(records: Result<Vec<T>, DataError>, predicate: F) -> Result<Vec<Value>, DataError>
where
    T: Serialize,
    F: Fn(&T) -> bool,
{
    let records = match records {
        Ok(records) => records,
        Err(error) if error.is_not_found() => Vec::new(),
        Err(error) => return Err(error),
    };

    Ok(records
        .iter()
        .filter(|record| predicate(record))
        .filter_map(|record| serde_json::to_value(record).ok())
        .collect())
}
