//! Typed portfolio records.
//!
//! Producers of the backing JSON files are loose about field presence and id
//! types, so every record keeps an open `extra` map for fields the schema does
//! not name, and ids accept both JSON strings and numbers.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Record identifier tolerant of producer-defined JSON (string or number).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(text) => Ok(RecordId(text)),
            Value::Number(number) => Ok(RecordId(number.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "record id must be a string or number, got {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Job {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, alias = "isCurrent")]
    pub is_current: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, alias = "startYear")]
    pub start_year: Option<i32>,
    #[serde(default, alias = "endYear")]
    pub end_year: Option<i32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Project {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Certificate {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Concatenated lowercase text used for substring search.
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {} {}", self.company, self.title, self.description);
        for skill in &self.skills {
            text.push(' ');
            text.push_str(skill);
        }
        text.to_lowercase()
    }
}

impl Project {
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {} {}", self.name, self.description, self.category);
        for skill in &self.skills {
            text.push(' ');
            text.push_str(skill);
        }
        text.to_lowercase()
    }

    pub fn has_all_skills(&self, wanted: &[String]) -> bool {
        wanted.iter().all(|wanted_skill| {
            self.skills.iter().any(|skill| skill.eq_ignore_ascii_case(wanted_skill))
        })
    }
}

impl Certificate {
    pub fn searchable_text(&self) -> String {
        let mut text = format!("{} {} {}", self.name, self.issuer, self.field);
        for skill in &self.skills {
            text.push(' ');
            text.push_str(skill);
        }
        text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::{Job, Project, RecordId};

    #[test]
    fn record_id_accepts_string_and_number() {
        let from_string: RecordId = serde_json::from_str("\"proj-1\"").expect("string id");
        assert!(from_string.matches("proj-1"));

        let from_number: RecordId = serde_json::from_str("42").expect("number id");
        assert!(from_number.matches("42"));

        let from_bool: Result<RecordId, _> = serde_json::from_str("true");
        assert!(from_bool.is_err());
    }

    #[test]
    fn unknown_fields_land_in_extra() {
        let project: Project = serde_json::from_str(
            r#"{"id": "p1", "name": "Folio", "thumbnail": "/projects/folio/cover.png"}"#,
        )
        .expect("project");

        assert_eq!(project.name, "Folio");
        assert!(project.extra.contains_key("thumbnail"));
    }

    #[test]
    fn job_accepts_camel_case_current_flag() {
        let job: Job =
            serde_json::from_str(r#"{"id": 1, "company": "Acme", "isCurrent": true}"#).expect("job");
        assert!(job.is_current);
    }

    #[test]
    fn searchable_text_includes_skills_lowercased() {
        let project: Project = serde_json::from_str(
            r#"{"id": "p1", "name": "Vision", "description": "CV demo", "skills": ["Python", "PyTorch"]}"#,
        )
        .expect("project");

        let text = project.searchable_text();
        assert!(text.contains("python"));
        assert!(text.contains("pytorch"));
        assert!(text.contains("vision"));
    }

    #[test]
    fn skill_filter_is_case_insensitive_and_conjunctive() {
        let project: Project = serde_json::from_str(
            r#"{"id": "p1", "name": "Vision", "skills": ["Python", "Docker"]}"#,
        )
        .expect("project");

        assert!(project.has_all_skills(&["python".to_string()]));
        assert!(project.has_all_skills(&["python".to_string(), "DOCKER".to_string()]));
        assert!(!project.has_all_skills(&["python".to_string(), "react".to_string()]));
    }
}
