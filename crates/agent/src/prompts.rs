//! Prompt templates and composition.
//!
//! Templates are Tera. Defaults are compiled in; a `prompts.toml` next to the
//! data directory may override any of them by key. Rendering is fail-soft: a
//! template error logs a warning and falls back to the raw template source so
//! that a bad override degrades output quality instead of failing requests.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use folio_data::DataStore;
use tera::{Context, Tera};
use tracing::{debug, warn};

use crate::classifier::Classification;

const BASE_CONTEXT: &str = "\
You are a helpful assistant for a personal portfolio website. You answer \
questions about the owner's projects, work experience, skills and \
certifications using only the context provided below.\n\
Message type: {{ message_type }}\n\
Intent: {{ intent }}\n\
Keywords: {{ keywords }}\n\n{{ context }}";

const SYSTEM_MESSAGE: &str = "\
Answer concisely and factually. If the context does not contain the answer, \
say so rather than inventing details.";

const FALLBACK: &str = "\
If you are unsure, suggest the visitor browse the portfolio sections or use \
the contact information.";

const QUESTION_PROJECT: &str = "\
Relevant projects:\n{{ projects }}\n";

const QUESTION_EXPERIENCE: &str = "\
Work experience:\n{{ jobs }}\n";

const QUESTION_CERTIFICATE: &str = "\
Certifications:\n{{ certificates }}\n";

const SEARCH_REQUEST: &str = "\
The visitor is searching the portfolio. Matching entries:\n{{ results }}\n\
Summarize what was found and how it relates to the request.";

const DEFAULT_TEMPLATES: [(&str, &str); 7] = [
    ("base_context", BASE_CONTEXT),
    ("system_message", SYSTEM_MESSAGE),
    ("fallback", FALLBACK),
    ("question_project", QUESTION_PROJECT),
    ("question_experience", QUESTION_EXPERIENCE),
    ("question_certificate", QUESTION_CERTIFICATE),
    ("search_request", SEARCH_REQUEST),
];

/// Named prompt templates with fail-soft rendering.
pub struct PromptLibrary {
    tera: Tera,
    sources: HashMap<String, String>,
}

impl PromptLibrary {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        let mut sources = HashMap::new();

        for (name, source) in DEFAULT_TEMPLATES {
            if let Err(error) = tera.add_raw_template(name, source) {
                warn!(
                    event_name = "prompts.template_invalid",
                    template = name,
                    error = %error,
                    "built-in template failed to parse"
                );
            }
            sources.insert(name.to_string(), source.to_string());
        }

        Self { tera, sources }
    }

    /// Layer overrides from a `prompts.toml` file of `key = "template"`
    /// pairs. Unknown keys are accepted; unreadable files are ignored with a
    /// warning.
    pub fn with_overrides(mut self, path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return self,
            Err(error) => {
                warn!(
                    event_name = "prompts.overrides_unreadable",
                    path = %path.display(),
                    error = %error,
                    "skipping prompt overrides"
                );
                return self;
            }
        };

        let table: toml::Table = match contents.parse() {
            Ok(table) => table,
            Err(error) => {
                warn!(
                    event_name = "prompts.overrides_invalid",
                    path = %path.display(),
                    error = %error,
                    "skipping prompt overrides"
                );
                return self;
            }
        };

        for (name, value) in table {
            let Some(source) = value.as_str() else { continue };
            if let Err(error) = self.tera.add_raw_template(&name, source) {
                warn!(
                    event_name = "prompts.template_invalid",
                    template = %name,
                    error = %error,
                    "override failed to parse, keeping previous template"
                );
                continue;
            }
            self.sources.insert(name, source.to_string());
        }
        debug!(event_name = "prompts.overrides_loaded", path = %path.display());
        self
    }

    /// Render a template. On any failure the raw template source is returned
    /// instead, so callers always get usable text.
    pub fn render(&self, name: &str, context: &Context) -> String {
        match self.tera.render(name, context) {
            Ok(rendered) => rendered,
            Err(error) => {
                warn!(
                    event_name = "prompts.render_failed",
                    template = name,
                    error = %error,
                    "falling back to raw template source"
                );
                self.sources.get(name).cloned().unwrap_or_default()
            }
        }
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the final prompt for a classified message by combining the system
/// framing, intent-specific portfolio context and the visitor's message.
pub struct PromptComposer {
    library: PromptLibrary,
    store: DataStore,
}

impl PromptComposer {
    pub fn new(library: PromptLibrary, store: DataStore) -> Self {
        Self { library, store }
    }

    /// Compose a provider-agnostic prompt. Context blocks are selected by
    /// intent; a block whose data file cannot be read is skipped, never
    /// fatal.
    pub fn compose(&self, message: &str, classification: &Classification) -> String {
        let mut sections: Vec<String> = Vec::new();

        sections.push(self.library.render("system_message", &Context::new()));

        let keywords: Vec<&str> =
            classification.keywords.iter().map(String::as_str).collect();
        let mut base = Context::new();
        base.insert("message_type", classification.message_type.as_str());
        base.insert("intent", &classification.intent);
        base.insert("keywords", &keywords.join(", "));
        base.insert("context", &self.context_block(classification).unwrap_or_default());
        sections.push(self.library.render("base_context", &base));

        sections.push(self.library.render("fallback", &Context::new()));
        sections.push(format!("Visitor message: {message}"));

        sections.join("\n\n")
    }

    fn context_block(&self, classification: &Classification) -> Option<String> {
        let intent = classification.intent.as_str();

        if intent == "project_inquiry" || intent == "search_projects" {
            return self.render_projects();
        }
        if intent == "experience_inquiry" || intent == "search_experience" {
            return self.render_jobs();
        }
        if intent == "certificate_inquiry" || intent == "search_certificates" {
            return self.render_certificates();
        }
        if intent.starts_with("search") {
            // Generic searches get a cross-section digest.
            let mut parts = Vec::new();
            if let Some(projects) = self.render_projects() {
                parts.push(projects);
            }
            if let Some(jobs) = self.render_jobs() {
                parts.push(jobs);
            }
            if parts.is_empty() {
                return None;
            }
            let mut context = Context::new();
            context.insert("results", &parts.join("\n"));
            return Some(self.library.render("search_request", &context));
        }

        // Conversation and generic questions still get the profile, when
        // present, so the model knows who it is speaking for.
        match self.store.profile() {
            Ok(profile) => Some(format!("{} - {}\n{}", profile.name, profile.title, profile.bio)),
            Err(error) => {
                debug!(event_name = "prompts.context_skipped", error = %error);
                None
            }
        }
    }

    fn render_projects(&self) -> Option<String> {
        let projects = match self.store.projects() {
            Ok(projects) => projects,
            Err(error) => {
                debug!(event_name = "prompts.context_skipped", error = %error);
                return None;
            }
        };
        let mut digest: Vec<String> = projects
            .iter()
            .map(|project| {
                format!(
                    "- {} ({}): {} [{}]",
                    project.name,
                    project.category,
                    project.description,
                    project.skills.join(", ")
                )
            })
            .collect();
        let featured: Vec<&str> = projects
            .iter()
            .filter(|project| project.featured)
            .map(|project| project.name.as_str())
            .collect();
        digest.push(format!(
            "{} projects in total; featured: {}",
            projects.len(),
            if featured.is_empty() { "none".to_string() } else { featured.join(", ") }
        ));
        let mut context = Context::new();
        context.insert("projects", &digest.join("\n"));
        Some(self.library.render("question_project", &context))
    }

    fn render_jobs(&self) -> Option<String> {
        let jobs = match self.store.jobs() {
            Ok(jobs) => jobs,
            Err(error) => {
                debug!(event_name = "prompts.context_skipped", error = %error);
                return None;
            }
        };
        let digest: Vec<String> = jobs
            .iter()
            .map(|job| {
                format!(
                    "- {} at {}{}: {}",
                    job.title,
                    job.company,
                    if job.is_current { " (current)" } else { "" },
                    job.description
                )
            })
            .collect();
        let mut context = Context::new();
        context.insert("jobs", &digest.join("\n"));
        Some(self.library.render("question_experience", &context))
    }

    fn render_certificates(&self) -> Option<String> {
        let certificates = match self.store.certificates() {
            Ok(certificates) => certificates,
            Err(error) => {
                debug!(event_name = "prompts.context_skipped", error = %error);
                return None;
            }
        };
        let digest: Vec<String> = certificates
            .iter()
            .map(|certificate| {
                format!("- {} ({}, {})", certificate.name, certificate.issuer, certificate.field)
            })
            .collect();
        let mut context = Context::new();
        context.insert("certificates", &digest.join("\n"));
        Some(self.library.render("question_certificate", &context))
    }
}
