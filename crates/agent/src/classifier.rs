//! Message classification.
//!
//! Pure and deterministic: the same text always yields the same type, intent,
//! keywords and entities. Pattern groups are evaluated in a fixed order -
//! question, then search, then command - so a message that could match more
//! than one group resolves to the earliest. Empty input is valid and falls
//! through to a low-confidence conversation.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    SearchRequest,
    Statement,
    Command,
    Conversation,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Question => "question",
            MessageType::SearchRequest => "search_request",
            MessageType::Statement => "statement",
            MessageType::Command => "command",
            MessageType::Conversation => "conversation",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Classification {
    pub message_type: MessageType,
    pub confidence: f64,
    pub keywords: BTreeSet<String>,
    pub intent: String,
    pub entities: Map<String, Value>,
    #[serde(serialize_with = "serialize_secs")]
    pub processing_time: Duration,
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

static QUESTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^(what|who|when|where|why|how|which|whose|whom)\s",
        r"\?$",
        r"^(tell me|explain|describe|can you|could you)",
        r"^(is|are|was|were|do|does|did|can|could|should|would|will)\s.*\?",
        r"^(find|search|get|show).*\?",
    ])
});

static SEARCH_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^(find|search|look for|get|show me|list|display)",
        r"^(filter|sort).*(by|with)",
        r"^(containing|related to|about|with skill)",
        r"\b(project|experience|certificate|skill|technology)\b",
    ])
});

static COMMAND_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^(update|change|modify|edit|delete|remove|add|create)",
        r"^(set|configure|enable|disable)",
        r"^(start|stop|restart|run|execute)",
    ])
});

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid pattern"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid pattern")
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|pattern| Regex::new(pattern).expect("valid pattern")).collect()
}

/// Domain vocabulary matched as exact substrings during keyword extraction.
const PORTFOLIO_KEYWORDS: [&str; 36] = [
    "project",
    "projects",
    "experience",
    "job",
    "work",
    "certificate",
    "certificates",
    "skill",
    "skills",
    "education",
    "contact",
    "email",
    "phone",
    "github",
    "linkedin",
    "website",
    "portfolio",
    "resume",
    "technology",
    "framework",
    "language",
    "tool",
    "database",
    "api",
    "web",
    "mobile",
    "data",
    "science",
    "machine",
    "learning",
    "ai",
    "artificial",
    "intelligence",
    "deep",
    "neural",
    "network",
];

const TECHNOLOGY_KEYWORDS: [&str; 28] = [
    "python",
    "javascript",
    "typescript",
    "react",
    "vue",
    "angular",
    "node",
    "express",
    "fastapi",
    "django",
    "flask",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "docker",
    "kubernetes",
    "aws",
    "gcp",
    "azure",
    "tensorflow",
    "pytorch",
    "scikit",
    "pandas",
    "numpy",
    "matplotlib",
    "seaborn",
    "plotly",
];

/// Subset of technologies reported as entities.
const ENTITY_TECHNOLOGIES: [&str; 17] = [
    "python",
    "javascript",
    "react",
    "node",
    "fastapi",
    "django",
    "postgresql",
    "mongodb",
    "docker",
    "kubernetes",
    "aws",
    "gcp",
    "tensorflow",
    "pytorch",
    "scikit",
    "pandas",
    "numpy",
];

const INTERROGATIVES: [&str; 9] =
    ["what", "who", "when", "where", "why", "how", "which", "whose", "whom"];

const ACTION_VERBS: [&str; 5] = ["find", "search", "get", "show", "list"];

/// Classify a message. Never fails; cost is a handful of regex scans.
pub fn classify(message: &str) -> Classification {
    let started = Instant::now();
    let normalized = message.trim().to_lowercase();

    let keywords = extract_keywords(&normalized);
    let message_type = determine_message_type(&normalized);
    let intent = determine_intent(&normalized, message_type);
    let entities = extract_entities(message, &normalized);
    let confidence = calculate_confidence(&normalized, &keywords);

    Classification {
        message_type,
        confidence,
        keywords,
        intent,
        entities,
        processing_time: started.elapsed(),
    }
}

fn determine_message_type(message: &str) -> MessageType {
    if QUESTION_PATTERNS.iter().any(|pattern| pattern.is_match(message)) {
        return MessageType::Question;
    }
    if SEARCH_PATTERNS.iter().any(|pattern| pattern.is_match(message)) {
        return MessageType::SearchRequest;
    }
    if COMMAND_PATTERNS.iter().any(|pattern| pattern.is_match(message)) {
        return MessageType::Command;
    }
    MessageType::Conversation
}

fn determine_intent(message: &str, message_type: MessageType) -> String {
    let contains_any =
        |words: &[&str]| words.iter().any(|word| message.contains(word));

    match message_type {
        MessageType::Question => {
            if contains_any(&["project", "portfolio", "work", "application"]) {
                "project_inquiry"
            } else if contains_any(&["experience", "job", "work", "career"]) {
                "experience_inquiry"
            } else if contains_any(&["certificate", "certification", "course"]) {
                "certificate_inquiry"
            } else if contains_any(&["skill", "technology", "language", "framework"]) {
                "skill_inquiry"
            } else if contains_any(&["contact", "email", "phone", "reach"]) {
                "contact_inquiry"
            } else {
                "general_inquiry"
            }
        }
        MessageType::SearchRequest => {
            if message.contains("project") {
                "search_projects"
            } else if contains_any(&["experience", "job"]) {
                "search_experience"
            } else if message.contains("certificate") {
                "search_certificates"
            } else if message.contains("skill") {
                "search_skills"
            } else {
                "general_search"
            }
        }
        MessageType::Command => "system_command",
        MessageType::Statement | MessageType::Conversation => "general_conversation",
    }
    .to_string()
}

fn extract_keywords(message: &str) -> BTreeSet<String> {
    PORTFOLIO_KEYWORDS
        .iter()
        .chain(TECHNOLOGY_KEYWORDS.iter())
        .filter(|keyword| message.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

fn extract_entities(original: &str, normalized: &str) -> Map<String, Value> {
    let mut entities = Map::new();

    let technologies: Vec<Value> = ENTITY_TECHNOLOGIES
        .iter()
        .filter(|tech| normalized.contains(*tech))
        .map(|tech| Value::String(tech.to_string()))
        .collect();
    if !technologies.is_empty() {
        entities.insert("technologies".to_string(), Value::Array(technologies));
    }

    let years: Vec<Value> = YEAR_PATTERN
        .find_iter(original)
        .map(|found| Value::String(found.as_str().to_string()))
        .collect();
    if !years.is_empty() {
        entities.insert("years".to_string(), Value::Array(years));
    }

    // Scans the original text: the pattern is case-tolerant and addresses can
    // carry uppercase local parts.
    let emails: Vec<Value> = EMAIL_PATTERN
        .find_iter(original)
        .map(|found| Value::String(found.as_str().to_string()))
        .collect();
    if !emails.is_empty() {
        entities.insert("emails".to_string(), Value::Array(emails));
    }

    entities
}

fn calculate_confidence(message: &str, keywords: &BTreeSet<String>) -> f64 {
    let mut confidence = 0.5;

    if message.ends_with('?') {
        confidence += 0.3;
    }
    if INTERROGATIVES[..6].iter().any(|word| message.starts_with(word)) {
        confidence += 0.2;
    }
    if ACTION_VERBS.iter().any(|verb| message.contains(verb)) {
        confidence += 0.2;
    }

    if !keywords.is_empty() {
        confidence += (keywords.len() as f64 * 0.1).min(0.3);
    }

    // Overlaps with the starts-with bonus above for many inputs; the double
    // count is part of the scoring contract and pinned by tests.
    if INTERROGATIVES.iter().any(|word| message.contains(word)) {
        confidence += 0.2;
    }

    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::{classify, MessageType};

    #[test]
    fn question_about_projects_scores_high() {
        let result = classify("What projects have you worked on?");
        assert_eq!(result.message_type, MessageType::Question);
        assert_eq!(result.intent, "project_inquiry");
        assert!(result.confidence >= 0.9, "confidence was {}", result.confidence);
    }

    #[test]
    fn work_questions_are_project_inquiries() {
        // "work" belongs to the project vocabulary, which is checked before
        // the experience vocabulary.
        let result = classify("What work have you done?");
        assert_eq!(result.message_type, MessageType::Question);
        assert_eq!(result.intent, "project_inquiry");
    }

    #[test]
    fn ai_vocabulary_is_extracted_as_keywords() {
        let result = classify("Tell me about your deep neural network and artificial intelligence work");
        for keyword in ["deep", "neural", "network", "artificial", "intelligence"] {
            assert!(result.keywords.contains(keyword), "missing keyword {keyword}");
        }
    }

    #[test]
    fn show_me_resolves_to_search_before_question() {
        let result = classify("Show me your experience with Python");
        assert_eq!(result.message_type, MessageType::SearchRequest);
        assert_eq!(result.intent, "search_experience");
        assert!(result.keywords.contains("python"));
    }

    #[test]
    fn question_mark_alone_guarantees_point_eight() {
        let result = classify("seriously?");
        assert_eq!(result.message_type, MessageType::Question);
        assert!(result.confidence >= 0.8, "confidence was {}", result.confidence);
    }

    #[test]
    fn domain_noun_with_question_mark_is_a_question() {
        // Both the question group and the search group match; question wins
        // because groups are checked in order.
        let result = classify("Do you have any React projects?");
        assert_eq!(result.message_type, MessageType::Question);
    }

    #[test]
    fn imperative_without_domain_nouns_is_a_command() {
        let result = classify("restart the server");
        assert_eq!(result.message_type, MessageType::Command);
        assert_eq!(result.intent, "system_command");
    }

    #[test]
    fn empty_input_is_low_confidence_conversation() {
        let result = classify("");
        assert_eq!(result.message_type, MessageType::Conversation);
        assert_eq!(result.intent, "general_conversation");
        assert!(result.confidence <= 0.5);
        assert!(result.keywords.is_empty());
        assert!(result.entities.is_empty());
    }

    #[test]
    fn classification_is_deterministic() {
        let first = classify("Tell me about your Docker experience in 2022");
        let second = classify("Tell me about your Docker experience in 2022");
        assert_eq!(first.message_type, second.message_type);
        assert_eq!(first.intent, second.intent);
        assert_eq!(first.keywords, second.keywords);
        assert_eq!(first.entities, second.entities);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn entities_capture_technologies_years_and_emails() {
        let result = classify("Contact me at Jane.Doe@example.com about the python work from 2021");
        let entities = &result.entities;

        let technologies = entities.get("technologies").and_then(|v| v.as_array());
        assert!(technologies.is_some_and(|list| list.iter().any(|t| t == "python")));

        let years = entities.get("years").and_then(|v| v.as_array());
        assert!(years.is_some_and(|list| list.iter().any(|y| y == "2021")));

        let emails = entities.get("emails").and_then(|v| v.as_array());
        assert!(emails.is_some_and(|list| list.iter().any(|e| e == "Jane.Doe@example.com")));
    }

    #[test]
    fn year_range_is_bounded() {
        let result = classify("built in 1899 and 2150");
        assert!(result.entities.get("years").is_none());
    }

    #[test]
    fn interrogative_double_count_is_preserved() {
        // "what" both starts the message and appears in it, so the base 0.5
        // picks up 0.3 (trailing ?), 0.2 (starts with), and 0.2 (contains)
        // before clamping.
        let result = classify("what?");
        assert_eq!(result.confidence, 1.0_f64.min(0.5 + 0.3 + 0.2 + 0.2));
    }

    #[test]
    fn keyword_bonus_caps_at_point_three() {
        let few = classify("project");
        let many = classify("project skill certificate contact email phone github");
        // Both are search requests via the domain-noun pattern; the many-
        // keyword message cannot gain more than 0.3 from keyword volume.
        assert!(many.confidence - few.confidence <= 0.3 + f64::EPSILON);
    }
}
