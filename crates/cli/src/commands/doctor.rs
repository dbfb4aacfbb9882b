use folio_core::config::{AppConfig, LoadOptions};
use folio_data::DataStore;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let store = DataStore::new(config.data.data_dir.clone());
            checks.push(check_required_files(&store));
            checks.push(check_data_parses(&store));
            checks.push(check_provider_keys(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["data_files_present", "data_files_parse", "provider_key_readiness"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_required_files(store: &DataStore) -> DoctorCheck {
    let missing = store.missing_required_files();
    if missing.is_empty() {
        DoctorCheck {
            name: "data_files_present",
            status: CheckStatus::Pass,
            details: format!("all required files found in `{}`", store.data_dir().display()),
        }
    } else {
        DoctorCheck {
            name: "data_files_present",
            status: CheckStatus::Fail,
            details: format!("missing: {}", missing.join(", ")),
        }
    }
}

fn check_data_parses(store: &DataStore) -> DoctorCheck {
    let mut failures = Vec::new();
    if let Err(error) = store.profile() {
        if !error.is_not_found() {
            failures.push(error.to_string());
        }
    }
    if let Err(error) = store.jobs() {
        if !error.is_not_found() {
            failures.push(error.to_string());
        }
    }
    if let Err(error) = store.projects() {
        if !error.is_not_found() {
            failures.push(error.to_string());
        }
    }
    if let Err(error) = store.certificates() {
        if !error.is_not_found() {
            failures.push(error.to_string());
        }
    }

    if failures.is_empty() {
        DoctorCheck {
            name: "data_files_parse",
            status: CheckStatus::Pass,
            details: "all present data files parse".to_string(),
        }
    } else {
        DoctorCheck {
            name: "data_files_parse",
            status: CheckStatus::Fail,
            details: failures.join("; "),
        }
    }
}

fn check_provider_keys(config: &AppConfig) -> DoctorCheck {
    let mut configured = Vec::new();
    if config.ai.groq.has_api_key() {
        configured.push("groq");
    }
    if config.ai.openai.has_api_key() {
        configured.push("openai");
    }
    if config.ai.anthropic.has_api_key() {
        configured.push("anthropic");
    }

    if configured.is_empty() {
        DoctorCheck {
            name: "provider_key_readiness",
            status: CheckStatus::Fail,
            details: "no provider API keys configured; assistant endpoints will be limited"
                .to_string(),
        }
    } else {
        DoctorCheck {
            name: "provider_key_readiness",
            status: CheckStatus::Pass,
            details: format!("keys configured for: {}", configured.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use folio_data::DataStore;
    use tempfile::TempDir;

    use super::{check_data_parses, check_required_files, CheckStatus};

    #[test]
    fn missing_files_fail_the_presence_check() {
        let dir = TempDir::new().expect("tempdir");
        let store = DataStore::new(dir.path());
        let check = check_required_files(&store);
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.contains("intro.json"));
    }

    #[test]
    fn absent_files_do_not_fail_the_parse_check_but_malformed_ones_do() {
        let dir = TempDir::new().expect("tempdir");
        let store = DataStore::new(dir.path());
        assert_eq!(check_data_parses(&store).status, CheckStatus::Pass);

        fs::write(dir.path().join("projects.json"), "{broken").expect("write");
        assert_eq!(check_data_parses(&store).status, CheckStatus::Fail);
    }
}
