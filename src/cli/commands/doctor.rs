//! Doctor command - verify API keys and configuration.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Studyflow Doctor");
    println!();
    println!("Checking API keys and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = check_api_keys(settings);
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings);
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    for check in [check_config_file(), check_prompts(settings)] {
        check.print();
        checks.push(check);
    }

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Studyflow.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Studyflow is ready to use.");
    }

    Ok(())
}

fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let llm_var = settings.llm.api_key_env.as_str();
    vec![
        match settings.llm_api_key() {
            Some(key) => CheckResult::ok(llm_var, &format!("configured ({})", mask_key(&key))),
            None => CheckResult::error(
                llm_var,
                "not set",
                &format!("Set with: export {}='...' (required for every agent)", llm_var),
            ),
        },
        match settings.search_api_key() {
            Some(key) => {
                CheckResult::ok("TAVILY_API_KEY", &format!("configured ({})", mask_key(&key)))
            }
            None => CheckResult::warning(
                "TAVILY_API_KEY",
                "not set",
                "Book recommendations will rely on the model alone",
            ),
        },
        match settings.youtube_api_key() {
            Some(key) => {
                CheckResult::ok("YOUTUBE_API_KEY", &format!("configured ({})", mask_key(&key)))
            }
            None => CheckResult::warning(
                "YOUTUBE_API_KEY",
                "not set",
                "Videos will be suggested as YouTube search links",
            ),
        },
    ]
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    if !settings.storage.enabled {
        return vec![CheckResult::warning(
            "Database",
            "disabled",
            "Learning history is kept in memory only (storage.enabled = false)",
        )];
    }

    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok("Database", &format!("{} ({})", db_path.display(), size)));
    } else {
        results.push(CheckResult::ok(
            "Database",
            &format!("{} (created on first learning cycle)", db_path.display()),
        ));
    }

    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: studyflow config edit")
    }
}

fn check_prompts(settings: &Settings) -> CheckResult {
    let Some(dir) = settings.prompts.custom_dir.as_deref() else {
        return CheckResult::ok("Prompts", "built-in");
    };
    match Prompts::load(Some(dir), Some(&settings.prompts.variables)) {
        Ok(_) => CheckResult::ok("Prompts", &format!("custom ({})", dir)),
        Err(e) => CheckResult::error("Prompts", &e.to_string(), "Fix or remove prompts.custom_dir"),
    }
}

/// Show only the ends of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_key_is_error() {
        let mut settings = Settings::default();
        settings.llm.api_key_env = "STUDYFLOW_DOCTOR_UNSET".into();
        settings.search.api_key = Some("tvly-1234567890".into());

        let checks = check_api_keys(&settings);
        assert_eq!(checks[0].status, CheckStatus::Error);
        assert_eq!(checks[1].status, CheckStatus::Ok);
        assert_eq!(checks[1].message, "configured (tvly...7890)");
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("AIzaSyExample1234"), "AIza...1234");
    }

    #[test]
    fn test_disabled_storage_warns() {
        let mut settings = Settings::default();
        settings.storage.enabled = false;
        let checks = check_storage(&settings);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, CheckStatus::Warning);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
