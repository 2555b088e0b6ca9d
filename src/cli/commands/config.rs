//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(
    action: &ConfigAction,
    config_path: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let path = config_path
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", redact_keys(&toml_str));
        }

        ConfigAction::Edit => {
            if !path.exists() {
                settings.save_to(&path)?;
                Output::info(&format!("Created default config at {:?}", path));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
            Output::info(&format!("Opening config in {}...", editor));

            match std::process::Command::new(&editor).arg(&path).status() {
                Ok(s) if s.success() => Output::success("Config saved."),
                Ok(_) => Output::warning("Editor exited with non-zero status."),
                Err(e) => {
                    Output::error(&format!("Failed to open editor: {}", e));
                    Output::info(&format!("Config file is at: {:?}", path));
                }
            }
        }

        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Hide configured API keys when printing the config.
fn redact_keys(toml_str: &str) -> String {
    toml_str
        .lines()
        .map(|line| match line.split_once('=') {
            Some((key, _)) if key.trim() == "api_key" => format!("{}= \"***\"", key),
            _ => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
