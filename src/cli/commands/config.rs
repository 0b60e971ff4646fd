//! Config command - inspect and edit configuration.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use crate::error::FortellError;

/// Run a configuration action.
pub fn run_config(action: &ConfigAction, settings: Settings) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| FortellError::Config(e.to_string()))?;
            println!("{}", toml_str);
        }

        ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }

        ConfigAction::Edit => {
            let config_path = Settings::default_config_path();
            if !config_path.exists() {
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                settings.save_to(&config_path)?;
                Output::info(&format!("Created {}", config_path.display()));
            }

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
            let status = std::process::Command::new(&editor)
                .arg(&config_path)
                .status()?;

            if !status.success() {
                Output::warning("Editor exited with a non-zero status.");
            }
        }
    }

    Ok(())
}
