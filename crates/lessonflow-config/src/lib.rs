// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for Lessonflow.
//!
//! TOML files in the XDG hierarchy, environment overrides, strict unknown-key
//! rejection, and miette diagnostics with typo suggestions.
//!
//! ```no_run
//! use lessonflow_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("window: {} days", config.safety.window_days);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LessonflowConfig;

/// Load from files and environment, then validate.
pub fn load_and_validate() -> Result<LessonflowConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load from one file (plus environment), then validate.
pub fn load_and_validate_path(
    path: &std::path::Path,
) -> Result<LessonflowConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|c| vec![(path.display().to_string(), c)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load from a TOML string, then validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<LessonflowConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Contents of every config file that exists, for error spans.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join("lessonflow.toml"))
        .unwrap_or_else(|_| "lessonflow.toml".into());
    let user = dirs::config_dir().map(|d| d.join("lessonflow/lessonflow.toml"));
    let system = std::path::PathBuf::from("/etc/lessonflow/lessonflow.toml");

    [Some(local), user, Some(system)]
        .into_iter()
        .flatten()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
