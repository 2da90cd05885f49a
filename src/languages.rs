//! Language configuration for submission execution

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

/// Language every submission falls back to when the request names none.
/// The platform's problems are written against CPython.
pub const DEFAULT_LANGUAGE: &str = "python";

/// Configuration for a supported language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Name of the file the submission is written to (e.g., "main.py")
    pub source_file: String,
    /// Command used to run it inside the workspace
    pub run_command: Vec<String>,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    source_file: String,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Global language configurations
static LANGUAGES: OnceLock<HashMap<String, LanguageConfig>> = OnceLock::new();

/// Initialize language configurations from the embedded TOML file
pub fn init_languages() -> anyhow::Result<()> {
    let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
    let raw_configs: HashMap<String, RawLanguageConfig> =
        toml::from_str(content).context("Invalid languages.toml")?;

    let mut languages = HashMap::new();

    for (name, raw) in raw_configs {
        let run_command = into_command(&raw.run_command);
        if run_command.is_empty() {
            anyhow::bail!("Empty run command for language {}", name);
        }

        let config = LanguageConfig {
            source_file: raw.source_file,
            run_command,
        };

        // Add main language name
        languages.insert(name.to_lowercase(), config.clone());

        // Add aliases
        for alias in raw.aliases {
            languages.insert(alias.to_lowercase(), config.clone());
        }
    }

    LANGUAGES
        .set(languages)
        .map_err(|_| anyhow::anyhow!("Languages already initialized"))?;

    Ok(())
}

/// Get language configuration by language name
pub fn get_language_config(language: &str) -> Option<LanguageConfig> {
    LANGUAGES.get()?.get(&language.to_lowercase()).cloned()
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shipped_config() {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content).unwrap();

        assert!(raw_configs.contains_key("python"));
        assert_eq!(raw_configs["python"].source_file, "main.py");
        assert!(raw_configs["python"].aliases.contains(&"py".to_string()));
    }

    #[test]
    fn test_into_command_splits_whitespace() {
        assert_eq!(into_command("python3 main.py"), vec!["python3", "main.py"]);
        assert_eq!(into_command("sh  main.sh"), vec!["sh", "main.sh"]);
    }
}
