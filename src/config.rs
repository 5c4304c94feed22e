//! Configuration for genie_core
//!
//! Settings resolve in layers, first hit wins:
//! command-line flag > environment variable > YAML config file > default.
//!
//! Config file (default `~/.config/genie-local/config.yaml`):
//!
//! ```yaml
//! model: llama3
//! shell: /bin/zsh
//! backend: http
//! ollama_url: http://localhost:11434
//! record_history: false
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{GenieError, Result};
use crate::state_store::{default_history_path, default_state_path};

pub const DEFAULT_MODEL: &str = "mistral";
pub const DEFAULT_SHELL: &str = "/bin/bash";
pub const DEFAULT_OLLAMA_BIN: &str = "ollama";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// How the model is reached
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `ollama run <model> <prompt>`
    #[default]
    Cli,
    /// Ollama HTTP API
    Http,
}

impl FromStr for BackendKind {
    type Err = GenieError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(BackendKind::Cli),
            "http" => Ok(BackendKind::Http),
            other => Err(GenieError::Config(format!(
                "unknown backend '{}' (expected cli or http)",
                other
            ))),
        }
    }
}

/// Values read from the YAML config file. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub model: Option<String>,
    pub shell: Option<String>,
    pub backend: Option<BackendKind>,
    pub ollama_bin: Option<String>,
    pub ollama_url: Option<String>,
    pub state_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
    pub record_history: Option<bool>,
}

impl FileConfig {
    /// Read a config file. A missing file yields the empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| GenieError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub shell: Option<String>,
    pub no_history: bool,
    pub config: Option<PathBuf>,
}

/// Fully resolved runtime settings
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub model: String,
    pub shell: String,
    pub backend: BackendKind,
    pub ollama_bin: String,
    pub ollama_url: String,
    pub state_path: PathBuf,
    pub history_path: PathBuf,
    pub record_history: bool,
}

impl Settings {
    /// Resolve settings from the process environment and config file
    pub fn load(overrides: Overrides) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = config_path(&overrides, env);
        let file = FileConfig::load(&path)?;
        Self::resolve(overrides, file, env)
    }

    /// Merge the layers. `env` looks up an environment variable.
    pub fn resolve<F>(overrides: Overrides, file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let backend = match env("GENIE_BACKEND") {
            Some(value) => value.parse()?,
            None => file.backend.unwrap_or_default(),
        };

        Ok(Self {
            model: overrides
                .model
                .or_else(|| env("GENIE_MODEL"))
                .or(file.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            shell: overrides
                .shell
                .or_else(|| env("SHELL"))
                .or(file.shell)
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            backend,
            ollama_bin: env("GENIE_OLLAMA_BIN")
                .or(file.ollama_bin)
                .unwrap_or_else(|| DEFAULT_OLLAMA_BIN.to_string()),
            ollama_url: env("OLLAMA_HOST")
                .or(file.ollama_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            state_path: file.state_path.unwrap_or_else(default_state_path),
            history_path: file.history_path.unwrap_or_else(default_history_path),
            record_history: !overrides.no_history && file.record_history.unwrap_or(true),
        })
    }
}

/// `--config`, then `GENIE_CONFIG`, then the per-user config directory
pub fn config_path<F>(overrides: &Overrides, env: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = &overrides.config {
        return path.clone();
    }
    if let Some(path) = env("GENIE_CONFIG").filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("genie-local")
        .join("config.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(Overrides::default(), FileConfig::default(), env_of(&[])).unwrap();
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.shell, "/bin/bash");
        assert_eq!(settings.backend, BackendKind::Cli);
        assert_eq!(settings.ollama_bin, "ollama");
        assert!(settings.record_history);
        assert!(settings.state_path.ends_with(".genie_local_state.json"));
        assert!(settings.history_path.ends_with(".genie_local_history"));
    }

    #[test]
    fn test_layer_precedence() {
        let file = FileConfig {
            model: Some("from-file".into()),
            shell: Some("/bin/fish".into()),
            ..Default::default()
        };
        let env = env_of(&[("GENIE_MODEL", "from-env"), ("SHELL", "/bin/zsh")]);

        let settings = Settings::resolve(
            Overrides {
                model: Some("from-flag".into()),
                ..Default::default()
            },
            file.clone(),
            &env,
        )
        .unwrap();
        assert_eq!(settings.model, "from-flag");
        assert_eq!(settings.shell, "/bin/zsh");

        let settings = Settings::resolve(Overrides::default(), file, env_of(&[])).unwrap();
        assert_eq!(settings.model, "from-file");
        assert_eq!(settings.shell, "/bin/fish");
    }

    #[test]
    fn test_empty_env_is_unset() {
        let settings = Settings::resolve(
            Overrides::default(),
            FileConfig::default(),
            env_of(&[("GENIE_MODEL", ""), ("SHELL", "  ")]),
        )
        .unwrap();
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.shell, "/bin/bash");
    }

    #[test]
    fn test_no_history_flag_wins() {
        let file = FileConfig {
            record_history: Some(true),
            ..Default::default()
        };
        let overrides = Overrides {
            no_history: true,
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, file, env_of(&[])).unwrap();
        assert!(!settings.record_history);
    }

    #[test]
    fn test_backend_selection() {
        let settings = Settings::resolve(
            Overrides::default(),
            FileConfig::default(),
            env_of(&[("GENIE_BACKEND", "HTTP"), ("OLLAMA_HOST", "127.0.0.1:9999")]),
        )
        .unwrap();
        assert_eq!(settings.backend, BackendKind::Http);
        assert_eq!(settings.ollama_url, "127.0.0.1:9999");

        let err = Settings::resolve(
            Overrides::default(),
            FileConfig::default(),
            env_of(&[("GENIE_BACKEND", "grpc")]),
        )
        .unwrap_err();
        assert!(matches!(err, GenieError::Config(_)));
    }

    #[test]
    fn test_parse_yaml() {
        let file = FileConfig::parse(
            "model: llama3\nbackend: http\nrecord_history: false\nstate_path: /tmp/genie/state.json\n",
        )
        .unwrap();
        assert_eq!(file.model.as_deref(), Some("llama3"));
        assert_eq!(file.backend, Some(BackendKind::Http));
        assert_eq!(file.record_history, Some(false));
        assert_eq!(file.state_path, Some(PathBuf::from("/tmp/genie/state.json")));

        assert!(FileConfig::parse("").unwrap().model.is_none());
        assert!(FileConfig::parse("modle: typo\n").is_err());
    }

    #[test]
    fn test_missing_and_malformed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(FileConfig::load(&missing).unwrap().model.is_none());

        let bad = dir.path().join("bad.yaml");
        fs::write(&bad, "model: [unterminated").unwrap();
        assert!(matches!(FileConfig::load(&bad), Err(GenieError::Config(_))));
    }

    #[test]
    fn test_config_path_precedence() {
        let flag = Overrides {
            config: Some(PathBuf::from("/etc/genie.yaml")),
            ..Default::default()
        };
        assert_eq!(
            config_path(&flag, env_of(&[("GENIE_CONFIG", "/x.yaml")])),
            PathBuf::from("/etc/genie.yaml")
        );
        assert_eq!(
            config_path(&Overrides::default(), env_of(&[("GENIE_CONFIG", "/x.yaml")])),
            PathBuf::from("/x.yaml")
        );
        assert!(config_path(&Overrides::default(), env_of(&[])).ends_with("genie-local/config.yaml"));
    }
}
