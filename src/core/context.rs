//! Run context - working directory, secrets and placeholder rendering

use crate::core::event::TriggerEvent;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

/// Secret holding the JS registry auth token
pub const NPM_TOKEN: &str = "npm_token";
/// Secret holding the Python package-index auth token
pub const PYPI_TOKEN: &str = "pypi_token";
/// Secret holding the hosting platform token (used for pushing)
pub const GITHUB_TOKEN: &str = "github_token";

/// Environment variables secrets are read from
const SECRET_ENV_VARS: [(&str, &str); 3] = [
    (NPM_TOKEN, "NPM_TOKEN"),
    (PYPI_TOKEN, "PYPI_TOKEN"),
    (GITHUB_TOKEN, "GITHUB_TOKEN"),
];

/// Errors rendering `{{ ... }}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Secret '{0}' is not set")]
    MissingSecret(String),

    #[error("No value for '{0}' in this run")]
    MissingValue(String),

    #[error("Unknown placeholder '{0}'")]
    UnknownPlaceholder(String),
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// List the placeholder names used in a template
pub fn placeholders(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect()
}

/// Rewrite `{{ name }}` as `{{name}}` so a placeholder survives word splitting
pub fn compact_placeholders(line: &str) -> String {
    placeholder_regex()
        .replace_all(line, "{{${1}}}")
        .into_owned()
}

/// Opaque tokens injected into the run. Values never appear in `Debug` output.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the known secrets from the process environment. Empty values count as unset.
    pub fn from_env() -> Self {
        let mut secrets = Self::new();
        for (name, var) in SECRET_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                secrets.insert(name, value);
            }
        }
        secrets
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Names of the secrets that are present
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Environment variables of known secrets that are not present
    pub fn missing_env_vars(&self) -> Vec<&'static str> {
        SECRET_ENV_VARS
            .iter()
            .filter(|(name, _)| !self.values.contains_key(*name))
            .map(|(_, var)| *var)
            .collect()
    }

    /// Replace every secret value in `text` with `***`
    pub fn redact(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for value in self.values.values() {
            redacted = redacted.replace(value.as_str(), "***");
        }
        redacted
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Ephemeral environment a run executes in
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Repository root; step working directories are relative to it
    pub working_dir: PathBuf,

    /// Source branch of the triggering pull request
    pub branch: String,

    /// Repository slug, when known
    pub repository: Option<String>,

    /// Directory handed to the package manager as its store
    pub cache_dir: PathBuf,

    /// Injected secrets
    pub secrets: Secrets,

    /// Extra environment passed to every command
    pub env: BTreeMap<String, String>,
}

impl RunContext {
    /// Create a context for an event rooted at `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>, event: &TriggerEvent, secrets: Secrets) -> Self {
        Self {
            working_dir: working_dir.into(),
            branch: event.branch.clone(),
            repository: event.repository.clone(),
            cache_dir: default_cache_dir(),
            secrets,
            env: BTreeMap::new(),
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Give the JS package manager a global bin directory on `PATH`
    ///
    /// `pnpm env use --global` refuses to run without `PNPM_HOME`. An
    /// inherited `PNPM_HOME` is kept, otherwise one is placed next to the
    /// package store.
    pub fn with_pnpm_home(mut self, inherited: Option<&str>, path: Option<&str>) -> Self {
        let home = match inherited.filter(|home| !home.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => self
                .cache_dir
                .parent()
                .unwrap_or(&self.cache_dir)
                .join("pnpm-home"),
        };

        let mut dirs: Vec<PathBuf> = path
            .map(|p| std::env::split_paths(p).collect())
            .unwrap_or_default();
        if !dirs.contains(&home) {
            dirs.insert(0, home.clone());
        }
        match std::env::join_paths(&dirs) {
            Ok(joined) => self.set_env("PATH", joined.to_string_lossy()),
            Err(e) => warn!("Not extending PATH with {}: {}", home.display(), e),
        }
        self.set_env("PNPM_HOME", home.display().to_string());
        self
    }

    /// Set an environment variable for every command
    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Resolve a step-relative directory against the repository root
    pub fn resolve_dir(&self, dir: Option<&Path>) -> PathBuf {
        match dir {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => self.working_dir.join(dir),
            None => self.working_dir.clone(),
        }
    }

    /// Whether a placeholder name can ever be resolved
    pub fn is_known_placeholder(name: &str) -> bool {
        matches!(name, "branch" | "repository" | "cache_dir" | "working_dir")
            || name
                .strip_prefix("secrets.")
                .is_some_and(|secret| SECRET_ENV_VARS.iter().any(|(n, _)| *n == secret))
    }

    fn lookup(&self, name: &str) -> Result<String, RenderError> {
        match name {
            "branch" => Ok(self.branch.clone()),
            "repository" => self
                .repository
                .clone()
                .ok_or_else(|| RenderError::MissingValue(name.to_string())),
            "cache_dir" => Ok(self.cache_dir.display().to_string()),
            "working_dir" => Ok(self.working_dir.display().to_string()),
            _ => match name.strip_prefix("secrets.") {
                Some(secret) => self
                    .secrets
                    .get(secret)
                    .map(str::to_string)
                    .ok_or_else(|| RenderError::MissingSecret(secret.to_string())),
                None => Err(RenderError::UnknownPlaceholder(name.to_string())),
            },
        }
    }

    /// Render `{{ name }}` placeholders in a template
    pub fn render(&self, template: &str) -> Result<String, RenderError> {
        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for captures in placeholder_regex().captures_iter(template) {
            let whole = captures.get(0).expect("capture 0 always exists");
            rendered.push_str(&template[last..whole.start()]);
            rendered.push_str(&self.lookup(&captures[1])?);
            last = whole.end();
        }
        rendered.push_str(&template[last..]);

        Ok(rendered)
    }

    /// Replace secret values in text destined for logs or output
    pub fn redact(&self, text: &str) -> String {
        self.secrets.redact(text)
    }
}

/// Cache directory used for the JS package store
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rc-pipeline")
        .join("pnpm-store")
}
