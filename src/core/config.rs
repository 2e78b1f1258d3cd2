//! Configuration management with layered hierarchy
//!
//! Later layers win: built-in defaults, the global user config
//! (`~/.config/udyam/config.yaml`), the workspace config
//! (`.udyam/config.yaml`), then environment variables. Command-line flags are
//! applied on top by the commands themselves.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::workspace::Workspace;

/// Port used when neither `bind` nor `PORT` is set
pub const DEFAULT_PORT: u16 = 4000;

/// udyam configuration
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Form schema file; the embedded default is used when unset
    pub schema: Option<PathBuf>,

    /// Submission database file
    pub database: Option<PathBuf>,

    /// Key required to list submissions
    pub admin_key: Option<String>,

    /// Listen address for `serve`
    pub bind: Option<String>,

    /// Base URL of a remote server for `submit` and `fill`
    pub server: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let workspace = Workspace::discover().ok();
        Self::load_with(workspace.as_ref(), |key| std::env::var(key).ok())
    }

    /// Load with an explicit workspace and environment lookup
    pub fn load_with(
        workspace: Option<&Workspace>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        if let Some(ws) = workspace {
            if let Some(mut local) = Self::read_file(&ws.config_path()) {
                local.schema = local.schema.map(|p| ws.resolve(&p));
                local.database = local.database.map(|p| ws.resolve(&p));
                config.merge(local);
            }
        }

        config.apply_env(env);
        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "udyam")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                return None;
            }
        };
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| env(key).filter(|v| !v.is_empty());

        if let Some(schema) = set("UDYAM_SCHEMA") {
            self.schema = Some(PathBuf::from(schema));
        }
        if let Some(database) = set("UDYAM_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(key) = set("UDYAM_ADMIN_KEY") {
            self.admin_key = Some(key);
        }
        // PORT is the hosting platform convention; an explicit bind wins
        if let Some(port) = set("PORT") {
            self.bind = Some(format!("0.0.0.0:{}", port));
        }
        if let Some(bind) = set("UDYAM_BIND") {
            self.bind = Some(bind);
        }
        if let Some(server) = set("UDYAM_SERVER") {
            self.server = Some(server);
        }
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.admin_key.is_some() {
            self.admin_key = other.admin_key;
        }
        if other.bind.is_some() {
            self.bind = other.bind;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
    }

    /// Listen address, defaulting to localhost
    pub fn bind_address(&self) -> String {
        self.bind
            .clone()
            .unwrap_or_else(|| format!("127.0.0.1:{}", DEFAULT_PORT))
    }

    /// Database path: configured, else the workspace default
    pub fn database_path(&self, workspace: Option<&Workspace>) -> Option<PathBuf> {
        self.database
            .clone()
            .or_else(|| workspace.map(Workspace::default_database_path))
    }
}
