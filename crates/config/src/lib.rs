use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_backend_command() -> String {
    "goFindCallers".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_root_env() -> String {
    "GOPATH".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Environment variable whose value is sent as the search root.
    #[serde(default = "default_search_root_env")]
    pub search_root_env: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command: default_backend_command(),
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            search_root_env: default_search_root_env(),
            env: HashMap::new(),
        }
    }
}

fn default_results_view_name() -> String {
    "Find Results".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ask for an identifier when nothing is selected instead of giving up.
    #[serde(default)]
    pub prompt_on_empty_selection: bool,
    #[serde(default = "default_results_view_name")]
    pub results_view_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt_on_empty_selection: false,
            results_view_name: default_results_view_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Falls back to `$VISUAL`, then `$EDITOR`.
    #[serde(default)]
    pub command: Option<String>,
}

impl EditorConfig {
    pub fn resolve_command(&self) -> Option<String> {
        self.command
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Global config merged with `<project_root>/.callsite/config.toml`.
    pub fn load_for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load()?;
        match Self::load_project(project_root)? {
            Some(project) => Ok(Self::merge(&global, &project)),
            None => Ok(global),
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callsite")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callsite")
    }

    pub fn results_dir() -> PathBuf {
        Self::data_dir().join("results")
    }

    pub fn ensure_dirs() -> Result<()> {
        std::fs::create_dir_all(Self::config_dir())?;
        std::fs::create_dir_all(Self::results_dir())?;
        Ok(())
    }

    pub fn load_project(project_root: &Path) -> Result<Option<Self>> {
        let path = project_root.join(".callsite").join("config.toml");
        if path.exists() {
            let content =
                std::fs::read_to_string(&path).context("Failed to read project config")?;
            let config: Config =
                toml::from_str(&content).context("Failed to parse project config")?;
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }

    /// Project values win wherever they differ from the defaults.
    pub fn merge(global: &Config, project: &Config) -> Config {
        let backend_defaults = BackendConfig::default();
        let session_defaults = SessionConfig::default();

        let mut env = global.backend.env.clone();
        env.extend(project.backend.env.clone());

        Config {
            backend: BackendConfig {
                command: if project.backend.command != backend_defaults.command {
                    project.backend.command.clone()
                } else {
                    global.backend.command.clone()
                },
                args: if !project.backend.args.is_empty() {
                    project.backend.args.clone()
                } else {
                    global.backend.args.clone()
                },
                timeout_secs: if project.backend.timeout_secs != backend_defaults.timeout_secs {
                    project.backend.timeout_secs
                } else {
                    global.backend.timeout_secs
                },
                search_root_env: if project.backend.search_root_env
                    != backend_defaults.search_root_env
                {
                    project.backend.search_root_env.clone()
                } else {
                    global.backend.search_root_env.clone()
                },
                env,
            },
            session: SessionConfig {
                prompt_on_empty_selection: project.session.prompt_on_empty_selection
                    || global.session.prompt_on_empty_selection,
                results_view_name: if project.session.results_view_name
                    != session_defaults.results_view_name
                {
                    project.session.results_view_name.clone()
                } else {
                    global.session.results_view_name.clone()
                },
            },
            editor: EditorConfig {
                command: project
                    .editor
                    .command
                    .clone()
                    .or_else(|| global.editor.command.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend.command, "goFindCallers");
        assert_eq!(config.backend.search_root_env, "GOPATH");
        assert_eq!(config.backend.timeout_secs, 30);
        assert!(!config.session.prompt_on_empty_selection);
        assert_eq!(config.session.results_view_name, "Find Results");
    }

    #[test]
    fn parses_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            command = "/opt/finder"
            args = ["--stdio"]

            [backend.env]
            GOFLAGS = "-mod=mod"

            [session]
            prompt_on_empty_selection = true
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.command, "/opt/finder");
        assert_eq!(config.backend.args, vec!["--stdio"]);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.backend.env["GOFLAGS"], "-mod=mod");
        assert!(config.session.prompt_on_empty_selection);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend\ncommand = 1").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn load_project_reads_dot_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_project(dir.path()).unwrap().is_none());

        std::fs::create_dir_all(dir.path().join(".callsite")).unwrap();
        std::fs::write(
            dir.path().join(".callsite").join("config.toml"),
            "[backend]\nsearch_root_env = \"PROJECT_ROOT\"\n",
        )
        .unwrap();
        let project = Config::load_project(dir.path()).unwrap().unwrap();
        assert_eq!(project.backend.search_root_env, "PROJECT_ROOT");
    }

    #[test]
    fn merge_prefers_non_default_project_values() {
        let mut global = Config::default();
        global.backend.command = "/usr/bin/finder".into();
        global.backend.timeout_secs = 10;
        global.editor.command = Some("vim".into());
        global.backend.env.insert("A".into(), "global".into());

        let mut project = Config::default();
        project.backend.search_root_env = "WORKSPACE".into();
        project.session.results_view_name = "Callers".into();
        project.backend.env.insert("A".into(), "project".into());

        let merged = Config::merge(&global, &project);
        assert_eq!(merged.backend.command, "/usr/bin/finder");
        assert_eq!(merged.backend.timeout_secs, 10);
        assert_eq!(merged.backend.search_root_env, "WORKSPACE");
        assert_eq!(merged.session.results_view_name, "Callers");
        assert_eq!(merged.editor.command.as_deref(), Some("vim"));
        assert_eq!(merged.backend.env["A"], "project");
    }

    #[test]
    fn explicit_editor_command_wins() {
        let editor = EditorConfig {
            command: Some("hx".into()),
        };
        assert_eq!(editor.resolve_command().as_deref(), Some("hx"));
    }
}
