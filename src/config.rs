use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_DATABASE: &str = "ANCHORPOST_DATABASE";
pub const ENV_BACKEND: &str = "ANCHORPOST_BACKEND";
pub const ENV_CHROME: &str = "ANCHORPOST_CHROME";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnchorConfig {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub import: ImportConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Json,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Json => "json",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "json" => Ok(Backend::Json),
            other => Err(format!("unknown storage backend '{}' (expected sqlite or json)", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            path: default_database_path(Backend::Sqlite),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served for paths no route matches
    pub static_dir: Option<PathBuf>,
    /// Include internal error detail in JSON error bodies
    pub expose_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            static_dir: None,
            expose_errors: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Chromium executable; searched on PATH when unset
    pub chrome_path: Option<PathBuf>,
    pub timeout_ms: u64,
    pub max_concurrent: usize,
    pub cache_entries: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            timeout_ms: 30_000,
            max_concurrent: 2,
            cache_entries: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ImportConfig {
    /// Notion export used by seeding and the analyze endpoint
    pub csv_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_secs: 15 * 60,
        }
    }
}

impl AnchorConfig {
    /// Apply `ANCHORPOST_*` overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(backend) = lookup(ENV_BACKEND).filter(|v| !v.is_empty()) {
            let backend: Backend = backend.parse().map_err(anyhow::Error::msg)?;
            if backend != self.storage.backend && self.storage.path == default_database_path(self.storage.backend) {
                self.storage.path = default_database_path(backend);
            }
            self.storage.backend = backend;
        }
        if let Some(path) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(chrome) = lookup(ENV_CHROME).filter(|v| !v.is_empty()) {
            self.render.chrome_path = Some(PathBuf::from(chrome));
        }
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("anchorpost.toml")
}

pub fn default_database_path(backend: Backend) -> PathBuf {
    let file = match backend {
        Backend::Sqlite => "anchorpost.db",
        Backend::Json => "database.json",
    };
    PathBuf::from(".anchorpost").join(file)
}

/// Load the config file (defaults when absent) and apply environment overrides
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnchorConfig> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)?
    } else {
        AnchorConfig::default()
    };
    config.apply_env()?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &AnchorConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".anchorpost/";

    let mut content = String::new();
    if gitignore_path.exists() {
        content = std::fs::read_to_string(&gitignore_path)?;
        if content.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AnchorConfig = toml::from_str("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AnchorConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_BACKEND => Some("json".to_string()),
                ENV_CHROME => Some("/opt/chrome".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.storage.backend, Backend::Json);
        assert_eq!(config.storage.path, default_database_path(Backend::Json));
        assert_eq!(config.render.chrome_path, Some(PathBuf::from("/opt/chrome")));

        config
            .apply_overrides(|key| (key == ENV_DATABASE).then(|| "data/db.json".to_string()))
            .unwrap();
        assert_eq!(config.storage.path, PathBuf::from("data/db.json"));
    }

    #[test]
    fn test_bad_backend_is_rejected() {
        let mut config = AnchorConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_BACKEND).then(|| "postgres".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchorpost.toml");
        let mut config = AnchorConfig::default();
        config.server.port = 4000;

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: AnchorConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.server.port, 4000);
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target").unwrap();
        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target\n.anchorpost/\n");
    }
}
