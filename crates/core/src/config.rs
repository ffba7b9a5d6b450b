//! Configuration management for Compass.
//!
//! Configuration is loaded once at startup and passed explicitly into every
//! constructor; nothing reads the process environment after that. Sources, in
//! increasing precedence:
//! - Built-in defaults
//! - Config file (`.compass/config.yaml` or `COMPASS_CONFIG`)
//! - Environment variables (`COMPASS_*`)
//! - Command-line flags

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Completion providers the factory knows how to build.
pub const COMPLETION_PROVIDERS: &[&str] = &["gemini", "ollama"];

/// Embedding providers the factory knows how to build.
pub const EMBEDDING_PROVIDERS: &[&str] = &["gemini", "ollama", "trigram", "none"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (relative data paths resolve against it)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Explicit API key, used before any provider-specific env var
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Completion backend settings
    pub llm: LlmSettings,

    /// Embedding backend settings
    pub embedding: EmbeddingSettings,

    /// Ingestion and retrieval settings
    pub retrieval: RetrievalSettings,

    /// Conversation memory settings
    pub memory: MemorySettings,
}

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name ("gemini", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash-lite".to_string(),
            endpoint: None,
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            timeout_secs: 60,
        }
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name ("gemini", "ollama", "trigram", "none")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Vector width for providers that let us choose it (trigram)
    pub dimensions: usize,

    /// Maximum texts per backend request
    pub batch_size: usize,

    /// Task type hint sent to providers that accept one
    pub task_type: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-embedding-001".to_string(),
            endpoint: None,
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            dimensions: 384,
            batch_size: 16,
            task_type: "RETRIEVAL_DOCUMENT".to_string(),
            timeout_secs: 30,
        }
    }
}

/// What the index does when a batch arrives with a new vector width.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Discard the old vectors and index only the new batch.
    ///
    /// Fragments stored before the change stay in the store but are no
    /// longer searchable.
    #[default]
    Rebuild,

    /// Re-embed every stored fragment with the current embedder.
    Reembed,
}

/// Ingestion and retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Corpus file (vector index + fragments)
    pub store_path: PathBuf,

    /// Target fragment size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive fragments in characters
    pub chunk_overlap: usize,

    /// Default number of fragments returned by retrieval
    pub top_k: usize,

    /// Behavior on embedding width change
    pub on_dimension_change: DimensionPolicy,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/vector_store.bin"),
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            on_dimension_change: DimensionPolicy::Rebuild,
        }
    }
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MemorySettings {
    /// Directory holding one history file per user key
    pub history_dir: PathBuf,

    /// Messages retained in memory and on disk. Each question and each
    /// answer counts as one message.
    pub max_turns: usize,

    /// Messages included in the prompt history block (two per exchange)
    pub prompt_messages: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from("data/history"),
            max_turns: 20,
            prompt_messages: 10,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    memory: Option<MemorySettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            memory: MemorySettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment variables.
    ///
    /// `workspace` and `config_file` come from the command line. They take
    /// precedence over `COMPASS_WORKSPACE` and `COMPASS_CONFIG` and are applied
    /// before the config file is located, so `<workspace>/.compass/config.yaml`
    /// is read from the requested workspace.
    ///
    /// Environment variables:
    /// - `COMPASS_WORKSPACE`: Override workspace path
    /// - `COMPASS_CONFIG`: Path to config file
    /// - `COMPASS_PROVIDER` / `COMPASS_MODEL`: Completion backend
    /// - `COMPASS_EMBEDDING_PROVIDER` / `COMPASS_EMBEDDING_MODEL`: Embedding backend
    /// - `COMPASS_STORE_PATH`: Corpus file
    /// - `COMPASS_HISTORY_DIR`: History directory
    /// - `COMPASS_API_KEY`: API key for every provider
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use compass_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Store: {:?}", config.store_path());
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        config.workspace = match workspace {
            Some(workspace) => workspace,
            None => std::env::var("COMPASS_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(config.workspace),
        };

        config.config_file = config_file.or_else(|| {
            std::env::var("COMPASS_CONFIG").ok().map(PathBuf::from)
        });

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // An explicitly named file must exist; the workspace default is optional
        match config.config_file.clone() {
            Some(path) => config = config.merge_yaml(&path)?,
            None => {
                let default_path = config.compass_dir().join("config.yaml");
                if default_path.exists() {
                    config = config.merge_yaml(&default_path)?;
                }
            }
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("COMPASS_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("COMPASS_MODEL") {
            config.llm.model = model;
        }

        if let Ok(provider) = std::env::var("COMPASS_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(model) = std::env::var("COMPASS_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(path) = std::env::var("COMPASS_STORE_PATH") {
            config.retrieval.store_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("COMPASS_HISTORY_DIR") {
            config.memory.history_dir = PathBuf::from(dir);
        }

        config.api_key = std::env::var("COMPASS_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    ///
    /// A section present in the file replaces the whole section; fields the
    /// section omits take their defaults.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(memory) = config_file.memory {
            result.memory = memory;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .compass directory.
    pub fn compass_dir(&self) -> PathBuf {
        self.workspace.join(".compass")
    }

    /// Resolved path of the corpus file.
    pub fn store_path(&self) -> PathBuf {
        self.workspace.join(&self.retrieval.store_path)
    }

    /// Resolved history file for a user key.
    ///
    /// Each user gets `chat_history_<user>.json`; no key (or a blank one)
    /// maps to the shared `chat_history.json`.
    pub fn history_path(&self, user: Option<&str>) -> PathBuf {
        let dir = self.workspace.join(&self.memory.history_dir);
        match user.map(sanitize_user_key).filter(|key| !key.is_empty()) {
            Some(key) => dir.join(format!("chat_history_{}.json", key)),
            None => dir.join("chat_history.json"),
        }
    }

    /// API key for the completion backend.
    pub fn resolve_llm_api_key(&self) -> Option<String> {
        self.resolve_api_key(self.llm.api_key_env.as_deref())
    }

    /// API key for the embedding backend.
    pub fn resolve_embedding_api_key(&self) -> Option<String> {
        self.resolve_api_key(self.embedding.api_key_env.as_deref())
    }

    fn resolve_api_key(&self, env_var: Option<&str>) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        env_var
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate the configuration before any backend is constructed.
    pub fn validate(&self) -> AppResult<()> {
        if !COMPLETION_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                COMPLETION_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be at least 1".to_string(),
            ));
        }

        if self.retrieval.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be at least 1".to_string()));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.retrieval.chunk_overlap, self.retrieval.chunk_size
            )));
        }

        if self.memory.max_turns == 0 {
            return Err(AppError::Config("max_turns must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Keep a user key safe to embed in a file name.
fn sanitize_user_key(user: &str) -> String {
    user.trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.embedding.batch_size, 16);
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 100);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.memory.max_turns, 20);
        assert_eq!(config.retrieval.on_dimension_change, DimensionPolicy::Rebuild);
        assert!(!config.verbose);
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.provider, "ollama");
        assert_eq!(overridden.llm.model, "llama3.2");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_history_path_per_user() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/compass");

        assert_eq!(
            config.history_path(Some("alice")),
            PathBuf::from("/srv/compass/data/history/chat_history_alice.json")
        );
        assert_eq!(
            config.history_path(None),
            PathBuf::from("/srv/compass/data/history/chat_history.json")
        );
        assert_eq!(
            config.history_path(Some("   ")),
            PathBuf::from("/srv/compass/data/history/chat_history.json")
        );
        assert_eq!(
            config.history_path(Some("../bob")),
            PathBuf::from("/srv/compass/data/history/chat_history____bob.json")
        );
    }

    #[test]
    fn test_merge_yaml_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
embedding:
  provider: trigram
  dimensions: 64
retrieval:
  chunkSize: 200
  chunkOverlap: 20
  onDimensionChange: reembed
logging:
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.embedding.provider, "trigram");
        assert_eq!(merged.embedding.dimensions, 64);
        assert_eq!(merged.embedding.batch_size, 16);
        assert_eq!(merged.retrieval.chunk_size, 200);
        assert_eq!(merged.retrieval.top_k, 3);
        assert_eq!(merged.retrieval.on_dimension_change, DimensionPolicy::Reembed);
        assert_eq!(merged.llm, LlmSettings::default());
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_reads_requested_workspace_config() {
        let cwd_like = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        for (dir, store) in [(&cwd_like, "x.bin"), (&project, "y.bin")] {
            let compass = dir.path().join(".compass");
            std::fs::create_dir_all(&compass).unwrap();
            std::fs::write(
                compass.join("config.yaml"),
                format!("retrieval:\n  storePath: {}\nmemory:\n  maxTurns: 8\n", store),
            )
            .unwrap();
        }

        let config = AppConfig::load(Some(project.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, project.path());
        assert_eq!(config.store_path(), project.path().join("y.bin"));
        assert_eq!(config.memory.max_turns, 8);
    }

    #[test]
    fn test_load_explicit_config_file() {
        let workspace = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let path = other.path().join("custom.yaml");
        std::fs::write(&path, "retrieval:\n  topK: 7\n").unwrap();

        let config =
            AppConfig::load(Some(workspace.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.store_path(), workspace.path().join("data/vector_store.bin"));
    }

    #[test]
    fn test_load_missing_paths() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(AppConfig::load(Some(missing), None).is_err());

        let missing_file = temp.path().join("absent.yaml");
        assert!(AppConfig::load(Some(temp.path().to_path_buf()), Some(missing_file)).is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_overlap() {
        let mut config = AppConfig::default();
        config.retrieval.chunk_overlap = 500;
        assert!(config.validate().is_err());

        config.retrieval.chunk_overlap = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let mut config = AppConfig::default();
        config.api_key = Some("explicit".to_string());
        config.embedding.api_key_env = Some("COMPASS_TEST_UNSET_KEY_VAR".to_string());
        assert_eq!(config.resolve_embedding_api_key(), Some("explicit".to_string()));
    }
}
