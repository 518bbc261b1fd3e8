use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{warn, Level};

use crate::docs::cache::DEFAULT_TTL;
use crate::docs::ingest::SourceConfig;
use crate::error::ConfigError;
use crate::rag::rank::KeywordWeights;

/// Process-wide settings read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub admin_ids: HashSet<u64>,
    pub cache_ttl: Duration,
    pub fetch_timeout: Duration,
    pub fetch_delay: Duration,
    pub model_timeout: Duration,
    pub sources_file: Option<PathBuf>,
    pub weights_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/pages"),
            admin_ids: HashSet::new(),
            cache_ttl: DEFAULT_TTL,
            fetch_timeout: Duration::from_secs(20),
            fetch_delay: Duration::from_millis(2000),
            model_timeout: Duration::from_secs(60),
            sources_file: None,
            weights_file: None,
        }
    }
}

/// `LOG_LEVEL`, read before the subscriber exists so everything after it
/// (including settings warnings) is logged.
pub fn log_level_from_env() -> Level {
    parse_log_level(dotenv::var("LOG_LEVEL").ok().as_deref())
}

fn parse_log_level(raw: Option<&str>) -> Level {
    raw.and_then(|raw| Level::from_str(raw.trim()).ok())
        .unwrap_or(Level::DEBUG)
}

/// Comma-separated Discord user ids. Returns the ids and the rejected entries.
fn parse_admin_ids(raw: &str) -> (HashSet<u64>, Vec<String>) {
    let mut ids = HashSet::new();
    let mut rejected = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match entry.parse::<u64>() {
            Ok(id) => {
                ids.insert(id);
            }
            Err(_) => rejected.push(entry.to_string()),
        }
    }
    (ids, rejected)
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str, default: u64| -> u64 {
            match lookup(key) {
                None => default,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %raw, default, "Invalid number, using default");
                    default
                }),
            }
        };

        let (admin_ids, rejected) = parse_admin_ids(&lookup("ADMIN_USER_IDS").unwrap_or_default());
        for entry in &rejected {
            warn!(key = "ADMIN_USER_IDS", value = %entry, "Invalid user id, ignoring");
        }

        Self {
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            admin_ids,
            cache_ttl: Duration::from_secs(parsed("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())),
            fetch_timeout: Duration::from_secs(parsed(
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )),
            fetch_delay: Duration::from_millis(parsed(
                "FETCH_DELAY_MS",
                defaults.fetch_delay.as_millis() as u64,
            )),
            model_timeout: Duration::from_secs(parsed(
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout.as_secs(),
            )),
            sources_file: lookup("SOURCES_FILE").filter(|s| !s.is_empty()).map(PathBuf::from),
            weights_file: lookup("KEYWORD_WEIGHTS_FILE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Configured sources, or the built-in university sites.
    pub fn sources(&self) -> Result<Vec<SourceConfig>, ConfigError> {
        match &self.sources_file {
            Some(path) => load_sources(path),
            None => Ok(SourceConfig::defaults()),
        }
    }

    pub fn keyword_weights(&self) -> Result<KeywordWeights, ConfigError> {
        match &self.weights_file {
            Some(path) => KeywordWeights::from_json_file(path),
            None => Ok(KeywordWeights::default()),
        }
    }
}

fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    let sources: Vec<SourceConfig> =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;

    let mut urls = HashSet::new();
    for source in &sources {
        source.validate()?;
        if !urls.insert(source.url.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "{}: duplicate source url {}",
                display, source.url
            )));
        }
    }
    Ok(sources)
}
