//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `MOVIESEARCH_*`
//! env vars (`__` separates nested keys, e.g. `MOVIESEARCH_QUERY__TITLE_BOOST`).
//! Every typed section has defaults, so an absent file yields the stock
//! relevance constants.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Smallest per-thread heap tantivy accepts for an index writer.
pub const MIN_WRITER_HEAP_PER_THREAD: usize = 15_000_000;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("MOVIESEARCH_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The full typed view; sections missing from every provider fall back
    /// to their defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub index: IndexSettings,
    pub query: QuerySettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        self.index.validate()?;
        self.query.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub index_dir: String,
    pub catalog_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            index_dir: "./dev_data/index".to_string(),
            catalog_path: "./dev_data/movies.json".to_string(),
        }
    }
}

/// Knobs for the index session and result shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Total heap handed to the tantivy writer, split across `writer_threads`.
    pub writer_heap_bytes: usize,
    pub writer_threads: usize,
    /// When the writer lock is reported busy, unlink `.tantivy-writer.lock`
    /// and retry once instead of failing with `LockHeld`. The busy lock may
    /// belong to a live writer, in another process or in another session of
    /// this one; both writers then run at once and can drop each other's
    /// commits. Only enable it when a single session writes to the directory.
    pub force_unlock: bool,
    pub snippet_length: usize,
    pub page_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            writer_heap_bytes: 50_000_000,
            writer_threads: 1,
            force_unlock: true,
            snippet_length: 100,
            page_size: 10,
        }
    }
}

impl IndexSettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.writer_threads == 0 {
            return Err(Error::InvalidConfig("index.writer_threads must be at least 1".into()));
        }
        if self.writer_heap_bytes / self.writer_threads < MIN_WRITER_HEAP_PER_THREAD {
            return Err(Error::InvalidConfig(format!(
                "index.writer_heap_bytes must give each of {} threads at least {} bytes",
                self.writer_threads, MIN_WRITER_HEAP_PER_THREAD
            )));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("index.page_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Relevance constants for query construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Weight of title term matches relative to other fields.
    pub title_boost: f32,
    /// Exact-phrase clause boost, multiplied by the token count.
    pub phrase_boost_per_token: f32,
    pub phrase_slop: u32,
    /// Incremental-match clause boost, multiplied by the required match count.
    pub incremental_boost_per_match: f32,
    /// Highest minimum-should-match value that still gets its own clause.
    pub incremental_match_cap: usize,
    /// Edit distance used when a query asks for fuzzy matching with `~`.
    pub fuzzy_distance: u8,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            title_boost: 4.0,
            phrase_boost_per_token: 6.0,
            phrase_slop: 2,
            incremental_boost_per_match: 3.0,
            incremental_match_cap: 5,
            fuzzy_distance: 2,
        }
    }
}

impl QuerySettings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.fuzzy_distance > 2 {
            return Err(Error::InvalidConfig("query.fuzzy_distance must be 0, 1 or 2".into()));
        }
        let boosts = [self.title_boost, self.phrase_boost_per_token, self.incremental_boost_per_match];
        if boosts.iter().any(|b| !b.is_finite() || *b <= 0.0) {
            return Err(Error::InvalidConfig("query boosts must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
