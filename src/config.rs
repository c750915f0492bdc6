use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Path to the JSON catalog (ordered list of movies)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Path to the JSON similarity matrix, rows in catalog order
    #[serde(default = "default_similarity_path")]
    pub similarity_path: String,

    /// TMDB API key. Enrichment is disabled when unset or empty.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Prefix joined with TMDB poster paths
    #[serde(default = "default_tmdb_image_base_url")]
    pub tmdb_image_base_url: String,

    /// Redis connection URL. The metadata cache is disabled when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL of cached metadata entries, in seconds
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,

    /// Per-fetch enrichment timeout, in milliseconds
    #[serde(default = "default_enrichment_timeout_ms")]
    pub enrichment_timeout_ms: u64,

    /// Maximum in-flight metadata fetches, shared by all concurrent requests
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,

    /// Deadline on a single upstream metadata call; must stay below the enrichment timeout
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// Consecutive provider failures before the circuit opens
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,

    /// Seconds the circuit stays open before a trial call
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,

    #[serde(default = "default_recommendations")]
    pub default_recommendations: usize,

    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    #[serde(default = "default_min_score")]
    pub default_min_score: f32,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_catalog_path() -> String {
    "data/movies.json".to_string()
}

fn default_similarity_path() -> String {
    "data/similarity.json".to_string()
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_metadata_cache_ttl_secs() -> u64 {
    86400
}

fn default_enrichment_timeout_ms() -> u64 {
    3000
}

fn default_provider_timeout_ms() -> u64 {
    2000
}

fn default_enrichment_concurrency() -> usize {
    8
}

fn default_breaker_failure_threshold() -> u32 {
    3
}

fn default_breaker_cooldown_secs() -> u64 {
    30
}

fn default_recommendations() -> usize {
    5
}

fn default_max_recommendations() -> usize {
    50
}

fn default_min_score() -> f32 {
    0.1
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Rejects settings the service cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_recommendations == 0 {
            anyhow::bail!("MAX_RECOMMENDATIONS must be at least 1");
        }
        if self.default_recommendations == 0
            || self.default_recommendations > self.max_recommendations
        {
            anyhow::bail!(
                "DEFAULT_RECOMMENDATIONS must be between 1 and {}",
                self.max_recommendations
            );
        }
        if self.provider_timeout_ms >= self.enrichment_timeout_ms {
            anyhow::bail!("PROVIDER_TIMEOUT_MS must be below ENRICHMENT_TIMEOUT_MS");
        }
        if !self.default_min_score.is_finite() {
            anyhow::bail!("DEFAULT_MIN_SCORE must be a finite number");
        }
        Ok(())
    }

    /// TMDB key, treating an empty value as absent
    pub fn tmdb_api_key(&self) -> Option<&str> {
        self.tmdb_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}
