//! Configuration management for episcope using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default show: Game of Thrones on IMDb.
pub const DEFAULT_SHOW_ID: &str = "tt0944947";

/// Default number of seasons to scrape.
pub const DEFAULT_SEASONS: u32 = 8;

/// Default cutoff index after which episodes departed from the source material.
pub const DEFAULT_CUTOFF: u32 = 41;

/// Default output directory name.
const OUTPUT_SUBDIR: &str = "episcope";

/// What to do when a single page cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first failed page.
    #[default]
    FailFast,
    /// Record the page as missing and keep going.
    SkipAndContinue,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::SkipAndContinue => "skip-and-continue",
        }
    }
}

/// A roster entry - either a bare search pattern or an explicit key/pattern pair.
///
/// Examples:
/// - `"Sam"` - pattern `Sam`, reported under key `sam`
/// - `{ key = "dany", pattern = "Daenerys" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RosterEntry {
    /// Pattern whose lowercase form is used as the key.
    Pattern(String),
    /// Explicit key and case-sensitive pattern.
    Keyed { key: String, pattern: String },
}

impl RosterEntry {
    /// Key the presence flag is reported under.
    pub fn key(&self) -> String {
        match self {
            RosterEntry::Pattern(p) => p.to_lowercase(),
            RosterEntry::Keyed { key, .. } => key.clone(),
        }
    }

    /// Case-sensitive substring searched for in the synopsis.
    pub fn pattern(&self) -> &str {
        match self {
            RosterEntry::Pattern(p) => p,
            RosterEntry::Keyed { pattern, .. } => pattern,
        }
    }
}

/// Principal characters tracked by default.
pub fn default_roster() -> Vec<RosterEntry> {
    [
        "Jon", "Daenerys", "Tyrion", "Cersei", "Arya", "Sansa", "Bran", "Jaime", "Sam",
    ]
    .iter()
    .map(|name| RosterEntry::Pattern(name.to_string()))
    .collect()
}

/// Where the pages live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Show identifier substituted into `{show}`.
    pub show_id: String,
    /// Base URL used to resolve relative episode links.
    pub base_url: String,
    /// Season listing URL with `{show}` and `{season}` placeholders.
    pub listing_url_template: String,
    /// Path appended to an episode link for its keyword page.
    pub keywords_path: String,
    /// Path appended to an episode link for its credits page.
    pub credits_path: String,
    /// Number of seasons to scrape, starting at 1.
    pub seasons: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            show_id: DEFAULT_SHOW_ID.to_string(),
            base_url: "https://www.imdb.com".to_string(),
            listing_url_template: "https://www.imdb.com/title/{show}/episodes?season={season}"
                .to_string(),
            keywords_path: "keywords".to_string(),
            credits_path: "fullcredits".to_string(),
            seasons: DEFAULT_SEASONS,
        }
    }
}

impl SourceConfig {
    /// Listing URL for a season.
    pub fn listing_url(&self, season: u32) -> String {
        self.listing_url_template
            .replace("{show}", &self.show_id)
            .replace("{season}", &season.to_string())
    }
}

/// CSS selectors for the three page types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per episode on the listing page.
    pub episode_item: String,
    /// Anchor carrying the title and episode link (relative to the item).
    pub title_link: String,
    /// Element carrying the episode number in its `content` attribute or text.
    pub episode_number: String,
    pub air_date: String,
    pub rating: String,
    pub synopsis: String,
    /// Keyword elements on the keyword page.
    pub keyword: String,
    /// Director credit block on the credits page.
    pub director_credit: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            episode_item: "div.list_item".to_string(),
            title_link: "div.info strong a".to_string(),
            episode_number: "meta[itemprop='episodeNumber']".to_string(),
            air_date: "div.airdate".to_string(),
            rating: "span.ipl-rating-star__rating".to_string(),
            synopsis: "div.item_description".to_string(),
            keyword: "div.sodatext a".to_string(),
            director_credit: "#director + table".to_string(),
        }
    }
}

/// Parameters for the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Episodes with a global index above this departed from the source material.
    pub cutoff: u32,
    /// Director name tested by the group comparison.
    pub compare_director: String,
    /// Showrunner whose absence from the credits marks an outside director.
    pub showrunner: String,
    /// Use "showrunner directed" instead of "outside director" in the multiple regression.
    pub complement_outside_director: bool,
    /// Number of terms reported in frequency tables.
    pub top_terms: usize,
    /// Sparsity threshold for pruning the synopsis matrix, in (0, 1].
    pub synopsis_sparsity: f64,
    /// Half-width of the discontinuity window; `None` uses every episode.
    pub discontinuity_bandwidth: Option<f64>,
    /// Additional stopwords removed from both matrices.
    pub extra_stopwords: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
            compare_director: "Neil Marshall".to_string(),
            showrunner: "David Benioff".to_string(),
            complement_outside_director: false,
            top_terms: 15,
            synopsis_sparsity: 0.95,
            discontinuity_bandwidth: None,
            extra_stopwords: Vec::new(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory receiving the table, report and charts.
    pub output_dir: PathBuf,
    /// User agent config: `None`, `"impersonate"` or a custom string.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/episcope/
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let output_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(OUTPUT_SUBDIR);

        Self {
            output_dir,
            user_agent: None,
            request_timeout: 30,
            request_delay_ms: 0,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Settings {
    /// Path of the persisted episode table.
    pub fn table_path(&self) -> PathBuf {
        self.output_dir.join("episodes.csv")
    }

    /// Path of the JSON analysis report.
    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.json")
    }

    /// Directory receiving chart files.
    pub fn charts_dir(&self) -> PathBuf {
        self.output_dir.join("charts")
    }

    /// Ensure the output directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.charts_dir()).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory '{}': {}",
                    self.output_dir.display(),
                    e
                ),
            )
        })
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Output directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Delay between requests in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default = "default_roster")]
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Config with defaults everywhere, including the default roster.
    pub fn with_defaults() -> Self {
        Self {
            roster: default_roster(),
            ..Default::default()
        }
    }

    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers episcope config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("episcope").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring discovered config: {}", e);
                            Self::with_defaults()
                        }
                    }
                } else {
                    Self::with_defaults()
                }
            }
            Err(_) => Self::with_defaults(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration text in the format named by `ext`.
    pub fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "json" => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref output_dir) = self.output_dir {
            settings.output_dir = self.resolve_path(output_dir, base_dir);
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(policy) = self.failure_policy {
            settings.failure_policy = policy;
        }
    }

    /// Render the config as TOML (used by `episcope config`).
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to render config: {}", e))
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Output directory override (--output-dir flag).
    pub output_dir: Option<PathBuf>,
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), String> {
    // Priority 1: explicit --config flag, which must load
    // Priority 2: auto-discovery via prefer
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(output_dir) = options.output_dir {
        settings.output_dir = output_dir;
    }

    // EPISCOPE_USER_AGENT takes precedence over config
    if let Some(ua) = std::env::var("EPISCOPE_USER_AGENT")
        .ok()
        .filter(|s| !s.is_empty())
    {
        tracing::debug!("Using EPISCOPE_USER_AGENT from environment: {}", ua);
        settings.user_agent = Some(ua);
    }

    Ok((settings, config))
}
