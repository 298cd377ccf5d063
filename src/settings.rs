use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Keys used for the persisted settings object.
pub const BLACKLIST_KEY: &str = "blacklist";
pub const SEARCH_ENGINE_KEY: &str = "searchEngine";
pub const SETTINGS_KEYS: [&str; 2] = [BLACKLIST_KEY, SEARCH_ENGINE_KEY];

/// Patterns written to the store on first install.
pub const DEFAULT_BLACKLIST: [&str; 4] = [
    "*.trello.com/*",
    "*.figma.com/*",
    "*.miro.com/*",
    "*.draw.io/*",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchEngine {
    #[default]
    Google,
    Bing,
    Baidu,
    DuckDuckGo,
}

impl SearchEngine {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
            SearchEngine::Baidu => "baidu",
            SearchEngine::DuckDuckGo => "duckduckgo",
        }
    }

    /// Unknown names fall back to Google.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bing" => SearchEngine::Bing,
            "baidu" => SearchEngine::Baidu,
            "duckduckgo" => SearchEngine::DuckDuckGo,
            _ => SearchEngine::Google,
        }
    }
}

impl From<String> for SearchEngine {
    fn from(value: String) -> Self {
        SearchEngine::from_name(&value)
    }
}

impl From<SearchEngine> for String {
    fn from(value: SearchEngine) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User settings shared between the options page, the content script and the
/// native host. Field names follow the extension storage schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub search_engine: SearchEngine,
}

impl Settings {
    /// Settings written on first install.
    pub fn first_install() -> Self {
        Self {
            blacklist: DEFAULT_BLACKLIST.iter().map(|p| p.to_string()).collect(),
            search_engine: SearchEngine::Google,
        }
    }

    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }

    /// Build settings from a key/value map, ignoring malformed fields.
    pub fn from_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut settings = Settings::default();
        if let Some(list) = map.get(BLACKLIST_KEY).and_then(|v| v.as_array()) {
            settings.blacklist = list
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
        }
        if let Some(engine) = map.get(SEARCH_ENGINE_KEY).and_then(|v| v.as_str()) {
            settings.search_engine = SearchEngine::from_name(engine);
        }
        settings
    }
}

/// Tunables for the drag gesture engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragConfig {
    /// Minimum pointer displacement before a press becomes a drag.
    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: f32,
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,
    #[serde(default = "default_tooltip_max_chars")]
    pub tooltip_max_chars: usize,
    /// Length of the blanket suppression window opened by Escape.
    #[serde(default = "default_post_escape_ms")]
    pub post_escape_ms: u64,
    /// Click block opened by a release that was marked to be ignored.
    #[serde(default = "default_post_release_block_ms")]
    pub post_release_block_ms: u64,
    #[serde(default = "default_drag_flag_clear_ms")]
    pub drag_flag_clear_ms: u64,
    #[serde(default = "default_inline_handler_restore_ms")]
    pub inline_handler_restore_ms: u64,
    #[serde(default = "default_navigation_settle_ms")]
    pub navigation_settle_ms: u64,
    #[serde(default = "default_navigation_debounce_ms")]
    pub navigation_debounce_ms: u64,
}

fn default_drag_threshold_px() -> f32 {
    5.0
}

fn default_preview_max_chars() -> usize {
    50
}

fn default_tooltip_max_chars() -> usize {
    20
}

fn default_post_escape_ms() -> u64 {
    300
}

fn default_post_release_block_ms() -> u64 {
    500
}

fn default_drag_flag_clear_ms() -> u64 {
    50
}

fn default_inline_handler_restore_ms() -> u64 {
    200
}

fn default_navigation_settle_ms() -> u64 {
    100
}

fn default_navigation_debounce_ms() -> u64 {
    500
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: default_drag_threshold_px(),
            preview_max_chars: default_preview_max_chars(),
            tooltip_max_chars: default_tooltip_max_chars(),
            post_escape_ms: default_post_escape_ms(),
            post_release_block_ms: default_post_release_block_ms(),
            drag_flag_clear_ms: default_drag_flag_clear_ms(),
            inline_handler_restore_ms: default_inline_handler_restore_ms(),
            navigation_settle_ms: default_navigation_settle_ms(),
            navigation_debounce_ms: default_navigation_debounce_ms(),
        }
    }
}

impl DragConfig {
    pub fn post_escape(&self) -> Duration {
        Duration::from_millis(self.post_escape_ms)
    }

    pub fn post_release_block(&self) -> Duration {
        Duration::from_millis(self.post_release_block_ms)
    }

    pub fn drag_flag_clear(&self) -> Duration {
        Duration::from_millis(self.drag_flag_clear_ms)
    }

    pub fn inline_handler_restore(&self) -> Duration {
        Duration::from_millis(self.inline_handler_restore_ms)
    }

    /// Delay between a route notification and the blacklist re-evaluation.
    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_settle_ms + self.navigation_debounce_ms)
    }
}

/// Configuration file of the native host binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// When enabled the host initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Optional log file. Native messaging owns stdout, so logs never go there.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Location of the persisted extension settings.
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

fn config_dir() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("drag_to_go")
}

fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_file: None,
            settings_path: default_settings_path(),
        }
    }
}

impl HostConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join("host.json")
    }

    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
