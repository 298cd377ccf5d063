use crate::settings::{Settings, SETTINGS_KEYS};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

pub type SettingsMap = Map<String, Value>;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
const WAIT_INTERVAL: Duration = Duration::from_millis(50);
const MAX_WAIT_ATTEMPTS: u32 = 20;

/// Persisted key/value store behind the cache.
///
/// An `Err` stands for the store being unreachable, e.g. when the extension
/// context was invalidated.
pub trait SettingsStore: Send + Sync {
    fn get(&self, keys: &[&str]) -> anyhow::Result<SettingsMap>;
    fn set(&self, values: &SettingsMap) -> anyhow::Result<()>;
}

/// Store backed by a JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_all(&self) -> anyhow::Result<SettingsMap> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let map: SettingsMap = serde_json::from_str(&content)?;
        Ok(map)
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> anyhow::Result<SettingsMap> {
        let all = self.read_all()?;
        Ok(pick(&all, keys))
    }

    fn set(&self, values: &SettingsMap) -> anyhow::Result<()> {
        let mut all = self.read_all()?;
        for (k, v) in values {
            all.insert(k.clone(), v.clone());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&all)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<SettingsMap>,
}

impl MemoryStore {
    pub fn new(values: SettingsMap) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> anyhow::Result<SettingsMap> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings store poisoned"))?;
        Ok(pick(&values, keys))
    }

    fn set(&self, values: &SettingsMap) -> anyhow::Result<()> {
        let mut stored = self
            .values
            .lock()
            .map_err(|_| anyhow::anyhow!("settings store poisoned"))?;
        for (k, v) in values {
            stored.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

/// Write the first-install settings when the store holds none yet.
/// Returns true when defaults were written.
pub fn seed_first_install(store: &dyn SettingsStore) -> anyhow::Result<bool> {
    let existing = store.get(&SETTINGS_KEYS)?;
    if !existing.is_empty() {
        return Ok(false);
    }
    store.set(&Settings::first_install().to_map())?;
    Ok(true)
}

fn pick(all: &SettingsMap, keys: &[&str]) -> SettingsMap {
    keys.iter()
        .filter_map(|k| all.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

fn merge_over(defaults: &SettingsMap, values: &SettingsMap, keys: Option<&[&str]>) -> SettingsMap {
    let mut out = defaults.clone();
    match keys {
        Some(keys) => {
            for key in keys {
                if let Some(v) = values.get(*key) {
                    out.insert(key.to_string(), v.clone());
                }
            }
        }
        None => {
            for (k, v) in values {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<SettingsMap>,
    loaded_at: Option<Instant>,
    loading: bool,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        match (&self.snapshot, self.loaded_at) {
            (Some(_), Some(at)) => at.elapsed() < ttl,
            _ => false,
        }
    }

    fn cached(&self, keys: &[&str], defaults: &SettingsMap) -> SettingsMap {
        match &self.snapshot {
            Some(snapshot) => merge_over(defaults, snapshot, Some(keys)),
            None => defaults.clone(),
        }
    }

    fn absorb(&mut self, values: &SettingsMap) {
        let snapshot = self.snapshot.get_or_insert_with(Map::new);
        for (k, v) in values {
            snapshot.insert(k.clone(), v.clone());
        }
        self.loaded_at = Some(Instant::now());
    }
}

/// Memoised view of the settings store.
///
/// Loads are deduplicated: callers that arrive while a fetch is in flight
/// wait for it instead of issuing their own.
pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl SettingsCache {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn SettingsStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_fresh(&self) -> bool {
        self.lock().is_fresh(self.ttl)
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.snapshot = None;
        state.loaded_at = None;
    }

    /// Return `keys` merged over `defaults`. Never fails: store errors yield
    /// `defaults`.
    pub fn load(&self, keys: &[&str], defaults: &SettingsMap) -> SettingsMap {
        let must_wait = {
            let mut state = self.lock();
            if state.is_fresh(self.ttl) {
                return state.cached(keys, defaults);
            }
            if state.loading {
                true
            } else {
                state.loading = true;
                false
            }
        };

        if must_wait {
            let mut attempts = 0;
            while attempts < MAX_WAIT_ATTEMPTS && self.lock().loading {
                thread::sleep(WAIT_INTERVAL);
                attempts += 1;
            }
            let mut state = self.lock();
            if state.is_fresh(self.ttl) {
                return state.cached(keys, defaults);
            }
            // The other fetch failed or is stuck; fetch on our own.
            state.loading = true;
        }

        let result = self.store.get(keys);
        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(values) => {
                state.absorb(&values);
                tracing::debug!(keys = ?keys, "settings loaded");
                merge_over(defaults, &values, None)
            }
            Err(err) => {
                tracing::warn!(?err, "settings load failed; using defaults");
                defaults.clone()
            }
        }
    }

    /// Write through to the store and refresh the local snapshot.
    pub fn save(&self, values: &SettingsMap) -> bool {
        match self.store.set(values) {
            Ok(()) => {
                self.lock().absorb(values);
                true
            }
            Err(err) => {
                tracing::warn!(?err, "settings save failed");
                false
            }
        }
    }

    pub fn load_settings(&self) -> Settings {
        let defaults = Settings::default().to_map();
        Settings::from_map(&self.load(&SETTINGS_KEYS, &defaults))
    }

    pub fn save_settings(&self, settings: &Settings) -> bool {
        self.save(&settings.to_map())
    }
}
