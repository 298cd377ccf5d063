use crate::drag_gestures::DragContent;
use crate::messaging::{HostRequest, HostResponse, SystemBrowser, TransportError, UrlLauncher};
use crate::security::is_url_safe;
use crate::settings::SearchEngine;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use urlencoding::encode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragAction {
    Search { query: String, url: String },
    OpenImage { url: String },
    OpenLink { url: String },
}

impl DragAction {
    pub fn url(&self) -> &str {
        match self {
            DragAction::Search { url, .. }
            | DragAction::OpenImage { url }
            | DragAction::OpenLink { url } => url,
        }
    }
}

pub fn search_url(engine: SearchEngine, text: &str) -> String {
    let q = encode(text);
    match engine {
        SearchEngine::Google => format!("https://www.google.com/search?q={q}"),
        SearchEngine::Bing => format!("https://www.bing.com/search?q={q}"),
        SearchEngine::Baidu => format!("https://www.baidu.com/s?wd={q}"),
        SearchEngine::DuckDuckGo => format!("https://duckduckgo.com/?q={q}"),
    }
}

/// Turn classified drag content into an action. Unsafe image and link URLs
/// are dropped without telling the user.
pub fn resolve_action(content: &DragContent, engine: SearchEngine) -> Option<DragAction> {
    match content {
        DragContent::Text { full, .. } => {
            let query = full.trim();
            if query.is_empty() {
                return None;
            }
            Some(DragAction::Search {
                query: query.to_string(),
                url: search_url(engine, query),
            })
        }
        DragContent::Image { src_url, .. } => {
            safe_url(src_url).map(|url| DragAction::OpenImage { url })
        }
        DragContent::Link { href, .. } => safe_url(href).map(|url| DragAction::OpenLink { url }),
    }
}

fn safe_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if !is_url_safe(url) {
        tracing::debug!(url, "dropping unsafe url");
        return None;
    }
    Some(url.to_string())
}

/// Receives actions produced by completed drags. Implementations must not
/// block the caller on delivery.
pub trait DragActionSink: Send + Sync {
    fn dispatch(&self, action: DragAction);
}

/// Channel to the privileged process that owns tab creation.
pub trait TabOpener: Send + Sync {
    fn send(&self, request: &HostRequest) -> Result<HostResponse, TransportError>;
}

/// Local fallback used when the privileged channel is gone.
pub trait WindowOpener: Send + Sync {
    fn open_window(&self, url: &str) -> anyhow::Result<()>;
}

impl WindowOpener for SystemBrowser {
    fn open_window(&self, url: &str) -> anyhow::Result<()> {
        self.launch(url)
    }
}

/// Tab opener that runs the privileged handler in the same process.
pub struct InProcessTabOpener {
    launcher: Arc<dyn UrlLauncher>,
}

impl InProcessTabOpener {
    pub fn new(launcher: Arc<dyn UrlLauncher>) -> Self {
        Self { launcher }
    }
}

impl TabOpener for InProcessTabOpener {
    fn send(&self, request: &HostRequest) -> Result<HostResponse, TransportError> {
        Ok(crate::messaging::handle_request(
            request,
            self.launcher.as_ref(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    FallbackOpened,
    Failed(String),
}

pub struct ActionDispatcher {
    tab_opener: Arc<dyn TabOpener>,
    fallback: Arc<dyn WindowOpener>,
}

impl ActionDispatcher {
    pub fn new(tab_opener: Arc<dyn TabOpener>, fallback: Arc<dyn WindowOpener>) -> Self {
        Self {
            tab_opener,
            fallback,
        }
    }

    /// Ask the privileged side to open the action's URL, falling back to a
    /// local window once if the channel fails or the request is refused.
    pub fn deliver(&self, action: &DragAction) -> DispatchOutcome {
        let url = action.url();
        let request = HostRequest::open_tab(url);
        let failure = match self.tab_opener.send(&request) {
            Ok(response) if response.success => return DispatchOutcome::Delivered,
            Ok(response) => response
                .error
                .unwrap_or_else(|| "unknown error".to_string()),
            Err(err) => err.to_string(),
        };
        tracing::debug!(error = %failure, url, "open tab failed; using fallback");
        match self.fallback.open_window(url) {
            Ok(()) => DispatchOutcome::FallbackOpened,
            Err(err) => {
                // The page is never told.
                tracing::debug!(?err, url, "fallback open failed");
                DispatchOutcome::Failed(failure)
            }
        }
    }
}

impl DragActionSink for ActionDispatcher {
    fn dispatch(&self, action: DragAction) {
        let _ = self.deliver(&action);
    }
}

/// Delivers actions on a background thread so a slow channel never stalls
/// the next gesture.
pub struct DispatchWorker {
    sender: Mutex<Option<Sender<DragAction>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl DispatchWorker {
    pub fn spawn(dispatcher: Arc<ActionDispatcher>) -> Self {
        let (tx, rx) = mpsc::channel::<DragAction>();
        let join = thread::spawn(move || {
            while let Ok(action) = rx.recv() {
                let outcome = dispatcher.deliver(&action);
                tracing::debug!(?outcome, url = action.url(), "drag action delivered");
            }
        });
        Self {
            sender: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
        }
    }

    /// Stop accepting actions and wait for queued ones to finish.
    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let join = self.join.lock().ok().and_then(|mut j| j.take());
        if let Some(join) = join {
            if join.join().is_err() {
                tracing::error!("dispatch worker panicked");
            }
        }
    }
}

impl DragActionSink for DispatchWorker {
    fn dispatch(&self, action: DragAction) {
        let sent = match self.sender.lock() {
            Ok(sender) => sender.as_ref().map(|tx| tx.send(action).is_ok()),
            Err(_) => None,
        };
        if sent != Some(true) {
            tracing::warn!("dispatch worker is not running; action dropped");
        }
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
