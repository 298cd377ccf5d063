pub mod dispatch;
pub mod drag_gestures;
pub mod logging;
pub mod messaging;
pub mod navigation;
pub mod security;
pub mod settings;
pub mod settings_cache;
pub mod site_filter;
