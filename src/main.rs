use drag_to_go::logging;
use drag_to_go::messaging::{serve, SystemBrowser};
use drag_to_go::settings::HostConfig;
use drag_to_go::settings_cache::{seed_first_install, JsonFileStore};
use std::path::PathBuf;

/// Native messaging host: opens the tabs the content script asks for.
///
/// The browser passes the caller origin as the first argument, so the config
/// location comes from `DRAG_TO_GO_CONFIG` instead.
fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("DRAG_TO_GO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(HostConfig::default_path);
    let config = HostConfig::load(&config_path)?;
    logging::init(config.debug_logging, config.log_file.clone());

    let store = JsonFileStore::new(&config.settings_path);
    match seed_first_install(&store) {
        Ok(true) => tracing::info!(path = %store.path().display(), "seeded default settings"),
        Ok(false) => {}
        Err(err) => tracing::warn!(?err, "could not seed default settings"),
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let handled = serve(&mut stdin.lock(), &mut stdout.lock(), &SystemBrowser)?;
    tracing::info!(handled, "native host exiting");
    Ok(())
}
