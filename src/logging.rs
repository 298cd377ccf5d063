use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialise logging. Without `debug` the level is pinned to `info`; with
/// it, `RUST_LOG` may override the default `debug` level.
///
/// When `log_file` is set, output goes to that file instead of stderr.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .map(PathBuf::from)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "drag_to_go.log".into());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let _ = builder.with_writer(appender).with_ansi(false).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
