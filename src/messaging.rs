//! Message protocol between the content side and the privileged tab opener.
//!
//! Requests travel as `{"action":"openTab","url":...}` and answers as
//! `{"success":bool,"error":...}`. The native host speaks the browser's
//! native-messaging framing: a little-endian `u32` length followed by that
//! many bytes of UTF-8 JSON.

use crate::security::is_url_safe;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Upper bound on a single frame.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum HostRequest {
    OpenTab { url: String },
}

impl HostRequest {
    pub fn open_tab(url: impl Into<String>) -> Self {
        HostRequest::OpenTab { url: url.into() }
    }

    pub fn url(&self) -> &str {
        match self {
            HostRequest::OpenTab { url } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Failure of the channel to the privileged side, as opposed to a refused
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    ContextInvalidated,
    PortClosed,
    NoReceiver,
    Other(String),
}

impl TransportError {
    /// Map a raw browser error message onto a transport error.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("extension context invalidated") {
            TransportError::ContextInvalidated
        } else if lower.contains("message port closed") {
            TransportError::PortClosed
        } else if lower.contains("receiving end does not exist") {
            TransportError::NoReceiver
        } else {
            TransportError::Other(message.to_string())
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ContextInvalidated => write!(f, "extension context invalidated"),
            TransportError::PortClosed => write!(f, "message port closed"),
            TransportError::NoReceiver => write!(f, "receiving end does not exist"),
            TransportError::Other(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Opens URLs on behalf of the privileged side.
pub trait UrlLauncher: Send + Sync {
    fn launch(&self, url: &str) -> anyhow::Result<()>;
}

/// Launches URLs in the system's default browser.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl UrlLauncher for SystemBrowser {
    fn launch(&self, url: &str) -> anyhow::Result<()> {
        open::that(url).map_err(|e| e.into())
    }
}

/// Privileged handling of one request.
pub fn handle_request(request: &HostRequest, launcher: &dyn UrlLauncher) -> HostResponse {
    match request {
        HostRequest::OpenTab { url } => {
            if !is_url_safe(url) {
                tracing::debug!(url = %url, "refusing unsafe url");
                return HostResponse::failed("unsafe url");
            }
            match launcher.launch(url) {
                Ok(()) => HostResponse::ok(),
                Err(err) => {
                    tracing::error!(?err, url = %url, "failed to open tab");
                    HostResponse::failed(err.to_string())
                }
            }
        }
    }
}

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly.
pub fn read_frame<R: Read>(reader: &mut R) -> anyhow::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        anyhow::bail!("frame of {len} bytes exceeds limit");
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(body))
}

pub fn write_frame<W: Write>(writer: &mut W, body: &[u8]) -> anyhow::Result<()> {
    if body.len() > MAX_FRAME_LEN {
        anyhow::bail!("frame of {} bytes exceeds limit", body.len());
    }
    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(body)?;
    writer.flush()?;
    Ok(())
}

/// Serve framed requests until the reader reaches end of stream.
///
/// Malformed requests are answered with a failure instead of ending the loop.
pub fn serve<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    launcher: &dyn UrlLauncher,
) -> anyhow::Result<usize> {
    let mut handled = 0;
    while let Some(frame) = read_frame(reader)? {
        let response = match serde_json::from_slice::<HostRequest>(&frame) {
            Ok(request) => handle_request(&request, launcher),
            Err(err) => {
                tracing::warn!(%err, "malformed request");
                HostResponse::failed(format!("malformed request: {err}"))
            }
        };
        let body = serde_json::to_vec(&response)?;
        write_frame(writer, &body)?;
        handled += 1;
    }
    Ok(handled)
}
