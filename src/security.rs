use url::{Host, Url};

const SAFE_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

const DANGEROUS_SCHEMES: [&str; 9] = [
    "javascript",
    "data",
    "file",
    "vbscript",
    "chrome",
    "chrome-extension",
    "moz-extension",
    "ms-browser-extension",
    "edge",
];

/// Whether `url` may be opened in a new tab.
///
/// Only web and ftp schemes pass, and hosts pointing back at the local
/// machine or a private network are rejected.
pub fn is_url_safe(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    let scheme = parsed.scheme();
    if DANGEROUS_SCHEMES.contains(&scheme) || !SAFE_SCHEMES.contains(&scheme) {
        return false;
    }
    match parsed.host() {
        Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => {
            !(ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified())
        }
        Some(Host::Ipv6(ip)) => !(ip.is_loopback() || ip.is_unspecified()),
        None => false,
    }
}
