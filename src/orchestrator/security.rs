//! Pre-fetch security gate (spec §4.10, §7): rejects a request before any
//! network attempt if it targets a non-http(s) scheme, localhost, or a
//! private/loopback/link-local IP. These are fatal — no tier is ever worth
//! retrying against an SSRF target.

use std::net::IpAddr;

use crate::domain::{FetchError, Result};

/// Validates `raw_url`, returning the fatal [`FetchError`] variant that
/// applies if the target is blocked.
pub fn check_url_security(raw_url: &str) -> Result<()> {
    let parsed = url::Url::parse(raw_url).map_err(|e| FetchError::ConfigInvalidUrl(e.to_string()))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(FetchError::SecurityBlockedProtocol(scheme.to_string()));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| FetchError::ConfigInvalidUrl(raw_url.to_string()))?;

    if host.eq_ignore_ascii_case("localhost") {
        return Err(FetchError::SecurityLocalhost);
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if ip.is_loopback() {
            return Err(FetchError::SecurityLocalhost);
        }
        if is_private_or_link_local(&ip) {
            return Err(FetchError::SecurityPrivateIp);
        }
    }

    Ok(())
}

fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || v6.segments()[0] == 0xfe80,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        let err = check_url_security("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, FetchError::SecurityBlockedProtocol(_)));
    }

    #[test]
    fn rejects_localhost_hostname() {
        let err = check_url_security("http://localhost:8080/admin").unwrap_err();
        assert!(matches!(err, FetchError::SecurityLocalhost));
    }

    #[test]
    fn rejects_loopback_ip() {
        let err = check_url_security("http://127.0.0.1/").unwrap_err();
        assert!(matches!(err, FetchError::SecurityLocalhost));
    }

    #[test]
    fn rejects_private_ip() {
        let err = check_url_security("http://10.0.0.5/internal").unwrap_err();
        assert!(matches!(err, FetchError::SecurityPrivateIp));
    }

    #[test]
    fn rejects_link_local_ip() {
        let err = check_url_security("http://169.254.169.254/latest/meta-data").unwrap_err();
        assert!(matches!(err, FetchError::SecurityPrivateIp));
    }

    #[test]
    fn allows_ordinary_public_url() {
        assert!(check_url_security("https://example.com/page").is_ok());
    }
}
