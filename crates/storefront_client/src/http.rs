#![forbid(unsafe_code)]

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::ClientError;

pub(crate) const CONNECT_TIMEOUT_MS_DEFAULT: u64 = 3_000;
pub(crate) const REQUEST_TIMEOUT_MS_DEFAULT: u64 = 10_000;

pub(crate) fn build_agent(connect_timeout_ms: u64, request_timeout_ms: u64) -> ureq::Agent {
    let connect = Duration::from_millis(connect_timeout_ms.max(100));
    let request = Duration::from_millis(request_timeout_ms.max(100));
    ureq::AgentBuilder::new()
        .timeout_connect(connect)
        .timeout_read(request)
        .timeout_write(request)
        .build()
}

pub(crate) fn env_ms(name: &str, range: RangeInclusive<u64>, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| range.contains(v))
        .unwrap_or(default)
}

pub(crate) fn env_endpoint(name: &str) -> Option<String> {
    let endpoint = env::var(name).ok()?;
    let endpoint = endpoint.trim().to_string();
    if endpoint.is_empty() {
        return None;
    }
    Some(endpoint)
}

pub(crate) fn transport_error(err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, _) => ClientError::transport(
            "http_non_2xx",
            Some(status),
            format!("service responded with http status {status}"),
        ),
        ureq::Error::Transport(transport) => {
            let raw = format!("{:?} {}", transport.kind(), transport);
            ClientError::transport(classify_transport_error_kind(&raw), None, raw)
        }
    }
}

pub(crate) fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_http_01_transport_kind_classification() {
        assert_eq!(classify_transport_error_kind("Io read timeout"), "timeout");
        assert_eq!(classify_transport_error_kind("Tls handshake lost"), "tls");
        assert_eq!(classify_transport_error_kind("Dns name not found"), "dns");
        assert_eq!(
            classify_transport_error_kind("ConnectionFailed refused"),
            "connection"
        );
        assert_eq!(classify_transport_error_kind("proxy mangled"), "transport");
    }

    #[test]
    fn at_http_02_env_ms_filters_out_of_range_values() {
        // Unset variable falls back to the default.
        assert_eq!(
            env_ms("STOREFRONT_TEST_UNSET_TIMEOUT_MS", 100..=60_000, 3_000),
            3_000
        );
    }
}
