//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderName,
};

/// Extract client IP address based on configuration.
///
/// If `ip_header` is set, the last address in that header is used: the one
/// appended by the trusted proxy. Earlier entries come from the client and
/// are ignored. A missing or unreadable header is an error (no fallback to
/// the socket).
///
/// If `ip_header` is None, uses the SocketAddr from ConnectInfo.
pub fn extract_client_ip(
    request: &Request,
    ip_header: Option<&HeaderName>,
) -> Result<String, &'static str> {
    match ip_header {
        Some(name) => {
            let value = request
                .headers()
                .get(name)
                .ok_or("IP header not present")?
                .to_str()
                .map_err(|_| "IP header contains invalid characters")?;
            value
                .rsplit(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(String::from)
                .ok_or("IP header is empty")
        }
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string())
            .ok_or("No client IP available"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_header_takes_proxy_appended_address() {
        let request = Request::builder()
            .header("x-forwarded-for", " 10.0.0.1 , 10.0.0.2 ")
            .body(Body::empty())
            .unwrap();
        let name = HeaderName::from_static("x-forwarded-for");

        assert_eq!(
            extract_client_ip(&request, Some(&name)),
            Ok("10.0.0.2".to_string())
        );
    }

    #[test]
    fn test_single_value_header() {
        let request = Request::builder()
            .header("x-real-ip", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        let name = HeaderName::from_static("x-real-ip");

        assert_eq!(
            extract_client_ip(&request, Some(&name)),
            Ok("203.0.113.7".to_string())
        );
    }

    #[test]
    fn test_empty_trailing_entry_is_an_error() {
        let request = Request::builder()
            .header("x-forwarded-for", "10.0.0.1, ")
            .body(Body::empty())
            .unwrap();
        let name = HeaderName::from_static("x-forwarded-for");

        assert!(extract_client_ip(&request, Some(&name)).is_err());
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let name = HeaderName::from_static("x-real-ip");

        assert!(extract_client_ip(&request, Some(&name)).is_err());
    }

    #[test]
    fn test_connect_info() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(
            extract_client_ip(&request, None),
            Ok("192.168.1.5".to_string())
        );
    }
}
