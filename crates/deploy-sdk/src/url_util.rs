use reqwest::header::HeaderMap;
use url::Url;

/// URL utility functions.
pub struct UrlUtil;

impl UrlUtil {
    /// Whether `value` is an absolute `http` or `https` URL with a host.
    pub fn is_valid_http_url(value: &str) -> bool {
        match Url::parse(value) {
            Ok(url) => {
                matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
            }
            Err(_) => false,
        }
    }

    /// Extract the `x-github-request-id` header value from an HTTP response's headers.
    pub fn get_github_request_id(headers: &HeaderMap) -> Option<String> {
        headers
            .get("x-github-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}
