//! Request attributes consumed by route matching.

use hyper::http::header::HOST;
use hyper::http::{HeaderMap, HeaderName, HeaderValue, Method, Request};

/// The parts of an inbound request that routes can match on.
///
/// Built once per request by the forwarding layer; matching never touches
/// the body.
#[derive(Debug, Clone)]
pub struct RequestAttributes {
    pub method: Method,
    /// Lowercased host without port.
    pub host: Option<String>,
    pub path: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
}

impl RequestAttributes {
    /// Attributes from a method, host and `path?query` string.
    pub fn new(method: Method, host: Option<&str>, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };
        Self {
            method,
            host: host.map(normalize_host),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            headers: HeaderMap::new(),
            query: query.map(parse_query).unwrap_or_default(),
        }
    }

    /// GET request for `host` and `path?query`.
    pub fn get(host: &str, path_and_query: &str) -> Self {
        Self::new(Method::GET, Some(host), path_and_query)
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Extract attributes from an HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the URI authority.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let host = req
            .headers()
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .map(normalize_host)
            .or_else(|| req.uri().host().map(normalize_host));

        Self {
            method: req.method().clone(),
            host,
            path: req.uri().path().to_string(),
            headers: req.headers().clone(),
            query: req.uri().query().map(parse_query).unwrap_or_default(),
        }
    }

    /// Values of a query parameter, in request order.
    pub fn query_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

impl<B> From<&Request<B>> for RequestAttributes {
    fn from(req: &Request<B>) -> Self {
        Self::from_request(req)
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Lowercase and strip any port, keeping IPv6 brackets.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let bare = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => host,
        }
    };
    bare.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_normalization() {
        assert_eq!(normalize_host("Example.COM:8080"), "example.com");
        assert_eq!(normalize_host("[::1]:443"), "[::1]");
        assert_eq!(normalize_host("api.example.com"), "api.example.com");
    }

    #[test]
    fn test_from_request() {
        let req = Request::builder()
            .method("POST")
            .uri("http://fallback.local/api/v1?team=core&x=1&team=edge")
            .header("Host", "API.example.com:443")
            .header("x-tenant", "acme")
            .body(())
            .unwrap();
        let attrs = RequestAttributes::from(&req);
        assert_eq!(attrs.method, Method::POST);
        assert_eq!(attrs.host.as_deref(), Some("api.example.com"));
        assert_eq!(attrs.path, "/api/v1");
        assert_eq!(attrs.query_values("team").collect::<Vec<_>>(), vec!["core", "edge"]);
        assert_eq!(attrs.headers.get("x-tenant").unwrap(), "acme");
    }

    #[test]
    fn test_host_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://Origin.Example:8080/")
            .body(())
            .unwrap();
        assert_eq!(RequestAttributes::from(&req).host.as_deref(), Some("origin.example"));
    }

    #[test]
    fn test_new_splits_query() {
        let attrs = RequestAttributes::get("h", "/search?q=rust%20lang");
        assert_eq!(attrs.path, "/search");
        assert_eq!(attrs.query_values("q").next(), Some("rust lang"));
    }
}
