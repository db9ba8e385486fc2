//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (exact or leading wildcard, case-insensitive)
//! - Match path (exact or prefix, case-sensitive)
//! - Match method, headers and query parameters
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use hyper::http::{HeaderName, Method};

use crate::config::schema::{HeaderMatchConfig, QueryMatchConfig, RouteConfig, ValueMatchMode};
use crate::routing::request::RequestAttributes;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &RequestAttributes) -> bool;
}

/// Matches the request host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMatcher {
    /// Whole host, lowercased.
    Exact(String),
    /// `*.example.com`, stored as `.example.com`.
    Wildcard(String),
}

impl HostMatcher {
    /// Parse a host pattern. The pattern is normalized to lowercase.
    pub fn new(pattern: &str) -> Self {
        let pattern = pattern.to_ascii_lowercase();
        match pattern.strip_prefix('*') {
            Some(suffix) => HostMatcher::Wildcard(suffix.to_string()),
            None => HostMatcher::Exact(pattern),
        }
    }

    fn specificity(&self) -> u8 {
        match self {
            HostMatcher::Exact(_) => 2,
            HostMatcher::Wildcard(_) => 1,
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        let Some(host) = req.host.as_deref() else {
            return false;
        };
        match self {
            HostMatcher::Exact(expected) => host == expected,
            HostMatcher::Wildcard(suffix) => host.len() > suffix.len() && host.ends_with(suffix.as_str()),
        }
    }
}

/// Matches the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    /// Pattern `/api/*` stored as `/api/`. Also matches `/api` itself.
    Prefix(String),
}

impl PathMatcher {
    /// Parse a path pattern; a trailing `*` makes it a prefix.
    pub fn new(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => PathMatcher::Prefix(prefix.to_string()),
            None => PathMatcher::Exact(pattern.to_string()),
        }
    }

    /// Orders exact paths before prefixes, and longer prefixes first.
    fn specificity(&self) -> (u8, usize) {
        match self {
            PathMatcher::Exact(p) => (2, p.len()),
            PathMatcher::Prefix(p) => (1, p.len()),
        }
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        match self {
            PathMatcher::Exact(expected) => req.path == *expected,
            PathMatcher::Prefix(prefix) => {
                req.path.starts_with(prefix.as_str())
                    || (prefix.len() > 1 && prefix.ends_with('/') && req.path == prefix[..prefix.len() - 1])
            }
        }
    }
}

/// Matches the request method against a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        self.methods.contains(&req.method)
    }
}

/// Compares one value against the configured values.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueMatcher {
    values: Vec<String>,
    mode: ValueMatchMode,
    case_sensitive: bool,
}

impl ValueMatcher {
    fn new(values: &[String], mode: ValueMatchMode, case_sensitive: bool) -> Self {
        let values = if case_sensitive {
            values.to_vec()
        } else {
            values.iter().map(|v| v.to_lowercase()).collect()
        };
        Self {
            values,
            mode,
            case_sensitive,
        }
    }

    fn matches(&self, actual: &str) -> bool {
        let folded;
        let actual = if self.case_sensitive {
            actual
        } else {
            folded = actual.to_lowercase();
            folded.as_str()
        };
        self.values.iter().any(|expected| match self.mode {
            ValueMatchMode::Exact => actual == expected,
            ValueMatchMode::Prefix => actual.starts_with(expected.as_str()),
            ValueMatchMode::Contains => actual.contains(expected.as_str()),
            ValueMatchMode::Exists => true,
        })
    }
}

/// Matches a request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatcher {
    name: HeaderName,
    value: ValueMatcher,
}

impl HeaderMatcher {
    /// Returns `None` for an invalid header name.
    pub fn new(config: &HeaderMatchConfig) -> Option<Self> {
        let name = HeaderName::from_bytes(config.name.as_bytes()).ok()?;
        Some(Self {
            name,
            value: ValueMatcher::new(&config.values, config.mode, config.case_sensitive),
        })
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        if self.value.mode == ValueMatchMode::Exists {
            return req.headers.contains_key(&self.name);
        }
        req.headers
            .get_all(&self.name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| self.value.matches(v))
    }
}

/// Matches a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatcher {
    name: String,
    value: ValueMatcher,
}

impl QueryMatcher {
    pub fn new(config: &QueryMatchConfig) -> Self {
        Self {
            name: config.name.clone(),
            value: ValueMatcher::new(&config.values, config.mode, config.case_sensitive),
        }
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, req: &RequestAttributes) -> bool {
        let mut values = req.query_values(&self.name).peekable();
        if self.value.mode == ValueMatchMode::Exists {
            return values.peek().is_some();
        }
        values.any(|v| self.value.matches(v))
    }
}

/// The full predicate of a route: every present condition must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatch {
    /// Any host in the list may match. Empty = any host.
    pub hosts: Vec<HostMatcher>,
    pub path: Option<PathMatcher>,
    pub methods: Option<MethodMatcher>,
    pub headers: Vec<HeaderMatcher>,
    pub query: Vec<QueryMatcher>,
}

impl RouteMatch {
    /// Compile the predicate of a validated route.
    ///
    /// Invalid methods and header names are dropped; validation rejects them first.
    pub fn from_config(config: &RouteConfig) -> Self {
        let methods: Vec<Method> = config
            .methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect();
        Self {
            hosts: config.hosts.iter().map(|h| HostMatcher::new(h)).collect(),
            path: config.path.as_deref().map(PathMatcher::new),
            methods: (!methods.is_empty()).then(|| MethodMatcher::new(methods)),
            headers: config.headers.iter().filter_map(HeaderMatcher::new).collect(),
            query: config.query_parameters.iter().map(QueryMatcher::new).collect(),
        }
    }

    pub fn path_specificity(&self) -> (u8, usize) {
        self.path.as_ref().map(PathMatcher::specificity).unwrap_or((0, 0))
    }

    /// The most specific host pattern on the route; 0 when any host matches.
    pub fn host_specificity(&self) -> u8 {
        self.hosts.iter().map(HostMatcher::specificity).max().unwrap_or(0)
    }

    /// Number of method, header and query conditions.
    pub fn condition_count(&self) -> usize {
        usize::from(self.methods.is_some()) + self.headers.len() + self.query.len()
    }
}

impl Matcher for RouteMatch {
    fn matches(&self, req: &RequestAttributes) -> bool {
        (self.hosts.is_empty() || self.hosts.iter().any(|h| h.matches(req)))
            && self.path.as_ref().map_or(true, |p| p.matches(req))
            && self.methods.as_ref().map_or(true, |m| m.matches(req))
            && self.headers.iter().all(|h| h.matches(req))
            && self.query.iter().all(|q| q.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");
        assert!(matcher.matches(&RequestAttributes::get("example.com", "/")));
        assert!(matcher.matches(&RequestAttributes::get("EXAMPLE.COM:8080", "/"))); // Case insensitive
        assert!(!matcher.matches(&RequestAttributes::get("other.com", "/")));
        assert!(!matcher.matches(&RequestAttributes::new(Method::GET, None, "/")));
    }

    #[test]
    fn test_wildcard_host_matcher() {
        let matcher = HostMatcher::new("*.Example.com");
        assert!(matcher.matches(&RequestAttributes::get("api.example.com", "/")));
        assert!(matcher.matches(&RequestAttributes::get("a.b.example.com", "/")));
        assert!(!matcher.matches(&RequestAttributes::get("example.com", "/")));
        assert!(!matcher.matches(&RequestAttributes::get("badexample.com", "/")));
    }

    #[test]
    fn test_path_matcher() {
        let prefix = PathMatcher::new("/api/*");
        assert!(prefix.matches(&RequestAttributes::get("h", "/api/v1")));
        assert!(prefix.matches(&RequestAttributes::get("h", "/api/")));
        assert!(prefix.matches(&RequestAttributes::get("h", "/api")));
        assert!(!prefix.matches(&RequestAttributes::get("h", "/apix")));
        assert!(!prefix.matches(&RequestAttributes::get("h", "/API/v1"))); // Case sensitive

        let exact = PathMatcher::new("/login");
        assert!(exact.matches(&RequestAttributes::get("h", "/login?next=/")));
        assert!(!exact.matches(&RequestAttributes::get("h", "/login/x")));

        let all = PathMatcher::new("/*");
        assert!(all.matches(&RequestAttributes::get("h", "/")));
        assert!(all.matches(&RequestAttributes::get("h", "/anything/at/all")));
    }

    #[test]
    fn test_header_matcher_modes() {
        let exact = HeaderMatcher::new(&HeaderMatchConfig {
            name: "x-tenant".into(),
            values: vec!["Acme".into(), "globex".into()],
            mode: ValueMatchMode::Exact,
            case_sensitive: false,
        })
        .unwrap();
        assert!(exact.matches(&RequestAttributes::get("h", "/").with_header("X-Tenant", "ACME")));
        assert!(!exact.matches(&RequestAttributes::get("h", "/").with_header("x-tenant", "initech")));

        let prefix = HeaderMatcher::new(&HeaderMatchConfig {
            name: "user-agent".into(),
            values: vec!["curl/".into()],
            mode: ValueMatchMode::Prefix,
            case_sensitive: true,
        })
        .unwrap();
        assert!(prefix.matches(&RequestAttributes::get("h", "/").with_header("user-agent", "curl/8.0")));
        assert!(!prefix.matches(&RequestAttributes::get("h", "/").with_header("user-agent", "Curl/8.0")));

        let exists = HeaderMatcher::new(&HeaderMatchConfig {
            name: "authorization".into(),
            mode: ValueMatchMode::Exists,
            ..Default::default()
        })
        .unwrap();
        assert!(exists.matches(&RequestAttributes::get("h", "/").with_header("authorization", "")));
        assert!(!exists.matches(&RequestAttributes::get("h", "/")));
    }

    #[test]
    fn test_query_matcher() {
        let matcher = QueryMatcher::new(&QueryMatchConfig {
            name: "version".into(),
            values: vec!["2".into()],
            mode: ValueMatchMode::Contains,
            case_sensitive: true,
        });
        assert!(matcher.matches(&RequestAttributes::get("h", "/?version=v2.1")));
        assert!(!matcher.matches(&RequestAttributes::get("h", "/?version=v1")));
        assert!(!matcher.matches(&RequestAttributes::get("h", "/")));
    }

    #[test]
    fn test_route_match_and_semantics() {
        let route = RouteMatch::from_config(&RouteConfig {
            hosts: vec!["api.example.com".into(), "*.api.example.com".into()],
            path: Some("/v1/*".into()),
            methods: vec!["get".into(), "HEAD".into()],
            ..Default::default()
        });
        assert!(route.matches(&RequestAttributes::get("eu.api.example.com", "/v1/users")));
        assert!(!route.matches(&RequestAttributes::get("api.example.com", "/v2/users")));
        assert!(!route.matches(&RequestAttributes::new(Method::POST, Some("api.example.com"), "/v1/users")));
        assert_eq!(route.host_specificity(), 2);
        assert_eq!(route.condition_count(), 1);

        // Empty predicate matches everything.
        assert!(RouteMatch::default().matches(&RequestAttributes::new(Method::DELETE, None, "/x")));
    }
}
