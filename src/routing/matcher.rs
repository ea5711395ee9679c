//! Route match conditions.
//!
//! # Design Decisions
//! - Host matching is case-insensitive and ignores the port
//! - Path matching is a case-sensitive prefix
//! - Conditions combine with AND; an absent condition always matches
//! - No regex, so matching stays linear in the number of routes

use axum::http::{header, Request};

/// Match conditions compiled from a route declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMatcher {
    host: Option<String>,
    path_prefix: Option<String>,
}

impl RouteMatcher {
    pub fn new(host: Option<&str>, path_prefix: Option<&str>) -> Self {
        Self {
            host: host.map(|h| strip_port(h).to_lowercase()),
            path_prefix: path_prefix.map(str::to_owned),
        }
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.host_matches(req) && self.path_matches(req.uri().path())
    }

    fn host_matches<B>(&self, req: &Request<B>) -> bool {
        let Some(expected) = &self.host else {
            return true;
        };

        let actual = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().host());

        actual
            .map(|h| strip_port(h).eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }

    fn path_matches(&self, path: &str) -> bool {
        self.path_prefix
            .as_deref()
            .map_or(true, |prefix| path.starts_with(prefix))
    }
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals carry colons of their own.
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    host.split(':').next().unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(host: Option<&str>, uri: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header("Host", host);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_host_matcher() {
        let matcher = RouteMatcher::new(Some("games.example.com"), None);

        assert!(matcher.matches(&request(Some("games.example.com"), "/")));
        assert!(matcher.matches(&request(Some("GAMES.example.com:8080"), "/")));
        assert!(!matcher.matches(&request(Some("other.com"), "/")));
        assert!(!matcher.matches(&request(None, "/")));
    }

    #[test]
    fn test_host_from_absolute_uri() {
        let matcher = RouteMatcher::new(Some("games.example.com"), None);
        assert!(matcher.matches(&request(None, "http://games.example.com/api")));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = RouteMatcher::new(None, Some("/api/games"));

        assert!(matcher.matches(&request(None, "/api/games/42")));
        assert!(!matcher.matches(&request(None, "/api/users")));
        assert!(!matcher.matches(&request(None, "/API/games")));
    }

    #[test]
    fn test_conditions_combine() {
        let matcher = RouteMatcher::new(Some("api.example.com"), Some("/v1"));

        assert!(matcher.matches(&request(Some("api.example.com"), "/v1/x")));
        assert!(!matcher.matches(&request(Some("api.example.com"), "/v2/x")));
        assert!(!matcher.matches(&request(Some("www.example.com"), "/v1/x")));
    }

    #[test]
    fn test_empty_matcher_matches_everything() {
        let matcher = RouteMatcher::default();
        assert!(matcher.matches(&request(None, "/anything")));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("example.com"), "example.com");
    }
}
