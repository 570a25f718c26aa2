//! Overlay match predicates

use glob::Pattern;
use serde::Deserialize;
use url::Url;

use crate::request::{Authority, Destination};
use crate::ConfigError;

/// What an overlay should match, as configured by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Target {
    /// Host to match on any path, over plain HTTP (`example.org` or `example.org:8080`)
    pub host: Option<String>,

    /// Full URL; its scheme, host and port form the authority and its path is a glob.
    /// Takes precedence over `host`.
    pub url: Option<String>,
}

impl Target {
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            url: None,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            host: None,
            url: Some(url.into()),
        }
    }
}

/// Authority plus path glob derived from a [`Target`]
#[derive(Debug, Clone)]
pub struct Matcher {
    authority: Authority,
    path: Pattern,
}

impl Matcher {
    pub fn new(target: &Target) -> Result<Self, ConfigError> {
        match (&target.url, &target.host) {
            (Some(url), host) => {
                if let Some(host) = host {
                    tracing::debug!("Ignoring host {:?} in favour of URL {:?}", host, url);
                }
                let parsed = parse_url(url)?;
                Self::from_parts(&parsed, parsed.path())
            }
            (None, Some(host)) => {
                let host = host.trim();
                if host.contains('/') {
                    return Err(ConfigError::InvalidHost(host.to_string()));
                }
                let parsed = parse_url(&format!("http://{}", host))?;
                Self::from_parts(&parsed, "*")
            }
            (None, None) => Err(ConfigError::MissingTarget),
        }
    }

    fn from_parts(url: &Url, path: &str) -> Result<Self, ConfigError> {
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingHost(url.to_string()))?;
        let path = Pattern::new(&collapse_stars(path)).map_err(|source| ConfigError::InvalidPattern {
            pattern: path.to_string(),
            source,
        })?;

        Ok(Self {
            authority: Authority::new(url.scheme(), host, url.port()),
            path,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn path_pattern(&self) -> &str {
        self.path.as_str()
    }

    pub fn matches(&self, destination: &Destination) -> bool {
        destination.authority == self.authority && self.path.matches(&destination.path)
    }
}

/// `**` means the same as `*` in a path pattern
fn collapse_stars(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '*' && collapsed.ends_with('*') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}

fn parse_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|source| ConfigError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::Request;

    fn destination(uri: &str) -> Destination {
        let request = Request::get(uri).body(Bytes::new()).unwrap();
        Destination::of(&request).unwrap()
    }

    #[test]
    fn test_host_matches_every_path() {
        let matcher = Matcher::new(&Target::host("Example.ORG")).unwrap();

        assert_eq!(matcher.authority().to_string(), "http://example.org");
        assert_eq!(matcher.path_pattern(), "*");
        assert!(matcher.matches(&destination("http://example.org/foo")));
        assert!(matcher.matches(&destination("http://EXAMPLE.org/a/b/c")));
        assert!(!matcher.matches(&destination("https://example.org/foo")));
        assert!(!matcher.matches(&destination("http://other.org/foo")));
    }

    #[test]
    fn test_url_path_is_a_glob() {
        let matcher = Matcher::new(&Target::url("http://example.org/foo*")).unwrap();

        assert!(matcher.matches(&destination("http://example.org/foo")));
        assert!(matcher.matches(&destination("http://example.org/foobar")));
        assert!(!matcher.matches(&destination("http://example.org/bar")));
    }

    #[test]
    fn test_glob_classes_and_single_chars() {
        let matcher = Matcher::new(&Target::url("http://example.org/v[12]/item")).unwrap();

        assert!(matcher.matches(&destination("http://example.org/v1/item")));
        assert!(matcher.matches(&destination("http://example.org/v2/item")));
        assert!(!matcher.matches(&destination("http://example.org/v3/item")));
    }

    #[test]
    fn test_default_port_is_equivalent_to_no_port() {
        let implicit = Matcher::new(&Target::host("example.org")).unwrap();
        let explicit = Matcher::new(&Target::url("http://example.org:80/*")).unwrap();

        for matcher in [&implicit, &explicit] {
            assert!(matcher.matches(&destination("http://example.org/x")));
            assert!(matcher.matches(&destination("http://example.org:80/x")));
            assert!(!matcher.matches(&destination("http://example.org:8080/x")));
        }
    }

    #[test]
    fn test_explicit_port_must_match() {
        let matcher = Matcher::new(&Target::host("127.0.0.1:8080")).unwrap();

        assert!(matcher.matches(&destination("http://127.0.0.1:8080/")));
        assert!(!matcher.matches(&destination("http://127.0.0.1/")));
    }

    #[test]
    fn test_url_takes_precedence_over_host() {
        let target = Target {
            host: Some("ignored.org".to_string()),
            url: Some("https://used.org/api/*".to_string()),
        };
        let matcher = Matcher::new(&target).unwrap();

        assert_eq!(matcher.authority().to_string(), "https://used.org");
        assert!(matcher.matches(&destination("https://used.org/api/x")));
        assert!(!matcher.matches(&destination("http://ignored.org/api/x")));
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let err = Matcher::new(&Target::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingTarget));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = Matcher::new(&Target::url("not a url")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_double_star_acts_like_single_star() {
        let matcher = Matcher::new(&Target::url("http://example.org/foo**")).unwrap();

        assert_eq!(matcher.path_pattern(), "/foo*");
        assert!(matcher.matches(&destination("http://example.org/foobar")));
        assert!(matcher.matches(&destination("http://example.org/foo/bar/baz")));
        assert!(!matcher.matches(&destination("http://example.org/bar")));

        let segment = Matcher::new(&Target::url("http://example.org/api/**/items")).unwrap();
        assert!(segment.matches(&destination("http://example.org/api/v1/items")));
    }

    #[test]
    fn test_broken_pattern_is_rejected() {
        let err = Matcher::new(&Target::url("http://example.org/[")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_host_with_scheme_or_path_is_rejected() {
        for host in ["http://example.org", "example.org/foo"] {
            let err = Matcher::new(&Target::host(host)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidHost(ref h) if h == host));
        }
    }

    #[test]
    fn test_target_from_toml() {
        let target: Target = toml::from_str(r#"url = "http://example.org/foo*""#).unwrap();
        assert_eq!(target, Target::url("http://example.org/foo*"));
    }
}
