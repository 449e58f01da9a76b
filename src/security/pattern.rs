//! IP and URL-path wildcard patterns.
//!
//! Two distinct matching semantics live here:
//!
//! - **IP patterns** are exact strings, or a prefix followed by a single
//!   trailing `*` (`"192.168.1.*"`). This is a textual prefix test, not CIDR
//!   arithmetic: `"10.0.0.1*"` matches `"10.0.0.100"`.
//! - **Path patterns** may carry one leading and/or one trailing `*`, giving
//!   exact, prefix, suffix or substring matching. Embedded `*` is literal.
//!
//! Patterns are compiled once into tagged variants when a cache snapshot is
//! built; the hot path never re-scans the raw pattern string.

use thiserror::Error;

/// The wildcard token recognized at pattern edges.
pub const WILDCARD: char = '*';

/// Why a pattern was rejected at entry time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,
    #[error("pattern contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("wildcard is only allowed at the {0} of the pattern")]
    MisplacedWildcard(&'static str),
    #[error("pattern {0:?} would match every client")]
    Global(String),
    #[error("path pattern must start with '/' once wildcards are removed")]
    MissingLeadingSlash,
}

// ============================================================================
// IP patterns
// ============================================================================

/// A compiled IP pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPattern {
    /// Matches exactly this address string.
    Exact(String),
    /// Matches any address starting with this prefix (pattern minus the `*`).
    Prefix(String),
}

impl IpPattern {
    /// Compile a raw pattern. Only one trailing `*` is stripped.
    pub fn compile(pattern: &str) -> Self {
        match pattern.strip_suffix(WILDCARD) {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    #[inline]
    pub fn matches(&self, ip: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == ip,
            Self::Prefix(prefix) => ip.starts_with(prefix.as_str()),
        }
    }
}

/// Check whether `ip` matches `pattern`.
pub fn match_ip(pattern: &str, ip: &str) -> bool {
    IpPattern::compile(pattern).matches(ip)
}

/// Validate an IP pattern for admin entry.
///
/// A pattern made only of `*` and `.` is global. `::*` is not: it covers
/// only addresses written with a leading `::`.
pub fn validate_ip_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    if let Some(bad) = pattern
        .chars()
        .find(|&c| !(c.is_ascii_hexdigit() || matches!(c, '.' | ':' | WILDCARD)))
    {
        return Err(PatternError::InvalidCharacter(bad));
    }

    if pattern.chars().all(|c| matches!(c, '.' | WILDCARD)) {
        return Err(PatternError::Global(pattern.to_string()));
    }

    let body = pattern.strip_suffix(WILDCARD).unwrap_or(pattern);
    if body.contains(WILDCARD) {
        return Err(PatternError::MisplacedWildcard("end"));
    }

    Ok(())
}

pub fn is_valid_ip_pattern(pattern: &str) -> bool {
    validate_ip_pattern(pattern).is_ok()
}

// ============================================================================
// Path patterns
// ============================================================================

/// A compiled URL-path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// No wildcard: the path must equal the pattern.
    Exact(String),
    /// Trailing `*`: the path must start with the core.
    PrefixWildcard(String),
    /// Leading `*`: the path must end with the core.
    SuffixWildcard(String),
    /// Leading and trailing `*`: the path must contain the core.
    ContainsWildcard(String),
}

impl PathPattern {
    /// Compile a raw pattern into its matching mode.
    pub fn compile(pattern: &str) -> Self {
        let leading = pattern.strip_prefix(WILDCARD);
        let rest = leading.unwrap_or(pattern);
        let trailing = rest.strip_suffix(WILDCARD);

        match (leading.is_some(), trailing) {
            (false, None) => Self::Exact(pattern.to_string()),
            (false, Some(core)) => Self::PrefixWildcard(core.to_string()),
            (true, None) => Self::SuffixWildcard(rest.to_string()),
            (true, Some(core)) => Self::ContainsWildcard(core.to_string()),
        }
    }

    /// The pattern with its edge wildcards removed.
    pub fn core(&self) -> &str {
        match self {
            Self::Exact(core)
            | Self::PrefixWildcard(core)
            | Self::SuffixWildcard(core)
            | Self::ContainsWildcard(core) => core,
        }
    }

    #[inline]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(core) => path == core,
            Self::PrefixWildcard(core) => path.starts_with(core.as_str()),
            Self::SuffixWildcard(core) => path.ends_with(core.as_str()),
            Self::ContainsWildcard(core) => path.contains(core.as_str()),
        }
    }
}

/// Check whether `path` matches `pattern`.
pub fn match_path(pattern: &str, path: &str) -> bool {
    PathPattern::compile(pattern).matches(path)
}

/// Validate a path pattern for admin entry.
pub fn validate_path_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    if let Some(bad) = pattern
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | WILDCARD)))
    {
        return Err(PatternError::InvalidCharacter(bad));
    }

    let compiled = PathPattern::compile(pattern);
    let core = compiled.core();

    if core.contains(WILDCARD) {
        return Err(PatternError::MisplacedWildcard("start or end"));
    }
    if !core.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash);
    }

    // Every request path starts with and contains '/'.
    if core == "/"
        && matches!(
            compiled,
            PathPattern::PrefixWildcard(_) | PathPattern::ContainsWildcard(_)
        )
    {
        return Err(PatternError::Global(pattern.to_string()));
    }

    Ok(())
}

pub fn is_valid_path_pattern(pattern: &str) -> bool {
    validate_path_pattern(pattern).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPS: &[&str] = &[
        "10.0.0.5",
        "10.0.0.50",
        "192.168.1.250",
        "192.168.10.1",
        "::1",
        "2001:db8::7",
        "",
    ];

    #[test]
    fn test_ip_exact_is_string_equality() {
        for pattern in IPS {
            for ip in IPS {
                assert_eq!(match_ip(pattern, ip), pattern == ip, "{pattern} vs {ip}");
            }
        }
    }

    #[test]
    fn test_ip_trailing_wildcard_is_prefix() {
        let prefixes = ["10.0.0.", "10.0.0.5", "192.168.1.", "2001:db8:", ""];
        for prefix in prefixes {
            let pattern = format!("{prefix}*");
            for ip in IPS {
                assert_eq!(match_ip(&pattern, ip), ip.starts_with(prefix), "{pattern} vs {ip}");
            }
        }
    }

    #[test]
    fn test_ip_prefix_is_textual_not_subnet() {
        assert!(match_ip("192.168.1.*", "192.168.1.250"));
        assert!(!match_ip("192.168.1.*", "192.168.10.1"));
        // No octet awareness.
        assert!(match_ip("10.0.0.1*", "10.0.0.100"));
        // Only the final '*' is a wildcard.
        assert!(!match_ip("10.*.0.1", "10.5.0.1"));
        assert_eq!(IpPattern::compile("10.0.**"), IpPattern::Prefix("10.0.*".to_string()));
    }

    #[test]
    fn test_path_modes() {
        assert!(match_path("/a", "/a"));
        assert!(!match_path("/a", "/a/"));

        assert!(match_path("/wp-admin*", "/wp-admin/login.php"));
        assert!(!match_path("/wp-admin*", "/blog/wp-admin"));

        assert!(match_path("*.env", "/app/.env"));
        assert!(!match_path("*.env", "/app/.env.bak"));

        assert!(match_path("*/phpmyadmin*", "/tools/phpmyadmin/index.php"));
        assert!(!match_path("*/phpmyadmin*", "/tools/pma/index.php"));
    }

    #[test]
    fn test_path_embedded_wildcard_is_literal() {
        assert!(!match_path("/a*b", "/axb"));
        assert!(match_path("/a*b", "/a*b"));
        assert!(match_path("*/a*b*", "/x/a*b/y"));
    }

    #[test]
    fn test_path_contains_core() {
        let samples = ["", "x", "/x", "/a/x", "/ax", "/a/y", "x/", "/x/y", "//xx"];
        for s in samples {
            assert_eq!(match_path("*/x*", s), s.contains("/x"), "{s}");
        }
    }

    #[test]
    fn test_path_compile_variants() {
        assert_eq!(PathPattern::compile("/a"), PathPattern::Exact("/a".into()));
        assert_eq!(PathPattern::compile("/a*"), PathPattern::PrefixWildcard("/a".into()));
        assert_eq!(PathPattern::compile("*/a"), PathPattern::SuffixWildcard("/a".into()));
        assert_eq!(PathPattern::compile("*/a*"), PathPattern::ContainsWildcard("/a".into()));
        assert_eq!(PathPattern::compile("*"), PathPattern::SuffixWildcard(String::new()));
        assert_eq!(PathPattern::compile("**"), PathPattern::ContainsWildcard(String::new()));
    }

    #[test]
    fn test_ip_validation() {
        assert!(!is_valid_ip_pattern("*"));
        assert!(!is_valid_ip_pattern("*.*.*.*"));
        assert!(!is_valid_ip_pattern("*:*"));
        assert!(!is_valid_ip_pattern(""));

        assert!(is_valid_ip_pattern("10.0.0.5"));
        assert!(is_valid_ip_pattern("192.168.1.*"));
        assert!(is_valid_ip_pattern("2001:DB8::*"));
        assert!(is_valid_ip_pattern("::*"));
        assert!(match_ip("::*", "::ffff:10.0.0.1"));
        assert!(!match_ip("::*", "2001:db8::1"));

        assert_eq!(validate_ip_pattern("10.0.0.5 "), Err(PatternError::InvalidCharacter(' ')));
        assert_eq!(validate_ip_pattern("10.0.0.0/8"), Err(PatternError::InvalidCharacter('/')));
        assert_eq!(validate_ip_pattern("10.*.0.1"), Err(PatternError::MisplacedWildcard("end")));
        assert_eq!(
            validate_ip_pattern("*.*.*.*"),
            Err(PatternError::Global("*.*.*.*".to_string()))
        );
    }

    #[test]
    fn test_path_validation() {
        assert!(is_valid_path_pattern("/wp-admin*"));
        assert!(is_valid_path_pattern("*/wp-login.php"));
        assert!(is_valid_path_pattern("*/.git/*"));
        assert!(is_valid_path_pattern("/xmlrpc.php"));

        assert_eq!(validate_path_pattern(""), Err(PatternError::Empty));
        assert_eq!(validate_path_pattern("*"), Err(PatternError::MissingLeadingSlash));
        assert_eq!(validate_path_pattern("*.php"), Err(PatternError::MissingLeadingSlash));
        assert_eq!(validate_path_pattern("/a?b=1"), Err(PatternError::InvalidCharacter('?')));
        assert_eq!(
            validate_path_pattern("/a*b"),
            Err(PatternError::MisplacedWildcard("start or end"))
        );
        assert_eq!(validate_path_pattern("/*"), Err(PatternError::Global("/*".to_string())));
        assert_eq!(validate_path_pattern("*/*"), Err(PatternError::Global("*/*".to_string())));
        assert!(is_valid_path_pattern("*/"));
    }
}
