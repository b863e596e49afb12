//! Directive syntax
//!
//! A directive is the textual marker requesting substitution inside a string
//! scalar:
//!
//! - `<% TYPE[NAME] %>` - interpolator lookup, fatal if the value is missing
//! - `<% TYPE[NAME, DEFAULT] %>` - lookup with a fallback
//!
//! TYPE is restricted to word characters, NAME to word/dot characters, and
//! DEFAULT is free text matched lazily up to the closing marker. Arbitrary
//! literal text may surround the directive; only the leftmost occurrence is
//! matched per pass, with repeated passes handling the rest.

use regex::Regex;
use std::sync::OnceLock;

static DIRECTIVE_RE: OnceLock<Regex> = OnceLock::new();

fn directive_re() -> &'static Regex {
    DIRECTIVE_RE.get_or_init(|| {
        Regex::new(r"<%\s*(\w+)\[([\w.]+)(?:,\s*(.*?))?\]\s*%>").expect("directive regex is valid")
    })
}

/// The leftmost directive found in a string scalar, split into its parts.
///
/// Borrows from the scanned string; `prefix` and `suffix` are the literal
/// text around the matched marker (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'a> {
    /// Literal text before the directive
    pub prefix: &'a str,
    /// Interpolator type tag (e.g. "ENV", "FILE")
    pub tag: &'a str,
    /// Name to resolve through the interpolator
    pub name: &'a str,
    /// Optional fallback text
    pub default: Option<&'a str>,
    /// Literal text after the directive
    pub suffix: &'a str,
}

impl<'a> Directive<'a> {
    /// Find the leftmost directive in `input`, or `None` if the string
    /// contains no directive.
    pub fn find(input: &'a str) -> Option<Directive<'a>> {
        let caps = directive_re().captures(input)?;
        let whole = caps.get(0).expect("group 0 always present");

        Some(Directive {
            prefix: &input[..whole.start()],
            tag: caps.get(1).expect("tag group").as_str(),
            name: caps.get(2).expect("name group").as_str(),
            default: caps.get(3).map(|m| m.as_str()),
            suffix: &input[whole.end()..],
        })
    }
}

/// Cheap probe for whether a string contains any directive at all.
pub fn contains_directive(input: &str) -> bool {
    directive_re().is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_bare_directive() {
        let d = Directive::find("<% ENV[foo] %>").unwrap();
        assert_eq!(d.prefix, "");
        assert_eq!(d.tag, "ENV");
        assert_eq!(d.name, "foo");
        assert_eq!(d.default, None);
        assert_eq!(d.suffix, "");
    }

    #[test]
    fn test_find_with_default() {
        let d = Directive::find("<% ENV[bar, 4] %>").unwrap();
        assert_eq!(d.tag, "ENV");
        assert_eq!(d.name, "bar");
        assert_eq!(d.default, Some("4"));
    }

    #[test]
    fn test_find_with_free_text_default() {
        let d = Directive::find("<% ENV[url, http://localhost:8200] %>").unwrap();
        assert_eq!(d.default, Some("http://localhost:8200"));
    }

    #[test]
    fn test_find_with_prefix_and_suffix() {
        let d = Directive::find("a<% ENV[foo, 4] %>sdf").unwrap();
        assert_eq!(d.prefix, "a");
        assert_eq!(d.suffix, "sdf");
        assert_eq!(d.default, Some("4"));
    }

    #[test]
    fn test_find_leftmost_of_many() {
        let d = Directive::find("<% ENV[foo] %>+<% ENV[bar] %>").unwrap();
        assert_eq!(d.name, "foo");
        assert_eq!(d.suffix, "+<% ENV[bar] %>");
    }

    #[test]
    fn test_find_dotted_name() {
        let d = Directive::find("<% VAULT[secret.app.db] %>").unwrap();
        assert_eq!(d.tag, "VAULT");
        assert_eq!(d.name, "secret.app.db");
    }

    #[test]
    fn test_whitespace_variants() {
        assert!(Directive::find("<%ENV[foo]%>").is_some());
        assert!(Directive::find("<%   ENV[foo]   %>").is_some());

        let d = Directive::find("<%ENV[foo, x ]%>").unwrap();
        // Lazy default stops before the bracket; trailing space belongs to it
        assert_eq!(d.default, Some("x "));
    }

    #[test]
    fn test_non_directives() {
        assert!(Directive::find("plain text").is_none());
        assert!(Directive::find("<% ENV %>").is_none());
        assert!(Directive::find("<% ENV[!!] %>").is_none());
        assert!(Directive::find("<% EN-V[foo] %>").is_none());
    }

    #[test]
    fn test_contains_directive() {
        assert!(contains_directive("x <% ENV[a] %> y"));
        assert!(!contains_directive("x ${env:a} y"));
    }
}
