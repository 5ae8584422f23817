//! # asp-refs
//!
//! Parses and formats `space:` reference strings and their embedded
//! selector text. This crate owns the grammar only — resolving a
//! selector to a commit is [`asp-resolver`](../asp_resolver/index.html)'s job.
//!
//! ```text
//! ref        := "space:" (projectRef | pathRef | plainRef)
//! plainRef   := id ("@" selectorText)?
//! projectRef := "project:" id ("@" selectorText)?
//! pathRef    := "path:" nonAtPath "@" selectorText
//! id         := [a-z0-9]+ ("-" [a-z0-9]+)*        ; length 1..64
//! ```
//!
//! Selector text is resolved by longest-match priority: literal `dev`,
//! literal `HEAD`, `git:<sha>`, a `^`/`~` semver range, an exact semver,
//! otherwise a dist-tag name.

use asp_types::ids::SpaceId;
use asp_types::selector::{RefKind, Selector, SpaceRef};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RefParseError {
    #[error("reference {value:?} must start with `space:`")]
    MissingPrefix { value: String },
    #[error("reference {value:?} is missing a space id")]
    EmptyId { value: String },
    #[error("reference {value:?} has invalid space id: {reason}")]
    InvalidId { value: String, reason: String },
    #[error("path reference {value:?} is missing a required `@<selector>` suffix")]
    MissingSelectorForPath { value: String },
    #[error("reference {value:?} has an empty path")]
    EmptyPath { value: String },
}

/// Parse a `space:` reference string.
pub fn parse(s: &str) -> Result<SpaceRef, RefParseError> {
    let rest = s.strip_prefix("space:").ok_or_else(|| RefParseError::MissingPrefix { value: s.to_string() })?;

    if let Some(rest) = rest.strip_prefix("project:") {
        let (id_text, selector_text) = split_id_and_selector(rest);
        let id = parse_id(s, id_text)?;
        let (selector, defaulted) = resolve_selector_text(selector_text);
        return Ok(SpaceRef {
            kind: RefKind::Project,
            id,
            selector,
            selector_text: selector_text.map(str::to_string),
            defaulted_to_dev: defaulted,
        });
    }

    if let Some(rest) = rest.strip_prefix("path:") {
        let (path_text, selector_text) = rest
            .split_once('@')
            .ok_or_else(|| RefParseError::MissingSelectorForPath { value: s.to_string() })?;
        if path_text.is_empty() {
            return Err(RefParseError::EmptyPath { value: s.to_string() });
        }
        let id = SpaceId::from_path_segment(
            path_text.rsplit('/').find(|seg| !seg.is_empty()).unwrap_or(path_text),
        );
        let (selector, _) = resolve_selector_text(Some(selector_text));
        return Ok(SpaceRef {
            kind: RefKind::Path(path_text.to_string()),
            id,
            selector,
            selector_text: Some(selector_text.to_string()),
            defaulted_to_dev: false,
        });
    }

    let (id_text, selector_text) = split_id_and_selector(rest);
    let id = parse_id(s, id_text)?;
    let (selector, defaulted) = resolve_selector_text(selector_text);
    Ok(SpaceRef {
        kind: RefKind::Plain,
        id,
        selector,
        selector_text: selector_text.map(str::to_string),
        defaulted_to_dev: defaulted,
    })
}

fn parse_id(original: &str, id_text: &str) -> Result<SpaceId, RefParseError> {
    if id_text.is_empty() {
        return Err(RefParseError::EmptyId { value: original.to_string() });
    }
    SpaceId::parse(id_text).map_err(|e| RefParseError::InvalidId {
        value: original.to_string(),
        reason: e.reason.to_string(),
    })
}

fn split_id_and_selector(rest: &str) -> (&str, Option<&str>) {
    match rest.split_once('@') {
        Some((id, sel)) => (id, Some(sel)),
        None => (rest, None),
    }
}

/// Resolve selector text by longest-match priority. Returns
/// `(selector, defaulted_to_dev)`.
fn resolve_selector_text(text: Option<&str>) -> (Selector, bool) {
    let Some(text) = text else {
        return (Selector::Dev, true);
    };
    if text == "dev" {
        return (Selector::Dev, false);
    }
    if text == "HEAD" {
        return (Selector::Head, false);
    }
    if let Some(sha) = text.strip_prefix("git:") {
        if (7..=64).contains(&sha.len()) && sha.bytes().all(|b| b.is_ascii_hexdigit()) {
            return (Selector::GitPin(sha.to_string()), false);
        }
    }
    if text.starts_with('^') || text.starts_with('~') {
        return (
            Selector::Semver {
                range: text.to_string(),
                exact: false,
            },
            false,
        );
    }
    if semver::Version::parse(text).is_ok() {
        return (
            Selector::Semver {
                range: text.to_string(),
                exact: true,
            },
            false,
        );
    }
    (Selector::DistTag(text.to_string()), false)
}

/// Re-render a parsed reference back into its canonical string form.
/// `P1`: for any valid ref string with an explicit selector,
/// `format(parse(s)) == s`.
pub fn format(r: &SpaceRef) -> String {
    let mut out = String::from("space:");
    match &r.kind {
        RefKind::Plain => {}
        RefKind::Project => out.push_str("project:"),
        RefKind::Path(path) => {
            out.push_str("path:");
            out.push_str(path);
            out.push('@');
            out.push_str(r.selector_text.as_deref().unwrap_or(""));
            return out;
        }
    }
    out.push_str(r.id.as_str());
    if let Some(sel) = &r.selector_text {
        out.push('@');
        out.push_str(sel);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ref_defaults_to_dev() {
        let r = parse("space:base").unwrap();
        assert_eq!(r.kind, RefKind::Plain);
        assert!(r.defaulted_to_dev);
        assert_eq!(r.selector, Selector::Dev);
    }

    #[test]
    fn explicit_selectors_classify_correctly() {
        assert_eq!(parse("space:base@dev").unwrap().selector, Selector::Dev);
        assert_eq!(parse("space:base@HEAD").unwrap().selector, Selector::Head);
        assert_eq!(
            parse("space:base@git:abcdef1").unwrap().selector,
            Selector::GitPin("abcdef1".to_string())
        );
        assert_eq!(
            parse("space:base@^1.2.0").unwrap().selector,
            Selector::Semver { range: "^1.2.0".to_string(), exact: false }
        );
        assert_eq!(
            parse("space:base@1.2.0").unwrap().selector,
            Selector::Semver { range: "1.2.0".to_string(), exact: true }
        );
        assert_eq!(
            parse("space:base@stable").unwrap().selector,
            Selector::DistTag("stable".to_string())
        );
    }

    #[test]
    fn project_and_path_refs() {
        let r = parse("space:project:base@stable").unwrap();
        assert_eq!(r.kind, RefKind::Project);

        let r = parse("space:path:spaces/demo@dev").unwrap();
        match &r.kind {
            RefKind::Path(p) => assert_eq!(p, "spaces/demo"),
            _ => panic!("expected path ref"),
        }
        assert_eq!(r.id.as_str(), "demo");
    }

    #[test]
    fn path_ref_requires_selector() {
        assert!(parse("space:path:spaces/demo").is_err());
    }

    #[test]
    fn rejects_bad_prefix_and_ids() {
        assert!(parse("foo:base").is_err());
        assert!(parse("space:Base").is_err());
        assert!(parse(&format!("space:{}", "a".repeat(65))).is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trip_plain_refs_with_explicit_selector(
            id in "[a-z0-9]([a-z0-9]{0,10}(-[a-z0-9]{1,10}){0,3})?",
            selector in "dev|HEAD|stable|[0-9]\\.[0-9]\\.[0-9]",
        ) {
            let s = format!("space:{id}@{selector}");
            let parsed = parse(&s).unwrap();
            proptest::prop_assert_eq!(format(&parsed), s);
        }
    }
}
