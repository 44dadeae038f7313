//! Pre-submission gate and the name normalization rules it relies on.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use thiserror::Error;

use crate::domain::entities::ModelNode;

/// Separator that replaces whitespace in identities and tags.
pub const NAME_SEPARATOR: &str = "_";

fn whitespace_run() -> &'static Regex {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Replace every run of whitespace with `_` ("Vanne De Regulation" → "Vanne_De_Regulation").
pub fn normalize_identity(raw: &str) -> String {
    whitespace_run()
        .replace_all(raw, NAME_SEPARATOR)
        .into_owned()
}

/// Tags are upper case with whitespace runs replaced by `_`.
pub fn normalize_tag(raw: &str) -> String {
    normalize_identity(&raw.to_uppercase())
}

/// Submission rejected before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Model name and Tag are required")]
    MissingRequired {
        identity_missing: bool,
        tag_missing: bool,
    },
}

/// Blank once separators are ignored: `""`, `"   "` and `"_"` all count.
fn is_blank(value: &str) -> bool {
    value
        .trim_matches(|c: char| c.is_whitespace() || c == '_')
        .is_empty()
}

/// Require a root identity and an equipment tag.
///
/// Both values are stored normalized, so whitespace typed by the user has
/// already become `_`. A value made only of `_` therefore counts as blank,
/// the same as an empty or whitespace-only one.
pub fn validate_submission(root: &ModelNode, tag: &str) -> Result<(), ValidationError> {
    let identity_missing = is_blank(root.identity());
    let tag_missing = is_blank(tag);
    if identity_missing || tag_missing {
        return Err(ValidationError::MissingRequired {
            identity_missing,
            tag_missing,
        });
    }
    Ok(())
}

/// Part identities used more than once, in first-seen order.
///
/// Duplicates are allowed; callers surface them as warnings.
pub fn duplicate_part_identities(root: &ModelNode) -> Vec<String> {
    root.parts()
        .iter()
        .map(|p| p.identity())
        .filter(|id| !id.is_empty())
        .duplicates()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_spaces_when_normalizing_identity_then_runs_collapse_to_separator() {
        assert_eq!(normalize_identity("Vanne De  Regulation"), "Vanne_De_Regulation");
        assert_eq!(normalize_identity("Vanne\t1"), "Vanne_1");
        assert_eq!(normalize_identity("Vanne_1"), "Vanne_1");
    }

    #[test]
    fn given_lowercase_tag_when_normalizing_then_upper_with_separator() {
        assert_eq!(normalize_tag("pomp 001"), "POMP_001");
    }

    #[test]
    fn given_separator_only_identity_when_checked_then_blank() {
        assert!(is_blank("_"));
        assert!(is_blank("  "));
        assert!(!is_blank("A"));
    }
}
