//! Locator resolution and guard evaluation.
//!
//! Spans are byte ranges into the artifact text, always returned in
//! ascending, non-overlapping order so the applier can splice them
//! bottom-to-top.

use crate::PatchError;
use aho_corasick::AhoCorasick;
use common::{Guard, Locator};
use regex::RegexBuilder;
use std::ops::Range;

/// Resolves `locator` against `text`.
///
/// # Errors
/// - `LocatorNotFound` when nothing matches.
/// - `AmbiguousMatch` when a `Unique` anchor occurs more than once.
/// - `InvalidPattern` when a regex fails to compile.
/// - `EmptyAnchor` when a literal or unique anchor is `""`.
pub(crate) fn locate(
    text: &str,
    locator: &Locator,
    patch: &str,
) -> Result<Vec<Range<usize>>, PatchError> {
    // An empty anchor matches at offset 0 of any text.
    if let Locator::Literal { anchor } | Locator::Unique { anchor } = locator {
        if anchor.is_empty() {
            return Err(PatchError::EmptyAnchor {
                patch: patch.to_string(),
            });
        }
    }

    let spans: Vec<Range<usize>> = match locator {
        Locator::Literal { anchor } => text
            .find(anchor.as_str())
            .map(|start| vec![start..start + anchor.len()])
            .unwrap_or_default(),
        Locator::Unique { anchor } => {
            let hits: Vec<usize> = text
                .match_indices(anchor.as_str())
                .map(|(start, _)| start)
                .collect();
            if hits.len() > 1 {
                return Err(PatchError::AmbiguousMatch {
                    patch: patch.to_string(),
                    locator: locator.to_string(),
                    count: hits.len(),
                });
            }
            hits.into_iter()
                .map(|start| start..start + anchor.len())
                .collect()
        }
        Locator::Regex {
            pattern,
            dot_all,
            all,
        } => {
            let re = RegexBuilder::new(pattern)
                .dot_matches_new_line(*dot_all)
                .build()
                .map_err(|source| PatchError::InvalidPattern {
                    patch: patch.to_string(),
                    source,
                })?;
            if *all {
                re.find_iter(text).map(|m| m.range()).collect()
            } else {
                re.find(text).map(|m| vec![m.range()]).unwrap_or_default()
            }
        }
    };

    if spans.is_empty() {
        return Err(PatchError::LocatorNotFound {
            patch: patch.to_string(),
            locator: locator.to_string(),
        });
    }
    Ok(spans)
}

/// Returns `true` when `guard` holds against `text` (the patch must be skipped).
pub(crate) fn guard_holds(guard: &Guard, text: &str, patch: &str) -> Result<bool, PatchError> {
    let holds = match guard {
        Guard::Unguarded => false,
        Guard::Contains { marker } => text.contains(marker.as_str()),
        Guard::Lacks { marker } => !text.contains(marker.as_str()),
        Guard::ContainsAny { markers } if markers.is_empty() => false,
        Guard::ContainsAny { markers } => {
            let automaton =
                AhoCorasick::new(markers).map_err(|source| PatchError::InvalidGuard {
                    patch: patch.to_string(),
                    source,
                })?;
            automaton.is_match(text)
        }
    };
    Ok(holds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_takes_first_occurrence() {
        let spans = locate("ab ab ab", &Locator::literal("ab"), "t").unwrap();
        assert_eq!(spans, vec![0..2]);
    }

    #[test]
    fn test_unique_counts_hits() {
        let err = locate("ab ab", &Locator::unique("ab"), "t").unwrap_err();
        match err {
            PatchError::AmbiguousMatch { count, .. } => assert_eq!(count, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_regex_all_is_ascending() {
        let spans = locate("x1 y x2 x3", &Locator::regex_all(r"x\d"), "t").unwrap();
        assert_eq!(spans, vec![0..2, 5..7, 8..10]);
    }

    #[test]
    fn test_regex_without_dot_all_stays_on_line() {
        let locator = Locator::Regex {
            pattern: "<a>.*</a>".into(),
            dot_all: false,
            all: false,
        };
        let err = locate("<a>\n</a>", &locator, "t").unwrap_err();
        assert!(matches!(err, PatchError::LocatorNotFound { .. }));

        let spans = locate("<a>\n</a>", &Locator::regex("<a>.*</a>"), "t").unwrap();
        assert_eq!(spans, vec![0..8]);
    }

    #[test]
    fn test_empty_literal_and_unique_anchor() {
        for locator in [Locator::literal(""), Locator::unique("")] {
            let err = locate("abc", &locator, "t").unwrap_err();
            assert!(matches!(err, PatchError::EmptyAnchor { .. }));
        }
    }

    #[test]
    fn test_invalid_regex() {
        let err = locate("text", &Locator::regex("(unclosed"), "t").unwrap_err();
        assert!(matches!(err, PatchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_guards() {
        let text = "<div id=\"sidebar-menu\"></div>";
        assert!(!guard_holds(&Guard::Unguarded, text, "t").unwrap());
        assert!(guard_holds(&Guard::contains("sidebar-menu"), text, "t").unwrap());
        assert!(guard_holds(&Guard::lacks("language-toggle"), text, "t").unwrap());
        assert!(!guard_holds(&Guard::lacks("sidebar-menu"), text, "t").unwrap());

        let any = Guard::ContainsAny {
            markers: vec!["nope".into(), "id=\"sidebar".into()],
        };
        assert!(guard_holds(&any, text, "t").unwrap());

        let empty = Guard::ContainsAny { markers: vec![] };
        assert!(!guard_holds(&empty, text, "t").unwrap());
    }
}
