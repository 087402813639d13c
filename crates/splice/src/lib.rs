//! # Idempotent Patch Applier
//!
//! Pure text-in / text-out transform. Given the full current text of an
//! artifact and a [`Patch`], produce the new text exactly once:
//!
//! 1. If the patch's guard holds, return the input unchanged (`changed = false`).
//! 2. Resolve the locator to byte spans.
//! 3. Apply the mode. Spans are spliced **bottom-to-top** so earlier offsets
//!    stay valid while later ones are rewritten.
//!
//! Nothing here touches the filesystem; persistence belongs to the caller.

mod locate;

use common::{Mode, Patch};
use std::ops::Range;
use tracing::debug;

/// Errors from patch application. The input text is never modified.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("patch `{patch}`: locator not found: {locator}")]
    LocatorNotFound { patch: String, locator: String },
    #[error("patch `{patch}`: {locator} matched {count} times, expected exactly one")]
    AmbiguousMatch {
        patch: String,
        locator: String,
        count: usize,
    },
    #[error("patch `{patch}`: invalid pattern: {source}")]
    InvalidPattern {
        patch: String,
        #[source]
        source: regex::Error,
    },
    #[error("patch `{patch}`: invalid guard markers: {source}")]
    InvalidGuard {
        patch: String,
        #[source]
        source: aho_corasick::BuildError,
    },
    #[error("patch `{patch}`: empty anchor")]
    EmptyAnchor { patch: String },
}

/// Result of applying one patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub changed: bool,
}

/// Per-patch record inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub patch: String,
    pub changed: bool,
}

/// Result of applying an ordered list of patches to one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub text: String,
    pub edits: Vec<Edit>,
}

impl Batch {
    /// `true` if at least one patch changed the text.
    pub fn changed(&self) -> bool {
        self.edits.iter().any(|e| e.changed)
    }
}

/// Applies a single patch to `text`.
///
/// # Examples
/// ```
/// use common::{Guard, Locator, Patch};
///
/// let patch = Patch::insert_after(
///     "marker-div",
///     Locator::literal(r#"<body class="home-state">"#),
///     r#"<div id="x"></div>"#,
/// )
/// .guarded(Guard::contains(r#"id="x""#));
///
/// let once = splice::apply(r#"<body class="home-state">"#, &patch).unwrap();
/// assert_eq!(once.text, r#"<body class="home-state"><div id="x"></div>"#);
/// assert!(once.changed);
///
/// let twice = splice::apply(&once.text, &patch).unwrap();
/// assert_eq!(twice.text, once.text);
/// assert!(!twice.changed);
/// ```
///
/// # Errors
/// See [`PatchError`]. On error the caller must leave the artifact untouched.
pub fn apply(text: &str, patch: &Patch) -> Result<Outcome, PatchError> {
    if locate::guard_holds(&patch.guard, text, &patch.name)? {
        debug!(patch = %patch.name, "guard holds, skipping");
        return Ok(Outcome {
            text: text.to_string(),
            changed: false,
        });
    }

    let new_text = match &patch.mode {
        Mode::Append => {
            let mut out = String::with_capacity(text.len() + patch.payload.len());
            out.push_str(text);
            out.push_str(&patch.payload);
            out
        }
        Mode::ReplaceFirstMatch { locator } => {
            let spans = locate::locate(text, locator, &patch.name)?;
            splice_spans(text, &spans, &patch.payload, false)
        }
        Mode::InsertAfterAnchor { locator } => {
            let spans = locate::locate(text, locator, &patch.name)?;
            splice_spans(text, &spans, &patch.payload, true)
        }
    };

    let changed = new_text != text;
    debug!(patch = %patch.name, changed, "patch applied");
    Ok(Outcome {
        text: new_text,
        changed,
    })
}

/// Applies `patches` in order, each one seeing the previous one's output.
///
/// Stops at the first error; nothing from a partially applied batch is
/// returned, so the caller keeps the original text.
pub fn apply_all<'a, I>(text: &str, patches: I) -> Result<Batch, PatchError>
where
    I: IntoIterator<Item = &'a Patch>,
{
    let mut current = text.to_string();
    let mut edits = Vec::new();
    for patch in patches {
        let outcome = apply(&current, patch)?;
        edits.push(Edit {
            patch: patch.name.clone(),
            changed: outcome.changed,
        });
        current = outcome.text;
    }
    Ok(Batch {
        text: current,
        edits,
    })
}

/// Rewrites each span bottom-to-top. With `keep_anchor` the payload goes
/// right after the span, otherwise it replaces it.
///
/// `spans` must be ascending and non-overlapping.
fn splice_spans(text: &str, spans: &[Range<usize>], payload: &str, keep_anchor: bool) -> String {
    let mut out = String::with_capacity(text.len() + payload.len() * spans.len());
    out.push_str(text);
    for span in spans.iter().rev() {
        if keep_anchor {
            out.insert_str(span.end, payload);
        } else {
            out.replace_range(span.clone(), payload);
        }
    }
    out
}
