use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule identifying where in an artifact a patch acts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// First occurrence of a substring. Later occurrences are ignored, not
    /// reported: a literal anchor never detects ambiguity.
    Literal { anchor: String },
    /// Regular expression. With `dot_all` the `.` class also matches `\n`, so
    /// lazy spans like `<!-- A -->.*?<!-- B -->` can cross lines.
    Regex {
        pattern: String,
        #[serde(default = "default_true")]
        dot_all: bool,
        /// Act on every match instead of only the first one.
        #[serde(default)]
        all: bool,
    },
    /// Substring that must occur exactly once.
    Unique { anchor: String },
}

fn default_true() -> bool {
    true
}

impl Locator {
    pub fn literal(anchor: impl Into<String>) -> Self {
        Locator::Literal {
            anchor: anchor.into(),
        }
    }

    pub fn unique(anchor: impl Into<String>) -> Self {
        Locator::Unique {
            anchor: anchor.into(),
        }
    }

    /// First match of `pattern`, dot matching newlines.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Locator::Regex {
            pattern: pattern.into(),
            dot_all: true,
            all: false,
        }
    }

    /// Every match of `pattern`, dot matching newlines.
    pub fn regex_all(pattern: impl Into<String>) -> Self {
        Locator::Regex {
            pattern: pattern.into(),
            dot_all: true,
            all: true,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Literal { anchor } => write!(f, "literal {:?}", clip(anchor)),
            Locator::Unique { anchor } => write!(f, "unique {:?}", clip(anchor)),
            Locator::Regex { pattern, .. } => write!(f, "regex /{}/", clip(pattern)),
        }
    }
}

/// Shortens long anchors for error messages (char-boundary safe).
fn clip(s: &str) -> String {
    const MAX: usize = 60;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// What a patch does with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    /// Payload concatenated to the end of the text.
    Append,
    /// Located span replaced by the payload.
    ReplaceFirstMatch { locator: Locator },
    /// Payload inserted right after the located span; the span is kept.
    InsertAfterAnchor { locator: Locator },
}

impl Mode {
    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Mode::Append => None,
            Mode::ReplaceFirstMatch { locator } | Mode::InsertAfterAnchor { locator } => {
                Some(locator)
            }
        }
    }
}

/// Idempotency predicate over the current artifact text.
///
/// When the guard *holds*, the patch is skipped and the text is returned
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    /// Never holds.
    #[default]
    Unguarded,
    /// Holds when `marker` is present.
    Contains { marker: String },
    /// Holds when any of `markers` is present.
    ContainsAny { markers: Vec<String> },
    /// Holds when `marker` is absent. Removal patches use this: once the
    /// removed text is gone there is nothing left to do.
    Lacks { marker: String },
}

impl Guard {
    pub fn contains(marker: impl Into<String>) -> Self {
        Guard::Contains {
            marker: marker.into(),
        }
    }

    pub fn lacks(marker: impl Into<String>) -> Self {
        Guard::Lacks {
            marker: marker.into(),
        }
    }
}

/// A single named edit against one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub name: String,
    #[serde(flatten)]
    pub mode: Mode,
    pub payload: String,
    #[serde(default)]
    pub guard: Guard,
}

impl Patch {
    pub fn append(name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Append,
            payload: payload.into(),
            guard: Guard::Unguarded,
        }
    }

    pub fn replace(
        name: impl Into<String>,
        locator: Locator,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: Mode::ReplaceFirstMatch { locator },
            payload: payload.into(),
            guard: Guard::Unguarded,
        }
    }

    pub fn insert_after(
        name: impl Into<String>,
        locator: Locator,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: Mode::InsertAfterAnchor { locator },
            payload: payload.into(),
            guard: Guard::Unguarded,
        }
    }

    /// Replaces the guard, builder style.
    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }
}
