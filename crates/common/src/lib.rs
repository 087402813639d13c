//! # Patch Model
//!
//! Shared vocabulary for every `retouch` crate:
//! - [`Patch`]: one named edit (mode + payload + guard).
//! - [`Mode`]: `append`, `replace_first_match`, or `insert_after_anchor`; the
//!   two positional modes carry their [`Locator`].
//! - [`Guard`]: idempotency predicate; when it holds the patch is skipped.
//!
//! All types derive `serde` so that plan manifests can describe patches in
//! JSON without recompiling the catalog.

pub mod patch;

pub use patch::{Guard, Locator, Mode, Patch};
