//! Artifact store: read a file in full, replace it atomically.
//!
//! ## Workflow
//! 1. `Scribe::open(root)` - canonicalises the artifact root.
//! 2. `read(rel)` - loads the whole artifact as UTF-8 text.
//! 3. `write(&artifact, text)` - writes a sibling temp file, syncs it, then
//!    renames it over the original. Readers see either the old bytes or the
//!    new bytes, never a mix.
//! 4. `patch(rel, patches)` - read, apply the patches in memory, write only
//!    when something changed. Any failure leaves the file untouched.

use common::Patch;
use splice::{Edit, PatchError};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Errors from artifact I/O and patching.
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },
    #[error("artifact path escapes the root: {}", path.display())]
    OutsideRoot { path: PathBuf },
    #[error("artifact is not valid UTF-8: {}", path.display())]
    NotUtf8 { path: PathBuf },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: PatchError,
    },
}

impl ScribeError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            ErrorKind::NotFound => ScribeError::ArtifactNotFound {
                path: path.to_path_buf(),
            },
            ErrorKind::InvalidData => ScribeError::NotUtf8 {
                path: path.to_path_buf(),
            },
            _ => ScribeError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Full in-memory copy of one artifact.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Path relative to the artifact root, as requested.
    pub rel: PathBuf,
    /// Absolute path on disk.
    pub path: PathBuf,
    pub text: String,
}

/// What `Scribe::patch` did to one artifact.
#[derive(Debug, Clone)]
pub struct ArtifactReport {
    pub rel: PathBuf,
    pub edits: Vec<Edit>,
    /// `false` when every patch was skipped by its guard.
    pub written: bool,
}

/// Reads and atomically rewrites artifacts under one root directory.
pub struct Scribe {
    root: PathBuf,
}

impl Scribe {
    /// Opens the artifact root.
    ///
    /// # Errors
    /// `ArtifactNotFound` if `root` does not exist.
    pub fn open(root: &Path) -> Result<Self, ScribeError> {
        let root = dunce::canonicalize(root).map_err(|e| ScribeError::io(root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel` under the root.
    ///
    /// # Errors
    /// `OutsideRoot` if `rel` is absolute or contains `..`.
    pub fn resolve(&self, rel: &Path) -> Result<PathBuf, ScribeError> {
        let confined = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined || rel.as_os_str().is_empty() {
            return Err(ScribeError::OutsideRoot {
                path: rel.to_path_buf(),
            });
        }
        Ok(self.root.join(rel))
    }

    /// Loads the whole artifact.
    pub fn read(&self, rel: &Path) -> Result<Artifact, ScribeError> {
        let path = self.resolve(rel)?;
        let text = std::fs::read_to_string(&path).map_err(|e| ScribeError::io(&path, e))?;
        Ok(Artifact {
            rel: rel.to_path_buf(),
            path,
            text,
        })
    }

    /// Replaces the artifact's content with `text` (write-complete-then-rename).
    ///
    /// A symlinked artifact is followed: the link stays and its target is
    /// replaced.
    pub fn write(&self, artifact: &Artifact, text: &str) -> Result<(), ScribeError> {
        let path = &link_target(&artifact.path)?;
        let dir = path.parent().unwrap_or(&self.root);

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ScribeError::io(dir, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ScribeError::io(tmp.path(), e))?;

        // Keep the original mode bits; a fresh temp file is 0600 on unix.
        if let Ok(meta) = std::fs::metadata(path) {
            if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
                warn!(artifact = %artifact.rel.display(), error = %e, "could not keep file permissions");
            }
        }

        tmp.persist(path)
            .map_err(|e| ScribeError::io(path, e.error))?;
        info!(artifact = %artifact.rel.display(), bytes = text.len(), "artifact written");
        Ok(())
    }

    /// Applies `patches` to the artifact at `rel` and persists the result.
    ///
    /// The file is written only if at least one patch changed the text. On
    /// error nothing is written.
    pub fn patch(&self, rel: &Path, patches: &[Patch]) -> Result<ArtifactReport, ScribeError> {
        let artifact = self.read(rel)?;
        let batch = splice::apply_all(&artifact.text, patches).map_err(|source| {
            ScribeError::Patch {
                path: rel.to_path_buf(),
                source,
            }
        })?;

        let written = batch.changed();
        if written {
            self.write(&artifact, &batch.text)?;
        } else {
            debug!(artifact = %rel.display(), "already up to date");
        }

        Ok(ArtifactReport {
            rel: rel.to_path_buf(),
            edits: batch.edits,
            written,
        })
    }
}

/// Final target of `path` when it is a symlink, else `path` itself.
fn link_target(path: &Path) -> Result<PathBuf, ScribeError> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            dunce::canonicalize(path).map_err(|e| ScribeError::io(path, e))
        }
        _ => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Guard, Locator};
    use std::fs;

    fn sidebar_link() -> Patch {
        Patch::insert_after(
            "link-sidebar-css",
            Locator::literal(r#"<link rel="stylesheet" href="auth-modal.css">"#),
            "\n  <link rel=\"stylesheet\" href=\"sidebar.css\">",
        )
        .guarded(Guard::contains("sidebar.css"))
    }

    #[test]
    fn test_open_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Scribe::open(&tmp.path().join("nowhere")).err().unwrap();
        assert!(matches!(err, ScribeError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_read_missing_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let scribe = Scribe::open(tmp.path()).unwrap();
        let err = scribe.read(Path::new("public/index.html")).unwrap_err();
        match err {
            ScribeError::ArtifactNotFound { path } => {
                assert!(path.ends_with("public/index.html"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_paths_outside_root_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("site");
        fs::create_dir_all(&root).unwrap();
        let outside = tmp.path().join("outside.txt");
        fs::write(&outside, "orig").unwrap();

        let scribe = Scribe::open(&root).unwrap();
        let escapes = [
            PathBuf::from("../outside.txt"),
            PathBuf::from("public/../../outside.txt"),
            outside.clone(),
        ];
        for rel in &escapes {
            let err = scribe
                .patch(rel, &[Patch::append("tail", "/* appended */")])
                .unwrap_err();
            assert!(
                matches!(err, ScribeError::OutsideRoot { .. }),
                "{} was not rejected",
                rel.display()
            );
        }
        assert_eq!(fs::read_to_string(&outside).unwrap(), "orig");

        assert!(scribe.resolve(Path::new("./public/index.html")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_through_symlink_keeps_link() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("shared")).unwrap();
        fs::write(tmp.path().join("shared/app.css"), ".a {}\n").unwrap();
        std::os::unix::fs::symlink("shared/app.css", tmp.path().join("app.css")).unwrap();

        let scribe = Scribe::open(tmp.path()).unwrap();
        let report = scribe
            .patch(Path::new("app.css"), &[Patch::append("tail", ".b {}\n")])
            .unwrap();
        assert!(report.written);

        let link = tmp.path().join("app.css");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_to_string(tmp.path().join("shared/app.css")).unwrap(),
            ".a {}\n.b {}\n"
        );
    }

    #[test]
    fn test_read_non_utf8() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("bin.css"), [0xff, 0xfe, 0x00]).unwrap();
        let scribe = Scribe::open(tmp.path()).unwrap();
        let err = scribe.read(Path::new("bin.css")).unwrap_err();
        assert!(matches!(err, ScribeError::NotUtf8 { .. }));
    }

    #[test]
    fn test_write_replaces_without_leftovers() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("style.css"), ".a {}\n").unwrap();

        let scribe = Scribe::open(tmp.path()).unwrap();
        let artifact = scribe.read(Path::new("style.css")).unwrap();
        scribe.write(&artifact, ".a {}\n.b {}\n").unwrap();

        let after = fs::read_to_string(tmp.path().join("style.css")).unwrap();
        assert_eq!(after, ".a {}\n.b {}\n");
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("app.js");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        let scribe = Scribe::open(tmp.path()).unwrap();
        let artifact = scribe.read(Path::new("app.js")).unwrap();
        scribe.write(&artifact, "y").unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_patch_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("public")).unwrap();
        let html = "<head>\n  <link rel=\"stylesheet\" href=\"auth-modal.css\">\n</head>\n";
        fs::write(tmp.path().join("public/index.html"), html).unwrap();

        let scribe = Scribe::open(tmp.path()).unwrap();
        let rel = Path::new("public/index.html");

        let first = scribe.patch(rel, &[sidebar_link()]).unwrap();
        assert!(first.written);
        let once = fs::read_to_string(tmp.path().join(rel)).unwrap();
        assert!(once.contains("href=\"sidebar.css\""));

        let second = scribe.patch(rel, &[sidebar_link()]).unwrap();
        assert!(!second.written);
        assert!(!second.edits[0].changed);
        assert_eq!(fs::read_to_string(tmp.path().join(rel)).unwrap(), once);
    }

    #[test]
    fn test_patch_failure_leaves_file_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let original = "<head></head>\n";
        fs::write(tmp.path().join("index.html"), original).unwrap();

        let scribe = Scribe::open(tmp.path()).unwrap();
        let patches = [
            Patch::append("ok", "<!-- tail -->"),
            sidebar_link(),
        ];
        let err = scribe.patch(Path::new("index.html"), &patches).unwrap_err();
        match err {
            ScribeError::Patch { source, .. } => {
                assert!(matches!(source, PatchError::LocatorNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let after = fs::read(tmp.path().join("index.html")).unwrap();
        assert_eq!(after, original.as_bytes());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
