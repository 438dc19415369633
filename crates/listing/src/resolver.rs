//! Resolution of client-supplied paths against the exposed root.
//!
//! The root is canonicalized once, at construction. Every requested path is
//! joined onto it and canonicalized by the filesystem, and the traversal guard
//! runs on that canonical form: a raw-string check would be defeated by
//! symlinks and `..` segments.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{ListingError, Result};

/// A directory that has been validated to lie within the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Canonical absolute path of the directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the root, `/`-joined, empty for the root itself.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this is the root directory.
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Path shown to clients: `/` for the root, `/<relative>` below it.
    pub fn listing_path(&self) -> String {
        format!("/{}", self.relative)
    }
}

/// Resolves requested paths against a fixed root directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Create a resolver for the given root.
    ///
    /// The root is canonicalized here and must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(root.as_ref())?;
        if !fs::metadata(&root)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    /// Canonical root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Strip leading and trailing separators from a requested path.
    pub fn normalize(requested: &str) -> &str {
        requested.trim_matches(|c| c == '/' || c == MAIN_SEPARATOR)
    }

    /// Resolve the root directory itself.
    pub fn resolve_root(&self) -> ResolvedPath {
        ResolvedPath {
            path: self.root.clone(),
            relative: String::new(),
        }
    }

    /// Resolve a requested path to a directory within the root.
    ///
    /// Missing paths, inaccessible components, paths escaping the root and
    /// non-directories all produce the same [`ListingError::NotFound`].
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath> {
        let normalized = Self::normalize(requested);
        if normalized.is_empty() {
            return Ok(self.resolve_root());
        }

        let candidate = self.root.join(normalized);
        let canonical =
            fs::canonicalize(&candidate).map_err(|_| ListingError::not_found(requested))?;

        // Path::starts_with compares whole components, so /a/bc never
        // matches a root of /a/b.
        let relative = match canonical.strip_prefix(&self.root) {
            Ok(relative) => relative,
            Err(_) => return Err(ListingError::not_found(requested)),
        };

        let is_dir = fs::metadata(&canonical)
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ListingError::not_found(requested));
        }

        let relative = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        Ok(ResolvedPath {
            path: canonical,
            relative,
        })
    }
}
