//! Directory enumeration with visibility filtering.
//!
//! Both depths apply the same per-name filter. The recursive walk checks each
//! segment as it descends, so a hidden directory is never opened and nothing
//! below it is ever reported.

use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tracing::debug;

use crate::error::{ListingError, Result};
use crate::resolver::ResolvedPath;

/// Leading character marking an entry as hidden.
pub const HIDDEN_MARKER: char = '.';

/// Suffix appended to directory entries when displayed.
pub const DIR_MARKER: char = '/';

/// How far below the resolved directory to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Immediate children only.
    Flat,
    /// Every descendant, reported relative to the resolved directory.
    Recursive,
}

/// A single listed filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    is_dir: bool,
    display_path: String,
}

impl Entry {
    /// Create an entry. `display_path` is relative and carries no marker.
    pub fn new(name: impl Into<String>, is_dir: bool, display_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir,
            display_path: display_path.into(),
        }
    }

    /// Base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the entry is (or links to) a directory.
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Path relative to the enumerated directory, without a trailing marker.
    pub fn display_path(&self) -> &str {
        &self.display_path
    }

    /// Display path with the directory marker applied.
    pub fn display(&self) -> String {
        if self.is_dir {
            format!("{}{}", self.display_path, DIR_MARKER)
        } else {
            self.display_path.clone()
        }
    }
}

/// A child collected from one directory read, before any descent.
struct Child {
    name: String,
    path: PathBuf,
    is_dir: bool,
    descend: bool,
}

/// Lists directory entries, hiding pseudo-entries, hidden names and the
/// server's own reserved names.
#[derive(Debug, Clone, Default)]
pub struct EntryEnumerator {
    reserved_names: Vec<String>,
}

impl EntryEnumerator {
    /// Create an enumerator with no reserved names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude entries whose base name equals one of `names`.
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Names excluded in addition to hidden entries.
    pub fn reserved_names(&self) -> &[String] {
        &self.reserved_names
    }

    /// Whether an entry with this base name may appear in a listing.
    pub fn is_visible(&self, name: &str) -> bool {
        name != "."
            && name != ".."
            && !name.starts_with(HIDDEN_MARKER)
            && !self.reserved_names.iter().any(|r| r == name)
    }

    /// Whether every segment of a resolved directory below the root is
    /// visible, so that hidden and reserved subtrees cannot be browsed by
    /// naming them directly.
    pub fn is_listable(&self, dir: &ResolvedPath) -> bool {
        dir.is_root() || dir.relative().split('/').all(|segment| self.is_visible(segment))
    }

    /// Enumerate a resolved directory, sorted ascending by displayed path.
    ///
    /// A failure to open the directory itself is
    /// [`ListingError::PermissionDenied`]; any later failure, at any depth,
    /// aborts with [`ListingError::Read`] instead of returning a partial list.
    pub fn enumerate(&self, dir: &ResolvedPath, depth: Depth) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        let children = self.read_children(dir.path(), true)?;

        match depth {
            Depth::Flat => {
                entries.extend(
                    children
                        .into_iter()
                        .map(|c| Entry::new(c.name.clone(), c.is_dir, c.name)),
                );
            }
            Depth::Recursive => self.walk(children, "", &mut entries)?,
        }

        entries.sort_by_cached_key(Entry::display);
        Ok(entries)
    }

    /// Depth-first walk threading the relative prefix. Each level's directory
    /// handle is already closed by the time its children are descended into.
    fn walk(&self, children: Vec<Child>, prefix: &str, out: &mut Vec<Entry>) -> Result<()> {
        for child in children {
            let relative = if prefix.is_empty() {
                child.name.clone()
            } else {
                format!("{prefix}{MAIN_SEPARATOR}{}", child.name)
            };

            if child.descend {
                let grandchildren = self.read_children(&child.path, false)?;
                out.push(Entry::new(child.name, child.is_dir, relative.clone()));
                self.walk(grandchildren, &relative, out)?;
            } else {
                out.push(Entry::new(child.name, child.is_dir, relative));
            }
        }
        Ok(())
    }

    /// Read the visible children of one directory and close the handle.
    fn read_children(&self, dir: &Path, top: bool) -> Result<Vec<Child>> {
        let read_dir = fs::read_dir(dir).map_err(|source| {
            if top {
                ListingError::PermissionDenied {
                    path: dir.to_path_buf(),
                    source,
                }
            } else {
                read_error(dir, source)
            }
        })?;

        let mut children = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| read_error(dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.is_visible(&name) {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| read_error(&path, e))?;

            // Symlinks are labelled by their target but never descended, so
            // a recursive walk cannot leave the root through one.
            let (is_dir, descend) = if file_type.is_symlink() {
                (symlink_target_is_dir(&path), false)
            } else {
                (file_type.is_dir(), file_type.is_dir())
            };

            children.push(Child {
                name,
                path,
                is_dir,
                descend,
            });
        }

        Ok(children)
    }
}

/// Follow a symlink to decide whether it names a directory. A target that
/// cannot be examined (dangling, looping, unreadable) is a plain entry.
fn symlink_target_is_dir(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) => metadata.is_dir(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unresolvable symlink target");
            false
        }
    }
}

fn read_error(path: &Path, source: io::Error) -> ListingError {
    ListingError::Read {
        path: path.to_path_buf(),
        source,
    }
}
