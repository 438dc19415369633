//! # DirIndex Listing Engine
//!
//! This crate holds the logic behind DirIndex: exposing one directory subtree
//! as a listing that is plain text for command-line clients and HTML for
//! browsers.
//!
//! ## Overview
//!
//! - **Path resolution**: requested paths are canonicalized and must stay
//!   inside the root; every failure is the same `NotFound`
//! - **Enumeration**: flat or recursive, hidden entries filtered at every
//!   depth, sorted by displayed path
//! - **Classification**: `User-Agent` substring matching picks the format
//! - **Rendering**: pure text/HTML formatting with escaping
//!
//! ## Flow
//!
//! ```text
//! identity ──► ClientClassifier ──► ClientMode ─────────────┐
//!                                                            ▼
//! path ──► PathResolver ──► ResolvedPath ──► EntryEnumerator ──► render
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use listing::{render, ClientClassifier, Depth, EntryEnumerator, PathResolver};
//!
//! let resolver = PathResolver::new("/srv/files")?;
//! let mode = ClientClassifier::default().classify(Some("curl/8.5.0"));
//!
//! let dir = resolver.resolve("pub/").expect("exists");
//! let entries = EntryEnumerator::new().enumerate(&dir, Depth::Flat).expect("readable");
//! let rendered = render::render_listing(&entries, mode, &(&dir).into());
//! print!("{}", rendered.body);
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod classifier;
pub mod enumerator;
pub mod error;
pub mod render;
pub mod resolver;

pub use classifier::{ClientClassifier, ClientMode, AUTOMATED_CLIENT_PATTERNS};
pub use enumerator::{Depth, Entry, EntryEnumerator, DIR_MARKER, HIDDEN_MARKER};
pub use error::{ListingError, Result};
pub use render::{ListingContext, Rendered, TEXT_HTML, TEXT_PLAIN};
pub use resolver::{PathResolver, ResolvedPath};
