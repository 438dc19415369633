//! Per-request orchestration: classify, resolve, enumerate, render.
//!
//! The handler is synchronous and does blocking filesystem work; the HTTP
//! layer runs it on the blocking pool. It holds no mutable state, so one
//! instance is shared by every request.

use std::error::Error as _;
use std::io;

use axum::http::StatusCode;
use listing::render::{self, ListingContext};
use listing::{
    ClientClassifier, ClientMode, Depth, EntryEnumerator, ListingError, PathResolver, ResolvedPath,
};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Route names served by this daemon. Entries with these base names are
/// never listed, since the routes would shadow them anyway.
pub const RESERVED_NAMES: &[&str] = &["cli-list", "tree", "update"];

/// The listing entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Flat listing of the root.
    CliList,
    /// Recursive plain-text listing of a requested subdirectory.
    Tree,
    /// Flat listing of a requested directory in the negotiated format.
    Index,
}

impl Endpoint {
    /// Name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::CliList => "cli-list",
            Endpoint::Tree => "tree",
            Endpoint::Index => "index",
        }
    }

    fn depth(self) -> Depth {
        match self {
            Endpoint::Tree => Depth::Recursive,
            Endpoint::CliList | Endpoint::Index => Depth::Flat,
        }
    }

    /// The recursive listing always answers in text.
    fn mode(self, classified: ClientMode) -> ClientMode {
        match self {
            Endpoint::Tree => ClientMode::Automated,
            Endpoint::CliList | Endpoint::Index => classified,
        }
    }
}

/// Transport-ready outcome of a listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Response body.
    pub body: String,
}

impl ListingResponse {
    /// Error outcome rendered in the client's format.
    pub(crate) fn from_error(error: &ListingError, mode: ClientMode) -> Self {
        let rendered = render::render_error(error, mode);
        Self {
            status: StatusCode::from_u16(error.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            content_type: rendered.content_type,
            body: rendered.body,
        }
    }
}

/// Handles listing requests against one fixed root.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    resolver: PathResolver,
    enumerator: EntryEnumerator,
    classifier: ClientClassifier,
}

impl RequestHandler {
    /// Create a handler. Reserved route names are always excluded.
    pub fn new(resolver: PathResolver, classifier: ClientClassifier) -> Self {
        Self {
            resolver,
            enumerator: EntryEnumerator::new().with_reserved_names(RESERVED_NAMES.iter().copied()),
            classifier,
        }
    }

    /// Build a handler from configuration, canonicalizing the root.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let resolver = PathResolver::new(&config.server.root)?;
        let classifier = ClientClassifier::new(&config.classifier.extra_patterns);
        Ok(Self::new(resolver, classifier))
    }

    /// The path resolver, for callers that need the canonical root.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Classify a client from its identity header.
    pub fn classify(&self, identity: Option<&str>) -> ClientMode {
        self.classifier.classify(identity)
    }

    /// Resolve a requested directory that may be listed: inside the root,
    /// existing, and not below a hidden or reserved segment.
    pub fn resolve_listable(&self, requested: &str) -> Result<ResolvedPath, ListingError> {
        let dir = self.resolver.resolve(requested)?;
        if !self.enumerator.is_listable(&dir) {
            return Err(ListingError::not_found(requested));
        }
        Ok(dir)
    }

    /// Response format for a client on `endpoint`.
    pub fn response_mode(&self, endpoint: Endpoint, identity: Option<&str>) -> ClientMode {
        endpoint.mode(self.classify(identity))
    }

    /// Serve one request.
    ///
    /// `requested` is ignored by [`Endpoint::CliList`], which always lists
    /// the root. Error detail is logged, never returned.
    pub fn handle(
        &self,
        endpoint: Endpoint,
        requested: Option<&str>,
        identity: Option<&str>,
    ) -> ListingResponse {
        let mode = self.response_mode(endpoint, identity);
        self.handle_with_mode(endpoint, requested, mode)
    }

    /// Serve one request in an already decided format.
    pub fn handle_with_mode(
        &self,
        endpoint: Endpoint,
        requested: Option<&str>,
        mode: ClientMode,
    ) -> ListingResponse {
        let requested = requested.unwrap_or_default();

        let response = match self.list(endpoint, requested, mode) {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ListingError::NotFound { .. } => debug!(error = %err, "Listing not found"),
                    _ => warn!(error = %err, source = ?err.source(), "Listing failed"),
                }
                ListingResponse::from_error(&err, mode)
            }
        };

        info!(
            endpoint = endpoint.name(),
            ?mode,
            path = %requested,
            status = response.status.as_u16(),
            "Handled listing request"
        );
        response
    }

    fn list(
        &self,
        endpoint: Endpoint,
        requested: &str,
        mode: ClientMode,
    ) -> Result<ListingResponse, ListingError> {
        let dir = match endpoint {
            Endpoint::CliList => self.resolver.resolve_root(),
            Endpoint::Tree | Endpoint::Index => self.resolve_listable(requested)?,
        };

        let entries = self.enumerator.enumerate(&dir, endpoint.depth())?;
        debug!(dir = %dir.path().display(), count = entries.len(), "Enumerated directory");

        let rendered = render::render_listing(&entries, mode, &ListingContext::from(&dir));
        Ok(ListingResponse {
            status: StatusCode::OK,
            content_type: rendered.content_type,
            body: rendered.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing::{TEXT_HTML, TEXT_PLAIN};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const CURL: Option<&str> = Some("curl/8.5.0");
    const FIREFOX: Option<&str> =
        Some("Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0");

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("b")).unwrap();
        fs::create_dir_all(dir.join("sub/.git")).unwrap();
        fs::write(dir.join("a.txt"), "a").unwrap();
        fs::write(dir.join(".hidden"), "h").unwrap();
        fs::write(dir.join("tree"), "shadowed by the route").unwrap();
        fs::write(dir.join("sub/x.txt"), "x").unwrap();
        fs::write(dir.join("sub/<i>.txt"), "i").unwrap();
        fs::write(dir.join("sub/.git/config"), "[core]").unwrap();
    }

    fn handler(root: &Path) -> RequestHandler {
        RequestHandler::new(PathResolver::new(root).unwrap(), ClientClassifier::default())
    }

    #[test]
    fn test_cli_list_always_lists_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let response = handler.handle(Endpoint::CliList, Some("sub"), CURL);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, TEXT_PLAIN);
        assert_eq!(response.body, "a.txt\nb/\nsub/\n");

        let html = handler.handle(Endpoint::CliList, Some("sub"), None);
        assert_eq!(html.content_type, TEXT_HTML);
        assert!(html.body.contains("Index of /"));
    }

    #[test]
    fn test_index_negotiates() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let text = handler.handle(Endpoint::Index, None, CURL);
        assert_eq!(text.content_type, TEXT_PLAIN);
        assert_eq!(text.body, "a.txt\nb/\nsub/\n");

        let html = handler.handle(Endpoint::Index, None, FIREFOX);
        assert_eq!(html.status, StatusCode::OK);
        assert_eq!(html.content_type, TEXT_HTML);
        assert!(html.body.contains("Index of /"));
        assert!(!html.body.contains("href=\"../\""));
    }

    #[test]
    fn test_index_below_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let html = handler.handle(Endpoint::Index, Some("/sub/"), FIREFOX);
        assert_eq!(html.status, StatusCode::OK);
        assert!(html.body.contains("<title>Index of /sub</title>"));
        assert!(html.body.contains("href=\"../\""));
        assert!(html.body.contains("&lt;i&gt;.txt"));
        assert!(!html.body.contains("<i>"));
    }

    #[test]
    fn test_tree_lists_recursively() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let response = handler.handle(Endpoint::Tree, None, FIREFOX);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, TEXT_PLAIN);
        assert_eq!(
            response.body,
            "a.txt\nb/\nsub/\nsub/<i>.txt\nsub/x.txt\n"
        );
    }

    #[test]
    fn test_not_found_matches_mode() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        for requested in ["missing", "a.txt", "../../etc"] {
            let text = handler.handle(Endpoint::Index, Some(requested), CURL);
            assert_eq!(text.status, StatusCode::NOT_FOUND);
            assert_eq!(text.body, "Not found\n");

            let html = handler.handle(Endpoint::Index, Some(requested), FIREFOX);
            assert_eq!(html.status, StatusCode::NOT_FOUND);
            assert_eq!(html.content_type, TEXT_HTML);
            assert!(html.body.contains("404 - Not Found"));

            let tree = handler.handle(Endpoint::Tree, Some(requested), FIREFOX);
            assert_eq!(tree.status, StatusCode::NOT_FOUND);
            assert_eq!(tree.content_type, TEXT_PLAIN);
        }
    }

    #[test]
    fn test_hidden_directories_cannot_be_browsed() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let index = handler.handle(Endpoint::Index, Some("sub/.git/"), FIREFOX);
        assert_eq!(index.status, StatusCode::NOT_FOUND);

        let tree = handler.handle(Endpoint::Tree, Some("sub/.git"), CURL);
        assert_eq!(tree.status, StatusCode::NOT_FOUND);
        assert_eq!(tree.body, "Not found\n");
    }

    #[test]
    fn test_repeated_requests_are_identical() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let handler = handler(temp_dir.path());

        let first = handler.handle(Endpoint::Tree, None, CURL);
        let second = handler.handle(Endpoint::Tree, None, CURL);
        assert_eq!(first, second);
    }

    #[test]
    fn test_looping_symlink_does_not_fail_listing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink("loop", temp_dir.path().join("loop")).unwrap();
        let handler = handler(temp_dir.path());

        let response = handler.handle(Endpoint::Index, None, CURL);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, "a.txt\nloop\n");
    }

    #[test]
    fn test_from_config_uses_extra_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.root = temp_dir.path().to_path_buf();
        config.classifier.extra_patterns = vec!["mybot".to_string()];

        let handler = RequestHandler::from_config(&config).unwrap();
        assert_eq!(handler.classify(Some("MyBot/1.0")), ClientMode::Automated);
        assert_eq!(handler.resolver().root(), fs::canonicalize(temp_dir.path()).unwrap());
    }
}
