//! Response body rendering.
//!
//! Every function here is pure: the output depends only on the entries, the
//! client mode and the listing context. Nothing touches the filesystem.

use url::Url;

use crate::classifier::ClientMode;
use crate::enumerator::{Entry, DIR_MARKER};
use crate::error::ListingError;
use crate::resolver::ResolvedPath;

/// Content type of plain-text bodies.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Content type of HTML bodies.
pub const TEXT_HTML: &str = "text/html; charset=utf-8";

const STYLE: &str = "body{font-family:-apple-system,BlinkMacSystemFont,\"Segoe UI\",Roboto,sans-serif;\
max-width:900px;margin:0 auto;padding:20px;background:#f8f9fa;color:#333}\
table{width:100%;border-collapse:collapse;background:#fff}\
th,td{padding:8px 10px;text-align:left;border-bottom:1px solid #eee}\
a{color:#0066cc;text-decoration:none}.dir{font-weight:600}";

/// A rendered response body and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Value for the `Content-Type` header.
    pub content_type: &'static str,
    /// Response body.
    pub body: String,
}

/// Where a listing sits relative to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingContext {
    /// Path shown in the title, `/` for the root.
    pub listing_path: String,
    /// Whether the listing is of the root itself.
    pub at_root: bool,
}

impl From<&ResolvedPath> for ListingContext {
    fn from(resolved: &ResolvedPath) -> Self {
        Self {
            listing_path: resolved.listing_path(),
            at_root: resolved.is_root(),
        }
    }
}

/// Content type for a client mode.
pub fn content_type(mode: ClientMode) -> &'static str {
    match mode {
        ClientMode::Automated => TEXT_PLAIN,
        ClientMode::Interactive => TEXT_HTML,
    }
}

/// Render a listing in the format for `mode`.
pub fn render_listing(entries: &[Entry], mode: ClientMode, context: &ListingContext) -> Rendered {
    let body = match mode {
        ClientMode::Automated => render_text(entries),
        ClientMode::Interactive => render_html(entries, context),
    };
    Rendered {
        content_type: content_type(mode),
        body,
    }
}

/// One entry per line, directories marked, newline after every line.
pub fn render_text(entries: &[Entry]) -> String {
    let mut body = String::new();
    for entry in entries {
        body.push_str(&entry.display());
        body.push('\n');
    }
    body
}

/// Self-contained HTML index page.
pub fn render_html(entries: &[Entry], context: &ListingContext) -> String {
    let title = format!("Index of {}", escape_html(&context.listing_path));

    let mut rows = String::new();
    if !context.at_root {
        rows.push_str("<tr><td><a href=\"../\" class=\"dir\">../</a></td><td>Dir</td></tr>\n");
    }

    for entry in entries {
        let mut href = encode_href(entry.display_path());
        let (class, label) = if entry.is_dir() {
            href.push(DIR_MARKER);
            (" class=\"dir\"", "Dir")
        } else {
            ("", "File")
        };
        rows.push_str(&format!(
            "<tr><td><a href=\"{}\"{}>{}</a></td><td>{}</td></tr>\n",
            escape_html(&href),
            class,
            escape_html(&entry.display()),
            label
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n\
<table>\n<tr><th>Name</th><th style=\"width: 100px;\">Type</th></tr>\n{rows}</table>\n\
</body>\n</html>\n"
    )
}

/// Render an error outcome. The body is fixed per status and never carries
/// error detail.
pub fn render_error(error: &ListingError, mode: ClientMode) -> Rendered {
    let (text, heading) = match error {
        ListingError::NotFound { .. } => ("Not found", "404 - Not Found"),
        ListingError::PermissionDenied { .. } => ("Permission denied", "403 - Permission Denied"),
        ListingError::Read { .. } => ("Error reading directory", "500 - Server Error"),
    };

    let body = match mode {
        ClientMode::Automated => format!("{text}\n"),
        ClientMode::Interactive => {
            format!("<!DOCTYPE html><html><body><h1>{heading}</h1></body></html>\n")
        }
    };

    Rendered {
        content_type: content_type(mode),
        body,
    }
}

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Absolute, slash-terminated URL path of a directory below the root.
///
/// Built from the resolved relative path, so empty segments never survive
/// and the result cannot start with `//`.
pub fn directory_location(relative: &str) -> String {
    if relative.is_empty() {
        return "/".to_string();
    }
    let mut location = encode_path(relative);
    location.push(DIR_MARKER);
    location
}

/// Percent-encode a relative `/`-separated path as a link target.
///
/// The result always starts with `./` so a name containing `:` is never
/// read as a URL scheme.
fn encode_href(relative: &str) -> String {
    format!(".{}", encode_path(relative))
}

/// Percent-encode each segment of a relative path, yielding `/seg/...`.
fn encode_path(relative: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("/{relative}");
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(relative.split(['/', std::path::MAIN_SEPARATOR]));
    }
    url.path().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn scenario_entries() -> Vec<Entry> {
        vec![Entry::new("a.txt", false, "a.txt"), Entry::new("b", true, "b")]
    }

    fn root_context() -> ListingContext {
        ListingContext {
            listing_path: "/".to_string(),
            at_root: true,
        }
    }

    fn sub_context() -> ListingContext {
        ListingContext {
            listing_path: "/sub".to_string(),
            at_root: false,
        }
    }

    #[test]
    fn test_text_listing() {
        let rendered = render_listing(&scenario_entries(), ClientMode::Automated, &root_context());
        assert_eq!(rendered.body, "a.txt\nb/\n");
        assert_eq!(rendered.content_type, TEXT_PLAIN);
    }

    #[test]
    fn test_text_listing_empty() {
        assert_eq!(render_text(&[]), "");
    }

    #[test]
    fn test_html_listing_at_root_has_no_parent_link() {
        let rendered = render_listing(&scenario_entries(), ClientMode::Interactive, &root_context());
        assert_eq!(rendered.content_type, TEXT_HTML);
        assert!(rendered.body.contains("<title>Index of /</title>"));
        assert!(!rendered.body.contains("href=\"../\""));
        assert!(rendered.body.contains("<a href=\"./a.txt\">a.txt</a></td><td>File</td>"));
        assert!(rendered
            .body
            .contains("<a href=\"./b/\" class=\"dir\">b/</a></td><td>Dir</td>"));
    }

    #[test]
    fn test_html_listing_below_root_has_parent_link() {
        let html = render_html(&scenario_entries(), &sub_context());
        assert!(html.contains("<title>Index of /sub</title>"));
        assert!(html.contains("<a href=\"../\" class=\"dir\">../</a>"));
    }

    #[test]
    fn test_html_escapes_names_and_title() {
        let entries = vec![Entry::new(
            "<script>alert('x')</script>&.txt",
            false,
            "<script>alert('x')</script>&.txt",
        )];
        let context = ListingContext {
            listing_path: "/<b>".to_string(),
            at_root: false,
        };
        let html = render_html(&entries, &context);

        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("Index of /&lt;b&gt;"));
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;&amp;.txt</a>"));
    }

    #[test]
    fn test_href_encoding() {
        assert_eq!(encode_href("a b.txt"), "./a%20b.txt");
        assert_eq!(encode_href("q?#.txt"), "./q%3F%23.txt");
        assert_eq!(encode_href("javascript:alert(1)"), "./javascript:alert(1)");
        assert_eq!(encode_href("dir/file"), "./dir/file");
    }

    #[test]
    fn test_directory_location() {
        assert_eq!(directory_location(""), "/");
        assert_eq!(directory_location("evil.example"), "/evil.example/");
        assert_eq!(directory_location("a b/c#d"), "/a%20b/c%23d/");
    }

    #[test]
    fn test_error_bodies_hide_detail() {
        let error = ListingError::Read {
            path: PathBuf::from("/srv/secret/place"),
            source: io::Error::other("EIO"),
        };

        let text = render_error(&error, ClientMode::Automated);
        assert_eq!(text.body, "Error reading directory\n");
        assert_eq!(text.content_type, TEXT_PLAIN);

        let html = render_error(&error, ClientMode::Interactive);
        assert!(html.body.contains("500 - Server Error"));
        assert!(!html.body.contains("/srv"));
        assert_eq!(html.content_type, TEXT_HTML);
    }

    #[test]
    fn test_error_bodies_per_kind() {
        let not_found = ListingError::not_found("../../etc");
        assert_eq!(
            render_error(&not_found, ClientMode::Automated).body,
            "Not found\n"
        );
        assert!(render_error(&not_found, ClientMode::Interactive)
            .body
            .contains("404 - Not Found"));

        let denied = ListingError::PermissionDenied {
            path: PathBuf::from("/srv"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert_eq!(
            render_error(&denied, ClientMode::Automated).body,
            "Permission denied\n"
        );
    }
}
