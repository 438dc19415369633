//! Client classification from the declared identity (`User-Agent`) string.
//!
//! This is a presentation heuristic. It picks the response format and never
//! gates access to anything.

/// Substrings identifying automated fetch tools, matched case-insensitively
/// anywhere in the identity string.
pub const AUTOMATED_CLIENT_PATTERNS: &[&str] = &[
    "curl",
    "wget",
    "httpie",
    "aria2",
    "lynx",
    "links",
    "w3m",
    "python-requests",
    "node-fetch",
    "urllib",
    "perl",
    "java",
    "powershell",
    "pwsh",
    "fetch",
    "axel",
    "lftp",
];

/// Response format selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Command-line tools and scripts: plain text.
    Automated,
    /// Browsers: HTML.
    Interactive,
}

/// Classifies clients against an ordered, lowercase pattern list.
#[derive(Debug, Clone)]
pub struct ClientClassifier {
    patterns: Vec<String>,
}

impl Default for ClientClassifier {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl ClientClassifier {
    /// Built-in patterns followed by `extra` ones. Blank extras are ignored.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = AUTOMATED_CLIENT_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();

        for pattern in extra {
            let pattern = pattern.as_ref().trim().to_lowercase();
            if !pattern.is_empty() && !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }

        Self { patterns }
    }

    /// Active patterns in match order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// The first pattern found in `identity`, if any.
    pub fn matching_pattern(&self, identity: &str) -> Option<&str> {
        let identity = identity.to_lowercase();
        self.patterns
            .iter()
            .find(|p| identity.contains(p.as_str()))
            .map(String::as_str)
    }

    /// Classify a request. A missing identity is treated as empty.
    pub fn classify(&self, identity: Option<&str>) -> ClientMode {
        match self.matching_pattern(identity.unwrap_or_default()) {
            Some(_) => ClientMode::Automated,
            None => ClientMode::Interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_tools_are_automated() {
        let classifier = ClientClassifier::default();
        for agent in [
            "curl/7.64.1",
            "Wget/1.20.3 (linux-gnu)",
            "HTTPie/3.0.0",
            "aria2/1.36.0",
            "python-requests/2.31.0",
            "Python-urllib/3.11",
            "libwww-perl/6.67",
            "Java/17.0.2",
            "Mozilla/5.0 (Windows NT; Windows NT 10.0; en-US) WindowsPowerShell/5.1",
            "Lynx/2.9.0dev.10 libwww-FM/2.14",
            "node-fetch/1.0",
        ] {
            assert_eq!(
                classifier.classify(Some(agent)),
                ClientMode::Automated,
                "{agent}"
            );
        }
    }

    #[test]
    fn test_browsers_are_interactive() {
        let classifier = ClientClassifier::default();
        for agent in [
            "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_1) AppleWebKit/605.1.15 Safari/605.1.15",
        ] {
            assert_eq!(classifier.classify(Some(agent)), ClientMode::Interactive);
        }
    }

    #[test]
    fn test_missing_identity_is_interactive() {
        let classifier = ClientClassifier::default();
        assert_eq!(classifier.classify(None), ClientMode::Interactive);
        assert_eq!(classifier.classify(Some("")), ClientMode::Interactive);
    }

    #[test]
    fn test_matching_is_case_insensitive_substring() {
        let classifier = ClientClassifier::default();
        assert_eq!(classifier.matching_pattern("my-CURL-wrapper"), Some("curl"));
        assert_eq!(classifier.matching_pattern("Mozilla/5.0"), None);
    }

    #[test]
    fn test_extra_patterns() {
        let classifier = ClientClassifier::new(["  MyBot ", "", "curl"]);
        assert_eq!(
            classifier.patterns().len(),
            AUTOMATED_CLIENT_PATTERNS.len() + 1
        );
        assert_eq!(classifier.patterns().last().unwrap(), "mybot");
        assert_eq!(
            classifier.classify(Some("MyBot/0.1")),
            ClientMode::Automated
        );
    }
}
