//! Operator-triggered source refresh.
//!
//! Runs `git status` and `git pull` in a configured repository. The argument
//! lists are fixed; nothing from the request reaches the child process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use listing::render::escape_html;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// Header carrying the operator token.
pub const UPDATE_TOKEN_HEADER: &str = "x-update-token";

/// Errors that can occur while refreshing.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The child process could not be started.
    #[error("failed to run {program} {args}: {source}")]
    Spawn {
        program: String,
        args: String,
        #[source]
        source: io::Error,
    },
}

/// Captured output of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutput {
    /// Combined output of the status command.
    pub status: String,
    /// Combined output of the pull command.
    pub pull: String,
    /// Whether the pull exited successfully.
    pub pull_succeeded: bool,
}

/// Runs the refresh commands in one repository.
#[derive(Debug, Clone)]
pub struct SourceRefresher {
    repo_dir: PathBuf,
    program: String,
}

impl SourceRefresher {
    /// Create a refresher for `repo_dir` using `git`.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            program: "git".to_string(),
        }
    }

    /// Use a different executable in place of `git`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Repository the commands run in.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Report status, then pull.
    pub async fn refresh(&self) -> Result<RefreshOutput, UpdateError> {
        info!(repo = %self.repo_dir.display(), "Refreshing sources");

        let (status, _) = self.run(&["status"]).await?;
        let (pull, pull_succeeded) = self.run(&["pull"]).await?;

        if pull_succeeded {
            info!("Source refresh complete");
        } else {
            warn!(output = %pull.trim_end(), "Source refresh pull failed");
        }

        Ok(RefreshOutput {
            status,
            pull,
            pull_succeeded,
        })
    }

    /// Run one command, returning stdout followed by stderr.
    async fn run(&self, args: &[&str]) -> Result<(String, bool), UpdateError> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| UpdateError::Spawn {
                program: self.program.clone(),
                args: args.join(" "),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok((combined, output.status.success()))
    }
}

/// Compare the configured token with the one a request presented.
///
/// An empty configured token never matches.
pub fn token_matches(expected: &str, provided: Option<&str>) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    if expected.is_empty() || expected.len() != provided.len() {
        return false;
    }
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// HTML page reporting a refresh, returning to the index after ten seconds.
pub fn render_refresh_page(output: &RefreshOutput) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Update</title>\n\
<meta http-equiv=\"refresh\" content=\"10;url=./\">\n</head>\n<body>\n\
<h4>Status</h4>\n<pre>{}</pre>\n<h4>Pull</h4>\n<pre>{}</pre>\n\
<p><a href=\"./\">Back to index</a></p>\n</body>\n</html>\n",
        escape_html(&output.status),
        escape_html(&output.pull)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_refresh_runs_both_commands() {
        let temp_dir = TempDir::new().unwrap();
        let refresher = SourceRefresher::new(temp_dir.path()).with_program("echo");

        let output = refresher.refresh().await.unwrap();
        assert_eq!(output.status, "status\n");
        assert_eq!(output.pull, "pull\n");
        assert!(output.pull_succeeded);
    }

    #[tokio::test]
    async fn test_refresh_reports_failed_pull() {
        let temp_dir = TempDir::new().unwrap();
        let refresher = SourceRefresher::new(temp_dir.path()).with_program("false");

        let output = refresher.refresh().await.unwrap();
        assert!(!output.pull_succeeded);
    }

    #[tokio::test]
    async fn test_refresh_missing_repo_dir() {
        let temp_dir = TempDir::new().unwrap();
        let refresher = SourceRefresher::new(temp_dir.path().join("missing")).with_program("echo");

        let result = refresher.refresh().await;
        assert!(matches!(result, Err(UpdateError::Spawn { .. })));
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches("s3cret", Some("s3cret")));
        assert!(!token_matches("s3cret", Some("s3creT")));
        assert!(!token_matches("s3cret", Some("s3cret2")));
        assert!(!token_matches("s3cret", None));
        assert!(!token_matches("", Some("")));
    }

    #[test]
    fn test_refresh_page_escapes_output() {
        let page = render_refresh_page(&RefreshOutput {
            status: "On branch <main>\n".to_string(),
            pull: "Already up to date.\n".to_string(),
            pull_succeeded: true,
        });

        assert!(page.contains("On branch &lt;main&gt;"));
        assert!(page.contains("<pre>Already up to date.\n</pre>"));
        assert!(page.contains("content=\"10;url=./\""));
    }
}
