//! Hand-off to the manual e-signature step.
//!
//! After the prescription is submitted the operator signs it in a web
//! portal. [`BrowserLauncher`] opens that portal (or a blank page) with
//! the platform's URL opener, or with a configured browser executable.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Page opened when no e-signature URL is configured.
pub const BLANK_PAGE: &str = "about:blank";

/// Timeout for the platform URL opener to return.
const OPENER_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from the e-signature hand-off.
#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("Refusing to open unsafe e-signature URL '{0}'")]
    InvalidUrl(String),

    #[error("Failed to launch browser: {0}")]
    Launch(#[from] std::io::Error),

    #[error("Browser opener exited with status {0}")]
    ExitStatus(i32),

    #[error("Browser opener did not return within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Opens the e-signature page for the operator.
#[async_trait]
pub trait SignatureHandoff: Send + Sync {
    /// Open `url`, or a blank page when `None`.
    async fn open(&self, url: Option<&str>) -> Result<(), HandoffError>;
}

/// Launches the system browser.
#[derive(Debug, Clone, Default)]
pub struct BrowserLauncher {
    browser_path: Option<String>,
}

impl BrowserLauncher {
    /// * `browser_path` - executable to launch directly; `None` uses the
    ///   platform opener (`rundll32`, `open` or `xdg-open`).
    pub fn new(browser_path: Option<String>) -> Self {
        Self { browser_path }
    }
}

#[async_trait]
impl SignatureHandoff for BrowserLauncher {
    async fn open(&self, url: Option<&str>) -> Result<(), HandoffError> {
        let target = url.unwrap_or(BLANK_PAGE);
        if !is_safe_url(target) {
            return Err(HandoffError::InvalidUrl(target.to_string()));
        }

        tracing::info!(url = target, "Opening browser for e-signature");

        // A browser binary runs until the operator closes it, so it is
        // spawned and left running rather than awaited.
        if let Some(path) = &self.browser_path {
            Command::new(path).arg(target).spawn()?;
            return Ok(());
        }

        let status = tokio::time::timeout(OPENER_TIMEOUT, opener_command(target).status())
            .await
            .map_err(|_| HandoffError::Timeout(OPENER_TIMEOUT))??;

        if !status.success() {
            return Err(HandoffError::ExitStatus(status.code().unwrap_or(-1)));
        }
        Ok(())
    }
}

fn opener_command(target: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("rundll32");
        cmd.args(["url.dll,FileProtocolHandler", target]);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(target);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        cmd
    }
}

/// Accept `http(s)://` URLs and the blank page; reject whitespace, quotes
/// and control characters so the value stays a single opener argument.
pub fn is_safe_url(url: &str) -> bool {
    let scheme_ok = url == BLANK_PAGE || url.starts_with("https://") || url.starts_with("http://");
    scheme_ok
        && url.len() <= 2048
        && !url
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn safe_urls() {
        assert!(is_safe_url("https://esign.health.gov"));
        assert!(is_safe_url("http://10.0.0.5:8443/sign?rx=42&user=dr"));
        assert!(is_safe_url(BLANK_PAGE));
    }

    #[test]
    fn unsafe_urls() {
        assert!(!is_safe_url(""));
        assert!(!is_safe_url("file:///etc/passwd"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("https://a.example\" & calc"));
        assert!(!is_safe_url("https://a.example/\nnext"));
        assert!(!is_safe_url(&format!("https://{}", "a".repeat(3000))));
    }

    #[tokio::test]
    async fn launcher_rejects_unsafe_url_before_spawning() {
        let launcher = BrowserLauncher::new(Some("/nonexistent/browser".into()));
        assert_matches!(
            launcher.open(Some("ftp://example.org")).await,
            Err(HandoffError::InvalidUrl(_))
        );
    }

    #[tokio::test]
    async fn missing_browser_binary_is_a_launch_error() {
        let launcher = BrowserLauncher::new(Some("/nonexistent/rxentry-test-browser".into()));
        assert_matches!(
            launcher.open(Some("https://esign.example.org")).await,
            Err(HandoffError::Launch(_))
        );
    }
}
