//! Client for the browserless/chrome rendering sidecar.
//!
//! The sidecar's `/function` endpoint executes a page script inside a real
//! browser; the script navigates to the problem page, waits for the
//! statement block to appear, and returns its inner HTML.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use tokio::time::Instant;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::problem::ProblemId;
use crate::statement::fetcher::{RetryPolicy, StatementFetcher, retry_with_backoff};

/// Page script run by the sidecar; the target URL is substituted in.
const RENDER_SCRIPT: &str = r#"
module.exports = async ({ page }) => {
  await page.setUserAgent('Mozilla/5.0 (Windows NT 10.0; Win64; x64) ' +
    'AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36');
  await page.goto("__TARGET__", { waitUntil: "domcontentloaded", timeout: 60000 });
  await page.waitForSelector('.problem-statement', { timeout: 30000 });
  const html = await page.$eval('.problem-statement', el => el.innerHTML.trim());
  return html;
};
"#;

/// Production `StatementFetcher` against a browserless/chrome sidecar.
pub struct BrowserlessFetcher {
    client: Client,
    config: FetcherConfig,
    policy: RetryPolicy,
}

impl BrowserlessFetcher {
    pub fn new(config: FetcherConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn render_script(problem: &ProblemId) -> String {
        let target = format!(
            "https://codeforces.com/problemset/problem/{}/{}",
            problem.contest(),
            problem.index()
        );
        RENDER_SCRIPT.replace("__TARGET__", &target)
    }

    async fn attempt(&self, script: &str) -> Result<String, FetchError> {
        let url = format!(
            "{}/function?token={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.token.expose_secret()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/javascript")
            .body(script.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Renderer { status, body });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl StatementFetcher for BrowserlessFetcher {
    async fn fetch(&self, problem: &ProblemId) -> Result<String, FetchError> {
        let script = Self::render_script(problem);
        let deadline = Instant::now() + self.config.deadline;

        tracing::debug!(problem = %problem, "requesting statement render");
        retry_with_backoff(&self.policy, deadline, || self.attempt(&script)).await
    }
}
