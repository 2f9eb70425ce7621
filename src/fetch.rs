use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
// Some watch pages serve a bot-stripped shell to clients without a browser UA.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

pub fn client() -> Result<Client> {
    let timeout = std::env::var("TGRAB_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Client::builder()
        .timeout(Duration::from_secs(timeout))
        .user_agent(USER_AGENT)
        .build()
        .context("build HTTP client")
}

pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch {url}"))?;
    let resp = resp
        .error_for_status()
        .with_context(|| format!("fetch {url}"))?;
    let text = resp.text().await.with_context(|| format!("read body of {url}"))?;
    Ok(text)
}
