use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig};
use colored::*;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

/// Source of pages and resource bytes.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<String>;

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Plain HTTP fetching, one request at a time.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: f64, user_agent: &str) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if timeout_seconds > 0.0 {
            builder = builder.timeout(Duration::from_secs_f64(timeout_seconds));
        }
        let client = builder
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        info!("Downloading \"{}\"", url.as_str().green());
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to request {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad response from {}", url))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read page body from {}", url))
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Loads pages in headless Chromium so script-built markup is captured.
/// Resources still come over plain HTTP.
pub struct BrowserFetcher {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    http: HttpFetcher,
    timeout: Duration,
}

impl BrowserFetcher {
    pub async fn launch(timeout_seconds: f64, user_agent: &str) -> Result<Self> {
        let timeout = Duration::from_secs_f64(timeout_seconds.max(1.0));
        let config = BrowserConfig::builder()
            .request_timeout(timeout)
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .build()
            .map_err(|e| anyhow!("Failed to create browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            http: HttpFetcher::new(timeout_seconds, user_agent)?,
            timeout,
        })
    }
}

#[async_trait]
impl Fetch for BrowserFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String> {
        info!("Rendering \"{}\"", url.as_str().green());
        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to create new page: {}", e))?;

        let loaded = tokio::time::timeout(self.timeout, async {
            page.goto(url.as_str())
                .await
                .map_err(|e| anyhow!("Failed to navigate to {}: {}", url, e))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| anyhow!("Failed to wait for navigation: {}", e))?;
            page.content()
                .await
                .map_err(|e| anyhow!("Failed to get page content: {}", e))
        })
        .await;

        page.close().await.ok();

        match loaded {
            Ok(content) => content,
            Err(_) => Err(anyhow!(
                "Rendering {} timed out after {:?}",
                url,
                self.timeout
            )),
        }
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        self.http.fetch_bytes(url).await
    }

    async fn close(&self) -> Result<()> {
        self.browser.lock().await.close().await.ok();
        self.handler.abort();
        Ok(())
    }
}
