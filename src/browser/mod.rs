//! Rendered-browser session and card-data response interception
//!
//! The card payload is never fetched directly: navigating to a product's
//! detail page triggers a background request for `card.json`, and the
//! session captures that response as it goes by on the CDP network stream.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EnableParams, EventResponseReceived, GetResponseBodyParams, Headers,
    SetCookiesParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::auth::CookieStore;
use crate::config::Config;
use crate::error::HarvestError;
use crate::models::{CardPayload, ProductCard};
use crate::traits::CardSource;

const BROWSER_ARGS: [&str; 4] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--lang=ru-RU",
];

/// One rendered page, alive for the whole run. Must be released with
/// [`BrowserSession::close`] on every exit path.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    site_url: String,
    card_url_marker: String,
    navigation_timeout: Duration,
}

impl BrowserSession {
    pub async fn launch(config: &Config, cookies: &CookieStore) -> Result<Self, HarvestError> {
        let mut builder = BrowserConfig::builder().args(BROWSER_ARGS);
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|err| anyhow!("invalid browser configuration: {err}"))?;

        let (browser, mut cdp_events) = Browser::launch(browser_config)
            .await
            .context("failed to launch browser")?;
        // The handler must be polled for the lifetime of the browser; it
        // multiplexes every CDP message.
        let handler = tokio::spawn(async move { while cdp_events.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        page.execute(EnableParams::default())
            .await
            .context("failed to enable network events")?;

        let cookie_params = cookies
            .cookies()
            .iter()
            .map(|cookie| {
                let mut param = CookieParam::builder()
                    .name(&cookie.name)
                    .value(&cookie.value);
                if let Some(domain) = &cookie.domain {
                    param = param.domain(domain);
                } else {
                    param = param.url(&config.site_url);
                }
                if let Some(path) = &cookie.path {
                    param = param.path(path);
                }
                param.build().map_err(|err| anyhow!("bad cookie: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        page.execute(SetCookiesParams::new(cookie_params))
            .await
            .context("failed to set cookies")?;

        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::json!({
                "Accept-Language": config.accept_language,
                "User-Agent": config.user_agent,
            }),
        )))
        .await
        .context("failed to set headers")?;

        info!("browser session ready");

        Ok(Self {
            browser,
            page,
            handler,
            site_url: config.site_url.clone(),
            card_url_marker: config.card_url_marker.clone(),
            navigation_timeout: Duration::from_millis(config.browser_timeout_ms),
        })
    }

    /// Release the browser. Called unconditionally at the end of a run,
    /// whatever the outcome.
    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!("failed to close browser: {err}");
        }
        if let Err(err) = self.browser.wait().await {
            warn!("failed to reap browser process: {err}");
        }
        self.handler.abort();
        info!("browser session closed");
    }
}

#[async_trait]
impl CardSource for BrowserSession {
    async fn fetch_card(&self, id: i64) -> Result<ProductCard, HarvestError> {
        let url = format!("{}catalog/{id}/detail.aspx", self.site_url);

        // Subscribe before navigating so the card response cannot slip
        // past between page load and listener registration.
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|err| HarvestError::Fetch(format!("event subscription failed: {err}")))?;

        let marker = self.card_url_marker.clone();
        let (matched_tx, matched_rx) = oneshot::channel();
        let watcher = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.response.url.contains(&marker) {
                    let _ = matched_tx.send(event);
                    return;
                }
            }
        });

        let navigation = timeout(self.navigation_timeout, self.page.goto(url.as_str())).await;
        match navigation {
            Err(_) => {
                watcher.abort();
                return Err(HarvestError::Fetch(format!(
                    "navigation timed out for product {id}"
                )));
            }
            Ok(Err(err)) => {
                watcher.abort();
                return Err(HarvestError::Fetch(format!(
                    "navigation failed for product {id}: {err}"
                )));
            }
            Ok(Ok(_)) => {}
        }

        let event = match timeout(self.navigation_timeout, matched_rx).await {
            Ok(Ok(event)) => event,
            _ => {
                watcher.abort();
                return Err(HarvestError::Fetch(format!(
                    "no card response observed for product {id}"
                )));
            }
        };

        let status = event.response.status;
        if !(200..300).contains(&status) {
            return Err(HarvestError::Fetch(format!(
                "card response for product {id} returned status {status}"
            )));
        }

        let reply = self
            .page
            .execute(GetResponseBodyParams::new(event.request_id.clone()))
            .await
            .map_err(|err| {
                HarvestError::Fetch(format!("failed to read card body for product {id}: {err}"))
            })?;
        let body = &reply.result;
        let raw = if body.base64_encoded {
            let bytes = BASE64.decode(body.body.as_bytes()).map_err(|err| {
                HarvestError::Fetch(format!("card body for product {id} is not base64: {err}"))
            })?;
            String::from_utf8(bytes).map_err(|err| {
                HarvestError::Fetch(format!("card body for product {id} is not UTF-8: {err}"))
            })?
        } else {
            body.body.clone()
        };

        let payload: CardPayload = serde_json::from_str(&raw).map_err(|err| {
            HarvestError::Fetch(format!("malformed card payload for product {id}: {err}"))
        })?;

        Ok(ProductCard::from_payload(
            event.response.url.clone(),
            payload,
        ))
    }
}
