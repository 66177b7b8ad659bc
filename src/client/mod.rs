//! HTTP session and paginated catalog discovery

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE};
use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::CookieStore;
use crate::config::Config;
use crate::error::HarvestError;
use crate::models::ProductSummary;
use crate::traits::SummarySource;

#[derive(Deserialize)]
struct ListingEnvelope {
    #[serde(default)]
    products: Vec<ProductSummary>,
}

/// One HTTP session for the whole run: the paginated listing endpoint
/// plus the by-identifier detail endpoint used when resuming.
pub struct CatalogClient {
    http: reqwest::Client,
    search_url: String,
    details_url: String,
    query: String,
    dest: String,
    limit: String,
    sort: String,
    start_page: u32,
    page_cursor: u32,
}

impl CatalogClient {
    pub fn new(config: &Config, cookies: &CookieStore) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("invalid ACCEPT_LANGUAGE value")?,
        );
        // The session token travels as a cookie in the browser but as a
        // header on the listing endpoint.
        if let Some(token) = cookies.value_of(&config.token_cookie) {
            headers.insert(
                HeaderName::from_bytes(config.token_header.as_bytes())
                    .context("invalid TOKEN_HEADER name")?,
                HeaderValue::from_str(token).context("invalid session token value")?,
            );
        }

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        info!("http session ready");

        Ok(Self {
            http,
            search_url: config.search_url.clone(),
            details_url: config.details_url.clone(),
            query: config.query.clone(),
            dest: config.dest.clone(),
            limit: config.limit.clone(),
            sort: config.sort.clone(),
            start_page: config.start_page,
            page_cursor: config.start_page,
        })
    }

    async fn fetch_products(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<ProductSummary>, HarvestError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let envelope: ListingEnvelope = response.json().await?;
        Ok(envelope.products)
    }
}

#[async_trait]
impl SummarySource for CatalogClient {
    async fn next_page(&mut self) -> Result<Vec<ProductSummary>, HarvestError> {
        let page = self.page_cursor;
        debug!("requesting listing page {page}");

        let page_param = page.to_string();
        let products = self
            .fetch_products(
                &self.search_url,
                &[
                    ("dest", self.dest.as_str()),
                    ("resultset", "catalog"),
                    ("query", self.query.as_str()),
                    ("sort", self.sort.as_str()),
                    ("limit", self.limit.as_str()),
                    ("page", page_param.as_str()),
                ],
            )
            .await?;

        if products.is_empty() {
            // Exhausted; a further call starts over from the first page.
            self.page_cursor = self.start_page;
        } else {
            self.page_cursor = page + 1;
        }

        Ok(products)
    }

    async fn summary(&self, id: i64) -> Result<ProductSummary, HarvestError> {
        let id_param = id.to_string();
        let products = self
            .fetch_products(
                &self.details_url,
                &[("dest", self.dest.as_str()), ("nm", id_param.as_str())],
            )
            .await?;

        products
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::Fetch(format!("no summary returned for product {id}")))
    }
}
