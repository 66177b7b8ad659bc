//! Run configuration, built once from the environment and passed by
//! reference into each component.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Site base URL, with trailing slash. Detail pages and seller links
    /// are derived from it.
    pub site_url: String,
    /// Paginated search/listing endpoint.
    pub search_url: String,
    /// By-identifier detail endpoint used in resume mode.
    pub details_url: String,
    pub query: String,
    pub dest: String,
    pub limit: String,
    pub sort: String,
    /// First page the catalog pager requests. The current deployment
    /// starts at 4; this is a parameter, not a universal constant.
    pub start_page: u32,
    pub headless: bool,
    pub browser_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
    /// URL substring identifying the background card-data response.
    pub card_url_marker: String,
    /// Session-token cookie promoted into an HTTP header.
    pub token_cookie: String,
    pub token_header: String,
    pub cookies_file: PathBuf,
    pub ids_file: PathBuf,
    pub records_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            site_url: env_or("SITE_URL", "https://www.wildberries.ru/"),
            search_url: env_or(
                "SEARCH_API_URL",
                "https://search.wb.ru/exactmatch/ru/common/v9/search",
            ),
            details_url: env_or("DETAILS_API_URL", "https://card.wb.ru/cards/v2/detail"),
            query: env::var("SEARCH_QUERY").context("SEARCH_QUERY must be set")?,
            dest: env_or("DEST", "-1257786"),
            limit: env_or("LIMIT", "100"),
            sort: env_or("SORT", "popular"),
            start_page: parse_env("START_PAGE", 1)?,
            headless: parse_env("HEADLESS_MODE", true)?,
            browser_timeout_ms: parse_env("BROWSER_TIMEOUT", 30_000)?,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT", 30)?,
            user_agent: env_or(
                "USER_AGENT",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36",
            ),
            accept_language: env_or("ACCEPT_LANGUAGE", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
            card_url_marker: env_or("CARD_URL_MARKER", "card.json"),
            token_cookie: env_or("TOKEN_COOKIE", "x_wbaas_token"),
            token_header: env_or("TOKEN_HEADER", "X-Wbaas-Token"),
            cookies_file: env_or("COOKIES_FILE", "cookies/cookies.json").into(),
            ids_file: env_or("PRODUCTS_ID_FILE", "data/products_ids.json").into(),
            records_file: env_or("PRODUCTS_FILE", "data/products.jsonl").into(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw}")),
        Err(_) => Ok(default),
    }
}
