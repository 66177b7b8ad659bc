//! Pipeline orchestration: the three run modes over the pager, the card
//! source, the identifier store and the record sink

use tracing::info;

use crate::error::HarvestError;
use crate::extract::Extractor;
use crate::store::{IdentifierStore, RecordSink};
use crate::traits::{CardSource, SummarySource};

/// Run mode, selected once per run; not switchable mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Paginate the catalog and persist identifiers only.
    Identifiers,
    /// Paginate the catalog, fetch each card, persist records.
    Extract,
    /// Replay the identifier store, fetch summary + card per identifier.
    Resume,
}

impl Mode {
    pub fn from_arg(arg: Option<&str>) -> Result<Self, HarvestError> {
        match arg {
            Some("ids") => Ok(Self::Identifiers),
            Some("extract") | None => Ok(Self::Extract),
            Some("resume") => Ok(Self::Resume),
            Some(other) => Err(HarvestError::Other(anyhow::anyhow!(
                "unknown mode {other:?} (expected ids, extract or resume)"
            ))),
        }
    }
}

pub struct Harvester {
    store: IdentifierStore,
    sink: RecordSink,
    extractor: Extractor,
}

impl Harvester {
    pub fn new(store: IdentifierStore, sink: RecordSink, extractor: Extractor) -> Self {
        Self {
            store,
            sink,
            extractor,
        }
    }

    /// Walk the catalog and persist one identifier per summary, merging
    /// page by page. Zero identifiers across all pages is fatal.
    pub async fn collect_identifiers<S>(&self, pager: &mut S) -> Result<(), HarvestError>
    where
        S: SummarySource,
    {
        info!("collecting product identifiers");
        self.store.reset()?;

        let mut total = 0usize;
        loop {
            let page = pager.next_page().await?;
            if page.is_empty() {
                break;
            }
            let ids: Vec<i64> = page.iter().map(|summary| summary.id).collect();
            self.store.append(&ids)?;
            total += ids.len();
        }

        if total == 0 {
            return Err(HarvestError::Discovery);
        }
        info!("collected {total} product identifiers");
        Ok(())
    }

    /// Walk the catalog and persist one normalized record per summary.
    pub async fn extract_from_catalog<S, C>(
        &self,
        pager: &mut S,
        cards: &C,
    ) -> Result<(), HarvestError>
    where
        S: SummarySource,
        C: CardSource,
    {
        info!("extracting products from catalog");
        self.sink.reset()?;

        let mut ordinal = 0usize;
        loop {
            let page = pager.next_page().await?;
            if page.is_empty() {
                break;
            }
            for summary in page {
                ordinal += 1;
                info!("{ordinal}: extracting product {}", summary.id);
                let card = cards.fetch_card(summary.id).await?;
                self.sink.append(&self.extractor.normalize(&summary, &card))?;
            }
        }

        if ordinal == 0 {
            return Err(HarvestError::Discovery);
        }
        info!("extracted {ordinal} products");
        Ok(())
    }

    /// Replay the identifier store; each identifier costs two lookups,
    /// summary by id plus card. The sink is appended to, never truncated:
    /// records persisted by an interrupted run survive, and re-running
    /// over the same identifiers produces duplicate lines.
    pub async fn extract_from_store<S, C>(
        &self,
        summaries: &S,
        cards: &C,
    ) -> Result<(), HarvestError>
    where
        S: SummarySource,
        C: CardSource,
    {
        let ids = self.store.load_all()?;
        if ids.is_empty() {
            return Err(HarvestError::Discovery);
        }
        info!("resuming extraction over {} stored identifiers", ids.len());

        for (index, id) in ids.iter().enumerate() {
            info!("{}: extracting product {id}", index + 1);
            let summary = summaries.summary(*id).await?;
            let card = cards.fetch_card(*id).await?;
            self.sink.append(&self.extractor.normalize(&summary, &card))?;
        }

        info!("extracted {} products", ids.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProductCard, ProductSummary};
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;

    struct FakeCatalog {
        pages: Vec<Vec<ProductSummary>>,
        cursor: usize,
    }

    impl FakeCatalog {
        fn new(pages: Vec<Vec<ProductSummary>>) -> Self {
            Self { pages, cursor: 0 }
        }
    }

    #[async_trait]
    impl SummarySource for FakeCatalog {
        async fn next_page(&mut self) -> Result<Vec<ProductSummary>, HarvestError> {
            let index = self.cursor;
            self.cursor += 1;
            Ok(self.pages.get(index).cloned().unwrap_or_default())
        }

        async fn summary(&self, id: i64) -> Result<ProductSummary, HarvestError> {
            self.pages
                .iter()
                .flatten()
                .find(|summary| summary.id == id)
                .cloned()
                .ok_or_else(|| HarvestError::Fetch(format!("no summary for {id}")))
        }
    }

    struct FakeCards;

    #[async_trait]
    impl CardSource for FakeCards {
        async fn fetch_card(&self, id: i64) -> Result<ProductCard, HarvestError> {
            Ok(ProductCard {
                response_url: format!("https://cards.example.com/{id}/info/ru/card.json"),
                media_count: 1,
                options: Vec::new(),
                description: Some(format!("product {id}")),
            })
        }
    }

    fn summary(id: i64) -> ProductSummary {
        ProductSummary {
            id,
            name: Some(format!("Product {id}")),
            supplier: None,
            supplier_id: None,
            sizes: Vec::new(),
            total_quantity: None,
            review_rating: None,
            feedbacks: None,
        }
    }

    fn harvester(dir: &Path) -> Harvester {
        Harvester::new(
            IdentifierStore::new(dir.join("ids.json")),
            RecordSink::new(dir.join("products.jsonl")),
            Extractor::new("https://www.example.com/".to_string()),
        )
    }

    fn sink_ids(dir: &Path) -> Vec<i64> {
        fs::read_to_string(dir.join("products.jsonl"))
            .unwrap()
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["product_id"].as_i64().unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn identifiers_mode_stores_each_discovered_id() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let mut pager = FakeCatalog::new(vec![vec![summary(1), summary(2)], Vec::new()]);

        harvester.collect_identifiers(&mut pager).await.unwrap();

        let store = IdentifierStore::new(dir.path().join("ids.json"));
        assert_eq!(store.load_all().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_first_page_is_discovery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let mut pager = FakeCatalog::new(vec![Vec::new()]);

        let err = harvester.collect_identifiers(&mut pager).await.unwrap_err();
        assert!(matches!(err, HarvestError::Discovery));
    }

    #[tokio::test]
    async fn catalog_extraction_writes_one_record_per_summary() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let mut pager = FakeCatalog::new(vec![vec![summary(1), summary(2)], Vec::new()]);

        harvester
            .extract_from_catalog(&mut pager, &FakeCards)
            .await
            .unwrap();

        assert_eq!(sink_ids(dir.path()), vec![1, 2]);
    }

    #[tokio::test]
    async fn catalog_extraction_with_no_summaries_is_discovery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let mut pager = FakeCatalog::new(vec![Vec::new()]);

        let err = harvester
            .extract_from_catalog(&mut pager, &FakeCards)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Discovery));
    }

    #[tokio::test]
    async fn resume_over_collected_identifiers_matches_direct_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let pages = vec![vec![summary(1), summary(2)], Vec::new()];

        let mut pager = FakeCatalog::new(pages.clone());
        harvester.collect_identifiers(&mut pager).await.unwrap();

        let lookup = FakeCatalog::new(pages.clone());
        harvester
            .extract_from_store(&lookup, &FakeCards)
            .await
            .unwrap();
        let resumed = sink_ids(dir.path());

        let mut pager = FakeCatalog::new(pages);
        harvester
            .extract_from_catalog(&mut pager, &FakeCards)
            .await
            .unwrap();

        assert_eq!(resumed, sink_ids(dir.path()));
    }

    #[tokio::test]
    async fn resume_appends_without_truncating_prior_records() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());

        // An interrupted run already persisted product 1.
        let sink = RecordSink::new(dir.path().join("products.jsonl"));
        let card = FakeCards.fetch_card(1).await.unwrap();
        let extractor = Extractor::new("https://www.example.com/".to_string());
        sink.append(&extractor.normalize(&summary(1), &card)).unwrap();

        let store = IdentifierStore::new(dir.path().join("ids.json"));
        store.append(&[2]).unwrap();

        let lookup = FakeCatalog::new(vec![vec![summary(1), summary(2)], Vec::new()]);
        harvester
            .extract_from_store(&lookup, &FakeCards)
            .await
            .unwrap();

        assert_eq!(sink_ids(dir.path()), vec![1, 2]);
    }

    #[tokio::test]
    async fn catalog_extraction_truncates_previous_sink() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());

        let sink = RecordSink::new(dir.path().join("products.jsonl"));
        let card = FakeCards.fetch_card(9).await.unwrap();
        let extractor = Extractor::new("https://www.example.com/".to_string());
        sink.append(&extractor.normalize(&summary(9), &card)).unwrap();

        let mut pager = FakeCatalog::new(vec![vec![summary(1)], Vec::new()]);
        harvester
            .extract_from_catalog(&mut pager, &FakeCards)
            .await
            .unwrap();

        assert_eq!(sink_ids(dir.path()), vec![1]);
    }

    #[tokio::test]
    async fn resume_with_empty_store_is_discovery_failure() {
        let dir = tempfile::tempdir().unwrap();
        let harvester = harvester(dir.path());
        let lookup = FakeCatalog::new(Vec::new());

        let err = harvester
            .extract_from_store(&lookup, &FakeCards)
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::Discovery));
    }

    #[test]
    fn mode_parses_cli_words() {
        assert_eq!(Mode::from_arg(Some("ids")).unwrap(), Mode::Identifiers);
        assert_eq!(Mode::from_arg(Some("extract")).unwrap(), Mode::Extract);
        assert_eq!(Mode::from_arg(Some("resume")).unwrap(), Mode::Resume);
        assert_eq!(Mode::from_arg(None).unwrap(), Mode::Extract);
        assert!(Mode::from_arg(Some("bogus")).is_err());
    }
}
