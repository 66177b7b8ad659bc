//! Field normalization: merges a summary and a card into one flat record

use crate::models::{FieldValue, NormalizedRecord, ProductCard, ProductSummary};

const CARD_PATH_SEGMENT: &str = "info/ru/card.json";
const IMAGES_PATH_SEGMENT: &str = "images/big/";

/// Pure normalizer. Missing fields degrade to the sentinel, never to an
/// error; identical inputs always yield an identical record.
pub struct Extractor {
    site_url: String,
}

impl Extractor {
    pub fn new(site_url: String) -> Self {
        Self { site_url }
    }

    pub fn normalize(&self, summary: &ProductSummary, card: &ProductCard) -> NormalizedRecord {
        NormalizedRecord {
            link: format!("{}catalog/{}/detail.aspx", self.site_url, summary.id),
            product_id: summary.id,
            title: summary.name.clone().into(),
            price: first_product_price(summary).into(),
            seller_name: summary.supplier.clone().into(),
            seller_link: summary
                .supplier_id
                .map(|sid| format!("{}seller/{sid}", self.site_url))
                .into(),
            sizes: joined_sizes(summary).into(),
            quantity: summary.total_quantity.into(),
            rating: summary.review_rating.into(),
            reviews_count: summary.feedbacks.into(),
            description: card.description.clone().into(),
            // Empty options collapse to the sentinel, not to an empty list.
            options: if card.options.is_empty() {
                FieldValue::missing()
            } else {
                FieldValue::Present(card.options.clone())
            },
            images: image_urls(card),
        }
    }
}

/// First size whose nested price carries a "product" entry, in listed order.
fn first_product_price(summary: &ProductSummary) -> Option<i64> {
    summary
        .sizes
        .iter()
        .find_map(|size| size.price.as_ref().and_then(|price| price.product))
}

// The emptiness check is on the joined string, not the list, so a lone
// unnamed size still collapses to the sentinel.
fn joined_sizes(summary: &ProductSummary) -> Option<String> {
    let joined = summary
        .sizes
        .iter()
        .map(|size| size.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() { None } else { Some(joined) }
}

/// Image URLs synthesized from the captured card response URL: the card
/// path segment is rewritten to the image directory and filenames are
/// enumerated `1.webp..=N.webp`. Falls back to an empty list, not the
/// sentinel, when the count or the URL is missing.
fn image_urls(card: &ProductCard) -> Vec<String> {
    if card.media_count <= 0 || card.response_url.is_empty() {
        return Vec::new();
    }
    let base = card.response_url.replace(CARD_PATH_SEGMENT, IMAGES_PATH_SEGMENT);
    (1..=card.media_count)
        .map(|index| format!("{base}{index}.webp"))
        .collect()
}
