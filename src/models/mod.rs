//! Data models for listing summaries, detail cards and persisted records

use serde::{Deserialize, Serialize};

/// Placeholder written in place of a genuinely missing field.
pub const NO_DATA: &str = "NO_DATA";

/// A field that is either a concrete value or the `NO_DATA` sentinel.
///
/// Persisted records never contain null/absent fields; anything the source
/// did not provide serializes as the sentinel string instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue<T> {
    Present(T),
    Missing(String),
}

impl<T> FieldValue<T> {
    pub fn missing() -> Self {
        Self::Missing(NO_DATA.to_string())
    }
}

impl<T> From<Option<T>> for FieldValue<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Self::missing, Self::Present)
    }
}

/// One entry of a paginated listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: Option<String>,
    pub supplier: Option<String>,
    #[serde(rename = "supplierId")]
    pub supplier_id: Option<i64>,
    #[serde(default)]
    pub sizes: Vec<ProductSize>,
    #[serde(rename = "totalQuantity")]
    pub total_quantity: Option<i64>,
    #[serde(rename = "reviewRating")]
    pub review_rating: Option<f64>,
    pub feedbacks: Option<i64>,
}

/// Size descriptor carried by a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSize {
    pub name: String,
    #[serde(default)]
    pub price: Option<SizePrice>,
}

/// Nested price structure of a size descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizePrice {
    #[serde(default)]
    pub product: Option<i64>,
}

/// Name/value characteristic listed on a detail card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub value: String,
}

/// Decoded body of the intercepted card response.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPayload {
    #[serde(default)]
    pub media: CardMedia,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardMedia {
    #[serde(default)]
    pub photo_count: i64,
}

/// Detail-page payload for one product, paired with the URL the data
/// actually arrived from (needed later for image URL synthesis).
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub response_url: String,
    pub media_count: i64,
    pub options: Vec<ProductOption>,
    pub description: Option<String>,
}

impl ProductCard {
    pub fn from_payload(response_url: String, payload: CardPayload) -> Self {
        Self {
            response_url,
            media_count: payload.media.photo_count,
            options: payload.options,
            description: payload.description,
        }
    }
}

/// The flattened record written to the sink, one per product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub link: String,
    pub product_id: i64,
    pub title: FieldValue<String>,
    pub price: FieldValue<i64>,
    pub seller_name: FieldValue<String>,
    pub seller_link: FieldValue<String>,
    pub sizes: FieldValue<String>,
    pub quantity: FieldValue<i64>,
    pub rating: FieldValue<f64>,
    pub reviews_count: FieldValue<i64>,
    pub description: FieldValue<String>,
    pub options: FieldValue<Vec<ProductOption>>,
    pub images: Vec<String>,
}
