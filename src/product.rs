use serde::{Deserialize, Serialize};

/// A catalog product, keyed by `sku`. Every field except the key is
/// optional: the store keeps whatever the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(rename = "providerName", skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(rename = "providerSku", skip_serializing_if = "Option::is_none")]
    pub provider_sku: Option<String>,
    #[serde(rename = "providerUrl", skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
}

/// Update payload: the nine mutable fields. The sku is never part of an
/// update; it comes from the path parameter and cannot change.
///
/// An update rewrites all nine attributes from this payload. Fields left
/// out here are removed from the stored record, not preserved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    #[serde(rename = "providerName")]
    pub provider_name: Option<String>,
    #[serde(rename = "providerSku")]
    pub provider_sku: Option<String>,
    #[serde(rename = "providerUrl")]
    pub provider_url: Option<String>,
    pub available: Option<bool>,
}
