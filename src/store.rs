use std::collections::HashMap;

use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use thiserror::Error;

use crate::product::{Product, ProductPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dynamodb request failed: {0}")]
    Request(String),
    #[error("stored item is missing attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("stored item has malformed attribute `{0}`")]
    MalformedAttribute(&'static str),
}

/// Persistence operations the handler needs. One implementation talks to
/// DynamoDB; tests substitute an in-memory map.
#[allow(async_fn_in_trait)]
pub trait ProductStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError>;
    async fn scan(&self) -> Result<Vec<Product>, StoreError>;
    async fn put(&self, product: &Product) -> Result<(), StoreError>;
    /// Full rewrite of the nine mutable attributes: attributes present in
    /// the patch are written, absent ones are removed. Upserts if the sku
    /// does not exist. Returns the record as stored after the write.
    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError>;
    /// Idempotent: deleting an unknown sku succeeds.
    async fn delete(&self, sku: &str) -> Result<(), StoreError>;
}

pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    pub fn new(client: Client, table: String) -> Self {
        Self { client, table }
    }
}

impl ProductStore for DynamoStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("sku", AttributeValue::S(sku.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        match output.item() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    async fn scan(&self) -> Result<Vec<Product>, StoreError> {
        let output = self
            .client
            .scan()
            .table_name(&self.table)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        output.items().iter().map(from_item).collect()
    }

    async fn put(&self, product: &Product) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(product)))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(())
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        let expr = update_expression(&patch);
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("sku", AttributeValue::S(sku.to_string()))
            .update_expression(&expr.expression)
            .set_expression_attribute_names(Some(expr.names))
            .return_values(ReturnValue::AllNew);
        if !expr.values.is_empty() {
            request = request.set_expression_attribute_values(Some(expr.values));
        }

        let output = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let attributes = output
            .attributes()
            .ok_or(StoreError::MissingAttribute("sku"))?;
        from_item(attributes)
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("sku", AttributeValue::S(sku.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        Ok(())
    }
}

fn to_item(product: &Product) -> HashMap<String, AttributeValue> {
    let mut item = HashMap::new();
    item.insert("sku".to_string(), AttributeValue::S(product.sku.clone()));
    if let Some(v) = &product.name {
        item.insert("name".to_string(), AttributeValue::S(v.clone()));
    }
    if let Some(v) = &product.description {
        item.insert("description".to_string(), AttributeValue::S(v.clone()));
    }
    if let Some(v) = &product.images {
        let urls = v.iter().map(|u| AttributeValue::S(u.clone())).collect();
        item.insert("images".to_string(), AttributeValue::L(urls));
    }
    if let Some(v) = product.price {
        item.insert("price".to_string(), AttributeValue::N(v.to_string()));
    }
    if let Some(v) = product.quantity {
        item.insert("quantity".to_string(), AttributeValue::N(v.to_string()));
    }
    if let Some(v) = &product.provider_name {
        item.insert("providerName".to_string(), AttributeValue::S(v.clone()));
    }
    if let Some(v) = &product.provider_sku {
        item.insert("providerSku".to_string(), AttributeValue::S(v.clone()));
    }
    if let Some(v) = &product.provider_url {
        item.insert("providerUrl".to_string(), AttributeValue::S(v.clone()));
    }
    if let Some(v) = product.available {
        item.insert("available".to_string(), AttributeValue::Bool(v));
    }
    item
}

fn from_item(item: &HashMap<String, AttributeValue>) -> Result<Product, StoreError> {
    let sku = item
        .get("sku")
        .ok_or(StoreError::MissingAttribute("sku"))?
        .as_s()
        .map_err(|_| StoreError::MalformedAttribute("sku"))?
        .clone();

    Ok(Product {
        sku,
        name: string_attr(item, "name"),
        description: string_attr(item, "description"),
        images: item.get("images").and_then(|v| v.as_l().ok()).map(|list| {
            list.iter()
                .filter_map(|v| v.as_s().ok().cloned())
                .collect()
        }),
        price: number_attr(item, "price"),
        quantity: number_attr(item, "quantity"),
        provider_name: string_attr(item, "providerName"),
        provider_sku: string_attr(item, "providerSku"),
        provider_url: string_attr(item, "providerUrl"),
        available: item.get("available").and_then(|v| v.as_bool().ok()).copied(),
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

fn number_attr<T: std::str::FromStr>(item: &HashMap<String, AttributeValue>, name: &str) -> Option<T> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
}

struct UpdateExpr {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

/// SET every attribute supplied in the patch and REMOVE the rest, so the
/// record ends up holding exactly the patch. `name` is a DynamoDB reserved
/// word and goes through an expression alias.
fn update_expression(patch: &ProductPatch) -> UpdateExpr {
    let attrs: Vec<(&str, Option<AttributeValue>)> = vec![
        ("name", patch.name.clone().map(AttributeValue::S)),
        ("description", patch.description.clone().map(AttributeValue::S)),
        (
            "images",
            patch.images.clone().map(|urls| {
                AttributeValue::L(urls.into_iter().map(AttributeValue::S).collect())
            }),
        ),
        ("price", patch.price.map(|v| AttributeValue::N(v.to_string()))),
        ("quantity", patch.quantity.map(|v| AttributeValue::N(v.to_string()))),
        ("providerName", patch.provider_name.clone().map(AttributeValue::S)),
        ("providerSku", patch.provider_sku.clone().map(AttributeValue::S)),
        ("providerUrl", patch.provider_url.clone().map(AttributeValue::S)),
        ("available", patch.available.map(AttributeValue::Bool)),
    ];

    let mut sets = Vec::new();
    let mut removes = Vec::new();
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    for (attr, value) in attrs {
        let reference = if attr == "name" {
            names.insert("#name".to_string(), "name".to_string());
            "#name".to_string()
        } else {
            attr.to_string()
        };
        match value {
            Some(v) => {
                sets.push(format!("{reference} = :{attr}"));
                values.insert(format!(":{attr}"), v);
            }
            None => removes.push(reference),
        }
    }

    let mut expression = String::new();
    if !sets.is_empty() {
        expression.push_str("SET ");
        expression.push_str(&sets.join(", "));
    }
    if !removes.is_empty() {
        if !expression.is_empty() {
            expression.push(' ');
        }
        expression.push_str("REMOVE ");
        expression.push_str(&removes.join(", "));
    }

    UpdateExpr {
        expression,
        names,
        values,
    }
}

#[cfg(test)]
pub struct InMemoryStore {
    items: std::sync::Mutex<HashMap<String, Product>>,
    fail: bool,
}

#[cfg(test)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            items: std::sync::Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    /// A store whose every operation fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            items: std::sync::Mutex::new(HashMap::new()),
            fail: true,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Request("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl ProductStore for InMemoryStore {
    async fn get(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        self.check()?;
        Ok(self.items.lock().unwrap().get(sku).cloned())
    }

    async fn scan(&self) -> Result<Vec<Product>, StoreError> {
        self.check()?;
        let mut products: Vec<Product> = self.items.lock().unwrap().values().cloned().collect();
        products.sort_by(|a, b| a.sku.cmp(&b.sku));
        Ok(products)
    }

    async fn put(&self, product: &Product) -> Result<(), StoreError> {
        self.check()?;
        self.items
            .lock()
            .unwrap()
            .insert(product.sku.clone(), product.clone());
        Ok(())
    }

    async fn update(&self, sku: &str, patch: ProductPatch) -> Result<Product, StoreError> {
        self.check()?;
        // Same contract as DynamoStore: the record becomes exactly the patch.
        let product = Product {
            sku: sku.to_string(),
            name: patch.name,
            description: patch.description,
            images: patch.images,
            price: patch.price,
            quantity: patch.quantity,
            provider_name: patch.provider_name,
            provider_sku: patch.provider_sku,
            provider_url: patch.provider_url,
            available: patch.available,
        };
        self.items
            .lock()
            .unwrap()
            .insert(sku.to_string(), product.clone());
        Ok(product)
    }

    async fn delete(&self, sku: &str) -> Result<(), StoreError> {
        self.check()?;
        self.items.lock().unwrap().remove(sku);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_product() -> Product {
        Product {
            sku: "A1".to_string(),
            name: Some("Widget".to_string()),
            description: Some("A widget".to_string()),
            images: Some(vec!["https://example.com/widget.png".to_string()]),
            price: Some(9.99),
            quantity: Some(3),
            provider_name: Some("Acme".to_string()),
            provider_sku: Some("ACME-1".to_string()),
            provider_url: Some("https://acme.example.com".to_string()),
            available: Some(true),
        }
    }

    #[test]
    fn item_round_trip() {
        let product = full_product();
        let restored = from_item(&to_item(&product)).unwrap();
        assert_eq!(restored, product);
    }

    #[test]
    fn item_without_sku_is_rejected() {
        let mut item = to_item(&full_product());
        item.remove("sku");
        assert!(matches!(
            from_item(&item),
            Err(StoreError::MissingAttribute("sku"))
        ));
    }

    #[test]
    fn sparse_item_maps_to_absent_fields() {
        let mut item = HashMap::new();
        item.insert("sku".to_string(), AttributeValue::S("B2".to_string()));
        item.insert("quantity".to_string(), AttributeValue::N("7".to_string()));
        let product = from_item(&item).unwrap();
        assert_eq!(product.sku, "B2");
        assert_eq!(product.quantity, Some(7));
        assert_eq!(product.name, None);
        assert_eq!(product.price, None);
    }

    #[test]
    fn update_expression_sets_supplied_and_removes_omitted() {
        let patch = ProductPatch {
            name: Some("Widget2".to_string()),
            price: Some(1.5),
            ..ProductPatch::default()
        };
        let expr = update_expression(&patch);
        assert_eq!(
            expr.expression,
            "SET #name = :name, price = :price \
             REMOVE description, images, quantity, providerName, providerSku, providerUrl, available"
        );
        assert_eq!(expr.names.get("#name"), Some(&"name".to_string()));
        assert_eq!(
            expr.values.get(":name"),
            Some(&AttributeValue::S("Widget2".to_string()))
        );
        assert_eq!(
            expr.values.get(":price"),
            Some(&AttributeValue::N("1.5".to_string()))
        );
        assert_eq!(expr.values.len(), 2);
    }

    #[test]
    fn empty_patch_removes_everything() {
        let expr = update_expression(&ProductPatch::default());
        assert_eq!(
            expr.expression,
            "REMOVE #name, description, images, price, quantity, providerName, providerSku, providerUrl, available"
        );
        assert!(expr.values.is_empty());
    }

    #[tokio::test]
    async fn in_memory_update_is_a_full_rewrite() {
        let store = InMemoryStore::new();
        store.put(&full_product()).await.unwrap();

        let patch = ProductPatch {
            name: Some("Widget2".to_string()),
            ..ProductPatch::default()
        };
        let updated = store.update("A1", patch).await.unwrap();
        assert_eq!(updated.name, Some("Widget2".to_string()));
        assert_eq!(updated.price, None);

        let stored = store.get("A1").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }
}
