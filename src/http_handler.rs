use lambda_http::{Body, Error, Request, RequestExt, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::product::{Product, ProductPatch};
use crate::store::ProductStore;

const COLLECTION_PATH: &str = "/products";
const ITEM_PREFIX: &str = "/products/";

/// Routes one gateway event to a store operation. Anything that escapes the
/// routed handlers, such as an unparseable body, is logged and mapped to a
/// generic 500 here.
pub(crate) async fn function_handler<S: ProductStore>(
    store: &S,
    event: Request,
) -> Result<Response<Body>, Error> {
    match route(store, event).await {
        Ok(response) => Ok(response),
        Err(error) => {
            tracing::error!(%error, "request failed");
            message_response(500, "Internal Server Error")
        }
    }
}

async fn route<S: ProductStore>(store: &S, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path().to_string();
    match event.method().as_str() {
        "GET" => {
            if path == COLLECTION_PATH {
                match store.scan().await {
                    Ok(products) => json_response(200, &products),
                    Err(error) => {
                        tracing::error!(%error, "error listing products");
                        message_response(500, "Failed to list products")
                    }
                }
            } else if let Some(sku) = path.strip_prefix(ITEM_PREFIX) {
                // The suffix is taken verbatim; "/products/" looks up the
                // empty sku and comes back not found.
                match store.get(sku).await {
                    Ok(Some(product)) => json_response(200, &product),
                    Ok(None) => message_response(404, "Product not found"),
                    Err(error) => {
                        tracing::error!(%error, sku, "error getting product");
                        message_response(500, "Failed to get product")
                    }
                }
            } else {
                message_response(404, "Not found")
            }
        }
        "POST" => {
            let product: Product = parse_body(&event)?;
            match store.put(&product).await {
                Ok(()) => json_response(201, &product),
                Err(error) => {
                    tracing::error!(%error, sku = %product.sku, "error creating product");
                    message_response(500, "Failed to create product")
                }
            }
        }
        "PATCH" => {
            let params = event.path_parameters();
            let sku = match params.first("id") {
                Some(id) if !id.is_empty() => id,
                _ => return message_response(400, "Product ID is required"),
            };
            let patch: ProductPatch = parse_body(&event)?;
            match store.update(sku, patch).await {
                Ok(product) => json_response(200, &product),
                Err(error) => {
                    tracing::error!(%error, sku, "error updating product");
                    message_response(500, "Failed to update product")
                }
            }
        }
        "DELETE" => {
            let params = event.path_parameters();
            let sku = match params.first("id") {
                Some(id) if !id.is_empty() => id,
                _ => return message_response(400, "Product ID is required"),
            };
            match store.delete(sku).await {
                Ok(()) => Ok(Response::builder().status(204).body(Body::Empty)?),
                Err(error) => {
                    tracing::error!(%error, sku, "error deleting product");
                    message_response(500, "Failed to delete product")
                }
            }
        }
        _ => message_response(405, "Method Not Allowed"),
    }
}

/// A missing body parses as `{}`. Parse errors bubble to the outer handler.
fn parse_body<T: DeserializeOwned>(event: &Request) -> Result<T, Error> {
    let bytes = event.body().as_ref();
    if bytes.is_empty() {
        Ok(serde_json::from_slice(b"{}")?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn json_response<T: Serialize>(status: u16, value: &T) -> Result<Response<Body>, Error> {
    let body = serde_json::to_string(value)?;
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::Text(body))?)
}

fn message_response(status: u16, message: &str) -> Result<Response<Body>, Error> {
    json_response(status, &json!({ "message": message }))
}
