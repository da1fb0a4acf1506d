use lambda_http::{run, service_fn, tracing, Error};

mod http_handler;
mod product;
mod store;

use http_handler::function_handler;
use store::DynamoStore;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let client = aws_sdk_dynamodb::Client::new(&config);
    // The table name comes from the deployment; an unset variable falls
    // through as an empty name and every store call fails at request time.
    let table = std::env::var("PRODUCTS_TABLE_NAME").unwrap_or_default();
    let store = DynamoStore::new(client, table);

    run(service_fn(|event| function_handler(&store, event))).await
}
