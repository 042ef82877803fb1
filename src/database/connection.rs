use mongodb::{
    bson::Document,
    options::IndexOptions,
    Client, Database, IndexModel,
};

use crate::errors::Result;

pub async fn get_db_client(database_url: &str, db_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(db_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!(database = db_name, ?collections, "Connected to MongoDB");
        }
        Err(e) => {
            tracing::warn!(database = db_name, "Database may not exist or is inaccessible: {}", e);
        }
    }

    ensure_indexes(&db).await?;
    Ok(db)
}

// Unique indexes back the duplicate checks and the one-ticket-per-order invariant.
async fn ensure_indexes(db: &Database) -> Result<()> {
    let unique = |field: &str| {
        let mut keys = Document::new();
        keys.insert(field, 1);
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    let users = db.collection::<Document>("users");
    users.create_index(unique("email")).await?;
    users.create_index(unique("phone")).await?;

    let tickets = db.collection::<Document>("tickets");
    tickets.create_index(unique("ticket_id")).await?;
    tickets.create_index(unique("gateway_order_id")).await?;

    let transactions = db.collection::<Document>("transactions");
    transactions.create_index(unique("transaction_id")).await?;
    transactions.create_index(unique("gateway_order_id")).await?;

    db.collection::<Document>("buses")
        .create_index(unique("bus_id"))
        .await?;
    db.collection::<Document>("bus_stops")
        .create_index(unique("name"))
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}
