use std::future::IntoFuture;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::ReturnDocument;
use mongodb::Collection;
use serde::{Deserialize, Serialize};

use plant_core::error::{PlantError, PlantResult};
use plant_core::plant::{NewPlant, Plant, PlantQuery, PlantUpdate};

use crate::connection::DbHandle;
use crate::monitor::ConnectionState;

pub const PLANT_COLLECTION: &str = "plants";

/// Snapshot of the backing connection for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatus {
    pub state: ConnectionState,
    pub database: String,
}

/// Persistence for plant records.
#[async_trait]
pub trait PlantStore: Send + Sync {
    async fn create(&self, plant: NewPlant) -> PlantResult<Plant>;

    /// Newest first.
    async fn list(&self, query: &PlantQuery) -> PlantResult<Vec<Plant>>;

    async fn get(&self, id: &str) -> PlantResult<Plant>;

    async fn update(&self, id: &str, update: PlantUpdate) -> PlantResult<Plant>;

    /// Remove a record and return it.
    async fn delete(&self, id: &str) -> PlantResult<Plant>;

    fn status(&self) -> StoreStatus;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlantDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    name: String,
    category: String,
    #[serde(default)]
    description: String,
    price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_public_id: Option<String>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<PlantDocument> for Plant {
    fn from(doc: PlantDocument) -> Self {
        Plant {
            id: doc.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: doc.name,
            category: doc.category,
            description: doc.description,
            price: doc.price,
            image_url: doc.image_url,
            image_public_id: doc.image_public_id,
            created_at: to_chrono(doc.created_at),
            updated_at: to_chrono(doc.updated_at),
        }
    }
}

fn to_chrono(dt: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// MongoDB-backed store sharing the single connection handle.
pub struct MongoPlantStore {
    handle: DbHandle,
    collection: Collection<PlantDocument>,
}

impl MongoPlantStore {
    pub fn new(handle: DbHandle) -> Self {
        let collection = handle.database().collection(PLANT_COLLECTION);
        Self { handle, collection }
    }

    /// Run a driver operation bounded by the socket timeout.
    async fn guarded<T, F>(&self, op: F) -> PlantResult<T>
    where
        F: IntoFuture<Output = mongodb::error::Result<T>>,
    {
        self.handle.ensure_ready()?;
        let limit = self.handle.options().socket_timeout;
        match tokio::time::timeout(limit, op.into_future()).await {
            Ok(result) => result.map_err(|e| PlantError::Database(e.into())),
            Err(_) => Err(PlantError::Timeout(limit)),
        }
    }
}

fn parse_id(id: &str) -> PlantResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| PlantError::InvalidId(id.to_string()))
}

fn not_found(id: &str) -> PlantError {
    PlantError::NotFound {
        resource: "Plant",
        id: id.to_string(),
    }
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}-/".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn query_filter(query: &PlantQuery) -> Document {
    let mut filter = Document::new();
    if let Some(ref category) = query.category {
        filter.insert("category", category.as_str());
    }
    if let Some(ref search) = query.search {
        filter.insert(
            "name",
            doc! { "$regex": escape_regex(search), "$options": "i" },
        );
    }
    filter
}

fn optional_bson(value: &str) -> Bson {
    if value.is_empty() {
        Bson::Null
    } else {
        Bson::String(value.to_string())
    }
}

fn update_document(update: &PlantUpdate) -> Document {
    let mut set = Document::new();
    if let Some(ref name) = update.name {
        set.insert("name", name.as_str());
    }
    if let Some(ref category) = update.category {
        set.insert("category", category.as_str());
    }
    if let Some(ref description) = update.description {
        set.insert("description", description.as_str());
    }
    if let Some(price) = update.price {
        set.insert("price", price);
    }
    if let Some(ref url) = update.image_url {
        set.insert("imageUrl", optional_bson(url));
    }
    if let Some(ref public_id) = update.image_public_id {
        set.insert("imagePublicId", optional_bson(public_id));
    }
    set.insert("updatedAt", bson::DateTime::now());
    doc! { "$set": set }
}

#[async_trait]
impl PlantStore for MongoPlantStore {
    async fn create(&self, plant: NewPlant) -> PlantResult<Plant> {
        let plant = plant.normalize()?;
        let now = bson::DateTime::now();
        let mut document = PlantDocument {
            id: None,
            name: plant.name,
            category: plant.category,
            description: plant.description,
            price: plant.price,
            image_url: plant.image_url,
            image_public_id: plant.image_public_id,
            created_at: now,
            updated_at: now,
        };

        let inserted = self.guarded(self.collection.insert_one(&document)).await?;
        document.id = inserted.inserted_id.as_object_id();

        tracing::debug!(id = ?document.id, "Plant created");
        Ok(document.into())
    }

    async fn list(&self, query: &PlantQuery) -> PlantResult<Vec<Plant>> {
        let filter = query_filter(query);
        let documents: Vec<PlantDocument> = self
            .guarded(async {
                let cursor = self
                    .collection
                    .find(filter)
                    .sort(doc! { "createdAt": -1 })
                    .await?;
                cursor.try_collect().await
            })
            .await?;

        Ok(documents.into_iter().map(Plant::from).collect())
    }

    async fn get(&self, id: &str) -> PlantResult<Plant> {
        let oid = parse_id(id)?;
        self.guarded(self.collection.find_one(doc! { "_id": oid }))
            .await?
            .map(Plant::from)
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, update: PlantUpdate) -> PlantResult<Plant> {
        let oid = parse_id(id)?;
        let update = update.normalize()?;
        self.guarded(
            self.collection
                .find_one_and_update(doc! { "_id": oid }, update_document(&update))
                .return_document(ReturnDocument::After),
        )
        .await?
        .map(Plant::from)
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: &str) -> PlantResult<Plant> {
        let oid = parse_id(id)?;
        self.guarded(self.collection.find_one_and_delete(doc! { "_id": oid }))
            .await?
            .map(Plant::from)
            .ok_or_else(|| not_found(id))
    }

    fn status(&self) -> StoreStatus {
        StoreStatus {
            state: self.handle.monitor().state(),
            database: self.handle.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_input_is_escaped() {
        assert_eq!(escape_regex("a.b*(c)"), "a\\.b\\*\\(c\\)");
        assert_eq!(escape_regex("fern"), "fern");
    }

    #[test]
    fn filter_combines_category_and_search() {
        let filter = query_filter(&PlantQuery {
            category: Some("Succulent".into()),
            search: Some("aloe+".into()),
        });
        assert_eq!(filter.get_str("category").unwrap(), "Succulent");
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "aloe\\+");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(query_filter(&PlantQuery::default()).is_empty());
    }

    #[test]
    fn update_sets_only_present_fields() {
        let update = PlantUpdate {
            price: Some(12.0),
            image_url: Some(String::new()),
            ..Default::default()
        };
        let document = update_document(&update);
        let set = document.get_document("$set").unwrap();

        assert_eq!(set.get_f64("price").unwrap(), 12.0);
        assert_eq!(set.get("imageUrl"), Some(&Bson::Null));
        assert!(set.get("name").is_none());
        assert!(set.get("updatedAt").is_some());
    }

    #[test]
    fn invalid_object_id_is_rejected() {
        assert!(matches!(parse_id("not-an-id"), Err(PlantError::InvalidId(_))));
        assert!(parse_id("65f0c0ffee0000000000abcd").is_ok());
    }

    #[test]
    fn document_converts_to_api_record() {
        let oid = ObjectId::new();
        let now = bson::DateTime::now();
        let plant: Plant = PlantDocument {
            id: Some(oid),
            name: "Aloe vera".into(),
            category: "Succulent".into(),
            description: String::new(),
            price: 9.99,
            image_url: None,
            image_public_id: None,
            created_at: now,
            updated_at: now,
        }
        .into();

        assert_eq!(plant.id, oid.to_hex());
        assert_eq!(plant.created_at.timestamp_millis(), now.timestamp_millis());
    }
}
