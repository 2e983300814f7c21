use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use plant_core::error::{PlantError, PlantResult};
use plant_core::plant::{NewPlant, Plant, PlantQuery, PlantUpdate};

use crate::monitor::{ConnectionMonitor, ConnectionState};
use crate::plant_store::{PlantStore, StoreStatus};

/// Process-local store with the same contract as the MongoDB one.
pub struct MemoryPlantStore {
    plants: RwLock<Vec<Plant>>,
    monitor: Arc<ConnectionMonitor>,
}

impl MemoryPlantStore {
    pub fn new() -> Self {
        let monitor = ConnectionMonitor::new();
        monitor.set_state(ConnectionState::Connected);
        Self {
            plants: RwLock::new(Vec::new()),
            monitor: Arc::new(monitor),
        }
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    fn ensure_ready(&self) -> PlantResult<()> {
        let state = self.monitor.state();
        if state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(PlantError::NotConnected(state.to_string()))
        }
    }
}

impl Default for MemoryPlantStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_id(id: &str) -> PlantResult<()> {
    ObjectId::parse_str(id)
        .map(|_| ())
        .map_err(|_| PlantError::InvalidId(id.to_string()))
}

fn not_found(id: &str) -> PlantError {
    PlantError::NotFound {
        resource: "Plant",
        id: id.to_string(),
    }
}

#[async_trait]
impl PlantStore for MemoryPlantStore {
    async fn create(&self, plant: NewPlant) -> PlantResult<Plant> {
        self.ensure_ready()?;
        let plant = plant.normalize()?;
        let now = Utc::now();
        let record = Plant {
            id: ObjectId::new().to_hex(),
            name: plant.name,
            category: plant.category,
            description: plant.description,
            price: plant.price,
            image_url: plant.image_url,
            image_public_id: plant.image_public_id,
            created_at: now,
            updated_at: now,
        };
        self.plants.write().await.push(record.clone());
        Ok(record)
    }

    async fn list(&self, query: &PlantQuery) -> PlantResult<Vec<Plant>> {
        self.ensure_ready()?;
        let plants = self.plants.read().await;
        Ok(plants
            .iter()
            .rev()
            .filter(|p| query.matches(p))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> PlantResult<Plant> {
        self.ensure_ready()?;
        check_id(id)?;
        self.plants
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: &str, update: PlantUpdate) -> PlantResult<Plant> {
        self.ensure_ready()?;
        check_id(id)?;
        let update = update.normalize()?;
        let mut plants = self.plants.write().await;
        let plant = plants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        update.apply_to(plant);
        plant.updated_at = Utc::now();
        Ok(plant.clone())
    }

    async fn delete(&self, id: &str) -> PlantResult<Plant> {
        self.ensure_ready()?;
        check_id(id)?;
        let mut plants = self.plants.write().await;
        let index = plants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        Ok(plants.remove(index))
    }

    fn status(&self) -> StoreStatus {
        StoreStatus {
            state: self.monitor.state(),
            database: "memory".to_string(),
        }
    }
}
