use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlantError, PlantResult};

pub const MAX_NAME_LEN: usize = 100;

/// A stored plant record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_public_id: Option<String>,
}

impl NewPlant {
    /// Trim string fields and check the record is storable.
    pub fn normalize(mut self) -> PlantResult<Self> {
        self.name = required_text("name", &self.name)?;
        self.category = required_text("category", &self.category)?;
        self.description = self.description.trim().to_string();
        check_price(self.price)?;
        self.image_url = optional_text(self.image_url);
        self.image_public_id = optional_text(self.image_public_id);
        Ok(self)
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_public_id: Option<String>,
}

impl PlantUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.image_public_id.is_none()
    }

    pub fn normalize(mut self) -> PlantResult<Self> {
        if self.is_empty() {
            return Err(PlantError::Validation("update contains no fields".into()));
        }
        if let Some(name) = self.name.take() {
            self.name = Some(required_text("name", &name)?);
        }
        if let Some(category) = self.category.take() {
            self.category = Some(required_text("category", &category)?);
        }
        if let Some(description) = self.description.take() {
            self.description = Some(description.trim().to_string());
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        if let Some(url) = self.image_url.take() {
            self.image_url = Some(url.trim().to_string());
        }
        if let Some(public_id) = self.image_public_id.take() {
            self.image_public_id = Some(public_id.trim().to_string());
        }
        Ok(self)
    }

    /// Apply onto an existing record (used by stores without server-side `$set`).
    pub fn apply_to(&self, plant: &mut Plant) {
        if let Some(ref name) = self.name {
            plant.name = name.clone();
        }
        if let Some(ref category) = self.category {
            plant.category = category.clone();
        }
        if let Some(ref description) = self.description {
            plant.description = description.clone();
        }
        if let Some(price) = self.price {
            plant.price = price;
        }
        if let Some(ref url) = self.image_url {
            plant.image_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        if let Some(ref public_id) = self.image_public_id {
            plant.image_public_id = Some(public_id.clone()).filter(|p| !p.is_empty());
        }
    }
}

/// List filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl PlantQuery {
    pub fn matches(&self, plant: &Plant) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| plant.category == c);
        let search_ok = self.search.as_deref().map_or(true, |s| {
            plant.name.to_lowercase().contains(&s.to_lowercase())
        });
        category_ok && search_ok
    }
}

fn required_text(field: &str, value: &str) -> PlantResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlantError::Validation(format!("{field} is required")));
    }
    if field == "name" && trimmed.chars().count() > MAX_NAME_LEN {
        return Err(PlantError::Validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_price(price: f64) -> PlantResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(PlantError::Validation(
            "price must be a non-negative number".into(),
        ));
    }
    Ok(())
}
