use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, MethodRouter};
use axum::Router;

use plant_core::plant::{NewPlant, Plant, PlantQuery, PlantUpdate};

use crate::error::ApiResult;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::response::ApiResponse;
use crate::state::AppState;

/// List and create; also mounted at the trailing-slash form of the prefix.
pub fn collection() -> MethodRouter<AppState> {
    get(list_plants).post(create_plant)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", collection())
        .route(
            "/{id}",
            get(get_plant).put(update_plant).delete(delete_plant),
        )
}

async fn create_plant(
    State(state): State<AppState>,
    JsonBody(plant): JsonBody<NewPlant>,
) -> ApiResult<Response> {
    let plant = state.store.create(plant).await?;
    tracing::info!(id = %plant.id, name = %plant.name, "Plant created");
    Ok(ApiResponse::ok(plant)
        .with_message("Plant created successfully")
        .created())
}

async fn list_plants(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<PlantQuery>,
) -> ApiResult<ApiResponse<Vec<Plant>>> {
    let plants = state.store.list(&query).await?;
    Ok(ApiResponse::ok(plants))
}

async fn get_plant(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> ApiResult<ApiResponse<Plant>> {
    Ok(ApiResponse::ok(state.store.get(&id).await?))
}

async fn update_plant(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
    JsonBody(update): JsonBody<PlantUpdate>,
) -> ApiResult<ApiResponse<Plant>> {
    let plant = state.store.update(&id, update).await?;
    tracing::info!(id = %plant.id, "Plant updated");
    Ok(ApiResponse::ok(plant).with_message("Plant updated successfully"))
}

async fn delete_plant(
    State(state): State<AppState>,
    PathParam(id): PathParam<String>,
) -> ApiResult<ApiResponse<Plant>> {
    let plant = state.store.delete(&id).await?;
    tracing::info!(id = %plant.id, "Plant deleted");
    Ok(ApiResponse::ok(plant).with_message("Plant deleted successfully"))
}
