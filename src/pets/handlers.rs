use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    accounts::{dto::MessageResponse, extractors::AuthUser},
    error::ApiError,
    extract::Json,
    pets::{
        dto::{CreatePetRequest, PetResponse, SearchParams, UpdatePetRequest},
        repo::Pet,
    },
    state::AppState,
};

pub fn pet_routes() -> Router<AppState> {
    Router::new()
        .route("/pets", get(list_pets).post(create_pet))
        .route("/pets/search", get(search_pets))
        .route(
            "/pets/:id",
            get(get_pet).put(update_pet).delete(delete_pet),
        )
}

#[instrument(skip(state))]
pub async fn list_pets(State(state): State<AppState>) -> Result<Json<Vec<PetResponse>>, ApiError> {
    let pets = Pet::list_all(&state.db).await?;
    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn create_pet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetResponse>), ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        warn!(missing = ?missing, "create pet with missing fields");
        return Err(ApiError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    // missing_fields() guarantees these are present.
    let pet = Pet::create(
        &state.db,
        user.id,
        payload.name.as_deref().unwrap_or_default(),
        payload.breed.as_deref().unwrap_or_default(),
        payload.age.unwrap_or_default(),
        payload.description.as_deref().unwrap_or_default(),
        payload.photo.as_deref(),
    )
    .await?;

    info!(pet_id = %pet.id, owner_id = %user.id, "pet created");
    Ok((
        StatusCode::CREATED,
        Json(PetResponse::with_owner(pet, (&user).into())),
    ))
}

#[instrument(skip(state))]
pub async fn get_pet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PetResponse>, ApiError> {
    match Pet::find_by_id(&state.db, id).await? {
        Some(pet) => Ok(Json(pet.into())),
        None => Err(ApiError::NotFound("Pet not found".into())),
    }
}

#[instrument(skip(state, user, payload))]
pub async fn update_pet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePetRequest>,
) -> Result<Json<PetResponse>, ApiError> {
    let updated = Pet::update_owned(
        &state.db,
        id,
        user.id,
        payload.name.as_deref(),
        payload.breed.as_deref(),
        payload.age,
        payload.description.as_deref(),
        payload.photo.as_deref(),
    )
    .await?;

    match updated {
        Some(pet) => {
            info!(pet_id = %pet.id, owner_id = %user.id, "pet updated");
            Ok(Json(PetResponse::with_owner(pet, (&user).into())))
        }
        // Absent and not-owned are deliberately the same outcome.
        None => Err(ApiError::NotFound("Pet not found".into())),
    }
}

#[instrument(skip(state, user))]
pub async fn delete_pet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Pet::delete_owned(&state.db, id, user.id).await? {
        return Err(ApiError::NotFound("Pet not found".into()));
    }
    info!(pet_id = %id, owner_id = %user.id, "pet deleted");
    Ok(Json(MessageResponse {
        message: "Pet deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn search_pets(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<PetResponse>>, ApiError> {
    let (age_min, age_max) = params.age_bounds();
    let pets = Pet::search(&state.db, params.text(), age_min, age_max).await?;
    Ok(Json(pets.into_iter().map(PetResponse::from).collect()))
}
