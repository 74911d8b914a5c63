use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::dto::PublicUser;
use crate::pets::repo::{Pet, PetWithOwner};

/// Request body for pet creation. Any owner/id fields in the payload are
/// dropped by serde; ownership always comes from the authenticated caller.
#[derive(Debug, Deserialize)]
pub struct CreatePetRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

impl CreatePetRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.as_deref().unwrap_or("").is_empty() {
            missing.push("name");
        }
        if self.breed.as_deref().unwrap_or("").is_empty() {
            missing.push("breed");
        }
        if self.age.is_none() {
            missing.push("age");
        }
        if self.description.as_deref().unwrap_or("").is_empty() {
            missing.push("description");
        }
        missing
    }
}

/// Partial pet update: omitted fields keep their previous values.
#[derive(Debug, Deserialize)]
pub struct UpdatePetRequest {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age: Option<i32>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

/// Query string for /pets/search. The age bounds arrive as raw strings so
/// that unparsable values can be dropped instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
    pub age_min: Option<String>,
    pub age_max: Option<String>,
}

impl SearchParams {
    pub fn text(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// (age_min, age_max) with empty or malformed values silently treated
    /// as absent, each bound independently.
    pub fn age_bounds(&self) -> (Option<i32>, Option<i32>) {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.parse::<i32>().ok());
        (parse(&self.age_min), parse(&self.age_max))
    }
}

/// Pet as returned to clients, with the owner's public profile embedded.
#[derive(Debug, Serialize)]
pub struct PetResponse {
    pub id: Uuid,
    pub name: String,
    pub breed: String,
    pub age: i32,
    pub description: String,
    pub photo: Option<String>,
    pub owner: PublicUser,
}

impl From<PetWithOwner> for PetResponse {
    fn from(row: PetWithOwner) -> Self {
        Self {
            id: row.id,
            name: row.name,
            breed: row.breed,
            age: row.age,
            description: row.description,
            photo: row.photo,
            owner: PublicUser {
                id: row.owner_id,
                username: row.username,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            },
        }
    }
}

impl PetResponse {
    /// Used by the write paths, where the owner is always the caller.
    pub fn with_owner(pet: Pet, owner: PublicUser) -> Self {
        Self {
            id: pet.id,
            name: pet.name,
            breed: pet.breed,
            age: pet.age,
            description: pet.description,
            photo: pet.photo,
            owner,
        }
    }
}
