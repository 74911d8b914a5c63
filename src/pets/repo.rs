use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Pet record in the database. The owner is set at creation and no query in
/// this module ever writes it again.
#[derive(Debug, Clone, FromRow)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub breed: String,
    pub age: i32,
    pub description: String,
    pub photo: Option<String>,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Pet joined with its owner's public profile columns, for read endpoints.
#[derive(Debug, Clone, FromRow)]
pub struct PetWithOwner {
    pub id: Uuid,
    pub name: String,
    pub breed: String,
    pub age: i32,
    pub description: String,
    pub photo: Option<String>,
    pub owner_id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

/// ILIKE pattern for a case-insensitive substring match, with the pattern
/// metacharacters in the user's text neutralized.
pub(crate) fn contains_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl Pet {
    pub async fn create(
        db: &PgPool,
        owner_id: Uuid,
        name: &str,
        breed: &str,
        age: i32,
        description: &str,
        photo: Option<&str>,
    ) -> anyhow::Result<Pet> {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            INSERT INTO pets (name, breed, age, description, photo, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, breed, age, description, photo, owner_id, created_at
            "#,
        )
        .bind(name)
        .bind(breed)
        .bind(age)
        .bind(description)
        .bind(photo)
        .bind(owner_id)
        .fetch_one(db)
        .await?;
        Ok(pet)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<PetWithOwner>> {
        let rows = sqlx::query_as::<_, PetWithOwner>(
            r#"
            SELECT p.id, p.name, p.breed, p.age, p.description, p.photo, p.owner_id,
                   u.username, u.first_name, u.last_name, u.email
            FROM pets p
            JOIN users u ON u.id = p.owner_id
            ORDER BY p.created_at
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PetWithOwner>> {
        let pet = sqlx::query_as::<_, PetWithOwner>(
            r#"
            SELECT p.id, p.name, p.breed, p.age, p.description, p.photo, p.owner_id,
                   u.username, u.first_name, u.last_name, u.email
            FROM pets p
            JOIN users u ON u.id = p.owner_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(pet)
    }

    /// Conjunctive filter over name/breed substring and an age range. NULL
    /// binds disable the corresponding predicate.
    pub async fn search(
        db: &PgPool,
        text: Option<&str>,
        age_min: Option<i32>,
        age_max: Option<i32>,
    ) -> anyhow::Result<Vec<PetWithOwner>> {
        let pattern = text.map(contains_pattern);
        let rows = sqlx::query_as::<_, PetWithOwner>(
            r#"
            SELECT p.id, p.name, p.breed, p.age, p.description, p.photo, p.owner_id,
                   u.username, u.first_name, u.last_name, u.email
            FROM pets p
            JOIN users u ON u.id = p.owner_id
            WHERE ($1::text IS NULL OR p.name ILIKE $1 OR p.breed ILIKE $1)
              AND ($2::int IS NULL OR p.age >= $2)
              AND ($3::int IS NULL OR p.age <= $3)
            ORDER BY p.created_at
            "#,
        )
        .bind(pattern)
        .bind(age_min)
        .bind(age_max)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Owner-scoped partial update. Scoping the WHERE clause to the owner is
    /// what makes a non-owner's attempt look like a missing pet.
    pub async fn update_owned(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        name: Option<&str>,
        breed: Option<&str>,
        age: Option<i32>,
        description: Option<&str>,
        photo: Option<&str>,
    ) -> anyhow::Result<Option<Pet>> {
        let pet = sqlx::query_as::<_, Pet>(
            r#"
            UPDATE pets
            SET name        = COALESCE($3, name),
                breed       = COALESCE($4, breed),
                age         = COALESCE($5, age),
                description = COALESCE($6, description),
                photo       = COALESCE($7, photo)
            WHERE id = $1 AND owner_id = $2
            RETURNING id, name, breed, age, description, photo, owner_id, created_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(breed)
        .bind(age)
        .bind(description)
        .bind(photo)
        .fetch_optional(db)
        .await?;
        Ok(pet)
    }

    /// Owner-scoped hard delete; false means absent or not owned.
    pub async fn delete_owned(db: &PgPool, id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let deleted: Option<Uuid> = sqlx::query_scalar(
            r#"DELETE FROM pets WHERE id = $1 AND owner_id = $2 RETURNING id"#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
        Ok(deleted.is_some())
    }
}
