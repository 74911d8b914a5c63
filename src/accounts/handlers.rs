use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    accounts::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, ProfileResponse, RegisterRequest,
            UpdateProfileRequest, UpdateProfileResponse,
        },
        extractors::AuthUser,
        repo::{AuthToken, User},
        services::{generate_token_key, hash_password, verify_password},
    },
    error::ApiError,
    extract::Json,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
        .route("/profile/update", put(update_profile))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (Some(username), Some(password)) =
        (non_empty(payload.username), non_empty(payload.password))
    else {
        warn!("register with missing username or password");
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    };
    // Email is taken as-is when provided; only uniqueness is enforced.
    let email = non_empty(payload.email);

    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(username = %username, "username already taken");
        return Err(ApiError::Conflict("Username already exists".into()));
    }
    if let Some(ref email) = email {
        if User::email_taken(&state.db, email).await? {
            warn!(email = %email, "email already taken");
            return Err(ApiError::Conflict("Email already exists".into()));
        }
    }

    let hash = hash_password(&password)?;
    let user = User::create(
        &state.db,
        &username,
        email.as_deref(),
        &hash,
        payload.first_name.as_deref().unwrap_or(""),
        payload.last_name.as_deref().unwrap_or(""),
    )
    .await
    .map_err(|e| {
        // Pre-checks race against concurrent registration; the unique
        // indexes are the source of truth.
        if is_unique_violation(&e) {
            ApiError::Conflict("User could not be created".into())
        } else {
            ApiError::Internal(e)
        }
    })?;

    let token = AuthToken::get_or_create(&state.db, user.id, &generate_token_key()).await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user.into(),
            token,
            message: "User created successfully".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(username), Some(password)) =
        (non_empty(payload.username), non_empty(payload.password))
    else {
        warn!("login with missing username or password");
        return Err(ApiError::Validation(
            "Username and password are required".into(),
        ));
    };

    let user = match User::find_by_username(&state.db, &username).await? {
        Some(u) => u,
        None => {
            warn!(username = %username, "login unknown username");
            return Err(ApiError::Auth("Invalid username or password".into()));
        }
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(username = %username, user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth("Invalid username or password".into()));
    }

    // Reuses the stored token when one exists; a fresh key is only persisted
    // after logout removed the old one.
    let token = AuthToken::get_or_create(&state.db, user.id, &generate_token_key()).await?;

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
        message: "Login successful".into(),
    }))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    AuthToken::delete_for_user(&state.db, user.id).await?;
    info!(user_id = %user.id, "user logged out");
    Ok(Json(MessageResponse {
        message: "Successfully logged out".into(),
    }))
}

#[instrument(skip(user))]
pub async fn profile(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse { user: user.into() })
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, ApiError> {
    // Email uniqueness is intentionally not re-checked here, mirroring the
    // registration-only check. Flagged in DESIGN.md.
    let updated = User::update_profile(
        &state.db,
        user.id,
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.email.as_deref(),
    )
    .await?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(UpdateProfileResponse {
        user: updated.into(),
        message: "Profile updated successfully".into(),
    }))
}


#[cfg(test)]
mod flow_tests {
    use super::*;
    use sqlx::PgPool;

    fn register_payload(username: &str, email: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.into()),
            email: email.map(Into::into),
            password: Some("pw1".into()),
            first_name: None,
            last_name: None,
        }
    }

    fn login_payload(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[sqlx::test]
    async fn login_reuses_the_registration_token(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (status, Json(registered)) =
            register(State(state.clone()), Json(register_payload("alice", Some("a@x.com"))))
                .await
                .expect("register");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.token.len(), 40);

        let Json(logged_in) = login(State(state), Json(login_payload("alice", "pw1")))
            .await
            .expect("login");
        assert_eq!(logged_in.token, registered.token);
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[sqlx::test]
    async fn register_accepts_any_email_string(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (status, Json(response)) = register(
            State(state),
            Json(register_payload("alice", Some("admin@localhost"))),
        )
        .await
        .expect("register stores the email as-is");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.user.email.as_deref(), Some("admin@localhost"));
    }

    #[sqlx::test]
    async fn duplicate_username_is_a_conflict(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register(State(state.clone()), Json(register_payload("alice", None)))
            .await
            .expect("first register");

        let err = register(State(state), Json(register_payload("alice", None)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Username already exists");
    }

    #[sqlx::test]
    async fn duplicate_email_is_a_conflict(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register(
            State(state.clone()),
            Json(register_payload("alice", Some("a@x.com"))),
        )
        .await
        .expect("first register");

        let err = register(
            State(state),
            Json(register_payload("bob", Some("a@x.com"))),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[sqlx::test]
    async fn wrong_password_is_an_auth_error(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register(State(state.clone()), Json(register_payload("alice", None)))
            .await
            .expect("register");

        let err = login(State(state), Json(login_payload("alice", "nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
    }

    #[sqlx::test]
    async fn logout_revokes_the_token(pool: PgPool) {
        let state = AppState::with_pool(pool);
        let (_, Json(registered)) =
            register(State(state.clone()), Json(register_payload("alice", None)))
                .await
                .expect("register");

        let user = AuthToken::resolve_user(&state.db, &registered.token)
            .await
            .expect("resolve")
            .expect("token valid before logout");

        logout(State(state.clone()), AuthUser(user)).await.expect("logout");

        let resolved = AuthToken::resolve_user(&state.db, &registered.token)
            .await
            .expect("resolve");
        assert!(resolved.is_none(), "old token must stop authenticating");
    }

    #[sqlx::test]
    async fn update_profile_keeps_omitted_fields(pool: PgPool) {
        let state = AppState::with_pool(pool);
        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: Some("alice".into()),
                email: Some("a@x.com".into()),
                password: Some("pw1".into()),
                first_name: Some("Alice".into()),
                last_name: Some("Smith".into()),
            }),
        )
        .await
        .expect("register");

        let user = User::find_by_username(&state.db, "alice")
            .await
            .expect("query")
            .expect("user exists");

        let Json(updated) = update_profile(
            State(state),
            AuthUser(user),
            Json(UpdateProfileRequest {
                first_name: Some("Alicia".into()),
                last_name: None,
                email: None,
            }),
        )
        .await
        .expect("update");

        assert_eq!(updated.user.first_name, "Alicia");
        assert_eq!(updated.user.last_name, "Smith");
        assert_eq!(updated.user.email.as_deref(), Some("a@x.com"));
    }
}
