use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    domain::{
        lifecycle::{self, CascadeOutcome, Mutation, ProfilePatch},
        policy::{self, Action, Role},
    },
    error::ApiError,
    pagination::{PageMeta, PageQuery, DEFAULT_LIMIT},
    state::AppState,
    users::{
        dto::{
            AuthResponse, CreateAccountRequest, DeleteAccountResponse, ListUsersQuery,
            LoginRequest, MessageResponse, ProfileUpdateResponse, PublicUser, RefreshRequest,
            SignupRequest, UpdateProfileRequest, UserListResponse,
        },
        repo as users_repo,
    },
    validation::{
        normalize_email, validate_age, validate_email, validate_name, validate_password,
        Validator,
    },
};

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

fn issue_token_pair(state: &AppState, user_id: Uuid) -> Result<(String, String), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access = keys.sign_access(user_id).map_err(ApiError::Internal)?;
    let refresh = keys.sign_refresh(user_id).map_err(ApiError::Internal)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = normalize_email(&payload.email);

    let mut v = Validator::new();
    v.check(validate_name(&payload.name));
    v.check(validate_email(&payload.email));
    v.check(validate_password(
        &payload.password,
        Some(&payload.name),
        Some(&payload.email),
    ));
    if let Some(age) = payload.age {
        v.check(validate_age(age));
    }
    v.finish().map_err(ApiError::BadRequest)?;

    // active accounts only; a deleted user's email may be re-registered
    if users_repo::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(ApiError::Internal)?;

    // public signup always creates a plain user
    let user = match users_repo::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        payload.age,
        Role::User,
    )
    .await
    {
        Ok(user) => user,
        // the partial unique index closes the check-then-insert race
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "signup lost unique-email race");
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(ApiError::Internal(e)),
    };

    let (access_token, refresh_token) = issue_token_pair(&state, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = normalize_email(&payload.email);

    let mut v = Validator::new();
    v.check(validate_email(&payload.email));
    v.require(!payload.password.is_empty(), "Password is required");
    v.finish().map_err(ApiError::BadRequest)?;

    let user = users_repo::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?;

    // same response for unknown email and wrong password
    let Some(user) = user else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    let ok = verify_password(&payload.password, &user.password_hash)
        .map_err(ApiError::Internal)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let (access_token, refresh_token) = issue_token_pair(&state, user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // a deactivated account cannot refresh its way back in
    let user = users_repo::find_by_id(&state.db, claims.sub, false)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::Unauthorized("Please authenticate".into()))?;

    let (access_token, refresh_token) = issue_token_pair(&state, user.id)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    }))
}

/// Stateless logout: the client discards its tokens.
#[instrument(skip_all)]
pub async fn logout(CurrentUser(user): CurrentUser) -> Json<MessageResponse> {
    info!(user_id = %user.id, "user logged out");
    Json(MessageResponse {
        message: "Logged out successfully",
    })
}

#[instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, current, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileUpdateResponse>, ApiError> {
    let mut v = Validator::new();
    if let Some(name) = &payload.name {
        v.check(validate_name(name));
    }
    if let Some(password) = &payload.password {
        v.check(validate_password(
            password,
            Some(&current.0.name),
            Some(&current.0.email),
        ));
    }
    if let Some(age) = payload.age {
        v.check(validate_age(age));
    }
    v.finish().map_err(ApiError::BadRequest)?;

    let actor = current.actor();
    policy::user_access(&actor, Action::Update, Some(&current.0.target()))?;

    let patch = ProfilePatch {
        name: payload.name,
        password: payload.password,
        age: payload.age,
    };
    match lifecycle::update_profile(&state.db, &current.0, &patch)
        .await
        .map_err(ApiError::Internal)?
    {
        Mutation::Changed(user) => Ok(Json(ProfileUpdateResponse {
            changed: true,
            user: user.into(),
        })),
        Mutation::NoChange(user) => Ok(Json(ProfileUpdateResponse {
            changed: false,
            user: user.into(),
        })),
        Mutation::Raced => Err(ApiError::NotFound("User not found".into())),
    }
}

fn cascade_response(outcome: CascadeOutcome) -> Result<Json<DeleteAccountResponse>, ApiError> {
    match outcome {
        CascadeOutcome::Deactivated {
            user,
            items_deactivated,
        } => Ok(Json(DeleteAccountResponse {
            changed: true,
            items_deactivated,
            user: user.into(),
        })),
        CascadeOutcome::AlreadyInactive(user) => Ok(Json(DeleteAccountResponse {
            changed: false,
            items_deactivated: 0,
            user: user.into(),
        })),
        CascadeOutcome::NotFound => Err(ApiError::NotFound("User not found".into())),
    }
}

#[instrument(skip(state, current))]
pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let actor = current.actor();
    policy::user_access(&actor, Action::Delete, Some(&current.0.target()))?;

    let outcome = lifecycle::deactivate_user(&state.db, current.0.id)
        .await
        .map_err(ApiError::Internal)?;
    cascade_response(outcome)
}

#[instrument(skip(state, current))]
pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteAccountResponse>, ApiError> {
    let target = users_repo::find_by_id(&state.db, id, true)
        .await
        .map_err(ApiError::Internal)?;

    let actor = current.actor();
    policy::user_access(&actor, Action::Delete, target.as_ref().map(|u| u.target()).as_ref())?;

    match lifecycle::deactivate_user(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
    {
        // the policy check saw an active user; losing the flip is a race
        CascadeOutcome::AlreadyInactive(_) => {
            warn!(user_id = %id, "deactivation raced with another request");
            Err(ApiError::NotFound("User not found".into()))
        }
        outcome => cascade_response(outcome),
    }
}

#[instrument(skip(state, current))]
pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    if !current.0.role.is_privileged() {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }

    let page = PageQuery {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    }
    .clamped();
    let filter = users_repo::UserFilter {
        role: query.role,
        name: query.name,
    };

    let (users, total) = users_repo::list(&state.db, &filter, page)
        .await
        .map_err(ApiError::Internal)?;

    let items: Vec<PublicUser> = users.into_iter().map(PublicUser::from).collect();
    let pagination = PageMeta::new(total, items.len(), page);
    Ok(Json(UserListResponse { items, pagination }))
}

#[instrument(skip(state, current, payload))]
pub async fn create_account(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(mut payload): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    if current.0.role != Role::SuperAdmin {
        return Err(ApiError::Forbidden("Super admin access required".into()));
    }

    payload.email = normalize_email(&payload.email);
    let role = payload.role.unwrap_or(Role::Admin);

    let mut v = Validator::new();
    v.check(validate_name(&payload.name));
    v.check(validate_email(&payload.email));
    v.check(validate_password(
        &payload.password,
        Some(&payload.name),
        Some(&payload.email),
    ));
    if let Some(age) = payload.age {
        v.check(validate_age(age));
    }
    // there is exactly one super admin, created at bootstrap
    v.require(role != Role::SuperAdmin, "Cannot create a super admin account");
    v.finish().map_err(ApiError::BadRequest)?;

    if users_repo::find_by_email(&state.db, &payload.email)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(ApiError::Internal)?;
    let user = match users_repo::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        payload.age,
        role,
    )
    .await
    {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(ApiError::Internal(e)),
    };

    info!(user_id = %user.id, role = ?user.role, created_by = %current.0.id, "account created");
    Ok((StatusCode::CREATED, Json(user.into())))
}
