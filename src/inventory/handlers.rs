use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    domain::{
        lifecycle::{self, ItemPatch, Mutation},
        policy::{self, Action},
    },
    error::ApiError,
    inventory::{
        dto::{
            CreateItemRequest, ItemDetails, ItemListQuery, ItemListResponse,
            ItemMutationResponse, ItemResponse, StatsQuery, StatsResponse, UpdateItemRequest,
        },
        repo as inventory_repo,
    },
    pagination::{PageMeta, PageQuery, DEFAULT_LIMIT},
    state::AppState,
    users::repo as users_repo,
    validation::{
        validate_category, validate_item_name, validate_price, validate_quantity, Validator,
    },
};

#[instrument(skip(state, current, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let category = payload
        .category
        .as_deref()
        .unwrap_or("others")
        .trim()
        .to_lowercase();

    let mut v = Validator::new();
    v.check(validate_item_name(&payload.name));
    v.check(validate_price(payload.price));
    v.check(validate_quantity(payload.quantity));
    v.check(validate_category(&category));
    v.finish().map_err(ApiError::BadRequest)?;

    let item = inventory_repo::create(
        &state.db,
        current.0.id,
        payload.name.trim(),
        payload.price,
        payload.quantity,
        &category,
    )
    .await
    .map_err(ApiError::Internal)?;

    info!(item_id = %item.id, owner_id = %item.created_by, "inventory item created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

async fn list_with_filter(
    state: &AppState,
    owner_id: Option<Uuid>,
    query: ItemListQuery,
) -> Result<Json<ItemListResponse>, ApiError> {
    let page = PageQuery {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    }
    .clamped();
    let category = match query.category.as_deref() {
        Some(raw) => {
            let category = raw.trim().to_lowercase();
            validate_category(&category).map_err(ApiError::BadRequest)?;
            Some(category)
        }
        None => None,
    };
    let filter = inventory_repo::ItemFilter {
        owner_id,
        category,
        name: query.name,
    };

    let (rows, total) = inventory_repo::list(&state.db, &filter, page)
        .await
        .map_err(ApiError::Internal)?;

    let items: Vec<ItemDetails> = rows.into_iter().map(ItemDetails::from).collect();
    let pagination = PageMeta::new(total, items.len(), page);
    Ok(Json(ItemListResponse { items, pagination }))
}

/// The catalog is readable by any authenticated caller regardless of
/// ownership.
#[instrument(skip(state, _current))]
pub async fn list_items(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<ItemListResponse>, ApiError> {
    list_with_filter(&state, None, query).await
}

#[instrument(skip(state, current))]
pub async fn my_items(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<ItemListResponse>, ApiError> {
    list_with_filter(&state, Some(current.0.id), query).await
}

/// Admin view of another user's inventory.
#[instrument(skip(state, current))]
pub async fn items_by_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ItemListQuery>,
) -> Result<Json<ItemListResponse>, ApiError> {
    if !current.0.role.is_privileged() {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    if users_repo::find_by_id(&state.db, user_id, false)
        .await
        .map_err(ApiError::Internal)?
        .is_none()
    {
        return Err(ApiError::NotFound("User not found".into()));
    }
    list_with_filter(&state, Some(user_id), query).await
}

#[instrument(skip(state, current))]
pub async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, ApiError> {
    if !current.0.role.is_privileged() {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    let (overall, by_category) = inventory_repo::stats(&state.db, query.owner)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(StatsResponse {
        overall,
        by_category,
    }))
}

#[instrument(skip(state, _current))]
pub async fn get_item(
    State(state): State<AppState>,
    _current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemDetails>, ApiError> {
    let item = inventory_repo::find_with_owner(&state.db, id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Inventory item not found".into()))?;
    Ok(Json(item.into()))
}

#[instrument(skip(state, current, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemMutationResponse>, ApiError> {
    let mut v = Validator::new();
    if let Some(name) = &payload.name {
        v.check(validate_item_name(name));
    }
    if let Some(price) = payload.price {
        v.check(validate_price(price));
    }
    if let Some(quantity) = payload.quantity {
        v.check(validate_quantity(quantity));
    }
    if let Some(category) = &payload.category {
        v.check(validate_category(category));
    }
    v.finish().map_err(ApiError::BadRequest)?;

    // existence first, so acting on a missing item is 404 even for non-owners
    let item = inventory_repo::find_by_id(&state.db, id, true)
        .await
        .map_err(ApiError::Internal)?;

    let actor = current.actor();
    policy::item_access(&actor, Action::Update, item.as_ref().map(|i| i.target()).as_ref())?;
    let Some(item) = item else {
        return Err(ApiError::NotFound("Inventory item not found".into()));
    };

    let patch = ItemPatch {
        name: payload.name,
        price: payload.price,
        quantity: payload.quantity,
        category: payload.category,
    };
    match lifecycle::update_item(&state.db, &actor, &item, &patch)
        .await
        .map_err(ApiError::Internal)?
    {
        Mutation::Changed(item) => Ok(Json(ItemMutationResponse {
            changed: true,
            item: item.into(),
        })),
        Mutation::NoChange(item) => Ok(Json(ItemMutationResponse {
            changed: false,
            item: item.into(),
        })),
        Mutation::Raced => Err(ApiError::NotFound("Inventory item not found".into())),
    }
}

#[instrument(skip(state, current))]
pub async fn delete_item(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemMutationResponse>, ApiError> {
    let item = inventory_repo::find_by_id(&state.db, id, true)
        .await
        .map_err(ApiError::Internal)?;

    let actor = current.actor();
    policy::item_access(&actor, Action::Delete, item.as_ref().map(|i| i.target()).as_ref())?;

    match lifecycle::deactivate_item(&state.db, &actor, id)
        .await
        .map_err(ApiError::Internal)?
    {
        Mutation::Changed(item) => Ok(Json(ItemMutationResponse {
            changed: true,
            item: item.into(),
        })),
        Mutation::NoChange(item) => Ok(Json(ItemMutationResponse {
            changed: false,
            item: item.into(),
        })),
        Mutation::Raced => Err(ApiError::NotFound("Inventory item not found".into())),
    }
}
