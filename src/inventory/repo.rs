use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::policy::ItemTarget;
use crate::pagination::PageQuery;

/// Inventory record in the database. `created_by` never changes after
/// insertion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
    pub created_by: Uuid,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Item {
    pub fn target(&self) -> ItemTarget {
        ItemTarget {
            owner_id: self.created_by,
            active: !self.is_deleted,
        }
    }
}

/// Item row joined with its owner's public summary, for read endpoints.
#[derive(Debug, Clone, FromRow)]
pub struct ItemWithOwner {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
    pub created_by: Uuid,
    pub owner_name: String,
    pub owner_email: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Item fields surviving patch normalization.
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category: Option<String>,
}

const ITEM_COLUMNS: &str =
    "id, name, price, quantity, category, created_by, is_deleted, created_at, updated_at";

const ITEM_OWNER_COLUMNS: &str = "i.id, i.name, i.price, i.quantity, i.category, i.created_by, \
     u.name AS owner_name, u.email AS owner_email, i.created_at, i.updated_at";

pub async fn create(
    db: &PgPool,
    owner_id: Uuid,
    name: &str,
    price: Decimal,
    quantity: i32,
    category: &str,
) -> anyhow::Result<Item> {
    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
        INSERT INTO inventory (name, price, quantity, category, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ITEM_COLUMNS}
        "#,
    ))
    .bind(name)
    .bind(price)
    .bind(quantity)
    .bind(category)
    .bind(owner_id)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn find_by_id(
    db: &PgPool,
    id: Uuid,
    include_inactive: bool,
) -> anyhow::Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
        SELECT {ITEM_COLUMNS}
        FROM inventory
        WHERE id = $1 AND (is_deleted = FALSE OR $2)
        "#,
    ))
    .bind(id)
    .bind(include_inactive)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

pub async fn find_with_owner(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ItemWithOwner>> {
    let item = sqlx::query_as::<_, ItemWithOwner>(&format!(
        r#"
        SELECT {ITEM_OWNER_COLUMNS}
        FROM inventory i
        JOIN users u ON u.id = i.created_by
        WHERE i.id = $1 AND i.is_deleted = FALSE
        "#,
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub owner_id: Option<Uuid>,
    pub category: Option<String>,
    pub name: Option<String>,
}

pub async fn list(
    db: &PgPool,
    filter: &ItemFilter,
    page: PageQuery,
) -> anyhow::Result<(Vec<ItemWithOwner>, i64)> {
    let page = page.clamped();
    let items = sqlx::query_as::<_, ItemWithOwner>(&format!(
        r#"
        SELECT {ITEM_OWNER_COLUMNS}
        FROM inventory i
        JOIN users u ON u.id = i.created_by
        WHERE i.is_deleted = FALSE
          AND ($1::uuid IS NULL OR i.created_by = $1)
          AND ($2::text IS NULL OR i.category = $2)
          AND ($3::text IS NULL OR i.name ILIKE '%' || $3 || '%')
        ORDER BY i.created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    ))
    .bind(filter.owner_id)
    .bind(filter.category.as_deref())
    .bind(filter.name.as_deref())
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM inventory
        WHERE is_deleted = FALSE
          AND ($1::uuid IS NULL OR created_by = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::text IS NULL OR name ILIKE '%' || $3 || '%')
        "#,
    )
    .bind(filter.owner_id)
    .bind(filter.category.as_deref())
    .bind(filter.name.as_deref())
    .fetch_one(db)
    .await?;

    Ok((items, total))
}

/// Authorization and mutation expressed as one conditional write: the filter
/// re-checks active state and ownership at the moment of the update. `None`
/// means no row matched.
pub async fn update_conditional(
    db: &PgPool,
    id: Uuid,
    actor_id: Uuid,
    privileged: bool,
    changes: &ItemChanges,
) -> anyhow::Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
        UPDATE inventory
        SET name = COALESCE($2, name),
            price = COALESCE($3, price),
            quantity = COALESCE($4, quantity),
            category = COALESCE($5, category),
            updated_at = $6
        WHERE id = $1 AND is_deleted = FALSE AND (created_by = $7 OR $8)
        RETURNING {ITEM_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.price)
    .bind(changes.quantity)
    .bind(changes.category.as_deref())
    .bind(OffsetDateTime::now_utc())
    .bind(actor_id)
    .bind(privileged)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

/// Soft delete with the same conditional filter; quantity is reset to 0.
pub async fn deactivate_conditional(
    db: &PgPool,
    id: Uuid,
    actor_id: Uuid,
    privileged: bool,
) -> anyhow::Result<Option<Item>> {
    let item = sqlx::query_as::<_, Item>(&format!(
        r#"
        UPDATE inventory
        SET is_deleted = TRUE, quantity = 0, updated_at = $2
        WHERE id = $1 AND is_deleted = FALSE AND (created_by = $3 OR $4)
        RETURNING {ITEM_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(OffsetDateTime::now_utc())
    .bind(actor_id)
    .bind(privileged)
    .fetch_optional(db)
    .await?;
    Ok(item)
}

/// Cascade step of user deactivation: soft-delete every active item the
/// owner still has. Already-inactive items are left untouched.
pub async fn deactivate_all_for_owner(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE inventory
        SET is_deleted = TRUE, quantity = 0, updated_at = $2
        WHERE created_by = $1 AND is_deleted = FALSE
        "#,
    )
    .bind(owner_id)
    .bind(OffsetDateTime::now_utc())
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatsTotals {
    pub count: i64,
    pub total_value: Decimal,
    pub avg_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryStats {
    pub category: String,
    pub count: i64,
    pub total_value: Decimal,
    pub avg_price: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
}

pub async fn stats(db: &PgPool, owner_id: Option<Uuid>) -> anyhow::Result<(StatsTotals, Vec<CategoryStats>)> {
    let overall = sqlx::query_as::<_, StatsTotals>(
        r#"
        SELECT COUNT(*) AS count,
               COALESCE(SUM(price * quantity), 0) AS total_value,
               COALESCE(AVG(price), 0) AS avg_price,
               COALESCE(MIN(price), 0) AS min_price,
               COALESCE(MAX(price), 0) AS max_price
        FROM inventory
        WHERE is_deleted = FALSE
          AND ($1::uuid IS NULL OR created_by = $1)
        "#,
    )
    .bind(owner_id)
    .fetch_one(db)
    .await?;

    let by_category = sqlx::query_as::<_, CategoryStats>(
        r#"
        SELECT category,
               COUNT(*) AS count,
               COALESCE(SUM(price * quantity), 0) AS total_value,
               COALESCE(AVG(price), 0) AS avg_price,
               COALESCE(MIN(price), 0) AS min_price,
               COALESCE(MAX(price), 0) AS max_price
        FROM inventory
        WHERE is_deleted = FALSE
          AND ($1::uuid IS NULL OR created_by = $1)
        GROUP BY category
        ORDER BY total_value DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(db)
    .await?;

    Ok((overall, by_category))
}
