use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::policy::{Role, UserTarget};
use crate::pagination::PageQuery;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, never exposed in JSON
    pub age: Option<i32>,
    pub role: Role,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn target(&self) -> UserTarget {
        UserTarget {
            id: self.id,
            role: self.role,
            active: !self.is_deleted,
        }
    }
}

/// Profile fields surviving patch normalization; applied as one conditional
/// write.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i32>,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, age, role, is_deleted, created_at, updated_at";

pub async fn create(
    db: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
    age: Option<i32>,
    role: Role,
) -> anyhow::Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (name, email, password_hash, age, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(age)
    .bind(role)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Find an active user by email; inactive accounts never authenticate, and
/// their email may be re-registered.
pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE email = $1 AND is_deleted = FALSE
        "#,
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_id(
    db: &PgPool,
    id: Uuid,
    include_inactive: bool,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1 AND (is_deleted = FALSE OR $2)
        "#,
    ))
    .bind(id)
    .bind(include_inactive)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_super_admin(db: &PgPool) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE role = 'super_admin' AND is_deleted = FALSE
        LIMIT 1
        "#,
    ))
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Apply profile changes as a single conditional write; the filter re-checks
/// the active flag at write time. `None` means the row was gone or already
/// soft-deleted.
pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    changes: &ProfileChanges,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            password_hash = COALESCE($3, password_hash),
            age = COALESCE($4, age),
            updated_at = $5
        WHERE id = $1 AND is_deleted = FALSE
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.password_hash.as_deref())
    .bind(changes.age)
    .bind(OffsetDateTime::now_utc())
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Conditional soft delete inside the cascade transaction. `None` when the
/// user was already inactive (or never existed).
pub async fn deactivate_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET is_deleted = TRUE, updated_at = $2
        WHERE id = $1 AND is_deleted = FALSE
        RETURNING {USER_COLUMNS}
        "#,
    ))
    .bind(id)
    .bind(OffsetDateTime::now_utc())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(user)
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub name: Option<String>,
}

pub async fn list(
    db: &PgPool,
    filter: &UserFilter,
    page: PageQuery,
) -> anyhow::Result<(Vec<User>, i64)> {
    let page = page.clamped();
    let users = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE is_deleted = FALSE
          AND ($1::user_role IS NULL OR role = $1)
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    ))
    .bind(filter.role)
    .bind(filter.name.as_deref())
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE is_deleted = FALSE
          AND ($1::user_role IS NULL OR role = $1)
          AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(filter.role)
    .bind(filter.name.as_deref())
    .fetch_one(db)
    .await?;

    Ok((users, total))
}
