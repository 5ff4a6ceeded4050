//! Multi-entity state transitions: the user→inventory soft-delete cascade and
//! patch application with no-change detection.
//!
//! Deactivation never removes rows. The cascade runs in one transaction,
//! items first, then a conditional flip of the user row, so a failure can
//! never leave a deactivated user with visible inventory.

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password;
use crate::domain::policy::Actor;
use crate::inventory::repo::{self as inventory_repo, Item, ItemChanges};
use crate::users::repo::{self as users_repo, ProfileChanges, User};

/// Result of a requested mutation. `Raced` marks a conditional write that
/// matched no rows even though the earlier snapshot read succeeded.
#[derive(Debug)]
pub enum Mutation<T> {
    Changed(T),
    NoChange(T),
    Raced,
}

/// Outcome of the user deactivation cascade.
#[derive(Debug)]
pub enum CascadeOutcome {
    Deactivated {
        user: User,
        items_deactivated: u64,
    },
    /// Second call on an already-inactive user: a no-op, not an error.
    AlreadyInactive(User),
    NotFound,
}

/// Soft-delete a user and every active item they own. Idempotent: a repeat
/// call reports `AlreadyInactive` and touches nothing.
pub async fn deactivate_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<CascadeOutcome> {
    let mut tx = db.begin().await?;

    // items first: if the commit never happens the worst case is orphaned
    // soft-deleted items, never a deactivated user with visible inventory
    let items_deactivated = inventory_repo::deactivate_all_for_owner(&mut tx, user_id).await?;

    match users_repo::deactivate_in_tx(&mut tx, user_id).await? {
        Some(user) => {
            tx.commit().await?;
            info!(user_id = %user.id, items_deactivated, "user deactivated");
            Ok(CascadeOutcome::Deactivated {
                user,
                items_deactivated,
            })
        }
        None => {
            tx.rollback().await?;
            match users_repo::find_by_id(db, user_id, true).await? {
                Some(user) => Ok(CascadeOutcome::AlreadyInactive(user)),
                None => Ok(CascadeOutcome::NotFound),
            }
        }
    }
}

/// Soft-delete one item through the conditional-write path. The caller has
/// already authorized the action against a snapshot; the filter re-checks
/// ownership and active state at write time.
pub async fn deactivate_item(
    db: &PgPool,
    actor: &Actor,
    item_id: Uuid,
) -> anyhow::Result<Mutation<Item>> {
    match inventory_repo::deactivate_conditional(db, item_id, actor.id, actor.role.is_privileged())
        .await?
    {
        Some(item) => {
            info!(item_id = %item.id, actor_id = %actor.id, "inventory item deactivated");
            Ok(Mutation::Changed(item))
        }
        None => {
            warn!(%item_id, actor_id = %actor.id, "conditional deactivate matched no rows");
            Ok(Mutation::Raced)
        }
    }
}

/// Patch for the self-service profile path. Immutable fields (email, role,
/// id) are not representable here; unknown fields in the request body are
/// dropped during deserialization.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
}

/// Reduce a profile patch against the current record. Returns `None` when
/// every supplied field equals the current value. A supplied password always
/// counts as a change: it is re-hashed, there is nothing to compare against.
pub fn profile_changes(current: &User, patch: &ProfilePatch) -> Option<ProfilePatchFields> {
    let name = patch
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| *name != current.name)
        .map(str::to_string);
    let age = patch.age.filter(|age| Some(*age) != current.age);
    let password = patch.password.clone();

    if name.is_none() && age.is_none() && password.is_none() {
        return None;
    }
    Some(ProfilePatchFields {
        name,
        password,
        age,
    })
}

/// Mutable profile fields that actually differ from the current record.
#[derive(Debug, Clone)]
pub struct ProfilePatchFields {
    pub name: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
}

pub async fn update_profile(
    db: &PgPool,
    current: &User,
    patch: &ProfilePatch,
) -> anyhow::Result<Mutation<User>> {
    let Some(fields) = profile_changes(current, patch) else {
        return Ok(Mutation::NoChange(current.clone()));
    };

    let password_hash = match &fields.password {
        Some(plain) => Some(password::hash_password(plain)?),
        None => None,
    };
    let changes = ProfileChanges {
        name: fields.name,
        password_hash,
        age: fields.age,
    };

    match users_repo::update_profile(db, current.id, &changes).await? {
        Some(user) => {
            info!(user_id = %user.id, "profile updated");
            Ok(Mutation::Changed(user))
        }
        None => {
            warn!(user_id = %current.id, "conditional profile update matched no rows");
            Ok(Mutation::Raced)
        }
    }
}

/// Patch for inventory updates; `created_by` is not representable and never
/// moves.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub price: Option<rust_decimal::Decimal>,
    pub quantity: Option<i32>,
    pub category: Option<String>,
}

/// Reduce an item patch against the current record; `None` means no-op.
pub fn item_changes(current: &Item, patch: &ItemPatch) -> Option<ItemChanges> {
    let name = patch
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| *name != current.name)
        .map(str::to_string);
    let price = patch.price.filter(|price| *price != current.price);
    let quantity = patch.quantity.filter(|quantity| *quantity != current.quantity);
    let category = patch
        .category
        .as_deref()
        .map(|category| category.trim().to_lowercase())
        .filter(|category| *category != current.category);

    if name.is_none() && price.is_none() && quantity.is_none() && category.is_none() {
        return None;
    }
    Some(ItemChanges {
        name,
        price,
        quantity,
        category,
    })
}

pub async fn update_item(
    db: &PgPool,
    actor: &Actor,
    current: &Item,
    patch: &ItemPatch,
) -> anyhow::Result<Mutation<Item>> {
    let Some(changes) = item_changes(current, patch) else {
        return Ok(Mutation::NoChange(current.clone()));
    };

    match inventory_repo::update_conditional(
        db,
        current.id,
        actor.id,
        actor.role.is_privileged(),
        &changes,
    )
    .await?
    {
        Some(item) => {
            info!(item_id = %item.id, actor_id = %actor.id, "inventory item updated");
            Ok(Mutation::Changed(item))
        }
        None => {
            warn!(item_id = %current.id, actor_id = %actor.id, "conditional update matched no rows");
            Ok(Mutation::Raced)
        }
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;
    use crate::domain::policy::Role;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            age: Some(36),
            role: Role::User,
            is_deleted: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn sample_item() -> Item {
        Item {
            id: Uuid::new_v4(),
            name: "Analytical Engine".into(),
            price: Decimal::from_str("1999.99").unwrap(),
            quantity: 3,
            category: "electronics".into(),
            created_by: Uuid::new_v4(),
            is_deleted: false,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn identical_profile_patch_is_no_change() {
        let user = sample_user();
        let patch = ProfilePatch {
            name: Some("Ada Lovelace".into()),
            password: None,
            age: Some(36),
        };
        assert!(profile_changes(&user, &patch).is_none());
    }

    #[test]
    fn empty_profile_patch_is_no_change() {
        let user = sample_user();
        assert!(profile_changes(&user, &ProfilePatch::default()).is_none());
    }

    #[test]
    fn password_always_counts_as_change() {
        let user = sample_user();
        let patch = ProfilePatch {
            name: Some("Ada Lovelace".into()),
            password: Some("N3w!passphrase".into()),
            age: Some(36),
        };
        let fields = profile_changes(&user, &patch).expect("password forces a change");
        assert!(fields.name.is_none());
        assert!(fields.age.is_none());
        assert_eq!(fields.password.as_deref(), Some("N3w!passphrase"));
    }

    #[test]
    fn changed_name_is_trimmed_and_kept() {
        let user = sample_user();
        let patch = ProfilePatch {
            name: Some("  Ada King  ".into()),
            password: None,
            age: None,
        };
        let fields = profile_changes(&user, &patch).unwrap();
        assert_eq!(fields.name.as_deref(), Some("Ada King"));
    }

    #[test]
    fn identical_item_patch_is_no_change() {
        let item = sample_item();
        let patch = ItemPatch {
            name: Some("Analytical Engine".into()),
            price: Some(Decimal::from_str("1999.99").unwrap()),
            quantity: Some(3),
            category: Some("Electronics".into()), // normalized before compare
        };
        assert!(item_changes(&item, &patch).is_none());
    }

    #[test]
    fn item_patch_keeps_only_differing_fields() {
        let item = sample_item();
        let patch = ItemPatch {
            name: Some("Analytical Engine".into()),
            price: Some(Decimal::from_str("1499.00").unwrap()),
            quantity: Some(0),
            category: None,
        };
        let changes = item_changes(&item, &patch).unwrap();
        assert!(changes.name.is_none());
        assert_eq!(changes.price, Some(Decimal::from_str("1499.00").unwrap()));
        assert_eq!(changes.quantity, Some(0));
        assert!(changes.category.is_none());
    }
}
