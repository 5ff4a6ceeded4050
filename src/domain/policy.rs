//! Access decisions for account and inventory mutation.
//!
//! Pure functions over pre-fetched snapshots: no I/O happens here. Existence
//! (and active state) is always checked before ownership or role, so a caller
//! acting on a missing or soft-deleted resource sees NotFound, never
//! Forbidden.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Admin and super admin have cross-owner mutation rights on inventory.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// The authenticated identity performing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

/// Snapshot of an inventory item as fetched from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemTarget {
    pub owner_id: Uuid,
    pub active: bool,
}

/// Snapshot of a user account as fetched from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTarget {
    pub id: Uuid,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Missing or soft-deleted; rendered as an absence, not an authorization
    /// failure.
    NotFound,
    Forbidden(&'static str),
}

/// Decide whether `actor` may perform `action` on an inventory item.
/// `target` is `None` when no row was found.
pub fn item_access(
    actor: &Actor,
    action: Action,
    target: Option<&ItemTarget>,
) -> Result<(), Denial> {
    let item = match target {
        Some(item) if item.active => item,
        _ => return Err(Denial::NotFound),
    };

    match action {
        // any authenticated caller may read the catalog
        Action::Read => Ok(()),
        Action::Update | Action::Delete => {
            if actor.id == item.owner_id || actor.role.is_privileged() {
                Ok(())
            } else {
                Err(Denial::Forbidden("Not allowed to modify this inventory item"))
            }
        }
    }
}

/// Decide whether `actor` may perform `action` on a user account.
pub fn user_access(
    actor: &Actor,
    action: Action,
    target: Option<&UserTarget>,
) -> Result<(), Denial> {
    let user = match target {
        Some(user) if user.active => user,
        _ => return Err(Denial::NotFound),
    };

    match action {
        Action::Read => {
            if actor.id == user.id || actor.role.is_privileged() {
                Ok(())
            } else {
                Err(Denial::Forbidden("Not allowed to view this account"))
            }
        }
        // profile fields are strictly self-service; privileged roles create
        // accounts through the signup path instead of editing others
        Action::Update => {
            if actor.id == user.id {
                Ok(())
            } else {
                Err(Denial::Forbidden("Profiles can only be edited by their owner"))
            }
        }
        Action::Delete => {
            // the bootstrap account is not deletable through this path at all
            if user.role == Role::SuperAdmin {
                return Err(Denial::Forbidden("The super admin account cannot be deleted"));
            }
            if actor.id == user.id {
                return Ok(());
            }
            match actor.role {
                Role::SuperAdmin => Ok(()),
                Role::Admin if user.role == Role::User => Ok(()),
                Role::Admin => Err(Denial::Forbidden(
                    "Admins can only delete standard user accounts",
                )),
                Role::User => Err(Denial::Forbidden("Not allowed to delete this account")),
            }
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
        }
    }

    fn item(owner_id: Uuid, active: bool) -> ItemTarget {
        ItemTarget { owner_id, active }
    }

    fn user_target(role: Role) -> UserTarget {
        UserTarget {
            id: Uuid::new_v4(),
            role,
            active: true,
        }
    }

    #[test]
    fn owner_updates_own_active_item() {
        let owner = actor(Role::User);
        let target = item(owner.id, true);
        assert_eq!(item_access(&owner, Action::Update, Some(&target)), Ok(()));
        assert_eq!(item_access(&owner, Action::Delete, Some(&target)), Ok(()));
    }

    #[test]
    fn stranger_cannot_modify_item() {
        let stranger = actor(Role::User);
        let target = item(Uuid::new_v4(), true);
        assert!(matches!(
            item_access(&stranger, Action::Update, Some(&target)),
            Err(Denial::Forbidden(_))
        ));
        assert!(matches!(
            item_access(&stranger, Action::Delete, Some(&target)),
            Err(Denial::Forbidden(_))
        ));
        // reads are open to any authenticated actor
        assert_eq!(item_access(&stranger, Action::Read, Some(&target)), Ok(()));
    }

    #[test]
    fn privileged_roles_modify_any_item() {
        let target = item(Uuid::new_v4(), true);
        for role in [Role::Admin, Role::SuperAdmin] {
            let privileged = actor(role);
            assert_eq!(item_access(&privileged, Action::Update, Some(&target)), Ok(()));
            assert_eq!(item_access(&privileged, Action::Delete, Some(&target)), Ok(()));
        }
    }

    #[test]
    fn inactive_item_is_not_found_for_everyone() {
        let owner = actor(Role::SuperAdmin);
        let target = item(owner.id, false);
        for action in [Action::Read, Action::Update, Action::Delete] {
            assert_eq!(
                item_access(&owner, action, Some(&target)),
                Err(Denial::NotFound)
            );
        }
    }

    #[test]
    fn missing_item_wins_over_ownership() {
        // a non-owner acting on a missing item must see 404, not 403
        let stranger = actor(Role::User);
        assert_eq!(
            item_access(&stranger, Action::Delete, None),
            Err(Denial::NotFound)
        );
    }

    #[test]
    fn profile_update_is_self_service_only() {
        let me = actor(Role::User);
        let mine = UserTarget {
            id: me.id,
            role: Role::User,
            active: true,
        };
        assert_eq!(user_access(&me, Action::Update, Some(&mine)), Ok(()));

        let admin = actor(Role::Admin);
        assert!(matches!(
            user_access(&admin, Action::Update, Some(&mine)),
            Err(Denial::Forbidden(_))
        ));
    }

    #[test]
    fn admin_deletes_plain_users_only() {
        let admin = actor(Role::Admin);
        assert_eq!(
            user_access(&admin, Action::Delete, Some(&user_target(Role::User))),
            Ok(())
        );
        assert!(matches!(
            user_access(&admin, Action::Delete, Some(&user_target(Role::Admin))),
            Err(Denial::Forbidden(_))
        ));
        assert!(matches!(
            user_access(&admin, Action::Delete, Some(&user_target(Role::SuperAdmin))),
            Err(Denial::Forbidden(_))
        ));
    }

    #[test]
    fn super_admin_deletes_users_and_admins_but_not_itself() {
        let root = actor(Role::SuperAdmin);
        assert_eq!(
            user_access(&root, Action::Delete, Some(&user_target(Role::User))),
            Ok(())
        );
        assert_eq!(
            user_access(&root, Action::Delete, Some(&user_target(Role::Admin))),
            Ok(())
        );
        let own = UserTarget {
            id: root.id,
            role: Role::SuperAdmin,
            active: true,
        };
        assert!(matches!(
            user_access(&root, Action::Delete, Some(&own)),
            Err(Denial::Forbidden(_))
        ));
    }

    #[test]
    fn user_may_delete_self() {
        let me = actor(Role::User);
        let mine = UserTarget {
            id: me.id,
            role: Role::User,
            active: true,
        };
        assert_eq!(user_access(&me, Action::Delete, Some(&mine)), Ok(()));
    }

    #[test]
    fn inactive_user_is_not_found() {
        let admin = actor(Role::Admin);
        let gone = UserTarget {
            id: Uuid::new_v4(),
            role: Role::User,
            active: false,
        };
        assert_eq!(
            user_access(&admin, Action::Delete, Some(&gone)),
            Err(Denial::NotFound)
        );
        assert_eq!(user_access(&admin, Action::Read, None), Err(Denial::NotFound));
    }
}
