use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::inventory::repo::{CategoryStats, Item, ItemWithOwner, StatsTotals};
use crate::pagination::PageMeta;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub category: Option<String>,
}

/// Item patch; `created_by` is immutable and not representable here.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category: Option<String>,
}

/// Listing query: category/name filters plus pagination.
#[derive(Debug, Default, Deserialize)]
pub struct ItemListQuery {
    pub category: Option<String>,
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub owner: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
    pub owner_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Item> for ItemResponse {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
            category: item.category,
            owner_id: item.created_by,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Read-side shape: the item with its owner's public summary joined in.
#[derive(Debug, Serialize)]
pub struct ItemDetails {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category: String,
    pub owner: OwnerSummary,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<ItemWithOwner> for ItemDetails {
    fn from(row: ItemWithOwner) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            category: row.category,
            owner: OwnerSummary {
                id: row.created_by,
                name: row.owner_name,
                email: row.owner_email,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemDetails>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ItemMutationResponse {
    pub changed: bool,
    pub item: ItemResponse,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub overall: StatsTotals,
    pub by_category: Vec<CategoryStats>,
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn item_response_serializes_price_and_owner() {
        let response = ItemResponse {
            id: Uuid::new_v4(),
            name: "Difference Engine".into(),
            price: Decimal::from_str("42.50").unwrap(),
            quantity: 2,
            category: "electronics".into(),
            owner_id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("42.50"));
        assert!(json.contains("owner_id"));
        assert!(!json.contains("is_deleted"));
    }

    #[test]
    fn item_patch_ignores_owner_field() {
        let patch: UpdateItemRequest =
            serde_json::from_str(r#"{"quantity":5,"created_by":"abc","owner_id":"def"}"#).unwrap();
        assert_eq!(patch.quantity, Some(5));
        assert!(patch.name.is_none());
    }
}
