//! Shop entity and shop membership.

use chrono::{DateTime, Utc};
use common::{OperatorId, ShopId};
use serde::{Deserialize, Serialize};

use crate::status::ShopStatus;

/// A shop listing surplus food for pickup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub status: ShopStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Associates a back-office operator with a shop.
///
/// Shop-scoped query and mutation paths consult this to authorize access;
/// the engine reads it but does not manage it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopMember {
    pub shop_id: ShopId,
    pub operator_id: OperatorId,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
