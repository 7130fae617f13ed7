use serde::{Deserialize, Serialize};

use super::EntityStatus;

/// A beneficiary grouping with its discount cap and balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percentage_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_balance: Option<f64>,
    pub status: EntityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationPayload {
    pub name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percentage_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocated_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
}
