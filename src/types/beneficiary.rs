use serde::{Deserialize, Serialize};

use super::EntityStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiarySegmentation {
    pub name: String,
    pub label: String,
}

/// Balance as sent by the server: a decimal string, a number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Balance {
    Amount(f64),
    Text(String),
}

impl Balance {
    /// Numeric value, when the text form parses.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Amount(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryWallet {
    pub status: EntityStatus,
    #[serde(default)]
    pub allocated_balance: Option<Balance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryProfile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// A person enrolled in the discount program (the `/v1/people` resource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub email: String,
    pub profile: BeneficiaryProfile,
    pub segmentation: BeneficiarySegmentation,
    pub wallet: BeneficiaryWallet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRequestProfile {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryRequestWallet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntityStatus>,
}

/// Body for creating or updating a person. The segmentation is referenced
/// by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryRequest {
    pub id: u64,
    pub email: String,
    pub profile: BeneficiaryRequestProfile,
    pub segmentation: String,
    pub wallet: BeneficiaryRequestWallet,
    pub allocated_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}
