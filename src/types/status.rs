use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by stores, people, wallets and segmentations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    Active,
    Inactive,
    Deleted,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Deleted => "DELETED",
        }
    }

    /// Label shown to operators.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "Activa",
            Self::Inactive => "Inactiva",
            Self::Deleted => "Eliminada",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}
