//! Enumerated values shared by the store, the domain and the transports.
//!
//! Every enum serializes to the stable wire value returned by `as_str` and
//! parses either that value or the legacy Russian spelling used by older
//! clients.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// City a pickup point may be opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(alias = "Москва")]
    Moscow,
    #[serde(alias = "Санкт-Петербург")]
    SaintPetersburg,
    #[serde(alias = "Казань")]
    Kazan,
}

impl City {
    pub fn as_str(&self) -> &'static str {
        match self {
            City::Moscow => "Moscow",
            City::SaintPetersburg => "SaintPetersburg",
            City::Kazan => "Kazan",
        }
    }
}

impl FromStr for City {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Moscow" | "Москва" => Ok(City::Moscow),
            "SaintPetersburg" | "Санкт-Петербург" => Ok(City::SaintPetersburg),
            "Kazan" | "Казань" => Ok(City::Kazan),
            other => Err(UnknownValue {
                kind: "city",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of an item logged during a reception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[serde(alias = "электроника")]
    Electronics,
    #[serde(alias = "одежда")]
    Clothing,
    #[serde(alias = "обувь")]
    Shoes,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Electronics => "electronics",
            ProductType::Clothing => "clothing",
            ProductType::Shoes => "shoes",
        }
    }
}

impl FromStr for ProductType {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "electronics" | "электроника" => Ok(ProductType::Electronics),
            "clothing" | "одежда" => Ok(ProductType::Clothing),
            "shoes" | "обувь" => Ok(ProductType::Shoes),
            other => Err(UnknownValue {
                kind: "product type",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role carried by an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Moderator,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Moderator => "moderator",
            Role::Employee => "employee",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moderator" => Ok(Role::Moderator),
            "employee" => Ok(Role::Employee),
            other => Err(UnknownValue {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a reception.
///
/// ```text
/// InProgress ──close──► Closed
/// ```
///
/// A reception is created in `InProgress` and `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceptionStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "close")]
    Closed,
}

impl ReceptionStatus {
    /// Returns true if products may be appended or removed.
    pub fn can_modify_products(&self) -> bool {
        matches!(self, ReceptionStatus::InProgress)
    }

    /// Returns true if the close transition is allowed.
    pub fn can_close(&self) -> bool {
        matches!(self, ReceptionStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceptionStatus::InProgress => "in_progress",
            ReceptionStatus::Closed => "close",
        }
    }
}

impl FromStr for ReceptionStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ReceptionStatus::InProgress),
            "close" => Ok(ReceptionStatus::Closed),
            other => Err(UnknownValue {
                kind: "reception status",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ReceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_parses_canonical_and_legacy_names() {
        assert_eq!("Moscow".parse::<City>().unwrap(), City::Moscow);
        assert_eq!("Санкт-Петербург".parse::<City>().unwrap(), City::SaintPetersburg);
        assert_eq!("Казань".parse::<City>().unwrap(), City::Kazan);
        assert!("Novosibirsk".parse::<City>().is_err());
    }

    #[test]
    fn city_deserializes_legacy_alias() {
        let city: City = serde_json::from_str("\"Москва\"").unwrap();
        assert_eq!(city, City::Moscow);
        assert_eq!(serde_json::to_string(&city).unwrap(), "\"Moscow\"");
    }

    #[test]
    fn product_type_wire_values() {
        for ty in [
            ProductType::Electronics,
            ProductType::Clothing,
            ProductType::Shoes,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
            assert_eq!(ty.as_str().parse::<ProductType>().unwrap(), ty);
        }
        assert_eq!("обувь".parse::<ProductType>().unwrap(), ProductType::Shoes);
    }

    #[test]
    fn unknown_product_type_is_reported() {
        let err = "furniture".parse::<ProductType>().unwrap_err();
        assert_eq!(err.kind, "product type");
        assert_eq!(err.to_string(), "unknown product type: \"furniture\"");
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!(Role::Employee.to_string(), "employee");
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn reception_status_transitions() {
        assert!(ReceptionStatus::InProgress.can_close());
        assert!(ReceptionStatus::InProgress.can_modify_products());
        assert!(!ReceptionStatus::Closed.can_close());
        assert!(!ReceptionStatus::Closed.can_modify_products());
    }

    #[test]
    fn reception_status_serialization() {
        assert_eq!(
            serde_json::to_string(&ReceptionStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&ReceptionStatus::Closed).unwrap(),
            "\"close\""
        );
    }
}
