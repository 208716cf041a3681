//! Entity kinds - the closed set of record types.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ModelError;

/// The concrete type of a record.
///
/// The kind's name doubles as the discriminator written to the `__class__`
/// field of serialized records and as the type segment of index keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Generic record with no domain fields.
    BaseModel,
    /// Account owning places and writing reviews.
    User,
    /// A rentable listing.
    Place,
    /// Top-level geographic area.
    State,
    /// City within a state.
    City,
    /// Feature a place may offer.
    Amenity,
    /// A user's review of a place.
    Review,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::BaseModel,
        EntityKind::User,
        EntityKind::Place,
        EntityKind::State,
        EntityKind::City,
        EntityKind::Amenity,
        EntityKind::Review,
    ];

    /// Discriminator name.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::BaseModel => "BaseModel",
            EntityKind::User => "User",
            EntityKind::Place => "Place",
            EntityKind::State => "State",
            EntityKind::City => "City",
            EntityKind::Amenity => "Amenity",
            EntityKind::Review => "Review",
        }
    }

    /// Relational table backing this kind, if any.
    pub fn table(self) -> Option<&'static str> {
        match self {
            EntityKind::BaseModel => None,
            EntityKind::User => Some("users"),
            EntityKind::Place => Some("places"),
            EntityKind::State => Some("states"),
            EntityKind::City => Some("cities"),
            EntityKind::Amenity => Some("amenities"),
            EntityKind::Review => Some("reviews"),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.name().parse::<EntityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("state".parse::<EntityKind>().is_err());
        assert!(matches!(
            "NotARealType".parse::<EntityKind>(),
            Err(ModelError::UnknownKind(name)) if name == "NotARealType"
        ));
    }

    #[test]
    fn test_base_model_has_no_table() {
        assert_eq!(EntityKind::BaseModel.table(), None);
        assert_eq!(EntityKind::City.table(), Some("cities"));
    }
}
