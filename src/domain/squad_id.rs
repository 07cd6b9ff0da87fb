//! Squad and territory identifiers.
//!
//! Squads are referred to by their unit number (e.g. `42`). Territories
//! share the same numbering, since every squad has a home territory, but
//! the two are kept as distinct types so they cannot be swapped by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ScheduleError;

/// Identifier of a rescue squad (its unit number).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct SquadId(u16);

impl SquadId {
    /// Creates a squad ID from its unit number.
    #[must_use]
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// Returns the unit number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SquadId {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map(Self)
            .map_err(|_| ScheduleError::InvalidRequest(format!("invalid squad id: {s:?}")))
    }
}

impl From<u16> for SquadId {
    fn from(number: u16) -> Self {
        Self(number)
    }
}

/// Identifier of a coverage territory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TerritoryId(u16);

impl TerritoryId {
    /// Creates a territory ID.
    #[must_use]
    pub const fn new(number: u16) -> Self {
        Self(number)
    }

    /// Returns the territory number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for TerritoryId {
    fn from(number: u16) -> Self {
        Self(number)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_numbers() {
        let Ok(id) = " 42 ".parse::<SquadId>() else {
            panic!("expected a squad id");
        };
        assert_eq!(id, SquadId::new(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_non_numeric() {
        assert!("4x".parse::<SquadId>().is_err());
        assert!("".parse::<SquadId>().is_err());
    }

    #[test]
    fn orders_by_unit_number() {
        let mut ids = vec![SquadId::new(54), SquadId::new(34), SquadId::new(42)];
        ids.sort();
        assert_eq!(ids, vec![SquadId::new(34), SquadId::new(42), SquadId::new(54)]);
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&TerritoryId::new(35)).unwrap_or_default();
        assert_eq!(json, "35");
    }
}
