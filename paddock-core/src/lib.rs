//! Paddock Core - Entity Types
//!
//! Row types, identifiers, configuration, and error types shared by every
//! Paddock crate. This crate performs no I/O.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::*;
pub use entities::*;
pub use error::*;
pub use identity::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four cached datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Drivers,
    Sessions,
    Positions,
    Laps,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Drivers, Table::Sessions, Table::Positions, Table::Laps];

    /// Stable lowercase name, used for storage database names and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Drivers => "drivers",
            Table::Sessions => "sessions",
            Table::Positions => "positions",
            Table::Laps => "laps",
        }
    }

    /// Name of one row, for user-facing messages.
    pub fn singular(self) -> &'static str {
        match self {
            Table::Drivers => "Driver",
            Table::Sessions => "Session",
            Table::Positions => "Position",
            Table::Laps => "Lap",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_are_distinct() {
        let mut names: Vec<&str> = Table::ALL.iter().map(|t| t.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 4);
        assert_eq!(Table::Positions.to_string(), "positions");
        assert_eq!(Table::Sessions.singular(), "Session");
    }
}
