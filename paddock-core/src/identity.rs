//! Identity types for Paddock rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Season year (e.g. 2024).
pub type Season = i32;

/// Permanent car number of a driver, unique across the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct DriverNumber(pub u32);

/// Provider key of a single timed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct SessionKey(pub u32);

impl DriverNumber {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl SessionKey {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DriverNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DriverNumber {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(DriverNumber)
    }
}

impl FromStr for SessionKey {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(SessionKey)
    }
}

impl From<u32> for DriverNumber {
    fn from(value: u32) -> Self {
        DriverNumber(value)
    }
}

impl From<u32> for SessionKey {
    fn from(value: u32) -> Self {
        SessionKey(value)
    }
}
