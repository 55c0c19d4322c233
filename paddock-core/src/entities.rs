//! Row structures cached from the telemetry provider
//!
//! Field names follow the provider's JSON so rows decode straight from the
//! wire. Nullable descriptive text decodes to an empty string; nullable
//! timings stay `Option`.

use crate::{DriverNumber, SessionKey, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};

/// Decode `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Driver - one entry of the cached roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Driver {
    pub driver_number: DriverNumber,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name_acronym: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub team_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country_code: String,
}

impl Driver {
    /// "First Last", trimmed when either half is missing.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Session - one timed track event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Session {
    pub session_key: SessionKey,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country_name: String,
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub circuit_short_name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub date_start: Timestamp,
}

impl Session {
    /// Display label used in per-session results.
    pub fn race_name(&self) -> String {
        format!("{} Grand Prix", self.country_name)
    }
}

/// Position - a classification snapshot of one driver within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Position {
    pub session_key: SessionKey,
    pub driver_number: DriverNumber,
    pub position: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub date: Timestamp,
}

/// Lap - timing and speed data of one completed lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Lap {
    pub session_key: SessionKey,
    pub driver_number: DriverNumber,
    pub lap_number: i32,
    #[serde(default)]
    pub lap_duration: Option<f64>,
    #[serde(default)]
    pub duration_sector_1: Option<f64>,
    #[serde(default)]
    pub duration_sector_2: Option<f64>,
    #[serde(default)]
    pub duration_sector_3: Option<f64>,
    /// Speed trap reading in km/h.
    #[serde(default)]
    pub st_speed: Option<f64>,
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "date-time"))]
    pub date_start: Option<Timestamp>,
}

impl Lap {
    /// Lap duration in seconds, `None` for the zero/absent sentinel.
    pub fn timed_duration(&self) -> Option<f64> {
        self.lap_duration.filter(|d| *d > 0.0)
    }

    /// Speed trap reading, `None` for the zero/absent sentinel.
    pub fn measured_speed(&self) -> Option<f64> {
        self.st_speed.filter(|s| *s > 0.0)
    }
}
