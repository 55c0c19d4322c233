//! Aggregation results returned to callers.

use paddock_core::{Driver, DriverNumber, Season, SessionKey, Timestamp};
use serde::{Deserialize, Serialize};

// ============================================================================
// DRIVER
// ============================================================================

/// A driver's result in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DriverSessionResult {
    pub session_key: SessionKey,
    pub circuit_short_name: String,
    /// "<country> Grand Prix"
    pub race: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub date_start: Timestamp,
    /// Final classified position.
    pub position: i32,
    /// The driver set the session's fastest lap.
    pub fastest_lap: bool,
    /// Speed trap reading of the driver's best lap, 0 when unknown.
    pub max_speed: f64,
    /// Duration of the driver's best lap in seconds, 0 when no timed lap.
    pub best_lap_duration: f64,
}

/// Career aggregates over every cached session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PerformanceSummary {
    pub wins: usize,
    pub top_3_finishes: usize,
    /// Sessions with a recorded final position.
    pub classified_sessions: usize,
    pub max_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DriverDetail {
    pub driver: Driver,
    pub full_name: String,
    pub performance_summary: PerformanceSummary,
    /// Ordered by session start.
    pub race_results: Vec<DriverSessionResult>,
}

/// One position snapshot of a driver, joined with its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DriverPositionEntry {
    pub session_key: SessionKey,
    pub circuit_short_name: String,
    pub race: String,
    pub position: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub date: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DriverPositions {
    pub driver_number: DriverNumber,
    /// Chronological.
    pub positions: Vec<DriverPositionEntry>,
}

// ============================================================================
// SESSION
// ============================================================================

/// One row of a session classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClassificationEntry {
    pub position: i32,
    pub driver_number: DriverNumber,
    pub driver: String,
    pub team: String,
    pub country: String,
    /// Appended last-place finisher outside the top three.
    pub last_place: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FastestLap {
    pub driver_number: DriverNumber,
    /// Absent when the driver row is missing.
    pub driver: Option<String>,
    pub lap_number: i32,
    pub total_time: f64,
    pub sector_1: Option<f64>,
    pub sector_2: Option<f64>,
    pub sector_3: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TopSpeed {
    pub driver_number: DriverNumber,
    pub driver: Option<String>,
    pub lap_number: i32,
    pub speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionDetail {
    pub session_key: SessionKey,
    pub country_name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub date_start: Timestamp,
    pub year: Season,
    pub circuit_short_name: String,
    pub results: Vec<ClassificationEntry>,
    pub fastest_lap: Option<FastestLap>,
    pub max_speed: Option<TopSpeed>,
}

// ============================================================================
// SEASON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LeaderboardEntry {
    /// 1-based.
    pub rank: usize,
    pub driver_number: DriverNumber,
    pub driver: Option<String>,
    pub team: Option<String>,
    pub country: Option<String>,
    pub count: usize,
}

impl LeaderboardEntry {
    pub(crate) fn new(rank: usize, driver_number: DriverNumber, driver: Option<&Driver>, count: usize) -> Self {
        Self {
            rank,
            driver_number,
            driver: driver.map(Driver::full_name),
            team: driver.map(|d| d.team_name.clone()),
            country: driver.map(|d| d.country_code.clone()),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SeasonSummary {
    pub season: Season,
    /// Cached sessions of the season.
    pub sessions: usize,
    pub top_3_winners: Vec<LeaderboardEntry>,
    pub top_3_fastest_laps: Vec<LeaderboardEntry>,
    /// Counted exactly like wins; no qualifying data is cached.
    pub top_3_pole_positions: Vec<LeaderboardEntry>,
}

// ============================================================================
// COVERAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SessionCoverage {
    pub session_key: SessionKey,
    pub race: String,
    pub positions: usize,
    pub laps: usize,
}

impl SessionCoverage {
    pub fn is_complete(&self) -> bool {
        self.positions > 0 && self.laps > 0
    }
}

/// Row counts per cached session. Sessions lacking positions or laps are
/// listed in `incomplete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DataCoverage {
    pub drivers: usize,
    pub sessions: Vec<SessionCoverage>,
    pub incomplete: Vec<SessionKey>,
}
