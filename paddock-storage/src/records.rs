//! `Record` implementations for the cached row types.

use paddock_core::{Driver, Lap, Position, Session, Table};

use crate::{FieldValue, Record};

/// Queryable columns of [`Driver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverField {
    DriverNumber,
    FirstName,
    LastName,
    NameAcronym,
    TeamName,
    CountryCode,
}

impl Record for Driver {
    type Field = DriverField;

    fn table() -> Table {
        Table::Drivers
    }

    fn field(&self, field: DriverField) -> FieldValue {
        match field {
            DriverField::DriverNumber => self.driver_number.into(),
            DriverField::FirstName => self.first_name.as_str().into(),
            DriverField::LastName => self.last_name.as_str().into(),
            DriverField::NameAcronym => self.name_acronym.as_str().into(),
            DriverField::TeamName => self.team_name.as_str().into(),
            DriverField::CountryCode => self.country_code.as_str().into(),
        }
    }
}

/// Queryable columns of [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionField {
    SessionKey,
    SessionName,
    SessionType,
    Location,
    CountryName,
    Year,
    CircuitShortName,
    DateStart,
}

impl Record for Session {
    type Field = SessionField;

    fn table() -> Table {
        Table::Sessions
    }

    fn field(&self, field: SessionField) -> FieldValue {
        match field {
            SessionField::SessionKey => self.session_key.into(),
            SessionField::SessionName => self.session_name.as_str().into(),
            SessionField::SessionType => self.session_type.as_str().into(),
            SessionField::Location => self.location.as_str().into(),
            SessionField::CountryName => self.country_name.as_str().into(),
            SessionField::Year => self.year.into(),
            SessionField::CircuitShortName => self.circuit_short_name.as_str().into(),
            SessionField::DateStart => self.date_start.into(),
        }
    }
}

/// Queryable columns of [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionField {
    SessionKey,
    DriverNumber,
    Position,
    Date,
}

impl Record for Position {
    type Field = PositionField;

    fn table() -> Table {
        Table::Positions
    }

    fn field(&self, field: PositionField) -> FieldValue {
        match field {
            PositionField::SessionKey => self.session_key.into(),
            PositionField::DriverNumber => self.driver_number.into(),
            PositionField::Position => self.position.into(),
            PositionField::Date => self.date.into(),
        }
    }
}

/// Queryable columns of [`Lap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LapField {
    SessionKey,
    DriverNumber,
    LapNumber,
    LapDuration,
    StSpeed,
    DateStart,
}

impl Record for Lap {
    type Field = LapField;

    fn table() -> Table {
        Table::Laps
    }

    fn field(&self, field: LapField) -> FieldValue {
        match field {
            LapField::SessionKey => self.session_key.into(),
            LapField::DriverNumber => self.driver_number.into(),
            LapField::LapNumber => self.lap_number.into(),
            LapField::LapDuration => self.lap_duration.into(),
            LapField::StSpeed => self.st_speed.into(),
            LapField::DateStart => self.date_start.into(),
        }
    }
}
