//! Typed row queries evaluated by every store engine.
//!
//! A [`Query`] is a list of predicates on a record's field enum, an ordering
//! over one or more fields, and an optional limit. Engines fetch candidate
//! rows in insertion order and hand them to [`Query::apply`], so ties in the
//! ordering always keep insertion order.

use std::cmp::Ordering;
use std::fmt;

use paddock_core::{DriverNumber, SessionKey, Timestamp};

use crate::Record;

// ============================================================================
// FIELD VALUES
// ============================================================================

/// A single column value extracted from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Time(Timestamp),
}

impl FieldValue {
    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Int(_) | FieldValue::Float(_) => 1,
            FieldValue::Text(_) => 2,
            FieldValue::Time(_) => 3,
        }
    }

    /// Total order used for sorting. `Null` sorts before every value and
    /// integers compare numerically against floats.
    pub fn total_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.total_cmp(b),
            (FieldValue::Int(a), FieldValue::Float(b)) => (*a as f64).total_cmp(b),
            (FieldValue::Float(a), FieldValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Time(a), FieldValue::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Comparison used by predicates: `Null` never compares, and neither do
    /// values of unrelated kinds.
    fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, _) | (_, FieldValue::Null) => None,
            _ if self.rank() != other.rank() => None,
            _ => Some(self.total_cmp(other)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Time(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Timestamp> for FieldValue {
    fn from(v: Timestamp) -> Self {
        FieldValue::Time(v)
    }
}

impl From<DriverNumber> for FieldValue {
    fn from(v: DriverNumber) -> Self {
        FieldValue::Int(v.get() as i64)
    }
}

impl From<SessionKey> for FieldValue {
    fn from(v: SessionKey) -> Self {
        FieldValue::Int(v.get() as i64)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Row filter on a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F> {
    Eq(F, FieldValue),
    Gt(F, FieldValue),
}

/// Filter, ordering and limit over rows of one record type.
#[derive(Debug, Clone)]
pub struct Query<R: Record> {
    predicates: Vec<Predicate<R::Field>>,
    order: Vec<(R::Field, Direction)>,
    limit: Option<usize>,
}

impl<R: Record> Default for Query<R> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }
}

impl<R: Record> Query<R> {
    /// Every row, insertion order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: R::Field, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Eq(field, value.into()));
        self
    }

    pub fn gt(mut self, field: R::Field, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Gt(field, value.into()));
        self
    }

    pub fn asc(mut self, field: R::Field) -> Self {
        self.order.push((field, Direction::Asc));
        self
    }

    pub fn desc(mut self, field: R::Field) -> Self {
        self.order.push((field, Direction::Desc));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicates(&self) -> &[Predicate<R::Field>] {
        &self.predicates
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a row passes every predicate.
    pub fn matches(&self, row: &R) -> bool {
        self.predicates.iter().all(|predicate| match predicate {
            Predicate::Eq(field, value) => {
                row.field(*field).compare(value) == Some(Ordering::Equal)
            }
            Predicate::Gt(field, value) => {
                row.field(*field).compare(value) == Some(Ordering::Greater)
            }
        })
    }

    fn cmp_rows(&self, a: &R, b: &R) -> Ordering {
        for (field, direction) in &self.order {
            let ordering = a.field(*field).total_cmp(&b.field(*field));
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Filter, stable-sort and truncate rows given in insertion order.
    pub fn apply<I>(&self, rows: I) -> Vec<R>
    where
        I: IntoIterator<Item = R>,
    {
        let mut selected: Vec<R> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if !self.order.is_empty() {
            selected.sort_by(|a, b| self.cmp_rows(a, b));
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Group rows by one field and count each group, in order of first
/// appearance. Groups are keyed by value equality, so `Int(1)` and
/// `Float(1.0)` fall into the same group.
pub fn group_count<R: Record>(rows: &[R], field: R::Field) -> Vec<(FieldValue, usize)> {
    let mut groups: Vec<(FieldValue, usize)> = Vec::new();
    for row in rows {
        let value = row.field(field);
        match groups
            .iter_mut()
            .find(|(existing, _)| existing.total_cmp(&value) == Ordering::Equal)
        {
            Some((_, count)) => *count += 1,
            None => groups.push((value, 1)),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LapField;
    use paddock_core::Lap;
    use proptest::prelude::*;

    fn lap(session: u32, driver: u32, number: i32, duration: Option<f64>) -> Lap {
        Lap {
            session_key: SessionKey(session),
            driver_number: DriverNumber(driver),
            lap_number: number,
            lap_duration: duration,
            duration_sector_1: None,
            duration_sector_2: None,
            duration_sector_3: None,
            st_speed: None,
            date_start: None,
        }
    }

    #[test]
    fn test_null_never_matches_predicates() {
        let query = Query::<Lap>::all().gt(LapField::LapDuration, 0.0);
        assert!(!query.matches(&lap(1, 1, 1, None)));
        assert!(!query.matches(&lap(1, 1, 1, Some(0.0))));
        assert!(query.matches(&lap(1, 1, 1, Some(91.2))));
    }

    #[test]
    fn test_int_and_float_compare_numerically() {
        assert_eq!(FieldValue::Int(2).total_cmp(&FieldValue::Float(1.5)), Ordering::Greater);
        assert_eq!(FieldValue::Null.total_cmp(&FieldValue::Int(-5)), Ordering::Less);
        assert_eq!(FieldValue::Text("a".into()).compare(&FieldValue::Int(1)), None);
    }

    #[test]
    fn test_multi_field_order_and_limit() {
        let rows = vec![
            lap(1, 44, 2, Some(90.0)),
            lap(1, 1, 1, Some(91.0)),
            lap(1, 44, 1, Some(92.0)),
            lap(1, 1, 2, Some(89.0)),
        ];
        let query = Query::<Lap>::all()
            .asc(LapField::DriverNumber)
            .desc(LapField::LapNumber)
            .limit(3);
        let result: Vec<(u32, i32)> = query
            .apply(rows)
            .iter()
            .map(|l| (l.driver_number.get(), l.lap_number))
            .collect();
        assert_eq!(result, vec![(1, 2), (1, 1), (44, 2)]);
    }

    #[test]
    fn test_group_count_keeps_first_appearance() {
        let rows = vec![lap(7, 1, 1, None), lap(3, 1, 1, None), lap(7, 2, 1, None)];
        let groups = group_count(&rows, LapField::SessionKey);
        assert_eq!(
            groups,
            vec![(FieldValue::Int(7), 2), (FieldValue::Int(3), 1)]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_sort_is_stable(keys in proptest::collection::vec(0u32..4, 0..40)) {
            let rows: Vec<Lap> = keys
                .iter()
                .enumerate()
                .map(|(i, k)| lap(*k, 1, i as i32, None))
                .collect();
            let sorted = Query::<Lap>::all().asc(LapField::SessionKey).apply(rows);
            for pair in sorted.windows(2) {
                prop_assert!(pair[0].session_key <= pair[1].session_key);
                if pair[0].session_key == pair[1].session_key {
                    prop_assert!(pair[0].lap_number < pair[1].lap_number);
                }
            }
        }
    }
}
