//! Row-level reductions shared by the aggregations.
//!
//! Every function here is pure and keeps Store iteration order on ties, so
//! results are deterministic for a given Store content.

use std::collections::HashMap;

use paddock_core::{Driver, DriverNumber, Lap, Position, SessionKey};

/// Final classification row per driver: the snapshot with the latest
/// timestamp. On equal timestamps the earlier row wins.
///
/// Rows are returned in Store order of the chosen snapshots.
pub fn final_positions<'a, I>(rows: I) -> Vec<&'a Position>
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut latest: HashMap<DriverNumber, (usize, &'a Position)> = HashMap::new();

    for (index, row) in rows.into_iter().enumerate() {
        match latest.get(&row.driver_number) {
            Some((_, current)) if current.date >= row.date => {}
            _ => {
                latest.insert(row.driver_number, (index, row));
            }
        }
    }

    let mut finals: Vec<(usize, &'a Position)> = latest.into_values().collect();
    finals.sort_by_key(|(index, _)| *index);
    finals.into_iter().map(|(_, row)| row).collect()
}

/// Final classification of one session ordered by position ascending.
pub fn classification<'a, I>(rows: I) -> Vec<&'a Position>
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut finals = final_positions(rows);
    finals.sort_by_key(|p| p.position);
    finals
}

/// Lap with the minimum positive duration.
pub fn fastest_lap<'a, I>(laps: I) -> Option<&'a Lap>
where
    I: IntoIterator<Item = &'a Lap>,
{
    let mut best: Option<(&'a Lap, f64)> = None;
    for lap in laps {
        let Some(duration) = lap.timed_duration() else {
            continue;
        };
        match best {
            Some((_, current)) if current <= duration => {}
            _ => best = Some((lap, duration)),
        }
    }
    best.map(|(lap, _)| lap)
}

/// Lap with the maximum positive speed trap reading.
pub fn top_speed_lap<'a, I>(laps: I) -> Option<&'a Lap>
where
    I: IntoIterator<Item = &'a Lap>,
{
    let mut best: Option<(&'a Lap, f64)> = None;
    for lap in laps {
        let Some(speed) = lap.measured_speed() else {
            continue;
        };
        match best {
            Some((_, current)) if current >= speed => {}
            _ => best = Some((lap, speed)),
        }
    }
    best.map(|(lap, _)| lap)
}

/// Laps bucketed by session, each bucket in Store order.
pub fn laps_by_session(laps: &[Lap]) -> HashMap<SessionKey, Vec<&Lap>> {
    let mut buckets: HashMap<SessionKey, Vec<&Lap>> = HashMap::new();
    for lap in laps {
        buckets.entry(lap.session_key).or_default().push(lap);
    }
    buckets
}

/// Drivers keyed by number. A duplicated number keeps its first row.
pub fn driver_index(drivers: &[Driver]) -> HashMap<DriverNumber, &Driver> {
    let mut index = HashMap::with_capacity(drivers.len());
    for driver in drivers {
        index.entry(driver.driver_number).or_insert(driver);
    }
    index
}

/// Tally occurrences, keeping first-appearance order.
pub fn tally<I>(numbers: I) -> Vec<(DriverNumber, usize)>
where
    I: IntoIterator<Item = DriverNumber>,
{
    let mut counts: Vec<(DriverNumber, usize)> = Vec::new();
    for number in numbers {
        match counts.iter_mut().find(|(n, _)| *n == number) {
            Some((_, count)) => *count += 1,
            None => counts.push((number, 1)),
        }
    }
    counts
}

/// The `limit` highest counts, descending. Ties keep their input order.
pub fn top_counts(mut counts: Vec<(DriverNumber, usize)>, limit: usize) -> Vec<(DriverNumber, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}
