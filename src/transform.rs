// Copyright 2023 Viktor Reusch
//
// This file is part of tcx_garmin_convert.
//
// tcx_garmin_convert is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// tcx_garmin_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with tcx_garmin_convert. If not, see <https://www.gnu.org/licenses/>.

//! Rewriting of a watch-generated TCX tree into one Garmin Connect accepts.

use thiserror::Error;
use tracing::{debug, info};

use crate::tree::{Document, Element};

const ROOT: &str = "TrainingCenterDatabase";
const ACTIVITY: &str = "Activity";
const LAP: &str = "Lap";
const TRACK: &str = "Track";
const CUMULATIVE_CLIMB: &str = "CumulativeClimb";
const CUMULATIVE_DECREASE: &str = "CumulativeDecrease";
const TRIGGER_METHOD: &str = "TriggerMethod";
const CADENCE: &str = "Cadence";
const INTENSITY: &str = "Intensity";
const MAXIMUM_HEART_RATE: &str = "MaximumHeartRateBpm";
const AVERAGE_HEART_RATE: &str = "AverageHeartRateBpm";
const HEART_RATE_VALUE: &str = "Value";
const CALORIES: &str = "Calories";
const MAXIMUM_SPEED: &str = "MaximumSpeed";

/// Root attributes Garmin rejects.
///
/// `xsi:schemaLocation` stays for now: it is valid TCX and it is unclear
/// whether Garmin chokes on it.
const REMOVED_ROOT_ATTRIBUTES: &[&str] = &["creator", "version"];
const SPORT_ATTRIBUTE: &str = "Sport";
/// Every activity is imported as a run.
const DEFAULT_SPORT: &str = "Running";
const DEFAULT_TRIGGER_METHOD: &str = "Manual";
const DEFAULT_INTENSITY: &str = "Active";
/// Placeholder in meters per second for laps without a maximum speed.
const DEFAULT_MAXIMUM_SPEED: &str = "10.0";

/// Values supplied by the user which the watch does not record per lap.
///
/// Each value is only written to laps which lack the corresponding element.
/// Zero counts as not supplied: TCX heart rates start at one, and a zero
/// cadence carries no information.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LapOptions {
    /// Average heart rate in beats per minute.
    pub avg_bpm: Option<u8>,
    /// Maximum heart rate in beats per minute.
    pub max_bpm: Option<u8>,
    /// Cadence in steps per minute.
    pub cadence: Option<u8>,
}

/// Structural problem with the input found by [`transform`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("no <TrainingCenterDatabase> element found")]
    MissingRootElement,
    #[error("no <Activity> element found")]
    MissingActivityElement,
    #[error("no <Lap> element found")]
    NoLapsFound,
    /// `lap` is the zero-based index of the offending lap.
    #[error("lap {lap} has no <Track> element")]
    MissingTrackElement { lap: usize },
}

/// Rewrite `document` so that Garmin accepts it.
///
/// - `creator` and `version` are removed from the `TrainingCenterDatabase`.
/// - The `Sport` of the first `Activity` becomes `Running`.
/// - Every `Lap` anywhere in the document loses `CumulativeClimb` and
///   `CumulativeDecrease` and gains the elements the Garmin schema requires
///   in front of `Track`. Missing `Calories` are filled with an even,
///   truncated share of `total_calories`.
///
/// The document is consumed, so nothing half-rewritten survives an error.
pub fn transform(
    mut document: Document,
    total_calories: u32,
    options: &LapOptions,
) -> Result<Document, TransformError> {
    let root = document
        .root
        .find_mut(ROOT)
        .ok_or(TransformError::MissingRootElement)?;
    for attribute in REMOVED_ROOT_ATTRIBUTES {
        if root.remove_attribute(attribute).is_some() {
            info!("removed attribute {attribute} from {ROOT}");
        }
    }

    let activity = document
        .root
        .find_mut(ACTIVITY)
        .ok_or(TransformError::MissingActivityElement)?;
    activity.set_attribute(SPORT_ATTRIBUTE, DEFAULT_SPORT);
    info!("set {SPORT_ATTRIBUTE} of {ACTIVITY} to {DEFAULT_SPORT}");

    // Laps are searched in the whole document, not only in the first
    // activity.
    let laps = document.root.find_all_mut(LAP);
    if laps.is_empty() {
        return Err(TransformError::NoLapsFound);
    }
    let lap_count = u32::try_from(laps.len()).unwrap_or(u32::MAX);
    let calories_per_lap = total_calories / lap_count;
    info!(
        laps = laps.len(),
        "distributing {total_calories} calories as {calories_per_lap} per lap"
    );

    for (index, lap) in laps.into_iter().enumerate() {
        normalize_lap(lap, calories_per_lap, options)
            .ok_or(TransformError::MissingTrackElement { lap: index })?;
    }

    Ok(document)
}

/// Make a single `lap` conform to the Garmin schema.
///
/// Missing elements are inserted in front of `Track` so that the lap reads
/// `MaximumSpeed`, `Calories`, `AverageHeartRateBpm`, `MaximumHeartRateBpm`,
/// `Intensity`, `Cadence`, `TriggerMethod`, `Track`. Elements already in the
/// lap are neither moved nor duplicated, but later insertions are anchored to
/// them.
///
/// Returns `None` if the lap has no `Track`.
fn normalize_lap(lap: &mut Element, calories_per_lap: u32, options: &LapOptions) -> Option<()> {
    for name in [CUMULATIVE_CLIMB, CUMULATIVE_DECREASE] {
        if lap.remove_child(name).is_some() {
            debug!("removed {name} from {LAP}");
        }
    }

    // Index of the element in front of which the next element is inserted.
    let mut anchor = lap.child_position(TRACK)?;

    anchor = ensure_before(lap, anchor, TRIGGER_METHOD, || {
        Element::with_text(TRIGGER_METHOD, DEFAULT_TRIGGER_METHOD)
    });
    if let Some(cadence) = supplied(options.cadence) {
        anchor = ensure_before(lap, anchor, CADENCE, || {
            Element::with_text(CADENCE, cadence.to_string())
        });
    }
    anchor = ensure_before(lap, anchor, INTENSITY, || {
        Element::with_text(INTENSITY, DEFAULT_INTENSITY)
    });
    if let Some(bpm) = supplied(options.max_bpm) {
        anchor = ensure_before(lap, anchor, MAXIMUM_HEART_RATE, || {
            heart_rate(MAXIMUM_HEART_RATE, bpm)
        });
    }
    if let Some(bpm) = supplied(options.avg_bpm) {
        anchor = ensure_before(lap, anchor, AVERAGE_HEART_RATE, || {
            heart_rate(AVERAGE_HEART_RATE, bpm)
        });
    }

    // MaximumSpeed goes in front of Calories, wherever those are.
    let calories = ensure_before(lap, anchor, CALORIES, || {
        Element::with_text(CALORIES, calories_per_lap.to_string())
    });
    ensure_before(lap, calories, MAXIMUM_SPEED, || {
        Element::with_text(MAXIMUM_SPEED, DEFAULT_MAXIMUM_SPEED)
    });

    Some(())
}

/// Return the position of the child `name` of `lap`.
///
/// If there is none, `create` one and insert it at `anchor`, i.e., directly in
/// front of the element which was at `anchor` before.
fn ensure_before(
    lap: &mut Element,
    anchor: usize,
    name: &str,
    create: impl FnOnce() -> Element,
) -> usize {
    match lap.child_position(name) {
        Some(position) => position,
        None => {
            lap.insert_child(anchor, create());
            debug!("added {name} to {LAP}");
            anchor
        }
    }
}

/// `value` unless it is missing or zero.
fn supplied(value: Option<u8>) -> Option<u8> {
    value.filter(|&v| v != 0)
}

/// Create a heart rate element called `name` holding `bpm`.
fn heart_rate(name: &str, bpm: u8) -> Element {
    let mut element = Element::new(name);
    element.push_child(Element::with_text(HEART_RATE_VALUE, bpm.to_string()));
    element
}
