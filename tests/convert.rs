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

use std::{fs::File, path::Path};

use rstest::rstest;
use tcx_garmin_convert::{convert, transform, Document, Element, Error, LapOptions, TransformError};

const RESOURCES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/");

fn convert_resource(name: &str, total_calories: u32, options: &LapOptions) -> Document {
    let source = File::open(Path::new(RESOURCES).join(name)).expect("resource not found");
    let mut sink = vec![];
    convert(source, &mut sink, total_calories, options).expect("conversion failed");
    Document::parse(sink.as_slice()).expect("output is not valid XML")
}

fn laps(document: &Document) -> Vec<&Element> {
    document
        .root
        .find("Activity")
        .expect("no activity")
        .child_elements()
        .filter(|e| e.is("Lap"))
        .collect()
}

fn names(lap: &Element) -> Vec<&str> {
    lap.child_elements().map(|e| e.name.as_str()).collect()
}

fn child_text(lap: &Element, name: &str) -> Option<String> {
    lap.child(name).map(Element::text)
}

#[test]
fn converts_watch_export() {
    let options = LapOptions {
        avg_bpm: Some(138),
        max_bpm: Some(171),
        cadence: Some(84),
    };
    let document = convert_resource("huawei.tcx", 250, &options);

    let root = &document.root;
    assert_eq!(root.attribute("creator"), None);
    assert_eq!(root.attribute("version"), None);
    assert!(root.attribute("xsi:schemaLocation").is_some());
    assert_eq!(root.attribute("xmlns"), Some("http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2"));
    let activity = root.find("Activity").unwrap();
    assert_eq!(activity.attribute("Sport"), Some("Running"));

    let laps = laps(&document);
    assert_eq!(laps.len(), 3);
    assert_eq!(
        names(laps[0]),
        [
            "TotalTimeSeconds",
            "DistanceMeters",
            "MaximumSpeed",
            "Calories",
            "AverageHeartRateBpm",
            "MaximumHeartRateBpm",
            "Intensity",
            "Cadence",
            "TriggerMethod",
            "Track"
        ]
    );
    for lap in &laps {
        assert!(lap.child("CumulativeClimb").is_none());
        assert!(lap.child("CumulativeDecrease").is_none());
        assert_eq!(child_text(lap, "MaximumSpeed").as_deref(), Some("10.0"));
        assert_eq!(child_text(lap, "TriggerMethod").as_deref(), Some("Manual"));
        assert_eq!(child_text(lap, "Intensity").as_deref(), Some("Active"));
        assert_eq!(child_text(lap, "Cadence").as_deref(), Some("84"));
        let max = lap.child("MaximumHeartRateBpm").unwrap();
        assert_eq!(child_text(max, "Value").as_deref(), Some("171"));
    }

    // The second lap brings its own calories.
    let calories: Vec<_> = laps.iter().map(|lap| child_text(lap, "Calories")).collect();
    assert_eq!(
        calories,
        [Some("83".to_string()), Some("77".to_string()), Some("83".to_string())]
    );

    // Track points keep their contents.
    let point = laps[0].find("Trackpoint").unwrap();
    assert_eq!(child_text(point, "Cadence").as_deref(), Some("82"));
    assert_eq!(
        point.find("LatitudeDegrees").map(Element::text).as_deref(),
        Some("48.858222")
    );
}

#[test]
fn converts_without_optional_values() {
    let document = convert_resource("huawei.tcx", 90, &LapOptions::default());

    let laps = laps(&document);
    assert_eq!(
        names(laps[2]),
        [
            "TotalTimeSeconds",
            "DistanceMeters",
            "MaximumSpeed",
            "Calories",
            "Intensity",
            "TriggerMethod",
            "Track"
        ]
    );
    assert_eq!(child_text(laps[2], "Calories").as_deref(), Some("30"));
}

#[rstest]
#[case(100, 3, "33")]
#[case(301, 2, "150")]
#[case(5, 7, "0")]
#[case(0, 1, "0")]
fn splits_calories_evenly(#[case] total: u32, #[case] lap_count: usize, #[case] expected: &str) {
    let xml = format!(
        "<TrainingCenterDatabase><Activities><Activity>{}</Activity></Activities></TrainingCenterDatabase>",
        "<Lap><Track/></Lap>".repeat(lap_count)
    );
    let document = Document::parse(xml.as_bytes()).unwrap();

    let document = transform(document, total, &LapOptions::default()).unwrap();
    for lap in laps(&document) {
        assert_eq!(child_text(lap, "Calories").as_deref(), Some(expected));
    }
}

#[test]
fn touches_laps_of_every_activity() {
    let xml = "<TrainingCenterDatabase><Activities>\
        <Activity Sport=\"Biking\"><Lap><Track/></Lap></Activity>\
        <Activity Sport=\"Biking\"><Lap><Track/></Lap></Activity>\
        </Activities></TrainingCenterDatabase>";
    let document = Document::parse(xml.as_bytes()).unwrap();

    let mut document = transform(document, 10, &LapOptions::default()).unwrap();
    let activities = document.root.find_all_mut("Activity");
    assert_eq!(activities[0].attribute("Sport"), Some("Running"));
    assert_eq!(activities[1].attribute("Sport"), Some("Biking"));
    for activity in activities {
        let lap = activity.child("Lap").unwrap();
        assert_eq!(child_text(lap, "Calories").as_deref(), Some("5"));
    }
}

#[test]
fn nothing_is_written_on_failure() {
    let source = "<TrainingCenterDatabase><Activities><Activity>\
        <Lap><Track/></Lap><Lap/>\
        </Activity></Activities></TrainingCenterDatabase>";
    let mut sink = vec![];

    let result = convert(source.as_bytes(), &mut sink, 10, &LapOptions::default());
    assert!(matches!(
        result,
        Err(Error::Transform(TransformError::MissingTrackElement { lap: 1 }))
    ));
    assert!(sink.is_empty());
}

#[test]
fn reports_parse_failures_separately() {
    let mut sink = vec![];
    let result = convert("<TrainingCenterDatabase>".as_bytes(), &mut sink, 10, &LapOptions::default());
    assert!(matches!(result, Err(Error::Parse(_))));

    let result = convert("<Other/>".as_bytes(), &mut sink, 10, &LapOptions::default());
    assert!(matches!(
        result,
        Err(Error::Transform(TransformError::MissingRootElement))
    ));
    assert!(sink.is_empty());
}
