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

//! Library for converting
//! [TCX](https://en.wikipedia.org/wiki/Training_Center_XML) files recorded by
//! a Huawei watch into TCX files which Garmin Connect imports.
//!
//! The watch omits several per-lap elements the Garmin schema requires and
//! adds attributes Garmin rejects. Calories are only known for the whole
//! activity, so they are spread evenly over the laps.
//!
//! See [`convert`] for information on how to use this library. The individual
//! steps are available as [`Document`] and [`transform`].

use std::io::{Read, Write};

use thiserror::Error;

pub mod transform;
pub mod tree;

pub use transform::{transform, LapOptions, TransformError};
pub use tree::{Document, Element, Node, XmlError};

/// Error returned from the [`convert`] function.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the source TCX failed.
    #[error("reading TCX failed: {0}")]
    Parse(#[source] XmlError),
    /// The source is well-formed XML but lacks required elements.
    #[error("converting TCX failed: {0}")]
    Transform(#[from] TransformError),
    /// Writing the converted TCX failed.
    #[error("writing TCX failed: {0}")]
    Write(#[source] XmlError),
}

/// Read a Huawei TCX file and write a Garmin TCX file.
///
/// A complete TCX file is read from `source`. `total_calories` of the whole
/// activity are distributed over all laps without calories of their own.
/// `options` supply the per-lap values the watch does not record. The
/// converted file is written to `sink`.
///
/// Nothing is written to `sink` unless reading and transforming succeeded.
///
/// # Example
/// ```
/// # use tcx_garmin_convert::{convert, LapOptions};
/// #
/// let source = r#"
/// <?xml version="1.0" encoding="UTF-8"?>
/// <TrainingCenterDatabase creator="Huawei" version="1.0">
///   <Activities>
///     <Activity Sport="Other">
///       <Lap><Track/></Lap>
///       <Lap><Track/></Lap>
///     </Activity>
///   </Activities>
/// </TrainingCenterDatabase>
/// "#;
/// let options = LapOptions {
///     avg_bpm: Some(140),
///     ..Default::default()
/// };
/// let mut sink = vec![];
///
/// convert(source.as_bytes(), &mut sink, 301, &options).expect("conversion failed");
///
/// let tcx = String::from_utf8(sink).expect("TCX data is not valid UTF-8");
/// assert!(tcx.contains(r#"Sport="Running""#));
/// assert!(!tcx.contains("creator"));
/// assert!(tcx.contains("<Calories>150</Calories>"));
/// assert!(tcx.contains("<Value>140</Value>"));
/// ```
pub fn convert(
    source: impl Read,
    sink: impl Write,
    total_calories: u32,
    options: &LapOptions,
) -> Result<(), Error> {
    let document = Document::parse(source).map_err(Error::Parse)?;
    let document = transform(document, total_calories, options)?;
    document.write(sink).map_err(Error::Write)
}
