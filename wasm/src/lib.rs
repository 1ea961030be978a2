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

//! This is a WASM wrapper for `tcx_garmin_convert`.

use tcx_garmin_convert::LapOptions;
use wasm_bindgen::{prelude::wasm_bindgen, JsError};

/// This wraps `tcx_garmin_convert::convert` for interfacing with JS.
///
/// The optional values map to `undefined` on the JS side.
#[wasm_bindgen]
pub fn convert(
    source: &[u8],
    total_calories: u32,
    avg_bpm: Option<u8>,
    max_bpm: Option<u8>,
    cadence: Option<u8>,
) -> Result<Box<[u8]>, JsError> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    let options = LapOptions {
        avg_bpm,
        max_bpm,
        cadence,
    };
    let mut sink = vec![];
    tcx_garmin_convert::convert(source, &mut sink, total_calories, &options)?;
    Ok(sink.into_boxed_slice())
}
