// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use mime::Mime;
use nom::{
    IResult, Parser as _,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::space0,
    combinator::opt,
    number::complete::double,
    sequence::{preceded, terminated},
};

use tonetag_core::{MetadataKey, Value, util::format_boolean};

pub mod picture;

#[must_use]
pub fn trim_readable(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || c.is_control())
}

/// The file name for presentation, or the whole path if it has none.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |file_name| file_name.to_string_lossy().into_owned(),
    )
}

/// Guesses the audio MIME type from the file extension.
#[must_use]
pub fn guess_mime_from_file_path(path: impl AsRef<Path>) -> Option<Mime> {
    let mime_guess = mime_guess::from_path(path.as_ref());
    mime_guess
        .iter()
        .find(|mime| mime.type_() == mime::AUDIO)
        .or_else(|| mime_guess.iter().find(|mime| mime.type_() == mime::VIDEO))
}

/// Parses a gain like `-6.50 dB`.
///
/// The unit is mandatory and case-insensitive.
pub fn parse_replay_gain_db(input: &str) -> IResult<&str, f64> {
    let mut parser = terminated(
        preceded(space0, double),
        (space0, tag_no_case("dB"), space0),
    );
    parser.parse(input)
}

/// Parses a loudness like `-18.0 LUFS`.
///
/// The unit is optional.
pub fn parse_reference_loudness(input: &str) -> IResult<&str, f64> {
    let mut parser = terminated(
        preceded(space0, double),
        (
            space0,
            opt(alt((tag_no_case("LUFS"), tag_no_case("dB")))),
            space0,
        ),
    );
    parser.parse(input)
}

/// Formats a value for storing it as text in a tag.
#[must_use]
pub fn format_value(key: MetadataKey, value: &Value) -> String {
    match (key, value) {
        (
            MetadataKey::ReplayGainTrackGain | MetadataKey::ReplayGainAlbumGain,
            Value::Float(_) | Value::Integer(_),
        ) => format!("{:+.2} dB", value.as_float().unwrap_or_default()),
        (
            MetadataKey::ReplayGainTrackPeak | MetadataKey::ReplayGainAlbumPeak,
            Value::Float(_) | Value::Integer(_),
        ) => format!("{:.8}", value.as_float().unwrap_or_default()),
        (MetadataKey::ReplayGainReferenceLoudness, Value::Float(_) | Value::Integer(_)) => {
            format!("{:.1} LUFS", value.as_float().unwrap_or_default())
        }
        (_, Value::Boolean(value)) => format_boolean(*value).to_owned(),
        (_, value) => value.to_string(),
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
