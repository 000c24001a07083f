// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use bitflags::bitflags;
use semval::Validate as _;

use tonetag_core::{AudioProperties, Metadata, MetadataKey, Value, util::parse_boolean};

use crate::util::{parse_reference_loudness, parse_replay_gain_db, trim_readable};

#[rustfmt::skip]
bitflags! {
    /// Flags for controlling the import
    ///
    /// It is recommended to enable all for maximum information.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ImportFlags: u8 {
        /// Import audio properties like the duration or sample rate
        const PROPERTIES = 0b0000_0001;

        /// Import all fields with a normalized key
        const METADATA   = 0b0000_0010;

        /// Import embedded pictures
        const PICTURES   = 0b0000_0100;

        /// Preserve unmapped text items under their native names
        const ADDITIONAL = 0b0000_1000;
    }
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportConfig {
    pub flags: ImportFlags,
}

/// Recoverable errors and warnings
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Issues {
    messages: Vec<String>,
}

impl Issues {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        let Self { messages } = self;
        messages.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let Self { messages } = self;
        messages.len()
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug_assert!(!message.trim().is_empty());
        self.messages.push(message);
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<String> {
        let Self { messages } = self;
        messages
    }
}

/// The outcome of reading a file.
///
/// The metadata has no pending changes.
#[derive(Debug, Clone, Default)]
pub struct Imported {
    pub properties: AudioProperties,
    pub metadata: Metadata,
    pub issues: Issues,
}

#[derive(Debug, Default)]
pub(crate) struct Importer {
    issues: Issues,
}

impl Importer {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            issues: Issues::new(),
        }
    }

    pub(crate) fn add_issue(&mut self, message: impl Into<String>) {
        self.issues.add_message(message);
    }

    #[must_use]
    pub(crate) fn finish(self) -> Issues {
        let Self { issues } = self;
        issues
    }

    /// Accepts the imported metadata as saved state.
    #[must_use]
    pub(crate) fn finish_import(
        mut self,
        properties: AudioProperties,
        mut metadata: Metadata,
    ) -> Imported {
        if let Err(err) = properties.validate() {
            self.add_issue(format!("Invalid audio properties: {err:?}"));
        }
        metadata.merge_changes();
        Imported {
            properties,
            metadata,
            issues: self.finish(),
        }
    }

    /// Parses the textual value of a native item.
    ///
    /// Empty input is silently ignored. Unparseable input is reported
    /// as an issue.
    #[must_use]
    pub(crate) fn import_value(&mut self, key: MetadataKey, input: &str) -> Option<Value> {
        let input = trim_readable(input);
        if input.is_empty() {
            return None;
        }
        match key {
            MetadataKey::ReplayGainTrackGain | MetadataKey::ReplayGainAlbumGain => {
                self.import_replay_gain(key, input).map(Value::Float)
            }
            MetadataKey::ReplayGainTrackPeak | MetadataKey::ReplayGainAlbumPeak => {
                self.import_replay_gain_peak(key, input).map(Value::Float)
            }
            MetadataKey::ReplayGainReferenceLoudness => {
                self.import_reference_loudness(input).map(Value::Float)
            }
            MetadataKey::TrackNumber
            | MetadataKey::TrackTotal
            | MetadataKey::DiscNumber
            | MetadataKey::DiscTotal => self.import_number(key, input).map(Value::Integer),
            MetadataKey::Bpm => self.import_bpm(input).map(Value::Integer),
            MetadataKey::Compilation => {
                let flag = parse_boolean(input);
                if flag.is_none() {
                    self.add_issue(format!("Failed to parse {key} from input '{input}'"));
                }
                flag.map(Value::Boolean)
            }
            _ => {
                let value = key.parse_value(input);
                if value.is_none() {
                    self.add_issue(format!("Failed to parse {key} from input '{input}'"));
                }
                value
            }
        }
    }

    /// Accepts both `n` and `n/total`.
    fn import_number(&mut self, key: MetadataKey, input: &str) -> Option<i64> {
        let number_input = input.split('/').next().unwrap_or(input).trim();
        match number_input.parse::<i64>() {
            Ok(number) if number >= 0 => Some(number),
            Ok(number) => {
                self.add_issue(format!("Invalid {key} parsed from input '{input}': {number}"));
                None
            }
            Err(err) => {
                self.add_issue(format!("Failed to parse {key} from input '{input}': {err}"));
                None
            }
        }
    }

    /// Fractional tempos are rounded.
    fn import_bpm(&mut self, input: &str) -> Option<i64> {
        match input.parse::<f64>() {
            Ok(bpm) if bpm.is_finite() && bpm > 0.0 => {
                let rounded = bpm.round() as i64;
                if bpm.fract() != 0.0 {
                    log::debug!("Rounded fractional tempo from input '{input}' to {rounded} BPM");
                }
                Some(rounded)
            }
            Ok(bpm) => {
                // The value 0 is often used for an unknown bpm.
                // Silently ignore this special value to prevent log spam.
                if bpm != 0.0 {
                    self.add_issue(format!("Invalid tempo parsed from input '{input}': {bpm}"));
                }
                None
            }
            Err(err) => {
                self.add_issue(format!(
                    "Failed to parse tempo (BPM) from input '{input}': {err}"
                ));
                None
            }
        }
    }

    fn import_replay_gain(&mut self, key: MetadataKey, input: &str) -> Option<f64> {
        match parse_replay_gain_db(input) {
            Ok((remainder, gain_db)) => {
                if !remainder.is_empty() {
                    self.add_issue(format!(
                        "Unexpected remainder '{remainder}' after parsing {key} from input \
                         '{input}'"
                    ));
                }
                if !gain_db.is_finite() {
                    self.add_issue(format!("Invalid {key} parsed from input '{input}'"));
                    return None;
                }
                log::debug!("Parsed {key} from input '{input}': {gain_db} dB");
                Some(gain_db)
            }
            Err(err) => {
                self.add_issue(format!(
                    "Failed to parse {key} (dB) from input '{input}': {err}"
                ));
                None
            }
        }
    }

    fn import_replay_gain_peak(&mut self, key: MetadataKey, input: &str) -> Option<f64> {
        match input.parse::<f64>() {
            Ok(peak) if peak.is_finite() && peak >= 0.0 => Some(peak),
            Ok(peak) => {
                self.add_issue(format!("Invalid {key} parsed from input '{input}': {peak}"));
                None
            }
            Err(err) => {
                self.add_issue(format!("Failed to parse {key} from input '{input}': {err}"));
                None
            }
        }
    }

    fn import_reference_loudness(&mut self, input: &str) -> Option<f64> {
        match parse_reference_loudness(input) {
            Ok(("", loudness)) if loudness.is_finite() => Some(loudness),
            Ok((remainder, _)) if !remainder.is_empty() => {
                self.add_issue(format!(
                    "Unexpected remainder '{remainder}' after parsing reference loudness from \
                     input '{input}'"
                ));
                None
            }
            Ok(_) => {
                self.add_issue(format!("Invalid reference loudness from input '{input}'"));
                None
            }
            Err(err) => {
                self.add_issue(format!(
                    "Failed to parse reference loudness from input '{input}': {err}"
                ));
                None
            }
        }
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests;
