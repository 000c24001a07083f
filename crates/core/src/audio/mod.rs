// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::BTreeMap, time::Duration};

use crate::prelude::*;

/// Technical properties of the audio stream.
///
/// All fields are optional, because not every container provides them.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AudioProperties {
    /// Human readable name of the encoding, e.g. "FLAC" or "DSD".
    pub format_name: Option<String>,

    /// Number of sample frames.
    pub total_frames: Option<u64>,

    pub channel_count: Option<u16>,

    /// Bit depth of lossless or PCM encodings.
    pub bits_per_channel: Option<u16>,

    pub sample_rate_hz: Option<u32>,

    pub duration_secs: Option<f64>,

    /// Average bitrate in kbit/s.
    pub bitrate_kbps: Option<u32>,
}

impl AudioProperties {
    pub const FORMAT_NAME_KEY: &'static str = "FormatName";
    pub const TOTAL_FRAMES_KEY: &'static str = "TotalFrames";
    pub const CHANNEL_COUNT_KEY: &'static str = "ChannelCount";
    pub const BITS_PER_CHANNEL_KEY: &'static str = "BitsPerChannel";
    pub const SAMPLE_RATE_KEY: &'static str = "SampleRate";
    pub const DURATION_KEY: &'static str = "Duration";
    pub const BITRATE_KEY: &'static str = "Bitrate";

    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }

    pub fn set_duration(&mut self, duration: Option<Duration>) {
        self.duration_secs = duration.map(|duration| duration.as_secs_f64());
    }

    /// Derives the duration from the number of frames and the sample
    /// rate if missing.
    pub fn complete_duration(&mut self) {
        if self.duration_secs.is_some() {
            return;
        }
        let (Some(total_frames), Some(sample_rate_hz)) = (self.total_frames, self.sample_rate_hz)
        else {
            return;
        };
        if sample_rate_hz == 0 {
            return;
        }
        let duration_secs = total_frames as f64 / f64::from(sample_rate_hz);
        self.duration_secs = Some(duration_secs);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A flat view of all present properties.
    #[must_use]
    pub fn to_dictionary(&self) -> BTreeMap<String, Value> {
        let Self {
            format_name,
            total_frames,
            channel_count,
            bits_per_channel,
            sample_rate_hz,
            duration_secs,
            bitrate_kbps,
        } = self;
        let mut dictionary = BTreeMap::new();
        if let Some(format_name) = format_name {
            dictionary.insert(Self::FORMAT_NAME_KEY.to_owned(), Value::from(format_name.as_str()));
        }
        if let Some(total_frames) = total_frames.and_then(|frames| i64::try_from(frames).ok()) {
            dictionary.insert(Self::TOTAL_FRAMES_KEY.to_owned(), Value::Integer(total_frames));
        }
        if let Some(channel_count) = channel_count {
            dictionary.insert(
                Self::CHANNEL_COUNT_KEY.to_owned(),
                Value::Integer((*channel_count).into()),
            );
        }
        if let Some(bits_per_channel) = bits_per_channel {
            dictionary.insert(
                Self::BITS_PER_CHANNEL_KEY.to_owned(),
                Value::Integer((*bits_per_channel).into()),
            );
        }
        if let Some(sample_rate_hz) = sample_rate_hz {
            dictionary.insert(Self::SAMPLE_RATE_KEY.to_owned(), Value::from(*sample_rate_hz));
        }
        if let Some(duration_secs) = duration_secs {
            dictionary.insert(Self::DURATION_KEY.to_owned(), Value::Float(*duration_secs));
        }
        if let Some(bitrate_kbps) = bitrate_kbps {
            dictionary.insert(Self::BITRATE_KEY.to_owned(), Value::from(*bitrate_kbps));
        }
        dictionary
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AudioPropertiesInvalidity {
    ChannelCountZero,
    SampleRateZero,
    DurationOutOfRange,
}

impl Validate for AudioProperties {
    type Invalidity = AudioPropertiesInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.channel_count == Some(0),
                Self::Invalidity::ChannelCountZero,
            )
            .invalidate_if(
                self.sample_rate_hz == Some(0),
                Self::Invalidity::SampleRateZero,
            )
            .invalidate_if(
                self.duration_secs
                    .is_some_and(|secs| !secs.is_finite() || secs < 0.0),
                Self::Invalidity::DurationOutOfRange,
            )
            .into()
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
