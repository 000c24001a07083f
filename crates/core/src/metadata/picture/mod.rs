// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use bytes::Bytes;
use strum::{EnumIter, FromRepr};

use crate::{change::ChangeTrackingMap, prelude::*};

/// The `APIC` picture type code as defined by `ID3v2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, FromRepr, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PictureType {
    #[default]
    Other = 0x00,
    Icon = 0x01,
    OtherIcon = 0x02,
    CoverFront = 0x03,
    CoverBack = 0x04,
    Leaflet = 0x05,
    Media = 0x06,
    LeadArtist = 0x07,
    Artist = 0x08,
    Conductor = 0x09,
    Band = 0x0A,
    Composer = 0x0B,
    Lyricist = 0x0C,
    RecordingLocation = 0x0D,
    DuringRecording = 0x0E,
    DuringPerformance = 0x0F,
    ScreenCapture = 0x10,
    BrightFish = 0x11,
    Illustration = 0x12,
    BandLogo = 0x13,
    PublisherLogo = 0x14,
}

impl PictureType {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Unknown codes are mapped to [`PictureType::Other`].
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        Self::from_repr(code).unwrap_or_default()
    }
}

impl fmt::Display for PictureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PictureField {
    Type,
    Description,
    ImageData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PictureValue {
    Type(PictureType),
    Description(String),
    ImageData(Bytes),
}

/// An image embedded in the metadata, e.g. the front cover.
///
/// All properties are tracked for changes independently.
#[derive(Debug, Clone, Default)]
pub struct AttachedPicture {
    fields: ChangeTrackingMap<PictureField, PictureValue>,
}

impl AttachedPicture {
    /// Creates a picture in its saved state.
    #[must_use]
    pub fn new(
        picture_type: PictureType,
        description: Option<String>,
        image_data: impl Into<Bytes>,
    ) -> Self {
        let mut fields = vec![
            (PictureField::Type, PictureValue::Type(picture_type)),
            (
                PictureField::ImageData,
                PictureValue::ImageData(image_data.into()),
            ),
        ];
        if let Some(description) = description {
            fields.push((
                PictureField::Description,
                PictureValue::Description(description),
            ));
        }
        Self {
            fields: ChangeTrackingMap::from_base(fields),
        }
    }

    #[must_use]
    pub fn picture_type(&self) -> PictureType {
        match self.fields.get(&PictureField::Type) {
            Some(PictureValue::Type(picture_type)) => *picture_type,
            _ => PictureType::default(),
        }
    }

    pub fn set_picture_type(&mut self, picture_type: PictureType) {
        self.fields
            .insert(PictureField::Type, PictureValue::Type(picture_type));
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self.fields.get(&PictureField::Description) {
            Some(PictureValue::Description(description)) => Some(description),
            _ => None,
        }
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.fields.set(
            PictureField::Description,
            description.map(PictureValue::Description),
        );
    }

    #[must_use]
    pub fn image_data(&self) -> &[u8] {
        match self.fields.get(&PictureField::ImageData) {
            Some(PictureValue::ImageData(data)) => data,
            _ => &[],
        }
    }

    pub fn set_image_data(&mut self, image_data: impl Into<Bytes>) {
        self.fields.insert(
            PictureField::ImageData,
            PictureValue::ImageData(image_data.into()),
        );
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.fields.has_changes()
    }

    pub fn merge_changes(&mut self) {
        self.fields.merge_changes();
    }

    pub fn revert_changes(&mut self) {
        self.fields.revert_changes();
    }
}

/// Pictures are equal if their visible properties are equal.
impl PartialEq for AttachedPicture {
    fn eq(&self, other: &Self) -> bool {
        self.picture_type() == other.picture_type()
            && self.description() == other.description()
            && self.image_data() == other.image_data()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttachedPictureInvalidity {
    ImageDataEmpty,
}

impl Validate for AttachedPicture {
    type Invalidity = AttachedPictureInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        ValidationContext::new()
            .invalidate_if(
                self.image_data().is_empty(),
                Self::Invalidity::ImageDataEmpty,
            )
            .into()
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests;
