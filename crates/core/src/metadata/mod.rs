// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Normalized, format-independent metadata.

use std::collections::BTreeMap;

use bitflags::bitflags;
use strum::{EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use crate::{change::ChangeTrackingMap, prelude::*, util::parse_boolean};

pub mod picture;

mod value;

pub use self::value::Value;
use self::picture::{AttachedPicture, AttachedPictureInvalidity, PictureType};

bitflags! {
    /// Groups of related metadata keys.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct MetadataKind: u8 {
        const BASIC             = 0b0000_0001;
        const SORTING           = 0b0000_0010;
        const GROUPING          = 0b0000_0100;
        const ADDITIONAL        = 0b0000_1000;
        const REPLAY_GAIN       = 0b0001_0000;
        const ATTACHED_PICTURES = 0b0010_0000;
    }
}

impl Default for MetadataKind {
    fn default() -> Self {
        Self::all()
    }
}

/// The expected type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ValueType {
    /// Integers are accepted where floats are expected.
    #[must_use]
    pub const fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Text, Value::Text(_))
                | (Self::Integer, Value::Integer(_))
                | (Self::Float, Value::Float(_) | Value::Integer(_))
                | (Self::Boolean, Value::Boolean(_))
        )
    }
}

/// The normalized key vocabulary.
///
/// The string representation is stable and used for display and
/// serialization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, IntoStaticStr,
)]
pub enum MetadataKey {
    Title,
    AlbumTitle,
    Artist,
    AlbumArtist,
    Genre,
    Composer,
    ReleaseDate,
    Compilation,
    TrackNumber,
    TrackTotal,
    DiscNumber,
    DiscTotal,
    Lyrics,
    #[strum(serialize = "BPM")]
    Bpm,
    Rating,
    Comment,
    #[strum(serialize = "MCN")]
    Mcn,
    #[strum(serialize = "ISRC")]
    Isrc,
    #[strum(serialize = "MusicBrainzReleaseID")]
    MusicBrainzReleaseId,
    #[strum(serialize = "MusicBrainzRecordingID")]
    MusicBrainzRecordingId,
    TitleSortOrder,
    AlbumTitleSortOrder,
    ArtistSortOrder,
    AlbumArtistSortOrder,
    ComposerSortOrder,
    GenreSortOrder,
    Grouping,
    ReplayGainReferenceLoudness,
    ReplayGainTrackGain,
    ReplayGainTrackPeak,
    ReplayGainAlbumGain,
    ReplayGainAlbumPeak,
}

impl MetadataKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub const fn kind(self) -> MetadataKind {
        use MetadataKey::*;
        match self {
            TitleSortOrder | AlbumTitleSortOrder | ArtistSortOrder | AlbumArtistSortOrder
            | ComposerSortOrder | GenreSortOrder => MetadataKind::SORTING,
            Grouping => MetadataKind::GROUPING,
            ReplayGainReferenceLoudness
            | ReplayGainTrackGain
            | ReplayGainTrackPeak
            | ReplayGainAlbumGain
            | ReplayGainAlbumPeak => MetadataKind::REPLAY_GAIN,
            _ => MetadataKind::BASIC,
        }
    }

    #[must_use]
    pub const fn value_type(self) -> ValueType {
        use MetadataKey::*;
        match self {
            Compilation => ValueType::Boolean,
            TrackNumber | TrackTotal | DiscNumber | DiscTotal | Bpm | Rating => {
                ValueType::Integer
            }
            ReplayGainReferenceLoudness
            | ReplayGainTrackGain
            | ReplayGainTrackPeak
            | ReplayGainAlbumGain
            | ReplayGainAlbumPeak => ValueType::Float,
            _ => ValueType::Text,
        }
    }

    /// All keys that belong to any of the given kinds.
    pub fn of_kind(kinds: MetadataKind) -> impl Iterator<Item = Self> {
        Self::iter().filter(move |key| kinds.intersects(key.kind()))
    }

    /// Parses a plain textual value according to [`Self::value_type()`].
    ///
    /// Leading and trailing whitespace is ignored. Empty input yields
    /// `None`.
    #[must_use]
    pub fn parse_value(self, input: &str) -> Option<Value> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        match self.value_type() {
            ValueType::Text => Some(Value::Text(input.to_owned())),
            ValueType::Integer => input.parse().ok().map(Value::Integer),
            ValueType::Float => input
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Value::Float),
            ValueType::Boolean => parse_boolean(input).map(Value::Boolean),
        }
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PictureState {
    Saved,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
struct PictureEntry {
    picture: AttachedPicture,
    state: PictureState,
}

macro_rules! text_accessors {
    ($($key:ident => $get:ident, $set:ident;)+) => {
        $(
            #[must_use]
            pub fn $get(&self) -> Option<&str> {
                self.text(MetadataKey::$key)
            }

            pub fn $set(&mut self, value: Option<String>) {
                self.set(MetadataKey::$key, value.map(Value::Text));
            }
        )+
    };
}

macro_rules! integer_accessors {
    ($($key:ident => $get:ident, $set:ident;)+) => {
        $(
            #[must_use]
            pub fn $get(&self) -> Option<i64> {
                self.integer(MetadataKey::$key)
            }

            pub fn $set(&mut self, value: Option<i64>) {
                self.set(MetadataKey::$key, value.map(Value::Integer));
            }
        )+
    };
}

macro_rules! float_accessors {
    ($($key:ident => $get:ident, $set:ident;)+) => {
        $(
            #[must_use]
            pub fn $get(&self) -> Option<f64> {
                self.float(MetadataKey::$key)
            }

            pub fn $set(&mut self, value: Option<f64>) {
                self.set(MetadataKey::$key, value.map(Value::Float));
            }
        )+
    };
}

/// Metadata of a single audio file.
///
/// Edits are tracked until they are either merged after saving
/// or reverted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    fields: ChangeTrackingMap<MetadataKey, Value>,
    additional: ChangeTrackingMap<String, String>,
    pictures: Vec<PictureEntry>,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: MetadataKey) -> Option<&Value> {
        self.fields.get(&key)
    }

    /// Sets or removes a field.
    pub fn set(&mut self, key: MetadataKey, value: Option<Value>) {
        debug_assert!(
            value
                .as_ref()
                .is_none_or(|value| key.value_type().matches(value))
        );
        self.fields.set(key, value);
    }

    #[must_use]
    pub fn change_state(&self, key: MetadataKey) -> ChangeState<'_, Value> {
        self.fields.state(&key)
    }

    #[must_use]
    pub fn text(&self, key: MetadataKey) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn integer(&self, key: MetadataKey) -> Option<i64> {
        self.get(key).and_then(Value::as_integer)
    }

    #[must_use]
    pub fn float(&self, key: MetadataKey) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    #[must_use]
    pub fn boolean(&self, key: MetadataKey) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// All present fields ordered by key.
    pub fn fields(&self) -> impl Iterator<Item = (MetadataKey, &Value)> {
        let mut fields = self
            .fields
            .iter()
            .map(|(key, value)| (*key, value))
            .collect::<Vec<_>>();
        fields.sort_unstable_by_key(|(key, _)| *key);
        fields.into_iter()
    }

    text_accessors! {
        Title => title, set_title;
        AlbumTitle => album_title, set_album_title;
        Artist => artist, set_artist;
        AlbumArtist => album_artist, set_album_artist;
        Genre => genre, set_genre;
        Composer => composer, set_composer;
        ReleaseDate => release_date, set_release_date;
        Lyrics => lyrics, set_lyrics;
        Comment => comment, set_comment;
        Mcn => mcn, set_mcn;
        Isrc => isrc, set_isrc;
        MusicBrainzReleaseId => musicbrainz_release_id, set_musicbrainz_release_id;
        MusicBrainzRecordingId => musicbrainz_recording_id, set_musicbrainz_recording_id;
        TitleSortOrder => title_sort_order, set_title_sort_order;
        AlbumTitleSortOrder => album_title_sort_order, set_album_title_sort_order;
        ArtistSortOrder => artist_sort_order, set_artist_sort_order;
        AlbumArtistSortOrder => album_artist_sort_order, set_album_artist_sort_order;
        ComposerSortOrder => composer_sort_order, set_composer_sort_order;
        GenreSortOrder => genre_sort_order, set_genre_sort_order;
        Grouping => grouping, set_grouping;
    }

    integer_accessors! {
        TrackNumber => track_number, set_track_number;
        TrackTotal => track_total, set_track_total;
        DiscNumber => disc_number, set_disc_number;
        DiscTotal => disc_total, set_disc_total;
        Bpm => bpm, set_bpm;
        Rating => rating, set_rating;
    }

    float_accessors! {
        ReplayGainReferenceLoudness => replay_gain_reference_loudness, set_replay_gain_reference_loudness;
        ReplayGainTrackGain => replay_gain_track_gain, set_replay_gain_track_gain;
        ReplayGainTrackPeak => replay_gain_track_peak, set_replay_gain_track_peak;
        ReplayGainAlbumGain => replay_gain_album_gain, set_replay_gain_album_gain;
        ReplayGainAlbumPeak => replay_gain_album_peak, set_replay_gain_album_peak;
    }

    #[must_use]
    pub fn compilation(&self) -> Option<bool> {
        self.boolean(MetadataKey::Compilation)
    }

    pub fn set_compilation(&mut self, compilation: Option<bool>) {
        self.set(MetadataKey::Compilation, compilation.map(Value::Boolean));
    }

    /// Items without a normalized key, stored under their native names.
    #[must_use]
    pub fn additional_metadata(&self) -> &ChangeTrackingMap<String, String> {
        &self.additional
    }

    #[must_use]
    pub fn additional_value(&self, key: &str) -> Option<&str> {
        self.additional.get(key).map(String::as_str)
    }

    pub fn set_additional_value(&mut self, key: impl Into<String>, value: Option<String>) {
        self.additional.set(key.into(), value);
    }

    /// Replaces all additional items.
    pub fn set_additional_metadata(&mut self, additional: impl IntoIterator<Item = (String, String)>) {
        self.additional.clear();
        for (key, value) in additional {
            self.additional.insert(key, value);
        }
    }

    /// Pictures that are currently attached, including unsaved ones.
    pub fn attached_pictures(&self) -> impl Iterator<Item = &AttachedPicture> {
        self.pictures
            .iter()
            .filter(|entry| entry.state != PictureState::Removed)
            .map(|entry| &entry.picture)
    }

    pub fn attached_pictures_mut(&mut self) -> impl Iterator<Item = &mut AttachedPicture> {
        self.pictures
            .iter_mut()
            .filter(|entry| entry.state != PictureState::Removed)
            .map(|entry| &mut entry.picture)
    }

    pub fn attached_pictures_of_type(
        &self,
        picture_type: PictureType,
    ) -> impl Iterator<Item = &AttachedPicture> {
        self.attached_pictures()
            .filter(move |picture| picture.picture_type() == picture_type)
    }

    /// Attaches a picture.
    ///
    /// Re-attaching a saved picture that has been removed restores it.
    pub fn attach_picture(&mut self, picture: AttachedPicture) {
        if let Some(entry) = self
            .pictures
            .iter_mut()
            .find(|entry| entry.state == PictureState::Removed && entry.picture == picture)
        {
            entry.state = PictureState::Saved;
            return;
        }
        self.pictures.push(PictureEntry {
            picture,
            state: PictureState::Added,
        });
    }

    /// Removes the first attached picture that equals the given one.
    ///
    /// Returns `false` if no such picture is attached.
    pub fn remove_attached_picture(&mut self, picture: &AttachedPicture) -> bool {
        let Some(index) = self
            .pictures
            .iter()
            .position(|entry| entry.state != PictureState::Removed && entry.picture == *picture)
        else {
            return false;
        };
        self.remove_picture_at(index);
        true
    }

    pub fn remove_attached_pictures_of_type(&mut self, picture_type: PictureType) {
        self.remove_pictures_where(|picture| picture.picture_type() == picture_type);
    }

    pub fn remove_all_attached_pictures(&mut self) {
        self.remove_pictures_where(|_| true);
    }

    fn remove_pictures_where(&mut self, mut predicate: impl FnMut(&AttachedPicture) -> bool) {
        self.pictures.retain_mut(|entry| {
            if entry.state == PictureState::Removed || !predicate(&entry.picture) {
                return true;
            }
            match entry.state {
                PictureState::Added => false,
                PictureState::Saved | PictureState::Removed => {
                    entry.state = PictureState::Removed;
                    true
                }
            }
        });
    }

    fn remove_picture_at(&mut self, index: usize) {
        if self.pictures[index].state == PictureState::Added {
            self.pictures.remove(index);
        } else {
            self.pictures[index].state = PictureState::Removed;
        }
    }

    /// Copies all fields of the given kinds from `other`.
    ///
    /// Fields that are missing in `other` are removed.
    pub fn copy_metadata_of_kind(&mut self, other: &Self, kinds: MetadataKind) {
        for key in MetadataKey::of_kind(kinds) {
            self.set(key, other.get(key).cloned());
        }
        if kinds.contains(MetadataKind::ADDITIONAL) {
            self.set_additional_metadata(
                other
                    .additional
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }
        if kinds.contains(MetadataKind::ATTACHED_PICTURES) {
            self.remove_all_attached_pictures();
            for picture in other.attached_pictures() {
                self.attach_picture(picture.clone());
            }
        }
    }

    pub fn remove_metadata_of_kind(&mut self, kinds: MetadataKind) {
        for key in MetadataKey::of_kind(kinds) {
            self.set(key, None);
        }
        if kinds.contains(MetadataKind::ADDITIONAL) {
            self.additional.clear();
        }
        if kinds.contains(MetadataKind::ATTACHED_PICTURES) {
            self.remove_all_attached_pictures();
        }
    }

    pub fn copy_from(&mut self, other: &Self) {
        self.copy_metadata_of_kind(other, MetadataKind::all());
    }

    pub fn clear(&mut self) {
        self.remove_metadata_of_kind(MetadataKind::all());
    }

    /// Checks if pictures have been attached, removed or modified.
    #[must_use]
    pub fn has_picture_changes(&self) -> bool {
        self.pictures
            .iter()
            .any(|entry| entry.state != PictureState::Saved || entry.picture.has_changes())
    }

    #[must_use]
    pub fn has_unmerged_changes(&self) -> bool {
        self.fields.has_changes() || self.additional.has_changes() || self.has_picture_changes()
    }

    /// Accepts all pending changes as the new saved state.
    pub fn merge_changes(&mut self) {
        self.fields.merge_changes();
        self.additional.merge_changes();
        self.pictures
            .retain(|entry| entry.state != PictureState::Removed);
        for entry in &mut self.pictures {
            entry.state = PictureState::Saved;
            entry.picture.merge_changes();
        }
    }

    /// Discards all pending changes.
    pub fn revert_changes(&mut self) {
        self.fields.revert_changes();
        self.additional.revert_changes();
        self.pictures.retain(|entry| entry.state != PictureState::Added);
        for entry in &mut self.pictures {
            entry.state = PictureState::Saved;
            entry.picture.revert_changes();
        }
    }

    /// A flat view of all fields keyed by their normalized names.
    #[must_use]
    pub fn to_dictionary(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str().to_owned(), value.clone()))
            .collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetadataInvalidity {
    ValueType(MetadataKey),
    NumberNegative(MetadataKey),
    TrackNumberExceedsTotal,
    DiscNumberExceedsTotal,
    ReplayGainPeakNegative(MetadataKey),
    AttachedPicture(AttachedPictureInvalidity),
}

fn number_exceeds_total(number: Option<i64>, total: Option<i64>) -> bool {
    match (number, total) {
        (Some(number), Some(total)) => number > total,
        _ => false,
    }
}

impl Validate for Metadata {
    type Invalidity = MetadataInvalidity;

    fn validate(&self) -> ValidationResult<Self::Invalidity> {
        let mut context = ValidationContext::new();
        for (key, value) in self.fields() {
            context = context
                .invalidate_if(
                    !key.value_type().matches(value),
                    Self::Invalidity::ValueType(key),
                )
                .invalidate_if(
                    value.as_integer().is_some_and(|number| number < 0),
                    Self::Invalidity::NumberNegative(key),
                )
                .invalidate_if(
                    matches!(
                        key,
                        MetadataKey::ReplayGainTrackPeak | MetadataKey::ReplayGainAlbumPeak
                    ) && value.as_float().is_some_and(|peak| peak < 0.0),
                    Self::Invalidity::ReplayGainPeakNegative(key),
                );
        }
        context = context
            .invalidate_if(
                number_exceeds_total(self.track_number(), self.track_total()),
                Self::Invalidity::TrackNumberExceedsTotal,
            )
            .invalidate_if(
                number_exceeds_total(self.disc_number(), self.disc_total()),
                Self::Invalidity::DiscNumberExceedsTotal,
            );
        for picture in self.attached_pictures() {
            context = context.validate_with(picture, Self::Invalidity::AttachedPicture);
        }
        context.into()
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
