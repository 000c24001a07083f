// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use lofty::id3::v2::{
    ExtendedTextFrame, Frame, Id3v2Tag, PopularimeterFrame, UniqueFileIdentifierFrame,
};

use tonetag_core::{Metadata, MetadataKey, Value};

use crate::{
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Importer},
    },
    util::format_value,
};

/// Fields that are stored in `TXXX` frames without a generic item.
const USER_TEXT_KEYS: [MetadataKey; 2] = [
    MetadataKey::GenreSortOrder,
    MetadataKey::ReplayGainReferenceLoudness,
];

const MUSICBRAINZ_UFID_OWNER: &str = "http://musicbrainz.org";

fn user_text_description(key: MetadataKey) -> &'static str {
    super::native_field_name(key).unwrap_or_else(|| key.as_str())
}

pub(super) fn is_managed_user_text(name: &str) -> bool {
    let description = name.strip_prefix("TXXX:").unwrap_or(name);
    USER_TEXT_KEYS
        .iter()
        .any(|key| user_text_description(*key).eq_ignore_ascii_case(description))
}

fn find_user_text<'a>(tag: &'a Id3v2Tag, description: &str) -> Option<&'a str> {
    tag.into_iter().find_map(|frame| match frame {
        Frame::UserText(ExtendedTextFrame { content, .. }) if is_user_text(frame, description) => {
            Some(content.as_str())
        }
        _ => None,
    })
}

fn is_user_text(frame: &Frame<'_>, description: &str) -> bool {
    matches!(frame, Frame::UserText(text) if text.description.eq_ignore_ascii_case(description))
}

fn is_musicbrainz_ufid(frame: &Frame<'_>) -> bool {
    matches!(frame, Frame::UniqueFileIdentifier(ufid) if ufid.owner == MUSICBRAINZ_UFID_OWNER)
}

#[derive(Debug, Default)]
pub(super) struct Import {
    values: Vec<(MetadataKey, Value)>,
}

impl Import {
    pub(super) fn build(importer: &mut Importer, config: &ImportConfig, tag: &Id3v2Tag) -> Self {
        debug_assert!(config.flags.contains(ImportFlags::METADATA));
        let mut values = USER_TEXT_KEYS
            .into_iter()
            .filter_map(|key| {
                let input = find_user_text(tag, user_text_description(key))?;
                let value = importer.import_value(key, input)?;
                Some((key, value))
            })
            .collect::<Vec<_>>();
        // Only the first rating is considered
        if let Some(rating) = tag.into_iter().find_map(|frame| match frame {
            Frame::Popularimeter(popularimeter) => Some(popularimeter.rating),
            _ => None,
        }) {
            values.push((MetadataKey::Rating, Value::Integer(rating.into())));
        }
        if let Some(recording_id) = tag.into_iter().find_map(|frame| match frame {
            Frame::UniqueFileIdentifier(ufid) if ufid.owner == MUSICBRAINZ_UFID_OWNER => {
                Some(String::from_utf8_lossy(&ufid.identifier))
            }
            _ => None,
        }) {
            let key = MetadataKey::MusicBrainzRecordingId;
            if let Some(value) = importer.import_value(key, &recording_id) {
                values.push((key, value));
            }
        }
        Self { values }
    }

    pub(super) fn finish(self, metadata: &mut Metadata) {
        let Self { values } = self;
        for (key, value) in values {
            metadata.set(key, Some(value));
        }
    }
}

/// Exports metadata into the tag.
///
/// Returns the names of all fields and additional items that could
/// not be stored.
#[must_use]
pub(crate) fn export_metadata_to_tag(
    tag: &mut Id3v2Tag,
    config: &ExportConfig,
    metadata: &Metadata,
) -> Vec<String> {
    let (merged, mut rejected) =
        super::split_export_merge_metadata_to_tag(std::mem::take(tag), config, metadata);
    *tag = merged;

    // Post-processing: Export fields without a generic item
    for key in USER_TEXT_KEYS {
        let description = user_text_description(key);
        tag.retain(|frame| !is_user_text(frame, description));
        if let Some(value) = metadata.get(key) {
            tag.insert_user_text(description.to_owned(), format_value(key, value));
        }
    }

    tag.retain(|frame| !matches!(frame, Frame::Popularimeter(_)));
    if let Some(rating) = metadata.rating() {
        if let Ok(rating) = u8::try_from(rating) {
            tag.insert(Frame::Popularimeter(PopularimeterFrame::new(
                String::new(),
                rating,
                0,
            )));
        } else {
            rejected.push(MetadataKey::Rating.to_string());
        }
    }

    // Identifiers of other owners are preserved
    tag.retain(|frame| !is_musicbrainz_ufid(frame));
    if let Some(recording_id) = metadata.musicbrainz_recording_id() {
        tag.insert(Frame::UniqueFileIdentifier(UniqueFileIdentifierFrame::new(
            MUSICBRAINZ_UFID_OWNER.to_owned(),
            recording_id.as_bytes().to_vec(),
        )));
    }

    rejected
}
