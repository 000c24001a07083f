// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Standalone `ID3v2` tags, used for containers that lofty cannot write.

use std::{
    io::{Read, Seek},
    path::Path,
};

use id3::{
    Tag, TagLike as _, Version,
    frame::{
        Comment, Content, ExtendedText, Frame, Lyrics, Picture as Id3Picture,
        PictureType as Id3PictureType, Popularimeter, UniqueFileIdentifier,
    },
};

use tonetag_core::{AttachedPicture, Metadata, MetadataKey, PictureType, Value};

use super::FileFormat;
use crate::{
    Error, Result,
    io::{
        export::{ExportConfig, ExportFlags},
        import::{ImportConfig, ImportFlags, Importer},
    },
    util::{format_value, picture::mime_type_of},
};

const TEXT_FRAMES: [(MetadataKey, &str); 16] = [
    (MetadataKey::Title, "TIT2"),
    (MetadataKey::AlbumTitle, "TALB"),
    (MetadataKey::Artist, "TPE1"),
    (MetadataKey::AlbumArtist, "TPE2"),
    (MetadataKey::Genre, "TCON"),
    (MetadataKey::Composer, "TCOM"),
    (MetadataKey::ReleaseDate, "TDRC"),
    (MetadataKey::Compilation, "TCMP"),
    (MetadataKey::Bpm, "TBPM"),
    (MetadataKey::Isrc, "TSRC"),
    (MetadataKey::TitleSortOrder, "TSOT"),
    (MetadataKey::AlbumTitleSortOrder, "TSOA"),
    (MetadataKey::ArtistSortOrder, "TSOP"),
    (MetadataKey::AlbumArtistSortOrder, "TSO2"),
    (MetadataKey::ComposerSortOrder, "TSOC"),
    (MetadataKey::Grouping, "TIT1"),
];

/// `TXXX` descriptions
const USER_TEXTS: [(MetadataKey, &str); 8] = [
    (MetadataKey::Mcn, "BARCODE"),
    (MetadataKey::MusicBrainzReleaseId, "MusicBrainz Album Id"),
    (MetadataKey::GenreSortOrder, "GENRESORT"),
    (
        MetadataKey::ReplayGainReferenceLoudness,
        "REPLAYGAIN_REFERENCE_LOUDNESS",
    ),
    (MetadataKey::ReplayGainTrackGain, "REPLAYGAIN_TRACK_GAIN"),
    (MetadataKey::ReplayGainTrackPeak, "REPLAYGAIN_TRACK_PEAK"),
    (MetadataKey::ReplayGainAlbumGain, "REPLAYGAIN_ALBUM_GAIN"),
    (MetadataKey::ReplayGainAlbumPeak, "REPLAYGAIN_ALBUM_PEAK"),
];

/// Frames that are managed without a normalized text mapping.
const SPECIAL_FRAMES: [&str; 6] = ["TRCK", "TPOS", "USLT", "COMM", "POPM", "UFID"];

const MUSICBRAINZ_UFID_OWNER: &str = "http://musicbrainz.org";

const DEFAULT_LANG: &str = "eng";

fn is_managed_text_frame(id: &str) -> bool {
    TEXT_FRAMES.iter().any(|(_, frame_id)| *frame_id == id) || SPECIAL_FRAMES.contains(&id)
}

fn is_managed_user_text(description: &str) -> bool {
    USER_TEXTS
        .iter()
        .any(|(_, managed)| managed.eq_ignore_ascii_case(description))
}

/// Text frames are identified by 4 upper-case letters or digits.
fn is_text_frame_id(name: &str) -> bool {
    name.len() == 4
        && name.starts_with('T')
        && name != "TXXX"
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Reads a tag from the current position.
///
/// Returns `None` if no tag is found.
pub(crate) fn read_tag(
    path: &Path,
    format: FileFormat,
    reader: impl Read + Seek,
) -> Result<Option<Tag>> {
    match Tag::read_from2(reader) {
        Ok(tag) => Ok(Some(tag)),
        Err(id3::Error {
            kind: id3::ErrorKind::NoTag,
            ..
        }) => Ok(None),
        Err(err) => Err(Error::from_id3(path, format, err)),
    }
}

pub(crate) fn encode_tag(path: &Path, format: FileFormat, tag: &Tag) -> Result<Vec<u8>> {
    let mut encoded = Vec::new();
    tag.write_to(&mut encoded, Version::Id3v24)
        .map_err(|err| Error::from_id3(path, format, err))?;
    Ok(encoded)
}

fn import_picture_type(picture_type: Id3PictureType) -> PictureType {
    match picture_type {
        Id3PictureType::Other => PictureType::Other,
        Id3PictureType::Icon => PictureType::Icon,
        Id3PictureType::OtherIcon => PictureType::OtherIcon,
        Id3PictureType::CoverFront => PictureType::CoverFront,
        Id3PictureType::CoverBack => PictureType::CoverBack,
        Id3PictureType::Leaflet => PictureType::Leaflet,
        Id3PictureType::Media => PictureType::Media,
        Id3PictureType::LeadArtist => PictureType::LeadArtist,
        Id3PictureType::Artist => PictureType::Artist,
        Id3PictureType::Conductor => PictureType::Conductor,
        Id3PictureType::Band => PictureType::Band,
        Id3PictureType::Composer => PictureType::Composer,
        Id3PictureType::Lyricist => PictureType::Lyricist,
        Id3PictureType::RecordingLocation => PictureType::RecordingLocation,
        Id3PictureType::DuringRecording => PictureType::DuringRecording,
        Id3PictureType::DuringPerformance => PictureType::DuringPerformance,
        Id3PictureType::ScreenCapture => PictureType::ScreenCapture,
        Id3PictureType::BrightFish => PictureType::BrightFish,
        Id3PictureType::Illustration => PictureType::Illustration,
        Id3PictureType::BandLogo => PictureType::BandLogo,
        Id3PictureType::PublisherLogo => PictureType::PublisherLogo,
        Id3PictureType::Undefined(code) => PictureType::from_code(code),
    }
}

const fn export_picture_type(picture_type: PictureType) -> Id3PictureType {
    match picture_type {
        PictureType::Other => Id3PictureType::Other,
        PictureType::Icon => Id3PictureType::Icon,
        PictureType::OtherIcon => Id3PictureType::OtherIcon,
        PictureType::CoverFront => Id3PictureType::CoverFront,
        PictureType::CoverBack => Id3PictureType::CoverBack,
        PictureType::Leaflet => Id3PictureType::Leaflet,
        PictureType::Media => Id3PictureType::Media,
        PictureType::LeadArtist => Id3PictureType::LeadArtist,
        PictureType::Artist => Id3PictureType::Artist,
        PictureType::Conductor => Id3PictureType::Conductor,
        PictureType::Band => Id3PictureType::Band,
        PictureType::Composer => Id3PictureType::Composer,
        PictureType::Lyricist => Id3PictureType::Lyricist,
        PictureType::RecordingLocation => Id3PictureType::RecordingLocation,
        PictureType::DuringRecording => Id3PictureType::DuringRecording,
        PictureType::DuringPerformance => Id3PictureType::DuringPerformance,
        PictureType::ScreenCapture => Id3PictureType::ScreenCapture,
        PictureType::BrightFish => Id3PictureType::BrightFish,
        PictureType::Illustration => Id3PictureType::Illustration,
        PictureType::BandLogo => Id3PictureType::BandLogo,
        PictureType::PublisherLogo => Id3PictureType::PublisherLogo,
    }
}

fn import_text_value(
    importer: &mut Importer,
    metadata: &mut Metadata,
    key: MetadataKey,
    input: Option<&str>,
) {
    if let Some(value) = input.and_then(|input| importer.import_value(key, input)) {
        metadata.set(key, Some(value));
    }
}

fn import_number(metadata: &mut Metadata, key: MetadataKey, number: Option<u32>) {
    if let Some(number) = number {
        metadata.set(key, Some(Value::Integer(number.into())));
    }
}

/// Imports the contents of a tag.
///
/// The caller is responsible for merging the changes.
pub(crate) fn import_tag(
    importer: &mut Importer,
    config: &ImportConfig,
    tag: &Tag,
    metadata: &mut Metadata,
) {
    if config.flags.contains(ImportFlags::METADATA) {
        for (key, frame_id) in TEXT_FRAMES {
            let input = tag.get(frame_id).and_then(|frame| frame.content().text());
            import_text_value(importer, metadata, key, input);
        }
        for (key, description) in USER_TEXTS {
            let input = tag
                .extended_texts()
                .find(|text| text.description.eq_ignore_ascii_case(description))
                .map(|text| text.value.as_str());
            import_text_value(importer, metadata, key, input);
        }
        import_number(metadata, MetadataKey::TrackNumber, tag.track());
        import_number(metadata, MetadataKey::TrackTotal, tag.total_tracks());
        import_number(metadata, MetadataKey::DiscNumber, tag.disc());
        import_number(metadata, MetadataKey::DiscTotal, tag.total_discs());
        let lyrics = tag.lyrics().next().map(|lyrics| lyrics.text.as_str());
        import_text_value(importer, metadata, MetadataKey::Lyrics, lyrics);
        // Comments with a description belong to other applications
        let comment = tag
            .comments()
            .find(|comment| comment.description.is_empty())
            .map(|comment| comment.text.as_str());
        import_text_value(importer, metadata, MetadataKey::Comment, comment);
        for frame in tag.frames() {
            match frame.content() {
                Content::Popularimeter(popularimeter) => {
                    if metadata.rating().is_none() {
                        metadata.set_rating(Some(popularimeter.rating.into()));
                    }
                }
                Content::UniqueFileIdentifier(ufid)
                    if ufid.owner_identifier == MUSICBRAINZ_UFID_OWNER =>
                {
                    let input = String::from_utf8_lossy(&ufid.identifier);
                    import_text_value(
                        importer,
                        metadata,
                        MetadataKey::MusicBrainzRecordingId,
                        Some(&input),
                    );
                }
                _ => (),
            }
        }
    }
    if config.flags.contains(ImportFlags::ADDITIONAL) {
        for frame in tag.frames() {
            let (name, value) = match frame.content() {
                Content::ExtendedText(text) if !is_managed_user_text(&text.description) => {
                    (text.description.as_str(), text.value.as_str())
                }
                Content::Text(text)
                    if is_text_frame_id(frame.id()) && !is_managed_text_frame(frame.id()) =>
                {
                    (frame.id(), text.as_str())
                }
                _ => continue,
            };
            if metadata.additional_value(name).is_some() {
                importer.add_issue(format!("Ignoring duplicate value of {name}"));
                continue;
            }
            metadata.set_additional_value(name, Some(value.to_owned()));
        }
    }
    if config.flags.contains(ImportFlags::PICTURES) {
        for picture in tag.pictures() {
            if picture.data.is_empty() {
                importer.add_issue("Ignoring picture without image data");
                continue;
            }
            metadata.attach_picture(AttachedPicture::new(
                import_picture_type(picture.picture_type),
                Some(picture.description.clone()).filter(|description| !description.is_empty()),
                picture.data.clone(),
            ));
        }
    }
}

/// Removes all `TXXX` frames whose description matches regardless of case.
fn remove_extended_texts_ignoring_case(tag: &mut Tag, description: &str) {
    let stored_descriptions = tag
        .extended_texts()
        .filter(|text| text.description.eq_ignore_ascii_case(description))
        .map(|text| text.description.clone())
        .collect::<Vec<_>>();
    for stored_description in stored_descriptions {
        tag.remove_extended_text(Some(&stored_description), None);
    }
}

fn export_number(key: MetadataKey, metadata: &Metadata) -> Option<u32> {
    let number = metadata.integer(key)?;
    let exported = u32::try_from(number).ok();
    if exported.is_none() {
        log::warn!("Cannot export {key} {number} out of range");
    }
    exported
}

#[allow(clippy::too_many_lines)]
pub(crate) fn export_metadata_to_tag(tag: &mut Tag, config: &ExportConfig, metadata: &Metadata) {
    for (key, frame_id) in TEXT_FRAMES {
        if let Some(value) = metadata.get(key) {
            tag.set_text(frame_id, format_value(key, value));
        } else {
            drop(tag.remove(frame_id));
        }
    }
    for (key, description) in USER_TEXTS {
        remove_extended_texts_ignoring_case(tag, description);
        if let Some(value) = metadata.get(key) {
            tag.add_frame(ExtendedText {
                description: description.to_owned(),
                value: format_value(key, value),
            });
        }
    }

    if let Some(track_number) = export_number(MetadataKey::TrackNumber, metadata) {
        tag.set_track(track_number);
    } else {
        tag.remove_track();
    }
    if let Some(track_total) = export_number(MetadataKey::TrackTotal, metadata) {
        tag.set_total_tracks(track_total);
    } else {
        tag.remove_total_tracks();
    }
    if let Some(disc_number) = export_number(MetadataKey::DiscNumber, metadata) {
        tag.set_disc(disc_number);
    } else {
        tag.remove_disc();
    }
    if let Some(disc_total) = export_number(MetadataKey::DiscTotal, metadata) {
        tag.set_total_discs(disc_total);
    } else {
        tag.remove_total_discs();
    }

    tag.remove_all_lyrics();
    if let Some(lyrics) = metadata.lyrics() {
        tag.add_frame(Lyrics {
            lang: DEFAULT_LANG.to_owned(),
            description: String::new(),
            text: lyrics.to_owned(),
        });
    }
    tag.remove_comment(Some(""), None);
    if let Some(comment) = metadata.comment() {
        tag.add_frame(Comment {
            lang: DEFAULT_LANG.to_owned(),
            description: String::new(),
            text: comment.to_owned(),
        });
    }

    drop(tag.remove("POPM"));
    if let Some(rating) = metadata.rating() {
        if let Ok(rating) = u8::try_from(rating) {
            tag.add_frame(Popularimeter {
                user: String::new(),
                rating,
                counter: 0,
            });
        } else {
            log::warn!("Cannot export rating {rating} out of range");
        }
    }

    // Preserve identifiers of other owners
    let other_ufids = tag
        .frames()
        .filter_map(|frame| match frame.content() {
            Content::UniqueFileIdentifier(ufid)
                if ufid.owner_identifier != MUSICBRAINZ_UFID_OWNER =>
            {
                Some(ufid.clone())
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    drop(tag.remove("UFID"));
    for ufid in other_ufids {
        tag.add_frame(Frame::with_content(
            "UFID",
            Content::UniqueFileIdentifier(ufid),
        ));
    }
    if let Some(recording_id) = metadata.musicbrainz_recording_id() {
        tag.add_frame(Frame::with_content(
            "UFID",
            Content::UniqueFileIdentifier(UniqueFileIdentifier {
                owner_identifier: MUSICBRAINZ_UFID_OWNER.to_owned(),
                identifier: recording_id.as_bytes().to_vec(),
            }),
        ));
    }

    if config.flags.contains(ExportFlags::ADDITIONAL) {
        let (unmanaged_user_texts, unmanaged_text_frames): (Vec<_>, Vec<_>) = tag
            .frames()
            .filter_map(|frame| match frame.content() {
                Content::ExtendedText(text) if !is_managed_user_text(&text.description) => {
                    Some((Some(text.description.clone()), None))
                }
                Content::Text(_)
                    if is_text_frame_id(frame.id()) && !is_managed_text_frame(frame.id()) =>
                {
                    Some((None, Some(frame.id().to_owned())))
                }
                _ => None,
            })
            .unzip();
        for description in unmanaged_user_texts.into_iter().flatten() {
            tag.remove_extended_text(Some(&description), None);
        }
        for frame_id in unmanaged_text_frames.into_iter().flatten() {
            drop(tag.remove(&frame_id));
        }
        for (name, value) in metadata.additional_metadata().iter() {
            if is_text_frame_id(name) {
                if is_managed_text_frame(name) {
                    log::debug!("Skipping additional item {name} that collides with a managed frame");
                    continue;
                }
                tag.set_text(name.as_str(), value.clone());
            } else {
                if is_managed_user_text(name) {
                    log::debug!("Skipping additional item {name} that collides with a managed frame");
                    continue;
                }
                tag.add_frame(ExtendedText {
                    description: name.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    if config.flags.contains(ExportFlags::PICTURES) {
        tag.remove_all_pictures();
        for picture in metadata.attached_pictures() {
            tag.add_frame(Id3Picture {
                mime_type: mime_type_of(picture.image_data())
                    .unwrap_or("application/octet-stream")
                    .to_owned(),
                picture_type: export_picture_type(picture.picture_type()),
                description: picture.description().unwrap_or_default().to_owned(),
                data: picture.image_data().to_vec(),
            });
        }
    }
}
