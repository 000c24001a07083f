// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Supported file formats and the mapping between native tags
//! and normalized metadata.

use std::{
    fs::{File, OpenOptions},
    io::{BufReader, Seek as _},
    path::Path,
};

use lofty::{
    config::{ParseOptions, WriteOptions},
    file::{AudioFile as _, FileType, TaggedFile, TaggedFileExt as _},
    picture::{MimeType, Picture, PictureType as LoftyPictureType},
    probe::Probe,
    properties::FileProperties,
    tag::{ItemKey, ItemValue, MergeTag, SplitTag, Tag, TagExt as _, TagItem, TagType},
};
use strum::{EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};

use tonetag_core::{AttachedPicture, AudioProperties, Metadata, MetadataKey, PictureType};

use crate::{
    Error, Result,
    io::{
        export::{ExportConfig, ExportFlags},
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
    util::{format_value, picture::mime_type_of},
};

pub(crate) mod aiff;
pub(crate) mod dsdiff;
pub(crate) mod dsf;
pub(crate) mod id3;
pub(crate) mod id3v2;
pub(crate) mod module;
pub(crate) mod mp4;
pub(crate) mod mpeg;
pub(crate) mod ogg;
pub(crate) mod tta;
pub(crate) mod wav;

/// All file formats that could be handled.
///
/// The string representation is a stable identifier, e.g. for
/// configuring priorities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum FileFormat {
    Mpeg,
    Flac,
    Mp4,
    OggVorbis,
    OggOpus,
    OggSpeex,
    OggFlac,
    Wav,
    Aiff,
    Dsf,
    Dsdiff,
    #[strum(serialize = "wavpack")]
    WavPack,
    MonkeysAudio,
    Musepack,
    TrueAudio,
    ProTracker,
    ImpulseTracker,
    ScreamTracker3,
    FastTracker2,
}

impl FileFormat {
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mpeg => "MP3",
            Self::Flac => "FLAC",
            Self::Mp4 => "MP4",
            Self::OggVorbis => "Ogg Vorbis",
            Self::OggOpus => "Ogg Opus",
            Self::OggSpeex => "Ogg Speex",
            Self::OggFlac => "Ogg FLAC",
            Self::Wav => "WAVE",
            Self::Aiff => "AIFF",
            Self::Dsf => "DSF",
            Self::Dsdiff => "DSDIFF",
            Self::WavPack => "WavPack",
            Self::MonkeysAudio => "Monkey's Audio",
            Self::Musepack => "Musepack",
            Self::TrueAudio => "True Audio",
            Self::ProTracker => "MOD",
            Self::ImpulseTracker => "IT",
            Self::ScreamTracker3 => "S3M",
            Self::FastTracker2 => "XM",
        }
    }

    /// Lowercase file extensions without a leading dot.
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Mpeg => &["mp3"],
            Self::Flac => &["flac"],
            Self::Mp4 => &["m4a", "m4b", "mp4"],
            Self::OggVorbis => &["ogg"],
            Self::OggOpus => &["opus"],
            Self::OggSpeex => &["spx"],
            Self::OggFlac => &["oga"],
            Self::Wav => &["wav", "wave"],
            Self::Aiff => &["aiff", "aif", "aifc"],
            Self::Dsf => &["dsf"],
            Self::Dsdiff => &["dff"],
            Self::WavPack => &["wv"],
            Self::MonkeysAudio => &["ape"],
            Self::Musepack => &["mpc"],
            Self::TrueAudio => &["tta"],
            Self::ProTracker => &["mod"],
            Self::ImpulseTracker => &["it"],
            Self::ScreamTracker3 => &["s3m"],
            Self::FastTracker2 => &["xm"],
        }
    }

    #[must_use]
    pub const fn mime_types(self) -> &'static [&'static str] {
        match self {
            Self::Mpeg => &["audio/mpeg"],
            Self::Flac => &["audio/flac", "audio/x-flac"],
            Self::Mp4 => &["audio/mp4", "audio/m4a", "audio/x-m4a"],
            Self::OggVorbis => &["audio/ogg", "audio/vorbis"],
            Self::OggOpus => &["audio/opus"],
            Self::OggSpeex => &["audio/speex", "audio/x-speex"],
            Self::OggFlac => &["audio/x-oggflac"],
            Self::Wav => &["audio/wav", "audio/wave", "audio/x-wav"],
            Self::Aiff => &["audio/aiff", "audio/x-aiff"],
            Self::Dsf => &["audio/dsf", "audio/x-dsf"],
            Self::Dsdiff => &["audio/dff", "audio/x-dff"],
            Self::WavPack => &["audio/wavpack", "audio/x-wavpack"],
            Self::MonkeysAudio => &["audio/ape", "audio/x-ape", "audio/x-monkeys-audio"],
            Self::Musepack => &["audio/musepack", "audio/x-musepack"],
            Self::TrueAudio => &["audio/x-tta"],
            Self::ProTracker => &["audio/mod", "audio/x-mod"],
            Self::ImpulseTracker => &["audio/it", "audio/x-it"],
            Self::ScreamTracker3 => &["audio/s3m", "audio/x-s3m"],
            Self::FastTracker2 => &["audio/xm", "audio/x-xm"],
        }
    }

    /// Formats that are read and written through a generic [`Tag`].
    const fn lofty_file_type(self) -> Option<FileType> {
        let file_type = match self {
            Self::Flac => FileType::Flac,
            Self::OggVorbis => FileType::Vorbis,
            Self::OggOpus => FileType::Opus,
            Self::OggSpeex => FileType::Speex,
            Self::WavPack => FileType::WavPack,
            Self::MonkeysAudio => FileType::Ape,
            Self::Musepack => FileType::Mpc,
            _ => return None,
        };
        Some(file_type)
    }

    #[must_use]
    pub const fn is_tracker_module(self) -> bool {
        matches!(
            self,
            Self::ProTracker | Self::ImpulseTracker | Self::ScreamTracker3 | Self::FastTracker2
        )
    }

    /// Reads audio properties and metadata from a file.
    pub fn read(self, path: &Path, config: &ImportConfig) -> Result<Imported> {
        log::debug!("Reading {self} file {}", path.display());
        match self {
            Self::Mpeg => mpeg::import_from_path(path, config),
            Self::Mp4 => mp4::import_from_path(path, config),
            Self::Wav => wav::import_from_path(path, config),
            Self::Aiff => aiff::import_from_path(path, config),
            Self::Dsf => dsf::import_from_path(path, config),
            Self::Dsdiff => dsdiff::import_from_path(path, config),
            Self::TrueAudio => tta::import_from_path(path, config),
            Self::ProTracker | Self::ImpulseTracker | Self::ScreamTracker3 | Self::FastTracker2 => {
                module::import_from_path(self, path, config)
            }
            Self::OggVorbis | Self::OggOpus | Self::OggSpeex | Self::OggFlac => {
                match self.detect_ogg_codec(path)? {
                    Self::OggFlac => ogg::import_from_path(path, config),
                    format => import_from_path(format, path, config),
                }
            }
            Self::Flac | Self::WavPack | Self::MonkeysAudio | Self::Musepack => {
                import_from_path(self, path, config)
            }
        }
    }

    /// Writes metadata into an existing file.
    pub fn write(self, path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
        log::debug!("Writing {self} file {}", path.display());
        match self {
            Self::Mpeg => mpeg::export_to_path(path, metadata, config),
            Self::Mp4 => mp4::export_to_path(path, metadata, config),
            Self::Wav => wav::export_to_path(path, metadata, config),
            Self::Aiff => aiff::export_to_path(path, metadata, config),
            Self::Dsf => dsf::export_to_path(path, metadata, config),
            Self::Dsdiff => dsdiff::export_to_path(path, metadata, config),
            Self::TrueAudio => tta::export_to_path(path, metadata, config),
            Self::ProTracker | Self::ImpulseTracker | Self::ScreamTracker3 | Self::FastTracker2 => {
                module::export_to_path(self, path, metadata)
            }
            Self::OggVorbis | Self::OggOpus | Self::OggSpeex | Self::OggFlac => {
                match self.detect_ogg_codec(path)? {
                    Self::OggFlac => ogg::export_to_path(path, metadata, config),
                    format => export_to_path(format, path, metadata, config),
                }
            }
            Self::Flac | Self::WavPack | Self::MonkeysAudio | Self::Musepack => {
                export_to_path(self, path, metadata, config)
            }
        }
    }

    /// Ogg files are handled according to the codec of the stream,
    /// regardless of their extension.
    fn detect_ogg_codec(self, path: &Path) -> Result<Self> {
        let Some(detected) = ogg::detect_codec(path)? else {
            return Ok(self);
        };
        if detected != self {
            log::debug!("Handling {self} file {} as {detected}", path.display());
        }
        Ok(detected)
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn parse_options() -> ParseOptions {
    ParseOptions::new().read_properties(true)
}

pub(crate) fn open_reader(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| Error::from_io(path, err))
}

pub(crate) fn open_writable(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|err| Error::from_io(path, err))
}

pub(crate) fn take_primary_or_first_tag(tagged_file: &mut TaggedFile) -> Option<Tag> {
    if let Some(tag) = tagged_file.remove(tagged_file.primary_tag_type()) {
        return Some(tag);
    }
    let first_tag_type = tagged_file.first_tag().map(Tag::tag_type)?;
    tagged_file.remove(first_tag_type)
}

/// The generic item that stores the value of a key.
///
/// Returns `None` if the key must be handled natively by the
/// tag format.
pub(crate) fn item_key(key: MetadataKey, tag_type: TagType) -> Option<ItemKey> {
    use MetadataKey::*;
    let item_key = match key {
        Title => ItemKey::TrackTitle,
        AlbumTitle => ItemKey::AlbumTitle,
        Artist => ItemKey::TrackArtist,
        AlbumArtist => ItemKey::AlbumArtist,
        Genre => ItemKey::Genre,
        Composer => ItemKey::Composer,
        ReleaseDate => match tag_type {
            TagType::Ape => ItemKey::Year,
            _ => ItemKey::RecordingDate,
        },
        Compilation => ItemKey::FlagCompilation,
        TrackNumber => ItemKey::TrackNumber,
        TrackTotal => ItemKey::TrackTotal,
        DiscNumber => ItemKey::DiscNumber,
        DiscTotal => ItemKey::DiscTotal,
        Lyrics => ItemKey::Lyrics,
        Bpm => match tag_type {
            TagType::Id3v2 | TagType::Mp4Ilst => ItemKey::IntegerBpm,
            _ => ItemKey::Bpm,
        },
        Rating | MusicBrainzRecordingId if tag_type == TagType::Id3v2 => {
            // Stored in POPM and UFID frames
            return None;
        }
        Rating => ItemKey::Popularimeter,
        Comment => ItemKey::Comment,
        Mcn => ItemKey::Barcode,
        Isrc => ItemKey::Isrc,
        MusicBrainzReleaseId => ItemKey::MusicBrainzReleaseId,
        MusicBrainzRecordingId => ItemKey::MusicBrainzRecordingId,
        TitleSortOrder => ItemKey::TrackTitleSortOrder,
        AlbumTitleSortOrder => ItemKey::AlbumTitleSortOrder,
        ArtistSortOrder => ItemKey::TrackArtistSortOrder,
        AlbumArtistSortOrder => ItemKey::AlbumArtistSortOrder,
        ComposerSortOrder => ItemKey::ComposerSortOrder,
        Grouping => ItemKey::ContentGroup,
        ReplayGainTrackGain => ItemKey::ReplayGainTrackGain,
        ReplayGainTrackPeak => ItemKey::ReplayGainTrackPeak,
        ReplayGainAlbumGain => ItemKey::ReplayGainAlbumGain,
        ReplayGainAlbumPeak => ItemKey::ReplayGainAlbumPeak,
        GenreSortOrder | ReplayGainReferenceLoudness => {
            return match tag_type {
                // Stored as ID3v2 user text frames or MP4 freeform atoms
                TagType::Id3v2 | TagType::Mp4Ilst => None,
                _ => native_item_key(key),
            };
        }
    };
    if item_key.map_key(tag_type, false).is_some() {
        Some(item_key)
    } else {
        native_item_key(key)
    }
}

/// Native names of fields without a dedicated generic item.
pub(crate) const fn native_field_name(key: MetadataKey) -> Option<&'static str> {
    match key {
        MetadataKey::Bpm => Some("BPM"),
        MetadataKey::Rating => Some("RATING"),
        MetadataKey::ComposerSortOrder => Some("COMPOSERSORT"),
        MetadataKey::GenreSortOrder => Some("GENRESORT"),
        MetadataKey::ReplayGainReferenceLoudness => Some("REPLAYGAIN_REFERENCE_LOUDNESS"),
        _ => None,
    }
}

fn native_item_key(key: MetadataKey) -> Option<ItemKey> {
    native_field_name(key).map(|name| ItemKey::Unknown(name.to_owned()))
}

/// Checks if a name without a generic mapping could be stored in a tag.
fn is_valid_native_name(tag_type: TagType, name: &str) -> bool {
    match tag_type {
        TagType::VorbisComments => {
            !name.is_empty() && name.bytes().all(|b| (0x20..=0x7d).contains(&b) && b != b'=')
        }
        TagType::Ape => {
            (2..=255).contains(&name.len())
                && name.bytes().all(|b| (0x20..=0x7e).contains(&b))
                && !["ID3", "TAG", "OGGS", "MP+"]
                    .iter()
                    .any(|reserved| reserved.eq_ignore_ascii_case(name))
        }
        // Either a fourcc or a freeform atom "----:mean:name"
        TagType::Mp4Ilst => {
            name.len() == 4 || (name.starts_with("----:") && name.split(':').count() >= 3)
        }
        TagType::Id3v2 => !name.is_empty(),
        _ => false,
    }
}

/// Checks if an item is managed through one of the normalized keys.
///
/// All other text items are treated as additional metadata.
pub(crate) fn is_managed_item(tag_type: TagType, item_key: &ItemKey) -> bool {
    if MetadataKey::iter().any(|key| item_key_matches(key, tag_type, item_key)) {
        return true;
    }
    let ItemKey::Unknown(name) = item_key else {
        return false;
    };
    match tag_type {
        TagType::Id3v2 => id3v2::is_managed_user_text(name),
        TagType::Mp4Ilst => mp4::is_managed_freeform(name),
        _ => false,
    }
}

fn item_key_matches(key: MetadataKey, tag_type: TagType, item_key: &ItemKey) -> bool {
    self::item_key(key, tag_type).is_some_and(|expected| is_same_item_key(&expected, item_key))
}

/// Native names of unknown items are compared case-insensitively.
fn is_same_item_key(lhs: &ItemKey, rhs: &ItemKey) -> bool {
    match (lhs, rhs) {
        (ItemKey::Unknown(lhs), ItemKey::Unknown(rhs)) => lhs.eq_ignore_ascii_case(rhs),
        (lhs, rhs) => lhs == rhs,
    }
}

fn text_values<'a>(tag: &'a Tag, item_key: &'a ItemKey) -> impl Iterator<Item = &'a str> {
    tag.items()
        .filter(move |item| is_same_item_key(item.key(), item_key))
        .filter_map(|item| item.value().text())
}

fn remove_items(tag: &mut Tag, item_key: &ItemKey) {
    tag.retain(|item| !is_same_item_key(item.key(), item_key));
}

/// Replaces all items of a key with a single text item.
///
/// Returns `false` if the tag cannot store the item.
fn insert_text_item(tag: &mut Tag, item_key: ItemKey, text: String) -> bool {
    let ItemKey::Unknown(name) = &item_key else {
        return tag.insert_text(item_key, text);
    };
    // lofty refuses to insert unknown keys through the checked API
    if !is_valid_native_name(tag.tag_type(), name) {
        return false;
    }
    remove_items(tag, &item_key);
    tag.insert_unchecked(TagItem::new(item_key, ItemValue::Text(text)));
    true
}

fn import_file_properties(format: FileFormat, properties: &FileProperties) -> AudioProperties {
    let duration_secs = properties.duration().as_secs_f64();
    let sample_rate_hz = properties.sample_rate().filter(|hz| *hz > 0);
    let total_frames = sample_rate_hz.map(|hz| (duration_secs * f64::from(hz)).round() as u64);
    AudioProperties {
        format_name: Some(format.name().to_owned()),
        total_frames,
        channel_count: properties.channels().map(u16::from),
        bits_per_channel: properties.bit_depth().map(u16::from),
        sample_rate_hz,
        duration_secs: Some(duration_secs).filter(|secs| *secs > 0.0),
        bitrate_kbps: properties
            .audio_bitrate()
            .or_else(|| properties.overall_bitrate())
            .filter(|kbps| *kbps > 0),
    }
}

fn import_picture(picture: &Picture) -> Option<AttachedPicture> {
    if picture.data().is_empty() {
        return None;
    }
    Some(AttachedPicture::new(
        PictureType::from_code(picture.pic_type().as_u8()),
        picture.description().map(ToOwned::to_owned),
        picture.data().to_vec(),
    ))
}

fn export_picture(picture: &AttachedPicture) -> Picture {
    let mime_type = mime_type_of(picture.image_data()).map(|mime_type| match mime_type {
        "image/png" => MimeType::Png,
        "image/jpeg" => MimeType::Jpeg,
        "image/tiff" => MimeType::Tiff,
        "image/bmp" => MimeType::Bmp,
        "image/gif" => MimeType::Gif,
        other => MimeType::Unknown(other.to_owned()),
    });
    Picture::new_unchecked(
        LoftyPictureType::from_u8(picture.picture_type().code()),
        mime_type,
        picture.description().map(ToOwned::to_owned),
        picture.image_data().to_vec(),
    )
}

/// Imports the contents of a generic tag.
///
/// The caller is responsible for merging the changes.
pub(crate) fn import_tag(
    importer: &mut Importer,
    config: &ImportConfig,
    tag: &Tag,
    metadata: &mut Metadata,
) {
    let tag_type = tag.tag_type();
    if config.flags.contains(ImportFlags::METADATA) {
        for key in MetadataKey::iter() {
            let Some(item_key) = item_key(key, tag_type) else {
                continue;
            };
            let mut values = text_values(tag, &item_key);
            let Some(first) = values.next() else {
                continue;
            };
            let ignored_count = values.count();
            if ignored_count > 0 {
                importer.add_issue(format!(
                    "Ignoring {ignored_count} additional value(s) of {key}"
                ));
            }
            if let Some(value) = importer.import_value(key, first) {
                metadata.set(key, Some(value));
            }
        }
    }
    if config.flags.contains(ImportFlags::ADDITIONAL) {
        for item in tag.items() {
            if is_managed_item(tag_type, item.key()) {
                continue;
            }
            let ItemValue::Text(text) = item.value() else {
                continue;
            };
            let Some(name) = item.key().map_key(tag_type, true) else {
                continue;
            };
            if metadata.additional_value(name).is_some() {
                importer.add_issue(format!("Ignoring duplicate value of {name}"));
                continue;
            }
            metadata.set_additional_value(name, Some(text.clone()));
        }
    }
    if config.flags.contains(ImportFlags::PICTURES) {
        for picture in tag.pictures() {
            if let Some(picture) = import_picture(picture) {
                metadata.attach_picture(picture);
            } else {
                importer.add_issue("Ignoring picture without image data");
            }
        }
    }
}

/// Imports properties and the most relevant tag of a file.
pub(crate) fn import_tagged_file(
    importer: &mut Importer,
    config: &ImportConfig,
    format: FileFormat,
    mut tagged_file: TaggedFile,
) -> (AudioProperties, Metadata) {
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        import_file_properties(format, tagged_file.properties())
    } else {
        AudioProperties::default()
    };
    let mut metadata = Metadata::new();
    if let Some(tag) = take_primary_or_first_tag(&mut tagged_file) {
        import_tag(importer, config, &tag, &mut metadata);
    }
    (properties, metadata)
}

/// Exports metadata into a generic tag.
///
/// Returns the names of all fields and additional items that could
/// not be stored.
#[must_use]
pub(crate) fn export_tag(tag: &mut Tag, config: &ExportConfig, metadata: &Metadata) -> Vec<String> {
    let tag_type = tag.tag_type();
    let mut rejected = Vec::new();
    for key in MetadataKey::iter() {
        let Some(item_key) = item_key(key, tag_type) else {
            continue;
        };
        if let Some(value) = metadata.get(key) {
            if !insert_text_item(tag, item_key, format_value(key, value)) {
                rejected.push(key.to_string());
            }
        } else {
            remove_items(tag, &item_key);
        }
    }
    if config.flags.contains(ExportFlags::ADDITIONAL) {
        tag.retain(|item| {
            is_managed_item(tag_type, item.key()) || !matches!(item.value(), ItemValue::Text(_))
        });
        for (name, value) in metadata.additional_metadata().iter() {
            let item_key = ItemKey::from_key(tag_type, name);
            if is_managed_item(tag_type, &item_key) {
                log::debug!("Skipping additional item {name} that collides with a managed item");
                continue;
            }
            if !insert_text_item(tag, item_key, value.clone()) {
                rejected.push(name.clone());
            }
        }
    }
    if config.flags.contains(ExportFlags::PICTURES) {
        while !tag.pictures().is_empty() {
            tag.remove_picture(0);
        }
        for picture in metadata.attached_pictures() {
            tag.push_picture(export_picture(picture));
        }
    }
    rejected
}

/// Fails if [`export_tag`] could not store some of the contents.
///
/// Must be checked before the file is modified.
pub(crate) fn ensure_all_exported(
    path: &Path,
    format: FileFormat,
    rejected: &[String],
) -> Result<()> {
    if rejected.is_empty() {
        return Ok(());
    }
    log::warn!(
        "Cannot store {names} in {format} file {path}",
        names = rejected.join(", "),
        path = path.display(),
    );
    Err(Error::not_supported(path, format))
}

/// Exports metadata through the generic tag of `tag_repr`.
///
/// Contents that are not representable by the generic tag remain
/// untouched. Returns the merged tag and the names of all rejected
/// fields and items.
pub(crate) fn split_export_merge_metadata_to_tag<T>(
    tag_repr: T,
    config: &ExportConfig,
    metadata: &Metadata,
) -> (<T::Remainder as MergeTag>::Merged, Vec<String>)
where
    T: SplitTag,
{
    let (tag_remainder, mut tag) = tag_repr.split_tag();
    let rejected = export_tag(&mut tag, config, metadata);
    (tag_remainder.merge_tag(tag), rejected)
}

fn read_tagged_file(
    format: FileFormat,
    path: &Path,
    file_type: FileType,
    reader: impl std::io::Read + std::io::Seek,
) -> Result<TaggedFile> {
    Probe::new(reader)
        .set_file_type(file_type)
        .options(parse_options())
        .read()
        .map_err(|err| Error::from_lofty(path, format, err))
}

fn import_from_path(format: FileFormat, path: &Path, config: &ImportConfig) -> Result<Imported> {
    let Some(file_type) = format.lofty_file_type() else {
        return Err(Error::not_supported(path, format));
    };
    let reader = open_reader(path)?;
    let tagged_file = read_tagged_file(format, path, file_type, reader)?;
    let mut importer = Importer::new();
    let (properties, metadata) = import_tagged_file(&mut importer, config, format, tagged_file);
    Ok(importer.finish_import(properties, metadata))
}

fn export_to_path(
    format: FileFormat,
    path: &Path,
    metadata: &Metadata,
    config: &ExportConfig,
) -> Result<()> {
    let Some(file_type) = format.lofty_file_type() else {
        return Err(Error::not_supported(path, format));
    };
    let mut file = open_writable(path)?;
    let mut tagged_file = read_tagged_file(format, path, file_type, &mut file)?;
    let mut tag = tagged_file
        .remove(tagged_file.primary_tag_type())
        .unwrap_or_else(|| Tag::new(tagged_file.primary_tag_type()));
    let rejected = export_tag(&mut tag, config, metadata);
    ensure_all_exported(path, format, &rejected)?;
    file.rewind().map_err(|err| Error::from_io(path, err))?;
    tag.save_to(&mut file, WriteOptions::default())
        .map_err(|err| Error::from_lofty(path, format, err))
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
