// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracker modules
//!
//! Only the fixed-width song title and the number of channels are
//! available. Titles are stored as NUL-padded Latin-1 text.

use std::{
    fs,
    io::{Seek as _, SeekFrom, Write as _},
    ops::Range,
    path::Path,
};

use anyhow::bail;
use strum::IntoEnumIterator as _;

use tonetag_core::{AudioProperties, Metadata, MetadataKey};

use super::{FileFormat, open_writable};
use crate::{
    Error, Result,
    io::import::{ImportConfig, ImportFlags, Imported, Importer},
};

const MOD_TITLE: Range<usize> = 0..20;
const MOD_SIGNATURE: Range<usize> = 1080..1084;

const XM_MAGIC: &[u8] = b"Extended Module: ";
const XM_TITLE: Range<usize> = 17..37;
const XM_CHANNEL_COUNT: Range<usize> = 68..70;

const S3M_TITLE: Range<usize> = 0..28;
const S3M_MAGIC: &[u8] = b"SCRM";
const S3M_MAGIC_OFFSET: usize = 44;
const S3M_CHANNEL_SETTINGS: Range<usize> = 64..96;

const IT_MAGIC: &[u8] = b"IMPM";
const IT_TITLE: Range<usize> = 4..30;
const IT_CHANNEL_PAN: Range<usize> = 0x40..0x80;

/// Channels with a setting of 128 or above are disabled.
const DISABLED_CHANNEL_MIN: u8 = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    title_range: Range<usize>,
    channel_count: Option<u16>,
}

/// Decodes the channel count from the signature of a MOD file.
fn mod_channel_count(signature: &[u8]) -> Option<u16> {
    match signature {
        b"M.K." | b"M!K!" | b"M&K!" | b"N.T." | b"FLT4" | b"4CHN" => Some(4),
        b"6CHN" => Some(6),
        b"8CHN" | b"FLT8" | b"CD81" | b"OKTA" | b"OCTA" => Some(8),
        [b'T', b'D', b'Z', digit] if digit.is_ascii_digit() => Some(u16::from(digit - b'0')),
        [b'0'..=b'9', b'0'..=b'9', b'C', b'H' | b'N'] => {
            Some(u16::from(signature[0] - b'0') * 10 + u16::from(signature[1] - b'0'))
        }
        [digit, b'C', b'H', b'N'] if digit.is_ascii_digit() => Some(u16::from(digit - b'0')),
        _ => None,
    }
}

fn count_enabled_channels(settings: &[u8]) -> u16 {
    settings
        .iter()
        .filter(|setting| **setting < DISABLED_CHANNEL_MIN)
        .count() as u16
}

impl Header {
    fn parse(format: FileFormat, bytes: &[u8]) -> anyhow::Result<Self> {
        let header = match format {
            FileFormat::ProTracker => {
                let Some(signature) = bytes.get(MOD_SIGNATURE) else {
                    bail!("file too short");
                };
                // Files without a known signature have 15 samples and 4 channels
                Self {
                    title_range: MOD_TITLE,
                    channel_count: mod_channel_count(signature).or(Some(4)),
                }
            }
            FileFormat::FastTracker2 => {
                if !bytes.starts_with(XM_MAGIC) {
                    bail!("missing signature");
                }
                let Some(channel_count) = bytes.get(XM_CHANNEL_COUNT) else {
                    bail!("file too short");
                };
                Self {
                    title_range: XM_TITLE,
                    channel_count: Some(u16::from_le_bytes([channel_count[0], channel_count[1]])),
                }
            }
            FileFormat::ScreamTracker3 => {
                if bytes.get(S3M_MAGIC_OFFSET..S3M_MAGIC_OFFSET + S3M_MAGIC.len())
                    != Some(S3M_MAGIC)
                {
                    bail!("missing signature");
                }
                let Some(settings) = bytes.get(S3M_CHANNEL_SETTINGS) else {
                    bail!("file too short");
                };
                Self {
                    title_range: S3M_TITLE,
                    channel_count: Some(count_enabled_channels(settings)),
                }
            }
            FileFormat::ImpulseTracker => {
                if !bytes.starts_with(IT_MAGIC) {
                    bail!("missing signature");
                }
                let Some(pan) = bytes.get(IT_CHANNEL_PAN) else {
                    bail!("file too short");
                };
                Self {
                    title_range: IT_TITLE,
                    channel_count: Some(count_enabled_channels(pan)),
                }
            }
            _ => bail!("not a tracker module"),
        };
        Ok(header)
    }
}

#[must_use]
pub(crate) fn decode_title(field: &[u8]) -> String {
    let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    field[..len]
        .iter()
        .copied()
        .map(char::from)
        .collect::<String>()
        .trim_end()
        .to_owned()
}

/// Encodes the title into a NUL-padded field.
///
/// Characters outside of Latin-1 are replaced by `?`. The title is
/// truncated if it exceeds the field.
#[must_use]
pub(crate) fn encode_title(title: &str, field_len: usize) -> Vec<u8> {
    let mut field = title
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .take(field_len)
        .collect::<Vec<_>>();
    field.resize(field_len, 0);
    field
}

fn read_header(format: FileFormat, path: &Path) -> Result<(Vec<u8>, Header)> {
    let bytes = fs::read(path).map_err(|err| Error::from_io(path, err))?;
    let header =
        Header::parse(format, &bytes).map_err(|err| Error::invalid_format(path, format, err))?;
    Ok((bytes, header))
}

pub(crate) fn import_from_path(
    format: FileFormat,
    path: &Path,
    config: &ImportConfig,
) -> Result<Imported> {
    let (bytes, header) = read_header(format, path)?;
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        AudioProperties {
            format_name: Some(format.name().to_owned()),
            channel_count: header.channel_count.filter(|count| *count > 0),
            ..Default::default()
        }
    } else {
        AudioProperties::default()
    };
    let mut metadata = Metadata::new();
    if config.flags.contains(ImportFlags::METADATA) {
        let title = decode_title(&bytes[header.title_range]);
        if !title.is_empty() {
            metadata.set_title(Some(title));
        }
    }
    Ok(Importer::new().finish_import(properties, metadata))
}

pub(crate) fn export_to_path(format: FileFormat, path: &Path, metadata: &Metadata) -> Result<()> {
    if let Some(key) = MetadataKey::iter()
        .filter(|key| *key != MetadataKey::Title)
        .find(|key| metadata.change_state(*key).is_changed())
    {
        log::warn!("Cannot store {key} in {format} file {}", path.display());
        return Err(Error::not_supported(path, format));
    }
    if metadata.additional_metadata().has_changes() {
        log::warn!("Cannot store additional metadata in {format} file {}", path.display());
        return Err(Error::not_supported(path, format));
    }
    if metadata.has_picture_changes() {
        log::warn!("Cannot store pictures in {format} file {}", path.display());
        return Err(Error::not_supported(path, format));
    }
    if !metadata.change_state(MetadataKey::Title).is_changed() {
        return Ok(());
    }
    let (_, header) = read_header(format, path)?;
    let title = metadata.title().unwrap_or_default();
    let field = encode_title(title, header.title_range.len());
    let mut file = open_writable(path)?;
    file.seek(SeekFrom::Start(header.title_range.start as u64))
        .and_then(|_| file.write_all(&field))
        .and_then(|()| file.flush())
        .map_err(|err| Error::from_io(path, err))
}
