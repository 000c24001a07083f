// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! True Audio
//!
//! An optional ID3v2 tag is followed by the `TTA1` header. Trailing
//! ID3v1 tags are ignored.

use std::{
    fs::File,
    io::{Read as _, Seek as _, SeekFrom},
    path::Path,
};

use anyhow::bail;
use ::id3::Version;

use tonetag_core::{AudioProperties, Metadata};

use super::{FileFormat, id3, open_reader};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
};

const FORMAT: FileFormat = FileFormat::TrueAudio;

const ID3V2_HEADER_LEN: usize = 10;
const ID3V2_FOOTER_FLAG: u8 = 0x10;

const TTA_SIGNATURE: &[u8; 4] = b"TTA1";
const TTA_HEADER_LEN: usize = 22;

/// The total size of a leading ID3v2 tag or 0 if absent.
fn id3v2_tag_len(header: &[u8; ID3V2_HEADER_LEN]) -> u64 {
    if &header[..3] != b"ID3" {
        return 0;
    }
    let size = header[6..]
        .iter()
        .fold(0u64, |size, byte| (size << 7) | u64::from(byte & 0x7f));
    let footer_len = if header[5] & ID3V2_FOOTER_FLAG == 0 {
        0
    } else {
        ID3V2_HEADER_LEN as u64
    };
    ID3V2_HEADER_LEN as u64 + size + footer_len
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    audio_offset: u64,
    channel_count: u16,
    bits_per_sample: u16,
    sample_rate_hz: u32,
    sample_count: u32,
}

impl Header {
    fn read(reader: &mut File) -> anyhow::Result<Self> {
        let mut id3v2_header = [0; ID3V2_HEADER_LEN];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut id3v2_header)?;
        let audio_offset = id3v2_tag_len(&id3v2_header);
        let mut bytes = [0; TTA_HEADER_LEN];
        reader.seek(SeekFrom::Start(audio_offset))?;
        reader.read_exact(&mut bytes)?;
        if &bytes[..4] != TTA_SIGNATURE {
            bail!("missing TTA1 signature");
        }
        Ok(Self {
            audio_offset,
            channel_count: u16::from_le_bytes([bytes[6], bytes[7]]),
            bits_per_sample: u16::from_le_bytes([bytes[8], bytes[9]]),
            sample_rate_hz: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
            sample_count: u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]),
        })
    }

    fn properties(&self, file_len: u64) -> AudioProperties {
        let mut properties = AudioProperties {
            format_name: Some(FORMAT.name().to_owned()),
            total_frames: Some(self.sample_count.into()),
            channel_count: Some(self.channel_count).filter(|count| *count > 0),
            bits_per_channel: Some(self.bits_per_sample).filter(|bits| *bits > 0),
            sample_rate_hz: Some(self.sample_rate_hz).filter(|hz| *hz > 0),
            duration_secs: None,
            bitrate_kbps: None,
        };
        properties.complete_duration();
        properties.bitrate_kbps = properties
            .duration_secs
            .filter(|secs| *secs > 0.0)
            .map(|secs| {
                let audio_len = file_len.saturating_sub(self.audio_offset);
                (audio_len as f64 * 8.0 / secs / 1000.0).round() as u32
            });
        properties
    }
}

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut file = open_reader(path)?.into_inner();
    let header = Header::read(&mut file).map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let mut importer = Importer::new();
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        let file_len = file
            .metadata()
            .map_err(|err| Error::from_io(path, err))?
            .len();
        header.properties(file_len)
    } else {
        AudioProperties::default()
    };
    let mut metadata = Metadata::new();
    if header.audio_offset > 0 {
        file.rewind().map_err(|err| Error::from_io(path, err))?;
        if let Some(tag) = id3::read_tag(path, FORMAT, &mut file)? {
            id3::import_tag(&mut importer, config, &tag, &mut metadata);
        }
    }
    Ok(importer.finish_import(properties, metadata))
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_reader(path)?.into_inner();
    let header = Header::read(&mut file).map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let mut tag = if header.audio_offset > 0 {
        file.rewind().map_err(|err| Error::from_io(path, err))?;
        id3::read_tag(path, FORMAT, &mut file)?.unwrap_or_default()
    } else {
        Default::default()
    };
    drop(file);
    id3::export_metadata_to_tag(&mut tag, config, metadata);
    if tag.frames().next().is_some() {
        tag.write_to_path(path, Version::Id3v24)
            .map_err(|err| Error::from_id3(path, FORMAT, err))
    } else if header.audio_offset > 0 {
        log::debug!("Removing empty tag from {}", path.display());
        ::id3::Tag::remove_from_path(path)
            .map(drop)
            .map_err(|err| Error::from_id3(path, FORMAT, err))
    } else {
        Ok(())
    }
}
