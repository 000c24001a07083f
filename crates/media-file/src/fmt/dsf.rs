// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! DSD Stream File
//!
//! ```text
//! "DSD " | chunk size (28) | total file size | metadata offset
//! "fmt " | chunk size (52) | version | format id | channel type
//!        | channel count | sample rate | bits per sample
//!        | sample count | block size | reserved
//! "data" | chunk size | samples...
//! ID3v2 tag (optional, at metadata offset)
//! ```
//!
//! All integers are little-endian.

use std::{
    fs::File,
    io::{Cursor, Read as _, Seek as _, SeekFrom, Write as _},
    path::Path,
};

use anyhow::bail;

use tonetag_core::{AudioProperties, Metadata};

use super::{FileFormat, id3, open_reader, open_writable};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
};

const FORMAT: FileFormat = FileFormat::Dsf;

const DSD_CHUNK_ID: &[u8; 4] = b"DSD ";
const FMT_CHUNK_ID: &[u8; 4] = b"fmt ";

const DSD_CHUNK_SIZE: u64 = 28;
const FMT_CHUNK_SIZE: u64 = 52;

const HEADER_LEN: usize = (DSD_CHUNK_SIZE + FMT_CHUNK_SIZE) as usize;

const FILE_SIZE_OFFSET: u64 = 12;
const METADATA_OFFSET_OFFSET: u64 = 20;

fn u32_le(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn u64_le(bytes: &[u8], offset: usize) -> u64 {
    let mut buf = [0; 8];
    buf.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    file_size: u64,
    metadata_offset: u64,
    channel_count: u32,
    sample_rate_hz: u32,
    bits_per_sample: u32,
    sample_count: u64,
}

impl Header {
    fn parse(bytes: &[u8; HEADER_LEN]) -> anyhow::Result<Self> {
        if &bytes[0..4] != DSD_CHUNK_ID {
            bail!("missing DSD chunk");
        }
        if u64_le(bytes, 4) != DSD_CHUNK_SIZE {
            bail!("unexpected size of DSD chunk");
        }
        if &bytes[28..32] != FMT_CHUNK_ID {
            bail!("missing fmt chunk");
        }
        if u64_le(bytes, 32) != FMT_CHUNK_SIZE {
            bail!("unexpected size of fmt chunk");
        }
        Ok(Self {
            file_size: u64_le(bytes, 12),
            metadata_offset: u64_le(bytes, 20),
            channel_count: u32_le(bytes, 52),
            sample_rate_hz: u32_le(bytes, 56),
            bits_per_sample: u32_le(bytes, 60),
            sample_count: u64_le(bytes, 64),
        })
    }

    /// The offset of the tag if present and plausible.
    fn tag_offset(&self, file_len: u64) -> Option<u64> {
        (self.metadata_offset >= HEADER_LEN as u64 && self.metadata_offset < file_len)
            .then_some(self.metadata_offset)
    }

    fn properties(&self) -> AudioProperties {
        let sample_rate_hz = Some(self.sample_rate_hz).filter(|hz| *hz > 0);
        let mut properties = AudioProperties {
            format_name: Some(FORMAT.name().to_owned()),
            total_frames: Some(self.sample_count),
            channel_count: u16::try_from(self.channel_count)
                .ok()
                .filter(|count| *count > 0),
            bits_per_channel: u16::try_from(self.bits_per_sample).ok(),
            sample_rate_hz,
            duration_secs: None,
            bitrate_kbps: sample_rate_hz.map(|hz| {
                let bits_per_sec =
                    u64::from(hz) * u64::from(self.channel_count) * u64::from(self.bits_per_sample);
                (bits_per_sec / 1000) as u32
            }),
        };
        properties.complete_duration();
        properties
    }
}

fn read_header(path: &Path, file: &mut (impl std::io::Read + std::io::Seek)) -> Result<Header> {
    let mut bytes = [0; HEADER_LEN];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_exact(&mut bytes))
        .map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::invalid_format(path, FORMAT, err)
            } else {
                Error::from_io(path, err)
            }
        })?;
    Header::parse(&bytes).map_err(|err| Error::invalid_format(path, FORMAT, err))
}

fn file_len(path: &Path, file: &File) -> Result<u64> {
    file.metadata()
        .map(|metadata| metadata.len())
        .map_err(|err| Error::from_io(path, err))
}

fn read_tag(path: &Path, file: &mut File, header: &Header) -> Result<Option<::id3::Tag>> {
    let Some(tag_offset) = header.tag_offset(file_len(path, file)?) else {
        return Ok(None);
    };
    let mut tag_bytes = Vec::new();
    file.seek(SeekFrom::Start(tag_offset))
        .and_then(|_| file.read_to_end(&mut tag_bytes))
        .map_err(|err| Error::from_io(path, err))?;
    id3::read_tag(path, FORMAT, Cursor::new(tag_bytes))
}

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut file = open_reader(path)?.into_inner();
    let header = read_header(path, &mut file)?;
    let mut importer = Importer::new();
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        header.properties()
    } else {
        AudioProperties::default()
    };
    let mut metadata = Metadata::new();
    if let Some(tag) = read_tag(path, &mut file, &header)? {
        id3::import_tag(&mut importer, config, &tag, &mut metadata);
    }
    Ok(importer.finish_import(properties, metadata))
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_writable(path)?;
    let header = read_header(path, &mut file)?;
    let file_len = file_len(path, &file)?;
    let mut tag = read_tag(path, &mut file, &header)?.unwrap_or_default();
    id3::export_metadata_to_tag(&mut tag, config, metadata);

    // The tag is always stored at the end of the file
    let tag_offset = header.tag_offset(file_len).unwrap_or(file_len);
    let (metadata_offset, encoded_tag) = if tag.frames().next().is_some() {
        (tag_offset, id3::encode_tag(path, FORMAT, &tag)?)
    } else {
        log::debug!("Removing empty tag from {}", path.display());
        (0, Vec::new())
    };
    let file_size = tag_offset + encoded_tag.len() as u64;
    log::debug!(
        "Writing {tag_len} byte(s) of metadata at offset {tag_offset} into {file_name}",
        tag_len = encoded_tag.len(),
        file_name = path.display(),
    );
    file.set_len(tag_offset)
        .and_then(|()| file.seek(SeekFrom::Start(tag_offset)))
        .and_then(|_| file.write_all(&encoded_tag))
        .and_then(|()| file.seek(SeekFrom::Start(FILE_SIZE_OFFSET)))
        .and_then(|_| file.write_all(&file_size.to_le_bytes()))
        .and_then(|()| file.seek(SeekFrom::Start(METADATA_OFFSET_OFFSET)))
        .and_then(|_| file.write_all(&metadata_offset.to_le_bytes()))
        .and_then(|()| file.flush())
        .map_err(|err| Error::from_io(path, err))?;
    if header.file_size != file_len {
        log::warn!(
            "Corrected file size of {}: {} -> {file_size}",
            path.display(),
            header.file_size
        );
    }
    Ok(())
}
