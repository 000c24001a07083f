// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Direct Stream Digital Interchange File Format
//!
//! A `FRM8` container of chunks with big-endian 64-bit sizes. Chunk
//! data is padded to an even length. Metadata is stored in an
//! unofficial but widely supported `ID3 ` chunk.

use std::{
    fs::File,
    io::{Cursor, Read as _, Seek as _, SeekFrom, Write as _},
    path::Path,
};

use anyhow::{anyhow, bail};

use tonetag_core::{AudioProperties, Metadata};

use super::{FileFormat, id3, open_reader, open_writable};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
};

const FORMAT: FileFormat = FileFormat::Dsdiff;

type ChunkId = [u8; 4];

const FORM_CHUNK_ID: &ChunkId = b"FRM8";
const FORM_TYPE: &ChunkId = b"DSD ";
const PROP_CHUNK_ID: &ChunkId = b"PROP";
const PROP_TYPE_SOUND: &ChunkId = b"SND ";
const SAMPLE_RATE_CHUNK_ID: &ChunkId = b"FS  ";
const CHANNELS_CHUNK_ID: &ChunkId = b"CHNL";
const COMPRESSION_CHUNK_ID: &ChunkId = b"CMPR";
const DSD_DATA_CHUNK_ID: &ChunkId = b"DSD ";
const DST_DATA_CHUNK_ID: &ChunkId = b"DST ";
const DST_FRAME_INFO_CHUNK_ID: &ChunkId = b"FRTE";
const ID3_CHUNK_ID: &ChunkId = b"ID3 ";

const CHUNK_HEADER_LEN: u64 = 12;

/// Offset of the first chunk after the form header.
const FIRST_CHUNK_OFFSET: u64 = CHUNK_HEADER_LEN + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Chunk {
    id: ChunkId,
    offset: u64,
    size: u64,
}

impl Chunk {
    const fn data_offset(&self) -> u64 {
        self.offset + CHUNK_HEADER_LEN
    }

    /// The offset after the padded chunk data.
    const fn end_offset(&self) -> u64 {
        self.data_offset() + self.size + (self.size & 1)
    }
}

fn read_chunk_header(reader: &mut File, offset: u64) -> std::io::Result<Chunk> {
    let mut header = [0; CHUNK_HEADER_LEN as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut header)?;
    let mut id = [0; 4];
    id.copy_from_slice(&header[..4]);
    let mut size = [0; 8];
    size.copy_from_slice(&header[4..]);
    Ok(Chunk {
        id,
        offset,
        size: u64::from_be_bytes(size),
    })
}

fn read_chunk_data(reader: &mut File, chunk: &Chunk, max_len: u64) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.seek(SeekFrom::Start(chunk.data_offset()))?;
    reader
        .take(chunk.size.min(max_len))
        .read_to_end(&mut data)?;
    Ok(data)
}

/// Lists the chunks within `start..end`.
fn read_chunks(reader: &mut File, start: u64, end: u64) -> anyhow::Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut offset = start;
    while offset + CHUNK_HEADER_LEN <= end {
        let chunk = read_chunk_header(reader, offset)?;
        // Some writers omit the padding of the last chunk
        if chunk.data_offset() + chunk.size > end {
            bail!(
                "chunk \"{}\" at offset {offset} exceeds its container",
                String::from_utf8_lossy(&chunk.id)
            );
        }
        offset = chunk.end_offset();
        chunks.push(chunk);
    }
    Ok(chunks)
}

#[derive(Debug)]
struct Container {
    file_len: u64,
    chunks: Vec<Chunk>,
}

impl Container {
    fn read(reader: &mut File) -> anyhow::Result<Self> {
        let file_len = reader.metadata()?.len();
        let form = read_chunk_header(reader, 0)?;
        if &form.id != FORM_CHUNK_ID {
            bail!("missing FRM8 chunk");
        }
        let mut form_type = [0; 4];
        reader.read_exact(&mut form_type)?;
        if &form_type != FORM_TYPE {
            bail!("unexpected form type");
        }
        let form_end = form.data_offset() + form.size;
        if form_end > file_len {
            log::warn!("Declared size of FRM8 chunk exceeds the file size");
        }
        let chunks = read_chunks(reader, FIRST_CHUNK_OFFSET, form_end.min(file_len))?;
        Ok(Self { file_len, chunks })
    }

    fn find_chunk(&self, id: &ChunkId) -> Option<&Chunk> {
        self.chunks.iter().find(|chunk| &chunk.id == id)
    }
}

fn be_u16(bytes: &[u8]) -> Option<u16> {
    let bytes = bytes.get(..2)?;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn be_u32(bytes: &[u8]) -> Option<u32> {
    let bytes = bytes.get(..4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_properties(reader: &mut File, container: &Container) -> anyhow::Result<AudioProperties> {
    let prop = container
        .find_chunk(PROP_CHUNK_ID)
        .ok_or_else(|| anyhow!("missing PROP chunk"))?;
    let mut prop_type = [0; 4];
    reader.seek(SeekFrom::Start(prop.data_offset()))?;
    reader.read_exact(&mut prop_type)?;
    if &prop_type != PROP_TYPE_SOUND {
        bail!("unexpected type of PROP chunk");
    }
    let mut sample_rate_hz = None;
    let mut channel_count = None;
    let mut compression = *DSD_DATA_CHUNK_ID;
    for chunk in read_chunks(reader, prop.data_offset() + 4, prop.data_offset() + prop.size)? {
        match &chunk.id {
            SAMPLE_RATE_CHUNK_ID => {
                sample_rate_hz = be_u32(&read_chunk_data(reader, &chunk, 4)?);
            }
            CHANNELS_CHUNK_ID => {
                channel_count = be_u16(&read_chunk_data(reader, &chunk, 2)?);
            }
            COMPRESSION_CHUNK_ID => {
                let data = read_chunk_data(reader, &chunk, 4)?;
                if let Some(id) = data.get(..4) {
                    compression.copy_from_slice(id);
                }
            }
            _ => (),
        }
    }
    let sample_rate_hz = sample_rate_hz.filter(|hz| *hz > 0);
    let channel_count = channel_count.filter(|count| *count > 0);
    let total_frames = match &compression {
        DSD_DATA_CHUNK_ID => container
            .find_chunk(DSD_DATA_CHUNK_ID)
            .zip(channel_count)
            .map(|(data, channel_count)| data.size * 8 / u64::from(channel_count)),
        DST_DATA_CHUNK_ID => {
            if let Some(data) = container.find_chunk(DST_DATA_CHUNK_ID) {
                read_dst_frame_count(reader, data, sample_rate_hz)?
            } else {
                None
            }
        }
        _ => {
            log::warn!(
                "Unsupported compression type \"{}\"",
                String::from_utf8_lossy(&compression)
            );
            None
        }
    };
    let mut properties = AudioProperties {
        format_name: Some(FORMAT.name().to_owned()),
        total_frames,
        channel_count,
        bits_per_channel: Some(1),
        sample_rate_hz,
        duration_secs: None,
        bitrate_kbps: sample_rate_hz.zip(channel_count).map(|(hz, count)| {
            let bits_per_sec = u64::from(hz) * u64::from(count);
            (bits_per_sec / 1000) as u32
        }),
    };
    properties.complete_duration();
    Ok(properties)
}

/// Converts the number of compressed DST frames into sample frames.
fn read_dst_frame_count(
    reader: &mut File,
    data: &Chunk,
    sample_rate_hz: Option<u32>,
) -> anyhow::Result<Option<u64>> {
    let Some(sample_rate_hz) = sample_rate_hz else {
        return Ok(None);
    };
    let Some(frame_info) = read_chunks(reader, data.data_offset(), data.data_offset() + data.size)?
        .into_iter()
        .find(|chunk| &chunk.id == DST_FRAME_INFO_CHUNK_ID)
    else {
        return Ok(None);
    };
    let frame_info = read_chunk_data(reader, &frame_info, 6)?;
    let dst_frame_count = be_u32(&frame_info);
    let dst_frame_rate = frame_info.get(4..).and_then(be_u16).filter(|rate| *rate > 0);
    Ok(dst_frame_count
        .zip(dst_frame_rate)
        .map(|(count, rate)| u64::from(count) * u64::from(sample_rate_hz) / u64::from(rate)))
}

fn read_container(path: &Path, file: &mut File) -> Result<Container> {
    Container::read(file).map_err(|err| Error::invalid_format(path, FORMAT, err))
}

fn read_tag(path: &Path, file: &mut File, container: &Container) -> Result<Option<::id3::Tag>> {
    let Some(chunk) = container.find_chunk(ID3_CHUNK_ID) else {
        return Ok(None);
    };
    let data = read_chunk_data(file, chunk, chunk.size).map_err(|err| Error::from_io(path, err))?;
    id3::read_tag(path, FORMAT, Cursor::new(data))
}

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut file = open_reader(path)?.into_inner();
    let container = read_container(path, &mut file)?;
    let mut importer = Importer::new();
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        read_properties(&mut file, &container)
            .map_err(|err| Error::invalid_format(path, FORMAT, err))?
    } else {
        AudioProperties::default()
    };
    let mut metadata = Metadata::new();
    if let Some(tag) = read_tag(path, &mut file, &container)? {
        id3::import_tag(&mut importer, config, &tag, &mut metadata);
    }
    Ok(importer.finish_import(properties, metadata))
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_writable(path)?;
    let container = read_container(path, &mut file)?;
    let mut tag = read_tag(path, &mut file, &container)?.unwrap_or_default();
    id3::export_metadata_to_tag(&mut tag, config, metadata);
    let encoded_tag = if tag.frames().next().is_some() {
        id3::encode_tag(path, FORMAT, &tag)?
    } else {
        log::debug!("Removing empty tag from {}", path.display());
        Vec::new()
    };
    write_tag_chunk(&mut file, &container, &encoded_tag).map_err(|err| Error::from_io(path, err))
}

/// Replaces any existing `ID3 ` chunk by a new one at the end.
///
/// An empty tag removes the chunk.
fn write_tag_chunk(
    file: &mut File,
    container: &Container,
    encoded_tag: &[u8],
) -> std::io::Result<()> {
    let (truncate_offset, tail) = if let Some(chunk) = container.find_chunk(ID3_CHUNK_ID) {
        // Chunks following the old tag are moved up
        let mut tail = Vec::new();
        let tail_offset = chunk.end_offset().min(container.file_len);
        file.seek(SeekFrom::Start(tail_offset))?;
        file.read_to_end(&mut tail)?;
        (chunk.offset, tail)
    } else {
        (container.file_len, Vec::new())
    };
    file.set_len(truncate_offset)?;
    file.seek(SeekFrom::Start(truncate_offset))?;
    file.write_all(&tail)?;
    if (truncate_offset + tail.len() as u64) & 1 == 1 {
        file.write_all(&[0])?;
    }
    if !encoded_tag.is_empty() {
        let size = encoded_tag.len() as u64;
        file.write_all(ID3_CHUNK_ID)?;
        file.write_all(&size.to_be_bytes())?;
        file.write_all(encoded_tag)?;
        if size & 1 == 1 {
            file.write_all(&[0])?;
        }
    }
    let file_len = file.stream_position()?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&(file_len - CHUNK_HEADER_LEN).to_be_bytes())?;
    file.flush()
}
