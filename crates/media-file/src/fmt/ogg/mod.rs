// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Ogg streams
//!
//! The codec is identified by the signature of the first packet.
//! FLAC in Ogg is not supported by lofty. Its header packets are
//! parsed and rewritten here, while the Vorbis comments are mapped
//! through the generic tag like for native FLAC files.

use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom, Write as _},
    path::Path,
};

use anyhow::bail;
use lofty::{
    config::ParsingMode,
    ogg::{OggPictureStorage as _, VorbisComments},
    picture::Picture,
    tag::Tag,
};
use ogg_pager::{CONTAINS_FIRST_PAGE_OF_BITSTREAM, Packets, Page, PageError};

use tonetag_core::{AudioProperties, Metadata};

use super::{FileFormat, open_reader, open_writable};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
};

const FORMAT: FileFormat = FileFormat::OggFlac;

const MAPPING_HEADER_SIGNATURE: &[u8; 5] = b"\x7fFLAC";
const FLAC_STREAM_MARKER: &[u8; 4] = b"fLaC";

const HEADER_COUNT_OFFSET: usize = 7;
const STREAM_MARKER_OFFSET: usize = 9;
const BLOCK_HEADER_LEN: usize = 4;
const STREAMINFO_LEN: usize = 34;
const STREAMINFO_OFFSET: usize = STREAM_MARKER_OFFSET + FLAC_STREAM_MARKER.len() + BLOCK_HEADER_LEN;
const MAPPING_HEADER_LEN: usize = STREAMINFO_OFFSET + STREAMINFO_LEN;

const BLOCK_TYPE_STREAMINFO: u8 = 0;
const BLOCK_TYPE_PADDING: u8 = 1;
const BLOCK_TYPE_VORBIS_COMMENT: u8 = 4;
const BLOCK_TYPE_PICTURE: u8 = 6;

const BLOCK_TYPE_MASK: u8 = 0x7f;
const LAST_BLOCK_FLAG: u8 = 0x80;

const MAX_BLOCK_LEN: usize = (1 << 24) - 1;

const CODEC_SIGNATURES: [(&[u8], FileFormat); 4] = [
    (b"\x01vorbis", FileFormat::OggVorbis),
    (b"OpusHead", FileFormat::OggOpus),
    (b"Speex   ", FileFormat::OggSpeex),
    (MAPPING_HEADER_SIGNATURE, FileFormat::OggFlac),
];

fn codec_of_first_packet(packet: &[u8]) -> Option<FileFormat> {
    CODEC_SIGNATURES
        .iter()
        .find(|(signature, _)| packet.starts_with(signature))
        .map(|(_, format)| *format)
}

/// Identifies the codec of an Ogg file.
///
/// Returns `None` if the file does not start with an Ogg page of
/// a known codec.
pub(crate) fn detect_codec(path: &Path) -> Result<Option<FileFormat>> {
    let mut reader = open_reader(path)?;
    match Page::read(&mut reader) {
        Ok(page) => Ok(codec_of_first_packet(page.content())),
        Err(PageError::Io(err)) if err.kind() != std::io::ErrorKind::UnexpectedEof => {
            Err(Error::from_io(path, err))
        }
        Err(_) => Ok(None),
    }
}

fn block_type(block: &[u8]) -> u8 {
    block[0] & BLOCK_TYPE_MASK
}

fn block_data(block: &[u8]) -> &[u8] {
    &block[BLOCK_HEADER_LEN..]
}

fn metadata_block(block_type: u8, data: &[u8]) -> anyhow::Result<Vec<u8>> {
    if data.len() > MAX_BLOCK_LEN {
        bail!("metadata block exceeds {MAX_BLOCK_LEN} bytes");
    }
    let len = u32::try_from(data.len())?.to_be_bytes();
    let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + data.len());
    block.push(block_type);
    block.extend_from_slice(&len[1..]);
    block.extend_from_slice(data);
    Ok(block)
}

fn read_u32_le(data: &mut &[u8]) -> anyhow::Result<u32> {
    let Some((bytes, rest)) = data.split_first_chunk::<4>() else {
        bail!("truncated Vorbis comments");
    };
    *data = rest;
    Ok(u32::from_le_bytes(*bytes))
}

fn read_string(data: &mut &[u8]) -> anyhow::Result<String> {
    let len = usize::try_from(read_u32_le(data)?)?;
    if len > data.len() {
        bail!("truncated Vorbis comments");
    }
    let (bytes, rest) = data.split_at(len);
    *data = rest;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn write_string(data: &mut Vec<u8>, string: &str) -> anyhow::Result<()> {
    data.extend_from_slice(&u32::try_from(string.len())?.to_le_bytes());
    data.extend_from_slice(string.as_bytes());
    Ok(())
}

fn parse_vorbis_comments(mut data: &[u8]) -> anyhow::Result<VorbisComments> {
    let data = &mut data;
    let mut comments = VorbisComments::new();
    comments.set_vendor(read_string(data)?);
    let count = read_u32_le(data)?;
    for _ in 0..count {
        let comment = read_string(data)?;
        let Some((key, value)) = comment.split_once('=') else {
            log::debug!("Skipping comment without separator: {comment}");
            continue;
        };
        comments.push(key.to_owned(), value.to_owned());
    }
    Ok(comments)
}

fn encode_vorbis_comments(comments: &VorbisComments) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    write_string(&mut data, comments.vendor())?;
    data.extend_from_slice(&u32::try_from(comments.items().len())?.to_le_bytes());
    for (key, value) in comments.items() {
        write_string(&mut data, &format!("{key}={value}"))?;
    }
    Ok(data)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamInfo {
    sample_rate_hz: u32,
    channel_count: u8,
    bits_per_sample: u8,
    total_samples: u64,
}

impl StreamInfo {
    fn parse(block: &[u8; STREAMINFO_LEN]) -> Self {
        let sample_rate_hz =
            (u32::from(block[10]) << 12) | (u32::from(block[11]) << 4) | (u32::from(block[12]) >> 4);
        let channel_count = ((block[12] >> 1) & 0x07) + 1;
        let bits_per_sample = (((block[12] & 0x01) << 4) | (block[13] >> 4)) + 1;
        let total_samples = (u64::from(block[13] & 0x0f) << 32)
            | u64::from(u32::from_be_bytes([block[14], block[15], block[16], block[17]]));
        Self {
            sample_rate_hz,
            channel_count,
            bits_per_sample,
            total_samples,
        }
    }

    fn properties(&self, audio_len: u64) -> AudioProperties {
        let mut properties = AudioProperties {
            format_name: Some(FORMAT.name().to_owned()),
            // Zero if unknown
            total_frames: Some(self.total_samples).filter(|count| *count > 0),
            channel_count: Some(self.channel_count.into()),
            bits_per_channel: Some(self.bits_per_sample.into()),
            sample_rate_hz: Some(self.sample_rate_hz).filter(|hz| *hz > 0),
            duration_secs: None,
            bitrate_kbps: None,
        };
        properties.complete_duration();
        properties.bitrate_kbps = properties
            .duration_secs
            .filter(|secs| *secs > 0.0)
            .map(|secs| (audio_len as f64 * 8.0 / secs / 1000.0).round() as u32);
        properties
    }
}

/// The header packets of an Ogg FLAC stream.
#[derive(Debug)]
struct Headers {
    stream_serial: u32,

    /// The first packet including the STREAMINFO block.
    mapping_header: Vec<u8>,

    /// All following metadata blocks including their block headers.
    blocks: Vec<Vec<u8>>,

    /// The audio data starts on a fresh page.
    audio_offset: u64,
}

impl Headers {
    fn read(reader: &mut (impl Read + Seek)) -> anyhow::Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let first_page = Page::read(reader)?;
        let stream_serial = first_page.header().stream_serial;
        let mapping_header = first_page.content();
        // Exactly one packet on the first page
        if mapping_header.len() < MAPPING_HEADER_LEN
            || !mapping_header.starts_with(MAPPING_HEADER_SIGNATURE)
        {
            bail!("missing FLAC mapping header");
        }
        if mapping_header[5] != 1 {
            bail!("unsupported mapping version {}", mapping_header[5]);
        }
        if &mapping_header[STREAM_MARKER_OFFSET..STREAM_MARKER_OFFSET + 4] != FLAC_STREAM_MARKER {
            bail!("missing FLAC stream marker");
        }
        if block_type(&mapping_header[STREAMINFO_OFFSET - BLOCK_HEADER_LEN..])
            != BLOCK_TYPE_STREAMINFO
        {
            bail!("missing STREAMINFO block");
        }
        let header_count = u16::from_be_bytes([
            mapping_header[HEADER_COUNT_OFFSET],
            mapping_header[HEADER_COUNT_OFFSET + 1],
        ]);
        if header_count == 0 {
            bail!("unknown number of header packets");
        }

        let mapping_header = mapping_header[..MAPPING_HEADER_LEN].to_vec();

        reader.seek(SeekFrom::Start(0))?;
        let packets = Packets::read_count(reader, 1 + header_count as isize)?;
        let audio_offset = reader.stream_position()?;
        let blocks = packets
            .iter()
            .skip(1)
            .map(|packet| {
                if packet.len() < BLOCK_HEADER_LEN {
                    bail!("truncated metadata block");
                }
                let len = u32::from_be_bytes([0, packet[1], packet[2], packet[3]]);
                if usize::try_from(len)? != packet.len() - BLOCK_HEADER_LEN {
                    bail!("metadata block length mismatch");
                }
                Ok(packet.to_vec())
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            stream_serial,
            mapping_header,
            blocks,
            audio_offset,
        })
    }

    fn stream_info(&self) -> StreamInfo {
        let mut block = [0; STREAMINFO_LEN];
        block.copy_from_slice(&self.mapping_header[STREAMINFO_OFFSET..MAPPING_HEADER_LEN]);
        StreamInfo::parse(&block)
    }

    /// Collects the comments and the pictures of all metadata blocks.
    fn vorbis_comments(&self) -> anyhow::Result<VorbisComments> {
        let mut comments = self
            .blocks
            .iter()
            .find(|block| block_type(block) == BLOCK_TYPE_VORBIS_COMMENT)
            .map(|block| parse_vorbis_comments(block_data(block)))
            .transpose()?
            .unwrap_or_default();
        for block in &self.blocks {
            if block_type(block) != BLOCK_TYPE_PICTURE {
                continue;
            }
            match Picture::from_flac_bytes(block_data(block), false, ParsingMode::BestAttempt) {
                Ok((picture, information)) => {
                    comments.insert_picture(picture, Some(information))?;
                }
                Err(err) => {
                    log::warn!("Skipping invalid picture block: {err}");
                }
            }
        }
        Ok(comments)
    }

    /// Replaces comments and pictures.
    ///
    /// Padding is discarded and all other blocks are preserved.
    fn replace_vorbis_comments(&mut self, comments: &VorbisComments) -> anyhow::Result<()> {
        let mut blocks = vec![metadata_block(
            BLOCK_TYPE_VORBIS_COMMENT,
            &encode_vorbis_comments(comments)?,
        )?];
        for (picture, information) in comments.pictures() {
            blocks.push(metadata_block(
                BLOCK_TYPE_PICTURE,
                &picture.as_flac_bytes(*information, false),
            )?);
        }
        blocks.extend(
            self.blocks
                .drain(..)
                .filter(|block| {
                    !matches!(
                        block_type(block),
                        BLOCK_TYPE_VORBIS_COMMENT | BLOCK_TYPE_PICTURE | BLOCK_TYPE_PADDING
                    )
                }),
        );
        let block_count = blocks.len();
        for (index, block) in blocks.iter_mut().enumerate() {
            block[0] &= BLOCK_TYPE_MASK;
            if index + 1 == block_count {
                block[0] |= LAST_BLOCK_FLAG;
            }
        }
        let header_count = u16::try_from(block_count)?.to_be_bytes();
        self.mapping_header[HEADER_COUNT_OFFSET..HEADER_COUNT_OFFSET + 2]
            .copy_from_slice(&header_count);
        self.blocks = blocks;
        Ok(())
    }

    /// Paginates the header packets followed by all audio pages.
    ///
    /// Audio pages are renumbered if the number of header pages changed.
    fn encode_stream(&self, reader: &mut (impl Read + Seek)) -> anyhow::Result<Vec<u8>> {
        let mut pages = ogg_pager::paginate(
            [self.mapping_header.as_slice()],
            self.stream_serial,
            0,
            CONTAINS_FIRST_PAGE_OF_BITSTREAM,
        )?;
        pages.extend(ogg_pager::paginate(
            self.blocks.iter().map(Vec::as_slice),
            self.stream_serial,
            0,
            0,
        )?);
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(self.audio_offset))?;
        while reader.stream_position()? < stream_len {
            pages.push(Page::read(reader)?);
        }
        let mut bytes = Vec::new();
        for (sequence_number, page) in pages.iter_mut().enumerate() {
            page.header_mut().sequence_number = u32::try_from(sequence_number)?;
            page.gen_crc();
            bytes.extend(page.as_bytes());
        }
        Ok(bytes)
    }
}

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut reader = open_reader(path)?;
    let headers = Headers::read(&mut reader).map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let mut importer = Importer::new();
    let properties = if config.flags.contains(ImportFlags::PROPERTIES) {
        let file_len = reader
            .get_ref()
            .metadata()
            .map_err(|err| Error::from_io(path, err))?
            .len();
        headers
            .stream_info()
            .properties(file_len.saturating_sub(headers.audio_offset))
    } else {
        AudioProperties::default()
    };
    let comments = headers
        .vorbis_comments()
        .map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let mut metadata = Metadata::new();
    super::import_tag(&mut importer, config, &Tag::from(comments), &mut metadata);
    Ok(importer.finish_import(properties, metadata))
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_writable(path)?;
    let mut reader = BufReader::new(&mut file);
    let mut headers =
        Headers::read(&mut reader).map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let comments = headers
        .vorbis_comments()
        .map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    let (comments, rejected) =
        super::split_export_merge_metadata_to_tag(comments, config, metadata);
    super::ensure_all_exported(path, FORMAT, &rejected)?;
    let bytes = headers
        .replace_vorbis_comments(&comments)
        .and_then(|()| headers.encode_stream(&mut reader))
        .map_err(|err| Error::invalid_format(path, FORMAT, err))?;
    drop(reader);
    rewrite_file(&mut file, &bytes).map_err(|err| Error::from_io(path, err))
}

fn rewrite_file(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.rewind()?;
    file.write_all(bytes)?;
    file.set_len(bytes.len() as u64)?;
    file.flush()
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
