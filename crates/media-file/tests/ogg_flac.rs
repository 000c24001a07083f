// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use ogg_pager::{CONTAINS_FIRST_PAGE_OF_BITSTREAM, CONTAINS_LAST_PAGE_OF_BITSTREAM, Page};

use tonetag_core::{AttachedPicture, PictureType};
use tonetag_media_file::{Error, env::Environment, fmt::FileFormat};

const STREAM_SERIAL: u32 = 4711;
const SAMPLE_RATE_HZ: u32 = 48_000;
const TOTAL_SAMPLES: u32 = 96_000;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

fn first_packet() -> Vec<u8> {
    let mut packet = b"\x7fFLAC\x01\x00".to_vec();
    // A single VORBIS_COMMENT header packet follows
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet.extend_from_slice(b"fLaC");
    packet.extend_from_slice(&[0, 0, 0, 34]);
    let mut stream_info = [0; 34];
    stream_info[10] = (SAMPLE_RATE_HZ >> 12) as u8;
    stream_info[11] = (SAMPLE_RATE_HZ >> 4) as u8;
    // Mono 24-bit
    stream_info[12] = ((SAMPLE_RATE_HZ & 0x0f) as u8) << 4 | 1;
    stream_info[13] = 7 << 4;
    stream_info[14..18].copy_from_slice(&TOTAL_SAMPLES.to_be_bytes());
    packet.extend_from_slice(&stream_info);
    packet
}

fn comment_packet(comments: &[&str]) -> Vec<u8> {
    let vendor = b"reference libFLAC";
    let mut data = Vec::new();
    data.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    data.extend_from_slice(vendor);
    data.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        data.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        data.extend_from_slice(comment.as_bytes());
    }
    let mut packet = vec![0x80 | 4];
    packet.extend_from_slice(&(data.len() as u32).to_be_bytes()[1..]);
    packet.extend(data);
    packet
}

fn write_ogg_flac(path: &Path, comments: &[&str]) {
    let first_packet = first_packet();
    let comment_packet = comment_packet(comments);
    let audio_packet = [0xff, 0xf8, 0xc9, 0x08, 0x00, 0x00, 0x00, 0x00];
    let mut pages = ogg_pager::paginate(
        [first_packet.as_slice()],
        STREAM_SERIAL,
        0,
        CONTAINS_FIRST_PAGE_OF_BITSTREAM,
    )
    .unwrap();
    pages.extend(ogg_pager::paginate([comment_packet.as_slice()], STREAM_SERIAL, 0, 0).unwrap());
    pages.extend(
        ogg_pager::paginate(
            [audio_packet.as_slice()],
            STREAM_SERIAL,
            u64::from(TOTAL_SAMPLES),
            CONTAINS_LAST_PAGE_OF_BITSTREAM,
        )
        .unwrap(),
    );
    let mut bytes = Vec::new();
    for (sequence_number, page) in pages.iter_mut().enumerate() {
        page.header_mut().sequence_number = sequence_number as u32;
        page.gen_crc();
        bytes.extend(page.as_bytes());
    }
    std::fs::write(path, bytes).unwrap();
}

fn read_pages(path: &Path) -> Vec<Page> {
    let bytes = std::fs::read(path).unwrap();
    let mut reader = std::io::Cursor::new(&bytes);
    let mut pages = Vec::new();
    while (reader.position() as usize) < bytes.len() {
        pages.push(Page::read(&mut reader).unwrap());
    }
    pages
}

#[test]
fn read_ogg_flac_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.oga");
    write_ogg_flac(&path, &["TITLE=Intro", "ARTIST=Someone", "MOOD_CUSTOM=Calm"]);

    let env = Environment::default();
    let (file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(FileFormat::OggFlac, file.format());
    let properties = file.properties();
    assert_eq!(Some("Ogg FLAC"), properties.format_name.as_deref());
    assert_eq!(Some(1), properties.channel_count);
    assert_eq!(Some(24), properties.bits_per_channel);
    assert_eq!(Some(SAMPLE_RATE_HZ), properties.sample_rate_hz);
    assert_eq!(Some(u64::from(TOTAL_SAMPLES)), properties.total_frames);
    let duration_secs = properties.duration_secs.unwrap();
    assert!((duration_secs - 2.0).abs() < 0.01, "{duration_secs}");
    let metadata = file.metadata();
    assert_eq!(Some("Intro"), metadata.title());
    assert_eq!(Some("Someone"), metadata.artist());
    assert_eq!(Some("Calm"), metadata.additional_value("MOOD_CUSTOM"));
}

#[test]
fn flac_codec_is_detected_regardless_of_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.ogg");
    write_ogg_flac(&path, &["TITLE=Intro"]);

    let env = Environment::default();
    let (file, _) = env.read(&path).unwrap();
    // The handler is selected by the extension
    assert_eq!(FileFormat::OggVorbis, file.format());
    assert_eq!(
        Some("Ogg FLAC"),
        file.properties().format_name.as_deref()
    );
    assert_eq!(Some("Intro"), file.metadata().title());
}

#[test]
#[allow(clippy::float_cmp)]
fn write_and_read_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.oga");
    write_ogg_flac(&path, &["TITLE=Intro", "MOOD_CUSTOM=Calm"]);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    let metadata = file.metadata_mut();
    metadata.set_title(Some("Outro".to_owned()));
    metadata.set_album_title(Some("Album".to_owned()));
    metadata.set_track_number(Some(2));
    metadata.set_composer_sort_order(Some("Composer, The".to_owned()));
    metadata.set_replay_gain_reference_loudness(Some(-18.0));
    let mut image_data = PNG_SIGNATURE.to_vec();
    image_data.extend_from_slice(&[0; 16]);
    metadata.attach_picture(AttachedPicture::new(
        PictureType::CoverFront,
        None,
        image_data.clone(),
    ));
    env.write(&mut file).unwrap();
    assert!(!file.metadata().has_unmerged_changes());

    let (reread, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    let metadata = reread.metadata();
    assert_eq!(Some("Outro"), metadata.title());
    assert_eq!(Some("Album"), metadata.album_title());
    assert_eq!(Some(2), metadata.track_number());
    assert_eq!(Some("Composer, The"), metadata.composer_sort_order());
    assert_eq!(Some(-18.0), metadata.replay_gain_reference_loudness());
    assert_eq!(Some("Calm"), metadata.additional_value("MOOD_CUSTOM"));
    let pictures = metadata.attached_pictures().collect::<Vec<_>>();
    assert_eq!(1, pictures.len());
    assert_eq!(image_data.as_slice(), pictures[0].image_data());
    assert_eq!(Some(SAMPLE_RATE_HZ), reread.properties().sample_rate_hz);

    // Comment and picture blocks are stored in separate header pages
    let pages = read_pages(&path);
    assert_eq!(4, pages.len());
    for (sequence_number, page) in pages.iter().enumerate() {
        assert_eq!(sequence_number as u32, page.header().sequence_number);
        assert_eq!(STREAM_SERIAL, page.header().stream_serial);
    }
    assert_eq!(u64::from(TOTAL_SAMPLES), pages[3].header().abgp);
}

#[test]
fn removed_fields_are_deleted_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("removed.oga");
    write_ogg_flac(&path, &["TITLE=Intro", "ALBUM=Album"]);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    file.metadata_mut().set_album_title(None);
    env.write(&mut file).unwrap();

    let (reread, _) = env.read(&path).unwrap();
    assert_eq!(Some("Intro"), reread.metadata().title());
    assert_eq!(None, reread.metadata().album_title());
}

#[test]
fn truncated_stream_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.oga");
    write_ogg_flac(&path, &["TITLE=Intro"]);
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..100]).unwrap();

    let env = Environment::default();
    let err = env.read(&path).unwrap_err();
    assert!(
        matches!(
            err,
            Error::InvalidFormat {
                format: FileFormat::OggFlac,
                ..
            }
        ),
        "{err}"
    );
}
