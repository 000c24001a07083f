// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use tonetag_core::{AttachedPicture, PictureType};
use tonetag_media_file::{env::Environment, fmt::FileFormat};

const CHANNEL_COUNT: u16 = 2;
const SAMPLE_RATE_HZ: u32 = 44_100;
const BITS_PER_SAMPLE: u16 = 16;
const FRAME_COUNT: u32 = 4_410;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Writes 100 ms of silence.
fn write_silent_wav(path: &Path) {
    let block_align = CHANNEL_COUNT * (BITS_PER_SAMPLE / 8);
    let data_len = FRAME_COUNT * u32::from(block_align);
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&CHANNEL_COUNT.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE_HZ.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE_HZ * u32::from(block_align)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(bytes.len() + data_len as usize, 0);
    std::fs::write(path, bytes).unwrap();
}

#[test]
fn read_properties_of_untagged_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("silence.wav");
    write_silent_wav(&path);

    let env = Environment::default();
    let (file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty());
    assert_eq!(FileFormat::Wav, file.format());
    let properties = file.properties();
    assert_eq!(Some("WAVE"), properties.format_name.as_deref());
    assert_eq!(Some(CHANNEL_COUNT), properties.channel_count);
    assert_eq!(Some(SAMPLE_RATE_HZ), properties.sample_rate_hz);
    assert_eq!(Some(BITS_PER_SAMPLE), properties.bits_per_channel);
    let duration_secs = properties.duration_secs.unwrap();
    assert!((duration_secs - 0.1).abs() < 0.01, "{duration_secs}");
    assert!(file.metadata().fields().next().is_none());
    assert!(!file.metadata().has_unmerged_changes());
}

#[test]
#[allow(clippy::float_cmp)]
fn write_and_read_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.wav");
    write_silent_wav(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    let metadata = file.metadata_mut();
    metadata.set_title(Some("Title".to_owned()));
    metadata.set_artist(Some("Artist".to_owned()));
    metadata.set_track_number(Some(7));
    metadata.set_compilation(Some(true));
    metadata.set_genre_sort_order(Some("Electronic".to_owned()));
    metadata.set_replay_gain_track_gain(Some(-6.5));
    let mut image_data = PNG_SIGNATURE.to_vec();
    image_data.extend_from_slice(&[0; 16]);
    metadata.attach_picture(AttachedPicture::new(
        PictureType::CoverFront,
        Some("Cover".to_owned()),
        image_data.clone(),
    ));
    assert!(metadata.has_unmerged_changes());
    env.write(&mut file).unwrap();
    assert!(!file.metadata().has_unmerged_changes());

    let (reread, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    let metadata = reread.metadata();
    assert_eq!(Some("Title"), metadata.title());
    assert_eq!(Some("Artist"), metadata.artist());
    assert_eq!(Some(7), metadata.track_number());
    assert_eq!(Some(true), metadata.compilation());
    assert_eq!(Some("Electronic"), metadata.genre_sort_order());
    assert_eq!(Some(-6.5), metadata.replay_gain_track_gain());
    let pictures = metadata.attached_pictures().collect::<Vec<_>>();
    assert_eq!(1, pictures.len());
    assert_eq!(PictureType::CoverFront, pictures[0].picture_type());
    assert_eq!(image_data.as_slice(), pictures[0].image_data());
    // Audio properties are not affected
    assert_eq!(Some(SAMPLE_RATE_HZ), reread.properties().sample_rate_hz);
}

#[test]
fn removed_fields_are_deleted_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("removed.wav");
    write_silent_wav(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    file.metadata_mut().set_title(Some("Title".to_owned()));
    file.metadata_mut().set_album_title(Some("Album".to_owned()));
    env.write(&mut file).unwrap();

    file.metadata_mut().set_album_title(None);
    env.write(&mut file).unwrap();

    let (reread, _) = env.read(&path).unwrap();
    assert_eq!(Some("Title"), reread.metadata().title());
    assert_eq!(None, reread.metadata().album_title());
}
