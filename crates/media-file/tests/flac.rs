// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use tonetag_core::{AttachedPicture, Metadata, MetadataKey, PictureType, Value};
use tonetag_media_file::{env::Environment, fmt::FileFormat};

const SAMPLE_RATE_HZ: u32 = 44_100;
const TOTAL_SAMPLES: u32 = 88_200;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Stereo 16-bit STREAMINFO of 2 seconds.
fn stream_info() -> [u8; 34] {
    let mut block = [0; 34];
    block[0..2].copy_from_slice(&4096u16.to_be_bytes());
    block[2..4].copy_from_slice(&4096u16.to_be_bytes());
    block[10] = (SAMPLE_RATE_HZ >> 12) as u8;
    block[11] = (SAMPLE_RATE_HZ >> 4) as u8;
    // 2 channels and 16 bits per sample
    block[12] = ((SAMPLE_RATE_HZ & 0x0f) as u8) << 4 | 1 << 1;
    block[13] = 15 << 4;
    block[14..18].copy_from_slice(&TOTAL_SAMPLES.to_be_bytes());
    block
}

/// Writes a FLAC file without any tags.
fn write_untagged_flac(path: &Path) {
    let mut bytes = b"fLaC".to_vec();
    // Last metadata block
    bytes.extend_from_slice(&[0x80, 0, 0, 34]);
    bytes.extend_from_slice(&stream_info());
    // Some frame data
    bytes.extend_from_slice(&[0xff, 0xf8, 0x69, 0x18]);
    bytes.resize(bytes.len() + 256, 0);
    std::fs::write(path, bytes).unwrap();
}

fn all_fields() -> Vec<(MetadataKey, Value)> {
    use MetadataKey::*;
    let text = |text: &str| Value::Text(text.to_owned());
    vec![
        (Title, text("Title")),
        (AlbumTitle, text("Album")),
        (Artist, text("Artist")),
        (AlbumArtist, text("Album Artist")),
        (Genre, text("Jazz")),
        (Composer, text("Composer")),
        (ReleaseDate, text("2024-05-01")),
        (Compilation, Value::Boolean(true)),
        (TrackNumber, Value::Integer(3)),
        (TrackTotal, Value::Integer(12)),
        (DiscNumber, Value::Integer(1)),
        (DiscTotal, Value::Integer(2)),
        (Lyrics, text("La la la")),
        (Bpm, Value::Integer(128)),
        (Rating, Value::Integer(196)),
        (Comment, text("Recorded live")),
        (Mcn, text("0724384960650")),
        (Isrc, text("USRC17607839")),
        (
            MusicBrainzReleaseId,
            text("8a3a5a1e-6f23-4c12-9d0b-0d8f6a3e7b11"),
        ),
        (
            MusicBrainzRecordingId,
            text("f1c3c7b0-52b9-4a5d-8d8e-2c8b3f7e9a42"),
        ),
        (TitleSortOrder, text("Title, The")),
        (AlbumTitleSortOrder, text("Album, The")),
        (ArtistSortOrder, text("Artist, The")),
        (AlbumArtistSortOrder, text("Album Artist, The")),
        (ComposerSortOrder, text("Composer, The")),
        (GenreSortOrder, text("Jazz, Modern")),
        (Grouping, text("Live Sets")),
        (ReplayGainReferenceLoudness, Value::Float(-18.0)),
        (ReplayGainTrackGain, Value::Float(-6.5)),
        (ReplayGainTrackPeak, Value::Float(0.988_281_25)),
        (ReplayGainAlbumGain, Value::Float(-7.25)),
        (ReplayGainAlbumPeak, Value::Float(0.5)),
    ]
}

fn set_all_fields(metadata: &mut Metadata) {
    for (key, value) in all_fields() {
        metadata.set(key, Some(value));
    }
}

#[test]
fn read_properties_of_untagged_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("untagged.flac");
    write_untagged_flac(&path);

    let env = Environment::default();
    let (file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(FileFormat::Flac, file.format());
    let properties = file.properties();
    assert_eq!(Some("FLAC"), properties.format_name.as_deref());
    assert_eq!(Some(2), properties.channel_count);
    assert_eq!(Some(16), properties.bits_per_channel);
    assert_eq!(Some(SAMPLE_RATE_HZ), properties.sample_rate_hz);
    let duration_secs = properties.duration_secs.unwrap();
    assert!((duration_secs - 2.0).abs() < 0.01, "{duration_secs}");
    assert!(file.metadata().fields().next().is_none());
}

#[test]
fn all_fields_survive_a_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("all.flac");
    write_untagged_flac(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    set_all_fields(file.metadata_mut());
    let mut image_data = PNG_SIGNATURE.to_vec();
    image_data.extend_from_slice(&[0; 16]);
    file.metadata_mut().attach_picture(AttachedPicture::new(
        PictureType::CoverFront,
        Some("Cover".to_owned()),
        image_data.clone(),
    ));
    env.write(&mut file).unwrap();

    let (reread, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
    let metadata = reread.metadata();
    for (key, value) in all_fields() {
        assert_eq!(Some(&value), metadata.get(key), "{key}");
    }
    let pictures = metadata.attached_pictures().collect::<Vec<_>>();
    assert_eq!(1, pictures.len());
    assert_eq!(PictureType::CoverFront, pictures[0].picture_type());
    assert_eq!(Some("Cover"), pictures[0].description());
    assert_eq!(image_data.as_slice(), pictures[0].image_data());
}

#[test]
fn unknown_items_are_preserved_when_editing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unknown.flac");
    write_untagged_flac(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    file.metadata_mut().set_title(Some("Before".to_owned()));
    file.metadata_mut()
        .set_additional_value("MOOD_CUSTOM", Some("Calm".to_owned()));
    env.write(&mut file).unwrap();

    let (mut file, _) = env.read(&path).unwrap();
    assert_eq!(Some("Calm"), file.metadata().additional_value("MOOD_CUSTOM"));
    file.metadata_mut().set_title(Some("After".to_owned()));
    env.write(&mut file).unwrap();

    let (reread, _) = env.read(&path).unwrap();
    assert_eq!(Some("After"), reread.metadata().title());
    assert_eq!(
        Some("Calm"),
        reread.metadata().additional_value("MOOD_CUSTOM")
    );
}

#[test]
fn removed_fields_are_deleted_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("removed.flac");
    write_untagged_flac(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    set_all_fields(file.metadata_mut());
    env.write(&mut file).unwrap();

    let (mut file, _) = env.read(&path).unwrap();
    for (key, _) in all_fields() {
        if key != MetadataKey::Title {
            file.metadata_mut().set(key, None);
        }
    }
    env.write(&mut file).unwrap();

    let (reread, _) = env.read(&path).unwrap();
    let fields = reread.metadata().fields().collect::<Vec<_>>();
    assert_eq!(
        vec![(MetadataKey::Title, &Value::Text("Title".to_owned()))],
        fields
    );
}

#[test]
fn additional_items_with_invalid_names_fail_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.flac");
    write_untagged_flac(&path);
    let before = std::fs::read(&path).unwrap();

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    file.metadata_mut().set_title(Some("Title".to_owned()));
    file.metadata_mut()
        .set_additional_value("KEY=VALUE", Some("Value".to_owned()));
    let err = env.write(&mut file).unwrap_err();
    assert!(
        matches!(
            err,
            tonetag_media_file::Error::FormatNotSupported {
                format: FileFormat::Flac,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(before, std::fs::read(&path).unwrap());
    assert!(file.metadata().has_unmerged_changes());
}
