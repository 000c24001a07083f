// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use tonetag_media_file::{env::Environment, fmt::FileFormat};

const SAMPLE_RATE_HZ: u32 = 48_000;
const SAMPLE_COUNT: u32 = 96_000;

fn write_untagged_tta(path: &Path) {
    let mut bytes = b"TTA1".to_vec();
    // Format: simple
    bytes.extend_from_slice(&1u16.to_le_bytes());
    // Channels
    bytes.extend_from_slice(&2u16.to_le_bytes());
    // Bits per sample
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE_HZ.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_COUNT.to_le_bytes());
    // CRC32 (not verified)
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.resize(bytes.len() + 1024, 0);
    std::fs::write(path, bytes).unwrap();
}

#[test]
#[allow(clippy::float_cmp)]
fn read_properties_and_write_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("track.tta");
    write_untagged_tta(&path);

    let env = Environment::default();
    let (mut file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty());
    assert_eq!(FileFormat::TrueAudio, file.format());
    let properties = file.properties();
    assert_eq!(Some(2), properties.channel_count);
    assert_eq!(Some(24), properties.bits_per_channel);
    assert_eq!(Some(SAMPLE_RATE_HZ), properties.sample_rate_hz);
    assert_eq!(Some(2.0), properties.duration_secs);

    file.metadata_mut().set_album_title(Some("Album".to_owned()));
    file.metadata_mut().set_bpm(Some(128));
    env.write(&mut file).unwrap();
    assert_eq!(b"ID3", &std::fs::read(&path).unwrap()[..3]);

    let (file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty());
    assert_eq!(Some("Album"), file.metadata().album_title());
    assert_eq!(Some(128), file.metadata().bpm());
    // The header is still found behind the tag
    assert_eq!(Some(SAMPLE_RATE_HZ), file.properties().sample_rate_hz);
}
