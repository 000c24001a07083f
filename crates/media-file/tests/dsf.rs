// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::Path;

use tonetag_media_file::{ErrorCode, env::Environment, fmt::FileFormat};

const CHANNEL_COUNT: u32 = 2;
const SAMPLE_RATE_HZ: u32 = 2_822_400;
const SAMPLE_COUNT: u64 = 28_224;
const SAMPLE_DATA_LEN: usize = 64;

const HEADER_LEN: usize = 80;
const DATA_CHUNK_HEADER_LEN: usize = 12;
const UNTAGGED_FILE_LEN: u64 = (HEADER_LEN + DATA_CHUNK_HEADER_LEN + SAMPLE_DATA_LEN) as u64;

fn write_untagged_dsf(path: &Path) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"DSD ");
    bytes.extend_from_slice(&28u64.to_le_bytes());
    bytes.extend_from_slice(&UNTAGGED_FILE_LEN.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&52u64.to_le_bytes());
    // Version
    bytes.extend_from_slice(&1u32.to_le_bytes());
    // Format ID: DSD raw
    bytes.extend_from_slice(&0u32.to_le_bytes());
    // Channel type: stereo
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&CHANNEL_COUNT.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_RATE_HZ.to_le_bytes());
    // Bits per sample
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&SAMPLE_COUNT.to_le_bytes());
    // Block size per channel
    bytes.extend_from_slice(&4096u32.to_le_bytes());
    // Reserved
    bytes.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(HEADER_LEN, bytes.len());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&((DATA_CHUNK_HEADER_LEN + SAMPLE_DATA_LEN) as u64).to_le_bytes());
    bytes.resize(bytes.len() + SAMPLE_DATA_LEN, 0x69);
    std::fs::write(path, bytes).unwrap();
}

fn read_u64_le(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
}

#[test]
fn read_properties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("untagged.dsf");
    write_untagged_dsf(&path);

    let (file, issues) = Environment::default().read(&path).unwrap();
    assert!(issues.is_empty());
    assert_eq!(FileFormat::Dsf, file.format());
    let properties = file.properties();
    assert_eq!(Some("DSF"), properties.format_name.as_deref());
    assert_eq!(Some(2), properties.channel_count);
    assert_eq!(Some(SAMPLE_RATE_HZ), properties.sample_rate_hz);
    assert_eq!(Some(1), properties.bits_per_channel);
    assert_eq!(Some(SAMPLE_COUNT), properties.total_frames);
    assert_eq!(Some(5644), properties.bitrate_kbps);
    let duration_secs = properties.duration_secs.unwrap();
    assert!((duration_secs - 0.01).abs() < 1e-9, "{duration_secs}");
    assert!(file.metadata().fields().next().is_none());
}

#[test]
fn append_and_remove_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tagged.dsf");
    write_untagged_dsf(&path);

    let env = Environment::default();
    let (mut file, _) = env.read(&path).unwrap();
    file.metadata_mut().set_title(Some("DSD Title".to_owned()));
    file.metadata_mut().set_disc_number(Some(2));
    env.write(&mut file).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64, read_u64_le(&bytes, 12));
    assert_eq!(UNTAGGED_FILE_LEN, read_u64_le(&bytes, 20));
    assert_eq!(b"ID3", &bytes[UNTAGGED_FILE_LEN as usize..][..3]);

    let (mut file, issues) = env.read(&path).unwrap();
    assert!(issues.is_empty());
    assert_eq!(Some("DSD Title"), file.metadata().title());
    assert_eq!(Some(2), file.metadata().disc_number());
    // Samples are untouched
    assert_eq!(Some(SAMPLE_COUNT), file.properties().total_frames);

    // Replacing the tag does not accumulate stale data
    file.metadata_mut().set_title(Some("Other".to_owned()));
    env.write(&mut file).unwrap();
    let (file, _) = env.read(&path).unwrap();
    assert_eq!(Some("Other"), file.metadata().title());
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(UNTAGGED_FILE_LEN, read_u64_le(&bytes, 20));

    let mut file = file;
    file.metadata_mut().clear();
    env.write(&mut file).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(UNTAGGED_FILE_LEN, bytes.len() as u64);
    assert_eq!(UNTAGGED_FILE_LEN, read_u64_le(&bytes, 12));
    assert_eq!(0, read_u64_le(&bytes, 20));
}

#[test]
fn invalid_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.dsf");
    std::fs::write(&path, b"DSD not really").unwrap();

    let err = Environment::default().read(&path).unwrap_err();
    assert_eq!(ErrorCode::InvalidFormat, err.code());
    assert_eq!("invalid.dsf", err.display_name());
}
