// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::*;

#[test]
fn import_replay_gain_valid() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Float(-9.505_72)),
        importer.import_value(MetadataKey::ReplayGainTrackGain, "-9.50572 dB")
    );
    assert_eq!(
        Some(Value::Float(-9.505_72)),
        importer.import_value(MetadataKey::ReplayGainTrackGain, " -9.50572db ")
    );
    assert_eq!(
        Some(Value::Float(0.178_062)),
        importer.import_value(MetadataKey::ReplayGainAlbumGain, "  +0.178062   dB ")
    );
    assert!(importer.finish().is_empty());
}

#[test]
fn import_replay_gain_invalid() {
    let mut importer = Importer::new();
    assert!(
        importer
            .import_value(MetadataKey::ReplayGainTrackGain, "-9.50572")
            .is_none()
    );
    assert!(
        importer
            .import_value(MetadataKey::ReplayGainTrackGain, "- 9.50572 dB")
            .is_none()
    );
    assert!(
        importer
            .import_value(MetadataKey::ReplayGainAlbumGain, "+ 0.178062 dB")
            .is_none()
    );
    assert_eq!(3, importer.finish().len());
}

#[test]
fn import_replay_gain_peak() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Float(0.988_281)),
        importer.import_value(MetadataKey::ReplayGainTrackPeak, "0.988281")
    );
    assert!(
        importer
            .import_value(MetadataKey::ReplayGainAlbumPeak, "-1.0")
            .is_none()
    );
    assert_eq!(1, importer.finish().len());
}

#[test]
fn import_reference_loudness() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Float(-18.0)),
        importer.import_value(MetadataKey::ReplayGainReferenceLoudness, "-18.0 LUFS")
    );
    assert_eq!(
        Some(Value::Float(89.0)),
        importer.import_value(MetadataKey::ReplayGainReferenceLoudness, "89")
    );
    assert!(
        importer
            .import_value(MetadataKey::ReplayGainReferenceLoudness, "-18 LUFS extra")
            .is_none()
    );
    assert_eq!(1, importer.finish().len());
}

#[test]
fn import_numbers() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Integer(3)),
        importer.import_value(MetadataKey::TrackNumber, "3")
    );
    assert_eq!(
        Some(Value::Integer(1)),
        importer.import_value(MetadataKey::DiscNumber, "1/2")
    );
    assert!(
        importer
            .import_value(MetadataKey::TrackTotal, "twelve")
            .is_none()
    );
    assert!(importer.import_value(MetadataKey::TrackTotal, "-1").is_none());
    assert_eq!(2, importer.finish().len());
}

#[test]
fn import_bpm() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Integer(128)),
        importer.import_value(MetadataKey::Bpm, "128")
    );
    assert_eq!(
        Some(Value::Integer(124)),
        importer.import_value(MetadataKey::Bpm, "123.6")
    );
    // Zero is silently ignored
    assert!(importer.import_value(MetadataKey::Bpm, "0").is_none());
    assert!(importer.finish().is_empty());
}

#[test]
fn import_compilation() {
    let mut importer = Importer::new();
    assert_eq!(
        Some(Value::Boolean(true)),
        importer.import_value(MetadataKey::Compilation, "1")
    );
    assert_eq!(
        Some(Value::Boolean(false)),
        importer.import_value(MetadataKey::Compilation, "False")
    );
    assert!(
        importer
            .import_value(MetadataKey::Compilation, "maybe")
            .is_none()
    );
    assert_eq!(1, importer.finish().len());
}

#[test]
fn empty_input_is_ignored() {
    let mut importer = Importer::new();
    assert!(importer.import_value(MetadataKey::Title, " \t").is_none());
    assert!(importer.import_value(MetadataKey::Bpm, "").is_none());
    assert!(importer.finish().is_empty());
}

#[test]
fn finish_import_merges_changes() {
    let mut metadata = Metadata::new();
    metadata.set_title(Some("Title".to_owned()));
    let mut importer = Importer::new();
    importer.add_issue("Something happened");
    let imported = importer.finish_import(AudioProperties::default(), metadata);
    assert!(!imported.metadata.has_unmerged_changes());
    assert_eq!(Some("Title"), imported.metadata.title());
    assert_eq!(
        vec!["Something happened".to_owned()],
        imported.issues.into_messages()
    );
}

#[test]
fn finish_import_reports_invalid_properties() {
    let properties = AudioProperties {
        sample_rate_hz: Some(0),
        ..Default::default()
    };
    let imported = Importer::new().finish_import(properties, Metadata::new());
    assert_eq!(1, imported.issues.len());
    // The properties are kept as they are
    assert_eq!(Some(0), imported.properties.sample_rate_hz);
}

#[test]
fn default_config_imports_everything() {
    assert_eq!(ImportFlags::all(), ImportConfig::default().flags);
}
