// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::*;

#[test]
fn verify_command() {
    new_command().debug_assert();
}

#[test]
fn parse_assignments() {
    assert_eq!(
        (MetadataKey::Title, Value::Text("Intro = Outro".to_owned())),
        parse_assignment("Title=Intro = Outro").unwrap()
    );
    assert_eq!(
        (MetadataKey::TrackNumber, Value::Integer(3)),
        parse_assignment("TrackNumber=3").unwrap()
    );
    assert!(parse_assignment("TrackNumber=three").is_err());
    assert!(parse_assignment("Title").is_err());
    assert!(parse_assignment("NoSuchKey=1").is_err());
}

#[test]
#[allow(clippy::float_cmp)]
fn parse_replay_gain_with_unit() {
    let (key, value) = parse_assignment("ReplayGainTrackGain=-6.50 dB").unwrap();
    assert_eq!(MetadataKey::ReplayGainTrackGain, key);
    assert_eq!(Value::Float(-6.5), value);
    assert!(parse_assignment("ReplayGainAlbumGain=-6.50 dB trailing").is_err());
}

#[test]
fn parse_kinds_of_metadata() {
    assert_eq!(
        MetadataKind::BASIC | MetadataKind::REPLAY_GAIN,
        parse_kinds(["basic", "replay-gain"]).unwrap()
    );
    assert_eq!(
        MetadataKind::ATTACHED_PICTURES,
        parse_kinds([" Attached-Pictures "]).unwrap()
    );
    assert!(parse_kinds(["everything"]).is_err());
}

#[test]
fn app_config_dir_ends_with_app_name() {
    if let Some(config_dir) = app_config_dir() {
        assert!(config_dir.ends_with(app_name()));
    }
}
