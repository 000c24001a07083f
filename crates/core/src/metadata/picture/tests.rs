// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use strum::IntoEnumIterator as _;

use super::*;

#[test]
fn picture_type_codes() {
    for picture_type in PictureType::iter() {
        assert_eq!(picture_type, PictureType::from_code(picture_type.code()));
    }
    assert_eq!(PictureType::CoverFront, PictureType::from_code(3));
    assert_eq!(PictureType::Other, PictureType::from_code(0x15));
    assert_eq!(PictureType::Other, PictureType::from_code(0xFF));
}

#[test]
fn edit_and_revert() {
    let mut picture = AttachedPicture::new(PictureType::CoverFront, None, vec![1, 2, 3]);
    assert!(!picture.has_changes());
    assert!(picture.is_valid());

    picture.set_picture_type(PictureType::CoverBack);
    picture.set_description(Some("back".to_owned()));
    assert!(picture.has_changes());
    assert_eq!(PictureType::CoverBack, picture.picture_type());
    assert_eq!(Some("back"), picture.description());

    picture.revert_changes();
    assert!(!picture.has_changes());
    assert_eq!(PictureType::CoverFront, picture.picture_type());
    assert_eq!(None, picture.description());
    assert_eq!(&[1, 2, 3], picture.image_data());
}

#[test]
fn edit_and_merge() {
    let mut picture =
        AttachedPicture::new(PictureType::Media, Some("disc".to_owned()), vec![1, 2, 3]);
    picture.set_description(None);
    picture.set_image_data(vec![4, 5]);
    picture.merge_changes();
    assert!(!picture.has_changes());
    assert_eq!(None, picture.description());
    assert_eq!(&[4, 5], picture.image_data());
}

#[test]
fn restoring_the_saved_value_is_not_a_change() {
    let mut picture = AttachedPicture::new(PictureType::Icon, None, vec![1]);
    picture.set_picture_type(PictureType::Artist);
    picture.set_picture_type(PictureType::Icon);
    assert!(!picture.has_changes());
}

#[test]
fn equality_considers_visible_properties() {
    let saved = AttachedPicture::new(PictureType::CoverFront, None, vec![1, 2, 3]);
    let mut edited = AttachedPicture::new(PictureType::Other, None, vec![1, 2, 3]);
    assert_ne!(saved, edited);
    edited.set_picture_type(PictureType::CoverFront);
    assert!(edited.has_changes());
    assert_eq!(saved, edited);
}

#[test]
fn empty_image_data_is_invalid() {
    let picture = AttachedPicture::new(PictureType::CoverFront, None, Vec::new());
    assert!(!picture.is_valid());
}
