// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

/// Detects the MIME type of encoded image data from its signature.
#[must_use]
pub fn mime_type_of(image_data: &[u8]) -> Option<&'static str> {
    image::guess_format(image_data)
        .ok()
        .map(|format| format.to_mime_type())
}

/// Detects the image format and decodes the dimensions.
///
/// Returns `None` if the data could not be decoded.
#[must_use]
pub fn dimensions_of(image_data: &[u8]) -> Option<(u32, u32)> {
    let format = image::guess_format(image_data).ok()?;
    match image::load_from_memory_with_format(image_data, format) {
        Ok(image) => Some((image.width(), image.height())),
        Err(err) => {
            log::debug!("Failed to decode {format:?} image: {err}");
            None
        }
    }
}
