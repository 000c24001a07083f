// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Normalized metadata for audio files.
//!
//! The [`core`] crate contains the format-agnostic model. The optional
//! [`media_file`] crate reads and writes this model from and to audio files.

pub use tonetag_core as core;

#[cfg(feature = "media-file")]
pub use tonetag_media_file as media_file;
