// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use bitflags::bitflags;

use super::import::ImportFlags;

bitflags! {
    /// Flags for controlling the export
    ///
    /// Fields with a normalized key are always exported.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ExportFlags: u8 {
        /// Replace all embedded pictures
        ///
        /// See also: [`ImportFlags::PICTURES`]
        const PICTURES   = ImportFlags::PICTURES.bits();

        /// Replace all unmapped text items
        ///
        /// See also: [`ImportFlags::ADDITIONAL`]
        const ADDITIONAL = ImportFlags::ADDITIONAL.bits();
    }
}

impl Default for ExportFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportConfig {
    pub flags: ExportFlags,
}

impl ExportConfig {
    /// Only exports what has been imported before.
    #[must_use]
    pub fn from_import_flags(import_flags: ImportFlags) -> Self {
        Self {
            flags: ExportFlags::from_bits_truncate(import_flags.bits()),
        }
    }
}
