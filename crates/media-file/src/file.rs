// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::{Path, PathBuf};

use tonetag_core::{AudioProperties, Metadata};

use crate::{
    Error, Result,
    fmt::FileFormat,
    io::{
        export::ExportConfig,
        import::{ImportConfig, Imported, Issues},
    },
    registry::HandlerRegistry,
};

/// An audio file with its properties and editable metadata.
///
/// Nothing is read until [`AudioFile::read`] is invoked.
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
    format: FileFormat,
    properties: AudioProperties,
    metadata: Metadata,
}

impl AudioFile {
    /// Selects the handler for a file.
    ///
    /// Fails with [`Error::FormatNotRecognized`] if no registered handler
    /// matches the extension or MIME type of the file.
    pub fn open(registry: &HandlerRegistry, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let Some(descriptor) = registry.find_by_path(&path) else {
            return Err(Error::not_recognized(&path));
        };
        Ok(Self::with_format(path, descriptor.format))
    }

    /// Bypasses the handler lookup.
    #[must_use]
    pub fn with_format(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
            properties: Default::default(),
            metadata: Default::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn format(&self) -> FileFormat {
        self.format
    }

    #[must_use]
    pub const fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Replaces properties and metadata with the contents of the file.
    ///
    /// Pending changes are discarded. Recoverable problems are returned
    /// as issues.
    pub fn read(&mut self, config: &ImportConfig) -> Result<Issues> {
        let Imported {
            properties,
            metadata,
            issues,
        } = self.format.read(&self.path, config)?;
        for message in issues.messages() {
            log::info!("{}: {message}", self.path.display());
        }
        self.properties = properties;
        self.metadata = metadata;
        Ok(issues)
    }

    /// Saves the metadata into the file.
    ///
    /// Pending changes are merged after the file has been written
    /// successfully. They are kept on failure.
    pub fn write(&mut self, config: &ExportConfig) -> Result<()> {
        self.format.write(&self.path, &self.metadata, config)?;
        self.metadata.merge_changes();
        Ok(())
    }
}
