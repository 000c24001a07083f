// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use crate::{
    Result,
    file::AudioFile,
    io::{
        export::ExportConfig,
        import::{ImportConfig, Issues},
    },
    registry::HandlerRegistry,
};

/// The application context for accessing audio files.
///
/// Owns the handler registry and the default configurations.
#[derive(Debug, Clone)]
pub struct Environment {
    registry: HandlerRegistry,
    import_config: ImportConfig,
    export_config: ExportConfig,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(
            HandlerRegistry::with_default_handlers(),
            Default::default(),
            Default::default(),
        )
    }
}

impl Environment {
    #[must_use]
    pub fn new(
        registry: HandlerRegistry,
        import_config: ImportConfig,
        export_config: ExportConfig,
    ) -> Self {
        log::debug!(
            "Setting up environment with {count} handler registration(s)",
            count = registry.registrations().len()
        );
        Self {
            registry,
            import_config,
            export_config,
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Registrations could be added at any time.
    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    #[must_use]
    pub const fn import_config(&self) -> &ImportConfig {
        &self.import_config
    }

    #[must_use]
    pub const fn export_config(&self) -> &ExportConfig {
        &self.export_config
    }

    /// Selects the handler for a file without reading it.
    pub fn open(&self, path: impl Into<PathBuf>) -> Result<AudioFile> {
        AudioFile::open(&self.registry, path)
    }

    /// Opens and reads a file with the default import configuration.
    pub fn read(&self, path: impl Into<PathBuf>) -> Result<(AudioFile, Issues)> {
        let mut file = self.open(path)?;
        let issues = file.read(&self.import_config)?;
        Ok((file, issues))
    }

    /// Saves a file with the default export configuration.
    pub fn write(&self, file: &mut AudioFile) -> Result<()> {
        file.write(&self.export_config)
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
