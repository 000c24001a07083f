// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr as _,
};

use serde::{Deserialize, Serialize};

use tonetag_media_file::{
    env::Environment,
    fmt::FileFormat,
    io::{
        export::{ExportConfig, ExportFlags},
        import::{ImportConfig, ImportFlags},
    },
    registry::HandlerRegistry,
};

pub(crate) const FILE_NAME: &str = "tonetag_settings";

pub(crate) const FILE_SUFFIX: &str = "ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ImportSettings {
    pub(crate) properties: bool,
    pub(crate) pictures: bool,
    pub(crate) additional: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            properties: true,
            pictures: true,
            additional: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ExportSettings {
    pub(crate) pictures: bool,
    pub(crate) additional: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            pictures: true,
            additional: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) import: ImportSettings,

    pub(crate) export: ExportSettings,

    /// Handler priorities keyed by format identifier, e.g. `"mpeg"`.
    ///
    /// Formats that are not listed use the default priority.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub(crate) handler_priorities: BTreeMap<String, i32>,
}

#[must_use]
pub(crate) fn new_settings_file_path(mut parent_dir: PathBuf) -> PathBuf {
    parent_dir.push(FILE_NAME);
    parent_dir.set_extension(FILE_SUFFIX);
    parent_dir
}

impl Settings {
    /// Loads the settings or falls back to the defaults.
    ///
    /// A missing settings file is created with the defaults.
    #[must_use]
    pub(crate) fn restore_from_parent_dir(parent_dir: &Path) -> Self {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        let exists = file_path.exists();
        let settings = Self::load(parent_dir)
            .map_err(|err| {
                log::warn!("Failed to load saved settings: {err:#}");
            })
            .unwrap_or_default();
        if !exists && let Err(err) = settings.save(parent_dir) {
            log::warn!("Failed to save default settings: {err:#}");
        }
        settings
    }

    pub(crate) fn load(parent_dir: &Path) -> anyhow::Result<Self> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::debug!("Loading settings from file: {}", file_path.display());
        match fs::read_to_string(&file_path) {
            Ok(text) => ron::from_str(&text).map_err(Into::into),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Default::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn save(&self, parent_dir: &Path) -> anyhow::Result<()> {
        let file_path = new_settings_file_path(parent_dir.to_path_buf());
        log::info!("Saving settings into file: {}", file_path.display());
        let text = ron::ser::to_string_pretty(self, Default::default())?;
        if let Some(parent_path) = file_path.parent() {
            fs::create_dir_all(parent_path)?;
        }
        fs::write(&file_path, text)?;
        Ok(())
    }

    #[must_use]
    pub(crate) fn import_config(&self) -> ImportConfig {
        let Self {
            import:
                ImportSettings {
                    properties,
                    pictures,
                    additional,
                },
            ..
        } = self;
        let mut flags = ImportFlags::METADATA;
        flags.set(ImportFlags::PROPERTIES, *properties);
        flags.set(ImportFlags::PICTURES, *pictures);
        flags.set(ImportFlags::ADDITIONAL, *additional);
        ImportConfig { flags }
    }

    /// Only exports what has been imported.
    #[must_use]
    pub(crate) fn export_config(&self) -> ExportConfig {
        let ExportConfig { mut flags } = ExportConfig::from_import_flags(self.import_config().flags);
        if !self.export.pictures {
            flags.remove(ExportFlags::PICTURES);
        }
        if !self.export.additional {
            flags.remove(ExportFlags::ADDITIONAL);
        }
        ExportConfig { flags }
    }

    /// The priority of a format's handler.
    #[must_use]
    pub(crate) fn handler_priority(&self, format: FileFormat) -> i32 {
        self.handler_priorities
            .get(format.id())
            .copied()
            .unwrap_or(HandlerRegistry::DEFAULT_PRIORITY)
    }

    #[must_use]
    pub(crate) fn build_environment(&self) -> Environment {
        for format_id in self.handler_priorities.keys() {
            if FileFormat::from_str(format_id).is_err() {
                log::warn!("Ignoring priority of unknown format \"{format_id}\"");
            }
        }
        let registry =
            HandlerRegistry::with_default_handlers_prioritized(|format| self.handler_priority(format));
        Environment::new(registry, self.import_config(), self.export_config())
    }
}
