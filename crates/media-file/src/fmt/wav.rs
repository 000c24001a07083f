// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{io::Seek as _, path::Path};

use lofty::{config::WriteOptions, file::AudioFile as _, iff::wav::WavFile};

use tonetag_core::Metadata;

use super::{
    FileFormat,
    id3v2::{Import, export_metadata_to_tag},
    open_reader, open_writable, parse_options,
};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
};

const FORMAT: FileFormat = FileFormat::Wav;

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut reader = open_reader(path)?;
    let wav_file = WavFile::read_from(&mut reader, parse_options())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))?;
    let mut importer = Importer::new();

    // Pre-processing
    let import = config
        .flags
        .contains(ImportFlags::METADATA)
        .then(|| wav_file.id3v2())
        .flatten()
        .map(|tag| Import::build(&mut importer, config, tag));

    // Import generic metadata
    let (properties, mut metadata) =
        super::import_tagged_file(&mut importer, config, FORMAT, wav_file.into());

    // Post-processing
    if let Some(import) = import {
        import.finish(&mut metadata);
    }

    Ok(importer.finish_import(properties, metadata))
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_writable(path)?;
    let mut wav_file = WavFile::read_from(&mut file, parse_options())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))?;

    let mut id3v2 = wav_file
        .id3v2_mut()
        .map(std::mem::take)
        .unwrap_or_default();
    let rejected = export_metadata_to_tag(&mut id3v2, config, metadata);
    super::ensure_all_exported(path, FORMAT, &rejected)?;
    wav_file.set_id3v2(id3v2);

    file.rewind().map_err(|err| Error::from_io(path, err))?;
    wav_file
        .save_to(&mut file, WriteOptions::default())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))
}
