// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{borrow::Cow, io::Seek as _, path::Path};

use lofty::{
    config::WriteOptions,
    file::AudioFile as _,
    mp4::{Atom, AtomData, AtomIdent, Ilst, Mp4File},
};

use tonetag_core::{Metadata, MetadataKey, Value};

use super::{FileFormat, open_reader, open_writable, parse_options};
use crate::{
    Error, Result,
    io::{
        export::ExportConfig,
        import::{ImportConfig, ImportFlags, Imported, Importer},
    },
    util::format_value,
};

const FORMAT: FileFormat = FileFormat::Mp4;

const FREEFORM_MEAN: &str = "com.apple.iTunes";

/// Fields that are stored in freeform atoms without a generic item.
const FREEFORM_KEYS: [(MetadataKey, &str); 2] = [
    (MetadataKey::GenreSortOrder, "GENRESORT"),
    (
        MetadataKey::ReplayGainReferenceLoudness,
        "replaygain_reference_loudness",
    ),
];

const fn freeform_ident(name: &'static str) -> AtomIdent<'static> {
    AtomIdent::Freeform {
        mean: Cow::Borrowed(FREEFORM_MEAN),
        name: Cow::Borrowed(name),
    }
}

pub(super) fn is_managed_freeform(key: &str) -> bool {
    let Some(name) = key
        .strip_prefix("----:")
        .and_then(|key| key.strip_prefix(FREEFORM_MEAN))
        .and_then(|key| key.strip_prefix(':'))
    else {
        return false;
    };
    FREEFORM_KEYS
        .iter()
        .any(|(_, freeform_name)| freeform_name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Default)]
struct Import {
    values: Vec<(MetadataKey, Value)>,
}

impl Import {
    fn build(importer: &mut Importer, config: &ImportConfig, ilst: &Ilst) -> Self {
        debug_assert!(config.flags.contains(ImportFlags::METADATA));
        let mut values = Vec::with_capacity(FREEFORM_KEYS.len());
        for (key, name) in FREEFORM_KEYS {
            let Some(data) = ilst
                .get(&freeform_ident(name))
                .and_then(|atom| atom.data().next())
            else {
                continue;
            };
            match data {
                AtomData::UTF8(input) => {
                    if let Some(value) = importer.import_value(key, input) {
                        values.push((key, value));
                    }
                }
                data => {
                    importer.add_issue(format!("Unexpected data for {key}: {data:?}"));
                }
            }
        }
        Self { values }
    }

    fn finish(self, metadata: &mut Metadata) {
        let Self { values } = self;
        for (key, value) in values {
            metadata.set(key, Some(value));
        }
    }
}

pub(crate) fn import_from_path(path: &Path, config: &ImportConfig) -> Result<Imported> {
    let mut reader = open_reader(path)?;
    let mp4_file = Mp4File::read_from(&mut reader, parse_options())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))?;
    let mut importer = Importer::new();

    // Pre-processing
    let import = config
        .flags
        .contains(ImportFlags::METADATA)
        .then(|| mp4_file.ilst())
        .flatten()
        .map(|ilst| Import::build(&mut importer, config, ilst));

    // Import generic metadata
    let (properties, mut metadata) =
        super::import_tagged_file(&mut importer, config, FORMAT, mp4_file.into());

    // Post-processing
    if let Some(import) = import {
        import.finish(&mut metadata);
    }

    Ok(importer.finish_import(properties, metadata))
}

#[must_use]
fn export_metadata_to_ilst(
    ilst: &mut Ilst,
    config: &ExportConfig,
    metadata: &Metadata,
) -> Vec<String> {
    let (merged, rejected) =
        super::split_export_merge_metadata_to_tag(std::mem::take(ilst), config, metadata);
    *ilst = merged;

    // Post-processing: Export fields without a generic item
    for (key, name) in FREEFORM_KEYS {
        let ident = freeform_ident(name);
        if let Some(value) = metadata.get(key) {
            ilst.insert(Atom::new(ident, AtomData::UTF8(format_value(key, value))));
        } else {
            ilst.remove(&ident).for_each(drop);
        }
    }
    rejected
}

pub(crate) fn export_to_path(path: &Path, metadata: &Metadata, config: &ExportConfig) -> Result<()> {
    let mut file = open_writable(path)?;
    let mut mp4_file = Mp4File::read_from(&mut file, parse_options())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))?;

    let mut ilst = mp4_file.ilst_mut().map(std::mem::take).unwrap_or_default();
    let rejected = export_metadata_to_ilst(&mut ilst, config, metadata);
    super::ensure_all_exported(path, FORMAT, &rejected)?;
    mp4_file.set_ilst(ilst);

    file.rewind().map_err(|err| Error::from_io(path, err))?;
    mp4_file
        .save_to(&mut file, WriteOptions::default())
        .map_err(|err| Error::from_lofty(path, FORMAT, err))
}
