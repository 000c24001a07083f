// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr as _,
};

use anyhow::{Context as _, anyhow, bail};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use data_encoding::BASE64;
use directories::ProjectDirs;
use log::LevelFilter;
use serde_json::json;

use tonetag_core::{Metadata, MetadataKey, MetadataKind, Value};
use tonetag_media_file::{
    env::Environment,
    file::AudioFile,
    util::{parse_replay_gain_db, picture},
};

mod settings;
use self::settings::Settings;

/// Default log level for debug builds.
#[cfg(debug_assertions)]
const DEFAULT_LOG_FILTER_LEVEL: LevelFilter = LevelFilter::Info;

/// Reduce log verbosity for release builds.
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_FILTER_LEVEL: LevelFilter = LevelFilter::Warn;

const SHOW_CMD: &str = "show";
const SET_CMD: &str = "set";
const COPY_CMD: &str = "copy";
const FORMATS_CMD: &str = "formats";

const FILE_ARG: &str = "file";
const SOURCE_ARG: &str = "source";
const TARGET_ARG: &str = "target";
const WITH_PICTURE_DATA_ARG: &str = "with-picture-data";
const KEY_ARG: &str = "key";
const REMOVE_ARG: &str = "remove";
const KIND_ARG: &str = "kind";

fn new_command() -> Command {
    Command::new(app_name())
        .about("Inspects and edits the metadata of audio files")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(SHOW_CMD)
                .about("Prints audio properties and metadata as JSON")
                .arg(
                    Arg::new(FILE_ARG)
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new(WITH_PICTURE_DATA_ARG)
                        .long(WITH_PICTURE_DATA_ARG)
                        .action(ArgAction::SetTrue)
                        .help("Include the Base64-encoded image data of pictures"),
                ),
        )
        .subcommand(
            Command::new(SET_CMD)
                .about("Edits fields and writes them back into the file")
                .arg(
                    Arg::new(FILE_ARG)
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new(KEY_ARG)
                        .long(KEY_ARG)
                        .value_name("NAME=VALUE")
                        .action(ArgAction::Append)
                        .help("Set a field, e.g. --key Title=Intro"),
                )
                .arg(
                    Arg::new(REMOVE_ARG)
                        .long(REMOVE_ARG)
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Remove a field"),
                ),
        )
        .subcommand(
            Command::new(COPY_CMD)
                .about("Copies metadata from one file into another")
                .arg(
                    Arg::new(SOURCE_ARG)
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new(TARGET_ARG)
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new(KIND_ARG)
                        .long(KIND_ARG)
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help(
                            "Kinds of metadata: basic, sorting, grouping, additional, \
                             replay-gain, attached-pictures (default: all)",
                        ),
                ),
        )
        .subcommand(Command::new(FORMATS_CMD).about("Lists the supported formats by priority"))
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(DEFAULT_LOG_FILTER_LEVEL)
        // Parse environment variables after configuring all default option(s).
        .parse_default_env()
        .init();

    let matches = new_command().get_matches();

    let settings = if let Some(config_dir) = app_config_dir() {
        Settings::restore_from_parent_dir(&config_dir)
    } else {
        log::warn!("Config directory is unavailable");
        Settings::default()
    };
    let env = settings.build_environment();

    match run(&env, &matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(env: &Environment, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some((SHOW_CMD, matches)) => {
            let with_picture_data = matches.get_flag(WITH_PICTURE_DATA_ARG);
            let files = matches
                .get_many::<PathBuf>(FILE_ARG)
                .into_iter()
                .flatten()
                .map(|path| show_file(env, path, with_picture_data))
                .collect::<anyhow::Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Some((SET_CMD, matches)) => {
            let path = required_path(matches, FILE_ARG)?;
            let (mut file, _) = read_file(env, path)?;
            for assignment in matches.get_many::<String>(KEY_ARG).into_iter().flatten() {
                let (key, value) = parse_assignment(assignment)?;
                file.metadata_mut().set(key, Some(value));
            }
            for name in matches.get_many::<String>(REMOVE_ARG).into_iter().flatten() {
                let key = parse_key(name)?;
                file.metadata_mut().set(key, None);
            }
            write_file(env, &mut file)?;
        }
        Some((COPY_CMD, matches)) => {
            let source_path = required_path(matches, SOURCE_ARG)?;
            let target_path = required_path(matches, TARGET_ARG)?;
            let kinds = matches
                .get_many::<String>(KIND_ARG)
                .map(|names| parse_kinds(names.map(String::as_str)))
                .transpose()?
                .unwrap_or_default();
            let (source, _) = read_file(env, source_path)?;
            let (mut target, _) = read_file(env, target_path)?;
            target
                .metadata_mut()
                .copy_metadata_of_kind(source.metadata(), kinds);
            write_file(env, &mut target)?;
        }
        Some((FORMATS_CMD, _)) => {
            for registration in env.registry().registrations() {
                let descriptor = &registration.descriptor;
                println!(
                    "{priority:>4}  {id:<16}  {name:<16}  {extensions}",
                    priority = registration.priority,
                    id = descriptor.format.id(),
                    name = descriptor.format.name(),
                    extensions = descriptor.extensions.join(", "),
                );
            }
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

fn required_path<'a>(matches: &'a ArgMatches, id: &str) -> anyhow::Result<&'a Path> {
    matches
        .get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .ok_or_else(|| anyhow!("missing argument <{id}>"))
}

fn read_file(env: &Environment, path: &Path) -> anyhow::Result<(AudioFile, Vec<String>)> {
    let (file, issues) = env
        .read(path)
        .with_context(|| format!("failed to read \"{}\"", path.display()))?;
    Ok((file, issues.into_messages()))
}

fn write_file(env: &Environment, file: &mut AudioFile) -> anyhow::Result<()> {
    if !file.metadata().has_unmerged_changes() {
        log::info!("No changes in \"{}\"", file.path().display());
        return Ok(());
    }
    env.write(file)
        .with_context(|| format!("failed to write \"{}\"", file.path().display()))?;
    log::info!("Saved \"{}\"", file.path().display());
    Ok(())
}

fn show_file(
    env: &Environment,
    path: &Path,
    with_picture_data: bool,
) -> anyhow::Result<serde_json::Value> {
    let (file, issues) = read_file(env, path)?;
    let metadata = file.metadata();
    Ok(json!({
        "path": path.display().to_string(),
        "format": {
            "id": file.format().id(),
            "name": file.format().name(),
        },
        "properties": file.properties().to_dictionary(),
        "metadata": metadata.to_dictionary(),
        "additional": additional_metadata(metadata),
        "pictures": show_pictures(metadata, with_picture_data),
        "issues": issues,
    }))
}

fn additional_metadata(metadata: &Metadata) -> BTreeMap<&str, &str> {
    metadata
        .additional_metadata()
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

fn show_pictures(metadata: &Metadata, with_picture_data: bool) -> Vec<serde_json::Value> {
    metadata
        .attached_pictures()
        .map(|attached| {
            let image_data = attached.image_data();
            let mut shown = json!({
                "type": attached.picture_type(),
                "description": attached.description(),
                "mimeType": picture::mime_type_of(image_data),
                "size": image_data.len(),
            });
            if let Some((width, height)) = picture::dimensions_of(image_data) {
                shown["width"] = width.into();
                shown["height"] = height.into();
            }
            if with_picture_data {
                shown["data"] = BASE64.encode(image_data).into();
            }
            shown
        })
        .collect()
}

fn parse_key(name: &str) -> anyhow::Result<MetadataKey> {
    MetadataKey::from_str(name.trim()).map_err(|_| anyhow!("unknown key \"{name}\""))
}

/// Parses `Name=value`.
fn parse_assignment(input: &str) -> anyhow::Result<(MetadataKey, Value)> {
    let Some((name, value)) = input.split_once('=') else {
        bail!("expected NAME=VALUE instead of \"{input}\"");
    };
    let key = parse_key(name)?;
    let parsed = match key {
        MetadataKey::ReplayGainTrackGain | MetadataKey::ReplayGainAlbumGain => {
            // Accept both "-6.5" and "-6.50 dB"
            key.parse_value(value).or_else(|| {
                parse_replay_gain_db(value)
                    .ok()
                    .filter(|(remainder, _)| remainder.is_empty())
                    .map(|(_, gain)| Value::Float(gain))
            })
        }
        _ => key.parse_value(value),
    };
    parsed
        .map(|value| (key, value))
        .ok_or_else(|| anyhow!("invalid value \"{value}\" for {key}"))
}

fn parse_kinds<'a>(names: impl IntoIterator<Item = &'a str>) -> anyhow::Result<MetadataKind> {
    names.into_iter().try_fold(MetadataKind::empty(), |kinds, name| {
        let flag_name = name.trim().to_ascii_uppercase().replace('-', "_");
        let Some(kind) = MetadataKind::from_name(&flag_name) else {
            bail!("unknown kind of metadata \"{name}\"");
        };
        Ok(kinds | kind)
    })
}

#[must_use]
const fn app_name() -> &'static str {
    "tonetag"
}

#[must_use]
fn app_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", app_name())
}

fn app_config_dir() -> Option<PathBuf> {
    app_dirs().map(|app_dirs| app_dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests;
