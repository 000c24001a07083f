// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::*;

const SHARED_EXTENSIONS: &[&str] = &["snd"];
const SHARED_MIME_TYPES: &[&str] = &["audio/x-shared"];

fn shared_descriptor(format: FileFormat) -> HandlerDescriptor {
    HandlerDescriptor {
        format,
        extensions: SHARED_EXTENSIONS,
        mime_types: SHARED_MIME_TYPES,
    }
}

#[test]
fn higher_priority_wins() {
    let mut registry = HandlerRegistry::new();
    registry.register(shared_descriptor(FileFormat::Wav), 5);
    registry.register(shared_descriptor(FileFormat::Aiff), 10);
    assert_eq!(
        Some(FileFormat::Aiff),
        registry.find_by_extension("snd").map(|found| found.format)
    );
    assert_eq!(
        Some(FileFormat::Aiff),
        registry
            .find_by_mime_type("audio/x-shared")
            .map(|found| found.format)
    );

    // Independent of the order of registration
    let mut registry = HandlerRegistry::new();
    registry.register(shared_descriptor(FileFormat::Aiff), 10);
    registry.register(shared_descriptor(FileFormat::Wav), 5);
    assert_eq!(
        Some(FileFormat::Aiff),
        registry.find_by_extension("snd").map(|found| found.format)
    );
}

#[test]
fn equal_priorities_keep_the_order_of_registration() {
    let mut registry = HandlerRegistry::new();
    registry.register(shared_descriptor(FileFormat::Wav), 1);
    registry.register(shared_descriptor(FileFormat::Aiff), 1);
    registry.register(shared_descriptor(FileFormat::Flac), 0);
    assert_eq!(
        vec![FileFormat::Wav, FileFormat::Aiff, FileFormat::Flac],
        registry
            .registrations()
            .iter()
            .map(|registration| registration.descriptor.format)
            .collect::<Vec<_>>()
    );
    assert_eq!(
        Some(FileFormat::Wav),
        registry.find_by_extension("snd").map(|found| found.format)
    );
}

#[test]
fn unsupported_extension() {
    let registry = HandlerRegistry::with_default_handlers();
    assert!(registry.find_by_extension("txt").is_none());
    assert!(registry.find_by_extension("").is_none());
    assert!(registry.find_by_mime_type("text/plain").is_none());
    assert!(HandlerRegistry::new().find_by_extension("mp3").is_none());
}

#[test]
fn lookup_is_case_insensitive() {
    let registry = HandlerRegistry::with_default_handlers();
    assert_eq!(
        Some(FileFormat::Flac),
        registry.find_by_extension("FLAC").map(|found| found.format)
    );
    assert_eq!(
        Some(FileFormat::Mpeg),
        registry.find_by_extension(".Mp3").map(|found| found.format)
    );
    assert_eq!(
        Some(FileFormat::OggOpus),
        registry
            .find_by_mime_type("Audio/Opus; codecs=opus")
            .map(|found| found.format)
    );
}

#[test]
fn find_by_path() {
    let registry = HandlerRegistry::with_default_handlers();
    assert_eq!(
        Some(FileFormat::Dsf),
        registry
            .find_by_path(Path::new("/music/track.DSF"))
            .map(|found| found.format)
    );
    assert_eq!(
        Some(FileFormat::ImpulseTracker),
        registry
            .find_by_path(Path::new("song.it"))
            .map(|found| found.format)
    );
    assert!(registry.find_by_path(Path::new("notes.txt")).is_none());
    assert!(registry.find_by_path(Path::new("no_extension")).is_none());
}

#[test]
fn default_handlers_cover_all_formats() {
    let registry = HandlerRegistry::with_default_handlers();
    for format in FileFormat::iter() {
        for extension in format.extensions() {
            assert_eq!(
                Some(format),
                registry
                    .find_by_extension(extension)
                    .map(|found| found.format),
                "{extension}"
            );
        }
    }
}

#[test]
fn supported_extensions_are_deduplicated() {
    let mut registry = HandlerRegistry::new();
    registry.register(HandlerDescriptor::new(FileFormat::Wav), 0);
    registry.register(HandlerDescriptor::new(FileFormat::Wav), 1);
    assert_eq!(
        FileFormat::Wav.extensions().to_vec(),
        registry.supported_extensions()
    );
    assert_eq!(
        FileFormat::Wav.mime_types().to_vec(),
        registry.supported_mime_types()
    );
}

#[test]
fn prioritized_default_handlers() {
    let registry = HandlerRegistry::with_default_handlers_prioritized(|format| {
        if format == FileFormat::Musepack { 7 } else { 0 }
    });
    let first = registry.registrations().first().copied();
    assert_eq!(Some(FileFormat::Musepack), first.map(|first| first.descriptor.format));
    assert_eq!(Some(7), first.map(|first| first.priority));
}
