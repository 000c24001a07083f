// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lookup of format handlers by file extension or MIME type.

use std::path::Path;

use itertools::Itertools as _;
use strum::IntoEnumIterator as _;

use crate::{fmt::FileFormat, util::guess_mime_from_file_path};

/// Describes which files a handler for a [`FileFormat`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub format: FileFormat,

    /// Case-insensitive file extensions without a leading dot.
    pub extensions: &'static [&'static str],

    /// Case-insensitive MIME types without parameters.
    pub mime_types: &'static [&'static str],
}

impl HandlerDescriptor {
    /// The built-in descriptor of a format.
    #[must_use]
    pub const fn new(format: FileFormat) -> Self {
        Self {
            format,
            extensions: format.extensions(),
            mime_types: format.mime_types(),
        }
    }

    #[must_use]
    pub fn supports_extension(&self, extension: &str) -> bool {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        self.extensions
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(extension))
    }

    /// Parameters like `; codecs=opus` are ignored.
    #[must_use]
    pub fn supports_mime_type(&self, mime_type: &str) -> bool {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        self.mime_types
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(essence))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub descriptor: HandlerDescriptor,
    pub priority: i32,
}

/// Handlers ordered by descending priority.
///
/// Handlers with the same priority keep their order of registration.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub const DEFAULT_PRIORITY: i32 = 0;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Registers all built-in formats with the default priority.
    #[must_use]
    pub fn with_default_handlers() -> Self {
        Self::with_default_handlers_prioritized(|_| Self::DEFAULT_PRIORITY)
    }

    /// Registers all built-in formats with a custom priority per format.
    #[must_use]
    pub fn with_default_handlers_prioritized(mut priority: impl FnMut(FileFormat) -> i32) -> Self {
        let mut registry = Self::new();
        for format in FileFormat::iter() {
            registry.register(HandlerDescriptor::new(format), priority(format));
        }
        registry
    }

    pub fn register(&mut self, descriptor: HandlerDescriptor, priority: i32) {
        log::debug!(
            "Registering handler for {format} with priority {priority}",
            format = descriptor.format
        );
        self.registrations.push(Registration {
            descriptor,
            priority,
        });
        // Stable sort to preserve the order of registration for equal priorities
        self.registrations
            .sort_by(|lhs, rhs| rhs.priority.cmp(&lhs.priority));
    }

    /// All registrations in lookup order.
    #[must_use]
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    #[must_use]
    pub fn find_by_extension(&self, extension: &str) -> Option<&HandlerDescriptor> {
        self.registrations
            .iter()
            .map(|registration| &registration.descriptor)
            .find(|descriptor| descriptor.supports_extension(extension))
    }

    #[must_use]
    pub fn find_by_mime_type(&self, mime_type: &str) -> Option<&HandlerDescriptor> {
        self.registrations
            .iter()
            .map(|registration| &registration.descriptor)
            .find(|descriptor| descriptor.supports_mime_type(mime_type))
    }

    /// Tries the file extension first and then the guessed audio MIME type.
    #[must_use]
    pub fn find_by_path(&self, path: &Path) -> Option<&HandlerDescriptor> {
        if let Some(descriptor) = path
            .extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.find_by_extension(extension))
        {
            return Some(descriptor);
        }
        guess_mime_from_file_path(path).and_then(|mime| self.find_by_mime_type(mime.essence_str()))
    }

    /// The union of all supported extensions in lookup order.
    #[must_use]
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.registrations
            .iter()
            .flat_map(|registration| registration.descriptor.extensions.iter().copied())
            .unique_by(|extension| extension.to_ascii_lowercase())
            .collect()
    }

    /// The union of all supported MIME types in lookup order.
    #[must_use]
    pub fn supported_mime_types(&self) -> Vec<&'static str> {
        self.registrations
            .iter()
            .flat_map(|registration| registration.descriptor.mime_types.iter().copied())
            .unique_by(|mime_type| mime_type.to_ascii_lowercase())
            .collect()
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests;
