// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

// Opt-in for allowed-by-default lints (in alphabetical order)
// See also: <https://doc.rust-lang.org/rustc/lints>
#![warn(future_incompatible)]
#![warn(let_underscore)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(unused)]
// Clippy lints
#![warn(clippy::pedantic)]
// Additional restrictions
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::self_named_module_files)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]
// Using wildcard imports consciously is acceptable.
#![allow(clippy::wildcard_imports)]
// Importing all enum variants into a narrow, local scope is acceptable.
#![allow(clippy::enum_glob_use)]
// TODO: Add missing docs
#![allow(clippy::missing_errors_doc)]

pub mod env;
pub mod file;
pub mod fmt;
pub mod io;
pub mod registry;
pub mod util;

use std::{io::Error as IoError, path::Path, result::Result as StdResult};

use lofty::error::{ErrorKind as LoftyErrorKind, LoftyError};
use thiserror::Error;

use crate::fmt::FileFormat;

/// Numeric error codes that are stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    FormatNotRecognized = 0,
    FormatNotSupported = 1,
    InputOutput = 2,
    InvalidFormat = 3,
}

impl ErrorCode {
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("the format of \"{display_name}\" was not recognized")]
    FormatNotRecognized { display_name: String },

    #[error("writing {format} files like \"{display_name}\" is not supported")]
    FormatNotSupported {
        display_name: String,
        format: FileFormat,
    },

    #[error("failed to access \"{display_name}\": {source}")]
    InputOutput {
        display_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("\"{display_name}\" is not a valid {format} file: {source}")]
    InvalidFormat {
        display_name: String,
        format: FileFormat,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = StdResult<T, Error>;

impl Error {
    pub const DOMAIN: &'static str = "org.tonetag.media-file";

    #[must_use]
    pub fn not_recognized(path: &Path) -> Self {
        Self::FormatNotRecognized {
            display_name: util::display_name(path),
        }
    }

    #[must_use]
    pub fn not_supported(path: &Path, format: FileFormat) -> Self {
        Self::FormatNotSupported {
            display_name: util::display_name(path),
            format,
        }
    }

    #[must_use]
    pub fn input_output(path: &Path, source: impl Into<anyhow::Error>) -> Self {
        Self::InputOutput {
            display_name: util::display_name(path),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn invalid_format(path: &Path, format: FileFormat, source: impl Into<anyhow::Error>) -> Self {
        Self::InvalidFormat {
            display_name: util::display_name(path),
            format,
            source: source.into(),
        }
    }

    /// Distinguishes I/O errors from parse errors.
    #[must_use]
    pub fn from_lofty(path: &Path, format: FileFormat, err: LoftyError) -> Self {
        if matches!(err.kind(), LoftyErrorKind::Io(_)) {
            Self::input_output(path, err)
        } else {
            Self::invalid_format(path, format, err)
        }
    }

    /// Distinguishes I/O errors from parse errors.
    #[must_use]
    pub fn from_id3(path: &Path, format: FileFormat, err: id3::Error) -> Self {
        if matches!(err.kind, id3::ErrorKind::Io(_)) {
            Self::input_output(path, err)
        } else {
            Self::invalid_format(path, format, err)
        }
    }

    #[must_use]
    pub fn from_io(path: &Path, err: IoError) -> Self {
        Self::input_output(path, err)
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::FormatNotRecognized { .. } => ErrorCode::FormatNotRecognized,
            Self::FormatNotSupported { .. } => ErrorCode::FormatNotSupported,
            Self::InputOutput { .. } => ErrorCode::InputOutput,
            Self::InvalidFormat { .. } => ErrorCode::InvalidFormat,
        }
    }

    /// The name of the affected file for presentation.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::FormatNotRecognized { display_name }
            | Self::FormatNotSupported { display_name, .. }
            | Self::InputOutput { display_name, .. }
            | Self::InvalidFormat { display_name, .. } => display_name,
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        let display_name = self.display_name();
        match self {
            Self::FormatNotRecognized { .. } => {
                format!("The format of the file \"{display_name}\" was not recognized.")
            }
            Self::FormatNotSupported { format, .. } => {
                format!("The file \"{display_name}\" could not be written as {format}.")
            }
            Self::InputOutput { .. } => {
                format!("The file \"{display_name}\" could not be accessed.")
            }
            Self::InvalidFormat { format, .. } => {
                format!("The file \"{display_name}\" is not a valid {format} file.")
            }
        }
    }

    #[must_use]
    pub fn failure_reason(&self) -> String {
        match self {
            Self::FormatNotRecognized { .. } => "File format not recognized".to_owned(),
            Self::FormatNotSupported { format, .. } => {
                format!("Writing {format} metadata is not supported")
            }
            Self::InputOutput { source, .. } => format!("Input/output error: {source}"),
            Self::InvalidFormat { format, .. } => format!("Not a {format} file"),
        }
    }

    #[must_use]
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::FormatNotRecognized { .. } => {
                "The file's extension may not match the file's type."
            }
            Self::FormatNotSupported { .. } => "Convert the file into a writable format.",
            Self::InputOutput { .. } => {
                "Check that the file exists and that its permissions allow access."
            }
            Self::InvalidFormat { .. } => "The file's extension may not match the file's type.",
        }
    }
}

pub mod prelude {
    pub use super::{Error, ErrorCode, Result};
}
