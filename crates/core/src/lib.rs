// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(clippy::pedantic)]
// Additional restrictions
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::self_named_module_files)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `Default::default()` expressions is not needed
// as long as the context is obvious.
#![allow(clippy::default_trait_access)]
// Importing all enum variants into a narrow, local scope is acceptable.
#![allow(clippy::enum_glob_use)]
// TODO: Add missing docs
#![allow(clippy::missing_errors_doc)]

pub mod audio;
pub mod change;
pub mod metadata;
pub mod util;

pub use self::{
    audio::AudioProperties,
    change::{Change, ChangeState, ChangeTrackingMap},
    metadata::{
        Metadata, MetadataKey, MetadataKind, Value,
        picture::{AttachedPicture, PictureType},
    },
};

pub mod prelude {
    // Re-export trait methods from semval
    pub use semval::{IsValid, Validate as _};

    pub(crate) use semval::prelude::*;

    pub use crate::{
        change::{Change, ChangeState, ChangeTrackingMap},
        metadata::{Metadata, MetadataKey, MetadataKind, Value},
    };
}
