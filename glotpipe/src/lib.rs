#![forbid(unsafe_code)]
//! Localization release pipeline for Apple apps.
//!
//! Moves translatable strings between source code, hand-maintained
//! `.strings` files, and a GlotPress project, and publishes App Store
//! listing metadata.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use glotpipe::merge::{ManualFile, ManualFileTable};
//!
//! let manual = ManualFileTable::new(vec![ManualFile::new(
//!     "WordPress/Resources/en.lproj/InfoPlist.strings",
//!     "infoplist.",
//! )])?;
//!
//! // Merge the manual keys into the canonical file...
//! glotpipe::merge::merge_files("WordPress/Resources/en.lproj/Localizable.strings".as_ref(), &manual)?;
//!
//! // ...and, once translations are downloaded, split them back out.
//! let changed = glotpipe::split::extract_keys_from_strings_files("WordPress/Resources".as_ref(), &manual)?;
//! println!("{} manual files updated", changed.len());
//! # Ok::<(), glotpipe::Error>(())
//! ```
//!
//! # Stages
//!
//! - [`extract`]: scan sources for localization calls and write the canonical file
//! - [`merge`]: merge manual files under key prefixes
//! - [`sync`]: push originals to GlotPress and pull per-locale translations
//! - [`split`]: redistribute translated manual keys
//! - [`metadata`]: App Store strings, metadata download, and upload
//!
//! [`lanes`] composes them into the release steps.

pub mod codec;
pub mod config;
pub mod error;
pub mod extract;
pub mod formats;
pub mod glotpress;
pub mod lanes;
pub mod locales;
pub mod merge;
pub mod metadata;
pub mod process;
pub mod progress;
pub mod split;
pub mod sync;
pub mod traits;
pub mod types;
pub mod vcs;

// Re-export most used types for easy consumption
pub use crate::{
    config::PipelineConfig,
    error::{Error, Result},
    formats::FormatType,
    glotpress::{GlotPressClient, TranslationService},
    locales::{Locale, LocaleTable},
    merge::{ManualFile, ManualFileTable, merge_files, merge_tables},
    metadata::{ProductVariant, VariantKind},
    split::{extract_keys_from_strings_files, split_table},
    sync::{pull_strings, push_strings},
    types::{Entry, StringsTable},
    vcs::{CommitOutcome, Committer, GitCommitter},
};
