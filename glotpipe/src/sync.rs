//! Pushing the canonical strings file to GlotPress and pulling the
//! per-locale translations back into `.lproj` directories.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    codec::{self, LOCALIZABLE},
    error::{Error, Result},
    formats::StringsFormat,
    glotpress::TranslationService,
    locales::{Locale, LocaleTable},
    traits::Parser,
    types::StringsTable,
    vcs::{CommitOutcome, Committer},
};

/// Uploads `source` as the originals of `project_url`, then commits
/// `commit_paths`.
///
/// The file is parsed before upload so a malformed file never reaches the
/// remote project.
pub async fn push_strings(
    service: &dyn TranslationService,
    committer: &dyn Committer,
    project_url: &str,
    source: &Path,
    commit_paths: &[PathBuf],
) -> Result<CommitOutcome> {
    let content = std::fs::read_to_string(source).map_err(|e| Error::file(source, e))?;
    let table = StringsFormat::from_str(&content)
        .map_err(|e| remap_origin(e, &source.display().to_string()))?
        .into_table();

    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(LOCALIZABLE);
    service
        .import_originals(project_url, file_name, content)
        .await?;
    info!(project = project_url, originals = table.len(), "pushed originals");

    committer.commit(commit_paths, "Update strings for localization")
}

/// Downloaded translations of one locale, not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct PulledLocale {
    pub locale: Locale,
    pub table: StringsTable,
}

/// Fetches every requested locale into memory.
///
/// `only` restricts the pull to some GlotPress codes; an empty slice means the
/// whole table. Every code is resolved before the first request, and a
/// failing request aborts the whole fetch.
pub async fn fetch_translations(
    service: &dyn TranslationService,
    project_url: &str,
    locales: &LocaleTable,
    only: &[String],
) -> Result<Vec<PulledLocale>> {
    let resolved = locales.resolve(only)?;

    let mut pulled = Vec::with_capacity(resolved.len());
    for locale in resolved {
        let table = match service
            .export_translations(project_url, &locale.glotpress)
            .await?
        {
            Some(body) if !body.trim().is_empty() => StringsFormat::from_str(&body)
                .map_err(|e| remap_origin(e, &format!("export of `{}`", locale.glotpress)))?
                .into_table(),
            _ => {
                warn!(locale = %locale.glotpress, "no translations yet, writing an empty file");
                StringsTable::new()
            }
        };
        debug!(locale = %locale.glotpress, entries = table.len(), "fetched translations");
        pulled.push(PulledLocale { locale, table });
    }
    Ok(pulled)
}

/// Pulls translations of `project_url` into
/// `<resources_dir>/<lproj>.lproj/Localizable.strings`.
///
/// Nothing is written unless every locale was fetched. Locales without
/// translations still get a valid, header-only file. Returns the written
/// paths in locale-table order.
pub async fn pull_strings(
    service: &dyn TranslationService,
    project_url: &str,
    locales: &LocaleTable,
    only: &[String],
    resources_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let pulled = fetch_translations(service, project_url, locales, only).await?;

    let mut written = Vec::with_capacity(pulled.len());
    for PulledLocale { locale, table } in &pulled {
        let path = locale.resource_path(resources_dir, LOCALIZABLE);
        codec::write_table(&path, &locale.lproj, table)?;
        written.push(path);
    }

    info!(
        project = project_url,
        locales = written.len(),
        "downloaded translations"
    );
    Ok(written)
}

fn remap_origin(error: Error, origin: &str) -> Error {
    match error {
        Error::Parse { message, .. } => Error::parse(origin, message),
        other => other,
    }
}
