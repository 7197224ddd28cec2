//! Release lanes: each composes the pipeline stages for one release step
//! and is safe to re-run.

use std::path::PathBuf;

use tracing::info;

use crate::{
    codec::LOCALIZABLE,
    config::PipelineConfig,
    error::Result,
    extract::{self, Extractor},
    glotpress::TranslationService,
    merge, metadata,
    metadata::{AppStoreUploader, VariantKind},
    process::CommandRunner,
    progress::{self, ProgressViolation},
    split, sync,
    vcs::{CommitOutcome, Committer},
};

/// Extracts the app strings, merges the manual files into them, and commits
/// the source `.lproj` directory.
pub fn generate(
    config: &PipelineConfig,
    extractor: &dyn Extractor,
    committer: &dyn Committer,
) -> Result<CommitOutcome> {
    let root = &config.project_root;
    let output = extract::generate_strings_file(extractor, root, &config.extract)?;
    merge::merge_files(&output, &config.manual_files)?;
    committer.commit(
        &[root.join(&config.extract.output_dir)],
        "Update strings for localization",
    )
}

/// Uploads the canonical strings file to the app strings project.
pub async fn push(
    config: &PipelineConfig,
    service: &dyn TranslationService,
    committer: &dyn Committer,
) -> Result<CommitOutcome> {
    let root = &config.project_root;
    sync::push_strings(
        service,
        committer,
        &config.app_strings_url,
        &config.extract.output_path(root),
        &[root.join(&config.extract.output_dir)],
    )
    .await
}

/// Files and commits produced by [`download`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub localizable: Vec<PathBuf>,
    pub manual: Vec<PathBuf>,
    /// One commit outcome per metadata variant downloaded, in order.
    pub metadata: Vec<CommitOutcome>,
}

/// Downloads the app translations, commits them, then redistributes the
/// manual keys and commits the changed manual files. Finishes with the
/// App Store metadata of every variant in `metadata_kinds`.
///
/// `only` limits the string download to some GlotPress locale codes.
pub async fn download(
    config: &PipelineConfig,
    service: &dyn TranslationService,
    committer: &dyn Committer,
    runner: &dyn CommandRunner,
    only: &[String],
    metadata_kinds: &[VariantKind],
) -> Result<DownloadReport> {
    let localizable = sync::pull_strings(
        service,
        &config.app_strings_url,
        &config.locales,
        only,
        &config.resources_dir,
    )
    .await?;
    committer.commit(
        &[config.resources_dir.join("*.lproj").join(LOCALIZABLE)],
        "Update app translations - `Localizable.strings`",
    )?;

    let manual = split::extract_keys_from_strings_files(&config.resources_dir, &config.manual_files)?;
    committer.commit(&manual, "Update app translations - Other `.strings`")?;

    info!(
        localizable = localizable.len(),
        manual = manual.len(),
        "downloaded app translations"
    );

    let metadata = download_metadata(config, metadata_kinds, runner, committer)?;
    Ok(DownloadReport {
        localizable,
        manual,
        metadata,
    })
}

/// Regenerates `AppStoreStrings.po` of every variant, in order.
pub fn update_appstore_strings(
    config: &PipelineConfig,
    kinds: &[VariantKind],
    version: &str,
) -> Result<Vec<PathBuf>> {
    kinds
        .iter()
        .map(|kind| metadata::update_metadata_source(&config.variant(*kind), version))
        .collect()
}

/// Downloads the localized App Store metadata of every variant, in order.
pub fn download_metadata(
    config: &PipelineConfig,
    kinds: &[VariantKind],
    runner: &dyn CommandRunner,
    committer: &dyn Committer,
) -> Result<Vec<CommitOutcome>> {
    kinds
        .iter()
        .map(|kind| metadata::download_metadata(&config.variant(*kind), runner, committer))
        .collect()
}

/// Uploads the metadata of every variant, in order.
pub fn upload_metadata(
    config: &PipelineConfig,
    kinds: &[VariantKind],
    uploader: &dyn AppStoreUploader,
    with_screenshots: bool,
) -> Result<()> {
    let common = config.upload_params()?;
    for kind in kinds {
        let params = metadata::upload_parameters(&config.variant(*kind), &common, with_screenshots);
        uploader.upload(&params)?;
    }
    Ok(())
}

/// Progress violations of one GlotPress project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectProgress {
    pub project_url: String,
    pub violations: Vec<ProgressViolation>,
}

/// Checks the app strings project, then the metadata project of every
/// variant.
pub async fn check_translations(
    config: &PipelineConfig,
    service: &dyn TranslationService,
    threshold: u8,
) -> Result<Vec<ProjectProgress>> {
    let mut projects = vec![config.app_strings_url.clone()];
    projects.extend(
        VariantKind::ALL
            .iter()
            .map(|kind| config.variant(*kind).glotpress_project_url),
    );

    let mut report = Vec::with_capacity(projects.len());
    for project_url in projects {
        info!(project = %project_url, "checking translation status");
        let violations = progress::check_translation_progress(
            service,
            &project_url,
            &config.progress_locales,
            threshold,
        )
        .await?;
        report.push(ProjectProgress {
            project_url,
            violations,
        });
    }
    Ok(report)
}
