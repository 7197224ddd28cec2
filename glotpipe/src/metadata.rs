//! App Store listing metadata: regenerating the `AppStoreStrings.po`
//! source, downloading localized metadata, and uploading it with `deliver`.
//!
//! Both apps go through the same functions; everything that differs lives in
//! a [`ProductVariant`] value.

use std::fmt::{self, Display};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    formats::po::{Format as PoFormat, PoEntry},
    process::{CommandRunner, CommandSpec},
    traits::Parser,
    vcs::{CommitOutcome, Committer},
};

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r"^\d+\.\d+$").unwrap();
}

/// Field key of the release notes in the App Store metadata project.
pub const WHATS_NEW: &str = "whats_new";

/// The two apps built from the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    WordPress,
    Jetpack,
}

impl VariantKind {
    pub const ALL: [VariantKind; 2] = [VariantKind::WordPress, VariantKind::Jetpack];

    /// Human name used in commit messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            VariantKind::WordPress => "WordPress",
            VariantKind::Jetpack => "Jetpack",
        }
    }
}

impl Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantKind::WordPress => write!(f, "wordpress"),
            VariantKind::Jetpack => write!(f, "jetpack"),
        }
    }
}

impl FromStr for VariantKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wordpress" | "wp" => Ok(VariantKind::WordPress),
            "jetpack" | "jp" => Ok(VariantKind::Jetpack),
            other => Err(Error::config(format!("unknown product variant `{other}`"))),
        }
    }
}

/// Everything that distinguishes one app's metadata pipeline from the other.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProductVariant {
    pub kind: VariantKind,
    /// Source-of-record release notes (`release_notes.txt`).
    pub release_notes: PathBuf,
    /// Folder holding `name.txt`, `subtitle.txt`, ... for this app.
    pub source_metadata_dir: PathBuf,
    /// The generated `AppStoreStrings.po`.
    pub po_path: PathBuf,
    /// Key of the n-th screenshot caption is `<prefix><n>`.
    pub screenshot_key_prefix: String,
    pub screenshot_count: usize,
    /// Number of `standard-whats-new-<n>` snippets.
    pub whats_new_snippets: usize,
    /// `app_store_name` comes after the screenshot captions instead of
    /// right after the release notes.
    #[serde(default)]
    pub name_last: bool,
    /// GlotPress project holding the metadata translations.
    pub glotpress_project_url: String,
    pub app_identifier: String,
    /// Localized metadata tree read by `deliver` (`<locale>/<field>.txt`).
    pub metadata_dir: PathBuf,
    pub screenshots_dir: PathBuf,
    /// Script downloading the localized metadata, run from its own directory.
    pub download_script: PathBuf,
    pub download_script_arg: String,
}

impl ProductVariant {
    pub fn wordpress(root: &Path) -> Self {
        let fastlane = root.join("fastlane");
        ProductVariant {
            kind: VariantKind::WordPress,
            release_notes: root.join("WordPress/Resources/release_notes.txt"),
            source_metadata_dir: fastlane.join("appstoreres/metadata/source"),
            po_path: root.join("WordPress/Resources/AppStoreStrings.po"),
            screenshot_key_prefix: "app_store_screenshot-".to_string(),
            screenshot_count: 7,
            whats_new_snippets: 4,
            name_last: false,
            glotpress_project_url: "https://translate.wordpress.org/projects/apps/ios/release-notes/"
                .to_string(),
            app_identifier: "org.wordpress".to_string(),
            metadata_dir: fastlane.join("metadata"),
            screenshots_dir: fastlane.join("promo-screenshots"),
            download_script: fastlane.join("download_metadata.swift"),
            download_script_arg: "wordpress".to_string(),
        }
    }

    pub fn jetpack(root: &Path) -> Self {
        let fastlane = root.join("fastlane");
        ProductVariant {
            kind: VariantKind::Jetpack,
            release_notes: root.join("WordPress/Jetpack/Resources/release_notes.txt"),
            source_metadata_dir: fastlane.join("appstoreres/jetpack_metadata/source"),
            po_path: root.join("WordPress/Jetpack/Resources/AppStoreStrings.po"),
            screenshot_key_prefix: "screenshot-text-".to_string(),
            screenshot_count: 6,
            whats_new_snippets: 0,
            name_last: true,
            glotpress_project_url:
                "https://translate.wordpress.com/projects/jetpack/apps/ios/release-notes/"
                    .to_string(),
            app_identifier: "com.automattic.jetpack".to_string(),
            metadata_dir: fastlane.join("jetpack_metadata"),
            screenshots_dir: fastlane.join("jetpack_promo_screenshots"),
            download_script: fastlane.join("download_metadata.swift"),
            download_script_arg: "jetpack".to_string(),
        }
    }

    pub fn for_kind(kind: VariantKind, root: &Path) -> Self {
        match kind {
            VariantKind::WordPress => Self::wordpress(root),
            VariantKind::Jetpack => Self::jetpack(root),
        }
    }
}

/// One piece of listing text and the file it is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub key: String,
    pub path: PathBuf,
}

impl MetadataField {
    fn new(key: impl Into<String>, path: PathBuf) -> Self {
        MetadataField {
            key: key.into(),
            path,
        }
    }
}

/// The ordered field → source file mapping of a variant.
pub fn source_files(variant: &ProductVariant) -> Vec<MetadataField> {
    let source = &variant.source_metadata_dir;
    let name = MetadataField::new("app_store_name", source.join("name.txt"));
    let mut fields = vec![MetadataField::new(WHATS_NEW, variant.release_notes.clone())];
    if !variant.name_last {
        fields.push(name.clone());
    }
    fields.extend([
        MetadataField::new("app_store_subtitle", source.join("subtitle.txt")),
        MetadataField::new("app_store_desc", source.join("description.txt")),
        MetadataField::new("app_store_keywords", source.join("keywords.txt")),
    ]);
    for n in 1..=variant.whats_new_snippets {
        fields.push(MetadataField::new(
            format!("standard-whats-new-{n}"),
            source.join(format!("standard_whats_new_{n}.txt")),
        ));
    }
    for n in 1..=variant.screenshot_count {
        fields.push(MetadataField::new(
            format!("{}{n}", variant.screenshot_key_prefix),
            source.join(format!("promo_screenshot_{n}.txt")),
        ));
    }
    if variant.name_last {
        fields.push(name);
    }
    fields
}

/// `release_note_<NNN>`: the `x.y` version without dots, left-padded with
/// zeros to three digits.
pub fn release_note_key(version: &str) -> Result<String> {
    if !VERSION_REGEX.is_match(version) {
        return Err(Error::config(format!(
            "version `{version}` is not in `x.y` form"
        )));
    }
    Ok(format!("release_note_{:0>3}", version.replace('.', "")))
}

fn translator_comment(key: &str) -> Option<&'static str> {
    match key {
        "app_store_name" => Some("translators: The application name in the Apple App Store. Limit to 30 characters including spaces."),
        "app_store_subtitle" => Some("translators: Subtitle to be displayed below the application name in the Apple App Store. Limit to 30 characters including spaces."),
        "app_store_keywords" => Some("translators: Keywords used in the App Store search engine. Limit to 100 characters including spaces and commas."),
        _ => None,
    }
}

/// Builds the metadata catalog for `version` from the source-of-record
/// files. A missing source file is a configuration error.
pub fn render_metadata_source(variant: &ProductVariant, version: &str) -> Result<PoFormat> {
    let release_note = release_note_key(version)?;

    let mut entries = Vec::new();
    for field in source_files(variant) {
        let content = fs::read_to_string(&field.path).map_err(|e| {
            Error::config(format!(
                "cannot read `{}` for `{}`: {e}",
                field.path.display(),
                field.key
            ))
        })?;
        let text = content.trim_end_matches(['\n', '\r']).to_string();

        let entry = if field.key == WHATS_NEW {
            PoEntry::new(&release_note, text).with_comment(format!(
                "translators: Release notes for this version to be displayed in the App Store. Limit to 4000 characters including spaces and commas. Version {version}."
            ))
        } else {
            let entry = PoEntry::new(&field.key, text);
            match translator_comment(&field.key) {
                Some(comment) => entry.with_comment(comment),
                None => entry,
            }
        };
        debug!(key = ?entry.context, path = %field.path.display(), "read metadata field");
        entries.push(entry);
    }

    Ok(PoFormat {
        header: vec![
            ("MIME-Version".into(), "1.0".into()),
            ("Content-Type".into(), "text/plain; charset=UTF-8".into()),
            ("Content-Transfer-Encoding".into(), "8bit".into()),
            ("Plural-Forms".into(), "nplurals=2; plural=n != 1;".into()),
            (
                "Project-Id-Version".into(),
                format!("{} - Apple App Store", variant.kind.display_name()),
            ),
            ("Language".into(), "en".into()),
            ("X-Generator".into(), "glotpipe".into()),
        ],
        entries,
    })
}

/// Regenerates the variant's `AppStoreStrings.po` for `version`. Returns the
/// written path.
pub fn update_metadata_source(variant: &ProductVariant, version: &str) -> Result<PathBuf> {
    let catalog = render_metadata_source(variant, version)?;
    catalog.write_to(&variant.po_path)?;
    info!(
        variant = %variant.kind,
        path = %variant.po_path.display(),
        fields = catalog.entries.len(),
        "updated App Store strings"
    );
    Ok(variant.po_path.clone())
}

/// Runs the download script, restores the source-locale release notes, and
/// commits the metadata tree.
pub fn download_metadata(
    variant: &ProductVariant,
    runner: &dyn CommandRunner,
    committer: &dyn Committer,
) -> Result<CommitOutcome> {
    let script_dir = variant
        .download_script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let script_name = variant
        .download_script
        .file_name()
        .map(|n| format!("./{}", n.to_string_lossy()))
        .ok_or_else(|| Error::config("download script has no file name"))?;

    runner.run(
        &CommandSpec::new(script_name)
            .arg(&variant.download_script_arg)
            .current_dir(script_dir),
    )?;

    // GlotPress holds no en-US copy since those notes are the originals.
    let en_us = variant.metadata_dir.join("en-US").join("release_notes.txt");
    if let Some(parent) = en_us.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    fs::copy(&variant.release_notes, &en_us).map_err(|e| Error::file(&variant.release_notes, e))?;
    debug!(path = %en_us.display(), "copied source release notes");

    committer.commit(
        &[variant.metadata_dir.join("**").join("*.txt")],
        &format!("Update {} metadata translations", variant.kind.display_name()),
    )
}

/// `deliver` options shared by both apps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommonUploadParams {
    /// Marketing version; read from the version xcconfig when not configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    pub skip_binary_upload: bool,
    pub overwrite_screenshots: bool,
    pub phased_release: bool,
    pub precheck_include_in_app_purchases: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_rating_config_path: Option<PathBuf>,
}

impl Default for CommonUploadParams {
    fn default() -> Self {
        CommonUploadParams {
            app_version: None,
            skip_binary_upload: true,
            overwrite_screenshots: true,
            phased_release: true,
            precheck_include_in_app_purchases: false,
            api_key_path: None,
            app_rating_config_path: None,
        }
    }
}

impl CommonUploadParams {
    /// Defaults for a checkout at `root`.
    pub fn for_project(root: &Path) -> Self {
        CommonUploadParams {
            app_rating_config_path: Some(root.join("fastlane/metadata/ratings_config.json")),
            ..Self::default()
        }
    }
}

/// The full parameter object handed to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadParameters {
    #[serde(flatten)]
    pub common: CommonUploadParams,
    pub app_identifier: String,
    pub metadata_path: PathBuf,
    pub screenshots_path: PathBuf,
    pub skip_screenshots: bool,
}

/// Screenshots are skipped unless `with_screenshots` is set.
pub fn upload_parameters(
    variant: &ProductVariant,
    common: &CommonUploadParams,
    with_screenshots: bool,
) -> UploadParameters {
    UploadParameters {
        common: common.clone(),
        app_identifier: variant.app_identifier.clone(),
        metadata_path: variant.metadata_dir.clone(),
        screenshots_path: variant.screenshots_dir.clone(),
        skip_screenshots: !with_screenshots,
    }
}

/// Publishes listing metadata to App Store Connect.
pub trait AppStoreUploader {
    fn upload(&self, params: &UploadParameters) -> Result<()>;
}

/// Uploads through `fastlane deliver`.
pub struct DeliverUploader<R> {
    program: String,
    runner: R,
    cwd: Option<PathBuf>,
}

impl<R: CommandRunner> DeliverUploader<R> {
    pub fn new(runner: R) -> Self {
        DeliverUploader {
            program: "fastlane".to_string(),
            runner,
            cwd: None,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// `deliver --<name> <value>` for every parameter, sorted by name.
    pub fn command(&self, params: &UploadParameters) -> Result<CommandSpec> {
        if params.common.app_version.is_none() {
            return Err(Error::config("app_version is required to upload metadata"));
        }

        let mut spec = CommandSpec::new(&self.program).arg("deliver");
        if let Some(dir) = &self.cwd {
            spec = spec.current_dir(dir);
        }

        let serde_json::Value::Object(map) = serde_json::to_value(params)? else {
            return Err(Error::config("upload parameters must serialize to an object"));
        };
        for (name, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            spec = spec.arg(format!("--{name}")).arg(value);
        }
        Ok(spec)
    }
}

impl<R: CommandRunner> AppStoreUploader for DeliverUploader<R> {
    fn upload(&self, params: &UploadParameters) -> Result<()> {
        let spec = self.command(params)?;
        self.runner.run(&spec)?;
        info!(app = %params.app_identifier, "uploaded App Store metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::CommitOutcome;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[test]
    fn test_release_note_key() {
        assert_eq!(release_note_key("23.4").unwrap(), "release_note_234");
        assert_eq!(release_note_key("9.1").unwrap(), "release_note_091");
        assert_eq!(release_note_key("10.10").unwrap(), "release_note_1010");
        assert!(release_note_key("23.4.1").is_err());
        assert!(release_note_key("v23").is_err());
    }

    #[test]
    fn test_source_files_layouts() {
        let root = Path::new("/repo");
        let wp = source_files(&ProductVariant::wordpress(root));
        assert_eq!(wp.len(), 5 + 4 + 7);
        assert_eq!(wp[0].key, WHATS_NEW);
        assert_eq!(wp[0].path, PathBuf::from("/repo/WordPress/Resources/release_notes.txt"));
        assert_eq!(wp[1].key, "app_store_name");
        assert_eq!(wp[15].key, "app_store_screenshot-7");
        assert!(wp.iter().any(|f| f.key == "app_store_screenshot-7"));

        let jp = source_files(&ProductVariant::jetpack(root));
        assert_eq!(jp.len(), 5 + 6);
        assert!(jp.iter().any(|f| f.key == "screenshot-text-6"
            && f.path == PathBuf::from("/repo/fastlane/appstoreres/jetpack_metadata/source/promo_screenshot_6.txt")));
        assert!(!jp.iter().any(|f| f.key.starts_with("standard-whats-new")));
        let keys: Vec<&str> = jp.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                WHATS_NEW,
                "app_store_subtitle",
                "app_store_desc",
                "app_store_keywords",
                "screenshot-text-1",
                "screenshot-text-2",
                "screenshot-text-3",
                "screenshot-text-4",
                "screenshot-text-5",
                "screenshot-text-6",
                "app_store_name",
            ]
        );
    }

    fn seed_sources(variant: &ProductVariant) {
        for field in source_files(variant) {
            fs::create_dir_all(field.path.parent().unwrap()).unwrap();
            fs::write(&field.path, format!("{} text\n", field.key)).unwrap();
        }
    }

    #[test]
    fn test_update_metadata_source_writes_po() {
        let temp = TempDir::new().unwrap();
        let variant = ProductVariant::jetpack(temp.path());
        seed_sources(&variant);

        let path = update_metadata_source(&variant, "9.1").unwrap();
        let catalog = PoFormat::read_from(&path).unwrap();
        assert_eq!(catalog.entries.len(), 11);
        let notes = catalog.find_by_context("release_note_091").unwrap();
        assert_eq!(notes.id, "whats_new text");
        assert_eq!(notes.translation, "");
        assert_eq!(catalog.find_by_context("screenshot-text-2").unwrap().id, "screenshot-text-2 text");
        assert_eq!(catalog.header_value("Language"), Some("en"));
        assert_eq!(catalog.entries.last().unwrap().context.as_deref(), Some("app_store_name"));
    }

    #[test]
    fn test_missing_source_file_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let variant = ProductVariant::wordpress(temp.path());
        let err = update_metadata_source(&variant, "23.4").unwrap_err();
        assert!(err.is_configuration());
        assert!(!variant.po_path.exists());
    }

    struct RecordingRunner(RefCell<Vec<CommandSpec>>);

    impl CommandRunner for RecordingRunner {
        fn run(&self, spec: &CommandSpec) -> Result<String> {
            self.0.borrow_mut().push(spec.clone());
            Ok(String::new())
        }
    }

    struct RecordingCommitter(RefCell<Vec<(Vec<PathBuf>, String)>>);

    impl Committer for RecordingCommitter {
        fn commit(&self, paths: &[PathBuf], message: &str) -> Result<CommitOutcome> {
            self.0.borrow_mut().push((paths.to_vec(), message.to_string()));
            Ok(CommitOutcome::NothingToCommit)
        }
    }

    #[test]
    fn test_download_metadata_copies_release_notes() {
        let temp = TempDir::new().unwrap();
        let variant = ProductVariant::wordpress(temp.path());
        fs::create_dir_all(variant.release_notes.parent().unwrap()).unwrap();
        fs::write(&variant.release_notes, "* Bug fixes\n").unwrap();

        let runner = RecordingRunner(RefCell::new(Vec::new()));
        let committer = RecordingCommitter(RefCell::new(Vec::new()));
        let outcome = download_metadata(&variant, &runner, &committer).unwrap();
        assert_eq!(outcome, CommitOutcome::NothingToCommit);

        let commands = runner.0.borrow();
        assert_eq!(commands[0].program, "./download_metadata.swift");
        assert_eq!(commands[0].args, vec!["wordpress"]);
        assert_eq!(commands[0].cwd.as_deref(), Some(temp.path().join("fastlane").as_path()));

        let copied = fs::read_to_string(temp.path().join("fastlane/metadata/en-US/release_notes.txt")).unwrap();
        assert_eq!(copied, "* Bug fixes\n");

        let commits = committer.0.borrow();
        assert_eq!(commits[0].0, vec![temp.path().join("fastlane/metadata/**/*.txt")]);
        assert_eq!(commits[0].1, "Update WordPress metadata translations");
    }

    #[test]
    fn test_upload_parameters_and_deliver_command() {
        let root = Path::new("/repo");
        let common = CommonUploadParams {
            app_version: Some("23.4".to_string()),
            ..CommonUploadParams::for_project(root)
        };
        let params = upload_parameters(&ProductVariant::jetpack(root), &common, false);
        assert!(params.skip_screenshots);
        assert_eq!(params.app_identifier, "com.automattic.jetpack");
        assert_eq!(params.metadata_path, PathBuf::from("/repo/fastlane/jetpack_metadata"));

        let uploader = DeliverUploader::new(RecordingRunner(RefCell::new(Vec::new())));
        let spec = uploader.command(&params).unwrap();
        assert_eq!(spec.args[0], "deliver");
        let pairs: Vec<(&str, &str)> = spec.args[1..]
            .chunks(2)
            .map(|c| (c[0].as_str(), c[1].as_str()))
            .collect();
        assert!(pairs.contains(&("--app_version", "23.4")));
        assert!(pairs.contains(&("--skip_screenshots", "true")));
        assert!(pairs.contains(&("--phased_release", "true")));
        assert!(pairs.contains(&("--precheck_include_in_app_purchases", "false")));
        assert!(pairs.contains(&("--screenshots_path", "/repo/fastlane/jetpack_promo_screenshots")));

        uploader.upload(&params).unwrap();
        assert_eq!(uploader.runner.0.borrow().len(), 1);
    }

    #[test]
    fn test_upload_requires_version() {
        let params = upload_parameters(
            &ProductVariant::wordpress(Path::new("/repo")),
            &CommonUploadParams::default(),
            true,
        );
        assert!(!params.skip_screenshots);
        let uploader = DeliverUploader::new(RecordingRunner(RefCell::new(Vec::new())));
        assert!(uploader.upload(&params).unwrap_err().is_configuration());
    }

    #[test]
    fn test_variant_kind_parsing() {
        assert_eq!("WordPress".parse::<VariantKind>().unwrap(), VariantKind::WordPress);
        assert_eq!("jp".parse::<VariantKind>().unwrap(), VariantKind::Jetpack);
        assert!("both".parse::<VariantKind>().is_err());
    }
}
