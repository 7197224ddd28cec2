//! Pipeline configuration.
//!
//! [`PipelineConfig::wordpress`] holds the built-in layout of the app
//! repository. A `glotpipe.toml` found in the project root (or any parent)
//! overrides parts of it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    extract::ExtractOptions,
    locales::{Locale, LocaleTable},
    merge::{ManualFile, ManualFileTable},
    metadata::{CommonUploadParams, ProductVariant, VariantKind},
};

/// Name of the configuration file searched for.
pub const CONFIG_FILE_NAME: &str = "glotpipe.toml";

/// GlotPress project of the app strings.
pub const APP_STRINGS_URL: &str = "https://translate.wordpress.org/projects/apps/ios/dev/";

/// Everything the lanes need, resolved against one project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub project_root: PathBuf,
    pub app_strings_url: String,
    /// Parent of the app's `.lproj` directories.
    pub resources_dir: PathBuf,
    pub locales: LocaleTable,
    /// Locales whose progress is checked before a release.
    pub progress_locales: LocaleTable,
    pub manual_files: ManualFileTable,
    pub extract: ExtractOptions,
    pub upload: CommonUploadParams,
    /// xcconfig holding `VERSION_SHORT`.
    pub version_config: PathBuf,
}

impl PipelineConfig {
    /// The built-in WordPress/Jetpack layout under `root`.
    pub fn wordpress(root: &Path) -> Self {
        PipelineConfig {
            project_root: root.to_path_buf(),
            app_strings_url: APP_STRINGS_URL.to_string(),
            resources_dir: root.join("WordPress/Resources"),
            locales: LocaleTable::wordpress(),
            progress_locales: LocaleTable::mag16(),
            manual_files: ManualFileTable::wordpress(root),
            extract: ExtractOptions::wordpress(),
            upload: CommonUploadParams::for_project(root),
            version_config: root.join("config/Version.public.xcconfig"),
        }
    }

    /// Loads `explicit`, or the nearest `glotpipe.toml` above `root`, on top
    /// of the built-in layout. Returns the file used, if any.
    ///
    /// Relative paths in the file are resolved against `root`.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let mut config = Self::wordpress(root);
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config(root),
        };

        if let Some(path) = &path {
            info!(path = %path.display(), "loading config");
            let content = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
            let file: ConfigFile = toml::from_str(&content)?;
            config.apply(file)?;
            debug!(path = %path.display(), "config loaded and validated");
        }

        config.validate()?;
        Ok((config, path))
    }

    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            self.project_root.join(path)
        }
    }

    fn apply(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(url) = file.app_strings_url {
            self.app_strings_url = url;
        }
        if let Some(dir) = file.resources_dir {
            self.resources_dir = self.resolve(dir);
        }
        if let Some(locales) = file.locales {
            self.locales = LocaleTable::new(locales)?;
            // Without an explicit list, keep only the gating locales that still exist.
            let kept = self
                .progress_locales
                .iter()
                .filter(|l| self.locales.lookup(&l.glotpress).is_ok())
                .cloned()
                .collect();
            self.progress_locales = LocaleTable::new(kept)?;
        }
        if let Some(codes) = file.progress_locales {
            self.progress_locales = LocaleTable::new(self.locales.resolve(&codes)?)?;
        }
        if let Some(files) = file.manual_files {
            let files = files
                .into_iter()
                .map(|f| ManualFile::new(self.resolve(f.path), f.prefix))
                .collect();
            self.manual_files = ManualFileTable::new(files)?;
        }
        if let Some(extract) = file.extract {
            self.extract = extract;
        }
        if let Some(upload) = file.upload {
            self.upload = CommonUploadParams {
                api_key_path: upload.api_key_path.map(|p| self.resolve(p)),
                app_rating_config_path: upload.app_rating_config_path.map(|p| self.resolve(p)),
                ..upload
            };
        }
        if let Some(path) = file.version_config {
            self.version_config = self.resolve(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.locales.validate()?;
        self.manual_files.validate()?;
        if self.app_strings_url.trim().is_empty() {
            return Err(Error::config("app_strings_url is empty"));
        }
        Ok(())
    }

    /// The product variant of `kind` under the project root.
    pub fn variant(&self, kind: VariantKind) -> ProductVariant {
        ProductVariant::for_kind(kind, &self.project_root)
    }

    /// Upload parameters with the app version filled in from the version
    /// xcconfig when not configured.
    pub fn upload_params(&self) -> Result<CommonUploadParams> {
        let mut params = self.upload.clone();
        if params.app_version.is_none() {
            params.app_version = Some(read_version_from_xcconfig(&self.version_config)?);
        }
        Ok(params)
    }
}

/// Searches `start_dir` and its parents for [`CONFIG_FILE_NAME`].
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            info!(path = %candidate.display(), "found config file");
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    debug!("no config file found");
    None
}

/// Reads `VERSION_SHORT` from an xcconfig file.
pub fn read_version_from_xcconfig(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .filter_map(|line| line.split_once('='))
        .find(|(name, _)| name.trim() == "VERSION_SHORT")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            Error::config(format!("no VERSION_SHORT in `{}`", path.display()))
        })
}

/// On-disk shape of `glotpipe.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    app_strings_url: Option<String>,
    resources_dir: Option<PathBuf>,
    locales: Option<Vec<Locale>>,
    progress_locales: Option<Vec<String>>,
    manual_files: Option<Vec<ManualFile>>,
    extract: Option<ExtractOptions>,
    upload: Option<CommonUploadParams>,
    version_config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = PipelineConfig::load(temp.path(), None).unwrap();
        assert!(path.is_none());
        assert_eq!(config, PipelineConfig::wordpress(temp.path()));
        assert_eq!(config.locales.len(), 33);
        assert_eq!(config.progress_locales.len(), 16);
        assert_eq!(config.manual_files.len(), 3);
    }

    #[test]
    fn test_file_found_in_parent_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            indoc! {r#"
                app_strings_url = "https://example.com/projects/app/"
                resources_dir = "App/Resources"
                progress_locales = ["fr"]

                [[locales]]
                glotpress = "fr"
                lproj = "fr"

                [[locales]]
                glotpress = "zh-cn"
                lproj = "zh-Hans"

                [[manual_files]]
                path = "App/Resources/en.lproj/InfoPlist.strings"
                prefix = "infoplist."

                [upload]
                app_version = "1.2"
                phased_release = false
            "#},
        )
        .unwrap();
        let nested = temp.path().join("fastlane");
        fs::create_dir_all(&nested).unwrap();

        let (config, path) = PipelineConfig::load(&nested, None).unwrap();
        assert_eq!(path, Some(temp.path().join(CONFIG_FILE_NAME)));
        assert_eq!(config.app_strings_url, "https://example.com/projects/app/");
        assert_eq!(config.resources_dir, nested.join("App/Resources"));
        assert_eq!(config.locales.len(), 2);
        assert_eq!(config.progress_locales.len(), 1);
        assert_eq!(
            config.manual_files.iter().next().unwrap().path,
            nested.join("App/Resources/en.lproj/InfoPlist.strings")
        );
        assert!(!config.upload.phased_release);
        assert!(config.upload.skip_binary_upload);
        assert_eq!(config.upload_params().unwrap().app_version.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        fs::write(&path, "progress_locales = [\"xx\"]\n").unwrap();
        let err = PipelineConfig::load(temp.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, Error::UnmappedLocale(_)));

        fs::write(&path, "unknown_key = 1\n").unwrap();
        let err = PipelineConfig::load(temp.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));

        fs::write(
            &path,
            indoc! {r#"
                [[manual_files]]
                path = "A/en.lproj/A.strings"
                prefix = "x."

                [[manual_files]]
                path = "B/en.lproj/B.strings"
                prefix = "x."
            "#},
        )
        .unwrap();
        let err = PipelineConfig::load(temp.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, Error::DuplicatePrefix { .. }));
    }

    #[test]
    fn test_read_version_from_xcconfig() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Version.public.xcconfig");
        fs::write(&path, "// VERSION_SHORT=1.0\nVERSION_SHORT=23.4\nVERSION_LONG=23.4.0.1\n").unwrap();
        assert_eq!(read_version_from_xcconfig(&path).unwrap(), "23.4");

        fs::write(&path, "VERSION_LONG=23.4.0.1\n").unwrap();
        assert!(read_version_from_xcconfig(&path).unwrap_err().is_configuration());
    }
}
