//! GlotPress translation-management client.
//!
//! The pipeline only needs three calls: importing originals, exporting one
//! locale's translations as `.strings`, and reading per-locale progress.
//! They sit behind [`TranslationService`] so stages can be driven by an
//! in-memory fake.

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Environment variable holding the GlotPress API token.
pub const TOKEN_ENV: &str = "GLOTPRESS_TOKEN";

/// Completion of one locale in a GlotPress project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleProgress {
    /// GlotPress locale code.
    pub locale: String,
    /// Percentage of translated originals, 0 to 100.
    pub percent_translated: u8,
}

/// Remote translation project operations used by the pipeline.
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Replaces the project's originals with the given `.strings` content.
    async fn import_originals(&self, project_url: &str, file_name: &str, content: String)
    -> Result<()>;

    /// Exports one locale as `.strings` text.
    ///
    /// Returns `None` when the project has no translation set for the locale
    /// yet.
    async fn export_translations(&self, project_url: &str, locale: &str)
    -> Result<Option<String>>;

    /// Lists the completion of every translation set of the project.
    async fn translation_progress(&self, project_url: &str) -> Result<Vec<LocaleProgress>>;
}

/// Appends a trailing slash so relative segments can be added.
pub fn project_base(project_url: &str) -> String {
    if project_url.ends_with('/') {
        project_url.to_string()
    } else {
        format!("{project_url}/")
    }
}

/// `{project}/{locale}/default/export-translations/?format=strings`
pub fn export_url(project_url: &str, locale: &str) -> String {
    format!(
        "{}{locale}/default/export-translations/?format=strings",
        project_base(project_url)
    )
}

/// `{project}/-import-originals/`
pub fn import_url(project_url: &str) -> String {
    format!("{}-import-originals/", project_base(project_url))
}

/// The JSON API mirror of a project page (`/projects/` → `/api/projects/`).
pub fn api_url(project_url: &str) -> Result<String> {
    let base = project_base(project_url);
    match base.find("/projects/") {
        Some(at) => Ok(format!("{}/api{}", &base[..at], &base[at..])),
        None => Err(Error::config(format!(
            "`{project_url}` is not a GlotPress project URL"
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    translation_sets: Vec<TranslationSet>,
}

#[derive(Debug, Deserialize)]
struct TranslationSet {
    locale: String,
    #[serde(default)]
    slug: Option<String>,
    percent_translated: serde_json::Value,
}

impl TranslationSet {
    /// GlotPress reports the percentage as a number or a numeric string.
    fn percent(&self) -> u8 {
        let value = match &self.percent_translated {
            serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
            serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        };
        value.clamp(0.0, 100.0) as u8
    }
}

/// HTTPS client for a GlotPress instance.
pub struct GlotPressClient {
    client: Client,
    token: Option<String>,
}

impl GlotPressClient {
    pub fn new(token: Option<String>) -> Self {
        GlotPressClient {
            client: Client::new(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Reads the token from [`TOKEN_ENV`].
    pub fn from_env() -> Self {
        let token = std::env::var(TOKEN_ENV).ok();
        if token.is_some() {
            debug!("loaded GlotPress token from {}", TOKEN_ENV);
        }
        Self::new(token)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn status_error(url: &str, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        Error::RemoteStatus {
            url: url.to_string(),
            status,
            message,
        }
    }
}

#[async_trait]
impl TranslationService for GlotPressClient {
    async fn import_originals(
        &self,
        project_url: &str,
        file_name: &str,
        content: String,
    ) -> Result<()> {
        let url = import_url(project_url);
        if self.token.is_none() {
            return Err(Error::config(format!(
                "importing originals requires {TOKEN_ENV} to be set"
            )));
        }

        let part = Part::text(content)
            .file_name(file_name.to_string())
            .mime_str("text/plain")?;
        let form = Form::new()
            .text("format", "strings")
            .part("import-file", part);

        let response = self
            .authorized(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::status_error(&url, response).await);
        }

        info!(url = %url, "imported originals");
        Ok(())
    }

    async fn export_translations(
        &self,
        project_url: &str,
        locale: &str,
    ) -> Result<Option<String>> {
        let url = export_url(project_url, locale);
        let response = self.authorized(self.client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(locale, "no translation set on GlotPress");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(&url, response).await);
        }

        let body = response.text().await?;
        debug!(locale, bytes = body.len(), "exported translations");
        Ok(Some(body))
    }

    async fn translation_progress(&self, project_url: &str) -> Result<Vec<LocaleProgress>> {
        let url = api_url(project_url)?;
        let response = self.authorized(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::status_error(&url, response).await);
        }

        let project: ProjectResponse = serde_json::from_str(&response.text().await?)?;
        Ok(project
            .translation_sets
            .into_iter()
            .filter(|set| set.slug.as_deref().is_none_or(|slug| slug == "default"))
            .map(|set| LocaleProgress {
                percent_translated: set.percent(),
                locale: set.locale,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let project = "https://translate.wordpress.org/projects/apps/ios/dev/";
        assert_eq!(
            export_url(project, "zh-cn"),
            "https://translate.wordpress.org/projects/apps/ios/dev/zh-cn/default/export-translations/?format=strings"
        );
        assert_eq!(
            import_url("https://translate.wordpress.org/projects/apps/ios/dev"),
            "https://translate.wordpress.org/projects/apps/ios/dev/-import-originals/"
        );
        assert_eq!(
            api_url(project).unwrap(),
            "https://translate.wordpress.org/api/projects/apps/ios/dev/"
        );
        assert!(api_url("https://example.com/apps/").is_err());
    }

    #[test]
    fn test_progress_response_parsing() {
        let json = r#"{
            "translation_sets": [
                {"locale": "fr", "slug": "default", "percent_translated": 100},
                {"locale": "de", "slug": "default", "percent_translated": "97"},
                {"locale": "de", "slug": "formal", "percent_translated": 12}
            ]
        }"#;
        let project: ProjectResponse = serde_json::from_str(json).unwrap();
        let sets: Vec<(String, u8)> = project
            .translation_sets
            .iter()
            .map(|s| (s.locale.clone(), s.percent()))
            .collect();
        assert_eq!(
            sets,
            vec![
                ("fr".to_string(), 100),
                ("de".to_string(), 97),
                ("de".to_string(), 12)
            ]
        );
    }

    #[tokio::test]
    async fn test_import_requires_token() {
        let client = GlotPressClient::new(Some(String::new()));
        let err = client
            .import_originals("https://example.com/projects/x/", "Localizable.strings", String::new())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
