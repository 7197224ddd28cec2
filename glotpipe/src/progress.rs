//! Checking how far the release-gating locales are translated.

use tracing::{info, warn};

use crate::{error::Result, glotpress::TranslationService, locales::LocaleTable};

/// Threshold used by the release lanes.
pub const DEFAULT_THRESHOLD: u8 = 100;

/// A locale translated below the threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressViolation {
    pub locale: String,
    /// `None` when the project has no translation set for the locale.
    pub percent_translated: Option<u8>,
}

impl std::fmt::Display for ProgressViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.percent_translated {
            Some(percent) => write!(f, "{}: {}%", self.locale, percent),
            None => write!(f, "{}: not started", self.locale),
        }
    }
}

/// Returns every locale of `locales` whose completion in `project_url` is
/// below `threshold`, in table order.
pub async fn check_translation_progress(
    service: &dyn TranslationService,
    project_url: &str,
    locales: &LocaleTable,
    threshold: u8,
) -> Result<Vec<ProgressViolation>> {
    let progress = service.translation_progress(project_url).await?;

    let violations: Vec<ProgressViolation> = locales
        .iter()
        .filter_map(|locale| {
            let percent = progress
                .iter()
                .find(|p| p.locale == locale.glotpress)
                .map(|p| p.percent_translated);
            match percent {
                Some(p) if p >= threshold => None,
                _ => Some(ProgressViolation {
                    locale: locale.glotpress.clone(),
                    percent_translated: percent,
                }),
            }
        })
        .collect();

    if violations.is_empty() {
        info!(project = project_url, threshold, "all locales translated");
    } else {
        for violation in &violations {
            warn!(project = project_url, "{violation}");
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glotpress::LocaleProgress;
    use crate::locales::Locale;

    struct FixedProgress(Vec<LocaleProgress>);

    #[async_trait::async_trait]
    impl TranslationService for FixedProgress {
        async fn import_originals(&self, _: &str, _: &str, _: String) -> Result<()> {
            Ok(())
        }

        async fn export_translations(&self, _: &str, _: &str) -> Result<Option<String>> {
            Ok(None)
        }

        async fn translation_progress(&self, _: &str) -> Result<Vec<LocaleProgress>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_reports_locales_below_threshold() {
        let service = FixedProgress(vec![
            LocaleProgress { locale: "fr".into(), percent_translated: 100 },
            LocaleProgress { locale: "de".into(), percent_translated: 93 },
            LocaleProgress { locale: "bg".into(), percent_translated: 10 },
        ]);
        let locales = LocaleTable::new(vec![
            Locale::new("de", "de"),
            Locale::new("fr", "fr"),
            Locale::new("ja", "ja"),
        ])
        .unwrap();

        let violations = check_translation_progress(&service, "p/", &locales, DEFAULT_THRESHOLD)
            .await
            .unwrap();
        assert_eq!(
            violations,
            vec![
                ProgressViolation { locale: "de".into(), percent_translated: Some(93) },
                ProgressViolation { locale: "ja".into(), percent_translated: None },
            ]
        );
        assert_eq!(violations[1].to_string(), "ja: not started");

        let relaxed = check_translation_progress(&service, "p/", &locales, 90).await.unwrap();
        assert_eq!(relaxed.len(), 1);
    }
}
