//! Human-readable lane summaries.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use glotpipe::CommitOutcome;
use glotpipe::lanes::{DownloadReport, ProjectProgress};

pub fn commit_line(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Committed(id) => format!("Committed {}", short_id(id)),
        CommitOutcome::NothingToCommit => "Nothing to commit".to_string(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Paths relative to `root` when possible, one per line.
pub fn path_list(root: &Path, paths: &[PathBuf]) -> String {
    let mut out = String::new();
    for path in paths {
        let shown = path.strip_prefix(root).unwrap_or(path);
        let _ = writeln!(out, "  {}", shown.display());
    }
    out
}

pub fn download_summary(root: &Path, report: &DownloadReport) -> String {
    let mut out = format!(
        "Downloaded {} Localizable.strings file(s)\n",
        report.localizable.len()
    );
    out.push_str(&path_list(root, &report.localizable));
    if report.manual.is_empty() {
        out.push_str("No manual .strings file changed\n");
    } else {
        let _ = writeln!(out, "Updated {} manual .strings file(s)", report.manual.len());
        out.push_str(&path_list(root, &report.manual));
    }
    out
}

/// One block per project; an empty project prints a single "ok" line.
pub fn progress_summary(project: &ProjectProgress, threshold: u8) -> String {
    if project.violations.is_empty() {
        return format!(
            "{}: all locales at or above {threshold}%\n",
            project.project_url
        );
    }
    let mut out = format!(
        "{}: {} locale(s) below {threshold}%\n",
        project.project_url,
        project.violations.len()
    );
    for violation in &project.violations {
        let _ = writeln!(out, "  {violation}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glotpipe::progress::ProgressViolation;

    #[test]
    fn test_commit_line_shortens_id() {
        assert_eq!(
            commit_line(&CommitOutcome::Committed("0123456789abcdef".into())),
            "Committed 01234567"
        );
        assert_eq!(
            commit_line(&CommitOutcome::NothingToCommit),
            "Nothing to commit"
        );
    }

    #[test]
    fn test_download_summary_lists_relative_paths() {
        let root = Path::new("/repo");
        let report = DownloadReport {
            localizable: vec![root.join("Resources/fr.lproj/Localizable.strings")],
            manual: vec![],
            metadata: vec![],
        };
        let summary = download_summary(root, &report);
        assert!(summary.contains("  Resources/fr.lproj/Localizable.strings\n"));
        assert!(summary.contains("No manual .strings file changed"));
    }

    #[test]
    fn test_progress_summary_lists_violations() {
        let project = ProjectProgress {
            project_url: "https://example.com/projects/app/".into(),
            violations: vec![ProgressViolation {
                locale: "fr".into(),
                percent_translated: Some(80),
            }],
        };
        let summary = progress_summary(&project, 100);
        assert!(summary.starts_with("https://example.com/projects/app/: 1 locale(s) below 100%"));
        assert_eq!(summary.lines().count(), 2);
    }
}
