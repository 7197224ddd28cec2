//! Committing generated files with git.

use std::path::{Path, PathBuf};

use git2::{Commit, Index, IndexAddOption, Oid, Pathspec, PathspecFlags, Repository, Signature};
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

/// What a commit request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit was created, with its object id.
    Committed(String),
    /// The paths had no change against `HEAD`. Not an error.
    NothingToCommit,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed(_))
    }
}

/// Stages and commits a set of paths.
///
/// Paths may be files, directories, or git pathspec globs such as
/// `Resources/*.lproj/Localizable.strings`.
pub trait Committer {
    fn commit(&self, paths: &[PathBuf], message: &str) -> Result<CommitOutcome>;
}

/// [`Committer`] backed by a git2 repository.
pub struct GitCommitter {
    repo: Repository,
    workdir: PathBuf,
}

impl GitCommitter {
    /// Discovers the repository containing `start_path`.
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        let repo = Repository::discover(start_path)?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::config("cannot commit in a bare repository"))?;
        debug!(workdir = %workdir.display(), "opened git repository");
        Ok(GitCommitter { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Turns a path into a pathspec relative to the working directory.
    fn pathspec(&self, path: &Path) -> String {
        let relative = match path.strip_prefix(&self.workdir) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => self
                .workdir
                .canonicalize()
                .ok()
                .zip(canonicalize_lenient(path))
                .and_then(|(workdir, path)| path.strip_prefix(&workdir).ok().map(Path::to_path_buf))
                .unwrap_or_else(|| path.to_path_buf()),
        };
        relative.to_string_lossy().replace('\\', "/")
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(Signature::now("glotpipe", "glotpipe@localhost")?),
        }
    }
}

/// Canonicalizes the longest existing ancestor of `path`, keeping the rest
/// (which may contain glob characters) as-is.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Some(rest.iter().rev().fold(canonical, |acc, part| acc.join(part)));
        }
        rest.push(existing.file_name()?.to_os_string());
        existing = existing.parent()?;
    }
}

impl GitCommitter {
    /// Builds the tree to commit: `HEAD`'s tree with only the entries under
    /// `pathspec` replaced by their staged state. Anything else staged in
    /// the repository index stays out of the commit.
    fn tree_for_paths(
        &self,
        staged: &Index,
        parent: Option<&Commit<'_>>,
        pathspec: &Pathspec,
    ) -> Result<Oid> {
        let matches = |path: &[u8]| {
            pathspec.matches_path(
                Path::new(&*String::from_utf8_lossy(path)),
                PathspecFlags::DEFAULT,
            )
        };

        let mut tree = Index::new()?;
        if let Some(parent) = parent {
            tree.read_tree(&parent.tree()?)?;
        }
        let replaced: Vec<Vec<u8>> = tree
            .iter()
            .map(|entry| entry.path)
            .filter(|path| matches(path))
            .collect();
        for path in replaced {
            tree.remove(Path::new(&*String::from_utf8_lossy(&path)), 0)?;
        }
        for entry in staged.iter().filter(|entry| matches(&entry.path)) {
            tree.add(&entry)?;
        }
        Ok(tree.write_tree_to(&self.repo)?)
    }
}

impl Committer for GitCommitter {
    fn commit(&self, paths: &[PathBuf], message: &str) -> Result<CommitOutcome> {
        if paths.is_empty() {
            debug!("no paths given, nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let specs: Vec<String> = paths.iter().map(|p| self.pathspec(p)).collect();
        let mut index = self.repo.index()?;
        index.add_all(specs.iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(specs.iter(), None)?;
        index.write()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let pathspec = Pathspec::new(specs.iter())?;
        let tree_id = self.tree_for_paths(&index, parent.as_ref(), &pathspec)?;
        let tree = self.repo.find_tree(tree_id)?;

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => tree.is_empty(),
        };
        if unchanged {
            info!(paths = ?specs, "nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        let signature = self.signature()?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        info!(commit = %oid, subject = message, "committed");
        Ok(CommitOutcome::Committed(oid.to_string()))
    }
}
