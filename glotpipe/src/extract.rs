//! Extracting translatable strings from Swift and Objective-C sources into
//! the canonical `Localizable.strings`.
//!
//! Two extractors are available: [`BuiltinExtractor`], which scans sources
//! with [`SourceScanner`], and [`GenstringsTool`], which delegates to Apple's
//! `genstrings` (or any tool with the same command line).

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    codec::{self, LOCALIZABLE},
    error::{Error, Result},
    process::{CommandRunner, CommandSpec},
    types::{Entry, StringsTable},
};

/// File extensions scanned for call sites.
pub const SOURCE_EXTENSIONS: &[&str] = &["swift", "m", "h"];

/// Marker always recognized in addition to the configured routines.
const STOCK_MARKER: &str = "NSLocalizedString";

/// Where to look for call sites and where to write the result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Directories to scan, relative to the project root. May contain globs
    /// (`Pods/WordPress*/`).
    pub paths: Vec<String>,
    /// Globs of paths to skip, matched against the project-relative path.
    pub exclude: Vec<String>,
    /// Names of the localization functions to recognize.
    pub routines: Vec<String>,
    /// Directory receiving `Localizable.strings`, relative to the project root.
    pub output_dir: PathBuf,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            paths: Vec::new(),
            exclude: Vec::new(),
            routines: Vec::new(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExtractOptions {
    /// The WordPress app layout.
    pub fn wordpress() -> Self {
        ExtractOptions {
            paths: vec![
                "WordPress/".into(),
                "Pods/WordPress*/".into(),
                "Pods/WPMediaPicker/".into(),
                "WordPressShared/WordPressShared/".into(),
                "Pods/Gutenberg/".into(),
            ],
            exclude: vec![
                "*Vendor*".into(),
                "WordPress/WordPressTest/**".into(),
                "**/AppLocalizedString.swift".into(),
            ],
            routines: vec!["AppLocalizedString".into()],
            output_dir: PathBuf::from("WordPress/Resources/en.lproj"),
        }
    }

    /// `<root>/<output_dir>/Localizable.strings`
    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir).join(LOCALIZABLE)
    }

    /// Language written to the header, taken from the `.lproj` output
    /// directory name.
    pub fn language(&self) -> String {
        self.output_dir
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".lproj"))
            .unwrap_or("en")
            .to_string()
    }
}

/// Produces the canonical table from source code.
pub trait Extractor {
    fn extract(&self, root: &Path, options: &ExtractOptions) -> Result<StringsTable>;
}

/// Runs `extractor` and overwrites the canonical file. Returns its path.
pub fn generate_strings_file(
    extractor: &dyn Extractor,
    root: &Path,
    options: &ExtractOptions,
) -> Result<PathBuf> {
    let table = extractor.extract(root, options)?;
    let path = options.output_path(root);
    codec::write_table(&path, &options.language(), &table)?;
    info!(path = %path.display(), entries = table.len(), "generated strings file");
    Ok(path)
}

fn has_glob_meta(s: &str) -> bool {
    s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
}

/// Directory part of `pattern` before its first glob character.
fn static_prefix_dir(pattern: &str) -> PathBuf {
    let end = pattern
        .bytes()
        .position(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
        .unwrap_or(pattern.len());
    let prefix = &pattern[..end];
    if end == pattern.len() || prefix.ends_with('/') {
        PathBuf::from(prefix)
    } else {
        Path::new(prefix)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

fn build_globset<I: IntoIterator<Item = String>>(patterns: I) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| Error::config(format!("invalid glob `{pattern}`: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build glob set: {e}")))
}

fn relative_unix(path: &Path, root: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

/// Lists the source files selected by `options`, sorted.
pub fn source_files(root: &Path, options: &ExtractOptions) -> Result<Vec<PathBuf>> {
    let include = build_globset(
        options
            .paths
            .iter()
            .map(|p| format!("{}/**", p.trim_end_matches('/'))),
    )?;
    let exclude = build_globset(options.exclude.iter().cloned())?;

    let mut roots: Vec<PathBuf> = Vec::new();
    for path in &options.paths {
        let dir = if has_glob_meta(path) {
            root.join(static_prefix_dir(path))
        } else {
            root.join(path)
        };
        if !dir.is_dir() {
            warn!(path = %dir.display(), "source path does not exist, skipping");
            continue;
        }
        if !roots.contains(&dir) {
            roots.push(dir);
        }
    }

    let mut files: Vec<PathBuf> = roots
        .par_iter()
        .map(|dir| {
            let mut out = Vec::new();
            let walker = WalkBuilder::new(dir)
                .standard_filters(false)
                .hidden(true)
                .build();
            for dent in walker.flatten() {
                if !dent.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let path = dent.path();
                let is_source = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
                if !is_source {
                    continue;
                }
                let Some(relative) = relative_unix(path, root) else {
                    continue;
                };
                if include.is_match(&relative) && !exclude.is_match(&relative) {
                    out.push(path.to_path_buf());
                }
            }
            out
        })
        .flatten()
        .collect();

    files.sort();
    files.dedup();
    debug!(count = files.len(), "selected source files");
    Ok(files)
}

/// One recognized localization call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub key: String,
    /// Explicit `value:` argument, if any.
    pub value: Option<String>,
    pub comment: Option<String>,
    /// Where the call was found, for logs.
    pub origin: String,
    pub line: usize,
}

/// Finds localization calls whose arguments are string literals.
///
/// Calls with a non-literal key, value or comment (including interpolated
/// literals) are skipped and logged.
#[derive(Debug, Clone)]
pub struct SourceScanner {
    call: Regex,
    label: Regex,
}

impl SourceScanner {
    pub fn new(routines: &[String]) -> Result<Self> {
        let mut names: Vec<String> = routines.iter().map(|r| regex::escape(r)).collect();
        if !routines.iter().any(|r| r == STOCK_MARKER) {
            names.push(STOCK_MARKER.to_string());
        }
        let call = Regex::new(&format!(r"\b(?:{})\s*\(", names.join("|")))
            .map_err(|e| Error::config(format!("invalid routine name: {e}")))?;
        let label = Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)\s*:\s*(.*)$")
            .map_err(|e| Error::config(e.to_string()))?;
        Ok(SourceScanner { call, label })
    }

    /// Scans one source text. `origin` is only used in logs.
    pub fn scan_source(&self, origin: &str, source: &str) -> Vec<CallSite> {
        let source = mask_comments(source);
        let source = source.as_str();
        let mut sites = Vec::new();
        for found in self.call.find_iter(source) {
            let line_start = source[..found.start()].rfind('\n').map_or(0, |i| i + 1);
            let before = source[line_start..found.start()].trim_end();
            if before.ends_with("func") || before.ends_with("#define") {
                continue;
            }

            let line = source[..found.start()].matches('\n').count() + 1;
            let Some(args) = split_args(&source[found.end()..]) else {
                warn!(origin, line, "unbalanced localization call, skipping");
                continue;
            };

            match self.call_site(&args) {
                Ok((key, value, comment)) => sites.push(CallSite {
                    key,
                    value,
                    comment,
                    origin: origin.to_string(),
                    line,
                }),
                Err(reason) => warn!(origin, line, reason, "skipping localization call"),
            }
        }
        sites
    }

    fn call_site(
        &self,
        args: &[String],
    ) -> std::result::Result<(String, Option<String>, Option<String>), &'static str> {
        let mut positional = Vec::new();
        let mut value = None;
        let mut comment = None;

        for arg in args {
            match self.label.captures(arg) {
                Some(caps) => {
                    let expr = caps.get(2).map_or("", |m| m.as_str());
                    match caps.get(1).map(|m| m.as_str()) {
                        Some("value") => {
                            value = Some(string_literal(expr).ok_or("non-literal value")?)
                        }
                        Some("comment") => {
                            comment = Some(string_literal(expr).ok_or("non-literal comment")?)
                        }
                        _ => {}
                    }
                }
                None => positional.push(arg.as_str()),
            }
        }

        let key = positional
            .first()
            .ok_or("missing key")
            .and_then(|k| string_literal(k).ok_or("non-literal key"))?;
        if comment.is_none()
            && let Some(second) = positional.get(1)
        {
            comment = Some(string_literal(second).ok_or("non-literal comment")?);
        }
        Ok((key, value, comment))
    }
}

/// Blanks out `//` and `/* */` comments (nested, as in Swift) with spaces,
/// keeping line breaks. String and character literals are copied as-is, so
/// `"https://..."` is not a comment.
fn mask_comments(source: &str) -> String {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum State {
        Code,
        Str,
        MultilineStr,
        CharLiteral,
        LineComment,
        BlockComment(usize),
    }

    let chars: Vec<char> = source.chars().collect();
    let at = |i: usize| chars.get(i).copied();
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut i = 0;

    while let Some(c) = at(i) {
        match state {
            State::Code => match (c, at(i + 1)) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    out.push_str("  ");
                    i += 1;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment(1);
                    out.push_str("  ");
                    i += 1;
                }
                ('"', Some('"')) if at(i + 2) == Some('"') => {
                    state = State::MultilineStr;
                    out.push_str("\"\"\"");
                    i += 2;
                }
                ('"', _) => {
                    state = State::Str;
                    out.push(c);
                }
                ('\'', _) => {
                    state = State::CharLiteral;
                    out.push(c);
                }
                _ => out.push(c),
            },
            State::Str | State::CharLiteral => {
                out.push(c);
                match c {
                    '\\' => {
                        if let Some(next) = at(i + 1) {
                            out.push(next);
                            i += 1;
                        }
                    }
                    '\n' => state = State::Code,
                    '"' if state == State::Str => state = State::Code,
                    '\'' if state == State::CharLiteral => state = State::Code,
                    _ => {}
                }
            }
            State::MultilineStr => {
                if c == '"' && at(i + 1) == Some('"') && at(i + 2) == Some('"') {
                    state = State::Code;
                    out.push_str("\"\"\"");
                    i += 2;
                } else {
                    out.push(c);
                    if c == '\\'
                        && let Some(next) = at(i + 1)
                    {
                        out.push(next);
                        i += 1;
                    }
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    out.push(c);
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment(depth) => match (c, at(i + 1)) {
                ('*', Some('/')) => {
                    state = if depth == 1 {
                        State::Code
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    out.push_str("  ");
                    i += 1;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment(depth + 1);
                    out.push_str("  ");
                    i += 1;
                }
                ('\n', _) => out.push('\n'),
                _ => out.push(' '),
            },
        }
        i += 1;
    }
    out
}

/// Splits the argument list following an opening parenthesis. Returns `None`
/// when the closing parenthesis is missing.
fn split_args(rest: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut interpolation = 0usize;
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string && interpolation == 0 {
            current.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        if next == '(' {
                            interpolation = 1;
                        }
                    }
                }
                '"' => in_string = false,
                '\n' => return None,
                _ => {}
            }
            continue;
        }
        if interpolation > 0 {
            current.push(c);
            match c {
                '(' => interpolation += 1,
                ')' => interpolation -= 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => {
                if !current.trim().is_empty() {
                    args.push(current.trim().to_string());
                }
                return Some(args);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    None
}

/// Decodes a single string literal (`"..."` or `@"..."`). Returns `None` for
/// anything else, including interpolated and concatenated literals.
fn string_literal(expr: &str) -> Option<String> {
    let expr = expr.trim();
    let expr = expr.strip_prefix('@').unwrap_or(expr);
    let body = expr.strip_prefix('"')?.strip_suffix('"')?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                'u' => {
                    let rest = chars.as_str();
                    let (hex, consumed) = if let Some(braced) = rest.strip_prefix('{') {
                        let end = braced.find('}')?;
                        (&braced[..end], end + 2)
                    } else {
                        (rest.get(..4)?, 4)
                    };
                    out.push(char::from_u32(u32::from_str_radix(hex, 16).ok()?)?);
                    chars = rest.get(consumed..)?.chars();
                }
                _ => return None,
            },
            _ => out.push(c),
        }
    }
    Some(out)
}

/// Folds call sites into a table. The first site of a key provides the
/// value; distinct comments of later sites are appended.
pub fn collect_table(sites: impl IntoIterator<Item = CallSite>) -> StringsTable {
    let mut table = StringsTable::new();
    for site in sites {
        if let Some(entry) = table.get_mut(&site.key) {
            if let Some(comment) = site.comment.filter(|c| !c.trim().is_empty()) {
                match &mut entry.comment {
                    Some(existing) if existing.split('\n').any(|c| c == comment) => {}
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(&comment);
                    }
                    None => entry.comment = Some(comment),
                }
            }
            continue;
        }

        let value = site.value.unwrap_or_else(|| site.key.clone());
        let mut entry = Entry::new(value);
        if let Some(comment) = site.comment {
            entry = entry.with_comment(comment);
        }
        table.insert(site.key, entry);
    }
    table
}

/// Scans sources in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinExtractor;

impl Extractor for BuiltinExtractor {
    fn extract(&self, root: &Path, options: &ExtractOptions) -> Result<StringsTable> {
        let scanner = SourceScanner::new(&options.routines)?;
        let files = source_files(root, options)?;

        let per_file = files
            .par_iter()
            .map(|path| {
                let source = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
                let origin = relative_unix(path, root).unwrap_or_else(|| path.display().to_string());
                Ok(scanner.scan_source(&origin, &source))
            })
            .collect::<Result<Vec<_>>>()?;

        let table = collect_table(per_file.into_iter().flatten());
        info!(files = files.len(), entries = table.len(), "scanned sources");
        Ok(table)
    }
}

/// Delegates extraction to an external `genstrings`-compatible tool.
pub struct GenstringsTool<R> {
    program: String,
    runner: R,
}

impl<R: CommandRunner> GenstringsTool<R> {
    pub fn new(program: impl Into<String>, runner: R) -> Self {
        GenstringsTool {
            program: program.into(),
            runner,
        }
    }
}

impl<R: CommandRunner> Extractor for GenstringsTool<R> {
    fn extract(&self, root: &Path, options: &ExtractOptions) -> Result<StringsTable> {
        let files = source_files(root, options)?;
        if files.is_empty() {
            warn!("no source files selected");
            return Ok(StringsTable::new());
        }

        let out_dir = tempfile::tempdir()?;
        let mut spec = CommandSpec::new(&self.program)
            .arg("-q")
            .arg("-o")
            .arg(out_dir.path().to_string_lossy());
        for routine in &options.routines {
            spec = spec.arg("-s").arg(routine);
        }
        spec = spec
            .args(files.iter().map(|f| f.to_string_lossy().into_owned()))
            .current_dir(root);

        self.runner.run(&spec)?;
        codec::read_table_or_empty(out_dir.path().join(LOCALIZABLE))
    }
}
