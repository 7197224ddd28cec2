//! Support for gettext `.po` files.
//!
//! Only the subset used for App Store metadata is modelled: one entry per
//! `msgctxt`, singular `msgid`/`msgstr`, extracted comments (`#.`), and the
//! header entry.

use crate::{error::Error, traits::Parser};

/// One `msgctxt`/`msgid`/`msgstr` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoEntry {
    /// Extracted comments (`#. ...`), one per line.
    pub comments: Vec<String>,
    pub context: Option<String>,
    pub id: String,
    pub translation: String,
}

impl PoEntry {
    pub fn new(context: impl Into<String>, id: impl Into<String>) -> Self {
        PoEntry {
            comments: Vec::new(),
            context: Some(context.into()),
            id: id.into(),
            translation: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

/// A gettext catalog: header fields plus entries in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    /// Header fields (`Name: value`) of the empty-msgid entry, in order.
    pub header: Vec<(String, String)>,
    pub entries: Vec<PoEntry>,
}

impl Format {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn find_by_context(&self, context: &str) -> Option<&PoEntry> {
        self.entries
            .iter()
            .find(|e| e.context.as_deref() == Some(context))
    }

    fn header_text(&self) -> String {
        self.header
            .iter()
            .map(|(key, value)| format!("{key}: {value}\n"))
            .collect()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    Translation,
}

impl Parser for Format {
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        let mut format = Format::default();
        let mut current = PoEntry::default();
        let mut field: Option<Field> = None;
        let mut started = false;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let origin = || format!("line {}", index + 1);

            if line.is_empty() {
                flush(&mut current, &mut started, &mut format);
                field = None;
                continue;
            }

            if let Some(comment) = line.strip_prefix("#.") {
                if field == Some(Field::Translation) {
                    flush(&mut current, &mut started, &mut format);
                    field = None;
                }
                current.comments.push(comment.trim().to_string());
                started = true;
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            let (next_field, rest) = if let Some(rest) = line.strip_prefix("msgctxt ") {
                if field == Some(Field::Translation) {
                    flush(&mut current, &mut started, &mut format);
                }
                (Field::Context, rest)
            } else if let Some(rest) = line.strip_prefix("msgid ") {
                if field == Some(Field::Translation) {
                    flush(&mut current, &mut started, &mut format);
                }
                (Field::Id, rest)
            } else if let Some(rest) = line.strip_prefix("msgstr ") {
                (Field::Translation, rest)
            } else if line.starts_with('"') {
                let Some(active) = field else {
                    return Err(Error::parse(origin(), "continuation line outside an entry"));
                };
                (active, line)
            } else {
                return Err(Error::parse(origin(), format!("unexpected line `{line}`")));
            };

            let text = unquote(rest).map_err(|message| Error::parse(origin(), message))?;
            match next_field {
                Field::Context => current.context.get_or_insert_with(String::new).push_str(&text),
                Field::Id => current.id.push_str(&text),
                Field::Translation => current.translation.push_str(&text),
            }
            field = Some(next_field);
            started = true;
        }
        flush(&mut current, &mut started, &mut format);

        Ok(format)
    }

    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::new();

        content.push_str("msgid \"\"\n");
        content.push_str(&quote_field("msgstr", &self.header_text()));
        content.push('\n');

        for entry in &self.entries {
            for comment in &entry.comments {
                content.push_str(&format!("#. {comment}\n"));
            }
            if let Some(context) = &entry.context {
                content.push_str(&quote_field("msgctxt", context));
            }
            content.push_str(&quote_field("msgid", &entry.id));
            content.push_str(&quote_field("msgstr", &entry.translation));
            content.push('\n');
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }
}

fn flush(entry: &mut PoEntry, started: &mut bool, format: &mut Format) {
    if !*started {
        return;
    }
    let entry = std::mem::take(entry);
    if entry.id.is_empty() && entry.context.is_none() {
        format.header = parse_header(&entry.translation);
    } else {
        format.entries.push(entry);
    }
    *started = false;
}

fn parse_header(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Formats `keyword "text"`, splitting multi-line text gettext-style.
fn quote_field(keyword: &str, text: &str) -> String {
    if !text.contains('\n') || text == "\n" {
        return format!("{keyword} \"{}\"\n", escape(text));
    }
    let mut out = format!("{keyword} \"\"\n");
    for line in text.split_inclusive('\n') {
        out.push_str(&format!("\"{}\"\n", escape(line)));
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str(r"\n"),
            '\t' => out.push_str(r"\t"),
            '\r' => out.push_str(r"\r"),
            other => out.push(other),
        }
    }
    out
}

fn unquote(text: &str) -> Result<String, String> {
    let inner = text
        .trim()
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| format!("expected a quoted string, found `{text}`"))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}
