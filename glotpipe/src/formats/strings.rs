//! Support for Apple `.strings` localization format.
//!
//! Provides parsing, serialization, and conversion to/from [`StringsTable`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indoc::indoc;

use crate::{
    error::Error,
    traits::Parser,
    types::{Entry, StringsTable},
};

/// Represents an Apple `.strings` localization file.
///
/// The format consists of a set of `"key" = "value";` pairs, each optionally
/// preceded by a comment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    /// Language code from the `//: Language:` header, if present.
    pub language: String,
    /// All key-value pairs (and optional comments) in file order.
    pub pairs: Vec<Pair>,
}

impl Format {
    pub fn new(language: impl Into<String>, table: &StringsTable) -> Self {
        Format {
            language: language.into(),
            pairs: table
                .iter()
                .map(|(key, entry)| Pair {
                    key: key.clone(),
                    value: entry.value.clone(),
                    comment: entry.comment.clone(),
                })
                .collect(),
        }
    }

    /// Converts into a table. When a key appears more than once the last
    /// occurrence wins, like the runtime lookup does.
    pub fn into_table(self) -> StringsTable {
        self.pairs.into_iter().map(Pair::into_keyed_entry).collect()
    }
}

impl Parser for Format {
    fn from_reader<R: std::io::BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Scanner::new(&content).parse()
    }

    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::new();

        let header = format!(
            indoc! {"
            // This file is generated by glotpipe.
            // Manual edits are overwritten by the next run.
            //
            //: Language: {}

            "},
            self.language
        );
        content.push_str(&header);

        for pair in &self.pairs {
            content.push_str(&pair.to_string());
            content.push_str("\n\n");
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }

    /// Override default file reading to support BOM-aware decoding (e.g., UTF-16 Apple .strings)
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file(path, e))?;
        // Auto-detect BOM, decode to UTF-8; passthrough UTF-8
        let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
            .bom_override(true)
            .build(file);

        let mut decoded = String::new();
        decoder
            .read_to_string(&mut decoded)
            .map_err(|e| Error::file(path, e))?;

        Scanner::new(&decoded).parse().map_err(|e| match e {
            Error::Parse { message, .. } => Error::parse(path.display().to_string(), message),
            other => other,
        })
    }
}

impl From<Format> for StringsTable {
    fn from(value: Format) -> Self {
        value.into_table()
    }
}

/// A single key-value pair in a `.strings` file, possibly with an associated comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// The key for this localization entry.
    pub key: String,
    /// The unescaped value for this localization entry.
    pub value: String,
    /// Comment immediately preceding the pair, without comment markers.
    ///
    /// Read back trimmed; a blank comment reads back as `None`. A blank line
    /// between a comment and a pair detaches the comment.
    pub comment: Option<String>,
}

impl Pair {
    fn into_keyed_entry(self) -> (String, Entry) {
        (
            self.key,
            Entry {
                value: self.value,
                comment: self.comment,
            },
        )
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(comment) = &self.comment {
            writeln!(f, "/* {} */", comment.replace("*/", "* /"))?;
        }
        write!(f, "\"{}\" = \"{}\";", escape(&self.key), escape(&self.value))
    }
}

/// Escapes a value for inclusion between double quotes.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str(r"\n"),
            '\r' => out.push_str(r"\r"),
            '\t' => out.push_str(r"\t"),
            other => out.push(other),
        }
    }
    out
}

/// Character scanner over a decoded `.strings` document.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Scanner {
    fn new(content: &str) -> Self {
        Scanner {
            chars: content.trim_start_matches('\u{feff}').chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse("<input>", format!("line {}: {}", self.line, message.into()))
    }

    /// Skips whitespace, returning how many newlines were crossed.
    fn skip_whitespace(&mut self) -> usize {
        let mut newlines = 0;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                newlines += 1;
            }
            self.bump();
        }
        newlines
    }

    fn parse(mut self) -> Result<Format, Error> {
        let mut pairs = Vec::new();
        let mut language = String::new();
        let mut pending_comment: Option<String> = None;

        loop {
            if self.skip_whitespace() > 1 {
                pending_comment = None;
            }
            match (self.peek(), self.peek_second()) {
                (None, _) => break,
                (Some('/'), Some('*')) => {
                    pending_comment = Some(self.block_comment()?);
                }
                (Some('/'), Some('/')) => {
                    let text = self.line_comment();
                    if let Some(header) = text.strip_prefix(':') {
                        if let Some((name, value)) = header.split_once(':')
                            && name.trim() == "Language"
                        {
                            language = value.trim().to_string();
                        }
                    } else {
                        pending_comment = Some(text.trim().to_string());
                    }
                }
                (Some(_), _) => {
                    let key = self.token()?;
                    self.skip_whitespace();
                    self.expect('=')?;
                    self.skip_whitespace();
                    let value = self.token()?;
                    self.skip_whitespace();
                    self.expect(';')?;
                    pairs.push(Pair {
                        key,
                        value,
                        comment: pending_comment.take().filter(|c| !c.is_empty()),
                    });
                }
            }
        }

        Ok(Format { language, pairs })
    }

    fn expect(&mut self, wanted: char) -> Result<(), Error> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(format!("expected `{wanted}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{wanted}`, found end of file"))),
        }
    }

    fn block_comment(&mut self) -> Result<String, Error> {
        self.pos += 2;
        let mut text = String::new();
        loop {
            match (self.peek(), self.peek_second()) {
                (Some('*'), Some('/')) => {
                    self.pos += 2;
                    return Ok(text.trim().to_string());
                }
                (Some(_), _) => {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
                (None, _) => return Err(self.error("unterminated comment")),
            }
        }
    }

    fn line_comment(&mut self) -> String {
        self.pos += 2;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.pos += 1;
        }
        text
    }

    /// Reads a quoted string or a bare plist word.
    fn token(&mut self) -> Result<String, Error> {
        if self.peek() == Some('"') {
            self.bump();
            return self.quoted();
        }
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '$' | '/' | ':') {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if word.is_empty() {
            let found = self.peek().map_or("end of file".to_string(), |c| format!("`{c}`"));
            return Err(self.error(format!("expected a string, found {found}")));
        }
        Ok(word)
    }

    fn quoted(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('0') => out.push('\0'),
                    Some('U') | Some('u') => out.push(self.unicode_escape()?),
                    Some(other) => out.push(other),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn hex4(&mut self) -> Result<u32, Error> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    /// Decodes the four hex digits after `\U`. A high surrogate must be
    /// followed by a `\U` low surrogate; the pair encodes one scalar.
    fn unicode_escape(&mut self) -> Result<char, Error> {
        let high = self.hex4()?;
        let code = match high {
            0xD800..=0xDBFF => {
                if self.peek() != Some('\\') || !matches!(self.peek_second(), Some('U' | 'u')) {
                    return Err(self.error("unpaired high surrogate"));
                }
                self.pos += 2;
                let low = self.hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error("invalid low surrogate"));
                }
                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
            }
            code => code,
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode scalar"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Parser;

    #[test]
    fn test_parse_basic_strings_with_comment() {
        let content = r#"
        /* Greeting for the user */
        "hello" = "Hello, world!";
        "#;
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 1);
        let pair = &parsed.pairs[0];
        assert_eq!(pair.key, "hello");
        assert_eq!(pair.value, "Hello, world!");
        assert_eq!(pair.comment.as_deref(), Some("Greeting for the user"));
    }

    #[test]
    fn test_round_trip_serialization_keeps_escapes() {
        let content = r#"
        /* Farewell */
        "bye" = "Say \"Goodbye\"\nand leave \\ now";
        "#;
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs[0].value, "Say \"Goodbye\"\nand leave \\ now");

        let output = parsed.to_string_lossy().unwrap();
        let reparsed = Format::from_str(&output).unwrap();
        assert_eq!(parsed.pairs, reparsed.pairs);
    }

    #[test]
    fn test_multiline_block_comment_and_value() {
        let content = "/* First line\n   second line */\n\"multi\" = \"line 1\nline 2\";\n";
        let parsed = Format::from_str(content).unwrap();
        let pair = &parsed.pairs[0];
        assert_eq!(pair.value, "line 1\nline 2");
        assert_eq!(pair.comment.as_deref(), Some("First line\n   second line"));
    }

    #[test]
    fn test_unicode_escapes_including_surrogate_pairs() {
        let content = r#""smile" = "\UD83D\UDE00";
"eacute" = "caf\U00e9";
"#;
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs[0].value, "\u{1F600}");
        assert_eq!(parsed.pairs[1].value, "caf\u{e9}");

        assert!(Format::from_str(r#""lonely" = "\UD83D";"#).is_err());
        assert!(Format::from_str(r#""bad" = "\UD83D\U0041";"#).is_err());
    }

    #[test]
    fn test_blank_line_detaches_comment() {
        let content = r#"
        // Standalone note

        "good" = "yes";
        // Comment for B
        "another" = "ok";
        "#;
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs.len(), 2);
        assert_eq!(parsed.pairs[0].comment, None);
        assert_eq!(parsed.pairs[1].comment.as_deref(), Some("Comment for B"));
    }

    #[test]
    fn test_language_header_is_read_back() {
        let format = Format {
            language: "fr".to_string(),
            pairs: vec![],
        };
        let output = format.to_string_lossy().unwrap();
        let reparsed = Format::from_str(&output).unwrap();
        assert_eq!(reparsed.language, "fr");
        assert!(reparsed.pairs.is_empty());
    }

    #[test]
    fn test_unquoted_plist_keys_and_unicode_escapes() {
        let content = r#"CFBundleDisplayName = "Caf\U00e9";"#;
        let parsed = Format::from_str(content).unwrap();
        assert_eq!(parsed.pairs[0].key, "CFBundleDisplayName");
        assert_eq!(parsed.pairs[0].value, "Café");
    }

    #[test]
    fn test_missing_semicolon_is_an_error() {
        let content = "\"a\" = \"b\"\n\"c\" = \"d\";";
        let err = Format::from_str(content).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_duplicate_keys_last_wins_in_table() {
        let content = "\"a\" = \"1\";\n\"a\" = \"2\";";
        let table = Format::from_str(content).unwrap().into_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value("a"), Some("2"));
    }

    #[test]
    fn test_comment_padding_is_trimmed() {
        let content = "/*   padded\t */\n\"a\" = \"1\";\n//  line  \n\"b\" = \"2\";\n/*   */\n\"c\" = \"3\";\n";
        let parsed = Format::from_str(content).unwrap();
        let comments: Vec<Option<&str>> = parsed.pairs.iter().map(|p| p.comment.as_deref()).collect();
        assert_eq!(comments, [Some("padded"), Some("line"), None]);

        let padded = Pair {
            key: "k".to_string(),
            value: "v".to_string(),
            comment: Some("  note \n".to_string()),
        };
        let reparsed = Format::from_str(&padded.to_string()).unwrap();
        assert_eq!(reparsed.pairs[0].comment.as_deref(), Some("note"));
    }

    #[test]
    fn test_comment_terminator_is_neutralised() {
        let pair = Pair {
            key: "k".to_string(),
            value: "v".to_string(),
            comment: Some("a */ b".to_string()),
        };
        assert_eq!(pair.to_string(), "/* a * / b */\n\"k\" = \"v\";");
    }

    #[test]
    fn test_utf16_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("InfoPlist.strings");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "\"NSCameraUsageDescription\" = \"Caméra\";".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        let parsed = Format::read_from(&path).unwrap();
        assert_eq!(parsed.pairs[0].value, "Caméra");
    }
}
