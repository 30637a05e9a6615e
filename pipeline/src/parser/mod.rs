//! CSV tokenizer and text decoding.
//!
//! The tokenizer is deliberately forgiving: it never fails on a malformed
//! field. Quoted fields may contain commas, newlines and doubled quotes, and
//! an unterminated quote is closed implicitly at the end of the input.
//!
//! ```text
//! a,"b,c","d""e",f   →   ["a", "b,c", "d\"e", "f"]
//! ```

use crate::error::{FormatError, FormatResult};

/// CSV error with line context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// One data row with the line it starts on (1-based, header is line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A tokenized CSV document.
#[derive(Debug, Clone)]
pub struct CsvTable {
    /// Header cells, tokenized like any other row
    pub headers: Vec<String>,
    /// Data rows, blank lines removed
    pub rows: Vec<CsvRow>,
}

/// Decoded text with the encoding it was read as
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: String,
}

/// Split one CSV record into trimmed fields.
///
/// A quote opens a quoted region only as the first non-blank character of a
/// field; anywhere else it is a literal character.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            ',' if !in_quotes => {
                fields.push(finish_field(&mut current));
                field_start = true;
            }
            _ => {
                if !c.is_whitespace() {
                    field_start = false;
                }
                current.push(c);
            }
        }
    }
    fields.push(finish_field(&mut current));

    fields
}

/// Trim and strip one layer of surrounding quotes.
fn finish_field(current: &mut String) -> String {
    let field = std::mem::take(current);
    let trimmed = field.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unquoted.to_string()
}

/// Split text into records on newlines that are outside quoted fields.
///
/// Quoted regions follow the same rule as [`split_fields`], so a stray quote
/// inside an unquoted cell never joins the following lines. Returns
/// `(line, record)` pairs. A trailing `\r` is dropped and blank records are
/// skipped.
pub fn split_records(text: &str) -> Vec<(usize, &str)> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some((_, '"'))) {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            ',' if !in_quotes => field_start = true,
            '\n' => {
                line += 1;
                if !in_quotes {
                    push_record(&mut records, record_line, &text[start..idx]);
                    start = idx + 1;
                    record_line = line;
                    field_start = true;
                }
            }
            c if c.is_whitespace() => {}
            _ => field_start = false,
        }
    }
    push_record(&mut records, record_line, &text[start..]);

    records
}

fn push_record<'a>(records: &mut Vec<(usize, &'a str)>, line: usize, raw: &'a str) {
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    if !raw.trim().is_empty() {
        records.push((line, raw));
    }
}

/// Tokenize a whole CSV document. The first record is the header row.
pub fn parse_table(text: &str) -> FormatResult<CsvTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text).into_iter();

    let (_, header_line) = records.next().ok_or(FormatError::EmptyFile)?;
    let headers = split_fields(header_line);

    let rows = records
        .map(|(line, raw)| CsvRow {
            line,
            fields: split_fields(raw),
        })
        .collect();

    Ok(CsvTable { headers, rows })
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes using the specified encoding. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decode imported file bytes. Valid UTF-8 is taken as-is; anything else is
/// sniffed with chardet.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: "utf-8".to_string(),
        };
    }

    let encoding = detect_encoding(bytes);
    DecodedText {
        text: decode_content(bytes, &encoding),
        encoding,
    }
}
