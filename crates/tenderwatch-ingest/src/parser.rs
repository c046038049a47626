// Order Row Parser
//
// Parses one row of the registry's order export into an Order.
//
// Row format: 17 `;`-separated columns, optionally quoted with `"`.
//   - `""` inside a quoted field is a literal quote
//   - `;` inside a quoted field is literal text
//   - unquoted fields are trimmed of surrounding whitespace
// Example: 44-ФЗ;№0173100004514000123;Электронный аукцион;"Поставка ""бумаги""";...

use crate::encoding::TextEncoding;
use crate::order::{Order, ORDER_COLUMN_COUNT};
use thiserror::Error;

/// Column separator
pub const FIELD_DELIMITER: u8 = b';';

/// Field quote character
pub const QUOTE: u8 = b'"';

// ============================================================================
// Error Types
// ============================================================================

/// Row-level failure; the whole row is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid column count: expected {expected}, got {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("Unexpected quote in unquoted field {column} at byte {offset}")]
    UnexpectedQuote { column: usize, offset: usize },

    #[error("Unexpected text after closing quote in field {column} at byte {offset}")]
    TextAfterQuote { column: usize, offset: usize },

    #[error("Unterminated quoted field {column}")]
    UnterminatedQuote { column: usize },
}

pub type Result<T> = std::result::Result<T, ParseError>;

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    // Saw `"` inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
    AfterQuoted,
}

/// Split one row into exactly `columns` raw fields.
///
/// A trailing `\n` (and `\r` before it) is stripped first. Fields are
/// returned as raw bytes so callers can decode them with the feed's
/// encoding.
pub fn split_row(line: &[u8], columns: usize) -> Result<Vec<Vec<u8>>> {
    let line = strip_line_ending(line);
    let mut fields: Vec<Vec<u8>> = Vec::with_capacity(columns);
    let mut field = Vec::new();
    let mut state = State::FieldStart;

    for (offset, &byte) in line.iter().enumerate() {
        let column = fields.len() + 1;
        state = match (state, byte) {
            (State::FieldStart, FIELD_DELIMITER) => {
                fields.push(Vec::new());
                State::FieldStart
            },
            (State::FieldStart, QUOTE) => State::Quoted,
            (State::FieldStart, b) if b.is_ascii_whitespace() => State::FieldStart,
            (State::FieldStart, b) => {
                field.push(b);
                State::Unquoted
            },

            (State::Unquoted, FIELD_DELIMITER) => {
                fields.push(take_trimmed(&mut field));
                State::FieldStart
            },
            (State::Unquoted, QUOTE) => {
                return Err(ParseError::UnexpectedQuote { column, offset });
            },
            (State::Unquoted, b) => {
                field.push(b);
                State::Unquoted
            },

            (State::Quoted, QUOTE) => State::QuoteInQuoted,
            (State::Quoted, b) => {
                field.push(b);
                State::Quoted
            },

            (State::QuoteInQuoted, QUOTE) => {
                field.push(QUOTE);
                State::Quoted
            },
            (State::QuoteInQuoted | State::AfterQuoted, FIELD_DELIMITER) => {
                fields.push(std::mem::take(&mut field));
                State::FieldStart
            },
            (State::QuoteInQuoted | State::AfterQuoted, b) if b.is_ascii_whitespace() => {
                State::AfterQuoted
            },
            (State::QuoteInQuoted | State::AfterQuoted, _) => {
                return Err(ParseError::TextAfterQuote { column, offset });
            },
        };
    }

    // End of line acts as a final delimiter.
    match state {
        State::Quoted => {
            return Err(ParseError::UnterminatedQuote {
                column: fields.len() + 1,
            });
        },
        State::Unquoted => fields.push(take_trimmed(&mut field)),
        State::FieldStart | State::QuoteInQuoted | State::AfterQuoted => fields.push(field),
    }

    if fields.len() != columns {
        return Err(ParseError::ColumnCount {
            expected: columns,
            found: fields.len(),
        });
    }

    Ok(fields)
}

/// Strip one trailing `\n` and any `\r` before it
pub fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn take_trimmed(field: &mut Vec<u8>) -> Vec<u8> {
    let taken = std::mem::take(field);
    taken.trim_ascii_end().to_vec()
}

// ============================================================================
// Order Parser
// ============================================================================

/// Parser for rows of the order export
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderParser {
    encoding: TextEncoding,
}

impl OrderParser {
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Parse a single row into an Order
    ///
    /// Only row-level problems (bad quoting, wrong column count) fail here.
    /// Field-level problems are collected in [`Order::errors`].
    pub fn parse_line(&self, line: &[u8]) -> Result<Order> {
        let raw = split_row(line, ORDER_COLUMN_COUNT)?;
        let fields: Vec<String> = raw.iter().map(|f| self.encoding.decode(f)).collect();
        Ok(Order::from_fields(&fields))
    }
}

// ============================================================================
// Tests
// ============================================================================
