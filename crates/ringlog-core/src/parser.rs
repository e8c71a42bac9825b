//! `Parser: fn(source_id, raw_line) -> ParsedLine`, total by contract.
//!
//! A parser never errors; malformed or binary-ish input simply degrades to
//! a line carrying the original bytes (lossily decoded) rather than failing
//! the producer task.

use crate::line::{Line, SourceId, TextLine};

/// Converts one raw input line into a stored [`Line`].
///
/// Must be total: whatever garbage arrives on the wire, `parse` returns a
/// value, never an error.
pub trait Parser<T: Line>: Send + Sync {
    fn parse(&self, source: SourceId, raw: &str) -> T;
}

/// Stores the raw line verbatim, performing no escape-sequence or
/// structured-format interpretation.
///
/// This is the only parser the core ships; ANSI/JSON-lines interpretation
/// is a presentation concern left to the renderer layer, not the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTextParser;

impl Parser<TextLine> for RawTextParser {
    fn parse(&self, source: SourceId, raw: &str) -> TextLine {
        TextLine::new(source, raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_parser_is_total_for_arbitrary_bytes() {
        let p = RawTextParser;
        let inputs = ["", "plain text", "\u{1b}[31mred\u{1b}[0m", "\0\0binary\0"];
        for raw in inputs {
            let line = p.parse(SourceId(0), raw);
            assert_eq!(line.text(), raw);
            assert_eq!(line.source_id(), SourceId(0));
        }
    }
}
