//! Minimal [N-Triples](https://www.w3.org/TR/n-triples/) and
//! [N-Quads](https://www.w3.org/TR/n-quads/) reading and writing, enough to
//! populate and dump the in-memory [`Dataset`](crate::Dataset).

use crate::parser::{TermParseError, TermScanner};
use crate::triple::{GraphName, Quad, Triple};
use std::io::{self, BufRead, Write};

/// A line-based [N-Quads](https://www.w3.org/TR/n-quads/) parser.
///
/// N-Triples documents are N-Quads documents without graph names, so this
/// parser reads both.
///
/// ```
/// use rqrdf::{Dataset, NQuadsParser};
///
/// let file = "<http://example.com/s> <http://example.com/p> \"1\" <http://example.com/g> .";
/// let dataset: Dataset = NQuadsParser::new().parse_str(file)?.into_iter().collect();
/// assert_eq!(dataset.len(), 1);
/// # Result::<_,rqrdf::NQuadsParseError>::Ok(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct NQuadsParser;

impl NQuadsParser {
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Parses a full document held in memory.
    pub fn parse_str(&self, input: &str) -> Result<Vec<Quad>, NQuadsParseError> {
        let mut quads = Vec::new();
        for (line_number, line) in input.lines().enumerate() {
            if let Some(quad) =
                parse_line(line).map_err(|error| NQuadsParseError::new(line_number + 1, error))?
            {
                quads.push(quad);
            }
        }
        Ok(quads)
    }

    /// Parses a document from a reader, line by line.
    pub fn parse_reader(&self, reader: impl BufRead) -> Result<Vec<Quad>, NQuadsParseError> {
        let mut quads = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|error| NQuadsParseError {
                line: line_number + 1,
                kind: NQuadsParseErrorKind::Io(error),
            })?;
            if let Some(quad) =
                parse_line(&line).map_err(|error| NQuadsParseError::new(line_number + 1, error))?
            {
                quads.push(quad);
            }
        }
        Ok(quads)
    }
}

fn parse_line(line: &str) -> Result<Option<Quad>, TermParseError> {
    let mut scanner = TermScanner::new(line);
    if scanner.at_end() || line.trim_start().starts_with('#') {
        return Ok(None);
    }
    let subject = scanner.scan_subject()?;
    let predicate = scanner.scan_named_node()?;
    let object = scanner.scan_term()?;
    scanner.skip_whitespace();
    let graph_name = match line[scanner.position()..].chars().next() {
        Some('<') => GraphName::NamedNode(scanner.scan_named_node()?),
        Some('_') => GraphName::BlankNode(scanner.scan_blank_node()?),
        _ => GraphName::DefaultGraph,
    };
    scanner.skip_whitespace();
    let rest = line[scanner.position()..].trim();
    if rest != "." {
        return Err(TermParseError {
            position: scanner.position(),
            message: "statement terminating '.' expected".into(),
        });
    }
    Ok(Some(Quad::new(subject, predicate, object, graph_name)))
}

/// An error raised by [`NQuadsParser`]: a syntax error with its line number,
/// or an I/O error from the underlying reader.
#[derive(Debug, thiserror::Error)]
#[error("error on line {line}: {kind}")]
pub struct NQuadsParseError {
    line: usize,
    #[source]
    kind: NQuadsParseErrorKind,
}

impl NQuadsParseError {
    fn new(line: usize, error: TermParseError) -> Self {
        Self {
            line,
            kind: NQuadsParseErrorKind::Syntax(error),
        }
    }

    /// The 1-based line the error was raised on.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }
}

#[derive(Debug, thiserror::Error)]
enum NQuadsParseErrorKind {
    #[error(transparent)]
    Syntax(TermParseError),
    #[error(transparent)]
    Io(io::Error),
}

/// A streaming [N-Quads](https://www.w3.org/TR/n-quads/) serializer.
pub struct NQuadsWriter<W: Write> {
    writer: W,
}

impl<W: Write> NQuadsWriter<W> {
    #[inline]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn serialize_quad(&mut self, quad: &Quad) -> io::Result<()> {
        writeln!(self.writer, "{quad}")
    }

    pub fn serialize_triple(&mut self, triple: &Triple) -> io::Result<()> {
        writeln!(self.writer, "{triple}")
    }

    /// Returns the underlying writer.
    #[inline]
    pub fn finish(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Literal, NamedNode};

    #[test]
    fn parse_document() -> Result<(), NQuadsParseError> {
        let document = concat!(
            "# a comment\n",
            "\n",
            "<http://example.com/s> <http://example.com/p> \"x\" .\n",
            "_:b <http://example.com/p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> <http://example.com/g> .\n",
        );
        let quads = NQuadsParser::new().parse_str(document)?;
        assert_eq!(quads.len(), 2);
        assert_eq!(
            quads[0].object,
            Literal::new_simple_literal("x").into()
        );
        assert_eq!(
            quads[1].graph_name,
            NamedNode::new_unchecked("http://example.com/g").into()
        );
        Ok(())
    }

    #[test]
    fn syntax_error_carries_line() {
        let error = NQuadsParser::new()
            .parse_str("<http://example.com/s> <http://example.com/p> .")
            .unwrap_err();
        assert_eq!(error.line(), 1);
    }

    #[test]
    fn write_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let quad = Quad::new(
            NamedNode::new("http://example.com/s")?,
            NamedNode::new("http://example.com/p")?,
            Literal::new_simple_literal("o\n"),
            NamedNode::new("http://example.com/g")?,
        );
        let mut writer = NQuadsWriter::new(Vec::new());
        writer.serialize_quad(&quad)?;
        let serialized = String::from_utf8(writer.finish())?;
        assert_eq!(NQuadsParser::new().parse_str(&serialized)?, [quad]);
        Ok(())
    }
}
