//! N-Triples-style parsing of individual terms.

use crate::blank_node::BlankNode;
use crate::literal::Literal;
use crate::named_node::NamedNode;
use crate::triple::{NamedOrBlankNode, Term};
use std::char;
use std::str::FromStr;

impl FromStr for Term {
    type Err = TermParseError;

    /// Parses a term from its N-Triples/Turtle serialization.
    ///
    /// ```
    /// use rqrdf::{Literal, Term};
    /// use std::str::FromStr;
    ///
    /// assert_eq!(
    ///     Term::from_str("\"ex\\n\""),
    ///     Ok(Literal::new_simple_literal("ex\n").into())
    /// );
    /// ```
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut scanner = TermScanner::new(input);
        let term = scanner.scan_term()?;
        scanner.finish()?;
        Ok(term)
    }
}

/// An error raised while parsing a term serialization.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("error at position {position} while parsing term: {message}")]
pub struct TermParseError {
    pub(crate) position: usize,
    pub(crate) message: String,
}

impl TermParseError {
    fn msg(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

pub(crate) struct TermScanner<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> TermScanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' {
                self.position += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.skip_whitespace();
        self.position >= self.input.len()
    }

    pub fn finish(&mut self) -> Result<(), TermParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(TermParseError::msg(
                self.position,
                "unexpected trailing content",
            ))
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), TermParseError> {
        if self.peek() == Some(expected) {
            self.position += expected.len_utf8();
            Ok(())
        } else {
            Err(TermParseError::msg(
                self.position,
                format!("'{expected}' expected"),
            ))
        }
    }

    pub fn scan_term(&mut self) -> Result<Term, TermParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('<') => Ok(self.scan_named_node()?.into()),
            Some('_') => Ok(self.scan_blank_node()?.into()),
            Some('"') => Ok(self.scan_literal()?.into()),
            _ => Err(TermParseError::msg(self.position, "term expected")),
        }
    }

    pub fn scan_subject(&mut self) -> Result<NamedOrBlankNode, TermParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('<') => Ok(self.scan_named_node()?.into()),
            Some('_') => Ok(self.scan_blank_node()?.into()),
            _ => Err(TermParseError::msg(
                self.position,
                "IRI or blank node expected",
            )),
        }
    }

    pub fn scan_named_node(&mut self) -> Result<NamedNode, TermParseError> {
        self.skip_whitespace();
        let start = self.position;
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some('\\') => iri.push(self.scan_unicode_escape(start)?),
                Some(c) if c > ' ' && !matches!(c, '<' | '"' | '{' | '}' | '|' | '^' | '`') => {
                    iri.push(c)
                }
                _ => return Err(TermParseError::msg(start, "invalid IRI serialization")),
            }
        }
        NamedNode::new(iri).map_err(|e| TermParseError::msg(start, e.to_string()))
    }

    pub fn scan_blank_node(&mut self) -> Result<BlankNode, TermParseError> {
        self.skip_whitespace();
        let start = self.position;
        self.expect('_')?;
        self.expect(':')?;
        let label_start = self.position;
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            // The final dot of a statement must not be eaten as part of the label.
            if c == '.' && {
                let mut rest = self.input[self.position + 1..].chars();
                !rest.next().is_some_and(|n| !n.is_whitespace())
            } {
                break;
            }
            self.position += c.len_utf8();
        }
        BlankNode::new(&self.input[label_start..self.position])
            .map_err(|e| TermParseError::msg(start, e.to_string()))
    }

    pub fn scan_literal(&mut self) -> Result<Literal, TermParseError> {
        self.skip_whitespace();
        let start = self.position;
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\\') => value.push(self.scan_string_escape(start)?),
                Some(c) => value.push(c),
                None => {
                    return Err(TermParseError::msg(start, "unterminated string literal"));
                }
            }
        }
        match self.peek() {
            Some('@') => {
                self.position += 1;
                let tag_start = self.position;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '-' {
                        self.position += 1;
                    } else {
                        break;
                    }
                }
                Literal::new_language_tagged_literal(
                    value,
                    &self.input[tag_start..self.position],
                )
                .map_err(|e| TermParseError::msg(tag_start, e.to_string()))
            }
            Some('^') => {
                self.expect('^')?;
                self.expect('^')?;
                let datatype = self.scan_named_node()?;
                Ok(Literal::new_typed_literal(value, datatype))
            }
            _ => Ok(Literal::new_simple_literal(value)),
        }
    }

    fn scan_string_escape(&mut self, start: usize) -> Result<char, TermParseError> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('b') => Ok('\u{08}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('f') => Ok('\u{0C}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u' | 'U') => {
                self.position -= 1;
                self.scan_unicode_escape(start)
            }
            _ => Err(TermParseError::msg(start, "invalid string escape")),
        }
    }

    fn scan_unicode_escape(&mut self, start: usize) -> Result<char, TermParseError> {
        let size = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(TermParseError::msg(start, "invalid unicode escape")),
        };
        let mut code = 0_u32;
        for _ in 0..size {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| TermParseError::msg(start, "invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| TermParseError::msg(start, "invalid code point"))
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::xsd;

    #[test]
    fn parse_named_node() {
        assert_eq!(
            Term::from_str("<http://example.com/>"),
            Ok(NamedNode::new_unchecked("http://example.com/").into())
        );
        assert!(Term::from_str("<http://example.com/ >").is_err());
    }

    #[test]
    fn parse_literals() {
        assert_eq!(
            Term::from_str("\"a\\tb\""),
            Ok(Literal::new_simple_literal("a\tb").into())
        );
        assert_eq!(
            Term::from_str("\"foo\"@en"),
            Ok(Literal::new_language_tagged_literal_unchecked("foo", "en").into())
        );
        assert_eq!(
            Term::from_str("\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"),
            Ok(Literal::new_typed_literal("1", xsd::INTEGER).into())
        );
        assert_eq!(
            Term::from_str("\"\\u00E9\""),
            Ok(Literal::new_simple_literal("é").into())
        );
    }

    #[test]
    fn parse_blank_node() {
        assert_eq!(
            Term::from_str("_:b0"),
            Ok(BlankNode::new_unchecked("b0").into())
        );
    }
}
