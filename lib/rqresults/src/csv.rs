//! Implementation of [SPARQL 1.1 Query Results CSV and TSV Formats](https://www.w3.org/TR/sparql11-results-csv-tsv/)

use crate::solution::QuerySolution;
use rqrdf::vocab::xsd;
use rqrdf::{Literal, Term, Variable};
use std::io::{self, Write};

pub fn write_boolean_csv_result<W: Write>(mut write: W, value: bool) -> io::Result<W> {
    write.write_all(if value { b"true" } else { b"false" })?;
    Ok(write)
}

pub struct CsvSolutionsWriter<W: Write> {
    write: W,
    width: usize,
}

impl<W: Write> CsvSolutionsWriter<W> {
    pub fn start(mut write: W, variables: &[Variable]) -> io::Result<Self> {
        let mut buffer = String::new();
        for (i, variable) in variables.iter().enumerate() {
            if i > 0 {
                buffer.push(',');
            }
            buffer.push_str(variable.as_str());
        }
        buffer.push_str("\r\n");
        write.write_all(buffer.as_bytes())?;
        Ok(Self {
            write,
            width: variables.len(),
        })
    }

    pub fn write(&mut self, solution: &QuerySolution) -> io::Result<()> {
        let mut buffer = String::new();
        for i in 0..self.width {
            if i > 0 {
                buffer.push(',');
            }
            if let Some(term) = solution.value(i) {
                write_csv_term(&mut buffer, term);
            }
        }
        buffer.push_str("\r\n");
        self.write.write_all(buffer.as_bytes())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.write.flush()?;
        Ok(self.write)
    }
}

fn write_csv_term(output: &mut String, term: &Term) {
    match term {
        Term::NamedNode(uri) => write_escaped_csv_string(output, uri.as_str()),
        Term::BlankNode(bnode) => {
            output.push_str("_:");
            output.push_str(bnode.as_str());
        }
        Term::Literal(literal) => write_escaped_csv_string(output, literal.value()),
    }
}

fn write_escaped_csv_string(output: &mut String, value: &str) {
    if value.chars().any(|c| matches!(c, '"' | ',' | '\n' | '\r')) {
        output.push('"');
        for c in value.chars() {
            if c == '"' {
                output.push('"');
            }
            output.push(c);
        }
        output.push('"');
    } else {
        output.push_str(value);
    }
}

pub fn write_boolean_tsv_result<W: Write>(mut write: W, value: bool) -> io::Result<W> {
    write.write_all(if value { b"true" } else { b"false" })?;
    Ok(write)
}

pub struct TsvSolutionsWriter<W: Write> {
    write: W,
    width: usize,
}

impl<W: Write> TsvSolutionsWriter<W> {
    pub fn start(mut write: W, variables: &[Variable]) -> io::Result<Self> {
        let mut buffer = String::new();
        for (i, variable) in variables.iter().enumerate() {
            if i > 0 {
                buffer.push('\t');
            }
            buffer.push('?');
            buffer.push_str(variable.as_str());
        }
        buffer.push('\n');
        write.write_all(buffer.as_bytes())?;
        Ok(Self {
            write,
            width: variables.len(),
        })
    }

    pub fn write(&mut self, solution: &QuerySolution) -> io::Result<()> {
        let mut buffer = String::new();
        for i in 0..self.width {
            if i > 0 {
                buffer.push('\t');
            }
            if let Some(term) = solution.value(i) {
                write_tsv_term(&mut buffer, term);
            }
        }
        buffer.push('\n');
        self.write.write_all(buffer.as_bytes())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.write.flush()?;
        Ok(self.write)
    }
}

fn write_tsv_term(output: &mut String, term: &Term) {
    match term {
        Term::Literal(literal) if is_plain_number(literal) => output.push_str(literal.value()),
        _ => output.push_str(&term.to_string()),
    }
}

/// Numeric literals may use the short Turtle form in TSV output.
fn is_plain_number(literal: &Literal) -> bool {
    let datatype = literal.datatype();
    (datatype == xsd::INTEGER || datatype == xsd::DECIMAL || datatype == xsd::DOUBLE)
        && literal.numeric_value().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::NamedNode;
    use std::sync::Arc;

    fn example_solution() -> QuerySolution {
        let variables: Arc<[Variable]> = Arc::from(vec![
            Variable::new_unchecked("x"),
            Variable::new_unchecked("literal"),
        ]);
        QuerySolution::from((
            variables,
            vec![
                Some(NamedNode::new_unchecked("http://example/x").into()),
                Some(Literal::new_simple_literal("String-with-dquote\"").into()),
            ],
        ))
    }

    #[test]
    fn csv_escaping() -> io::Result<()> {
        let variables = [
            Variable::new_unchecked("x"),
            Variable::new_unchecked("literal"),
        ];
        let mut writer = CsvSolutionsWriter::start(Vec::new(), &variables)?;
        writer.write(&example_solution())?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert_eq!(
            output,
            "x,literal\r\nhttp://example/x,\"String-with-dquote\"\"\"\r\n"
        );
        Ok(())
    }

    #[test]
    fn tsv_uses_turtle_terms() -> io::Result<()> {
        let variables = [
            Variable::new_unchecked("x"),
            Variable::new_unchecked("literal"),
        ];
        let mut writer = TsvSolutionsWriter::start(Vec::new(), &variables)?;
        writer.write(&example_solution())?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert_eq!(
            output,
            "?x\t?literal\n<http://example/x>\t\"String-with-dquote\\\"\"\n"
        );
        Ok(())
    }
}
