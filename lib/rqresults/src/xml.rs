//! The legacy XML result-set format: one element per binding, named after
//! the variable, under a `result1#`-namespaced root.

use crate::solution::QuerySolution;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rqrdf::vocab::rdf;
use rqrdf::{Literal, Term};
use std::io::{self, Write};

const RESULTS_NAMESPACE: &str = "http://www.w3.org/2001/sw/DataAccess/result1#";

pub fn write_boolean_xml_result<W: Write>(sink: W, value: bool) -> io::Result<W> {
    do_write_boolean_xml_result(sink, value).map_err(map_xml_error)
}

fn do_write_boolean_xml_result<W: Write>(sink: W, value: bool) -> Result<W, quick_xml::Error> {
    let mut writer = start_results_document(sink)?;
    writer.write_event(Event::Start(BytesStart::new("boolean")))?;
    writer.write_event(Event::Text(BytesText::new(if value {
        "true"
    } else {
        "false"
    })))?;
    writer.write_event(Event::End(BytesEnd::new("boolean")))?;
    writer.write_event(Event::End(BytesEnd::new("results")))?;
    Ok(writer.into_inner())
}

fn start_results_document<W: Write>(sink: W) -> Result<Writer<W>, quick_xml::Error> {
    let mut writer = Writer::new(sink);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    let mut results_open = BytesStart::new("results");
    results_open.push_attribute(("xmlns", RESULTS_NAMESPACE));
    writer.write_event(Event::Start(results_open))?;
    Ok(writer)
}

pub struct XmlSolutionsWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlSolutionsWriter<W> {
    pub fn start(sink: W) -> io::Result<Self> {
        start_results_document(sink)
            .map(|writer| Self { writer })
            .map_err(map_xml_error)
    }

    pub fn write(&mut self, solution: &QuerySolution) -> io::Result<()> {
        self.do_write(solution).map_err(map_xml_error)
    }

    fn do_write(&mut self, solution: &QuerySolution) -> Result<(), quick_xml::Error> {
        self.writer
            .write_event(Event::Start(BytesStart::new("result")))?;
        for (variable, value) in solution.iter() {
            write_xml_binding(variable.as_str(), value, &mut self.writer)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("result")))
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.writer
            .write_event(Event::End(BytesEnd::new("results")))
            .map_err(map_xml_error)?;
        let mut inner = self.writer.into_inner();
        inner.flush()?;
        Ok(inner)
    }
}

fn write_xml_binding(
    name: &str,
    value: &Term,
    writer: &mut Writer<impl Write>,
) -> Result<(), quick_xml::Error> {
    let tag = BytesStart::new(name);
    match value {
        Term::NamedNode(uri) => {
            let mut tag = tag;
            tag.push_attribute(("uri", uri.as_str()));
            writer.write_event(Event::Empty(tag))?;
        }
        // Blank nodes have no representation in this format.
        Term::BlankNode(_) => {
            writer.write_event(Event::Empty(tag))?;
        }
        Term::Literal(literal) => write_xml_literal(tag, name, literal, writer)?,
    }
    Ok(())
}

fn write_xml_literal(
    mut tag: BytesStart<'_>,
    name: &str,
    literal: &Literal,
    writer: &mut Writer<impl Write>,
) -> Result<(), quick_xml::Error> {
    if let Some(language) = literal.language() {
        tag.push_attribute(("xml:lang", language));
    } else if !literal.is_plain() {
        tag.push_attribute(("datatype", literal.datatype().as_str()));
    }
    if literal.value().is_empty() {
        return writer.write_event(Event::Empty(tag));
    }
    writer.write_event(Event::Start(tag))?;
    if literal.datatype() == rdf::XML_LITERAL {
        // XML literals hold markup, emitted verbatim.
        writer.write_event(Event::Text(BytesText::from_escaped(literal.value())))?;
    } else {
        writer.write_event(Event::Text(BytesText::new(literal.value())))?;
    }
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn map_xml_error(error: quick_xml::Error) -> io::Error {
    match error {
        quick_xml::Error::Io(error) => io::Error::new(error.kind(), error.to_string()),
        _ => io::Error::new(io::ErrorKind::InvalidData, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::{NamedNode, Variable};
    use std::sync::Arc;

    fn solution(values: Vec<Option<Term>>) -> QuerySolution {
        let variables: Arc<[Variable]> = Arc::from(
            (0..values.len())
                .map(|i| Variable::new_unchecked(format!("v{i}")))
                .collect::<Vec<_>>(),
        );
        QuerySolution::from((variables, values))
    }

    #[test]
    fn uri_bindings_are_self_closing() -> io::Result<()> {
        let mut writer = XmlSolutionsWriter::start(Vec::new())?;
        writer.write(&solution(vec![Some(
            NamedNode::new_unchecked("http://example.com/?a=b&c=d").into(),
        )]))?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert!(output.contains("<result><v0 uri=\"http://example.com/?a=b&amp;c=d\"/></result>"));
        Ok(())
    }

    #[test]
    fn literal_bindings() -> io::Result<()> {
        let mut writer = XmlSolutionsWriter::start(Vec::new())?;
        writer.write(&solution(vec![
            Some(Literal::new_language_tagged_literal_unchecked("chat", "fr").into()),
            Some(Literal::new_simple_literal("").into()),
            Some(Literal::new_typed_literal("1", rqrdf::vocab::xsd::INTEGER).into()),
        ]))?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert!(output.contains("<v0 xml:lang=\"fr\">chat</v0>"));
        assert!(output.contains("<v1/>"));
        assert!(output
            .contains("<v2 datatype=\"http://www.w3.org/2001/XMLSchema#integer\">1</v2>"));
        Ok(())
    }

    #[test]
    fn escaping_round_trips() -> io::Result<()> {
        let mut writer = XmlSolutionsWriter::start(Vec::new())?;
        writer.write(&solution(vec![Some(
            Literal::new_simple_literal("a<b&c>\"d\"").into(),
        )]))?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert!(output.contains("a&lt;b&amp;c&gt;"));
        Ok(())
    }

    #[test]
    fn boolean_result() -> io::Result<()> {
        let output = String::from_utf8(write_boolean_xml_result(Vec::new(), true)?).unwrap();
        assert!(output.contains("<boolean>true</boolean>"));
        Ok(())
    }
}
