//! Implementation of [SPARQL 1.1 Query Results JSON Format](https://www.w3.org/TR/sparql11-results-json/)

use crate::solution::QuerySolution;
use json_event_parser::{JsonEvent, WriterJsonSerializer};
use rqrdf::{Term, Variable};
use std::io::{self, Write};

pub fn write_boolean_json_result<W: Write>(writer: W, value: bool) -> io::Result<W> {
    let mut serializer = WriterJsonSerializer::new(writer);
    serializer.serialize_event(JsonEvent::StartObject)?;
    serializer.serialize_event(JsonEvent::ObjectKey("head".into()))?;
    serializer.serialize_event(JsonEvent::StartObject)?;
    serializer.serialize_event(JsonEvent::EndObject)?;
    serializer.serialize_event(JsonEvent::ObjectKey("boolean".into()))?;
    serializer.serialize_event(JsonEvent::Boolean(value))?;
    serializer.serialize_event(JsonEvent::EndObject)?;
    serializer.finish()
}

pub struct JsonSolutionsWriter<W: Write> {
    serializer: WriterJsonSerializer<W>,
}

impl<W: Write> JsonSolutionsWriter<W> {
    pub fn start(writer: W, variables: &[Variable]) -> io::Result<Self> {
        let mut serializer = WriterJsonSerializer::new(writer);
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("head".into()))?;
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("vars".into()))?;
        serializer.serialize_event(JsonEvent::StartArray)?;
        for variable in variables {
            serializer.serialize_event(JsonEvent::String(variable.as_str().into()))?;
        }
        serializer.serialize_event(JsonEvent::EndArray)?;
        serializer.serialize_event(JsonEvent::EndObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("results".into()))?;
        serializer.serialize_event(JsonEvent::StartObject)?;
        serializer.serialize_event(JsonEvent::ObjectKey("bindings".into()))?;
        serializer.serialize_event(JsonEvent::StartArray)?;
        Ok(Self { serializer })
    }

    pub fn write(&mut self, solution: &QuerySolution) -> io::Result<()> {
        self.serializer.serialize_event(JsonEvent::StartObject)?;
        for (variable, value) in solution.iter() {
            self.serializer
                .serialize_event(JsonEvent::ObjectKey(variable.as_str().into()))?;
            write_json_term(&mut self.serializer, value)?;
        }
        self.serializer.serialize_event(JsonEvent::EndObject)
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.serializer.serialize_event(JsonEvent::EndArray)?;
        self.serializer.serialize_event(JsonEvent::EndObject)?;
        self.serializer.serialize_event(JsonEvent::EndObject)?;
        self.serializer.finish()
    }
}

fn write_json_term<W: Write>(
    serializer: &mut WriterJsonSerializer<W>,
    term: &Term,
) -> io::Result<()> {
    serializer.serialize_event(JsonEvent::StartObject)?;
    match term {
        Term::NamedNode(uri) => {
            serializer.serialize_event(JsonEvent::ObjectKey("type".into()))?;
            serializer.serialize_event(JsonEvent::String("uri".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(uri.as_str().into()))?;
        }
        Term::BlankNode(bnode) => {
            serializer.serialize_event(JsonEvent::ObjectKey("type".into()))?;
            serializer.serialize_event(JsonEvent::String("bnode".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(bnode.as_str().into()))?;
        }
        Term::Literal(literal) => {
            serializer.serialize_event(JsonEvent::ObjectKey("type".into()))?;
            serializer.serialize_event(JsonEvent::String("literal".into()))?;
            serializer.serialize_event(JsonEvent::ObjectKey("value".into()))?;
            serializer.serialize_event(JsonEvent::String(literal.value().into()))?;
            if let Some(language) = literal.language() {
                serializer.serialize_event(JsonEvent::ObjectKey("xml:lang".into()))?;
                serializer.serialize_event(JsonEvent::String(language.into()))?;
            } else if !literal.is_plain() {
                serializer.serialize_event(JsonEvent::ObjectKey("datatype".into()))?;
                serializer
                    .serialize_event(JsonEvent::String(literal.datatype().as_str().into()))?;
            }
        }
    }
    serializer.serialize_event(JsonEvent::EndObject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::Literal;
    use std::sync::Arc;

    #[test]
    fn solutions_document_shape() -> io::Result<()> {
        let variables: Arc<[Variable]> = Arc::from(vec![Variable::new_unchecked("x")]);
        let mut writer = JsonSolutionsWriter::start(Vec::new(), &variables)?;
        writer.write(&QuerySolution::from((
            Arc::clone(&variables),
            vec![Some(Literal::new_language_tagged_literal_unchecked("chat", "fr").into())],
        )))?;
        let output = String::from_utf8(writer.finish()?).unwrap();
        assert_eq!(
            output,
            "{\"head\":{\"vars\":[\"x\"]},\"results\":{\"bindings\":[{\"x\":{\"type\":\"literal\",\"value\":\"chat\",\"xml:lang\":\"fr\"}}]}}"
        );
        Ok(())
    }

    #[test]
    fn boolean_document_shape() -> io::Result<()> {
        let output = String::from_utf8(write_boolean_json_result(Vec::new(), false)?).unwrap();
        assert_eq!(output, "{\"head\":{},\"boolean\":false}");
        Ok(())
    }
}
