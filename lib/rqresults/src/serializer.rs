use crate::csv::{
    write_boolean_csv_result, write_boolean_tsv_result, CsvSolutionsWriter, TsvSolutionsWriter,
};
use crate::format::QueryResultsFormat;
use crate::json::{write_boolean_json_result, JsonSolutionsWriter};
use crate::solution::QuerySolution;
use crate::xml::{write_boolean_xml_result, XmlSolutionsWriter};
use rqrdf::Variable;
use std::io::{self, Write};

/// A serializer for [SPARQL query results](https://www.w3.org/TR/sparql11-query/#QueryForms)
/// in all the supported [`QueryResultsFormat`]s.
///
/// ```
/// use rqresults::{QueryResultsFormat, QueryResultsSerializer};
///
/// let serializer = QueryResultsSerializer::from_format(QueryResultsFormat::Json);
/// let output = serializer.serialize_boolean_to_writer(Vec::new(), true)?;
/// assert_eq!(output, b"{\"head\":{},\"boolean\":true}");
/// # std::io::Result::Ok(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct QueryResultsSerializer {
    format: QueryResultsFormat,
}

impl QueryResultsSerializer {
    #[inline]
    pub fn from_format(format: QueryResultsFormat) -> Self {
        Self { format }
    }

    /// Serializes an `ASK` result.
    pub fn serialize_boolean_to_writer<W: Write>(self, writer: W, value: bool) -> io::Result<W> {
        match self.format {
            QueryResultsFormat::Xml => write_boolean_xml_result(writer, value),
            QueryResultsFormat::Json => write_boolean_json_result(writer, value),
            QueryResultsFormat::Csv => write_boolean_csv_result(writer, value),
            QueryResultsFormat::Tsv => write_boolean_tsv_result(writer, value),
        }
    }

    /// Starts the serialization of a solution sequence.
    pub fn serialize_solutions_to_writer<W: Write>(
        self,
        writer: W,
        variables: &[Variable],
    ) -> io::Result<SolutionsSerializer<W>> {
        Ok(match self.format {
            QueryResultsFormat::Xml => {
                SolutionsSerializer::Xml(XmlSolutionsWriter::start(writer)?)
            }
            QueryResultsFormat::Json => {
                SolutionsSerializer::Json(JsonSolutionsWriter::start(writer, variables)?)
            }
            QueryResultsFormat::Csv => {
                SolutionsSerializer::Csv(CsvSolutionsWriter::start(writer, variables)?)
            }
            QueryResultsFormat::Tsv => {
                SolutionsSerializer::Tsv(TsvSolutionsWriter::start(writer, variables)?)
            }
        })
    }
}

/// An in-progress solution-sequence serialization.
pub enum SolutionsSerializer<W: Write> {
    #[doc(hidden)]
    Xml(XmlSolutionsWriter<W>),
    #[doc(hidden)]
    Json(JsonSolutionsWriter<W>),
    #[doc(hidden)]
    Csv(CsvSolutionsWriter<W>),
    #[doc(hidden)]
    Tsv(TsvSolutionsWriter<W>),
}

impl<W: Write> SolutionsSerializer<W> {
    /// Serializes one solution.
    pub fn serialize(&mut self, solution: &QuerySolution) -> io::Result<()> {
        match self {
            Self::Xml(writer) => writer.write(solution),
            Self::Json(writer) => writer.write(solution),
            Self::Csv(writer) => writer.write(solution),
            Self::Tsv(writer) => writer.write(solution),
        }
    }

    /// Ends the document and returns the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::Xml(writer) => writer.finish(),
            Self::Json(writer) => writer.finish(),
            Self::Csv(writer) => writer.finish(),
            Self::Tsv(writer) => writer.finish(),
        }
    }
}
