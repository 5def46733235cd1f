use crate::named_node::{NamedNode, NamedNodeRef};
use crate::vocab::{rdf, xsd};
use oxilangtag::{LanguageTag, LanguageTagParseError};
use rqxsd::{Boolean, Date, DateTime, DayTimeDuration, Decimal, Double, Float, Integer};
use std::fmt;
use std::fmt::Write;
use std::str::FromStr;

/// An owned RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal).
///
/// The default string formatter is returning an N-Triples, Turtle, and SPARQL compatible representation:
/// ```
/// use rqrdf::vocab::xsd;
/// use rqrdf::Literal;
///
/// assert_eq!(
///     "\"foo\\nbar\"",
///     Literal::new_simple_literal("foo\nbar").to_string()
/// );
///
/// assert_eq!(
///     "\"1999-01-01\"^^<http://www.w3.org/2001/XMLSchema#date>",
///     Literal::new_typed_literal("1999-01-01", xsd::DATE).to_string()
/// );
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Literal(LiteralContent);

#[derive(PartialEq, Eq, Debug, Clone, Hash)]
enum LiteralContent {
    String(String),
    LanguageTaggedString { value: String, language: String },
    TypedLiteral { value: String, datatype: NamedNode },
}

impl Literal {
    /// Builds an RDF [simple literal](https://www.w3.org/TR/rdf11-concepts/#dfn-simple-literal).
    #[inline]
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(LiteralContent::String(value.into()))
    }

    /// Builds an RDF [literal](https://www.w3.org/TR/rdf11-concepts/#dfn-literal) with a [datatype](https://www.w3.org/TR/rdf11-concepts/#dfn-datatype-iri).
    #[inline]
    pub fn new_typed_literal(value: impl Into<String>, datatype: impl Into<NamedNode>) -> Self {
        let value = value.into();
        let datatype = datatype.into();
        Self(if datatype == xsd::STRING {
            LiteralContent::String(value)
        } else {
            LiteralContent::TypedLiteral { value, datatype }
        })
    }

    /// Builds an RDF [language-tagged string](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tagged-string).
    ///
    /// The language tag is checked against [BCP47](https://tools.ietf.org/html/bcp47)
    /// and normalized to lowercase.
    #[inline]
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, LanguageTagParseError> {
        let mut language = language.into();
        language.make_ascii_lowercase();
        Ok(Self::new_language_tagged_literal_unchecked(
            value,
            LanguageTag::parse(language)?.into_inner(),
        ))
    }

    /// Builds an RDF [language-tagged string](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tagged-string).
    ///
    /// It is the caller's responsibility to check that `language` is a valid
    /// lowercase [BCP47](https://tools.ietf.org/html/bcp47) language tag.
    #[inline]
    pub fn new_language_tagged_literal_unchecked(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self(LiteralContent::LanguageTaggedString {
            value: value.into(),
            language: language.into(),
        })
    }

    /// The literal [lexical form](https://www.w3.org/TR/rdf11-concepts/#dfn-lexical-form).
    #[inline]
    pub fn value(&self) -> &str {
        match &self.0 {
            LiteralContent::String(value)
            | LiteralContent::LanguageTaggedString { value, .. }
            | LiteralContent::TypedLiteral { value, .. } => value,
        }
    }

    /// The literal [language tag](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tag)
    /// if it is a language-tagged string.
    #[inline]
    pub fn language(&self) -> Option<&str> {
        match &self.0 {
            LiteralContent::LanguageTaggedString { language, .. } => Some(language),
            _ => None,
        }
    }

    /// The literal [datatype](https://www.w3.org/TR/rdf11-concepts/#dfn-datatype-iri).
    ///
    /// The datatype of language-tagged strings is always [rdf:langString](https://www.w3.org/TR/rdf11-concepts/#dfn-language-tagged-string),
    /// the datatype of simple literals is [xsd:string](https://www.w3.org/TR/xmlschema11-2/#string).
    #[inline]
    pub fn datatype(&self) -> NamedNodeRef<'_> {
        match &self.0 {
            LiteralContent::String(_) => xsd::STRING,
            LiteralContent::LanguageTaggedString { .. } => rdf::LANG_STRING,
            LiteralContent::TypedLiteral { datatype, .. } => datatype.as_ref(),
        }
    }

    /// Checks if this literal could be seen as an RDF 1.0 [plain literal](https://www.w3.org/TR/2004/REC-rdf-concepts-20040210/#dfn-plain-literal):
    /// a simple literal or a language-tagged string.
    #[inline]
    pub fn is_plain(&self) -> bool {
        matches!(
            self.0,
            LiteralContent::String(_) | LiteralContent::LanguageTaggedString { .. }
        )
    }

    /// Extracts components from this literal (value, datatype and language tag).
    #[inline]
    pub fn destruct(self) -> (String, Option<NamedNode>, Option<String>) {
        match self.0 {
            LiteralContent::String(s) => (s, None, None),
            LiteralContent::LanguageTaggedString { value, language } => {
                (value, None, Some(language))
            }
            LiteralContent::TypedLiteral { value, datatype } => (value, Some(datatype), None),
        }
    }

    /// The literal value seen through the XSD numeric tower, if the datatype
    /// is numeric and the lexical form valid for it.
    ///
    /// All bounded integer datatypes share the `xsd:integer` value space.
    pub fn numeric_value(&self) -> Option<NumericValue> {
        let LiteralContent::TypedLiteral { value, datatype } = &self.0 else {
            return None;
        };
        let datatype = datatype.as_ref();
        if datatype == xsd::DECIMAL {
            Some(NumericValue::Decimal(Decimal::from_str(value).ok()?))
        } else if datatype == xsd::FLOAT {
            Some(NumericValue::Float(Float::from_str(value).ok()?))
        } else if datatype == xsd::DOUBLE {
            Some(NumericValue::Double(Double::from_str(value).ok()?))
        } else if is_integer_datatype(datatype) {
            Some(NumericValue::Integer(Integer::from_str(value).ok()?))
        } else {
            None
        }
    }

    /// The literal value as an [`xsd:boolean`](https://www.w3.org/TR/xmlschema11-2/#boolean).
    #[inline]
    pub fn boolean_value(&self) -> Option<Boolean> {
        if self.datatype() == xsd::BOOLEAN {
            Boolean::from_str(self.value()).ok()
        } else {
            None
        }
    }

    /// The literal value as an [`xsd:dateTime`](https://www.w3.org/TR/xmlschema11-2/#dateTime).
    #[inline]
    pub fn date_time_value(&self) -> Option<DateTime> {
        if self.datatype() == xsd::DATE_TIME {
            DateTime::from_str(self.value()).ok()
        } else {
            None
        }
    }

    /// The literal value as an [`xsd:date`](https://www.w3.org/TR/xmlschema11-2/#date).
    #[inline]
    pub fn date_value(&self) -> Option<Date> {
        if self.datatype() == xsd::DATE {
            Date::from_str(self.value()).ok()
        } else {
            None
        }
    }

    /// Checks if the datatype belongs to the numeric tower.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        let datatype = self.datatype();
        datatype == xsd::DECIMAL
            || datatype == xsd::FLOAT
            || datatype == xsd::DOUBLE
            || is_integer_datatype(datatype)
    }
}

/// A literal value promoted into the
/// [XSD numeric tower](https://www.w3.org/TR/sparql11-query/#operandDataTypes):
/// integer → decimal → float → double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
}

impl From<Integer> for NumericValue {
    #[inline]
    fn from(value: Integer) -> Self {
        Self::Integer(value)
    }
}

impl From<Decimal> for NumericValue {
    #[inline]
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<Float> for NumericValue {
    #[inline]
    fn from(value: Float) -> Self {
        Self::Float(value)
    }
}

impl From<Double> for NumericValue {
    #[inline]
    fn from(value: Double) -> Self {
        Self::Double(value)
    }
}

fn is_integer_datatype(datatype: NamedNodeRef<'_>) -> bool {
    datatype == xsd::INTEGER
        || datatype == xsd::BYTE
        || datatype == xsd::SHORT
        || datatype == xsd::INT
        || datatype == xsd::LONG
        || datatype == xsd::UNSIGNED_BYTE
        || datatype == xsd::UNSIGNED_SHORT
        || datatype == xsd::UNSIGNED_INT
        || datatype == xsd::UNSIGNED_LONG
        || datatype == xsd::POSITIVE_INTEGER
        || datatype == xsd::NEGATIVE_INTEGER
        || datatype == xsd::NON_POSITIVE_INTEGER
        || datatype == xsd::NON_NEGATIVE_INTEGER
}

impl fmt::Display for Literal {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            LiteralContent::String(value) => print_quoted_str(value, f),
            LiteralContent::LanguageTaggedString { value, language } => {
                print_quoted_str(value, f)?;
                write!(f, "@{language}")
            }
            LiteralContent::TypedLiteral { value, datatype } => {
                print_quoted_str(value, f)?;
                write!(f, "^^{datatype}")
            }
        }
    }
}

impl<'a> From<&'a str> for Literal {
    #[inline]
    fn from(value: &'a str) -> Self {
        Self(LiteralContent::String(value.into()))
    }
}

impl From<String> for Literal {
    #[inline]
    fn from(value: String) -> Self {
        Self(LiteralContent::String(value))
    }
}

impl From<bool> for Literal {
    #[inline]
    fn from(value: bool) -> Self {
        Self(LiteralContent::TypedLiteral {
            value: value.to_string(),
            datatype: xsd::BOOLEAN.into(),
        })
    }
}

impl From<i32> for Literal {
    #[inline]
    fn from(value: i32) -> Self {
        Integer::from(value).into()
    }
}

impl From<i64> for Literal {
    #[inline]
    fn from(value: i64) -> Self {
        Integer::from(value).into()
    }
}

impl From<f32> for Literal {
    #[inline]
    fn from(value: f32) -> Self {
        Float::from(value).into()
    }
}

impl From<f64> for Literal {
    #[inline]
    fn from(value: f64) -> Self {
        Double::from(value).into()
    }
}

impl From<Boolean> for Literal {
    #[inline]
    fn from(value: Boolean) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::BOOLEAN)
    }
}

impl From<Integer> for Literal {
    #[inline]
    fn from(value: Integer) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::INTEGER)
    }
}

impl From<Decimal> for Literal {
    #[inline]
    fn from(value: Decimal) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::DECIMAL)
    }
}

impl From<Float> for Literal {
    #[inline]
    fn from(value: Float) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::FLOAT)
    }
}

impl From<Double> for Literal {
    #[inline]
    fn from(value: Double) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::DOUBLE)
    }
}

impl From<DateTime> for Literal {
    #[inline]
    fn from(value: DateTime) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::DATE_TIME)
    }
}

impl From<Date> for Literal {
    #[inline]
    fn from(value: Date) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::DATE)
    }
}

impl From<DayTimeDuration> for Literal {
    #[inline]
    fn from(value: DayTimeDuration) -> Self {
        Self::new_typed_literal(value.to_string(), xsd::DAY_TIME_DURATION)
    }
}

impl From<NumericValue> for Literal {
    #[inline]
    fn from(value: NumericValue) -> Self {
        match value {
            NumericValue::Integer(v) => v.into(),
            NumericValue::Decimal(v) => v.into(),
            NumericValue::Float(v) => v.into(),
            NumericValue::Double(v) => v.into(),
        }
    }
}

#[inline]
pub(crate) fn print_quoted_str(string: &str, f: &mut impl Write) -> fmt::Result {
    f.write_char('"')?;
    for c in string.chars() {
        match c {
            '\u{08}' => f.write_str("\\b"),
            '\t' => f.write_str("\\t"),
            '\n' => f.write_str("\\n"),
            '\u{0c}' => f.write_str("\\f"),
            '\r' => f.write_str("\\r"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            '\0'..='\u{1f}' | '\u{7f}' => write!(f, "\\u{:04X}", u32::from(c)),
            c => f.write_char(c),
        }?;
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_literal_equality() {
        assert_eq!(
            Literal::new_simple_literal("foo"),
            Literal::new_typed_literal("foo", xsd::STRING)
        );
    }

    #[test]
    fn float_format() {
        assert_eq!("INF", Literal::from(f32::INFINITY).value());
        assert_eq!("-INF", Literal::from(f64::NEG_INFINITY).value());
        assert_eq!("NaN", Literal::from(f64::NAN).value());
    }

    #[test]
    fn numeric_value_classification() {
        assert_eq!(
            Literal::new_typed_literal("042", xsd::BYTE).numeric_value(),
            Some(NumericValue::Integer(Integer::from(42)))
        );
        assert_eq!(
            Literal::new_typed_literal("1.5", xsd::DECIMAL).numeric_value(),
            Some(NumericValue::Decimal(Decimal::new(15, 1).unwrap()))
        );
        assert_eq!(
            Literal::new_typed_literal("nope", xsd::INTEGER).numeric_value(),
            None
        );
        assert_eq!(Literal::new_simple_literal("1").numeric_value(), None);
    }

    #[test]
    fn language_tag_is_lowercased() {
        let literal = Literal::new_language_tagged_literal("foo", "EN-GB").unwrap();
        assert_eq!(literal.language(), Some("en-gb"));
    }
}
