//! The SPARQL expression evaluator.
//!
//! Evaluation never raises: a type error is the absence of a value
//! (`None`), propagated per the SPARQL three-valued logic. `BOUND` is the
//! only operator defined on an unbound variable.

use crate::context::EvalContext;
use crate::row::Row;
use crate::rowsource::build_rowsource;
use md5::{Digest, Md5};
use rand::random;
use regex::{Regex, RegexBuilder};
use rqalgebra::{Expression, Function, GraphPattern};
use rqrdf::vocab::xsd;
use rqrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, NumericValue, Term};
use rqxsd::{Boolean, Date, DateTime, Decimal, Double, Float, Integer};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Write;
use std::rc::Rc;
use std::str::FromStr;

const REGEX_SIZE_LIMIT: usize = 1_000_000;

/// The lexical scope one expression evaluates in: the evaluation context,
/// the declared variables of the rowsource running the expression, and the
/// current `GRAPH` origin if any.
pub(crate) struct EvalScope<'a> {
    pub ctx: &'a Rc<EvalContext>,
    pub variables: &'a [usize],
    pub origin: Option<&'a NamedOrBlankNode>,
}

impl EvalScope<'_> {
    pub fn evaluate(&self, expression: &Expression, row: &Row) -> Option<Term> {
        match expression {
            Expression::NamedNode(node) => Some(node.clone().into()),
            Expression::Literal(literal) => Some(literal.clone().into()),
            Expression::Variable(variable) => self.variable_value(variable, row),
            Expression::Or(a, b) => {
                match (self.evaluate_boolean(a, row), self.evaluate_boolean(b, row)) {
                    (Some(true), _) | (_, Some(true)) => Some(Literal::from(true).into()),
                    (Some(false), Some(false)) => Some(Literal::from(false).into()),
                    _ => None,
                }
            }
            Expression::And(a, b) => {
                match (self.evaluate_boolean(a, row), self.evaluate_boolean(b, row)) {
                    (Some(false), _) | (_, Some(false)) => Some(Literal::from(false).into()),
                    (Some(true), Some(true)) => Some(Literal::from(true).into()),
                    _ => None,
                }
            }
            Expression::Equal(a, b) => {
                let a = self.evaluate(a, row)?;
                let b = self.evaluate(b, row)?;
                Some(Literal::from(equals(&a, &b)?).into())
            }
            Expression::SameTerm(a, b) => {
                let a = self.evaluate(a, row)?;
                let b = self.evaluate(b, row)?;
                Some(Literal::from(a == b).into())
            }
            Expression::Greater(a, b) => self.compare(a, b, row, Ordering::is_gt),
            Expression::GreaterOrEqual(a, b) => self.compare(a, b, row, Ordering::is_ge),
            Expression::Less(a, b) => self.compare(a, b, row, Ordering::is_lt),
            Expression::LessOrEqual(a, b) => self.compare(a, b, row, Ordering::is_le),
            Expression::In(a, list) => {
                let a = self.evaluate(a, row)?;
                let mut error = false;
                for item in list {
                    match self.evaluate(item, row).and_then(|b| equals(&a, &b)) {
                        Some(true) => return Some(Literal::from(true).into()),
                        Some(false) => (),
                        None => error = true,
                    }
                }
                if error {
                    None
                } else {
                    Some(Literal::from(false).into())
                }
            }
            Expression::Add(a, b) => self.arithmetic(a, b, row, |pair| match pair {
                NumericPair::Integer(a, b) => a.checked_add(b).map(Into::into),
                NumericPair::Decimal(a, b) => a.checked_add(b).map(Into::into),
                NumericPair::Float(a, b) => Some((a + b).into()),
                NumericPair::Double(a, b) => Some((a + b).into()),
            }),
            Expression::Subtract(a, b) => self.arithmetic(a, b, row, |pair| match pair {
                NumericPair::Integer(a, b) => a.checked_sub(b).map(Into::into),
                NumericPair::Decimal(a, b) => a.checked_sub(b).map(Into::into),
                NumericPair::Float(a, b) => Some((a - b).into()),
                NumericPair::Double(a, b) => Some((a - b).into()),
            }),
            Expression::Multiply(a, b) => self.arithmetic(a, b, row, |pair| match pair {
                NumericPair::Integer(a, b) => a.checked_mul(b).map(Into::into),
                NumericPair::Decimal(a, b) => a.checked_mul(b).map(Into::into),
                NumericPair::Float(a, b) => Some((a * b).into()),
                NumericPair::Double(a, b) => Some((a * b).into()),
            }),
            Expression::Divide(a, b) => self.arithmetic(a, b, row, |pair| match pair {
                // Integer division yields a decimal.
                NumericPair::Integer(a, b) => {
                    Decimal::from(a).checked_div(Decimal::from(b)).map(Into::into)
                }
                NumericPair::Decimal(a, b) => a.checked_div(b).map(Into::into),
                NumericPair::Float(a, b) => Some((a / b).into()),
                NumericPair::Double(a, b) => Some((a / b).into()),
            }),
            Expression::UnaryPlus(e) => {
                let value = self.evaluate(e, row)?;
                numeric_value(&value)?;
                Some(value)
            }
            Expression::UnaryMinus(e) => {
                let value = self.evaluate(e, row)?;
                Some(
                    Literal::from(match numeric_value(&value)? {
                        NumericValue::Integer(v) => NumericValue::Integer(v.checked_neg()?),
                        NumericValue::Decimal(v) => NumericValue::Decimal(v.checked_neg()?),
                        NumericValue::Float(v) => NumericValue::Float(-v),
                        NumericValue::Double(v) => NumericValue::Double(-v),
                    })
                    .into(),
                )
            }
            Expression::Not(e) => Some(Literal::from(!self.evaluate_boolean(e, row)?).into()),
            Expression::Exists(pattern) => {
                let saved = self.ctx.frame.borrow().clone();
                {
                    let mut frame = self.ctx.frame.borrow_mut();
                    row.bind_variables(self.variables, &mut frame);
                }
                let result = self.evaluate_exists(pattern);
                *self.ctx.frame.borrow_mut() = saved;
                Some(Literal::from(result?).into())
            }
            Expression::Bound(variable) => {
                Some(Literal::from(self.variable_value(variable, row).is_some()).into())
            }
            Expression::If(condition, then_branch, else_branch) => {
                if self.evaluate_boolean(condition, row)? {
                    self.evaluate(then_branch, row)
                } else {
                    self.evaluate(else_branch, row)
                }
            }
            Expression::Coalesce(expressions) => expressions
                .iter()
                .find_map(|expression| self.evaluate(expression, row)),
            Expression::FunctionCall(function, args) => self.call_function(function, args, row),
        }
    }

    /// The effective boolean value of an expression.
    pub fn evaluate_boolean(&self, expression: &Expression, row: &Row) -> Option<bool> {
        effective_boolean_value(&self.evaluate(expression, row)?)
    }

    fn variable_value(&self, variable: &rqrdf::Variable, row: &Row) -> Option<Term> {
        let offset = self.ctx.table.named_offset(variable)?;
        if let Some(column) = self.variables.iter().position(|&o| o == offset) {
            if let Some(value) = &row.values[column] {
                return Some(value.clone());
            }
        }
        self.ctx.frame.borrow().get(offset)?.clone()
    }

    fn compare(
        &self,
        a: &Expression,
        b: &Expression,
        row: &Row,
        test: impl Fn(Ordering) -> bool,
    ) -> Option<Term> {
        let a = self.evaluate(a, row)?;
        let b = self.evaluate(b, row)?;
        Some(Literal::from(test(partial_cmp_terms(&a, &b)?)).into())
    }

    fn arithmetic(
        &self,
        a: &Expression,
        b: &Expression,
        row: &Row,
        op: impl Fn(NumericPair) -> Option<NumericValue>,
    ) -> Option<Term> {
        let a = self.evaluate(a, row)?;
        let b = self.evaluate(b, row)?;
        Some(Literal::from(op(numeric_pair(&a, &b)?)?).into())
    }

    fn evaluate_exists(&self, pattern: &GraphPattern) -> Option<bool> {
        let mut source = build_rowsource(pattern, self.ctx).ok()?;
        source.set_origin(self.origin.cloned());
        match source.read_row() {
            Ok(row) => Some(row.is_some()),
            Err(_) => None,
        }
    }

    fn call_function(
        &self,
        function: &Function,
        args: &[Expression],
        row: &Row,
    ) -> Option<Term> {
        match function {
            Function::Str => match self.evaluate(args.first()?, row)? {
                Term::NamedNode(node) => {
                    Some(Literal::new_simple_literal(node.into_string()).into())
                }
                Term::Literal(literal) => {
                    Some(Literal::new_simple_literal(literal.value()).into())
                }
                Term::BlankNode(_) => None,
            },
            Function::Lang => match self.evaluate(args.first()?, row)? {
                Term::Literal(literal) => Some(
                    Literal::new_simple_literal(literal.language().unwrap_or_default()).into(),
                ),
                _ => None,
            },
            Function::LangMatches => {
                let tag = self.simple_string(args.first()?, row)?;
                let range = self.simple_string(args.get(1)?, row)?;
                Some(Literal::from(lang_matches(&tag, &range)).into())
            }
            Function::Datatype => match self.evaluate(args.first()?, row)? {
                Term::Literal(literal) => Some(literal.datatype().into_owned().into()),
                _ => None,
            },
            Function::Iri => match self.evaluate(args.first()?, row)? {
                Term::NamedNode(node) => Some(node.into()),
                Term::Literal(literal) if literal.is_plain() && literal.language().is_none() => {
                    self.resolve_iri(literal.value()).map(Into::into)
                }
                _ => None,
            },
            Function::BNode => match args.first() {
                None => Some(BlankNode::default().into()),
                Some(arg) => {
                    let label = self.simple_string(arg, row)?;
                    BlankNode::new(label).ok().map(Into::into)
                }
            },
            Function::Rand => Some(Literal::from(random::<f64>()).into()),
            Function::Abs => self.numeric_unary(args, row, |value| match value {
                NumericValue::Integer(v) => v.checked_abs().map(Into::into),
                NumericValue::Decimal(v) => v.checked_abs().map(Into::into),
                NumericValue::Float(v) => Some(v.abs().into()),
                NumericValue::Double(v) => Some(v.abs().into()),
            }),
            Function::Ceil => self.numeric_unary(args, row, |value| match value {
                NumericValue::Integer(v) => Some(v.into()),
                NumericValue::Decimal(v) => v.checked_ceil().map(Into::into),
                NumericValue::Float(v) => Some(v.ceil().into()),
                NumericValue::Double(v) => Some(v.ceil().into()),
            }),
            Function::Floor => self.numeric_unary(args, row, |value| match value {
                NumericValue::Integer(v) => Some(v.into()),
                NumericValue::Decimal(v) => v.checked_floor().map(Into::into),
                NumericValue::Float(v) => Some(v.floor().into()),
                NumericValue::Double(v) => Some(v.floor().into()),
            }),
            Function::Round => self.numeric_unary(args, row, |value| match value {
                NumericValue::Integer(v) => Some(v.into()),
                NumericValue::Decimal(v) => v.checked_round().map(Into::into),
                NumericValue::Float(v) => Some(v.round().into()),
                NumericValue::Double(v) => Some(v.round().into()),
            }),
            Function::Concat => {
                let mut result = String::new();
                let mut language: Option<Option<String>> = None;
                for arg in args {
                    let (value, arg_language) =
                        to_string_and_language(self.evaluate(arg, row)?)?;
                    if let Some(language) = &mut language {
                        if *language != arg_language {
                            *language = None;
                        }
                    } else {
                        language = Some(arg_language);
                    }
                    result.push_str(&value);
                }
                Some(build_plain_literal(result, language.flatten()).into())
            }
            Function::SubStr => {
                let (value, language) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
                let start = round_to_i64(numeric_value(&self.evaluate(args.get(1)?, row)?)?)?;
                let length = match args.get(2) {
                    Some(arg) => {
                        Some(round_to_i64(numeric_value(&self.evaluate(arg, row)?)?)?)
                    }
                    None => None,
                };
                // 1-based codepoint indexing per fn:substring.
                let result: String = value
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| {
                        let position = i64::try_from(*i).map_or(i64::MAX, |p| p + 1);
                        position >= start
                            && length.is_none_or(|length| position < start.saturating_add(length))
                    })
                    .map(|(_, c)| c)
                    .collect();
                Some(build_plain_literal(result, language).into())
            }
            Function::StrLen => {
                let (value, _) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
                Some(Literal::from(i64::try_from(value.chars().count()).ok()?).into())
            }
            Function::Replace => {
                let (value, language) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
                let pattern = self.simple_string(args.get(1)?, row)?;
                let replacement = self.simple_string(args.get(2)?, row)?;
                let flags = match args.get(3) {
                    Some(arg) => Some(self.simple_string(arg, row)?),
                    None => None,
                };
                let regex = compile_pattern(&pattern, flags.as_deref())?;
                let result = regex.replace_all(&value, replacement.as_str()).into_owned();
                Some(build_plain_literal(result, language).into())
            }
            Function::UCase => self.string_transform(args, row, |v| v.to_uppercase()),
            Function::LCase => self.string_transform(args, row, |v| v.to_lowercase()),
            Function::EncodeForUri => {
                let (value, _) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
                let mut result = String::with_capacity(value.len());
                for byte in value.bytes() {
                    if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
                        result.push(char::from(byte));
                    } else {
                        write!(&mut result, "%{byte:02X}").ok()?;
                    }
                }
                Some(Literal::new_simple_literal(result).into())
            }
            Function::Contains => self.string_binary(args, row, |a, b| a.contains(b)),
            Function::StrStarts => self.string_binary(args, row, |a, b| a.starts_with(b)),
            Function::StrEnds => self.string_binary(args, row, |a, b| a.ends_with(b)),
            Function::StrBefore => {
                let (value, language, pattern) = self.compatible_strings(args, row)?;
                Some(match value.find(&pattern) {
                    Some(position) => {
                        build_plain_literal(value[..position].into(), language).into()
                    }
                    None => Literal::new_simple_literal("").into(),
                })
            }
            Function::StrAfter => {
                let (value, language, pattern) = self.compatible_strings(args, row)?;
                Some(match value.find(&pattern) {
                    Some(position) => build_plain_literal(
                        value[position + pattern.len()..].into(),
                        language,
                    )
                    .into(),
                    None => Literal::new_simple_literal("").into(),
                })
            }
            Function::Year => self.date_accessor(args, row, |dt| dt.year(), |d| d.year()),
            Function::Month => self.date_accessor(args, row, |dt| dt.month(), |d| d.month()),
            Function::Day => self.date_accessor(args, row, |dt| dt.day(), |d| d.day()),
            Function::Hours => {
                Some(Literal::from(self.date_time_argument(args, row)?.hour()).into())
            }
            Function::Minutes => {
                Some(Literal::from(self.date_time_argument(args, row)?.minute()).into())
            }
            Function::Seconds => {
                Some(Literal::from(self.date_time_argument(args, row)?.second()).into())
            }
            Function::Timezone => {
                let literal = self.literal_argument(args.first()?, row)?;
                let timezone = match literal.date_time_value() {
                    Some(value) => value.timezone(),
                    None => literal.date_value()?.timezone(),
                }?;
                Some(Literal::from(timezone).into())
            }
            Function::Tz => {
                let literal = self.literal_argument(args.first()?, row)?;
                let offset = match literal.date_time_value() {
                    Some(value) => value.timezone_offset(),
                    None => literal.date_value()?.timezone_offset(),
                };
                Some(
                    Literal::new_simple_literal(
                        offset.map(|o| o.to_string()).unwrap_or_default(),
                    )
                    .into(),
                )
            }
            Function::Now => Some(Literal::from(self.ctx.now).into()),
            Function::Uuid => {
                Some(NamedNode::new_unchecked(format!("urn:uuid:{}", generate_uuid())).into())
            }
            Function::StrUuid => Some(Literal::new_simple_literal(generate_uuid()).into()),
            Function::Md5 => self.hash::<Md5>(args, row),
            Function::Sha1 => self.hash::<Sha1>(args, row),
            Function::Sha256 => self.hash::<Sha256>(args, row),
            Function::Sha384 => self.hash::<Sha384>(args, row),
            Function::Sha512 => self.hash::<Sha512>(args, row),
            Function::StrLang => {
                let value = self.simple_string(args.first()?, row)?;
                let language = self.simple_string(args.get(1)?, row)?;
                Literal::new_language_tagged_literal(value, language)
                    .ok()
                    .map(Into::into)
            }
            Function::StrDt => {
                let value = self.simple_string(args.first()?, row)?;
                match self.evaluate(args.get(1)?, row)? {
                    Term::NamedNode(datatype) => {
                        Some(Literal::new_typed_literal(value, datatype).into())
                    }
                    _ => None,
                }
            }
            Function::IsIri => {
                Some(Literal::from(self.evaluate(args.first()?, row)?.is_named_node()).into())
            }
            Function::IsBlank => {
                Some(Literal::from(self.evaluate(args.first()?, row)?.is_blank_node()).into())
            }
            Function::IsLiteral => {
                Some(Literal::from(self.evaluate(args.first()?, row)?.is_literal()).into())
            }
            Function::IsNumeric => Some(
                Literal::from(numeric_value(&self.evaluate(args.first()?, row)?).is_some())
                    .into(),
            ),
            Function::Regex => {
                let (text, _) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
                let pattern = self.simple_string(args.get(1)?, row)?;
                let flags = match args.get(2) {
                    Some(arg) => Some(self.simple_string(arg, row)?),
                    None => None,
                };
                let regex = compile_pattern(&pattern, flags.as_deref())?;
                Some(Literal::from(regex.is_match(&text)).into())
            }
            Function::Custom(name) => {
                if let Some(result) = self.evaluate_cast(name.as_ref(), args, row) {
                    return result;
                }
                let evaluator = Rc::clone(self.ctx.custom_functions.get(name)?);
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg, row)?);
                }
                evaluator(&values)
            }
        }
    }

    /// XSD constructor functions; returns `None` when the IRI is not an XSD
    /// datatype this engine casts to.
    #[allow(clippy::option_option)]
    fn evaluate_cast(
        &self,
        datatype: NamedNodeRef<'_>,
        args: &[Expression],
        row: &Row,
    ) -> Option<Option<Term>> {
        if !datatype.as_str().starts_with("http://www.w3.org/2001/XMLSchema#") {
            return None;
        }
        let value = match self.evaluate(args.first()?, row) {
            Some(value) => value,
            None => return Some(None),
        };
        let literal = match &value {
            Term::Literal(literal) => literal,
            Term::NamedNode(node) if datatype == xsd::STRING => {
                return Some(Some(
                    Literal::new_typed_literal(node.as_str(), xsd::STRING).into(),
                ));
            }
            _ => return Some(None),
        };
        Some(cast_literal(literal, datatype).map(Into::into))
    }

    fn resolve_iri(&self, value: &str) -> Option<NamedNode> {
        match &self.ctx.base_iri {
            Some(base) => base
                .resolve(value)
                .ok()
                .map(|iri| NamedNode::new_unchecked(iri.into_inner())),
            None => NamedNode::new(value).ok(),
        }
    }

    fn literal_argument(&self, arg: &Expression, row: &Row) -> Option<Literal> {
        match self.evaluate(arg, row)? {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    fn date_time_argument(&self, args: &[Expression], row: &Row) -> Option<DateTime> {
        self.literal_argument(args.first()?, row)?.date_time_value()
    }

    fn date_accessor(
        &self,
        args: &[Expression],
        row: &Row,
        from_date_time: impl Fn(&DateTime) -> Integer,
        from_date: impl Fn(&Date) -> Integer,
    ) -> Option<Term> {
        let literal = self.literal_argument(args.first()?, row)?;
        let value = match literal.date_time_value() {
            Some(value) => from_date_time(&value),
            None => from_date(&literal.date_value()?),
        };
        Some(Literal::from(value).into())
    }

    fn numeric_unary(
        &self,
        args: &[Expression],
        row: &Row,
        op: impl Fn(NumericValue) -> Option<NumericValue>,
    ) -> Option<Term> {
        let value = numeric_value(&self.evaluate(args.first()?, row)?)?;
        Some(Literal::from(op(value)?).into())
    }

    fn string_transform(
        &self,
        args: &[Expression],
        row: &Row,
        op: impl Fn(&str) -> String,
    ) -> Option<Term> {
        let (value, language) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
        Some(build_plain_literal(op(&value), language).into())
    }

    fn string_binary(
        &self,
        args: &[Expression],
        row: &Row,
        op: impl Fn(&str, &str) -> bool,
    ) -> Option<Term> {
        let (a, _, b) = self.compatible_strings(args, row)?;
        Some(Literal::from(op(&a, &b)).into())
    }

    /// The [argument compatibility](https://www.w3.org/TR/sparql11-query/#func-arg-compatibility)
    /// rules of the two-string functions. Language tags must agree exactly;
    /// tags differing in anything, including case, are incompatible.
    fn compatible_strings(
        &self,
        args: &[Expression],
        row: &Row,
    ) -> Option<(String, Option<String>, String)> {
        let (value1, language1) = to_string_and_language(self.evaluate(args.first()?, row)?)?;
        let (value2, language2) = to_string_and_language(self.evaluate(args.get(1)?, row)?)?;
        (language2.is_none() || language1 == language2).then_some((value1, language1, value2))
    }

    fn simple_string(&self, arg: &Expression, row: &Row) -> Option<String> {
        match self.evaluate(arg, row)? {
            Term::Literal(literal)
                if literal.is_plain() && literal.language().is_none() =>
            {
                Some(literal.value().to_owned())
            }
            _ => None,
        }
    }

    fn hash<H: Digest>(&self, args: &[Expression], row: &Row) -> Option<Term> {
        let value = self.simple_string(args.first()?, row)?;
        let hash = hex::encode(H::digest(value.as_bytes()));
        Some(Literal::new_simple_literal(hash).into())
    }
}

// --- value helpers ---

/// The [effective boolean value](https://www.w3.org/TR/sparql11-query/#ebv)
/// of a term. Ill-formed boolean and numeric lexical forms have EBV `false`.
pub(crate) fn effective_boolean_value(term: &Term) -> Option<bool> {
    let literal = term.as_literal()?;
    let datatype = literal.datatype();
    if datatype == xsd::BOOLEAN {
        Some(literal.boolean_value().is_some_and(Boolean::is_true))
    } else if literal.is_plain() && literal.language().is_none() {
        Some(!literal.value().is_empty())
    } else if literal.is_numeric() {
        Some(match literal.numeric_value() {
            Some(NumericValue::Integer(v)) => v != Integer::from(0),
            Some(NumericValue::Decimal(v)) => v != Decimal::from(0),
            Some(NumericValue::Float(v)) => v != Float::from(0.) && !v.is_nan(),
            Some(NumericValue::Double(v)) => v != Double::from(0.) && !v.is_nan(),
            None => false,
        })
    } else {
        None
    }
}

pub(crate) fn numeric_value(term: &Term) -> Option<NumericValue> {
    term.as_literal()?.numeric_value()
}

/// Two numeric values promoted to their common type:
/// integer → decimal → float → double.
pub(crate) enum NumericPair {
    Integer(Integer, Integer),
    Decimal(Decimal, Decimal),
    Float(Float, Float),
    Double(Double, Double),
}

pub(crate) fn numeric_pair(a: &Term, b: &Term) -> Option<NumericPair> {
    use NumericValue as V;
    Some(match (numeric_value(a)?, numeric_value(b)?) {
        (V::Integer(a), V::Integer(b)) => NumericPair::Integer(a, b),
        (V::Integer(a), V::Decimal(b)) => NumericPair::Decimal(a.into(), b),
        (V::Decimal(a), V::Integer(b)) => NumericPair::Decimal(a, b.into()),
        (V::Decimal(a), V::Decimal(b)) => NumericPair::Decimal(a, b),
        (V::Integer(a), V::Float(b)) => NumericPair::Float(a.into(), b),
        (V::Decimal(a), V::Float(b)) => NumericPair::Float(a.into(), b),
        (V::Float(a), V::Integer(b)) => NumericPair::Float(a, b.into()),
        (V::Float(a), V::Decimal(b)) => NumericPair::Float(a, b.into()),
        (V::Float(a), V::Float(b)) => NumericPair::Float(a, b),
        (V::Double(a), b) => NumericPair::Double(a, to_double(b)),
        (a, V::Double(b)) => NumericPair::Double(to_double(a), b),
    })
}

fn to_double(value: NumericValue) -> Double {
    match value {
        NumericValue::Integer(v) => v.into(),
        NumericValue::Decimal(v) => v.into(),
        NumericValue::Float(v) => v.into(),
        NumericValue::Double(v) => v,
    }
}

/// [RDFterm-equal](https://www.w3.org/TR/sparql11-query/#func-RDFterm-equal):
/// value equality for literals of known datatypes, `None` (type error) for
/// unknown-datatype literals that are not identical terms.
pub(crate) fn equals(a: &Term, b: &Term) -> Option<bool> {
    match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => literal_equals(a, b),
        _ => Some(a == b),
    }
}

fn literal_equals(a: &Literal, b: &Literal) -> Option<bool> {
    if a == b {
        return Some(true);
    }
    if let (Some(a), Some(b)) = (a.numeric_value(), b.numeric_value()) {
        let (a, b) = (Literal::from(a).into(), Literal::from(b).into());
        return Some(numeric_equals(&a, &b));
    }
    if a.is_plain() || b.is_plain() {
        // Plain literals only equal other plain literals, handled above.
        return Some(false);
    }
    if let (Some(a), Some(b)) = (a.boolean_value(), b.boolean_value()) {
        return Some(a == b);
    }
    if let (Some(a), Some(b)) = (a.date_time_value(), b.date_time_value()) {
        return Some(a == b);
    }
    if let (Some(a), Some(b)) = (a.date_value(), b.date_value()) {
        return Some(a == b);
    }
    // Both datatypes are outside the value spaces this engine knows:
    // distinct lexical forms cannot be compared.
    None
}

fn numeric_equals(a: &Term, b: &Term) -> bool {
    match numeric_pair(a, b) {
        Some(NumericPair::Integer(a, b)) => a == b,
        Some(NumericPair::Decimal(a, b)) => a == b,
        Some(NumericPair::Float(a, b)) => a == b,
        Some(NumericPair::Double(a, b)) => a == b,
        None => false,
    }
}

/// The partial order behind `<`, `<=`, `>` and `>=`. `None` for
/// incomparable operands, including any `NaN` participant.
pub(crate) fn partial_cmp_terms(a: &Term, b: &Term) -> Option<Ordering> {
    let (a, b) = match (a, b) {
        (Term::Literal(a), Term::Literal(b)) => (a, b),
        _ => return None,
    };
    if let (Some(a), Some(b)) = (a.numeric_value(), b.numeric_value()) {
        return match numeric_pair(&Literal::from(a).into(), &Literal::from(b).into())? {
            NumericPair::Integer(a, b) => a.partial_cmp(&b),
            NumericPair::Decimal(a, b) => a.partial_cmp(&b),
            NumericPair::Float(a, b) => a.partial_cmp(&b),
            NumericPair::Double(a, b) => a.partial_cmp(&b),
        };
    }
    match (a.language(), b.language()) {
        (None, None) => (),
        (Some(la), Some(lb)) if la == lb => {
            return if a.is_plain() && b.is_plain() {
                a.value().partial_cmp(b.value())
            } else {
                None
            };
        }
        _ => return None,
    }
    if a.is_plain() && b.is_plain() {
        // Codepoint order on simple literals and xsd:strings.
        return a.value().partial_cmp(b.value());
    }
    if let (Some(a), Some(b)) = (a.boolean_value(), b.boolean_value()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.date_time_value(), b.date_time_value()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.date_value(), b.date_value()) {
        return a.partial_cmp(&b);
    }
    None
}

// --- string helpers ---

/// Extracts the string value and language of string-valued literals: simple
/// literals, `xsd:string` and language-tagged strings.
pub(crate) fn to_string_and_language(term: Term) -> Option<(String, Option<String>)> {
    match term {
        Term::Literal(literal) if literal.is_plain() => {
            let (value, _, language) = literal.destruct();
            Some((value, language))
        }
        _ => None,
    }
}

pub(crate) fn build_plain_literal(value: String, language: Option<String>) -> Literal {
    match language {
        Some(language) => Literal::new_language_tagged_literal_unchecked(value, language),
        None => Literal::new_simple_literal(value),
    }
}

fn lang_matches(tag: &str, range: &str) -> bool {
    if range == "*" {
        return !tag.is_empty();
    }
    let tag = tag.to_ascii_lowercase();
    let range = range.to_ascii_lowercase();
    tag == range
        || (tag.starts_with(&range) && tag.as_bytes().get(range.len()) == Some(&b'-'))
}

/// Maps the SPARQL regex flags onto the `regex` crate. An invalid flag or an
/// unparseable pattern yields `None`, surfacing as a type error.
pub(crate) fn compile_pattern(pattern: &str, flags: Option<&str>) -> Option<Regex> {
    let mut pattern = Cow::Borrowed(pattern);
    let flags = flags.unwrap_or_default();
    if flags.contains('q') {
        pattern = regex::escape(&pattern).into();
    }
    let mut builder = RegexBuilder::new(&pattern);
    builder.size_limit(REGEX_SIZE_LIMIT);
    for flag in flags.chars() {
        match flag {
            's' => {
                builder.dot_matches_new_line(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            'i' => {
                builder.case_insensitive(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'q' => (),
            _ => return None,
        }
    }
    builder.build().ok()
}

fn round_to_i64(value: NumericValue) -> Option<i64> {
    Some(match value {
        NumericValue::Integer(v) => v.into(),
        NumericValue::Decimal(v) => v.checked_round()?.to_integer()?.into(),
        NumericValue::Float(v) => Integer::try_from(v.round()).ok()?.into(),
        NumericValue::Double(v) => Integer::try_from(v.round()).ok()?.into(),
    })
}

fn generate_uuid() -> String {
    let mut bytes = random::<u128>().to_be_bytes();
    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    let mut buffer = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            buffer.push('-');
        }
        let _ = write!(&mut buffer, "{byte:02x}");
    }
    buffer
}

fn cast_literal(literal: &Literal, datatype: NamedNodeRef<'_>) -> Option<Literal> {
    let value = literal.value();
    if datatype == xsd::STRING {
        return Some(Literal::new_typed_literal(value, xsd::STRING));
    }
    if datatype == xsd::BOOLEAN {
        return Some(
            match literal.numeric_value() {
                Some(NumericValue::Integer(v)) => Boolean::from(v),
                Some(NumericValue::Decimal(v)) => Boolean::from(v),
                Some(NumericValue::Float(v)) => Boolean::from(v),
                Some(NumericValue::Double(v)) => Boolean::from(v),
                None if literal.datatype() == xsd::BOOLEAN || string_valued(literal) => {
                    Boolean::from_str(value).ok()?
                }
                None => return None,
            }
            .into(),
        );
    }
    if datatype == xsd::INTEGER {
        return Some(
            match literal.numeric_value() {
                Some(NumericValue::Integer(v)) => v,
                Some(NumericValue::Decimal(v)) => v.to_integer()?,
                Some(NumericValue::Float(v)) => Integer::try_from(v).ok()?,
                Some(NumericValue::Double(v)) => Integer::try_from(v).ok()?,
                None if boolean_valued(literal) => literal.boolean_value()?.into(),
                None if string_valued(literal) => Integer::from_str(value).ok()?,
                None => return None,
            }
            .into(),
        );
    }
    if datatype == xsd::DECIMAL {
        return Some(
            match literal.numeric_value() {
                Some(NumericValue::Integer(v)) => v.into(),
                Some(NumericValue::Decimal(v)) => v,
                Some(NumericValue::Float(v)) => Decimal::try_from(v).ok()?,
                Some(NumericValue::Double(v)) => Decimal::try_from(v).ok()?,
                None if boolean_valued(literal) => {
                    Integer::from(literal.boolean_value()?).into()
                }
                None if string_valued(literal) => Decimal::from_str(value).ok()?,
                None => return None,
            }
            .into(),
        );
    }
    if datatype == xsd::FLOAT {
        return Some(
            match literal.numeric_value() {
                Some(NumericValue::Integer(v)) => v.into(),
                Some(NumericValue::Decimal(v)) => v.into(),
                Some(NumericValue::Float(v)) => v,
                Some(NumericValue::Double(v)) => Float::from(f64::from(v) as f32),
                None if boolean_valued(literal) => literal.boolean_value()?.into(),
                None if string_valued(literal) => Float::from_str(value).ok()?,
                None => return None,
            }
            .into(),
        );
    }
    if datatype == xsd::DOUBLE {
        return Some(
            match literal.numeric_value() {
                Some(NumericValue::Integer(v)) => v.into(),
                Some(NumericValue::Decimal(v)) => v.into(),
                Some(NumericValue::Float(v)) => v.into(),
                Some(NumericValue::Double(v)) => v,
                None if boolean_valued(literal) => literal.boolean_value()?.into(),
                None if string_valued(literal) => Double::from_str(value).ok()?,
                None => return None,
            }
            .into(),
        );
    }
    if datatype == xsd::DATE_TIME {
        return Some(match literal.date_time_value() {
            Some(v) => v.into(),
            None if string_valued(literal) => DateTime::from_str(value).ok()?.into(),
            None => return None,
        });
    }
    if datatype == xsd::DATE {
        return Some(match literal.date_value() {
            Some(v) => v.into(),
            None if string_valued(literal) => Date::from_str(value).ok()?.into(),
            None => return None,
        });
    }
    None
}

fn string_valued(literal: &Literal) -> bool {
    literal.is_plain() && literal.language().is_none()
}

fn boolean_valued(literal: &Literal) -> bool {
    literal.datatype() == xsd::BOOLEAN
}
