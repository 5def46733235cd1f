//! `GROUP BY` and aggregate evaluation.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::expression::{numeric_pair, numeric_value, partial_cmp_terms, EvalScope, NumericPair};
use crate::row::Row;
use crate::rowsource::RowSource;
use rqalgebra::{AggregateExpression, AggregateFunction, Expression};
use rqrdf::{Literal, NamedOrBlankNode, NumericValue, Term};
use rqxsd::{Decimal, Integer};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::rc::Rc;

/// Pulls the whole inner stream, groups rows by their `GROUP BY` key tuple
/// in first-seen order, folds each aggregate incrementally, and emits one
/// row per group: the key columns then one column per aggregate.
///
/// Without `GROUP BY` keys there is exactly one group, even over an empty
/// stream, so `COUNT(*)` yields 0 there.
pub(crate) struct Aggregation {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    key_columns: Vec<Option<usize>>,
    aggregates: Vec<(bool, Option<Expression>, AggregateFunction)>,
    variables: Vec<usize>,
    output: Option<VecDeque<Row>>,
    origin: Option<NamedOrBlankNode>,
}

impl Aggregation {
    pub fn new(
        inner: Box<dyn RowSource>,
        keys: &[rqrdf::Variable],
        aggregates: &[(rqrdf::Variable, AggregateExpression)],
        ctx: &Rc<EvalContext>,
    ) -> Result<Self, EvaluationError> {
        let mut variables = Vec::with_capacity(keys.len() + aggregates.len());
        let mut key_columns = Vec::with_capacity(keys.len());
        for key in keys {
            let offset = super::named_offset(ctx, key)?;
            key_columns.push(inner.variables().iter().position(|&o| o == offset));
            variables.push(offset);
        }
        let mut compiled = Vec::with_capacity(aggregates.len());
        for (variable, aggregate) in aggregates {
            variables.push(super::named_offset(ctx, variable)?);
            compiled.push(match aggregate {
                AggregateExpression::CountSolutions { distinct } => {
                    (*distinct, None, AggregateFunction::Count)
                }
                AggregateExpression::FunctionCall {
                    name,
                    expr,
                    distinct,
                } => (*distinct, Some(expr.clone()), name.clone()),
            });
        }
        Ok(Self {
            ctx: Rc::clone(ctx),
            inner,
            key_columns,
            aggregates: compiled,
            variables,
            output: None,
            origin: None,
        })
    }

    fn fill_output(&mut self) -> Result<(), EvaluationError> {
        let inner_variables = self.inner.variables().to_vec();
        let mut group_index: FxHashMap<Vec<Option<Term>>, usize> = FxHashMap::default();
        let mut groups: Vec<(Vec<Option<Term>>, Vec<Accumulator>)> = Vec::new();
        let scope = EvalScope {
            ctx: &self.ctx,
            variables: &inner_variables,
            origin: self.origin.as_ref(),
        };
        while let Some(row) = self.inner.read_row()? {
            self.ctx.limits.check()?;
            let key: Vec<Option<Term>> = self
                .key_columns
                .iter()
                .map(|column| column.and_then(|column| row.values[column].clone()))
                .collect();
            let index = match group_index.get(&key) {
                Some(&index) => index,
                None => {
                    group_index.insert(key.clone(), groups.len());
                    groups.push((key, self.aggregates.iter().map(new_accumulator).collect()));
                    groups.len() - 1
                }
            };
            for ((_, expression, _), accumulator) in
                self.aggregates.iter().zip(&mut groups[index].1)
            {
                match expression {
                    Some(expression) => accumulator.add(scope.evaluate(expression, &row)),
                    // COUNT(*) counts the solutions themselves.
                    None => accumulator.add_solution(&row),
                }
            }
        }
        if groups.is_empty() && self.key_columns.is_empty() {
            // The single implicit group of an aggregate query over nothing.
            groups.push((
                Vec::new(),
                self.aggregates.iter().map(new_accumulator).collect(),
            ));
        }
        self.output = Some(
            groups
                .into_iter()
                .enumerate()
                .map(|(offset, (mut key, accumulators))| {
                    for accumulator in accumulators {
                        key.push(accumulator.finish());
                    }
                    Row {
                        values: key,
                        offset,
                    }
                })
                .collect(),
        );
        Ok(())
    }
}

impl RowSource for Aggregation {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if self.output.is_none() {
            self.fill_output()?;
        }
        Ok(self.output.as_mut().and_then(VecDeque::pop_front))
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.output = None;
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.origin = origin.clone();
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}

fn new_accumulator(
    (distinct, expression, function): &(bool, Option<Expression>, AggregateFunction),
) -> Accumulator {
    let state = match function {
        AggregateFunction::Count => State::Count { count: 0 },
        // SUM over the empty group is the integer 0.
        AggregateFunction::Sum => State::Sum {
            sum: Some(NumericValue::Integer(0.into())),
        },
        AggregateFunction::Avg => State::Avg {
            sum: Some(NumericValue::Integer(0.into())),
            count: 0,
        },
        AggregateFunction::Min => State::Extremum {
            keep: Ordering::Less,
            value: None,
            failed: false,
        },
        AggregateFunction::Max => State::Extremum {
            keep: Ordering::Greater,
            value: None,
            failed: false,
        },
        AggregateFunction::Sample => State::Sample { value: None },
        AggregateFunction::GroupConcat { separator } => State::GroupConcat {
            concat: Some(String::new()),
            language: None,
            separator: separator.clone().unwrap_or_else(|| " ".to_owned()),
        },
    };
    Accumulator {
        count_solutions: expression.is_none(),
        seen: if *distinct {
            Some(rustc_hash::FxHashSet::default())
        } else {
            None
        },
        state,
    }
}

struct Accumulator {
    count_solutions: bool,
    seen: Option<rustc_hash::FxHashSet<Vec<Option<Term>>>>,
    state: State,
}

#[allow(clippy::option_option)]
enum State {
    Count {
        count: i64,
    },
    Sum {
        sum: Option<NumericValue>,
    },
    Avg {
        sum: Option<NumericValue>,
        count: i64,
    },
    Extremum {
        keep: Ordering,
        value: Option<Term>,
        failed: bool,
    },
    Sample {
        value: Option<Term>,
    },
    GroupConcat {
        concat: Option<String>,
        language: Option<Option<String>>,
        separator: String,
    },
}

impl Accumulator {
    /// Feeds a `COUNT(*)` accumulator with the row itself.
    fn add_solution(&mut self, row: &Row) {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(row.values.clone()) {
                return;
            }
        }
        if let State::Count { count } = &mut self.state {
            *count += 1;
        }
    }

    /// Feeds an expression aggregate; `None` is an evaluation error.
    fn add(&mut self, value: Option<Term>) {
        if self.count_solutions {
            return;
        }
        if let Some(value) = &value {
            if let Some(seen) = &mut self.seen {
                if !seen.insert(vec![Some(value.clone())]) {
                    return;
                }
            }
        }
        match &mut self.state {
            Count { count } => {
                // COUNT(?v) counts the rows where the expression has a value.
                if value.is_some() {
                    *count += 1;
                }
            }
            Sum { sum } => {
                *sum = fold_sum(sum.take(), value);
            }
            Avg { sum, count } => {
                *sum = fold_sum(sum.take(), value);
                *count += 1;
            }
            Extremum {
                keep,
                value: best,
                failed,
            } => {
                if *failed {
                    return;
                }
                let Some(value) = value else {
                    *failed = true;
                    return;
                };
                match best {
                    None => *best = Some(value),
                    Some(current) => match partial_cmp_terms(&value, current) {
                        Some(ordering) if ordering == *keep => *best = Some(value),
                        Some(_) => (),
                        // Incomparable members poison the group.
                        None => *failed = true,
                    },
                }
            }
            Sample { value: sample } => {
                if sample.is_none() {
                    *sample = value;
                }
            }
            GroupConcat {
                concat,
                language,
                separator,
            } => {
                let Some(buffer) = concat.as_mut() else {
                    return;
                };
                let Some((value, value_language)) =
                    value.and_then(crate::expression::to_string_and_language)
                else {
                    *concat = None;
                    return;
                };
                if let Some(language) = language {
                    if *language != value_language {
                        *language = None;
                    }
                    buffer.push_str(separator);
                } else {
                    *language = Some(value_language);
                }
                buffer.push_str(&value);
            }
        }
    }

    fn finish(self) -> Option<Term> {
        match self.state {
            Count { count } => Some(Literal::from(count).into()),
            Sum { sum } => Some(Literal::from(sum?).into()),
            Avg { sum, count } => {
                if count == 0 {
                    return Some(Literal::from(0_i64).into());
                }
                // Integer averages accumulate in decimal to avoid drift.
                Some(
                    Literal::from(match sum? {
                        NumericValue::Integer(sum) => NumericValue::Decimal(
                            Decimal::from(sum).checked_div(Decimal::from(count))?,
                        ),
                        NumericValue::Decimal(sum) => {
                            NumericValue::Decimal(sum.checked_div(Decimal::from(count))?)
                        }
                        NumericValue::Float(sum) => {
                            NumericValue::Float(sum / Integer::from(count).into())
                        }
                        NumericValue::Double(sum) => {
                            NumericValue::Double(sum / Integer::from(count).into())
                        }
                    })
                    .into(),
                )
            }
            Extremum { value, failed, .. } => {
                if failed {
                    None
                } else {
                    value
                }
            }
            Sample { value } => value,
            GroupConcat {
                concat, language, ..
            } => Some(
                crate::expression::build_plain_literal(concat?, language.flatten()).into(),
            ),
        }
    }
}

use State::{Avg, Count, Extremum, GroupConcat, Sample, Sum};

fn fold_sum(sum: Option<NumericValue>, value: Option<Term>) -> Option<NumericValue> {
    let sum = sum?;
    let value = numeric_value(&value?)?;
    match numeric_pair(&Literal::from(sum).into(), &Literal::from(value).into())? {
        NumericPair::Integer(a, b) => a.checked_add(b).map(NumericValue::Integer),
        NumericPair::Decimal(a, b) => a.checked_add(b).map(NumericValue::Decimal),
        NumericPair::Float(a, b) => Some(NumericValue::Float(a + b)),
        NumericPair::Double(a, b) => Some(NumericValue::Double(a + b)),
    }
}
