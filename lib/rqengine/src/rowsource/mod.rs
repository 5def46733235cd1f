//! The execution operators. Every operator implements the same streaming
//! contract and owns its inner rowsources; the tree is built once per
//! execution and read with `read_row` pulls.

mod aggregate;
mod filter;
mod graph;
mod join;
mod modifiers;
mod triples;
mod union;
mod values;

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::row::Row;
use crate::service::ServiceSolutions;
use rqalgebra::{GraphPattern, NamedNodePattern};
use rqrdf::{NamedOrBlankNode, Term, Variable};
use std::rc::Rc;

pub(crate) use self::values::{EmptyRowSource, RowSequence};

/// The uniform streaming contract of every operator.
pub(crate) trait RowSource {
    /// The declared variable list: global offsets, in column order. Stable
    /// from construction on.
    fn variables(&self) -> &[usize];

    /// The next row, or `None` at the end of the stream. Returned rows are
    /// owned by the caller.
    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError>;

    /// Rewinds to just after construction. The current origin is kept.
    fn reset(&mut self) -> Result<(), EvaluationError>;

    /// Propagates a named-graph binding down the tree. Operators matching
    /// triples restrict themselves to that graph.
    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>);

    /// The inner rowsource at `index`, for introspection.
    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        let _ = index;
        None
    }
}

/// Lowers an algebra pattern into its operator tree.
pub(crate) fn build_rowsource(
    pattern: &GraphPattern,
    ctx: &Rc<EvalContext>,
) -> Result<Box<dyn RowSource>, EvaluationError> {
    Ok(match pattern {
        GraphPattern::Bgp { patterns } => {
            // The empty basic pattern is the join identity: one empty row.
            let mut source: Option<Box<dyn RowSource>> = None;
            for pattern in patterns {
                let matcher = Box::new(triples::TriplesMatch::new(pattern, ctx)?);
                source = Some(match source {
                    Some(left) => Box::new(join::Join::new(left, matcher, ctx)),
                    None => matcher,
                });
            }
            source.unwrap_or_else(|| Box::new(RowSequence::unit()))
        }
        GraphPattern::Join { left, right } => Box::new(join::Join::new(
            build_rowsource(left, ctx)?,
            build_rowsource(right, ctx)?,
            ctx,
        )),
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => Box::new(join::LeftJoin::new(
            build_rowsource(left, ctx)?,
            build_rowsource(right, ctx)?,
            expression.clone(),
            ctx,
        )),
        GraphPattern::Minus { left, right } => Box::new(join::Minus::new(
            build_rowsource(left, ctx)?,
            build_rowsource(right, ctx)?,
            ctx,
        )),
        GraphPattern::Union { left, right } => Box::new(union::Union::new(
            build_rowsource(left, ctx)?,
            build_rowsource(right, ctx)?,
            ctx,
        )),
        GraphPattern::Filter { expr, inner } => Box::new(filter::Filter::new(
            build_rowsource(inner, ctx)?,
            expr.clone(),
            ctx,
        )),
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => Box::new(filter::Extend::new(
            build_rowsource(inner, ctx)?,
            named_offset(ctx, variable)?,
            expression.clone(),
            ctx,
        )),
        GraphPattern::Graph { name, inner } => {
            Box::new(graph::Graph::new(build_rowsource(inner, ctx)?, name, ctx)?)
        }
        GraphPattern::Values {
            variables,
            bindings,
        } => {
            let mut offsets = Vec::with_capacity(variables.len());
            for variable in variables {
                offsets.push(named_offset(ctx, variable)?);
            }
            let rows = bindings
                .iter()
                .enumerate()
                .map(|(offset, binding)| Row {
                    values: binding
                        .iter()
                        .map(|value| value.clone().map(Term::from))
                        .collect(),
                    offset,
                })
                .collect();
            Box::new(RowSequence::new(offsets, rows))
        }
        GraphPattern::Project { inner, variables } => {
            let source = build_rowsource(inner, ctx)?;
            let mut offsets = Vec::with_capacity(variables.len());
            for variable in variables {
                offsets.push(named_offset(ctx, variable)?);
            }
            Box::new(modifiers::Project::new(source, offsets))
        }
        GraphPattern::Distinct { inner } => {
            Box::new(modifiers::Distinct::new(build_rowsource(inner, ctx)?, ctx))
        }
        // REDUCED permits but does not require duplicate elimination.
        GraphPattern::Reduced { inner } => build_rowsource(inner, ctx)?,
        GraphPattern::Slice {
            inner,
            start,
            length,
        } => Box::new(modifiers::Slice::new(
            build_rowsource(inner, ctx)?,
            *start,
            *length,
        )),
        GraphPattern::OrderBy { inner, expression } => Box::new(modifiers::OrderBy::new(
            build_rowsource(inner, ctx)?,
            expression.clone(),
            ctx,
        )),
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => Box::new(aggregate::Aggregation::new(
            build_rowsource(inner, ctx)?,
            variables,
            aggregates,
            ctx,
        )?),
        GraphPattern::Service {
            name,
            inner,
            silent,
        } => build_service(name, inner, *silent, ctx)?,
    })
}

fn build_service(
    name: &NamedNodePattern,
    pattern: &GraphPattern,
    silent: bool,
    ctx: &Rc<EvalContext>,
) -> Result<Box<dyn RowSource>, EvaluationError> {
    match try_build_service(name, pattern, ctx) {
        Ok(source) => Ok(source),
        // SILENT degrades a failed service construction to the empty stream.
        Err(_) if silent => Ok(Box::new(EmptyRowSource::new())),
        Err(error) => Err(error),
    }
}

fn try_build_service(
    name: &NamedNodePattern,
    pattern: &GraphPattern,
    ctx: &Rc<EvalContext>,
) -> Result<Box<dyn RowSource>, EvaluationError> {
    let NamedNodePattern::NamedNode(service_name) = name else {
        return Err(EvaluationError::UnboundService);
    };
    let handler = ctx
        .service_handler
        .as_ref()
        .ok_or(EvaluationError::UnsupportedService)?;
    let ServiceSolutions {
        variables,
        solutions,
    } = handler
        .handle(service_name, pattern)
        .map_err(EvaluationError::Service)?;
    let mut offsets = Vec::with_capacity(variables.len());
    for variable in &variables {
        offsets.push(named_offset(ctx, variable)?);
    }
    let rows = solutions
        .into_iter()
        .enumerate()
        .map(|(offset, values)| Row { values, offset })
        .collect();
    Ok(Box::new(RowSequence::new(offsets, rows)))
}

/// A variable reaching execution without a table entry is an engine
/// invariant violation.
pub(crate) fn named_offset(
    ctx: &EvalContext,
    variable: &Variable,
) -> Result<usize, EvaluationError> {
    ctx.table.named_offset(variable).ok_or_else(|| {
        EvaluationError::Internal(format!("variable {variable} is missing from the table"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{LimitState, QueryLimits};
    use crate::table::VariableTable;
    use rqrdf::{Dataset, Literal};
    use rqxsd::DateTime;
    use std::cell::RefCell;

    fn context(width: usize) -> Rc<EvalContext> {
        Rc::new(EvalContext {
            dataset: Rc::new(Dataset::new()),
            table: Rc::new(VariableTable::new()),
            frame: RefCell::new(vec![None; width]),
            now: DateTime::now(),
            base_iri: None,
            service_handler: None,
            custom_functions: Rc::new(crate::context::CustomFunctionRegistry::default()),
            limits: LimitState::start(&QueryLimits::new()),
        })
    }

    fn rows(variables: Vec<usize>, table: &[&[Option<i64>]]) -> Box<dyn RowSource> {
        Box::new(RowSequence::new(
            variables,
            table
                .iter()
                .enumerate()
                .map(|(offset, values)| Row {
                    values: values
                        .iter()
                        .map(|v| v.map(|v| Term::from(Literal::from(v))))
                        .collect(),
                    offset,
                })
                .collect(),
        ))
    }

    fn drain(source: &mut dyn RowSource) -> Vec<Vec<Option<Term>>> {
        let mut all = Vec::new();
        while let Some(row) = source.read_row().unwrap() {
            all.push(row.values);
        }
        all
    }

    fn term(value: i64) -> Option<Term> {
        Some(Literal::from(value).into())
    }

    #[test]
    fn join_merges_compatible_rows() {
        let ctx = context(3);
        let left = rows(vec![0, 1], &[&[Some(1), Some(2)], &[Some(3), None]]);
        let right = rows(vec![1, 2], &[&[Some(2), Some(9)], &[Some(7), Some(8)]]);
        let mut join = super::join::Join::new(left, right, &ctx);
        assert_eq!(join.variables(), [0, 1, 2]);
        assert_eq!(
            drain(&mut join),
            [
                // The shared variable matches only the first right row.
                vec![term(1), term(2), term(9)],
                // An unbound shared slot takes the right binding.
                vec![term(3), term(2), term(9)],
                vec![term(3), term(7), term(8)],
            ]
        );
    }

    #[test]
    fn left_join_emits_unmatched_left_rows_padded() {
        let ctx = context(3);
        let left = rows(vec![0, 1], &[&[Some(1), Some(2)], &[Some(3), Some(4)]]);
        let right = rows(vec![1, 2], &[&[Some(2), Some(9)]]);
        let mut left_join = super::join::LeftJoin::new(left, right, None, &ctx);
        assert_eq!(
            drain(&mut left_join),
            [
                vec![term(1), term(2), term(9)],
                vec![term(3), term(4), None],
            ]
        );
    }

    #[test]
    fn union_relocates_columns() {
        let ctx = context(3);
        let left = rows(vec![0, 1], &[&[Some(1), Some(2)]]);
        let right = rows(vec![2], &[&[Some(9)]]);
        let mut union = super::union::Union::new(left, right, &ctx);
        assert_eq!(union.variables(), [0, 1, 2]);
        assert_eq!(
            drain(&mut union),
            [vec![term(1), term(2), None], vec![None, None, term(9)]]
        );
    }

    #[test]
    fn minus_keeps_rows_without_shared_bindings() {
        let ctx = context(2);
        let left = rows(vec![0], &[&[Some(1)], &[Some(2)]]);
        let right = rows(vec![0], &[&[Some(1)]]);
        let mut minus = super::join::Minus::new(left, right, &ctx);
        assert_eq!(drain(&mut minus), [vec![term(2)]]);

        let left = rows(vec![0], &[&[Some(1)]]);
        let right = rows(vec![1], &[&[Some(1)]]);
        let mut disjoint = super::join::Minus::new(left, right, &ctx);
        assert_eq!(drain(&mut disjoint), [vec![term(1)]]);
    }

    #[test]
    fn slice_skips_and_limits() {
        let source = rows(vec![0], &[&[Some(1)], &[Some(2)], &[Some(3)]]);
        let mut slice = super::modifiers::Slice::new(source, 1, Some(1));
        assert_eq!(drain(&mut slice), [vec![term(2)]]);
    }

    #[test]
    fn distinct_drops_term_identical_rows() {
        let ctx = context(1);
        let source = rows(vec![0], &[&[Some(1)], &[Some(1)], &[Some(2)]]);
        let mut distinct = super::modifiers::Distinct::new(source, &ctx);
        assert_eq!(drain(&mut distinct), [vec![term(1)], vec![term(2)]]);
        distinct.reset().unwrap();
        assert_eq!(drain(&mut distinct).len(), 2);
    }

    #[test]
    fn row_sequence_resets() {
        let mut source = rows(vec![0], &[&[Some(1)]]);
        assert_eq!(drain(source.as_mut()).len(), 1);
        source.reset().unwrap();
        assert_eq!(drain(source.as_mut()).len(), 1);
    }
}
