//! Query preparation: the rewrite and validation pass run between parsing
//! and execution.
//!
//! All rewrites preserve query semantics. Preparation also re-validates
//! scope rules for programmatically-built pattern trees that never went
//! through the parser.

use crate::algebra::GraphPattern;
use crate::expression::{Expression, OrderExpression};
use crate::query::Query;
use crate::use_map::UseMap;
use rqrdf::Variable;
use std::collections::HashMap;
use std::fmt;

/// A callback able to evaluate a closed (variable-free, deterministic)
/// expression to a term expression, used for constant folding. Returning
/// `None` leaves the expression as it is.
pub type ConstantFolder<'a> = &'a dyn Fn(&Expression) -> Option<Expression>;

/// A prepared query together with the non-fatal diagnostics preparation
/// produced and the variable-use map of its final pattern tree.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub query: Query,
    pub warnings: Vec<PrepareWarning>,
    pub use_map: UseMap,
}

/// Prepares a query without constant folding.
pub fn prepare(query: Query) -> Result<PreparedQuery, PrepareError> {
    prepare_with_folder(query, &|_| None)
}

/// Prepares a query:
///
/// 1. folds closed deterministic expressions with `folder`,
/// 2. merges adjacent basic graph patterns and drops empty join sides, to
///    fixed point,
/// 3. checks `BIND`/`Extend` scope rules,
/// 4. deduplicates repeated projection variables (with a warning) and prunes
///    projection variables that can never be bound (with a warning).
pub fn prepare_with_folder(
    mut query: Query,
    folder: ConstantFolder<'_>,
) -> Result<PreparedQuery, PrepareError> {
    let mut warnings = Vec::new();
    let pattern = query.pattern_mut();
    fold_pattern(pattern, folder);
    simplify_pattern(pattern);
    check_scopes(pattern)?;
    clean_projections(pattern, &mut warnings);
    let use_map = UseMap::build(pattern);
    for variable in use_map.never_bound() {
        warnings.push(PrepareWarning::NeverBound(variable));
    }
    Ok(PreparedQuery {
        query,
        warnings,
        use_map,
    })
}

/// A fatal error raised during preparation.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum PrepareError {
    /// A `BIND` introduces a variable that is already in scope at that point.
    #[error("BIND variable {variable} already used in the group")]
    ScopeViolation { variable: Variable },
}

/// A non-fatal diagnostic raised during preparation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PrepareWarning {
    /// A variable is projected twice; the duplicate is dropped.
    DuplicateProjection(Variable),
    /// A projected variable can never be bound by the pattern.
    UnboundProjection(Variable),
    /// A variable is mentioned but no pattern node can bind it.
    NeverBound(Variable),
}

impl fmt::Display for PrepareWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateProjection(v) => {
                write!(f, "variable {v} is projected twice, ignoring the duplicate")
            }
            Self::UnboundProjection(v) => {
                write!(f, "projected variable {v} is never bound by the query")
            }
            Self::NeverBound(v) => {
                write!(f, "variable {v} is used but cannot be bound")
            }
        }
    }
}

// --- constant folding ---

fn fold_pattern(pattern: &mut GraphPattern, folder: ConstantFolder<'_>) {
    match pattern {
        GraphPattern::Bgp { .. } | GraphPattern::Values { .. } => (),
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            fold_pattern(left, folder);
            fold_pattern(right, folder);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            fold_pattern(left, folder);
            fold_pattern(right, folder);
            if let Some(expression) = expression {
                fold_expression(expression, folder);
            }
        }
        GraphPattern::Filter { expr, inner } => {
            fold_expression(expr, folder);
            fold_pattern(inner, folder);
        }
        GraphPattern::Extend {
            inner, expression, ..
        } => {
            fold_expression(expression, folder);
            fold_pattern(inner, folder);
        }
        GraphPattern::OrderBy { inner, expression } => {
            for condition in expression {
                match condition {
                    OrderExpression::Asc(e) | OrderExpression::Desc(e) => {
                        fold_expression(e, folder);
                    }
                }
            }
            fold_pattern(inner, folder);
        }
        GraphPattern::Group { inner, .. }
        | GraphPattern::Graph { inner, .. }
        | GraphPattern::Service { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. } => fold_pattern(inner, folder),
    }
}

fn fold_expression(expression: &mut Expression, folder: ConstantFolder<'_>) {
    if expression.is_constant() && !matches!(expression, Expression::Literal(_) | Expression::NamedNode(_)) {
        if let Some(folded) = folder(expression) {
            *expression = folded;
            return;
        }
    }
    match expression {
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_)
        | Expression::Exists(_) => (),
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => {
            fold_expression(a, folder);
            fold_expression(b, folder);
        }
        Expression::UnaryPlus(e) | Expression::UnaryMinus(e) | Expression::Not(e) => {
            fold_expression(e, folder);
        }
        Expression::If(a, b, c) => {
            fold_expression(a, folder);
            fold_expression(b, folder);
            fold_expression(c, folder);
        }
        Expression::In(a, bs) => {
            fold_expression(a, folder);
            for b in bs {
                fold_expression(b, folder);
            }
        }
        Expression::Coalesce(es) => {
            for e in es {
                fold_expression(e, folder);
            }
        }
        Expression::FunctionCall(_, args) => {
            for arg in args {
                fold_expression(arg, folder);
            }
        }
    }
}

// --- pattern simplification ---

fn simplify_pattern(pattern: &mut GraphPattern) {
    loop {
        let mut changed = false;
        simplify_step(pattern, &mut changed);
        if !changed {
            return;
        }
    }
}

fn simplify_step(pattern: &mut GraphPattern, changed: &mut bool) {
    // Children first so that freshly-merged nodes are visible to the parent.
    for_each_child(pattern, &mut |child| simplify_step(child, changed));
    if let GraphPattern::Join { left, right } = pattern {
        // An empty basic pattern is the join identity.
        if matches!(left.as_ref(), GraphPattern::Bgp { patterns } if patterns.is_empty()) {
            *pattern = std::mem::take(right);
            *changed = true;
            return;
        }
        if matches!(right.as_ref(), GraphPattern::Bgp { patterns } if patterns.is_empty()) {
            *pattern = std::mem::take(left);
            *changed = true;
            return;
        }
        // Adjacent basic patterns merge into a single one.
        if let (GraphPattern::Bgp { patterns: a }, GraphPattern::Bgp { patterns: b }) =
            (left.as_mut(), right.as_mut())
        {
            let mut patterns = std::mem::take(a);
            patterns.append(b);
            *pattern = GraphPattern::Bgp { patterns };
            *changed = true;
        }
    }
}

fn for_each_child(pattern: &mut GraphPattern, callback: &mut impl FnMut(&mut GraphPattern)) {
    match pattern {
        GraphPattern::Bgp { .. } | GraphPattern::Values { .. } => (),
        GraphPattern::Join { left, right }
        | GraphPattern::LeftJoin { left, right, .. }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            callback(left);
            callback(right);
        }
        GraphPattern::Filter { inner, .. }
        | GraphPattern::Graph { inner, .. }
        | GraphPattern::Extend { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. }
        | GraphPattern::Service { inner, .. } => callback(inner),
    }
}

// --- scope checking ---

/// Bottom-up scope validation: `Extend` must not re-introduce an in-scope
/// variable, sub-`SELECT` projections bound what is visible outside.
fn check_scopes(pattern: &GraphPattern) -> Result<Vec<Variable>, PrepareError> {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            let mut scope = Vec::new();
            for triple in patterns {
                triple.on_variables(&mut |v| {
                    if !scope.contains(v) {
                        scope.push(v.clone());
                    }
                });
            }
            Ok(scope)
        }
        GraphPattern::Join { left, right } | GraphPattern::Union { left, right } => {
            let mut scope = check_scopes(left)?;
            for v in check_scopes(right)? {
                if !scope.contains(&v) {
                    scope.push(v);
                }
            }
            Ok(scope)
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            if let Some(expression) = expression {
                check_expression_scopes(expression)?;
            }
            let mut scope = check_scopes(left)?;
            for v in check_scopes(right)? {
                if !scope.contains(&v) {
                    scope.push(v);
                }
            }
            Ok(scope)
        }
        GraphPattern::Minus { left, right } => {
            check_scopes(right)?;
            check_scopes(left)
        }
        GraphPattern::Filter { expr, inner } => {
            check_expression_scopes(expr)?;
            check_scopes(inner)
        }
        GraphPattern::Graph { name, inner } => {
            let mut scope = check_scopes(inner)?;
            if let Some(v) = name.as_variable() {
                if !scope.contains(v) {
                    scope.push(v.clone());
                }
            }
            Ok(scope)
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            check_expression_scopes(expression)?;
            let mut scope = check_scopes(inner)?;
            if scope.contains(variable) {
                return Err(PrepareError::ScopeViolation {
                    variable: variable.clone(),
                });
            }
            scope.push(variable.clone());
            Ok(scope)
        }
        GraphPattern::Values { variables, .. } => Ok(variables.clone()),
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => {
            check_scopes(inner)?;
            let mut scope = variables.clone();
            for (v, _) in aggregates {
                scope.push(v.clone());
            }
            Ok(scope)
        }
        // The sub-select projection boundary: only projected variables
        // escape.
        GraphPattern::Project { inner, variables } => {
            check_scopes(inner)?;
            Ok(variables.clone())
        }
        GraphPattern::Service { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. } => check_scopes(inner),
    }
}

fn check_expression_scopes(expression: &Expression) -> Result<(), PrepareError> {
    match expression {
        Expression::Exists(pattern) => check_scopes(pattern).map(|_| ()),
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => Ok(()),
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => {
            check_expression_scopes(a)?;
            check_expression_scopes(b)
        }
        Expression::UnaryPlus(e) | Expression::UnaryMinus(e) | Expression::Not(e) => {
            check_expression_scopes(e)
        }
        Expression::If(a, b, c) => {
            check_expression_scopes(a)?;
            check_expression_scopes(b)?;
            check_expression_scopes(c)
        }
        Expression::In(a, bs) => {
            check_expression_scopes(a)?;
            for b in bs {
                check_expression_scopes(b)?;
            }
            Ok(())
        }
        Expression::Coalesce(es) => {
            for e in es {
                check_expression_scopes(e)?;
            }
            Ok(())
        }
        Expression::FunctionCall(_, args) => {
            for arg in args {
                check_expression_scopes(arg)?;
            }
            Ok(())
        }
    }
}

// --- projection cleanup ---

fn clean_projections(pattern: &mut GraphPattern, warnings: &mut Vec<PrepareWarning>) {
    for_each_child(pattern, &mut |child| clean_projections(child, warnings));
    if let GraphPattern::Project { inner, variables } = pattern {
        let mut seen = HashMap::new();
        let bindable = inner.in_scope_variables();
        variables.retain(|v| {
            if seen.insert(v.clone(), ()).is_some() {
                warnings.push(PrepareWarning::DuplicateProjection(v.clone()));
                return false;
            }
            if !bindable.contains(v) {
                warnings.push(PrepareWarning::UnboundProjection(v.clone()));
                return false;
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TriplePattern;
    use rqrdf::{Literal, NamedNode};

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn bgp(triples: Vec<TriplePattern>) -> GraphPattern {
        GraphPattern::Bgp { patterns: triples }
    }

    fn spo() -> TriplePattern {
        TriplePattern::new(
            var("s"),
            NamedNode::new_unchecked("http://example.com/p"),
            var("o"),
        )
    }

    #[test]
    fn adjacent_bgps_merge() {
        let query = Query::Select {
            dataset: None,
            pattern: GraphPattern::Project {
                inner: Box::new(GraphPattern::Join {
                    left: Box::new(bgp(vec![spo()])),
                    right: Box::new(GraphPattern::Join {
                        left: Box::new(bgp(vec![])),
                        right: Box::new(bgp(vec![spo()])),
                    }),
                }),
                variables: vec![var("s")],
            },
            base_iri: None,
        };
        let prepared = prepare(query).unwrap();
        let GraphPattern::Project { inner, .. } = prepared.query.pattern() else {
            panic!()
        };
        assert!(matches!(
            inner.as_ref(),
            GraphPattern::Bgp { patterns } if patterns.len() == 2
        ));
    }

    #[test]
    fn extend_over_in_scope_variable_is_rejected() {
        let query = Query::Select {
            dataset: None,
            pattern: GraphPattern::Extend {
                inner: Box::new(bgp(vec![spo()])),
                variable: var("o"),
                expression: Expression::Literal(Literal::from(1)),
            },
            base_iri: None,
        };
        assert_eq!(
            prepare(query).unwrap_err(),
            PrepareError::ScopeViolation { variable: var("o") }
        );
    }

    #[test]
    fn duplicate_and_unbound_projections_are_cleaned() {
        let query = Query::Select {
            dataset: None,
            pattern: GraphPattern::Project {
                inner: Box::new(bgp(vec![spo()])),
                variables: vec![var("s"), var("s"), var("nowhere")],
            },
            base_iri: None,
        };
        let prepared = prepare(query).unwrap();
        let GraphPattern::Project { variables, .. } = prepared.query.pattern() else {
            panic!()
        };
        assert_eq!(variables, &[var("s")]);
        assert_eq!(prepared.warnings.len(), 2);
    }

    #[test]
    fn folding_replaces_closed_expressions() {
        let query = Query::Select {
            dataset: None,
            pattern: GraphPattern::Filter {
                expr: Expression::Add(
                    Box::new(Expression::Literal(Literal::from(1))),
                    Box::new(Expression::Literal(Literal::from(2))),
                ),
                inner: Box::new(bgp(vec![spo()])),
            },
            base_iri: None,
        };
        let prepared = prepare_with_folder(query, &|_| {
            Some(Expression::Literal(Literal::from(3)))
        })
        .unwrap();
        let GraphPattern::Filter { expr, .. } = prepared.query.pattern() else {
            panic!()
        };
        assert_eq!(expr, &Expression::Literal(Literal::from(3)));
    }
}
