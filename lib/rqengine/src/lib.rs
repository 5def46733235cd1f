#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

mod context;
mod error;
mod expression;
mod results;
mod row;
mod rowsource;
mod service;
mod sort;
mod table;

use crate::context::{CustomFunctionRegistry, EvalContext, LimitState};
use crate::expression::EvalScope;
use crate::row::Row;
use crate::rowsource::build_rowsource;
use rqalgebra::prepare::prepare_with_folder;
use rqalgebra::{
    AggregateExpression, Expression, GraphPattern, NamedNodePattern, PreparedQuery, Query,
    TriplePattern,
};
use rqrdf::{Dataset, NamedNode, Term, Variable};
use rqxsd::DateTime;
use std::cell::RefCell;
use std::rc::Rc;

pub use crate::context::QueryLimits;
pub use crate::error::{EvaluationError, QueryPrepareError};
pub use crate::results::{QueryResults, QuerySolutionIter, QueryTripleIter};
pub use crate::row::{CompatibilityMap, Row as SolutionRow};
pub use crate::service::{ServiceHandler, ServiceSolutions};
pub use crate::table::VariableTable;
pub use rqresults::QuerySolution;

/// Prepares and evaluates [SPARQL queries](https://www.w3.org/TR/sparql11-query/)
/// against an in-memory [`Dataset`].
///
/// ```
/// use rqengine::{QueryEvaluator, QueryResults};
/// use rqrdf::{Dataset, GraphName, NamedNode, Quad};
///
/// let ex = NamedNode::new("http://example.com")?;
/// let dataset = Dataset::from_iter([Quad::new(
///     ex.clone(),
///     ex.clone(),
///     ex.clone(),
///     GraphName::DefaultGraph,
/// )]);
/// let evaluator = QueryEvaluator::new();
/// let query = evaluator.prepare("SELECT * WHERE { ?s ?p ?o }", None)?;
/// if let QueryResults::Solutions(solutions) = evaluator.execute(dataset, &query.query)? {
///     let solutions = solutions.collect::<Result<Vec<_>, _>>()?;
///     assert_eq!(solutions.len(), 1);
///     assert_eq!(solutions[0].get("s"), Some(&ex.into()));
/// }
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
pub struct QueryEvaluator {
    service_handler: Option<Rc<dyn ServiceHandler>>,
    custom_functions: Rc<CustomFunctionRegistry>,
    limits: QueryLimits,
}

impl QueryEvaluator {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `handler` to evaluate `SERVICE` clauses.
    #[must_use]
    pub fn with_service_handler(mut self, handler: impl ServiceHandler + 'static) -> Self {
        self.service_handler = Some(Rc::new(handler));
        self
    }

    /// Registers a custom extension function.
    #[must_use]
    pub fn with_custom_function(
        mut self,
        name: NamedNode,
        evaluator: impl Fn(&[Term]) -> Option<Term> + 'static,
    ) -> Self {
        Rc::make_mut(&mut self.custom_functions).insert(name, Rc::new(evaluator));
        self
    }

    /// Applies execution limits (timeout, stop flag) to every execution.
    #[must_use]
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Parses and prepares a query: syntax, scope validation, constant
    /// folding and pattern simplification.
    pub fn prepare(
        &self,
        query: &str,
        base_iri: Option<&str>,
    ) -> Result<PreparedQuery, QueryPrepareError> {
        self.prepare_parsed(Query::parse(query, base_iri)?)
    }

    /// Prepares an already-parsed (or programmatically built) query.
    pub fn prepare_parsed(&self, query: Query) -> Result<PreparedQuery, QueryPrepareError> {
        let ctx = Rc::new(folding_context());
        Ok(prepare_with_folder(query, &|expression| {
            fold_closed_expression(&ctx, expression)
        })?)
    }

    /// Evaluates a query against a dataset. `NOW()` is fixed once per call.
    ///
    /// `FROM`/`FROM NAMED` clauses are not interpreted: the query runs
    /// against the dataset it is handed.
    pub fn execute(
        &self,
        dataset: Dataset,
        query: &Query,
    ) -> Result<QueryResults, EvaluationError> {
        let mut table = VariableTable::new();
        collect_query_variables(query, &mut table);
        let width = table.len();
        let ctx = Rc::new(EvalContext {
            dataset: Rc::new(dataset),
            table: Rc::new(table),
            frame: RefCell::new(vec![None; width]),
            now: DateTime::now(),
            base_iri: query.base_iri().cloned(),
            service_handler: self.service_handler.clone(),
            custom_functions: Rc::clone(&self.custom_functions),
            limits: LimitState::start(&self.limits),
        });
        match query {
            Query::Select { pattern, .. } => {
                let source = build_rowsource(pattern, &ctx)?;
                Ok(QueryResults::Solutions(QuerySolutionIter::new(
                    &ctx, source,
                )?))
            }
            Query::Ask { pattern, .. } => {
                let mut source = build_rowsource(pattern, &ctx)?;
                Ok(QueryResults::Boolean(source.read_row()?.is_some()))
            }
            Query::Construct {
                template, pattern, ..
            } => {
                let source = build_rowsource(pattern, &ctx)?;
                Ok(QueryResults::Graph(QueryTripleIter::new(
                    &ctx,
                    source,
                    template.clone(),
                )))
            }
        }
    }
}

/// A context carrying nothing, for evaluating closed expressions at
/// preparation time.
fn folding_context() -> EvalContext {
    EvalContext {
        dataset: Rc::new(Dataset::new()),
        table: Rc::new(VariableTable::new()),
        frame: RefCell::new(Vec::new()),
        now: DateTime::now(),
        base_iri: None,
        service_handler: None,
        custom_functions: Rc::new(CustomFunctionRegistry::default()),
        limits: LimitState::start(&QueryLimits::new()),
    }
}

fn fold_closed_expression(
    ctx: &Rc<EvalContext>,
    expression: &Expression,
) -> Option<Expression> {
    let scope = EvalScope {
        ctx,
        variables: &[],
        origin: None,
    };
    let row = Row {
        values: Vec::new(),
        offset: 0,
    };
    match scope.evaluate(expression, &row)? {
        Term::NamedNode(node) => Some(Expression::NamedNode(node)),
        Term::Literal(literal) => Some(Expression::Literal(literal)),
        Term::BlankNode(_) => None,
    }
}

// --- variable collection ---

/// Registers every named variable of the query, then every blank node label
/// used in patterns, so offsets are final before the operator tree is
/// built.
fn collect_query_variables(query: &Query, table: &mut VariableTable) {
    collect_pattern(query.pattern(), &mut |v| {
        table.bind_named(v);
    });
    if let Query::Construct { template, .. } = query {
        for triple in template {
            triple.on_variables(&mut |v| {
                table.bind_named(v);
            });
        }
    }
    collect_pattern_blank_labels(query.pattern(), &mut |label| {
        table.bind_anonymous(label);
    });
}

fn collect_pattern<'a>(pattern: &'a GraphPattern, on_variable: &mut impl FnMut(&'a Variable)) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            for triple in patterns {
                triple.on_variables(on_variable);
            }
        }
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            collect_pattern(left, on_variable);
            collect_pattern(right, on_variable);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            collect_pattern(left, on_variable);
            collect_pattern(right, on_variable);
            if let Some(expression) = expression {
                collect_expression(expression, on_variable);
            }
        }
        GraphPattern::Filter { expr, inner } => {
            collect_expression(expr, on_variable);
            collect_pattern(inner, on_variable);
        }
        GraphPattern::Graph { name, inner } => {
            if let NamedNodePattern::Variable(v) = name {
                on_variable(v);
            }
            collect_pattern(inner, on_variable);
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            collect_pattern(inner, on_variable);
            collect_expression(expression, on_variable);
            on_variable(variable);
        }
        GraphPattern::Values { variables, .. } => {
            for variable in variables {
                on_variable(variable);
            }
        }
        GraphPattern::OrderBy { inner, expression } => {
            collect_pattern(inner, on_variable);
            for condition in expression {
                collect_expression(condition.expression(), on_variable);
            }
        }
        GraphPattern::Project { inner, variables } => {
            collect_pattern(inner, on_variable);
            for variable in variables {
                on_variable(variable);
            }
        }
        GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. } => collect_pattern(inner, on_variable),
        GraphPattern::Group {
            inner,
            variables,
            aggregates,
        } => {
            collect_pattern(inner, on_variable);
            for variable in variables {
                on_variable(variable);
            }
            for (variable, aggregate) in aggregates {
                on_variable(variable);
                if let AggregateExpression::FunctionCall { expr, .. } = aggregate {
                    collect_expression(expr, on_variable);
                }
            }
        }
        GraphPattern::Service { name, inner, .. } => {
            if let NamedNodePattern::Variable(v) = name {
                on_variable(v);
            }
            collect_pattern(inner, on_variable);
        }
    }
}

fn collect_expression<'a>(
    expression: &'a Expression,
    on_variable: &mut impl FnMut(&'a Variable),
) {
    expression.on_variables(on_variable);
    expression.on_exists_patterns(&mut |pattern| collect_pattern(pattern, on_variable));
}

fn collect_pattern_blank_labels(pattern: &GraphPattern, on_blank: &mut impl FnMut(&str)) {
    let mut on_triples = |triples: &[TriplePattern]| {
        for triple in triples {
            for position in [&triple.subject, &triple.object] {
                if let rqalgebra::TermPattern::BlankNode(node) = position {
                    on_blank(node.as_str());
                }
            }
        }
    };
    match pattern {
        GraphPattern::Bgp { patterns } => on_triples(patterns),
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            collect_pattern_blank_labels(left, on_blank);
            collect_pattern_blank_labels(right, on_blank);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            collect_pattern_blank_labels(left, on_blank);
            collect_pattern_blank_labels(right, on_blank);
            if let Some(expression) = expression {
                expression.on_exists_patterns(&mut |p| collect_pattern_blank_labels(p, on_blank));
            }
        }
        GraphPattern::Filter { expr, inner } => {
            expr.on_exists_patterns(&mut |p| collect_pattern_blank_labels(p, on_blank));
            collect_pattern_blank_labels(inner, on_blank);
        }
        GraphPattern::Extend {
            inner, expression, ..
        } => {
            expression.on_exists_patterns(&mut |p| collect_pattern_blank_labels(p, on_blank));
            collect_pattern_blank_labels(inner, on_blank);
        }
        GraphPattern::Values { .. } => (),
        GraphPattern::Graph { inner, .. }
        | GraphPattern::OrderBy { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. }
        | GraphPattern::Service { inner, .. } => collect_pattern_blank_labels(inner, on_blank),
    }
}
