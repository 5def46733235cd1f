//! [SPARQL 1.1 Query Algebra](https://www.w3.org/TR/sparql11-query/#sparqlQuery) representation.

use crate::expression::{AggregateExpression, Expression, OrderExpression};
use crate::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
use rqrdf::Variable;
use std::fmt;

/// A [graph pattern](https://www.w3.org/TR/sparql11-query/#sparqlQuery).
///
/// This tree is both the structured pattern the parser produces and the
/// algebra the engine executes; preparation rewrites it in place.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum GraphPattern {
    /// A [basic graph pattern](https://www.w3.org/TR/sparql11-query/#defn_BasicGraphPattern).
    Bgp { patterns: Vec<TriplePattern> },
    /// [Join](https://www.w3.org/TR/sparql11-query/#defn_algJoin).
    Join { left: Box<Self>, right: Box<Self> },
    /// [LeftJoin](https://www.w3.org/TR/sparql11-query/#defn_algLeftJoin), i.e. `OPTIONAL`.
    LeftJoin {
        left: Box<Self>,
        right: Box<Self>,
        expression: Option<Expression>,
    },
    /// [Filter](https://www.w3.org/TR/sparql11-query/#defn_algFilter).
    Filter { expr: Expression, inner: Box<Self> },
    /// [Union](https://www.w3.org/TR/sparql11-query/#defn_algUnion).
    Union { left: Box<Self>, right: Box<Self> },
    Graph {
        name: NamedNodePattern,
        inner: Box<Self>,
    },
    /// [Extend](https://www.w3.org/TR/sparql11-query/#defn_extend), i.e. `BIND`.
    Extend {
        inner: Box<Self>,
        variable: Variable,
        expression: Expression,
    },
    /// [Minus](https://www.w3.org/TR/sparql11-query/#defn_algMinus).
    Minus { left: Box<Self>, right: Box<Self> },
    /// A table used to provide inline values.
    Values {
        variables: Vec<Variable>,
        bindings: Vec<Vec<Option<GroundTerm>>>,
    },
    /// [OrderBy](https://www.w3.org/TR/sparql11-query/#defn_algOrdered).
    OrderBy {
        inner: Box<Self>,
        expression: Vec<OrderExpression>,
    },
    /// [Project](https://www.w3.org/TR/sparql11-query/#defn_algProjection).
    Project {
        inner: Box<Self>,
        variables: Vec<Variable>,
    },
    /// [Distinct](https://www.w3.org/TR/sparql11-query/#defn_algDistinct).
    Distinct { inner: Box<Self> },
    /// [Reduced](https://www.w3.org/TR/sparql11-query/#defn_algReduced).
    Reduced { inner: Box<Self> },
    /// [Slice](https://www.w3.org/TR/sparql11-query/#defn_algSlice), i.e. `LIMIT`/`OFFSET`.
    Slice {
        inner: Box<Self>,
        start: usize,
        length: Option<usize>,
    },
    /// [Group](https://www.w3.org/TR/sparql11-query/#aggregateAlgebra), i.e. `GROUP BY` and aggregates.
    Group {
        inner: Box<Self>,
        variables: Vec<Variable>,
        aggregates: Vec<(Variable, AggregateExpression)>,
    },
    /// [Service](https://www.w3.org/TR/sparql11-federated-query/#defn_evalService).
    Service {
        name: NamedNodePattern,
        inner: Box<Self>,
        silent: bool,
    },
}

impl Default for GraphPattern {
    fn default() -> Self {
        Self::Bgp {
            patterns: Vec::default(),
        }
    }
}

impl GraphPattern {
    /// Calls `callback` on each [in-scope variable](https://www.w3.org/TR/sparql11-query/#variableScope)
    /// occurrence, in first-mention order.
    pub fn on_in_scope_variables<'a>(&'a self, callback: &mut impl FnMut(&'a Variable)) {
        match self {
            Self::Bgp { patterns } => {
                for pattern in patterns {
                    pattern.on_variables(callback);
                }
            }
            Self::Join { left, right }
            | Self::LeftJoin { left, right, .. }
            | Self::Union { left, right } => {
                left.on_in_scope_variables(callback);
                right.on_in_scope_variables(callback);
            }
            Self::Graph { name, inner } => {
                if let NamedNodePattern::Variable(g) = name {
                    callback(g);
                }
                inner.on_in_scope_variables(callback);
            }
            Self::Extend {
                inner, variable, ..
            } => {
                inner.on_in_scope_variables(callback);
                callback(variable);
            }
            Self::Minus { left, .. } => left.on_in_scope_variables(callback),
            Self::Group {
                variables,
                aggregates,
                ..
            } => {
                for v in variables {
                    callback(v);
                }
                for (v, _) in aggregates {
                    callback(v);
                }
            }
            Self::Values { variables, .. } | Self::Project { variables, .. } => {
                for v in variables {
                    callback(v);
                }
            }
            Self::Service { inner, .. }
            | Self::Filter { inner, .. }
            | Self::OrderBy { inner, .. }
            | Self::Distinct { inner }
            | Self::Reduced { inner }
            | Self::Slice { inner, .. } => inner.on_in_scope_variables(callback),
        }
    }

    /// The in-scope variables, deduplicated, in first-mention order.
    pub fn in_scope_variables(&self) -> Vec<Variable> {
        let mut variables = Vec::new();
        self.on_in_scope_variables(&mut |v| {
            if !variables.contains(v) {
                variables.push(v.clone());
            }
        });
        variables
    }
}

impl fmt::Display for GraphPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bgp { patterns } => {
                for pattern in patterns {
                    write!(f, "{pattern} . ")?;
                }
                Ok(())
            }
            Self::Join { left, right } => match right.as_ref() {
                Self::LeftJoin { .. }
                | Self::Minus { .. }
                | Self::Extend { .. }
                | Self::Filter { .. } => {
                    // The second block reads as a modifier of the first one.
                    write!(f, "{left} {{ {right} }}")
                }
                _ => write!(f, "{left} {right}"),
            },
            Self::LeftJoin {
                left,
                right,
                expression,
            } => {
                if let Some(expr) = expression {
                    write!(f, "{left} OPTIONAL {{ {right} FILTER({expr}) }}")
                } else {
                    write!(f, "{left} OPTIONAL {{ {right} }}")
                }
            }
            Self::Filter { expr, inner } => {
                write!(f, "{inner} FILTER({expr})")
            }
            Self::Union { left, right } => write!(f, "{{ {left} }} UNION {{ {right} }}"),
            Self::Graph { name, inner } => {
                write!(f, "GRAPH {name} {{ {inner} }}")
            }
            Self::Extend {
                inner,
                variable,
                expression,
            } => write!(f, "{inner} BIND({expression} AS {variable})"),
            Self::Minus { left, right } => write!(f, "{left} MINUS {{ {right} }}"),
            Self::Service {
                name,
                inner,
                silent,
            } => {
                if *silent {
                    write!(f, "SERVICE SILENT {name} {{ {inner} }}")
                } else {
                    write!(f, "SERVICE {name} {{ {inner} }}")
                }
            }
            Self::Values {
                variables,
                bindings,
            } => {
                f.write_str("VALUES ( ")?;
                for var in variables {
                    write!(f, "{var} ")?;
                }
                f.write_str(") { ")?;
                for row in bindings {
                    f.write_str("( ")?;
                    for value in row {
                        match value {
                            Some(value) => write!(f, "{value} "),
                            None => f.write_str("UNDEF "),
                        }?;
                    }
                    f.write_str(") ")?;
                }
                f.write_str("}")
            }
            Self::Group {
                inner,
                variables,
                aggregates,
            } => {
                f.write_str("{ SELECT")?;
                for (variable, aggregate) in aggregates {
                    write!(f, " ({aggregate} AS {variable})")?;
                }
                for variable in variables {
                    write!(f, " {variable}")?;
                }
                write!(f, " WHERE {{ {inner} }}")?;
                if !variables.is_empty() {
                    f.write_str(" GROUP BY")?;
                    for variable in variables {
                        write!(f, " {variable}")?;
                    }
                }
                f.write_str(" }")
            }
            pattern => write!(f, "{{ {} }}", SelectProjection(pattern)),
        }
    }
}

/// Prints a solution-modifier pattern stack as a full `SELECT`.
pub(crate) struct SelectProjection<'a>(pub &'a GraphPattern);

impl fmt::Display for SelectProjection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut distinct = false;
        let mut reduced = false;
        let mut order: Option<&[OrderExpression]> = None;
        let mut start = 0;
        let mut length = None;
        let mut project: &[Variable] = &[];

        let mut child = self.0;
        loop {
            match child {
                GraphPattern::OrderBy { inner, expression } => {
                    order = Some(expression);
                    child = inner;
                }
                GraphPattern::Project { inner, variables } if project.is_empty() => {
                    project = variables;
                    child = inner;
                }
                GraphPattern::Distinct { inner } => {
                    distinct = true;
                    child = inner;
                }
                GraphPattern::Reduced { inner } => {
                    reduced = true;
                    child = inner;
                }
                GraphPattern::Slice {
                    inner,
                    start: s,
                    length: l,
                } => {
                    start = *s;
                    length = *l;
                    child = inner;
                }
                pattern => {
                    f.write_str("SELECT")?;
                    if distinct {
                        f.write_str(" DISTINCT")?;
                    }
                    if reduced {
                        f.write_str(" REDUCED")?;
                    }
                    if project.is_empty() {
                        f.write_str(" *")?;
                    } else {
                        for variable in project {
                            write!(f, " {variable}")?;
                        }
                    }
                    write!(f, " WHERE {{ {pattern} }}")?;
                    if let Some(order) = order {
                        f.write_str(" ORDER BY")?;
                        for condition in order {
                            write!(f, " {condition}")?;
                        }
                    }
                    if start > 0 {
                        write!(f, " OFFSET {start}")?;
                    }
                    if let Some(length) = length {
                        write!(f, " LIMIT {length}")?;
                    }
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::NamedNode;

    #[test]
    fn in_scope_variables_are_ordered() {
        let pattern = GraphPattern::Extend {
            inner: Box::new(GraphPattern::Bgp {
                patterns: vec![TriplePattern::new(
                    Variable::new_unchecked("s"),
                    NamedNode::new_unchecked("http://example.com/p"),
                    Variable::new_unchecked("o"),
                )],
            }),
            variable: Variable::new_unchecked("x"),
            expression: Expression::Variable(Variable::new_unchecked("o")),
        };
        assert_eq!(
            pattern.in_scope_variables(),
            [
                Variable::new_unchecked("s"),
                Variable::new_unchecked("o"),
                Variable::new_unchecked("x")
            ]
        );
    }

    #[test]
    fn minus_right_side_is_not_in_scope() {
        let left = GraphPattern::Bgp {
            patterns: vec![TriplePattern::new(
                Variable::new_unchecked("s"),
                NamedNode::new_unchecked("http://example.com/p"),
                Variable::new_unchecked("o"),
            )],
        };
        let right = GraphPattern::Bgp {
            patterns: vec![TriplePattern::new(
                Variable::new_unchecked("s"),
                NamedNode::new_unchecked("http://example.com/q"),
                Variable::new_unchecked("hidden"),
            )],
        };
        let pattern = GraphPattern::Minus {
            left: Box::new(left),
            right: Box::new(right),
        };
        assert!(!pattern
            .in_scope_variables()
            .contains(&Variable::new_unchecked("hidden")));
    }
}
