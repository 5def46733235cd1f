//! The variable-use map: which variable is mentioned, bound or in scope in
//! which pattern node.
//!
//! Pattern nodes are numbered by an in-order walk of the tree; the map is
//! the diagnostic backbone of preparation (unused-variable warnings,
//! projection pruning).

use crate::algebra::GraphPattern;
use crate::expression::{AggregateExpression, Expression, OrderExpression};
use crate::term::NamedNodePattern;
use rqrdf::Variable;
use std::collections::HashMap;

/// The variable is referenced inside the pattern node.
pub const MENTIONED: u8 = 1;
/// The pattern node can bind the variable to a value.
pub const BOUND: u8 = 1 << 1;
/// The variable is visible at the pattern node.
pub const IN_SCOPE: u8 = 1 << 2;

/// A (variable × pattern) matrix of use flags.
#[derive(Debug, Clone, Default)]
pub struct UseMap {
    patterns: usize,
    entries: HashMap<(String, usize), u8>,
}

impl UseMap {
    /// Builds the map for a pattern tree, numbering the nodes in-order.
    pub fn build(pattern: &GraphPattern) -> Self {
        let mut map = Self::default();
        map.walk(pattern);
        map
    }

    /// The number of pattern nodes walked.
    pub fn pattern_count(&self) -> usize {
        self.patterns
    }

    /// The flags of a variable at a pattern node.
    pub fn flags(&self, variable: &Variable, pattern: usize) -> u8 {
        self.entries
            .get(&(variable.as_str().to_owned(), pattern))
            .copied()
            .unwrap_or(0)
    }

    /// Whether some pattern node can bind the variable.
    pub fn is_bound_somewhere(&self, variable: &Variable) -> bool {
        self.entries
            .iter()
            .any(|((name, _), flags)| name == variable.as_str() && flags & BOUND != 0)
    }

    /// The variables that are mentioned but bound nowhere, in name order.
    pub fn never_bound(&self) -> Vec<Variable> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
            .into_iter()
            .filter(|name| {
                !self
                    .entries
                    .iter()
                    .any(|((n, _), flags)| n == name && flags & BOUND != 0)
            })
            .map(Variable::new_unchecked)
            .collect()
    }

    fn mark(&mut self, variable: &Variable, pattern: usize, flags: u8) {
        *self
            .entries
            .entry((variable.as_str().to_owned(), pattern))
            .or_insert(0) |= flags;
    }

    fn next_index(&mut self) -> usize {
        let index = self.patterns;
        self.patterns += 1;
        index
    }

    fn walk(&mut self, pattern: &GraphPattern) -> usize {
        let index = self.next_index();
        match pattern {
            GraphPattern::Bgp { patterns } => {
                // A triple position both mentions and can bind.
                for triple in patterns {
                    let mut mark = |v: &Variable| {
                        self.mark(v, index, MENTIONED | BOUND);
                    };
                    triple.on_variables(&mut mark);
                }
            }
            GraphPattern::Join { left, right }
            | GraphPattern::Union { left, right }
            | GraphPattern::Minus { left, right } => {
                self.walk(left);
                self.walk(right);
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => {
                self.walk(left);
                self.walk(right);
                if let Some(expression) = expression {
                    self.mark_expression(expression, index);
                }
            }
            GraphPattern::Filter { expr, inner } => {
                self.mark_expression(expr, index);
                self.walk(inner);
            }
            GraphPattern::Graph { name, inner } => {
                if let NamedNodePattern::Variable(v) = name {
                    self.mark(v, index, MENTIONED | BOUND);
                }
                self.walk(inner);
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => {
                self.mark(variable, index, MENTIONED | BOUND);
                self.mark_expression(expression, index);
                self.walk(inner);
            }
            GraphPattern::Values { variables, .. } => {
                for variable in variables {
                    self.mark(variable, index, MENTIONED | BOUND);
                }
            }
            GraphPattern::OrderBy { inner, expression } => {
                for condition in expression {
                    match condition {
                        OrderExpression::Asc(e) | OrderExpression::Desc(e) => {
                            self.mark_expression(e, index);
                        }
                    }
                }
                self.walk(inner);
            }
            GraphPattern::Project { inner, variables } => {
                for variable in variables {
                    self.mark(variable, index, MENTIONED);
                }
                self.walk(inner);
            }
            GraphPattern::Distinct { inner }
            | GraphPattern::Reduced { inner }
            | GraphPattern::Slice { inner, .. } => {
                self.walk(inner);
            }
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => {
                for variable in variables {
                    self.mark(variable, index, MENTIONED | BOUND);
                }
                for (variable, aggregate) in aggregates {
                    self.mark(variable, index, MENTIONED | BOUND);
                    if let AggregateExpression::FunctionCall { expr, .. } = aggregate {
                        self.mark_expression(expr, index);
                    }
                }
                self.walk(inner);
            }
            GraphPattern::Service { name, inner, .. } => {
                if let NamedNodePattern::Variable(v) = name {
                    self.mark(v, index, MENTIONED);
                }
                self.walk(inner);
            }
        }
        for variable in pattern.in_scope_variables() {
            self.mark(&variable, index, IN_SCOPE);
        }
        index
    }

    fn mark_expression(&mut self, expression: &Expression, index: usize) {
        expression.on_variables(&mut |v| {
            self.mark(v, index, MENTIONED);
        });
        expression.on_exists_patterns(&mut |pattern| {
            self.walk(pattern);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TriplePattern;
    use rqrdf::NamedNode;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    fn example() -> GraphPattern {
        GraphPattern::Filter {
            expr: Expression::Greater(
                Box::new(var("o").into()),
                Box::new(var("threshold").into()),
            ),
            inner: Box::new(GraphPattern::Bgp {
                patterns: vec![TriplePattern::new(
                    var("s"),
                    NamedNode::new_unchecked("http://example.com/p"),
                    var("o"),
                )],
            }),
        }
    }

    #[test]
    fn triple_variables_are_bound_and_mentioned() {
        let map = UseMap::build(&example());
        assert_eq!(map.pattern_count(), 2);
        assert_eq!(map.flags(&var("s"), 1), MENTIONED | BOUND | IN_SCOPE);
        assert_eq!(map.flags(&var("s"), 0), IN_SCOPE);
    }

    #[test]
    fn filter_only_variables_are_never_bound() {
        let map = UseMap::build(&example());
        assert_eq!(map.flags(&var("threshold"), 0), MENTIONED);
        assert!(!map.is_bound_somewhere(&var("threshold")));
        assert!(map.is_bound_somewhere(&var("o")));
        assert_eq!(map.never_bound(), [var("threshold")]);
    }
}
