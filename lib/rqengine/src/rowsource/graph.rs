//! `GRAPH`: scoping the inner pattern to one named graph, or iterating all
//! named graphs when the graph name is a variable.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::RowSource;
use rqalgebra::NamedNodePattern;
use rqrdf::{GraphName, NamedOrBlankNode, Term};
use std::rc::Rc;

enum GraphSelector {
    /// A ground graph name: push it down once.
    Fixed(NamedOrBlankNode),
    /// A graph variable: iterate the dataset's named graphs and bind.
    Iterate {
        /// Column of the graph variable in the output row.
        column: usize,
        /// Whether the column is appended (not declared by the inner tree).
        appended: bool,
        graphs: Vec<NamedOrBlankNode>,
        next_graph: usize,
        started: bool,
    },
}

pub(crate) struct Graph {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    selector: GraphSelector,
    variables: Vec<usize>,
    emitted: usize,
}

impl Graph {
    pub fn new(
        mut inner: Box<dyn RowSource>,
        name: &NamedNodePattern,
        ctx: &Rc<EvalContext>,
    ) -> Result<Self, EvaluationError> {
        let mut variables = inner.variables().to_vec();
        let selector = match name {
            NamedNodePattern::NamedNode(node) => {
                let origin = NamedOrBlankNode::NamedNode(node.clone());
                inner.set_origin(Some(origin.clone()));
                GraphSelector::Fixed(origin)
            }
            NamedNodePattern::Variable(variable) => {
                let offset = super::named_offset(ctx, variable)?;
                let (column, appended) = match variables.iter().position(|&o| o == offset) {
                    Some(column) => (column, false),
                    None => {
                        variables.push(offset);
                        (variables.len() - 1, true)
                    }
                };
                let graphs = ctx
                    .dataset
                    .graph_names()
                    .filter_map(|name| match name {
                        GraphName::NamedNode(node) => {
                            Some(NamedOrBlankNode::NamedNode(node.clone()))
                        }
                        GraphName::BlankNode(node) => {
                            Some(NamedOrBlankNode::BlankNode(node.clone()))
                        }
                        GraphName::DefaultGraph => None,
                    })
                    .collect();
                GraphSelector::Iterate {
                    column,
                    appended,
                    graphs,
                    next_graph: 0,
                    started: false,
                }
            }
        };
        Ok(Self {
            ctx: Rc::clone(ctx),
            inner,
            selector,
            variables,
            emitted: 0,
        })
    }
}

impl RowSource for Graph {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ctx.limits.check()?;
        match &mut self.selector {
            GraphSelector::Fixed(_) => {
                let Some(mut row) = self.inner.read_row()? else {
                    return Ok(None);
                };
                row.offset = self.emitted;
                self.emitted += 1;
                Ok(Some(row))
            }
            GraphSelector::Iterate {
                column,
                appended,
                graphs,
                next_graph,
                started,
            } => {
                loop {
                    if !*started {
                        let Some(graph) = graphs.get(*next_graph) else {
                            return Ok(None);
                        };
                        self.inner.set_origin(Some(graph.clone()));
                        self.inner.reset()?;
                        *started = true;
                    }
                    if let Some(mut row) = self.inner.read_row()? {
                        let graph: Term = match graphs[*next_graph].clone() {
                            NamedOrBlankNode::NamedNode(node) => node.into(),
                            NamedOrBlankNode::BlankNode(node) => node.into(),
                        };
                        if *appended {
                            row.values.push(Some(graph));
                        } else {
                            // The graph variable also occurs inside: rows
                            // binding it to another graph do not survive.
                            match &row.values[*column] {
                                Some(bound) if *bound != graph => continue,
                                _ => row.values[*column] = Some(graph),
                            }
                        }
                        row.offset = self.emitted;
                        self.emitted += 1;
                        return Ok(Some(row));
                    }
                    *next_graph += 1;
                    *started = false;
                }
            }
        }
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        if let GraphSelector::Iterate {
            next_graph,
            started,
            ..
        } = &mut self.selector
        {
            *next_graph = 0;
            *started = false;
        }
        self.emitted = 0;
        self.inner.reset()
    }

    /// A `GRAPH` clause rebinds the origin itself, so an origin pushed from
    /// above does not cross it.
    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        let _ = origin;
        if let GraphSelector::Fixed(fixed) = &self.selector {
            self.inner.set_origin(Some(fixed.clone()));
        }
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}
