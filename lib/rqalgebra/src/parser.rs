//! A recursive-descent parser for the
//! [SPARQL 1.1 query grammar](https://www.w3.org/TR/sparql11-query/#grammar),
//! producing the [`GraphPattern`] algebra directly.
//!
//! Property paths, RDF collections and SPARQL-star are not part of the
//! accepted grammar.

use crate::algebra::GraphPattern;
use crate::expression::{AggregateExpression, AggregateFunction, Expression, Function, OrderExpression};
use crate::query::{Query, QueryDataset};
use crate::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
use oxiri::Iri;
use rqrdf::vocab::{rdf, xsd};
use rqrdf::{BlankNode, Literal, NamedNode, Variable};
use std::collections::HashMap;
use std::fmt;

/// An error raised while parsing a query string, with its position.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    message: String,
    line: usize,
    column: usize,
}

impl SyntaxError {
    /// The 1-based line of the error.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based column of the error.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }
}

pub(crate) struct QueryParser<'a> {
    input: &'a str,
    position: usize,
    base_iri: Option<Iri<String>>,
    prefixes: HashMap<String, String>,
    /// Aggregates hoisted out of the projection/`HAVING`/`ORDER BY` of the
    /// select level currently being parsed. `None` when aggregates are not
    /// allowed (inside `WHERE`).
    aggregates: Option<Vec<(Variable, AggregateExpression)>>,
    synthetic_counter: usize,
}

enum Selection {
    Star,
    Items(Vec<(Option<Expression>, Variable)>),
}

enum GroupCondition {
    Variable(Variable),
    Expression(Expression, Option<Variable>),
}

struct SolutionModifier {
    group_by: Option<Vec<GroupCondition>>,
    having: Vec<Expression>,
    order_by: Option<Vec<OrderExpression>>,
    offset: usize,
    limit: Option<usize>,
}

impl<'a> QueryParser<'a> {
    pub fn new(input: &'a str, base_iri: Option<&str>) -> Result<Self, SyntaxError> {
        let base_iri = match base_iri {
            Some(base) => Some(Iri::parse(base.to_owned()).map_err(|e| SyntaxError {
                message: format!("invalid base IRI: {e}"),
                line: 1,
                column: 1,
            })?),
            None => None,
        };
        Ok(Self {
            input,
            position: 0,
            base_iri,
            prefixes: HashMap::new(),
            aggregates: None,
            synthetic_counter: 0,
        })
    }

    pub fn parse_query(mut self) -> Result<Query, SyntaxError> {
        self.parse_prologue()?;
        let query = if self.peek_keyword("SELECT") {
            self.parse_select_query()?
        } else if self.eat_keyword("ASK") {
            self.parse_ask_query()?
        } else if self.eat_keyword("CONSTRUCT") {
            self.parse_construct_query()?
        } else {
            return Err(self.error("SELECT, ASK or CONSTRUCT expected"));
        };
        self.skip_whitespace();
        if self.position < self.input.len() {
            return Err(self.error("unexpected content after the end of the query"));
        }
        Ok(query)
    }

    fn parse_prologue(&mut self) -> Result<(), SyntaxError> {
        loop {
            if self.eat_keyword("BASE") {
                let iri = self.parse_iri_ref()?;
                self.base_iri =
                    Some(Iri::parse(iri.into_string()).map_err(|e| {
                        self.error(format!("the base is not a valid IRI: {e}"))
                    })?);
            } else if self.eat_keyword("PREFIX") {
                self.skip_whitespace();
                let start = self.position;
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
                {
                    self.bump();
                }
                let prefix = self.input[start..self.position].to_owned();
                self.expect_char(':')?;
                let iri = self.parse_iri_ref()?;
                self.prefixes.insert(prefix, iri.into_string());
            } else {
                return Ok(());
            }
        }
    }

    fn parse_select_query(&mut self) -> Result<Query, SyntaxError> {
        let (pattern, dataset) = self.parse_select_like(true)?;
        Ok(Query::Select {
            dataset,
            pattern,
            base_iri: self.base_iri.clone(),
        })
    }

    /// Parses a `SELECT` query or sub-query. The aggregate frame of this
    /// select level is active while its projection, `HAVING` and `ORDER BY`
    /// expressions parse, and inactive inside `WHERE`.
    fn parse_select_like(
        &mut self,
        top_level: bool,
    ) -> Result<(GraphPattern, Option<QueryDataset>), SyntaxError> {
        let outer_frame = self.aggregates.replace(Vec::new());
        let (selection, distinct, reduced) = self.parse_select_clause_header()?;
        let dataset = if top_level {
            self.parse_dataset_clauses()?
        } else {
            None
        };
        let frame = self.aggregates.take();
        let pattern = self.parse_where_clause()?;
        self.aggregates = frame;
        let pattern = self.parse_modifiers_and_assemble(selection, distinct, reduced, pattern)?;
        self.aggregates = outer_frame;
        Ok((pattern, dataset))
    }

    #[allow(clippy::type_complexity)]
    fn parse_select_clause_header(
        &mut self,
    ) -> Result<(Selection, bool, bool), SyntaxError> {
        self.expect_keyword("SELECT")?;
        let distinct = self.eat_keyword("DISTINCT");
        let reduced = !distinct && self.eat_keyword("REDUCED");
        let selection = self.parse_selection()?;
        Ok((selection, distinct, reduced))
    }

    fn parse_selection(&mut self) -> Result<Selection, SyntaxError> {
        self.skip_whitespace();
        if self.eat_char('*') {
            return Ok(Selection::Star);
        }
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some('?' | '$') => items.push((None, self.parse_variable()?)),
                Some('(') => {
                    self.bump();
                    let expression = self.parse_expression_with_aggregates()?;
                    self.expect_keyword("AS")?;
                    let variable = self.parse_variable()?;
                    self.expect_char(')')?;
                    items.push((Some(expression), variable));
                }
                _ => break,
            }
        }
        if items.is_empty() {
            return Err(self.error("the SELECT projection cannot be empty"));
        }
        Ok(Selection::Items(items))
    }

    fn parse_dataset_clauses(&mut self) -> Result<Option<QueryDataset>, SyntaxError> {
        let mut dataset = QueryDataset::default();
        while self.eat_keyword("FROM") {
            if self.eat_keyword("NAMED") {
                dataset.named.push(self.parse_iri()?);
            } else {
                dataset.default.push(self.parse_iri()?);
            }
        }
        Ok(if dataset.is_empty() {
            None
        } else {
            Some(dataset)
        })
    }

    fn parse_where_clause(&mut self) -> Result<GraphPattern, SyntaxError> {
        self.eat_keyword("WHERE");
        self.parse_group_graph_pattern()
    }

    fn parse_ask_query(&mut self) -> Result<Query, SyntaxError> {
        let dataset = self.parse_dataset_clauses()?;
        let pattern = self.parse_where_clause()?;
        let modifier = self.parse_solution_modifier()?;
        let pattern = self.apply_plain_modifiers(pattern, modifier)?;
        Ok(Query::Ask {
            dataset,
            pattern,
            base_iri: self.base_iri.clone(),
        })
    }

    fn parse_construct_query(&mut self) -> Result<Query, SyntaxError> {
        let template = self.parse_construct_template()?;
        let dataset = self.parse_dataset_clauses()?;
        let pattern = self.parse_where_clause()?;
        let modifier = self.parse_solution_modifier()?;
        let pattern = self.apply_plain_modifiers(pattern, modifier)?;
        Ok(Query::Construct {
            template,
            dataset,
            pattern,
            base_iri: self.base_iri.clone(),
        })
    }

    fn parse_construct_template(&mut self) -> Result<Vec<TriplePattern>, SyntaxError> {
        self.expect_char('{')?;
        let mut template = Vec::new();
        self.skip_whitespace();
        if self.peek_char() != Some('}') {
            self.parse_triples_block(&mut template)?;
        }
        self.expect_char('}')?;
        Ok(template)
    }

    /// Applies modifiers that make sense without a projection (`ASK`,
    /// `CONSTRUCT`): grouping is rejected, ordering and slicing wrap.
    fn apply_plain_modifiers(
        &mut self,
        mut pattern: GraphPattern,
        modifier: SolutionModifier,
    ) -> Result<GraphPattern, SyntaxError> {
        if modifier.group_by.is_some() || !modifier.having.is_empty() {
            return Err(self.error("GROUP BY is only allowed on SELECT queries"));
        }
        if let Some(values) = self.parse_values_clause()? {
            pattern = join(pattern, values);
        }
        if let Some(expression) = modifier.order_by {
            pattern = GraphPattern::OrderBy {
                inner: Box::new(pattern),
                expression,
            };
        }
        if modifier.offset > 0 || modifier.limit.is_some() {
            pattern = GraphPattern::Slice {
                inner: Box::new(pattern),
                start: modifier.offset,
                length: modifier.limit,
            };
        }
        Ok(pattern)
    }

    fn parse_subselect(&mut self) -> Result<GraphPattern, SyntaxError> {
        Ok(self.parse_select_like(false)?.0)
    }

    /// Parses `GROUP BY`/`HAVING`/`ORDER BY`/`LIMIT`/`OFFSET`/`VALUES` and
    /// performs the
    /// [translation to the algebra](https://www.w3.org/TR/sparql11-query/#convertSolMod).
    fn parse_modifiers_and_assemble(
        &mut self,
        selection: Selection,
        distinct: bool,
        reduced: bool,
        mut pattern: GraphPattern,
    ) -> Result<GraphPattern, SyntaxError> {
        let modifier = self.parse_solution_modifier()?;
        let aggregates = self.aggregates.take().unwrap_or_default();
        let values = self.parse_values_clause()?;

        if let Some(values) = values {
            pattern = join(pattern, values);
        }

        let grouping = modifier.group_by.is_some()
            || !modifier.having.is_empty()
            || !aggregates.is_empty();
        if grouping {
            let mut group_variables = Vec::new();
            for condition in modifier.group_by.unwrap_or_default() {
                match condition {
                    GroupCondition::Variable(v) => group_variables.push(v),
                    GroupCondition::Expression(e, alias) => {
                        let variable = alias.unwrap_or_else(|| self.synthetic_variable());
                        pattern = GraphPattern::Extend {
                            inner: Box::new(pattern),
                            variable: variable.clone(),
                            expression: e,
                        };
                        group_variables.push(variable);
                    }
                }
            }
            pattern = GraphPattern::Group {
                inner: Box::new(pattern),
                variables: group_variables,
                aggregates,
            };
            for constraint in modifier.having {
                pattern = GraphPattern::Filter {
                    expr: constraint,
                    inner: Box::new(pattern),
                };
            }
        }

        let projection = match selection {
            Selection::Star => {
                if grouping {
                    return Err(self.error("SELECT * is not allowed with GROUP BY"));
                }
                pattern.in_scope_variables()
            }
            Selection::Items(items) => {
                let in_scope = pattern.in_scope_variables();
                let mut projection = Vec::new();
                for (expression, variable) in items {
                    if let Some(expression) = expression {
                        if in_scope.contains(&variable) || projection.contains(&variable) {
                            return Err(self.error(format!(
                                "the variable {variable} is already used before its SELECT binding"
                            )));
                        }
                        pattern = GraphPattern::Extend {
                            inner: Box::new(pattern),
                            variable: variable.clone(),
                            expression,
                        };
                    }
                    projection.push(variable);
                }
                projection
            }
        };

        if let Some(expression) = modifier.order_by {
            pattern = GraphPattern::OrderBy {
                inner: Box::new(pattern),
                expression,
            };
        }
        pattern = GraphPattern::Project {
            inner: Box::new(pattern),
            variables: projection,
        };
        if distinct {
            pattern = GraphPattern::Distinct {
                inner: Box::new(pattern),
            };
        }
        if reduced {
            pattern = GraphPattern::Reduced {
                inner: Box::new(pattern),
            };
        }
        if modifier.offset > 0 || modifier.limit.is_some() {
            pattern = GraphPattern::Slice {
                inner: Box::new(pattern),
                start: modifier.offset,
                length: modifier.limit,
            };
        }
        Ok(pattern)
    }

    fn parse_solution_modifier(&mut self) -> Result<SolutionModifier, SyntaxError> {
        let group_by = if self.eat_keyword("GROUP") {
            self.expect_keyword("BY")?;
            let mut conditions = Vec::new();
            loop {
                self.skip_whitespace();
                match self.peek_char() {
                    Some('?' | '$') => {
                        conditions.push(GroupCondition::Variable(self.parse_variable()?));
                    }
                    Some('(') => {
                        self.bump();
                        let expression = self.parse_expression()?;
                        let alias = if self.eat_keyword("AS") {
                            Some(self.parse_variable()?)
                        } else {
                            None
                        };
                        self.expect_char(')')?;
                        conditions.push(GroupCondition::Expression(expression, alias));
                    }
                    _ => {
                        if conditions.is_empty() {
                            return Err(self.error("GROUP BY condition expected"));
                        }
                        break;
                    }
                }
            }
            Some(conditions)
        } else {
            None
        };
        let mut having = Vec::new();
        if self.eat_keyword("HAVING") {
            loop {
                having.push(self.parse_constraint_with_aggregates()?);
                self.skip_whitespace();
                if self.peek_char() == Some('(') || self.at_built_in_call() {
                    continue;
                }
                break;
            }
        }
        let order_by = if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            let mut conditions = Vec::new();
            loop {
                if self.eat_keyword("ASC") {
                    self.expect_char('(')?;
                    let e = self.parse_expression_with_aggregates()?;
                    self.expect_char(')')?;
                    conditions.push(OrderExpression::Asc(e));
                } else if self.eat_keyword("DESC") {
                    self.expect_char('(')?;
                    let e = self.parse_expression_with_aggregates()?;
                    self.expect_char(')')?;
                    conditions.push(OrderExpression::Desc(e));
                } else {
                    self.skip_whitespace();
                    match self.peek_char() {
                        Some('?' | '$') => conditions
                            .push(OrderExpression::Asc(self.parse_variable()?.into())),
                        Some('(') => {
                            self.bump();
                            let e = self.parse_expression_with_aggregates()?;
                            self.expect_char(')')?;
                            conditions.push(OrderExpression::Asc(e));
                        }
                        _ if self.at_built_in_call() => {
                            conditions
                                .push(OrderExpression::Asc(self.parse_built_in_call()?));
                        }
                        _ => {
                            if conditions.is_empty() {
                                return Err(self.error("ORDER BY condition expected"));
                            }
                            break;
                        }
                    }
                }
            }
            Some(conditions)
        } else {
            None
        };
        let mut offset = 0;
        let mut limit = None;
        loop {
            if self.eat_keyword("LIMIT") {
                limit = Some(self.parse_unsigned_integer()?);
            } else if self.eat_keyword("OFFSET") {
                offset = self.parse_unsigned_integer()?;
            } else {
                break;
            }
        }
        Ok(SolutionModifier {
            group_by,
            having,
            order_by,
            offset,
            limit,
        })
    }

    fn parse_values_clause(&mut self) -> Result<Option<GraphPattern>, SyntaxError> {
        if self.eat_keyword("VALUES") {
            Ok(Some(self.parse_inline_data()?))
        } else {
            Ok(None)
        }
    }

    fn parse_inline_data(&mut self) -> Result<GraphPattern, SyntaxError> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('?' | '$') => {
                let variable = self.parse_variable()?;
                self.expect_char('{')?;
                let mut bindings = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.eat_char('}') {
                        break;
                    }
                    bindings.push(vec![self.parse_data_value()?]);
                }
                Ok(GraphPattern::Values {
                    variables: vec![variable],
                    bindings,
                })
            }
            Some('(') => {
                self.bump();
                let mut variables = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.eat_char(')') {
                        break;
                    }
                    variables.push(self.parse_variable()?);
                }
                self.expect_char('{')?;
                let mut bindings = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.eat_char('}') {
                        break;
                    }
                    self.expect_char('(')?;
                    let mut row = Vec::new();
                    for _ in 0..variables.len() {
                        row.push(self.parse_data_value()?);
                    }
                    self.expect_char(')')?;
                    bindings.push(row);
                }
                Ok(GraphPattern::Values {
                    variables,
                    bindings,
                })
            }
            _ => Err(self.error("VALUES variables expected")),
        }
    }

    fn parse_data_value(&mut self) -> Result<Option<GroundTerm>, SyntaxError> {
        self.skip_whitespace();
        if self.eat_keyword("UNDEF") {
            return Ok(None);
        }
        match self.peek_char() {
            Some('<') => Ok(Some(self.parse_iri()?.into())),
            Some('"' | '\'') => Ok(Some(self.parse_string_literal()?.into())),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => {
                Ok(Some(self.parse_numeric_literal()?.into()))
            }
            Some(c) if c == ':' || c.is_alphabetic() => {
                if let Some(literal) = self.try_parse_boolean() {
                    return Ok(Some(literal.into()));
                }
                Ok(Some(self.parse_iri()?.into()))
            }
            _ => Err(self.error("VALUES data term expected")),
        }
    }

    // --- group graph patterns ---

    fn parse_group_graph_pattern(&mut self) -> Result<GraphPattern, SyntaxError> {
        self.expect_char('{')?;
        if self.peek_keyword("SELECT") {
            let subselect = self.parse_subselect()?;
            self.expect_char('}')?;
            return Ok(subselect);
        }
        let mut pattern: Option<GraphPattern> = None;
        let mut bgp: Vec<TriplePattern> = Vec::new();
        let mut filters: Vec<Expression> = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                None => return Err(self.error("unexpected end of query, '}' expected")),
                Some('}') => {
                    self.bump();
                    break;
                }
                Some('.') => {
                    self.bump();
                }
                Some('{') => {
                    flush_bgp(&mut pattern, &mut bgp);
                    let mut union = self.parse_group_graph_pattern()?;
                    while self.eat_keyword("UNION") {
                        let right = self.parse_group_graph_pattern()?;
                        union = GraphPattern::Union {
                            left: Box::new(union),
                            right: Box::new(right),
                        };
                    }
                    pattern = Some(join_option(pattern, union));
                }
                _ => {
                    if self.eat_keyword("FILTER") {
                        filters.push(self.parse_constraint()?);
                    } else if self.eat_keyword("OPTIONAL") {
                        flush_bgp(&mut pattern, &mut bgp);
                        let right = self.parse_group_graph_pattern()?;
                        let left = pattern.take().unwrap_or_default();
                        pattern = Some(if let GraphPattern::Filter { expr, inner } = right {
                            GraphPattern::LeftJoin {
                                left: Box::new(left),
                                right: inner,
                                expression: Some(expr),
                            }
                        } else {
                            GraphPattern::LeftJoin {
                                left: Box::new(left),
                                right: Box::new(right),
                                expression: None,
                            }
                        });
                    } else if self.eat_keyword("MINUS") {
                        flush_bgp(&mut pattern, &mut bgp);
                        let right = self.parse_group_graph_pattern()?;
                        let left = pattern.take().unwrap_or_default();
                        pattern = Some(GraphPattern::Minus {
                            left: Box::new(left),
                            right: Box::new(right),
                        });
                    } else if self.eat_keyword("BIND") {
                        self.expect_char('(')?;
                        let expression = self.parse_expression()?;
                        self.expect_keyword("AS")?;
                        let variable = self.parse_variable()?;
                        self.expect_char(')')?;
                        flush_bgp(&mut pattern, &mut bgp);
                        let inner = pattern.take().unwrap_or_default();
                        if inner.in_scope_variables().contains(&variable) {
                            return Err(self.error(format!(
                                "BIND variable {variable} already used in the group"
                            )));
                        }
                        pattern = Some(GraphPattern::Extend {
                            inner: Box::new(inner),
                            variable,
                            expression,
                        });
                    } else if self.eat_keyword("GRAPH") {
                        let name = self.parse_variable_or_iri()?;
                        let inner = self.parse_group_graph_pattern()?;
                        flush_bgp(&mut pattern, &mut bgp);
                        pattern = Some(join_option(
                            pattern,
                            GraphPattern::Graph {
                                name,
                                inner: Box::new(inner),
                            },
                        ));
                    } else if self.eat_keyword("SERVICE") {
                        let silent = self.eat_keyword("SILENT");
                        let name = self.parse_variable_or_iri()?;
                        let inner = self.parse_group_graph_pattern()?;
                        flush_bgp(&mut pattern, &mut bgp);
                        pattern = Some(join_option(
                            pattern,
                            GraphPattern::Service {
                                name,
                                inner: Box::new(inner),
                                silent,
                            },
                        ));
                    } else if self.eat_keyword("VALUES") {
                        let values = self.parse_inline_data()?;
                        flush_bgp(&mut pattern, &mut bgp);
                        pattern = Some(join_option(pattern, values));
                    } else {
                        self.parse_triples_block(&mut bgp)?;
                    }
                }
            }
        }
        flush_bgp(&mut pattern, &mut bgp);
        let mut pattern = pattern.unwrap_or_default();
        // Filters of a group apply to the whole group.
        if let Some(expr) = filters.into_iter().reduce(|a, b| {
            Expression::And(Box::new(a), Box::new(b))
        }) {
            pattern = GraphPattern::Filter {
                expr,
                inner: Box::new(pattern),
            };
        }
        Ok(pattern)
    }

    fn parse_variable_or_iri(&mut self) -> Result<NamedNodePattern, SyntaxError> {
        self.skip_whitespace();
        if matches!(self.peek_char(), Some('?' | '$')) {
            Ok(self.parse_variable()?.into())
        } else {
            Ok(self.parse_iri()?.into())
        }
    }

    // --- triples ---

    fn parse_triples_block(
        &mut self,
        triples: &mut Vec<TriplePattern>,
    ) -> Result<(), SyntaxError> {
        loop {
            self.parse_triples_same_subject(triples)?;
            self.skip_whitespace();
            if !self.eat_char('.') {
                return Ok(());
            }
            self.skip_whitespace();
            if !self.at_triples_start() {
                return Ok(());
            }
        }
    }

    fn at_triples_start(&mut self) -> bool {
        self.skip_whitespace();
        match self.peek_char() {
            Some('?' | '$' | '<' | '[' | '"' | '\'' | '+' | '-' | ':') => true,
            Some('_') => self.rest().starts_with("_:"),
            Some(c) if c.is_ascii_digit() => true,
            Some(c) if c.is_alphabetic() => {
                // A prefixed name or a boolean literal, but not a clause keyword.
                !(self.peek_keyword("FILTER")
                    || self.peek_keyword("OPTIONAL")
                    || self.peek_keyword("MINUS")
                    || self.peek_keyword("BIND")
                    || self.peek_keyword("GRAPH")
                    || self.peek_keyword("SERVICE")
                    || self.peek_keyword("VALUES")
                    || self.peek_keyword("UNION"))
            }
            _ => false,
        }
    }

    fn parse_triples_same_subject(
        &mut self,
        triples: &mut Vec<TriplePattern>,
    ) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        if self.peek_char() == Some('[') {
            let subject = self.parse_blank_node_property_list(triples)?;
            // The property list after a blank node pattern may be empty.
            if self.at_verb_start() {
                self.parse_property_list(&subject, triples)?;
            }
            Ok(())
        } else {
            let subject = self.parse_term_pattern()?;
            self.parse_property_list(&subject, triples)
        }
    }

    fn parse_property_list(
        &mut self,
        subject: &TermPattern,
        triples: &mut Vec<TriplePattern>,
    ) -> Result<(), SyntaxError> {
        loop {
            let predicate = self.parse_verb()?;
            loop {
                self.skip_whitespace();
                let object = if self.peek_char() == Some('[') {
                    self.parse_blank_node_property_list(triples)?
                } else {
                    self.parse_term_pattern()?
                };
                triples.push(TriplePattern {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object,
                });
                self.skip_whitespace();
                if !self.eat_char(',') {
                    break;
                }
            }
            self.skip_whitespace();
            if !self.eat_char(';') {
                return Ok(());
            }
            self.skip_whitespace();
            // A dangling ';' before the closing '.' is allowed.
            if matches!(self.peek_char(), Some('.' | '}' | ']') | None) {
                return Ok(());
            }
        }
    }

    fn parse_blank_node_property_list(
        &mut self,
        triples: &mut Vec<TriplePattern>,
    ) -> Result<TermPattern, SyntaxError> {
        self.expect_char('[')?;
        let subject = TermPattern::BlankNode(BlankNode::default());
        self.skip_whitespace();
        if !self.eat_char(']') {
            self.parse_property_list(&subject, triples)?;
            self.expect_char(']')?;
        }
        Ok(subject)
    }

    fn at_verb_start(&mut self) -> bool {
        self.skip_whitespace();
        match self.peek_char() {
            Some('?' | '$' | '<' | ':') => true,
            Some(c) if c.is_alphabetic() => {
                !(self.peek_keyword("FILTER")
                    || self.peek_keyword("OPTIONAL")
                    || self.peek_keyword("MINUS")
                    || self.peek_keyword("BIND")
                    || self.peek_keyword("GRAPH")
                    || self.peek_keyword("SERVICE")
                    || self.peek_keyword("VALUES")
                    || self.peek_keyword("UNION"))
            }
            _ => false,
        }
    }

    fn parse_verb(&mut self) -> Result<NamedNodePattern, SyntaxError> {
        self.skip_whitespace();
        if matches!(self.peek_char(), Some('?' | '$')) {
            return Ok(self.parse_variable()?.into());
        }
        // The 'a' shortcut, unless it opens a prefixed name such as `a:b`.
        let rest = self.rest();
        if rest.starts_with('a')
            && !rest[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
        {
            self.position += 1;
            return Ok(NamedNode::from(rdf::TYPE).into());
        }
        Ok(self.parse_iri()?.into())
    }

    fn parse_term_pattern(&mut self) -> Result<TermPattern, SyntaxError> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('?' | '$') => Ok(self.parse_variable()?.into()),
            Some('<') => Ok(self.parse_iri()?.into()),
            Some('_') if self.rest().starts_with("_:") => {
                self.bump();
                self.bump();
                let start = self.position;
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
                {
                    self.bump();
                }
                let mut label = &self.input[start..self.position];
                while let Some(stripped) = label.strip_suffix('.') {
                    label = stripped;
                    self.position -= 1;
                }
                if label.is_empty() {
                    return Err(self.error("blank node label expected"));
                }
                Ok(TermPattern::BlankNode(BlankNode::new_unchecked(label)))
            }
            Some('"' | '\'') => Ok(self.parse_string_literal()?.into()),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => {
                Ok(self.parse_numeric_literal()?.into())
            }
            Some(c) if c == ':' || c.is_alphabetic() => {
                if let Some(literal) = self.try_parse_boolean() {
                    return Ok(literal.into());
                }
                Ok(self.parse_iri()?.into())
            }
            _ => Err(self.error("term expected")),
        }
    }

    // --- terms and literals ---

    fn parse_variable(&mut self) -> Result<Variable, SyntaxError> {
        self.skip_whitespace();
        if !matches!(self.peek_char(), Some('?' | '$')) {
            return Err(self.error("variable expected"));
        }
        self.bump();
        let start = self.position;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        Variable::new(&self.input[start..self.position])
            .map_err(|e| self.error(e.to_string()))
    }

    fn parse_iri(&mut self) -> Result<NamedNode, SyntaxError> {
        self.skip_whitespace();
        if self.peek_char() == Some('<') {
            self.parse_iri_ref()
        } else {
            self.parse_prefixed_name()
        }
    }

    fn parse_iri_ref(&mut self) -> Result<NamedNode, SyntaxError> {
        self.skip_whitespace();
        self.expect_char('<')?;
        let start = self.position;
        while let Some(c) = self.peek_char() {
            if c == '>' {
                break;
            }
            if c <= ' ' || matches!(c, '<' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') {
                return Err(self.error("invalid character in IRI"));
            }
            self.bump();
        }
        let iri = self.input[start..self.position].to_owned();
        self.expect_char('>')?;
        self.resolve_iri(&iri)
    }

    fn parse_prefixed_name(&mut self) -> Result<NamedNode, SyntaxError> {
        self.skip_whitespace();
        let start = self.position;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            self.bump();
        }
        let prefix = &self.input[start..self.position];
        if !self.eat_char(':') {
            return Err(self.error("prefixed name expected"));
        }
        let namespace = self
            .prefixes
            .get(prefix)
            .ok_or_else(|| self.error(format!("unknown prefix '{prefix}:'")))?
            .clone();
        let local_start = self.position;
        while self
            .peek_char()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '%' | ':'))
        {
            self.bump();
        }
        let mut local = &self.input[local_start..self.position];
        // A trailing dot terminates the statement, not the name.
        while let Some(stripped) = local.strip_suffix('.') {
            local = stripped;
            self.position -= 1;
        }
        self.resolve_iri(&format!("{namespace}{local}"))
    }

    fn resolve_iri(&self, iri: &str) -> Result<NamedNode, SyntaxError> {
        match &self.base_iri {
            Some(base) => base
                .resolve(iri)
                .map(|iri| NamedNode::new_unchecked(iri.into_inner()))
                .map_err(|e| self.error(format!("invalid IRI '{iri}': {e}"))),
            None => NamedNode::new(iri)
                .map_err(|e| self.error(format!("invalid IRI '{iri}': {e}"))),
        }
    }

    fn try_parse_boolean(&mut self) -> Option<Literal> {
        if self.eat_keyword("true") {
            Some(Literal::new_typed_literal("true", xsd::BOOLEAN))
        } else if self.eat_keyword("false") {
            Some(Literal::new_typed_literal("false", xsd::BOOLEAN))
        } else {
            None
        }
    }

    fn parse_string_literal(&mut self) -> Result<Literal, SyntaxError> {
        let value = self.parse_string()?;
        match self.peek_char() {
            Some('@') => {
                self.bump();
                let start = self.position;
                while self
                    .peek_char()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
                {
                    self.bump();
                }
                Literal::new_language_tagged_literal(value, &self.input[start..self.position])
                    .map_err(|e| self.error(e.to_string()))
            }
            Some('^') => {
                self.bump();
                self.expect_char('^')?;
                let datatype = self.parse_iri()?;
                Ok(Literal::new_typed_literal(value, datatype))
            }
            _ => Ok(Literal::new_simple_literal(value)),
        }
    }

    fn parse_string(&mut self) -> Result<String, SyntaxError> {
        self.skip_whitespace();
        let quote = match self.peek_char() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("string literal expected")),
        };
        let long = self.rest().starts_with(if quote == '"' {
            "\"\"\""
        } else {
            "'''"
        });
        self.position += if long { 3 } else { 1 };
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error("unterminated string literal")),
                Some('\\') => {
                    self.bump();
                    value.push(self.parse_string_escape()?);
                }
                Some(c) if c == quote => {
                    if long {
                        if self.rest().starts_with(if quote == '"' {
                            "\"\"\""
                        } else {
                            "'''"
                        }) {
                            self.position += 3;
                            return Ok(value);
                        }
                        self.bump();
                        value.push(c);
                    } else {
                        self.bump();
                        return Ok(value);
                    }
                }
                Some(c @ ('\n' | '\r')) if !long => {
                    let _ = c;
                    return Err(self.error("unterminated string literal"));
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    fn parse_string_escape(&mut self) -> Result<char, SyntaxError> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        Ok(match c {
            't' => '\t',
            'b' => '\u{08}',
            'n' => '\n',
            'r' => '\r',
            'f' => '\u{0C}',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            'u' | 'U' => {
                let size = if c == 'u' { 4 } else { 8 };
                let mut code = 0_u32;
                for _ in 0..size {
                    let digit = self
                        .bump()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| self.error("invalid unicode escape"))?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?
            }
            _ => return Err(self.error("invalid string escape")),
        })
    }

    fn parse_numeric_literal(&mut self) -> Result<Literal, SyntaxError> {
        self.skip_whitespace();
        let start = self.position;
        if matches!(self.peek_char(), Some('+' | '-')) {
            self.bump();
        }
        let mut has_digits = false;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            has_digits = true;
        }
        let mut decimal = false;
        if self.peek_char() == Some('.')
            && self.rest()[1..].chars().next().is_some_and(|c| c.is_ascii_digit())
        {
            self.bump();
            decimal = true;
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if !has_digits && !decimal {
            return Err(self.error("numeric literal expected"));
        }
        let mut double = false;
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mark = self.position;
            self.bump();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump();
            }
            if self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                double = true;
                while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.position = mark;
            }
        }
        let lexical = &self.input[start..self.position];
        Ok(if double {
            Literal::new_typed_literal(lexical, xsd::DOUBLE)
        } else if decimal {
            Literal::new_typed_literal(lexical, xsd::DECIMAL)
        } else {
            Literal::new_typed_literal(lexical, xsd::INTEGER)
        })
    }

    fn parse_unsigned_integer(&mut self) -> Result<usize, SyntaxError> {
        self.skip_whitespace();
        let start = self.position;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        self.input[start..self.position]
            .parse()
            .map_err(|_| self.error("integer expected"))
    }

    // --- expressions ---

    fn parse_constraint(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        if self.peek_char() == Some('(') {
            self.bump();
            let expression = self.parse_expression()?;
            self.expect_char(')')?;
            Ok(expression)
        } else {
            self.parse_primary_expression()
        }
    }

    fn parse_constraint_with_aggregates(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        if self.peek_char() == Some('(') {
            self.bump();
            let expression = self.parse_expression_with_aggregates()?;
            self.expect_char(')')?;
            Ok(expression)
        } else {
            self.parse_primary_expression()
        }
    }

    fn parse_expression_with_aggregates(&mut self) -> Result<Expression, SyntaxError> {
        // The aggregate frame stays as-is; aggregates parse when it is active.
        self.parse_expression()
    }

    fn parse_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_and_expression()?;
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("||") {
                self.position += 2;
                let right = self.parse_and_expression()?;
                expression = Expression::Or(Box::new(expression), Box::new(right));
            } else {
                return Ok(expression);
            }
        }
    }

    fn parse_and_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_relational_expression()?;
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("&&") {
                self.position += 2;
                let right = self.parse_relational_expression()?;
                expression = Expression::And(Box::new(expression), Box::new(right));
            } else {
                return Ok(expression);
            }
        }
    }

    fn parse_relational_expression(&mut self) -> Result<Expression, SyntaxError> {
        let expression = self.parse_additive_expression()?;
        self.skip_whitespace();
        let rest = self.rest();
        if rest.starts_with("!=") {
            self.position += 2;
            let right = self.parse_additive_expression()?;
            return Ok(Expression::Not(Box::new(Expression::Equal(
                Box::new(expression),
                Box::new(right),
            ))));
        }
        if rest.starts_with("<=") {
            self.position += 2;
            let right = self.parse_additive_expression()?;
            return Ok(Expression::LessOrEqual(Box::new(expression), Box::new(right)));
        }
        if rest.starts_with(">=") {
            self.position += 2;
            let right = self.parse_additive_expression()?;
            return Ok(Expression::GreaterOrEqual(
                Box::new(expression),
                Box::new(right),
            ));
        }
        match self.peek_char() {
            Some('=') => {
                self.bump();
                let right = self.parse_additive_expression()?;
                Ok(Expression::Equal(Box::new(expression), Box::new(right)))
            }
            Some('<') => {
                self.bump();
                let right = self.parse_additive_expression()?;
                Ok(Expression::Less(Box::new(expression), Box::new(right)))
            }
            Some('>') => {
                self.bump();
                let right = self.parse_additive_expression()?;
                Ok(Expression::Greater(Box::new(expression), Box::new(right)))
            }
            _ => {
                if self.eat_keyword("IN") {
                    let list = self.parse_expression_list()?;
                    Ok(Expression::In(Box::new(expression), list))
                } else if self.peek_keyword("NOT") {
                    let mark = self.position;
                    self.eat_keyword("NOT");
                    if self.eat_keyword("IN") {
                        let list = self.parse_expression_list()?;
                        Ok(Expression::Not(Box::new(Expression::In(
                            Box::new(expression),
                            list,
                        ))))
                    } else {
                        self.position = mark;
                        Ok(expression)
                    }
                } else {
                    Ok(expression)
                }
            }
        }
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expression>, SyntaxError> {
        self.expect_char('(')?;
        let mut list = Vec::new();
        self.skip_whitespace();
        if self.eat_char(')') {
            return Ok(list);
        }
        loop {
            list.push(self.parse_expression()?);
            self.skip_whitespace();
            if self.eat_char(',') {
                continue;
            }
            self.expect_char(')')?;
            return Ok(list);
        }
    }

    fn parse_additive_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_multiplicative_expression()?;
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some('+') => {
                    self.bump();
                    let right = self.parse_multiplicative_expression()?;
                    expression = Expression::Add(Box::new(expression), Box::new(right));
                }
                Some('-') => {
                    self.bump();
                    let right = self.parse_multiplicative_expression()?;
                    expression = Expression::Subtract(Box::new(expression), Box::new(right));
                }
                _ => return Ok(expression),
            }
        }
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression, SyntaxError> {
        let mut expression = self.parse_unary_expression()?;
        loop {
            self.skip_whitespace();
            match self.peek_char() {
                Some('*') => {
                    self.bump();
                    let right = self.parse_unary_expression()?;
                    expression = Expression::Multiply(Box::new(expression), Box::new(right));
                }
                Some('/') => {
                    self.bump();
                    let right = self.parse_unary_expression()?;
                    expression = Expression::Divide(Box::new(expression), Box::new(right));
                }
                _ => return Ok(expression),
            }
        }
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('!') if !self.rest().starts_with("!=") => {
                self.bump();
                Ok(Expression::Not(Box::new(self.parse_unary_expression()?)))
            }
            Some('+') if !self.at_numeric_literal_after_sign() => {
                self.bump();
                Ok(Expression::UnaryPlus(Box::new(
                    self.parse_unary_expression()?,
                )))
            }
            Some('-') if !self.at_numeric_literal_after_sign() => {
                self.bump();
                Ok(Expression::UnaryMinus(Box::new(
                    self.parse_unary_expression()?,
                )))
            }
            _ => self.parse_primary_expression(),
        }
    }

    fn at_numeric_literal_after_sign(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next();
        matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.')
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, SyntaxError> {
        self.skip_whitespace();
        match self.peek_char() {
            Some('(') => {
                self.bump();
                let expression = self.parse_expression()?;
                self.expect_char(')')?;
                Ok(expression)
            }
            Some('?' | '$') => Ok(self.parse_variable()?.into()),
            Some('"' | '\'') => Ok(self.parse_string_literal()?.into()),
            Some(c) if c.is_ascii_digit() => Ok(self.parse_numeric_literal()?.into()),
            Some('+' | '-') => Ok(self.parse_numeric_literal()?.into()),
            Some('<') => self.parse_iri_or_function_call(),
            Some(c) if c == ':' || c.is_alphabetic() => {
                if let Some(literal) = self.try_parse_boolean() {
                    return Ok(literal.into());
                }
                if self.at_built_in_call() || self.at_aggregate_call() {
                    self.parse_built_in_call()
                } else {
                    self.parse_iri_or_function_call()
                }
            }
            _ => Err(self.error("expression expected")),
        }
    }

    fn parse_iri_or_function_call(&mut self) -> Result<Expression, SyntaxError> {
        let iri = self.parse_iri()?;
        self.skip_whitespace();
        if self.peek_char() == Some('(') {
            let args = self.parse_expression_list()?;
            Ok(Expression::FunctionCall(Function::Custom(iri), args))
        } else {
            Ok(iri.into())
        }
    }

    fn at_built_in_call(&mut self) -> bool {
        const KEYWORDS: &[&str] = &[
            "STR", "LANG", "LANGMATCHES", "DATATYPE", "BOUND", "IRI", "URI", "BNODE", "RAND",
            "ABS", "CEIL", "FLOOR", "ROUND", "CONCAT", "SUBSTR", "STRLEN", "REPLACE", "UCASE",
            "LCASE", "ENCODE_FOR_URI", "CONTAINS", "STRSTARTS", "STRENDS", "STRBEFORE",
            "STRAFTER", "YEAR", "MONTH", "DAY", "HOURS", "MINUTES", "SECONDS", "TIMEZONE", "TZ",
            "NOW", "UUID", "STRUUID", "MD5", "SHA1", "SHA256", "SHA384", "SHA512", "COALESCE",
            "IF", "STRLANG", "STRDT", "SAMETERM", "ISIRI", "ISURI", "ISBLANK", "ISLITERAL",
            "ISNUMERIC", "REGEX", "EXISTS", "NOT",
        ];
        KEYWORDS.iter().any(|kw| self.peek_keyword(kw))
    }

    fn at_aggregate_call(&mut self) -> bool {
        const KEYWORDS: &[&str] = &[
            "COUNT", "SUM", "MIN", "MAX", "AVG", "SAMPLE", "GROUP_CONCAT",
        ];
        KEYWORDS.iter().any(|kw| self.peek_keyword(kw))
    }

    fn parse_built_in_call(&mut self) -> Result<Expression, SyntaxError> {
        if self.eat_keyword("BOUND") {
            self.expect_char('(')?;
            let variable = self.parse_variable()?;
            self.expect_char(')')?;
            return Ok(Expression::Bound(variable));
        }
        if self.eat_keyword("IF") {
            let mut args = self.parse_expression_list()?;
            if args.len() != 3 {
                return Err(self.error("IF takes three arguments"));
            }
            let else_branch = args.pop().unwrap_or_else(|| unreachable_expression());
            let then_branch = args.pop().unwrap_or_else(|| unreachable_expression());
            let condition = args.pop().unwrap_or_else(|| unreachable_expression());
            return Ok(Expression::If(
                Box::new(condition),
                Box::new(then_branch),
                Box::new(else_branch),
            ));
        }
        if self.eat_keyword("COALESCE") {
            return Ok(Expression::Coalesce(self.parse_expression_list()?));
        }
        if self.eat_keyword("SAMETERM") {
            let mut args = self.parse_expression_list()?;
            if args.len() != 2 {
                return Err(self.error("sameTerm takes two arguments"));
            }
            let b = args.pop().unwrap_or_else(|| unreachable_expression());
            let a = args.pop().unwrap_or_else(|| unreachable_expression());
            return Ok(Expression::SameTerm(Box::new(a), Box::new(b)));
        }
        if self.eat_keyword("EXISTS") {
            let pattern = self.parse_group_graph_pattern()?;
            return Ok(Expression::Exists(Box::new(pattern)));
        }
        if self.eat_keyword("NOT") {
            self.expect_keyword("EXISTS")?;
            let pattern = self.parse_group_graph_pattern()?;
            return Ok(Expression::Not(Box::new(Expression::Exists(Box::new(
                pattern,
            )))));
        }
        if self.at_aggregate_call() {
            return self.parse_aggregate_call();
        }
        let (function, min_args, max_args) = self.parse_function_name()?;
        let args = self.parse_expression_list()?;
        if args.len() < min_args || args.len() > max_args {
            return Err(self.error(format!("wrong number of arguments for {function}")));
        }
        Ok(Expression::FunctionCall(function, args))
    }

    #[allow(clippy::type_complexity)]
    fn parse_function_name(&mut self) -> Result<(Function, usize, usize), SyntaxError> {
        const TABLE: &[(&str, Function, usize, usize)] = &[
            ("STRLEN", Function::StrLen, 1, 1),
            ("STRLANG", Function::StrLang, 2, 2),
            ("STRDT", Function::StrDt, 2, 2),
            ("STRSTARTS", Function::StrStarts, 2, 2),
            ("STRENDS", Function::StrEnds, 2, 2),
            ("STRBEFORE", Function::StrBefore, 2, 2),
            ("STRAFTER", Function::StrAfter, 2, 2),
            ("STRUUID", Function::StrUuid, 0, 0),
            ("STR", Function::Str, 1, 1),
            ("LANGMATCHES", Function::LangMatches, 2, 2),
            ("LANG", Function::Lang, 1, 1),
            ("DATATYPE", Function::Datatype, 1, 1),
            ("IRI", Function::Iri, 1, 1),
            ("URI", Function::Iri, 1, 1),
            ("BNODE", Function::BNode, 0, 1),
            ("RAND", Function::Rand, 0, 0),
            ("ABS", Function::Abs, 1, 1),
            ("CEIL", Function::Ceil, 1, 1),
            ("FLOOR", Function::Floor, 1, 1),
            ("ROUND", Function::Round, 1, 1),
            ("CONCAT", Function::Concat, 0, usize::MAX),
            ("SUBSTR", Function::SubStr, 2, 3),
            ("REPLACE", Function::Replace, 3, 4),
            ("UCASE", Function::UCase, 1, 1),
            ("LCASE", Function::LCase, 1, 1),
            ("ENCODE_FOR_URI", Function::EncodeForUri, 1, 1),
            ("CONTAINS", Function::Contains, 2, 2),
            ("YEAR", Function::Year, 1, 1),
            ("MONTH", Function::Month, 1, 1),
            ("DAY", Function::Day, 1, 1),
            ("HOURS", Function::Hours, 1, 1),
            ("MINUTES", Function::Minutes, 1, 1),
            ("SECONDS", Function::Seconds, 1, 1),
            ("TIMEZONE", Function::Timezone, 1, 1),
            ("TZ", Function::Tz, 1, 1),
            ("NOW", Function::Now, 0, 0),
            ("UUID", Function::Uuid, 0, 0),
            ("MD5", Function::Md5, 1, 1),
            ("SHA1", Function::Sha1, 1, 1),
            ("SHA256", Function::Sha256, 1, 1),
            ("SHA384", Function::Sha384, 1, 1),
            ("SHA512", Function::Sha512, 1, 1),
            ("ISIRI", Function::IsIri, 1, 1),
            ("ISURI", Function::IsIri, 1, 1),
            ("ISBLANK", Function::IsBlank, 1, 1),
            ("ISLITERAL", Function::IsLiteral, 1, 1),
            ("ISNUMERIC", Function::IsNumeric, 1, 1),
            ("REGEX", Function::Regex, 2, 3),
        ];
        for (keyword, function, min_args, max_args) in TABLE {
            if self.eat_keyword(keyword) {
                return Ok((function.clone(), *min_args, *max_args));
            }
        }
        Err(self.error("unknown function"))
    }

    fn parse_aggregate_call(&mut self) -> Result<Expression, SyntaxError> {
        if self.aggregates.is_none() {
            return Err(self.error("aggregates are only allowed in SELECT, HAVING and ORDER BY"));
        }
        let aggregate = if self.eat_keyword("COUNT") {
            self.expect_char('(')?;
            let distinct = self.eat_keyword("DISTINCT");
            self.skip_whitespace();
            let aggregate = if self.eat_char('*') {
                AggregateExpression::CountSolutions { distinct }
            } else {
                let expr = self.parse_expression()?;
                AggregateExpression::FunctionCall {
                    name: AggregateFunction::Count,
                    expr,
                    distinct,
                }
            };
            self.expect_char(')')?;
            aggregate
        } else if self.eat_keyword("GROUP_CONCAT") {
            self.expect_char('(')?;
            let distinct = self.eat_keyword("DISTINCT");
            let expr = self.parse_expression()?;
            self.skip_whitespace();
            let separator = if self.eat_char(';') {
                self.expect_keyword("SEPARATOR")?;
                self.skip_whitespace();
                self.expect_char('=')?;
                Some(self.parse_string()?)
            } else {
                None
            };
            self.expect_char(')')?;
            AggregateExpression::FunctionCall {
                name: AggregateFunction::GroupConcat { separator },
                expr,
                distinct,
            }
        } else {
            let name = if self.eat_keyword("SUM") {
                AggregateFunction::Sum
            } else if self.eat_keyword("AVG") {
                AggregateFunction::Avg
            } else if self.eat_keyword("MIN") {
                AggregateFunction::Min
            } else if self.eat_keyword("MAX") {
                AggregateFunction::Max
            } else if self.eat_keyword("SAMPLE") {
                AggregateFunction::Sample
            } else {
                return Err(self.error("aggregate function expected"));
            };
            self.expect_char('(')?;
            let distinct = self.eat_keyword("DISTINCT");
            let expr = self.parse_expression()?;
            self.expect_char(')')?;
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            }
        };
        let variable = self.synthetic_variable();
        if let Some(aggregates) = &mut self.aggregates {
            aggregates.push((variable.clone(), aggregate));
        }
        Ok(variable.into())
    }

    fn synthetic_variable(&mut self) -> Variable {
        self.synthetic_counter += 1;
        // The leading space keeps it out of the user-variable namespace.
        Variable::new_unchecked(format!(" agg{}", self.synthetic_counter))
    }

    // --- low-level scanning ---

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.position += c.len_utf8();
        Some(c)
    }

    fn eat_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.position += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), SyntaxError> {
        self.skip_whitespace();
        if self.eat_char(expected) {
            Ok(())
        } else {
            Err(self.error(format!("'{expected}' expected")))
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn peek_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        rest.len() >= keyword.len()
            && rest.is_char_boundary(keyword.len())
            && rest[..keyword.len()].eq_ignore_ascii_case(keyword)
            && !rest[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.position += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SyntaxError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("'{keyword}' expected")))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let consumed = &self.input[..self.position];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit_once('\n')
            .map_or(consumed.chars().count(), |(_, tail)| tail.chars().count())
            + 1;
        SyntaxError {
            message: message.into(),
            line,
            column,
        }
    }
}

fn join(left: GraphPattern, right: GraphPattern) -> GraphPattern {
    GraphPattern::Join {
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn join_option(left: Option<GraphPattern>, right: GraphPattern) -> GraphPattern {
    match left {
        Some(left) => join(left, right),
        None => right,
    }
}

fn flush_bgp(pattern: &mut Option<GraphPattern>, bgp: &mut Vec<TriplePattern>) {
    if !bgp.is_empty() {
        let basic = GraphPattern::Bgp {
            patterns: std::mem::take(bgp),
        };
        *pattern = Some(join_option(pattern.take(), basic));
    }
}

fn unreachable_expression() -> Expression {
    Expression::Literal(Literal::new_simple_literal(""))
}

impl fmt::Debug for QueryParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParser")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    fn parse(query: &str) -> Query {
        Query::parse(query, None).unwrap()
    }

    #[test]
    fn select_star_expands_to_mentioned_variables() {
        let Query::Select { pattern, .. } = parse("SELECT * WHERE { ?s ?p ?o }") else {
            panic!("SELECT expected")
        };
        let GraphPattern::Project { variables, .. } = pattern else {
            panic!("projection expected")
        };
        assert_eq!(
            variables,
            [
                Variable::new_unchecked("s"),
                Variable::new_unchecked("p"),
                Variable::new_unchecked("o")
            ]
        );
    }

    #[test]
    fn optional_with_filter_becomes_left_join_expression() {
        let query = parse(
            "SELECT ?s WHERE { ?s <http://example.com/p> ?o OPTIONAL { ?s <http://example.com/q> ?v FILTER(?v > 1) } }",
        );
        let Query::Select { pattern, .. } = query else {
            panic!()
        };
        let GraphPattern::Project { inner, .. } = pattern else {
            panic!()
        };
        assert!(matches!(
            *inner,
            GraphPattern::LeftJoin {
                expression: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn bind_over_used_variable_is_rejected() {
        let result = Query::parse(
            "SELECT ?x WHERE { ?s ?p ?o . BIND(?o AS ?x) . BIND(1 AS ?x) }",
            None,
        );
        let error = result.unwrap_err();
        assert!(error.to_string().contains("?x"));
    }

    #[test]
    fn aggregates_are_hoisted() {
        let query = parse(
            "SELECT ?s (SUM(?o) AS ?total) WHERE { ?s <http://example.com/p> ?o } GROUP BY ?s",
        );
        let Query::Select { pattern, .. } = query else {
            panic!()
        };
        let GraphPattern::Project { inner, variables } = pattern else {
            panic!()
        };
        assert_eq!(
            variables,
            [
                Variable::new_unchecked("s"),
                Variable::new_unchecked("total")
            ]
        );
        let GraphPattern::Extend { inner, .. } = *inner else {
            panic!("extend for the aggregate alias expected")
        };
        assert!(matches!(*inner, GraphPattern::Group { .. }));
    }

    #[test]
    fn prefixes_and_a_keyword() {
        let query = parse(
            "PREFIX ex: <http://example.com/> SELECT ?s WHERE { ?s a ex:Thing }",
        );
        let Query::Select { pattern, .. } = query else {
            panic!()
        };
        let GraphPattern::Project { inner, .. } = pattern else {
            panic!()
        };
        let GraphPattern::Bgp { patterns } = *inner else {
            panic!()
        };
        assert_eq!(
            patterns[0].predicate,
            NamedNode::from(rdf::TYPE).into()
        );
        assert_eq!(
            patterns[0].object,
            NamedNode::new_unchecked("http://example.com/Thing").into()
        );
    }

    #[test]
    fn unknown_prefix_is_an_error() {
        assert!(Query::parse("SELECT ?s WHERE { ?s ex:p 1 }", None).is_err());
    }

    #[test]
    fn values_clause() {
        let query = parse(
            "SELECT ?x WHERE { VALUES (?x ?y) { (1 2) (UNDEF \"a\") } }",
        );
        let Query::Select { pattern, .. } = query else {
            panic!()
        };
        let GraphPattern::Project { inner, .. } = pattern else {
            panic!()
        };
        let GraphPattern::Values { bindings, .. } = *inner else {
            panic!("VALUES expected")
        };
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1][0], None);
    }

    #[test]
    fn syntax_error_has_location() {
        let error = Query::parse("SELECT ?s WHERE {\n  ?s ?p }", None).unwrap_err();
        assert_eq!(error.line(), 2);
    }
}
