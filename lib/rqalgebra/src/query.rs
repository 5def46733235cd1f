//! [SPARQL query](https://www.w3.org/TR/sparql11-query/) data model.

use crate::algebra::{GraphPattern, SelectProjection};
use crate::parser::{QueryParser, SyntaxError};
use crate::term::TriplePattern;
use oxiri::Iri;
use rqrdf::NamedNode;
use std::fmt;
use std::str::FromStr;

/// A parsed [SPARQL query](https://www.w3.org/TR/sparql11-query/).
///
/// ```
/// use rqalgebra::Query;
///
/// let query = Query::parse("SELECT ?s WHERE { ?s ?p ?o }", None)?;
/// assert!(matches!(query, Query::Select { .. }));
/// # Result::<_, rqalgebra::SyntaxError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Query {
    /// [SELECT](https://www.w3.org/TR/sparql11-query/#select).
    Select {
        /// The [query dataset specification](https://www.w3.org/TR/sparql11-query/#specifyingDataset).
        dataset: Option<QueryDataset>,
        /// The query selection graph pattern.
        pattern: GraphPattern,
        /// The query base IRI.
        base_iri: Option<Iri<String>>,
    },
    /// [ASK](https://www.w3.org/TR/sparql11-query/#ask).
    Ask {
        dataset: Option<QueryDataset>,
        pattern: GraphPattern,
        base_iri: Option<Iri<String>>,
    },
    /// [CONSTRUCT](https://www.w3.org/TR/sparql11-query/#construct).
    Construct {
        /// The triples that are built from the solutions.
        template: Vec<TriplePattern>,
        dataset: Option<QueryDataset>,
        pattern: GraphPattern,
        base_iri: Option<Iri<String>>,
    },
}

impl Query {
    /// Parses a query string, with an optional base IRI to resolve relative
    /// IRIs against.
    pub fn parse(query: &str, base_iri: Option<&str>) -> Result<Self, SyntaxError> {
        QueryParser::new(query, base_iri)?.parse_query()
    }

    /// The query graph pattern.
    #[inline]
    pub fn pattern(&self) -> &GraphPattern {
        match self {
            Self::Select { pattern, .. }
            | Self::Ask { pattern, .. }
            | Self::Construct { pattern, .. } => pattern,
        }
    }

    #[inline]
    pub fn pattern_mut(&mut self) -> &mut GraphPattern {
        match self {
            Self::Select { pattern, .. }
            | Self::Ask { pattern, .. }
            | Self::Construct { pattern, .. } => pattern,
        }
    }

    /// The dataset specification from `FROM` and `FROM NAMED` clauses, if any.
    #[inline]
    pub fn dataset(&self) -> Option<&QueryDataset> {
        match self {
            Self::Select { dataset, .. }
            | Self::Ask { dataset, .. }
            | Self::Construct { dataset, .. } => dataset.as_ref(),
        }
    }

    /// The query base IRI, if any.
    #[inline]
    pub fn base_iri(&self) -> Option<&Iri<String>> {
        match self {
            Self::Select { base_iri, .. }
            | Self::Ask { base_iri, .. }
            | Self::Construct { base_iri, .. } => base_iri.as_ref(),
        }
    }
}

impl FromStr for Query {
    type Err = SyntaxError;

    fn from_str(query: &str) -> Result<Self, Self::Err> {
        Self::parse(query, None)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select {
                dataset,
                pattern,
                base_iri,
            } => {
                if let Some(base_iri) = base_iri {
                    writeln!(f, "BASE <{base_iri}>")?;
                }
                write_dataset(dataset.as_ref(), f)?;
                SelectProjection(pattern).fmt(f)
            }
            Self::Ask {
                dataset,
                pattern,
                base_iri,
            } => {
                if let Some(base_iri) = base_iri {
                    writeln!(f, "BASE <{base_iri}>")?;
                }
                f.write_str("ASK")?;
                write_dataset(dataset.as_ref(), f)?;
                write!(f, " WHERE {{ {pattern} }}")
            }
            Self::Construct {
                template,
                dataset,
                pattern,
                base_iri,
            } => {
                if let Some(base_iri) = base_iri {
                    writeln!(f, "BASE <{base_iri}>")?;
                }
                f.write_str("CONSTRUCT { ")?;
                for triple in template {
                    write!(f, "{triple} . ")?;
                }
                f.write_str("}")?;
                write_dataset(dataset.as_ref(), f)?;
                write!(f, " WHERE {{ {pattern} }}")
            }
        }
    }
}

fn write_dataset(dataset: Option<&QueryDataset>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(dataset) = dataset {
        for graph in &dataset.default {
            write!(f, " FROM {graph}")?;
        }
        for graph in &dataset.named {
            write!(f, " FROM NAMED {graph}")?;
        }
    }
    Ok(())
}

/// The [dataset specification](https://www.w3.org/TR/sparql11-query/#specifyingDataset)
/// carried by `FROM` and `FROM NAMED` clauses.
///
/// The engine evaluates against the dataset it is handed; this record is
/// kept for callers that assemble the dataset themselves.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct QueryDataset {
    /// Graphs merged into the default graph.
    pub default: Vec<NamedNode>,
    /// Graphs available for `GRAPH` matching.
    pub named: Vec<NamedNode>,
}

impl QueryDataset {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.default.is_empty() && self.named.is_empty()
    }
}
