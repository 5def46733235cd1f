//! An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).

use crate::triple::{GraphName, NamedOrBlankNode, Quad, Term, Triple};
use crate::NamedNode;
use std::collections::HashSet;
use std::fmt;

/// An insertion-ordered, duplicate-free in-memory set of [`Quad`]s.
///
/// It is the bounded-document storage the query engine runs against when no
/// external store is plugged in. Pattern matching is a plain scan: this
/// container targets datasets loaded from a single document, not persistent
/// storage.
///
/// ```
/// use rqrdf::{Dataset, GraphName, NamedNode, Quad};
///
/// let mut dataset = Dataset::new();
/// let ex = NamedNode::new("http://example.com")?;
/// dataset.insert(Quad::new(
///     ex.clone(),
///     ex.clone(),
///     ex.clone(),
///     GraphName::DefaultGraph,
/// ));
///
/// let results: Vec<_> = dataset
///     .quads_for_pattern(None, Some(&ex), None, None)
///     .collect();
/// assert_eq!(1, results.len());
/// # Result::<_,Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct Dataset {
    quads: Vec<Quad>,
    seen: HashSet<Quad>,
}

impl Dataset {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of quads stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Adds a quad, returning `false` if it was already present.
    pub fn insert(&mut self, quad: impl Into<Quad>) -> bool {
        let quad = quad.into();
        if self.seen.insert(quad.clone()) {
            self.quads.push(quad);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn contains(&self, quad: &Quad) -> bool {
        self.seen.contains(quad)
    }

    /// Iterates over all quads in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// The quad at the given insertion position, used by scan cursors.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Quad> {
        self.quads.get(index)
    }

    /// Iterates over the quads compatible with the bound positions of a pattern.
    pub fn quads_for_pattern<'a>(
        &'a self,
        subject: Option<&'a NamedOrBlankNode>,
        predicate: Option<&'a NamedNode>,
        object: Option<&'a Term>,
        graph_name: Option<&'a GraphName>,
    ) -> impl Iterator<Item = &'a Quad> + 'a {
        self.quads.iter().filter(move |quad| {
            subject.is_none_or(|subject| quad.subject == *subject)
                && predicate.is_none_or(|predicate| quad.predicate == *predicate)
                && object.is_none_or(|object| quad.object == *object)
                && graph_name.is_none_or(|graph_name| quad.graph_name == *graph_name)
        })
    }

    /// Iterates over the distinct named graphs, in first-seen order.
    pub fn graph_names(&self) -> impl Iterator<Item = &GraphName> {
        let mut seen = HashSet::new();
        self.quads
            .iter()
            .filter_map(move |quad| match &quad.graph_name {
                GraphName::DefaultGraph => None,
                name => seen.insert(name).then_some(name),
            })
    }
}

impl Extend<Quad> for Dataset {
    fn extend<T: IntoIterator<Item = Quad>>(&mut self, iter: T) {
        for quad in iter {
            self.insert(quad);
        }
    }
}

impl FromIterator<Quad> for Dataset {
    fn from_iter<T: IntoIterator<Item = Quad>>(iter: T) -> Self {
        let mut dataset = Self::new();
        dataset.extend(iter);
        dataset
    }
}

impl FromIterator<Triple> for Dataset {
    fn from_iter<T: IntoIterator<Item = Triple>>(iter: T) -> Self {
        iter.into_iter().map(Quad::from).collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Quad;
    type IntoIter = std::slice::Iter<'a, Quad>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

impl fmt::Display for Dataset {
    /// N-Quads serialization, one quad per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in &self.quads {
            writeln!(f, "{quad}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;

    fn ex(suffix: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{suffix}"))
    }

    #[test]
    fn insert_deduplicates() {
        let mut dataset = Dataset::new();
        let quad = Quad::new(ex("s"), ex("p"), ex("o"), GraphName::DefaultGraph);
        assert!(dataset.insert(quad.clone()));
        assert!(!dataset.insert(quad));
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn pattern_matching() {
        let dataset: Dataset = [
            Quad::new(ex("s"), ex("p"), Literal::from(1), GraphName::DefaultGraph),
            Quad::new(ex("s"), ex("q"), Literal::from(2), ex("g")),
            Quad::new(ex("t"), ex("p"), Literal::from(3), ex("g")),
        ]
        .into_iter()
        .collect();

        let subject: NamedOrBlankNode = ex("s").into();
        assert_eq!(
            dataset
                .quads_for_pattern(Some(&subject), None, None, None)
                .count(),
            2
        );
        let graph: GraphName = ex("g").into();
        assert_eq!(
            dataset
                .quads_for_pattern(None, None, None, Some(&graph))
                .count(),
            2
        );
        assert_eq!(dataset.quads_for_pattern(None, None, None, None).count(), 3);
    }

    #[test]
    fn graph_names_are_distinct_and_ordered() {
        let dataset: Dataset = [
            Quad::new(ex("s"), ex("p"), Literal::from(1), ex("g1")),
            Quad::new(ex("s"), ex("q"), Literal::from(2), GraphName::DefaultGraph),
            Quad::new(ex("t"), ex("p"), Literal::from(3), ex("g2")),
            Quad::new(ex("u"), ex("p"), Literal::from(4), ex("g1")),
        ]
        .into_iter()
        .collect();
        let names: Vec<_> = dataset.graph_names().collect();
        assert_eq!(names, [&GraphName::from(ex("g1")), &GraphName::from(ex("g2"))]);
    }
}
