use rqrdf::{Term, Variable};
use std::fmt;
use std::sync::Arc;

/// One row of a `SELECT` result: a partial mapping from variables to terms.
///
/// The variable list is shared between all the solutions of a result
/// sequence; a `None` value is an unbound variable.
pub struct QuerySolution {
    variables: Arc<[Variable]>,
    values: Vec<Option<Term>>,
}

impl QuerySolution {
    /// The value bound to the given variable name, if any.
    ///
    /// The variable name must not carry the `?` or `$` marker.
    #[inline]
    pub fn get(&self, variable: &str) -> Option<&Term> {
        let index = self
            .variables
            .iter()
            .position(|v| v.as_str() == variable)?;
        self.value(index)
    }

    /// The value at the given projection index, if bound.
    #[inline]
    pub fn value(&self, index: usize) -> Option<&Term> {
        self.values.get(index)?.as_ref()
    }

    /// The number of projected variables, bound or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The projected variables, in projection order.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Iterates over the bound (variable, value) pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.variables
            .iter()
            .zip(&self.values)
            .filter_map(|(variable, value)| Some((variable, value.as_ref()?)))
    }
}

impl From<(Arc<[Variable]>, Vec<Option<Term>>)> for QuerySolution {
    #[inline]
    fn from((variables, values): (Arc<[Variable]>, Vec<Option<Term>>)) -> Self {
        Self { variables, values }
    }
}

impl fmt::Debug for QuerySolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl PartialEq for QuerySolution {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for QuerySolution {}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::Literal;

    #[test]
    fn lookup_by_name_and_index() {
        let variables: Arc<[Variable]> =
            Arc::from(vec![Variable::new_unchecked("a"), Variable::new_unchecked("b")]);
        let solution = QuerySolution::from((
            variables,
            vec![Some(Literal::from(1).into()), None],
        ));
        assert_eq!(solution.get("a"), Some(&Literal::from(1).into()));
        assert_eq!(solution.get("b"), None);
        assert_eq!(solution.get("c"), None);
        assert_eq!(solution.value(0), solution.get("a"));
        assert_eq!(solution.len(), 2);
        assert_eq!(solution.iter().count(), 1);
    }
}
