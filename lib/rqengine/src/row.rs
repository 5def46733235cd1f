//! Rows (solution mappings) and the row-compatibility map.

use rqrdf::Term;

/// One solution mapping flowing through the rowsource pipeline.
///
/// `values` is parallel to the producing rowsource's declared variable list;
/// `None` is an unbound variable. `offset` is the row's position in its
/// producing stream and stabilises sorts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Row {
    pub values: Vec<Option<Term>>,
    pub offset: usize,
}

impl Row {
    pub fn new(width: usize, offset: usize) -> Self {
        Self {
            values: vec![None; width],
            offset,
        }
    }

    /// Writes the row values into the runtime binding frame at their global
    /// offsets, the pre-binding step of `EXISTS` evaluation.
    pub fn bind_variables(&self, variables: &[usize], frame: &mut [Option<Term>]) {
        for (value, &offset) in self.values.iter().zip(variables) {
            if let Some(value) = value {
                frame[offset] = Some(value.clone());
            }
        }
    }
}

/// The precomputed compatibility map between two rowsources.
///
/// For every variable declared by both sides it records the local column on
/// each side. Two rows are
/// [compatible](https://www.w3.org/TR/sparql11-query/#defn_algCompatibleMapping)
/// when every shared variable is unbound on at least one side or bound to
/// the same term on both.
#[derive(Debug, Clone)]
pub struct CompatibilityMap {
    shared: Vec<(usize, usize)>,
}

impl CompatibilityMap {
    pub fn new(left: &[usize], right: &[usize]) -> Self {
        let mut shared = Vec::new();
        for (left_column, offset) in left.iter().enumerate() {
            if let Some(right_column) = right.iter().position(|o| o == offset) {
                shared.push((left_column, right_column));
            }
        }
        Self { shared }
    }

    /// No shared variables means any two rows are compatible.
    pub fn has_shared_variables(&self) -> bool {
        !self.shared.is_empty()
    }

    pub fn compatible(&self, left: &Row, right: &Row) -> bool {
        self.shared.iter().all(|&(l, r)| {
            match (&left.values[l], &right.values[r]) {
                (Some(left), Some(right)) => left == right,
                _ => true,
            }
        })
    }

    /// Whether some shared variable is bound on both sides, the extra
    /// condition of `MINUS`.
    pub fn shares_binding(&self, left: &Row, right: &Row) -> bool {
        self.shared
            .iter()
            .any(|&(l, r)| left.values[l].is_some() && right.values[r].is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::Literal;

    fn row(values: Vec<Option<Term>>) -> Row {
        Row { values, offset: 0 }
    }

    fn term(value: i64) -> Option<Term> {
        Some(Literal::from(value).into())
    }

    #[test]
    fn compatibility_is_symmetric() {
        let forward = CompatibilityMap::new(&[0, 1], &[1, 2]);
        let backward = CompatibilityMap::new(&[1, 2], &[0, 1]);
        let cases = [
            (row(vec![term(1), term(2)]), row(vec![term(2), term(3)])),
            (row(vec![term(1), term(2)]), row(vec![term(9), term(3)])),
            (row(vec![term(1), None]), row(vec![term(9), term(3)])),
        ];
        for (left, right) in &cases {
            assert_eq!(
                forward.compatible(left, right),
                backward.compatible(right, left)
            );
        }
    }

    #[test]
    fn bound_values_must_match() {
        let map = CompatibilityMap::new(&[0], &[0]);
        assert!(map.compatible(&row(vec![term(1)]), &row(vec![term(1)])));
        assert!(!map.compatible(&row(vec![term(1)]), &row(vec![term(2)])));
        assert!(map.compatible(&row(vec![None]), &row(vec![term(2)])));
        assert!(map.compatible(&row(vec![term(1)]), &row(vec![None])));
    }

    #[test]
    fn no_shared_variables_is_always_compatible() {
        let map = CompatibilityMap::new(&[0], &[1]);
        assert!(!map.has_shared_variables());
        assert!(map.compatible(&row(vec![term(1)]), &row(vec![term(2)])));
    }

    #[test]
    fn minus_needs_a_binding_on_both_sides() {
        let map = CompatibilityMap::new(&[0], &[0]);
        assert!(!map.shares_binding(&row(vec![None]), &row(vec![term(1)])));
        assert!(map.shares_binding(&row(vec![term(1)]), &row(vec![term(1)])));
    }
}
