//! The per-query variables table.

use rqrdf::Variable;
use rustc_hash::FxHashMap;

/// The per-query registry assigning a stable integer offset to every
/// variable.
///
/// Named variables come first, in registration order; anonymous entries
/// (standing for blank nodes in patterns) follow the named block, so
/// registering a named variable after anonymous ones shifts the anonymous
/// offsets forward. All registrations therefore happen before any offset is
/// stored by the execution tree.
#[derive(Debug, Default)]
pub struct VariableTable {
    named: Vec<Variable>,
    anonymous: Vec<String>,
    named_index: FxHashMap<String, usize>,
    anonymous_index: FxHashMap<String, usize>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named variable, returning its offset. Registering the
    /// same name again returns the original offset.
    pub fn bind_named(&mut self, variable: &Variable) -> usize {
        if let Some(&index) = self.named_index.get(variable.as_str()) {
            return index;
        }
        let index = self.named.len();
        self.named_index.insert(variable.as_str().to_owned(), index);
        self.named.push(variable.clone());
        index
    }

    /// Registers an anonymous entry keyed by a blank node label, returning
    /// its offset after the named block.
    pub fn bind_anonymous(&mut self, label: &str) -> usize {
        if let Some(&index) = self.anonymous_index.get(label) {
            return self.named.len() + index;
        }
        let index = self.anonymous.len();
        self.anonymous_index.insert(label.to_owned(), index);
        self.anonymous.push(label.to_owned());
        self.named.len() + index
    }

    /// The offset of a named variable, if registered.
    pub fn named_offset(&self, variable: &Variable) -> Option<usize> {
        self.named_index.get(variable.as_str()).copied()
    }

    /// The offset of an anonymous entry, if registered.
    pub fn anonymous_offset(&self, label: &str) -> Option<usize> {
        Some(self.named.len() + self.anonymous_index.get(label)?)
    }

    /// The named variable at the given offset, if the offset is in the named
    /// block.
    pub fn variable(&self, offset: usize) -> Option<&Variable> {
        self.named.get(offset)
    }

    pub fn named_count(&self) -> usize {
        self.named.len()
    }

    pub fn anonymous_count(&self) -> usize {
        self.anonymous.len()
    }

    /// The total width of rows over this table.
    pub fn len(&self) -> usize {
        self.named.len() + self.anonymous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.anonymous.is_empty()
    }

    /// The named variables, in offset order.
    pub fn names(&self) -> impl Iterator<Item = &Variable> {
        self.named.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Variable {
        Variable::new_unchecked(name)
    }

    #[test]
    fn named_registration_is_idempotent() {
        let mut table = VariableTable::new();
        assert_eq!(table.bind_named(&var("a")), 0);
        assert_eq!(table.bind_named(&var("b")), 1);
        assert_eq!(table.bind_named(&var("a")), 0);
        assert_eq!(table.named_count(), 2);
    }

    #[test]
    fn anonymous_offsets_shift_after_named_registration() {
        let mut table = VariableTable::new();
        table.bind_named(&var("a"));
        assert_eq!(table.bind_anonymous("b0"), 1);
        // A late named variable pushes the anonymous block forward.
        assert_eq!(table.bind_named(&var("z")), 1);
        assert_eq!(table.anonymous_offset("b0"), Some(2));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn lookup_by_offset() {
        let mut table = VariableTable::new();
        table.bind_named(&var("a"));
        table.bind_anonymous("b0");
        assert_eq!(table.variable(0), Some(&var("a")));
        assert_eq!(table.variable(1), None);
    }
}
