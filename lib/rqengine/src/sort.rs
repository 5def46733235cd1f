//! The comparison machinery behind `ORDER BY`, `DISTINCT` and `MIN`/`MAX`.

use crate::expression::partial_cmp_terms;
use crate::row::Row;
use rqrdf::Term;
use std::cmp::Ordering;

/// The total order used for sorting solution sequences: unbound sorts
/// lowest, then blank nodes, then IRIs, then literals. Literals order by
/// value when comparable and fall back to their lexical representation so
/// the order stays total.
pub(crate) fn cmp_terms(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match a {
            Term::BlankNode(a_node) => match b {
                Term::BlankNode(b_node) => a_node.as_str().cmp(b_node.as_str()),
                _ => Ordering::Less,
            },
            Term::NamedNode(a_node) => match b {
                Term::BlankNode(_) => Ordering::Greater,
                Term::NamedNode(b_node) => a_node.as_str().cmp(b_node.as_str()),
                Term::Literal(_) => Ordering::Less,
            },
            Term::Literal(a_literal) => match b {
                Term::Literal(b_literal) => {
                    partial_cmp_terms(a, b).unwrap_or_else(|| {
                        (
                            a_literal.value(),
                            a_literal.datatype(),
                            a_literal.language(),
                        )
                            .cmp(&(
                                b_literal.value(),
                                b_literal.datatype(),
                                b_literal.language(),
                            ))
                    })
                }
                _ => Ordering::Greater,
            },
        },
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// One `ORDER BY` sort entry: the row plus its evaluated key terms, an
/// evaluation error being an absent (lowest-sorting) key.
pub(crate) struct KeyedRow {
    pub keys: Vec<Option<Term>>,
    pub row: Row,
}

/// Stable multi-key sort: each condition compares with its direction, ties
/// break on the row offset assigned by the producing stream.
pub(crate) fn sort_rows(rows: &mut [KeyedRow], descending: &[bool]) {
    rows.sort_by(|a, b| {
        for (i, descending) in descending.iter().enumerate() {
            let ordering = cmp_terms(a.keys[i].as_ref(), b.keys[i].as_ref());
            let ordering = if *descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.row.offset.cmp(&b.row.offset)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rqrdf::{Literal, NamedNode};

    fn lit(value: i64) -> Option<Term> {
        Some(Literal::from(value).into())
    }

    #[test]
    fn unbound_sorts_first() {
        assert_eq!(cmp_terms(None, lit(1).as_ref()), Ordering::Less);
        assert_eq!(
            cmp_terms(
                Some(&NamedNode::new_unchecked("http://example.com/").into()),
                lit(1).as_ref()
            ),
            Ordering::Less
        );
    }

    #[test]
    fn incomparable_literals_still_order() {
        let a: Term = Literal::new_typed_literal("x", NamedNode::new_unchecked("http://example.com/t")).into();
        let b: Term = Literal::from(1).into();
        let forward = cmp_terms(Some(&a), Some(&b));
        assert_ne!(forward, Ordering::Equal);
        assert_eq!(cmp_terms(Some(&b), Some(&a)), forward.reverse());
    }

    #[test]
    fn sort_is_stable_with_offset_tiebreak() {
        let mut rows: Vec<KeyedRow> = [(lit(2), 0), (lit(1), 1), (lit(2), 2)]
            .into_iter()
            .map(|(key, offset)| KeyedRow {
                keys: vec![key],
                row: Row {
                    values: Vec::new(),
                    offset,
                },
            })
            .collect();
        sort_rows(&mut rows, &[false]);
        let offsets: Vec<_> = rows.iter().map(|r| r.row.offset).collect();
        assert_eq!(offsets, [1, 0, 2]);
    }
}
