//! Literal row tables: `VALUES`, test fixtures and the empty stream.

use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::RowSource;
use rqrdf::NamedOrBlankNode;

/// Serves an owned sequence of pre-built rows over an owned variable list.
pub(crate) struct RowSequence {
    variables: Vec<usize>,
    rows: Vec<Row>,
    cursor: usize,
}

impl RowSequence {
    pub fn new(variables: Vec<usize>, rows: Vec<Row>) -> Self {
        Self {
            variables,
            rows,
            cursor: 0,
        }
    }

    /// The join identity: a single row binding nothing.
    pub fn unit() -> Self {
        Self::new(
            Vec::new(),
            vec![Row {
                values: Vec::new(),
                offset: 0,
            }],
        )
    }
}

impl RowSource for RowSequence {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.cursor = 0;
        Ok(())
    }

    fn set_origin(&mut self, _origin: Option<NamedOrBlankNode>) {}
}

/// Yields no rows and declares no columns.
pub(crate) struct EmptyRowSource {
    variables: Vec<usize>,
}

impl EmptyRowSource {
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
        }
    }
}

impl RowSource for EmptyRowSource {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn set_origin(&mut self, _origin: Option<NamedOrBlankNode>) {}
}
