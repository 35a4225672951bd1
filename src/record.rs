//! Destinations for decoded records.
//!
//! Both decoders produce a stream of `(token, vector)` records. A full
//! load collects them with `EmbeddingsBuilder`, a filtered load writes
//! them into caller-owned rows with `RowWriter`.

use fnv::FnvHashSet;
use ndarray::{Array2, ArrayView1, ArrayViewMut2};

use crate::embeddings::{Embeddings, Loaded};
use crate::error::{Error, ParseWarning, Result};
use crate::float::Float;
use crate::token::Token;
use crate::vocab::{RowLookup, Vocab};

/// A single decoded record.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Record<'a, T> {
    /// Line (text) or 1-based table position (binary) of the record.
    pub line: usize,
    pub token: &'a [u8],
    pub vector: &'a [T],
}

fn duplicate(token: &[u8], line: usize, index: usize, strict: bool) -> Result<ParseWarning> {
    let warning = ParseWarning::DuplicateToken {
        token: Token::from(token),
        line,
        index,
    };
    log::warn!("{}", warning);

    if strict {
        return Err(warning.into());
    }

    Ok(warning)
}

/// Collects records into a vocabulary and a matrix.
///
/// A token keeps the index of its first occurrence. When it occurs
/// again, its row is overwritten and a warning is recorded.
pub(crate) struct EmbeddingsBuilder<T> {
    vocab: Vocab,
    data: Vec<T>,
    dims: usize,
    warnings: Vec<ParseWarning>,
    strict: bool,
}

impl<T> EmbeddingsBuilder<T>
where
    T: Float,
{
    pub fn new(dims: usize, strict: bool) -> Self {
        EmbeddingsBuilder {
            vocab: Vocab::default(),
            data: Vec::new(),
            dims,
            warnings: Vec::new(),
            strict,
        }
    }

    pub fn push(&mut self, record: Record<T>) -> Result<()> {
        debug_assert_eq!(record.vector.len(), self.dims);

        let (idx, inserted) = self.vocab.insert_if_absent(record.token);
        if inserted {
            self.data.extend_from_slice(record.vector);
            return Ok(());
        }

        let offset = idx * self.dims;
        self.data[offset..offset + self.dims].copy_from_slice(record.vector);

        let warning = duplicate(record.token, record.line, idx, self.strict)?;
        self.warnings.push(warning);

        Ok(())
    }

    pub fn finish(self) -> Result<Loaded<T>> {
        let matrix = Array2::from_shape_vec((self.vocab.len(), self.dims), self.data)?;
        log::debug!(
            "Loaded {} embeddings with {} dimensions ({} warnings)",
            matrix.nrows(),
            matrix.ncols(),
            self.warnings.len()
        );

        Ok(Loaded::new(Embeddings::new(self.vocab, matrix), self.warnings))
    }
}

/// Writes the records of wanted tokens into caller-owned rows.
///
/// Rows that never receive a record are left untouched. A token that
/// is written again overwrites its row and raises a warning. Distinct
/// tokens that share a row overwrite each other silently.
pub(crate) struct RowWriter<'a, 'l, T, V>
where
    V: ?Sized,
{
    lookup: &'l V,
    out: ArrayViewMut2<'a, T>,
    written: FnvHashSet<Token>,
    filled: Vec<bool>,
    n_filled: usize,
    strict: bool,
}

impl<'a, 'l, T, V> RowWriter<'a, 'l, T, V>
where
    T: Float,
    V: RowLookup + ?Sized,
{
    /// Construct a writer, checking that rows fit vectors of `dims`.
    pub fn new(
        lookup: &'l V,
        out: ArrayViewMut2<'a, T>,
        dims: usize,
        strict: bool,
    ) -> Result<Self> {
        if out.ncols() != dims {
            return Err(Error::Format(format!(
                "Output matrix has {} columns, embeddings have {} dimensions",
                out.ncols(),
                dims
            )));
        }

        Ok(RowWriter {
            lookup,
            written: FnvHashSet::default(),
            filled: vec![false; out.nrows()],
            out,
            n_filled: 0,
            strict,
        })
    }

    /// Write a record if its token is wanted.
    pub fn write(&mut self, record: Record<T>) -> Result<()> {
        let row = match self.lookup.row(record.token) {
            Some(row) => row,
            None => return Ok(()),
        };

        let rows = self.out.nrows();
        if row >= rows {
            return Err(Error::RowOutOfBounds {
                token: Token::from(record.token),
                row,
                rows,
            });
        }

        if self.written.contains(record.token) {
            duplicate(record.token, record.line, row, self.strict)?;
        } else {
            self.written.insert(Token::from(record.token));
        }

        if !self.filled[row] {
            self.filled[row] = true;
            self.n_filled += 1;
        }

        self.out.row_mut(row).assign(&ArrayView1::from(record.vector));

        Ok(())
    }

    pub fn finish(self) {
        log::debug!(
            "Filled {} of {} rows with {}-dimensional embeddings",
            self.n_filled,
            self.out.nrows(),
            self.out.ncols()
        );
    }
}
