//! Reader for the GloVe text format.
//!
//! Each line of a GloVe file contains a token followed by the
//! components of its vector, separated by spaces:
//!
//! *token component_1 component_2 ... component_n*
//!
//! The dimensionality is fixed by the first line, every other line
//! must have the same number of components. For example:
//!
//! ```
//! use std::io::Cursor;
//!
//! use word_embedding_loader::config::LoadOptions;
//! use word_embedding_loader::glove;
//!
//! let mut reader = Cursor::new("the 0.418 0.24968\n, 0.013441 0.23682\n");
//! let loaded = glove::load::<f32, _>(&mut reader, &LoadOptions::default()).unwrap();
//!
//! let embeddings = loaded.embeddings();
//! assert_eq!(embeddings.vocab().idx(","), Some(1));
//! assert_eq!(embeddings.dims(), 2);
//! ```

use std::io::{BufRead, Read, Seek, SeekFrom};
use std::str;

use ndarray::{Array2, ArrayViewMut2};

use crate::config::LoadOptions;
use crate::embeddings::Loaded;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::record::{EmbeddingsBuilder, Record, RowWriter};
use crate::token::{parse_components, split_line, trim_ascii};
use crate::vocab::RowLookup;

/// Number of bytes that the format check reads at most.
const SNIFF_LIMIT: u64 = 1 << 20;

/// Pull-based reader of non-blank lines.
///
/// The line buffer is reused, at most one line is held in memory.
pub(crate) struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    line: usize,
}

impl<R> LineReader<R>
where
    R: BufRead,
{
    pub fn new(reader: R) -> Self {
        LineReader {
            reader,
            buf: Vec::new(),
            line: 0,
        }
    }

    /// Get the next non-blank line with its 1-based line number.
    ///
    /// Surrounding whitespace, including the line terminator, is
    /// stripped. Returns `None` at the end of the stream.
    pub fn next_line(&mut self) -> Result<Option<(usize, &[u8])>> {
        loop {
            self.buf.clear();
            let n = self
                .reader
                .read_until(b'\n', &mut self.buf)
                .map_err(|e| Error::read_error("Cannot read line from embedding file", e))?;
            if n == 0 {
                return Ok(None);
            }

            self.line += 1;

            if !self.buf.iter().all(u8::is_ascii_whitespace) {
                return Ok(Some((self.line, trim_ascii(&self.buf))));
            }
        }
    }
}

/// Decoder of GloVe records.
struct Records<'o, R, T> {
    lines: LineReader<R>,
    options: &'o LoadOptions,
    dims: Option<usize>,
    components: Vec<T>,
    n_records: usize,
}

impl<'o, R, T> Records<'o, R, T>
where
    R: BufRead,
    T: Float,
{
    fn new(reader: R, options: &'o LoadOptions) -> Self {
        Records {
            lines: LineReader::new(reader),
            options,
            dims: None,
            components: Vec::new(),
            n_records: 0,
        }
    }

    /// Decode the next record.
    ///
    /// The first record fixes the dimensionality of all records.
    fn next_record(&mut self) -> Result<Option<Record<T>>> {
        if !self.options.admits(self.n_records) {
            return Ok(None);
        }

        let (line, text) = match self.lines.next_line()? {
            Some(line) => line,
            None => return Ok(None),
        };

        let (token, fields) = split_line(text);
        let found = parse_components(fields, line, &mut self.components)?;

        match self.dims {
            Some(expected) if expected != found => {
                return Err(Error::DimensionMismatch {
                    line,
                    expected,
                    found,
                })
            }
            Some(_) => (),
            None if found == 0 => {
                return Err(Error::Format(format!(
                    "Line {}: token '{}' has no vector components",
                    line,
                    String::from_utf8_lossy(token)
                )))
            }
            None => self.dims = Some(found),
        }

        self.n_records += 1;

        Ok(Some(Record {
            line,
            token,
            vector: &self.components,
        }))
    }
}

/// Load embeddings in GloVe format.
///
/// Tokens are assigned indices in the order of their first
/// occurrence. When a token occurs again, its vector is replaced by
/// the later one and a warning is added to the result.
pub fn load<T, R>(reader: &mut R, options: &LoadOptions) -> Result<Loaded<T>>
where
    T: Float,
    R: BufRead,
{
    let mut records = Records::new(reader, options);

    let mut builder = match records.next_record()? {
        Some(record) => {
            let mut builder = EmbeddingsBuilder::new(record.vector.len(), options.strict);
            builder.push(record)?;
            builder
        }
        None => return Err(Error::Empty),
    };

    while let Some(record) = records.next_record()? {
        builder.push(record)?;
    }

    builder.finish()
}

/// Load the embeddings of the tokens in `lookup`.
///
/// Returns a matrix with `lookup.n_rows()` rows, the vector of every
/// token is stored in the row that `lookup` maps it to. Tokens that
/// are not in `lookup` are discarded. Rows without a token from the
/// source are left at zero.
pub fn load_with_vocab<T, R, V>(
    reader: &mut R,
    lookup: &V,
    options: &LoadOptions,
) -> Result<Array2<T>>
where
    T: Float,
    R: BufRead,
    V: RowLookup + ?Sized,
{
    let mut records = Records::new(reader, options);

    let first = match records.next_record()? {
        Some(record) => record,
        None => return Err(Error::Empty),
    };

    let dims = first.vector.len();
    let mut matrix = Array2::from_elem((lookup.n_rows(), dims), T::default());
    let mut writer = RowWriter::new(lookup, matrix.view_mut(), dims, options.strict)?;
    writer.write(first)?;

    while let Some(record) = records.next_record()? {
        writer.write(record)?;
    }

    writer.finish();

    Ok(matrix)
}

/// Load the embeddings of the tokens in `lookup` into `out`.
///
/// In contrast to `load_with_vocab`, the caller owns the output
/// matrix. Rows without a token from the source are not modified.
/// The number of columns of `out` must equal the dimensionality of
/// the embeddings. If an error is returned, rows may have been
/// partially overwritten.
pub fn load_with_vocab_into<T, R, V>(
    reader: &mut R,
    lookup: &V,
    out: ArrayViewMut2<T>,
    options: &LoadOptions,
) -> Result<()>
where
    T: Float,
    R: BufRead,
    V: RowLookup + ?Sized,
{
    let mut records = Records::new(reader, options);

    let first = match records.next_record()? {
        Some(record) => record,
        None => return Err(Error::Empty),
    };

    let mut writer = RowWriter::new(lookup, out, first.vector.len(), options.strict)?;
    writer.write(first)?;

    while let Some(record) = records.next_record()? {
        writer.write(record)?;
    }

    writer.finish();

    Ok(())
}

/// Check whether a stream looks like a GloVe file.
///
/// Only the first line is inspected. It must consist of a token and
/// at least one numeric component. A first line with exactly two
/// integers is the shape header of another format and is rejected.
/// Never fails, the stream is rewound to its original position.
pub fn check_valid<R>(reader: &mut R) -> bool
where
    R: BufRead + Seek,
{
    let start = match reader.seek(SeekFrom::Current(0)) {
        Ok(start) => start,
        Err(_) => return false,
    };

    let valid = first_line_is_record(reader).unwrap_or(false);
    log::debug!("GloVe format check: {}", valid);

    reader.seek(SeekFrom::Start(start)).is_ok() && valid
}

fn first_line_is_record<R>(reader: &mut R) -> Result<bool>
where
    R: BufRead,
{
    let mut lines = LineReader::new(reader.take(SNIFF_LIMIT));
    let line = match lines.next_line()? {
        Some((_, line)) => line,
        None => return Ok(false),
    };

    let (token, fields) = split_line(line);
    let fields: Vec<_> = fields.collect();
    if fields.is_empty() {
        return Ok(false);
    }

    if fields.len() == 1 && is_integer(token) && is_integer(fields[0]) {
        return Ok(false);
    }

    Ok(fields.iter().all(|field| is_float(field)))
}

fn is_float(field: &[u8]) -> bool {
    str::from_utf8(field).map_or(false, |field| field.parse::<f64>().is_ok())
}

fn is_integer(field: &[u8]) -> bool {
    !field.is_empty() && field.iter().all(u8::is_ascii_digit)
}
