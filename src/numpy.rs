//! Reader for the numpy binary format.
//!
//! A numpy embedding file pairs an NPY array header with a token
//! table:
//!
//! 1. The magic `\x93NUMPY`, the major and minor format version.
//! 2. The header length, a little-endian `u16` for version 1 and a
//!    `u32` for versions 2 and 3.
//! 3. The NPY header dictionary, for example
//!    `{'descr': '<f4', 'fortran_order': False, 'shape': (3, 5), }`.
//!    The shape is *(vocab size, dimensionality)*.
//! 4. The tokens in index order, each a little-endian `u32` byte
//!    length followed by the token bytes.
//! 5. The row-major embedding matrix, with elements of the type in
//!    `descr`.
//!
//! The header declares the shape and element type, so nothing is
//! inferred from the data.

use std::convert::TryInto;
use std::fmt;
use std::io::{self, BufRead, Read, Seek, SeekFrom};
use std::iter::Peekable;
use std::mem::size_of;
use std::str;
use std::vec;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use ndarray::{Array2, ArrayViewMut2};

use crate::config::LoadOptions;
use crate::embeddings::Loaded;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::record::{EmbeddingsBuilder, Record, RowWriter};
use crate::token::Token;
use crate::vocab::RowLookup;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Element type of the embedding matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ElementType {
    F32,
    F64,
}

impl ElementType {
    fn size(self) -> usize {
        match self {
            ElementType::F32 => size_of::<f32>(),
            ElementType::F64 => size_of::<f64>(),
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "float32"),
            ElementType::F64 => write!(f, "float64"),
        }
    }
}

/// Byte order of the matrix elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endianness {
    Little,
    Big,
}

/// Header of a numpy embedding file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
    /// Major format version.
    pub version: u8,
    pub element_type: ElementType,
    pub endianness: Endianness,
    /// Number of tokens and matrix rows.
    pub rows: usize,
    /// Embedding dimensionality.
    pub cols: usize,
}

impl Header {
    /// Read the header, leaving the reader at the token table.
    pub fn read<R>(read: &mut R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; 6];
        read.read_exact(&mut magic)
            .map_err(|e| Error::read_error("Cannot read magic", e))?;
        if &magic != MAGIC {
            return Err(Error::Format(format!(
                "Expected '\\x93NUMPY' as magic, got: {}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let version = read
            .read_u8()
            .map_err(|e| Error::read_error("Cannot read major version", e))?;
        read.read_u8()
            .map_err(|e| Error::read_error("Cannot read minor version", e))?;

        let header_len: usize = match version {
            1 => read
                .read_u16::<LittleEndian>()
                .map_err(|e| Error::read_error("Cannot read header length", e))?
                as usize,
            2 | 3 => read
                .read_u32::<LittleEndian>()
                .map_err(|e| Error::read_error("Cannot read header length", e))?
                .try_into()
                .map_err(|_| Error::Overflow)?,
            _ => {
                return Err(Error::Format(format!(
                    "Unsupported numpy format version: {}",
                    version
                )))
            }
        };

        let mut dict = vec![0u8; header_len];
        read.read_exact(&mut dict)
            .map_err(|e| Error::read_error("Cannot read header", e))?;
        let dict = str::from_utf8(&dict)
            .map_err(|e| Error::Format(format!("Header is not valid UTF-8: {}", e)))?;

        Self::parse_dict(version, dict)
    }

    fn parse_dict(version: u8, dict: &str) -> Result<Self> {
        let descr = dict_value(dict, "descr")?;
        let descr = descr
            .strip_prefix('\'')
            .and_then(|d| d.split('\'').next())
            .ok_or_else(|| Error::Format(format!("Malformed descr: {}", descr)))?;
        let (element_type, endianness) = parse_descr(descr)?;

        let fortran_order = dict_value(dict, "fortran_order")?;
        if fortran_order.starts_with("True") {
            return Err(Error::Format(
                "Column-major (Fortran order) matrices are not supported".to_string(),
            ));
        } else if !fortran_order.starts_with("False") {
            return Err(Error::Format(format!(
                "Malformed fortran_order: {}",
                fortran_order
            )));
        }

        let shape = parse_shape(dict_value(dict, "shape")?)?;
        let (rows, cols) = match shape.as_slice() {
            &[rows, cols] => (rows, cols),
            _ => {
                return Err(Error::Format(format!(
                    "Expected a matrix, got an array with shape {:?}",
                    shape
                )))
            }
        };

        if cols == 0 {
            return Err(Error::Format(
                "Embeddings should have at least 1 dimension".to_string(),
            ));
        }

        rows.checked_mul(cols)
            .and_then(|n| n.checked_mul(element_type.size()))
            .ok_or(Error::Overflow)?;

        Ok(Header {
            version,
            element_type,
            endianness,
            rows,
            cols,
        })
    }

    fn row_len(&self) -> u64 {
        (self.cols * self.element_type.size()) as u64
    }
}

/// Get the text following `'key':` in a header dictionary.
fn dict_value<'a>(dict: &'a str, key: &str) -> Result<&'a str> {
    let quoted = format!("'{}'", key);
    let start = dict
        .find(&quoted)
        .ok_or_else(|| Error::Format(format!("Header lacks '{}'", key)))?;
    let rest = dict[start + quoted.len()..].trim_start();
    rest.strip_prefix(':')
        .map(str::trim_start)
        .ok_or_else(|| Error::Format(format!("Malformed header entry '{}'", key)))
}

fn parse_descr(descr: &str) -> Result<(ElementType, Endianness)> {
    let native = if cfg!(target_endian = "big") {
        Endianness::Big
    } else {
        Endianness::Little
    };

    let mut chars = descr.chars();
    let endianness = match chars.next() {
        Some('<') => Endianness::Little,
        Some('>') => Endianness::Big,
        Some('=') => native,
        _ => {
            return Err(Error::Format(format!(
                "Unsupported element type: {}",
                descr
            )))
        }
    };

    let element_type = match chars.as_str() {
        "f4" => ElementType::F32,
        "f8" => ElementType::F64,
        _ => {
            return Err(Error::Format(format!(
                "Unsupported element type: {}",
                descr
            )))
        }
    };

    Ok((element_type, endianness))
}

fn parse_shape(value: &str) -> Result<Vec<usize>> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.split(')').next())
        .ok_or_else(|| Error::Format(format!("Malformed shape: {}", value)))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| {
            dim.trim_end_matches('L').parse().map_err(|e| {
                Error::Format(format!("Cannot parse shape component '{}': {}", dim, e))
            })
        })
        .collect()
}

fn read_token<R>(read: &mut R, buf: &mut Vec<u8>) -> Result<()>
where
    R: Read,
{
    let len = u64::from(
        read.read_u32::<LittleEndian>()
            .map_err(|e| Error::read_error("Cannot read token length", e))?,
    );

    // The buffer only grows with the bytes that are actually present.
    buf.clear();
    let n_read = read
        .take(len)
        .read_to_end(buf)
        .map_err(|e| Error::read_error("Cannot read token", e))?;
    if n_read as u64 != len {
        return Err(Error::read_error(
            "Cannot read token",
            io::ErrorKind::UnexpectedEof.into(),
        ));
    }

    Ok(())
}

/// Reads matrix rows, converting them to the target type.
struct Rows<T> {
    header: Header,
    bytes: Vec<u8>,
    vector: Vec<T>,
}

impl<T> Rows<T>
where
    T: Float,
{
    fn new(header: Header) -> Self {
        Rows {
            header,
            bytes: Vec::new(),
            vector: Vec::new(),
        }
    }

    /// The most recently read row.
    fn current(&self) -> &[T] {
        &self.vector
    }

    fn read<R>(&mut self, read: &mut R) -> Result<&[T]>
    where
        R: Read,
    {
        let row_len = self.header.row_len();
        self.bytes.clear();
        let n_read = read
            .take(row_len)
            .read_to_end(&mut self.bytes)
            .map_err(|e| Error::read_error("Cannot read embedding", e))?;
        if n_read as u64 != row_len {
            return Err(Error::read_error(
                "Cannot read embedding",
                io::ErrorKind::UnexpectedEof.into(),
            ));
        }

        let chunks = self.bytes.chunks_exact(self.header.element_type.size());
        self.vector.clear();
        match (self.header.element_type, self.header.endianness) {
            (ElementType::F32, Endianness::Little) => self
                .vector
                .extend(chunks.map(|c| T::from_f32(LittleEndian::read_f32(c)))),
            (ElementType::F32, Endianness::Big) => self
                .vector
                .extend(chunks.map(|c| T::from_f32(BigEndian::read_f32(c)))),
            (ElementType::F64, Endianness::Little) => self
                .vector
                .extend(chunks.map(|c| T::from_f64(LittleEndian::read_f64(c)))),
            (ElementType::F64, Endianness::Big) => self
                .vector
                .extend(chunks.map(|c| T::from_f64(BigEndian::read_f64(c)))),
        }

        Ok(&self.vector)
    }

    fn skip<R>(&self, read: &mut R) -> Result<()>
    where
        R: Read,
    {
        let row_len = self.header.row_len();
        let skipped = io::copy(&mut read.take(row_len), &mut io::sink())
            .map_err(|e| Error::read_error("Cannot skip embedding", e))?;
        if skipped != row_len {
            return Err(Error::read_error(
                "Cannot skip embedding",
                io::ErrorKind::UnexpectedEof.into(),
            ));
        }

        Ok(())
    }
}

fn n_records(header: &Header, options: &LoadOptions) -> usize {
    options
        .max_vocab
        .map_or(header.rows, |max| max.min(header.rows))
}

/// Load embeddings in numpy format.
///
/// Tokens that occur more than once in the token table are handled
/// as in the text format: the token keeps its first index, its
/// vector is the last one, and a warning is added per repetition.
pub fn load<T, R>(reader: &mut R, options: &LoadOptions) -> Result<Loaded<T>>
where
    T: Float,
    R: BufRead,
{
    let header = Header::read(reader)?;
    let n_records = n_records(&header, options);

    // Header counts are not trusted for reservations, storage grows
    // with the records that are read.
    let mut tokens = Vec::new();
    let mut buf = Vec::new();
    for idx in 0..header.rows {
        read_token(reader, &mut buf)?;
        if idx < n_records {
            tokens.push(Token::from(&buf[..]));
        }
    }

    let mut builder = EmbeddingsBuilder::new(header.cols, options.strict);
    let mut rows = Rows::new(header);
    for (idx, token) in tokens.iter().enumerate() {
        let vector = rows.read(reader)?;
        builder.push(Record {
            line: idx + 1,
            token,
            vector,
        })?;
    }

    builder.finish()
}

/// Load the embeddings of the tokens in `lookup`.
///
/// Returns a matrix with `lookup.n_rows()` rows. Rows without a
/// token from the source are left at zero.
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
    let header = Header::read(reader)?;
    let mut wanted = WantedRows::read(reader, header, lookup, options)?;
    wanted.read_first(reader)?;

    let mut matrix = output_matrix(lookup.n_rows(), wanted.cols())?;
    let writer = RowWriter::new(lookup, matrix.view_mut(), wanted.cols(), options.strict)?;
    wanted.write(reader, writer)?;

    Ok(matrix)
}

/// Load the embeddings of the tokens in `lookup` into `out`.
///
/// Rows without a token from the source are not modified. The number
/// of columns of `out` must equal the dimensionality of the
/// embeddings. If an error is returned, rows may have been partially
/// overwritten.
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
    let header = Header::read(reader)?;
    let wanted = WantedRows::read(reader, header, lookup, options)?;
    let writer = RowWriter::new(lookup, out, wanted.cols(), options.strict)?;
    wanted.write(reader, writer)
}

/// Allocate a zeroed output matrix, failing instead of aborting when
/// the allocation is not possible.
fn output_matrix<T>(rows: usize, cols: usize) -> Result<Array2<T>>
where
    T: Float,
{
    let len = rows.checked_mul(cols).ok_or(Error::Overflow)?;
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { rows, cols })?;
    data.resize(len, T::default());

    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

/// Rows of a filtered load.
///
/// Only the tokens of wanted rows are kept, in table order.
struct WantedRows<T> {
    rows: Rows<T>,
    tokens: Peekable<vec::IntoIter<(usize, Token)>>,
    n_records: usize,
    n_read: usize,
}

impl<T> WantedRows<T>
where
    T: Float,
{
    /// Read the token table.
    fn read<R, V>(reader: &mut R, header: Header, lookup: &V, options: &LoadOptions) -> Result<Self>
    where
        R: Read,
        V: RowLookup + ?Sized,
    {
        let n_records = n_records(&header, options);

        let mut tokens = Vec::new();
        let mut buf = Vec::new();
        for idx in 0..header.rows {
            read_token(reader, &mut buf)?;
            if idx < n_records && lookup.row(&buf).is_some() {
                tokens.push((idx, Token::from(&buf[..])));
            }
        }

        Ok(WantedRows {
            rows: Rows::new(header),
            tokens: tokens.into_iter().peekable(),
            n_records,
            n_read: 0,
        })
    }

    fn cols(&self) -> usize {
        self.rows.header.cols
    }

    /// Read the first row ahead of the others.
    ///
    /// Once it is read, the payload is known to hold rows of the
    /// declared dimensionality.
    fn read_first<R>(&mut self, reader: &mut R) -> Result<()>
    where
        R: Read,
    {
        if self.n_read == 0 && self.n_records > 0 {
            self.rows.read(reader)?;
            self.n_read = 1;
        }

        Ok(())
    }

    fn write<R, V>(mut self, reader: &mut R, mut writer: RowWriter<'_, '_, T, V>) -> Result<()>
    where
        R: Read,
        V: RowLookup + ?Sized,
    {
        for idx in 0..self.n_records {
            let wanted = self
                .tokens
                .next_if(|(wanted_idx, _)| *wanted_idx == idx);

            if idx >= self.n_read {
                match wanted {
                    Some(_) => {
                        self.rows.read(reader)?;
                    }
                    None => self.rows.skip(reader)?,
                }
            }

            if let Some((_, token)) = wanted {
                writer.write(Record {
                    line: idx + 1,
                    token: &token,
                    vector: self.rows.current(),
                })?;
            }
        }

        writer.finish();

        Ok(())
    }
}

/// Check whether a stream looks like a numpy embedding file.
///
/// Only the header is inspected. Never fails, the stream is rewound
/// to its original position.
pub fn check_valid<R>(reader: &mut R) -> bool
where
    R: Read + Seek,
{
    let start = match reader.seek(SeekFrom::Current(0)) {
        Ok(start) => start,
        Err(_) => return false,
    };

    let valid = match Header::read(reader) {
        Ok(header) => {
            log::debug!(
                "numpy format check: {} matrix of shape ({}, {})",
                header.element_type,
                header.rows,
                header.cols
            );
            true
        }
        Err(err) => {
            log::debug!("numpy format check: {}", err);
            false
        }
    };

    reader.seek(SeekFrom::Start(start)).is_ok() && valid
}
