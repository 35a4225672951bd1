//! Format-agnostic loading.
//!
//! The functions in this module dispatch to the reader of the format
//! in `LoadOptions`, or detect the format when none is given:
//!
//! ```
//! use std::io::Cursor;
//!
//! use word_embedding_loader::prelude::*;
//!
//! let mut reader = Cursor::new("the 0.418 0.24968\n, 0.013441 0.23682\n");
//! assert_eq!(Format::detect(&mut reader), Some(Format::Glove));
//!
//! let loaded: Loaded<f32> = load(&mut reader, &LoadOptions::default()).unwrap();
//! assert_eq!(loaded.embeddings().len(), 2);
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek};
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::config::LoadOptions;
use crate::embeddings::Loaded;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::vocab::RowLookup;
use crate::{glove, numpy};

/// Embedding file formats.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// GloVe text format.
    #[serde(alias = "text")]
    Glove,

    /// numpy binary format.
    #[serde(alias = "npy")]
    Numpy,
}

impl Format {
    /// Detect the format of a stream.
    ///
    /// The binary format is checked first, since its magic is
    /// unambiguous. The stream is rewound to its original position.
    pub fn detect<R>(reader: &mut R) -> Option<Format>
    where
        R: BufRead + Seek,
    {
        let format = if numpy::check_valid(reader) {
            Some(Format::Numpy)
        } else if glove::check_valid(reader) {
            Some(Format::Glove)
        } else {
            None
        };

        log::debug!("Detected format: {:?}", format);

        format
    }

    /// Check whether a stream is in this format.
    pub fn check_valid<R>(self, reader: &mut R) -> bool
    where
        R: BufRead + Seek,
    {
        match self {
            Format::Glove => glove::check_valid(reader),
            Format::Numpy => numpy::check_valid(reader),
        }
    }

    fn resolve<R>(reader: &mut R, options: &LoadOptions) -> Result<Format>
    where
        R: BufRead + Seek,
    {
        match options.format {
            Some(format) => Ok(format),
            None => Format::detect(reader).ok_or_else(|| {
                Error::Format("Cannot detect the format of the embedding file".to_string())
            }),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Glove => write!(f, "glove"),
            Format::Numpy => write!(f, "numpy"),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self> {
        match format {
            "glove" | "text" => Ok(Format::Glove),
            "numpy" | "npy" => Ok(Format::Numpy),
            unknown => Err(Error::Format(format!(
                "Unknown embedding format: {}",
                unknown
            ))),
        }
    }
}

/// Load embeddings with their vocabulary.
pub fn load<T, R>(reader: &mut R, options: &LoadOptions) -> Result<Loaded<T>>
where
    T: Float,
    R: BufRead + Seek,
{
    match Format::resolve(reader, options)? {
        Format::Glove => glove::load(reader, options),
        Format::Numpy => numpy::load(reader, options),
    }
}

/// Load the embeddings of the tokens in `lookup`.
///
/// See `glove::load_with_vocab` for the layout of the result.
pub fn load_with_vocab<T, R, V>(
    reader: &mut R,
    lookup: &V,
    options: &LoadOptions,
) -> Result<Array2<T>>
where
    T: Float,
    R: BufRead + Seek,
    V: RowLookup + ?Sized,
{
    match Format::resolve(reader, options)? {
        Format::Glove => glove::load_with_vocab(reader, lookup, options),
        Format::Numpy => numpy::load_with_vocab(reader, lookup, options),
    }
}

/// Load the embeddings of the tokens in `lookup` into `out`.
pub fn load_with_vocab_into<T, R, V>(
    reader: &mut R,
    lookup: &V,
    out: ArrayViewMut2<T>,
    options: &LoadOptions,
) -> Result<()>
where
    T: Float,
    R: BufRead + Seek,
    V: RowLookup + ?Sized,
{
    match Format::resolve(reader, options)? {
        Format::Glove => glove::load_with_vocab_into(reader, lookup, out, options),
        Format::Numpy => numpy::load_with_vocab_into(reader, lookup, out, options),
    }
}

/// Check whether a stream is in the given format.
///
/// Never fails, the stream is rewound to its original position.
pub fn check_valid<R>(reader: &mut R, format: Format) -> bool
where
    R: BufRead + Seek,
{
    format.check_valid(reader)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path)
        .map_err(|e| Error::read_error(format!("Cannot open {}", path.display()), e))?;
    Ok(BufReader::new(f))
}

/// Load embeddings with their vocabulary from a file.
pub fn load_path<T>(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Loaded<T>>
where
    T: Float,
{
    load(&mut open(path.as_ref())?, options)
}

/// Load the embeddings of the tokens in `lookup` from a file.
pub fn load_with_vocab_path<T, V>(
    path: impl AsRef<Path>,
    lookup: &V,
    options: &LoadOptions,
) -> Result<Array2<T>>
where
    T: Float,
    V: RowLookup + ?Sized,
{
    load_with_vocab(&mut open(path.as_ref())?, lookup, options)
}

/// Check whether a file is in the given format.
///
/// Returns `false` when the file cannot be opened.
pub fn check_valid_path(path: impl AsRef<Path>, format: Format) -> bool {
    match open(path.as_ref()) {
        Ok(mut reader) => format.check_valid(&mut reader),
        Err(err) => {
            log::debug!("{}", err);
            false
        }
    }
}
