//! A library for loading pretrained word embeddings.
//!
//! Two formats are supported: the GloVe text format, where each line
//! holds a token and its vector, and a numpy binary format that pairs
//! an NPY matrix header with a token table. Tokens are kept as raw
//! bytes, so files with tokens that are not valid UTF-8 load without
//! loss.
//!
//! A load either builds the full vocabulary (`io::load`) or only
//! picks out the vectors of a caller-supplied set of tokens
//! (`io::load_with_vocab`), which avoids building a vocabulary for
//! large embedding files.

pub mod config;

pub mod embeddings;

pub mod error;

pub mod float;

pub mod glove;

pub mod io;

pub mod numpy;

pub mod prelude;

pub(crate) mod record;

pub mod token;

pub mod vocab;
