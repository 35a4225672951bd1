//! Prelude exports the most commonly-used types and functions.

pub use crate::config::LoadOptions;

pub use crate::embeddings::{Embeddings, Loaded};

pub use crate::error::{Error, ParseWarning, Result};

pub use crate::float::Float;

pub use crate::io::{
    check_valid, check_valid_path, load, load_path, load_with_vocab, load_with_vocab_into,
    load_with_vocab_path, Format,
};

pub use crate::token::Token;

pub use crate::vocab::{RowLookup, Vocab};
