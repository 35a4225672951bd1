//! Loaded word embeddings.

use std::iter::Zip;
use std::slice;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use ndarray::iter::AxisIter;

use crate::error::{ParseWarning, Result};
use crate::float::Float;
use crate::token::Token;
use crate::vocab::Vocab;

/// Word embeddings.
///
/// Row `i` of the embedding matrix is the vector of the token with
/// index `i` in the vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct Embeddings<T> {
    vocab: Vocab,
    matrix: Array2<T>,
}

impl<T> Embeddings<T>
where
    T: Float,
{
    /// Construct embeddings from a vocabulary and a matrix.
    ///
    /// Panics when the number of matrix rows differs from the
    /// vocabulary size.
    pub fn new(vocab: Vocab, matrix: Array2<T>) -> Self {
        assert_eq!(
            vocab.len(),
            matrix.nrows(),
            "Vocabulary and matrix sizes differ."
        );

        Embeddings { vocab, matrix }
    }

    /// Get the embedding dimensionality.
    pub fn dims(&self) -> usize {
        self.matrix.ncols()
    }

    /// Get the embedding of a token.
    pub fn embedding(&self, token: impl AsRef<[u8]>) -> Option<ArrayView1<T>> {
        self.vocab
            .idx(token)
            .map(|idx| self.matrix.index_axis(Axis(0), idx))
    }

    /// Iterate over tokens and their embeddings, in index order.
    pub fn iter(&self) -> Iter<T> {
        Iter {
            inner: self.vocab.tokens().iter().zip(self.matrix.outer_iter()),
        }
    }

    /// Get the number of embeddings.
    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    /// Get the embedding matrix.
    pub fn matrix(&self) -> ArrayView2<T> {
        self.matrix.view()
    }

    /// Get the vocabulary.
    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    /// Decompose into the vocabulary and the matrix.
    pub fn into_parts(self) -> (Vocab, Array2<T>) {
        (self.vocab, self.matrix)
    }
}

impl<'a, T> IntoIterator for &'a Embeddings<T>
where
    T: Float,
{
    type Item = (&'a Token, ArrayView1<'a, T>);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over embeddings.
pub struct Iter<'a, T> {
    inner: Zip<slice::Iter<'a, Token>, AxisIter<'a, T, ndarray::Ix1>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a Token, ArrayView1<'a, T>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Result of a full load.
///
/// Holds the embeddings and the warnings that were raised while
/// loading them.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded<T> {
    embeddings: Embeddings<T>,
    warnings: Vec<ParseWarning>,
}

impl<T> Loaded<T>
where
    T: Float,
{
    pub(crate) fn new(embeddings: Embeddings<T>, warnings: Vec<ParseWarning>) -> Self {
        Loaded {
            embeddings,
            warnings,
        }
    }

    pub fn embeddings(&self) -> &Embeddings<T> {
        &self.embeddings
    }

    /// Warnings raised during loading, in source order.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn into_parts(self) -> (Embeddings<T>, Vec<ParseWarning>) {
        (self.embeddings, self.warnings)
    }

    /// Get the embeddings, treating the first warning as an error.
    pub fn into_strict(self) -> Result<Embeddings<T>> {
        match self.warnings.into_iter().next() {
            Some(warning) => Err(warning.into()),
            None => Ok(self.embeddings),
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::{Embeddings, Loaded};
    use crate::error::{Error, ParseWarning};
    use crate::token::Token;
    use crate::vocab::Vocab;

    fn test_embeddings() -> Embeddings<f32> {
        let vocab = Vocab::new(vec![Token::from("the"), Token::from("日本語")]).unwrap();
        Embeddings::new(vocab, array![[1., 2.], [3., 4.]])
    }

    #[test]
    fn embedding_lookup() {
        let embeds = test_embeddings();
        assert_eq!(embeds.dims(), 2);
        assert_eq!(embeds.len(), 2);
        assert_eq!(embeds.embedding("日本語").unwrap(), array![3f32, 4.]);
        assert!(embeds.embedding("unknown").is_none());
    }

    #[test]
    fn iter_is_in_index_order() {
        let embeds = test_embeddings();
        let tokens: Vec<_> = embeds.iter().map(|(token, _)| token.to_string()).collect();
        assert_eq!(tokens, vec!["the", "日本語"]);
    }

    #[test]
    #[should_panic]
    fn new_checks_row_count() {
        let vocab = Vocab::new(vec![Token::from("the")]).unwrap();
        Embeddings::new(vocab, array![[1f32], [2.]]);
    }

    #[test]
    fn strict_rejects_warnings() {
        let warning = ParseWarning::DuplicateToken {
            token: Token::from("the"),
            line: 3,
            index: 0,
        };
        let loaded = Loaded::new(test_embeddings(), vec![warning]);
        assert!(matches!(loaded.into_strict(), Err(Error::Warning(_))));

        let loaded = Loaded::new(test_embeddings(), Vec::new());
        assert!(loaded.into_strict().is_ok());
    }
}
