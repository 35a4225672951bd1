//! Token to row index mappings.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use fnv::FnvHashMap;

use crate::error::{Error, Result};
use crate::token::Token;

/// Vocabulary of loaded embeddings.
///
/// Maps every token to a unique row of the embedding matrix. The
/// indices of a vocabulary are always `0..len()`, in the order in
/// which the tokens were first encountered.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Vocab {
    indices: FnvHashMap<Token, usize>,
    tokens: Vec<Token>,
}

impl Vocab {
    /// Construct a vocabulary from a list of tokens.
    ///
    /// Tokens are assigned indices in the given order. Fails when a
    /// token occurs more than once.
    pub fn new(tokens: impl Into<Vec<Token>>) -> Result<Self> {
        let tokens = tokens.into();
        let mut indices = FnvHashMap::default();
        indices.reserve(tokens.len());

        for (idx, token) in tokens.iter().enumerate() {
            if indices.insert(token.clone(), idx).is_some() {
                return Err(Error::Format(format!(
                    "Vocabulary contains duplicate token '{}'",
                    token
                )));
            }
        }

        Ok(Vocab { indices, tokens })
    }

    /// Get the index of a token.
    pub fn idx(&self, token: impl AsRef<[u8]>) -> Option<usize> {
        self.indices.get(token.as_ref()).cloned()
    }

    /// Check whether the vocabulary contains a token.
    pub fn contains(&self, token: impl AsRef<[u8]>) -> bool {
        self.indices.contains_key(token.as_ref())
    }

    /// Get the vocabulary size.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Get the tokens in index order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Insert a token if it is not in the vocabulary yet.
    ///
    /// Returns the index of the token and whether it was newly
    /// inserted. Tokens that are already present keep their index.
    pub(crate) fn insert_if_absent(&mut self, token: &[u8]) -> (usize, bool) {
        if let Some(&idx) = self.indices.get(token) {
            return (idx, false);
        }

        let idx = self.tokens.len();
        let token = Token::from(token);
        self.indices.insert(token.clone(), idx);
        self.tokens.push(token);

        (idx, true)
    }
}

/// Mapping from tokens to output rows.
///
/// Filtered loads consult a `RowLookup` to decide whether a token
/// from the source should be kept and in which row of the output
/// matrix its vector goes. Rows do not have to be dense.
pub trait RowLookup {
    /// Get the output row of a token, `None` if the token is not wanted.
    fn row(&self, token: &[u8]) -> Option<usize>;

    /// Number of rows required to hold every mapped token.
    fn n_rows(&self) -> usize;
}

impl<K, S> RowLookup for HashMap<K, usize, S>
where
    K: Borrow<[u8]> + Eq + Hash,
    S: BuildHasher,
{
    fn row(&self, token: &[u8]) -> Option<usize> {
        self.get(token).cloned()
    }

    fn n_rows(&self) -> usize {
        self.values().max().map(|&row| row + 1).unwrap_or(0)
    }
}

impl<K> RowLookup for BTreeMap<K, usize>
where
    K: Borrow<[u8]> + Ord,
{
    fn row(&self, token: &[u8]) -> Option<usize> {
        self.get(token).cloned()
    }

    fn n_rows(&self) -> usize {
        self.values().max().map(|&row| row + 1).unwrap_or(0)
    }
}

impl RowLookup for Vocab {
    fn row(&self, token: &[u8]) -> Option<usize> {
        self.idx(token)
    }

    fn n_rows(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use maplit::{btreemap, hashmap};

    use super::{RowLookup, Vocab};
    use crate::token::Token;

    fn test_vocab() -> Vocab {
        Vocab::new(vec![
            Token::from("this"),
            Token::from("is"),
            Token::from("a"),
            Token::from("test"),
        ])
        .unwrap()
    }

    #[test]
    fn indices_follow_token_order() {
        let vocab = test_vocab();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.idx("this"), Some(0));
        assert_eq!(vocab.idx(b"test"), Some(3));
        assert_eq!(vocab.idx("nope"), None);
    }

    #[test]
    fn rejects_duplicate_tokens() {
        assert!(Vocab::new(vec![Token::from("a"), Token::from("a")]).is_err());
    }

    #[test]
    fn insert_keeps_first_index() {
        let mut vocab = Vocab::default();
        assert_eq!(vocab.insert_if_absent(b"the"), (0, true));
        assert_eq!(vocab.insert_if_absent(b","), (1, true));
        assert_eq!(vocab.insert_if_absent(b"the"), (0, false));
        assert_eq!(vocab.tokens(), &[Token::from("the"), Token::from(",")]);
    }

    #[test]
    fn sparse_mapping_needs_rows_up_to_largest_index() {
        let lookup: HashMap<Token, usize> = hashmap! {
            Token::from("the") => 5,
            Token::from("a") => 1,
        };
        assert_eq!(lookup.n_rows(), 6);
        assert_eq!(lookup.row(b"the"), Some(5));
        assert_eq!(lookup.row(b"b"), None);

        let lookup: BTreeMap<Vec<u8>, usize> = btreemap! { b"x".to_vec() => 0 };
        assert_eq!(lookup.n_rows(), 1);
        assert_eq!(HashMap::<Token, usize>::new().n_rows(), 0);
    }

    #[test]
    fn vocab_is_a_dense_lookup() {
        let vocab = test_vocab();
        assert_eq!(RowLookup::row(&vocab, b"a"), Some(2));
        assert_eq!(vocab.n_rows(), 4);
    }
}
