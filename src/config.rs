//! Loader configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::io::Format;

/// Options that control a load.
///
/// Options can be constructed in code or read from TOML:
///
/// ```
/// use word_embedding_loader::config::LoadOptions;
/// use word_embedding_loader::io::Format;
///
/// let options = LoadOptions::from_toml(r#"
/// format = "glove"
/// max_vocab = 50000
/// "#).unwrap();
///
/// assert_eq!(options.format, Some(Format::Glove));
/// assert_eq!(options.max_vocab, Some(50000));
/// assert!(!options.strict);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Format of the source, detected when `None`.
    pub format: Option<Format>,

    /// Read at most this many records from the source.
    pub max_vocab: Option<usize>,

    /// Abort the load on the first warning.
    pub strict: bool,
}

impl LoadOptions {
    /// Read options from a TOML document.
    pub fn from_toml(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_max_vocab(mut self, max_vocab: usize) -> Self {
        self.max_vocab = Some(max_vocab);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Check whether another record may be read after `n_records`.
    pub(crate) fn admits(&self, n_records: usize) -> bool {
        self.max_vocab.map(|max| n_records < max).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::LoadOptions;
    use crate::error::Error;
    use crate::io::Format;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(LoadOptions::from_toml("").unwrap(), LoadOptions::default());
    }

    #[test]
    fn reads_all_fields() {
        let options = LoadOptions::from_toml(
            r#"
format = "numpy"
max_vocab = 2
strict = true
"#,
        )
        .unwrap();

        assert_eq!(
            options,
            LoadOptions::default()
                .with_format(Format::Numpy)
                .with_max_vocab(2)
                .with_strict(true)
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(matches!(
            LoadOptions::from_toml("dtype = \"float16\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn max_vocab_limits_records() {
        let options = LoadOptions::default().with_max_vocab(2);
        assert!(options.admits(1));
        assert!(!options.admits(2));
        assert!(LoadOptions::default().admits(usize::MAX - 1));
    }
}
