//! Vocabulary keys and splitting of text records.
//!
//! Embedding files may contain tokens that are not valid UTF-8, so
//! tokens are kept as raw byte strings. They are never decoded,
//! normalized or case-folded.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::str;

use crate::error::{Error, Result};
use crate::float::Float;

/// Opaque, immutable vocabulary key.
///
/// Equality, ordering and hashing are byte-exact.
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Token(Box<[u8]>);

impl Token {
    /// Get the bytes of the token.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the token as a string, if it is valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.0
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Token {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Token {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Token {
    fn from(bytes: &[u8]) -> Self {
        Token(bytes.into())
    }
}

impl From<Vec<u8>> for Token {
    fn from(bytes: Vec<u8>) -> Self {
        Token(bytes.into_boxed_slice())
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token(s.as_bytes().into())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::from(s.into_bytes())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token")
            .field(&String::from_utf8_lossy(&self.0))
            .finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Strip surrounding ASCII whitespace (including `\r\n`) from a line.
pub(crate) fn trim_ascii(mut line: &[u8]) -> &[u8] {
    while let Some((first, rest)) = line.split_first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }

    while let Some((last, rest)) = line.split_last() {
        if !last.is_ascii_whitespace() {
            break;
        }
        line = rest;
    }

    line
}

/// Split a trimmed line into its token and its vector components.
///
/// The token is the run of bytes up to the first ASCII space, the
/// components are separated by runs of ASCII whitespace. Multi-byte
/// sequences in the token are left untouched.
pub(crate) fn split_line(line: &[u8]) -> (&[u8], Fields) {
    match line.iter().position(|&b| b == b' ') {
        Some(idx) => (&line[..idx], Fields(&line[idx + 1..])),
        None => (line, Fields(&[])),
    }
}

/// Iterator over the whitespace-separated fields of a line.
#[derive(Clone, Debug)]
pub(crate) struct Fields<'a>(&'a [u8]);

impl<'a> Iterator for Fields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.0.iter().position(|b| !b.is_ascii_whitespace())?;
        let rest = &self.0[start..];
        let end = rest
            .iter()
            .position(u8::is_ascii_whitespace)
            .unwrap_or_else(|| rest.len());
        self.0 = &rest[end..];
        Some(&rest[..end])
    }
}

/// Parse a single base-10 floating point field.
pub(crate) fn parse_component<T>(field: &[u8], line: usize) -> Result<T>
where
    T: Float,
{
    // Non-UTF-8 bytes can never form a float literal, the lossy string
    // is only used in the error message.
    let field_str = str::from_utf8(field).unwrap_or("");
    field_str.parse().map_err(|error| Error::Component {
        line,
        field: String::from_utf8_lossy(field).into_owned(),
        error,
    })
}

/// Parse all fields into `components`, replacing its contents.
///
/// Returns the number of components.
pub(crate) fn parse_components<T>(
    fields: Fields,
    line: usize,
    components: &mut Vec<T>,
) -> Result<usize>
where
    T: Float,
{
    components.clear();
    for field in fields {
        components.push(parse_component(field, line)?);
    }

    Ok(components.len())
}

#[cfg(test)]
mod tests {
    use super::{parse_components, split_line, trim_ascii, Token};
    use crate::error::Error;

    #[test]
    fn token_is_not_split_inside_multibyte_sequence() {
        let line = "日本語 0.15164 0.30177".as_bytes();
        let (token, fields) = split_line(line);
        assert_eq!(token, "日本語".as_bytes());
        assert_eq!(fields.collect::<Vec<_>>(), vec![&b"0.15164"[..], &b"0.30177"[..]]);
    }

    #[test]
    fn token_may_contain_invalid_utf8() {
        let line = b"zee\xc3n 1.0";
        let (token, _) = split_line(line);
        let token = Token::from(token);
        assert_eq!(token.as_bytes(), b"zee\xc3n");
        assert!(token.to_str().is_none());
        assert_eq!(token.to_string(), "zee\u{fffd}n");
    }

    #[test]
    fn trims_indentation_and_line_endings() {
        assert_eq!(trim_ascii(b"    , 0.1 0.2\r\n"), b", 0.1 0.2");
        assert_eq!(trim_ascii(b" \t\n"), b"");
    }

    #[test]
    fn fields_skip_runs_of_whitespace() {
        let (_, fields) = split_line(b"the 1  2\t3");
        let mut components = Vec::new();
        assert_eq!(parse_components::<f32>(fields, 1, &mut components).unwrap(), 3);
        assert_eq!(components, vec![1., 2., 3.]);
    }

    #[test]
    fn accepts_sign_and_exponent() {
        let (_, fields) = split_line(b"x -0.5 +1.25 3e-2 1E2");
        let mut components = Vec::new();
        parse_components::<f64>(fields, 1, &mut components).unwrap();
        assert_eq!(components, vec![-0.5, 1.25, 0.03, 100.]);
    }

    #[test]
    fn token_only_line_has_no_fields() {
        let (token, mut fields) = split_line(b"lonely");
        assert_eq!(token, b"lonely");
        assert!(fields.next().is_none());
    }

    #[test]
    fn invalid_component_is_fatal() {
        let (_, fields) = split_line(b"the 0.1 zero 0.3");
        let mut components = Vec::<f32>::new();
        match parse_components(fields, 7, &mut components) {
            Err(Error::Component { line, field, .. }) => {
                assert_eq!(line, 7);
                assert_eq!(field, "zero");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
