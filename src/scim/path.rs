//! SCIM PATCH attribute paths.
//!
//! ```text
//! path    = [ schemaURI ":" ] segment [ "." segment ]
//! segment = ATTRNAME [ "[" valFilter "]" ]
//! ```
//!
//! A value filter may follow either segment: `emails[type eq "work"].value`
//! and `emails.value[type eq "work"]` describe the same target. Names are kept
//! as written; matching against schema definitions is case-insensitive and
//! happens during resolution.

use std::fmt;

use super::filter::{Filter, FilterParseError, parse_filter};

/// A parsed attribute path.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributePath {
    /// Schema URI prefix, if the path was fully qualified
    pub schema_uri: Option<String>,
    /// Attribute and optional sub-attribute (one or two entries)
    pub segments: Vec<PathSegment>,
}

/// One dotted component of an attribute path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub filter: Option<Filter>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
        }
    }

    pub fn filtered(name: impl Into<String>, filter: Filter) -> Self {
        Self {
            name: name.into(),
            filter: Some(filter),
        }
    }
}

impl AttributePath {
    /// The top-level attribute segment.
    pub fn attribute(&self) -> &PathSegment {
        &self.segments[0]
    }

    /// The sub-attribute segment, if the path addresses one.
    pub fn sub_attribute(&self) -> Option<&PathSegment> {
        self.segments.get(1)
    }

    /// The value filter, wherever it was written.
    pub fn filter(&self) -> Option<&Filter> {
        self.segments.iter().find_map(|s| s.filter.as_ref())
    }

    /// Dotted attribute names without filters (e.g., `emails.value`).
    pub fn dotted_names(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(uri) = &self.schema_uri {
            write!(f, "{}:", uri)?;
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            if let Some(filter) = &segment.filter {
                write!(f, "[{}]", filter)?;
            }
        }
        Ok(())
    }
}

/// Attribute path parsing error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathParseError {
    #[error("Empty path")]
    Empty,

    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },

    #[error("Expected attribute name at position {0}")]
    ExpectedName(usize),

    #[error("Unclosed '[' at position {0}")]
    UnclosedBracket(usize),

    #[error("Path '{0}' nests deeper than attribute.subAttribute")]
    TooDeep(String),

    #[error("Path '{0}' carries more than one value filter")]
    MultipleFilters(String),

    #[error("Invalid value filter: {0}")]
    Filter(#[from] FilterParseError),
}

/// Parse a PATCH attribute path.
///
/// # Examples
///
/// ```
/// use scim_patch::scim::path::parse_attribute_path;
///
/// let path = parse_attribute_path("name.familyName").unwrap();
/// assert_eq!(path.segments.len(), 2);
///
/// let path = parse_attribute_path("emails[type eq \"work\"].value").unwrap();
/// assert!(path.filter().is_some());
/// ```
pub fn parse_attribute_path(input: &str) -> Result<AttributePath, PathParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PathParseError::Empty);
    }

    // The schema URI ends at the last ':' before any value filter
    let head_end = input.find('[').unwrap_or(input.len());
    let (schema_uri, rest, offset) = match input[..head_end].rfind(':') {
        Some(colon) => {
            let uri = &input[..colon];
            if uri.is_empty() {
                return Err(PathParseError::UnexpectedChar {
                    found: ':',
                    position: colon,
                });
            }
            (Some(uri.to_string()), &input[colon + 1..], colon + 1)
        }
        None => (None, input, 0),
    };

    let mut cursor = Cursor {
        input: rest,
        position: 0,
        offset,
    };
    let mut segments = Vec::with_capacity(2);

    loop {
        let name = cursor.name()?;
        let filter = if cursor.eat('[') {
            Some(cursor.bracketed_filter()?)
        } else {
            None
        };
        segments.push(PathSegment { name, filter });

        match cursor.peek() {
            None => break,
            Some('.') => {
                cursor.advance();
                if segments.len() == 2 {
                    return Err(PathParseError::TooDeep(input.to_string()));
                }
            }
            Some(found) => {
                return Err(PathParseError::UnexpectedChar {
                    found,
                    position: cursor.absolute(),
                });
            }
        }
    }

    if segments.iter().filter(|s| s.filter.is_some()).count() > 1 {
        return Err(PathParseError::MultipleFilters(input.to_string()));
    }

    Ok(AttributePath {
        schema_uri,
        segments,
    })
}

struct Cursor<'a> {
    input: &'a str,
    position: usize,
    offset: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn absolute(&self) -> usize {
        self.offset + self.position
    }

    fn name(&mut self) -> Result<String, PathParseError> {
        let start = self.position;
        if !self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '$')
        {
            return Err(PathParseError::ExpectedName(self.absolute()));
        }
        self.advance();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            self.advance();
        }
        Ok(self.input[start..self.position].to_string())
    }

    /// Consume up to the ']' that closes the current filter, skipping over
    /// string literals, and parse the enclosed expression.
    fn bracketed_filter(&mut self) -> Result<Filter, PathParseError> {
        let input = self.input;
        let open = self.absolute() - 1;
        let start = self.position;
        let mut in_string = false;
        let mut escaped = false;
        let mut depth = 0usize;

        while let Some(c) = self.peek() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
            } else {
                match c {
                    '"' => in_string = true,
                    '[' => depth += 1,
                    ']' if depth == 0 => {
                        let body = &input[start..self.position];
                        let base = self.offset + start;
                        self.advance();
                        return parse_filter(body).map_err(|mut e| {
                            e.position += base;
                            PathParseError::Filter(e)
                        });
                    }
                    ']' => depth -= 1,
                    _ => {}
                }
            }
            self.advance();
        }

        Err(PathParseError::UnclosedBracket(open))
    }
}
