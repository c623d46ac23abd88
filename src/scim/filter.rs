//! SCIM 2.0 Value Filter Parser
//!
//! Parses the value-selection filters that appear inside PATCH paths
//! (`emails[type eq "work"]`) per RFC 7644 Section 3.4.2 and 3.5.2.
//!
//! ## Grammar (simplified)
//!
//! ```text
//! filter     = logExpr
//! logExpr    = andExpr { "or" andExpr }
//! andExpr    = notExpr { "and" notExpr }
//! notExpr    = "not" "(" filter ")" | "(" filter ")" | attrExpr
//! attrExpr   = ATTRNAME "pr" | ATTRNAME compareOp compValue
//! compareOp  = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! compValue  = "true" | "false" | "null" | INTEGER | DECIMAL | STRING
//! ```
//!
//! Attribute names inside a value filter are relative to the element being
//! filtered, so they never carry a sub-attribute or a nested filter.
//!
//! ## Security Limits
//!
//! - Maximum filter length: 4096 bytes
//! - Maximum nesting depth: 32 levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum allowed length of a filter expression (bytes).
pub const MAX_FILTER_LENGTH: usize = 4096;

/// Maximum allowed nesting depth of a filter expression.
///
/// Bounds recursion for inputs like `not (not (not (...)))`.
pub const MAX_FILTER_DEPTH: usize = 32;

/// A parsed value filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute comparison (e.g., `type eq "work"`)
    Compare {
        attr: String,
        op: CompareOp,
        value: FilterValue,
    },
    /// Attribute presence check (e.g., `display pr`)
    Present { attr: String },
    /// Logical AND of two filters
    And(Box<Filter>, Box<Filter>),
    /// Logical OR of two filters
    Or(Box<Filter>, Box<Filter>),
    /// Logical NOT of a filter
    Not(Box<Filter>),
}

impl Filter {
    /// Names of every attribute referenced by this filter, in order of appearance.
    pub fn referenced_attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Filter::Compare { attr, .. } | Filter::Present { attr } => names.push(attr),
            Filter::And(left, right) | Filter::Or(left, right) => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            Filter::Not(inner) => inner.collect_attributes(names),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { attr, op, value } => write!(f, "{} {} {}", attr, op, value),
            Filter::Present { attr } => write!(f, "{} pr", attr),
            Filter::And(left, right) => write!(f, "({} and {})", left, right),
            Filter::Or(left, right) => write!(f, "({} or {})", left, right),
            Filter::Not(inner) => write!(f, "not ({})", inner),
        }
    }
}

/// Comparison operators per RFC 7644.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Contains
    Co,
    /// Starts with
    Sw,
    /// Ends with
    Ew,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Co => "co",
            CompareOp::Sw => "sw",
            CompareOp::Ew => "ew",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        };
        write!(f, "{}", s)
    }
}

impl CompareOp {
    fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

/// Filter comparison literals.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Null,
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Integer(n) => write!(f, "{}", n),
            FilterValue::Decimal(n) => write!(f, "{}", n),
            FilterValue::Null => write!(f, "null"),
        }
    }
}

/// Filter parsing error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct FilterParseError {
    pub message: String,
    pub position: usize,
}

/// Parse a value filter expression.
///
/// # Errors
///
/// Returns an error if:
/// - The filter exceeds [`MAX_FILTER_LENGTH`] bytes
/// - The filter exceeds [`MAX_FILTER_DEPTH`] nesting levels
/// - The filter has invalid syntax
///
/// # Examples
///
/// ```
/// use scim_patch::scim::filter::parse_filter;
///
/// let filter = parse_filter("type eq \"work\"").unwrap();
/// let filter = parse_filter("numberArray co 5 or number eq 1").unwrap();
/// ```
pub fn parse_filter(input: &str) -> Result<Filter, FilterParseError> {
    if input.len() > MAX_FILTER_LENGTH {
        return Err(FilterParseError {
            message: format!(
                "Filter exceeds maximum length ({} bytes, max {})",
                input.len(),
                MAX_FILTER_LENGTH
            ),
            position: 0,
        });
    }

    let mut parser = Parser::new(input);
    let filter = parser.parse_filter()?;

    // Ensure we consumed all input
    parser.skip_whitespace();
    if parser.position < parser.input.len() {
        return Err(FilterParseError {
            message: format!("Unexpected input: '{}'", &parser.input[parser.position..]),
            position: parser.position,
        });
    }

    Ok(filter)
}

// =============================================================================
// Parser Implementation
// =============================================================================

struct Parser<'a> {
    input: &'a str,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            depth: 0,
        }
    }

    /// Enter a nested scope (parentheses).
    fn enter_scope(&mut self) -> Result<(), FilterParseError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterParseError {
                message: format!(
                    "Filter exceeds maximum nesting depth ({})",
                    MAX_FILTER_DEPTH
                ),
                position: self.position,
            });
        }
        Ok(())
    }

    fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn parse_filter(&mut self) -> Result<Filter, FilterParseError> {
        self.parse_or_expr()
    }

    // logExpr = andExpr { "or" andExpr }
    fn parse_or_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_and_expr()?;

        while self.try_keyword("or") {
            let right = self.parse_and_expr()?;
            left = Filter::Or(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // andExpr = notExpr { "and" notExpr }
    fn parse_and_expr(&mut self) -> Result<Filter, FilterParseError> {
        let mut left = self.parse_not_expr()?;

        while self.try_keyword("and") {
            let right = self.parse_not_expr()?;
            left = Filter::And(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    // notExpr = "not" "(" filter ")" | "(" filter ")" | attrExpr
    fn parse_not_expr(&mut self) -> Result<Filter, FilterParseError> {
        self.skip_whitespace();

        if self.try_keyword("not") {
            self.skip_whitespace();
            if !self.try_char('(') {
                return Err(FilterParseError {
                    message: "Expected '(' after 'not'".to_string(),
                    position: self.position,
                });
            }
            let inner = self.parse_group()?;
            return Ok(Filter::Not(Box::new(inner)));
        }

        if self.try_char('(') {
            return self.parse_group();
        }

        self.parse_attr_expr()
    }

    /// Parse the body of a parenthesized group; the opening '(' is consumed.
    fn parse_group(&mut self) -> Result<Filter, FilterParseError> {
        self.enter_scope()?;
        let inner = self.parse_filter()?;
        self.exit_scope();
        self.skip_whitespace();
        if !self.try_char(')') {
            return Err(FilterParseError {
                message: "Expected ')' to close grouped expression".to_string(),
                position: self.position,
            });
        }
        Ok(inner)
    }

    // attrExpr = ATTRNAME "pr" | ATTRNAME compareOp compValue
    fn parse_attr_expr(&mut self) -> Result<Filter, FilterParseError> {
        let attr = self.parse_attr_name()?;

        if self.peek() == Some('[') || self.peek() == Some('.') {
            return Err(FilterParseError {
                message: format!(
                    "Attribute '{}' in a value filter must be a plain sub-attribute name",
                    attr
                ),
                position: self.position,
            });
        }

        if self.try_keyword("pr") {
            return Ok(Filter::Present { attr });
        }

        let op = self.parse_compare_op()?;
        let value = self.parse_value()?;

        Ok(Filter::Compare { attr, op, value })
    }

    fn parse_attr_name(&mut self) -> Result<String, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;

        // Attribute names start with a letter; `$ref` is the one reserved exception
        if !self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '$')
        {
            return Err(FilterParseError {
                message: "Expected attribute name".to_string(),
                position: self.position,
            });
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

    fn parse_compare_op(&mut self) -> Result<CompareOp, FilterParseError> {
        self.skip_whitespace();

        let start = self.position;

        // Operators are exactly two letters
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) && self.position - start < 2 {
            self.advance();
        }

        let op_str = &self.input[start..self.position];

        CompareOp::from_str(op_str).ok_or_else(|| FilterParseError {
            message: format!("Unknown operator: '{}'", op_str),
            position: start,
        })
    }

    fn parse_value(&mut self) -> Result<FilterValue, FilterParseError> {
        self.skip_whitespace();

        if self.peek() == Some('"') {
            return self.parse_string_value();
        }

        if self.try_keyword("true") {
            return Ok(FilterValue::Bool(true));
        }
        if self.try_keyword("false") {
            return Ok(FilterValue::Bool(false));
        }
        if self.try_keyword("null") {
            return Ok(FilterValue::Null);
        }

        if self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+')
        {
            return self.parse_number_value();
        }

        Err(FilterParseError {
            message: "Expected value (string, boolean, number, or null)".to_string(),
            position: self.position,
        })
    }

    fn parse_string_value(&mut self) -> Result<FilterValue, FilterParseError> {
        if !self.try_char('"') {
            return Err(FilterParseError {
                message: "Expected '\"' to start string".to_string(),
                position: self.position,
            });
        }

        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(FilterParseError {
                        message: "Unterminated string".to_string(),
                        position: self.position,
                    });
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.peek() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        _ => {
                            return Err(FilterParseError {
                                message: "Invalid escape sequence".to_string(),
                                position: self.position,
                            });
                        }
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        Ok(FilterValue::String(value))
    }

    fn parse_number_value(&mut self) -> Result<FilterValue, FilterParseError> {
        let start = self.position;
        let mut is_decimal = false;

        if self.peek() == Some('-') || self.peek() == Some('+') {
            self.advance();
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') {
            is_decimal = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            is_decimal = true;
            self.advance();
            if self.peek() == Some('-') || self.peek() == Some('+') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.position];
        let invalid = || FilterParseError {
            message: format!("Invalid number: '{}'", num_str),
            position: start,
        };

        if !is_decimal && let Ok(n) = num_str.trim_start_matches('+').parse::<i64>() {
            return Ok(FilterValue::Integer(n));
        }

        num_str
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(FilterValue::Decimal)
            .ok_or_else(invalid)
    }

    // Helper methods

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.position += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn try_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();

        let remaining = &self.input[self.position..];

        // Case-insensitive comparison
        if remaining.len() >= keyword.len()
            && remaining.is_char_boundary(keyword.len())
            && remaining[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            // Make sure keyword is not part of a larger identifier
            let after_keyword = remaining[keyword.len()..].chars().next();
            if after_keyword.is_none_or(|c| !c.is_ascii_alphanumeric()) {
                self.position += keyword.len();
                return true;
            }
        }

        false
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_equality() {
        let filter = parse_filter("type eq \"work\"").unwrap();
        match filter {
            Filter::Compare { attr, op, value } => {
                assert_eq!(attr, "type");
                assert_eq!(op, CompareOp::Eq);
                assert_eq!(value, FilterValue::String("work".to_string()));
            }
            _ => panic!("Expected Compare filter"),
        }
    }

    #[test]
    fn test_boolean_and_null_values() {
        let filter = parse_filter("primary eq true").unwrap();
        assert!(matches!(
            filter,
            Filter::Compare {
                value: FilterValue::Bool(true),
                ..
            }
        ));

        let filter = parse_filter("display eq null").unwrap();
        assert!(matches!(
            filter,
            Filter::Compare {
                value: FilterValue::Null,
                ..
            }
        ));
    }

    #[test]
    fn test_integer_and_decimal_values() {
        let filter = parse_filter("number eq 5").unwrap();
        match filter {
            Filter::Compare { value, .. } => assert_eq!(value, FilterValue::Integer(5)),
            _ => panic!("Expected Compare filter"),
        }

        let filter = parse_filter("decimal le -5.5").unwrap();
        match filter {
            Filter::Compare { value, .. } => assert_eq!(value, FilterValue::Decimal(-5.5)),
            _ => panic!("Expected Compare filter"),
        }

        let filter = parse_filter("decimal gt 1e3").unwrap();
        match filter {
            Filter::Compare { value, .. } => assert_eq!(value, FilterValue::Decimal(1000.0)),
            _ => panic!("Expected Compare filter"),
        }
    }

    #[test]
    fn test_presence_operator() {
        let filter = parse_filter("display pr").unwrap();
        match filter {
            Filter::Present { attr } => assert_eq!(attr, "display"),
            _ => panic!("Expected Present filter"),
        }
    }

    #[test]
    fn test_reference_attribute_name() {
        let filter = parse_filter("$ref sw \"https://\"").unwrap();
        match filter {
            Filter::Compare { attr, op, .. } => {
                assert_eq!(attr, "$ref");
                assert_eq!(op, CompareOp::Sw);
            }
            _ => panic!("Expected Compare filter"),
        }
    }

    #[test]
    fn test_logical_or_of_array_comparisons() {
        let filter = parse_filter("numberArray co 5 or numberArray eq 1").unwrap();
        match filter {
            Filter::Or(left, right) => {
                assert!(matches!(left.as_ref(), Filter::Compare { op: CompareOp::Co, .. }));
                assert!(matches!(right.as_ref(), Filter::Compare { op: CompareOp::Eq, .. }));
            }
            _ => panic!("Expected Or filter"),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let filter = parse_filter("a eq 1 or b eq 2 and c eq 3").unwrap();
        match filter {
            Filter::Or(_, right) => assert!(matches!(right.as_ref(), Filter::And(_, _))),
            _ => panic!("Expected Or at the root"),
        }
    }

    #[test]
    fn test_not_operator() {
        let filter = parse_filter("not (primary eq false)").unwrap();
        match filter {
            Filter::Not(inner) => match inner.as_ref() {
                Filter::Compare { attr, .. } => assert_eq!(attr, "primary"),
                _ => panic!("Expected Compare inside Not"),
            },
            _ => panic!("Expected Not filter"),
        }
    }

    #[test]
    fn test_grouped_expression() {
        let filter = parse_filter("(a eq \"1\" or b eq \"2\") and c eq \"3\"").unwrap();
        match filter {
            Filter::And(left, right) => {
                assert!(matches!(left.as_ref(), Filter::Or(_, _)));
                match right.as_ref() {
                    Filter::Compare { attr, .. } => assert_eq!(attr, "c"),
                    _ => panic!("Expected Compare"),
                }
            }
            _ => panic!("Expected And filter"),
        }
    }

    #[test]
    fn test_case_insensitive_operators() {
        let filter = parse_filter("type EQ \"work\"").unwrap();
        assert!(matches!(filter, Filter::Compare { op: CompareOp::Eq, .. }));

        let filter = parse_filter("primary EQ TRUE AND value SW \"j\"").unwrap();
        assert!(matches!(filter, Filter::And(_, _)));
    }

    #[test]
    fn test_all_comparison_operators() {
        let ops = [
            ("eq", CompareOp::Eq),
            ("ne", CompareOp::Ne),
            ("co", CompareOp::Co),
            ("sw", CompareOp::Sw),
            ("ew", CompareOp::Ew),
            ("gt", CompareOp::Gt),
            ("ge", CompareOp::Ge),
            ("lt", CompareOp::Lt),
            ("le", CompareOp::Le),
        ];

        for (op_str, expected_op) in ops {
            let filter_str = format!("attr {} \"value\"", op_str);
            let filter = parse_filter(&filter_str).unwrap();
            match filter {
                Filter::Compare { op, .. } => {
                    assert_eq!(op, expected_op, "Failed for operator: {}", op_str);
                }
                _ => panic!("Expected Compare filter for operator: {}", op_str),
            }
        }
    }

    #[test]
    fn test_escaped_string() {
        let filter = parse_filter(r#"display eq "John \"Doe\" \\ done""#).unwrap();
        match filter {
            Filter::Compare { value, .. } => {
                assert_eq!(
                    value,
                    FilterValue::String("John \"Doe\" \\ done".to_string())
                );
            }
            _ => panic!("Expected Compare filter"),
        }
    }

    #[test]
    fn test_error_invalid_operator() {
        let err = parse_filter("type xx \"work\"").unwrap_err();
        assert!(err.message.contains("Unknown operator"));
        assert_eq!(err.position, 5);
    }

    #[test]
    fn test_error_unterminated_string() {
        let err = parse_filter("type eq \"work").unwrap_err();
        assert!(err.message.contains("Unterminated string"));
    }

    #[test]
    fn test_error_missing_value() {
        assert!(parse_filter("type eq").is_err());
    }

    #[test]
    fn test_error_unexpected_input() {
        let err = parse_filter("type eq \"work\" extra").unwrap_err();
        assert!(err.message.contains("Unexpected input"));
    }

    #[test]
    fn test_error_nested_attribute_path() {
        let err = parse_filter("name.familyName eq \"Doe\"").unwrap_err();
        assert!(err.message.contains("plain sub-attribute name"));

        let err = parse_filter("emails[type eq \"work\"] pr").unwrap_err();
        assert!(err.message.contains("plain sub-attribute name"));
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let filter = parse_filter("value eq \"a\\\"b\" and primary pr").unwrap();
        let display = filter.to_string();
        assert_eq!(parse_filter(&display).unwrap(), filter);
    }

    #[test]
    fn test_referenced_attributes() {
        let filter = parse_filter("type eq \"work\" or not (primary pr)").unwrap();
        assert_eq!(filter.referenced_attributes(), vec!["type", "primary"]);
    }

    #[test]
    fn test_whitespace_handling() {
        let filter = parse_filter("  type   eq   \"work\"  ").unwrap();
        assert!(matches!(filter, Filter::Compare { ref attr, .. } if attr == "type"));
    }

    // =========================================================================
    // Complexity Limit Tests
    // =========================================================================

    #[test]
    fn test_filter_at_max_length() {
        let prefix = "a eq \"";
        let suffix = "\"";
        let padding_needed = MAX_FILTER_LENGTH - prefix.len() - suffix.len();
        let filter_str = format!("{}{}{}", prefix, "x".repeat(padding_needed), suffix);

        assert_eq!(filter_str.len(), MAX_FILTER_LENGTH);
        assert!(parse_filter(&filter_str).is_ok());
    }

    #[test]
    fn test_filter_exceeds_max_length() {
        let prefix = "a eq \"";
        let suffix = "\"";
        let padding_needed = MAX_FILTER_LENGTH - prefix.len() - suffix.len() + 1;
        let filter_str = format!("{}{}{}", prefix, "x".repeat(padding_needed), suffix);

        let err = parse_filter(&filter_str).unwrap_err();
        assert!(
            err.message.contains("maximum length"),
            "Error should mention maximum length: {}",
            err.message
        );
    }

    #[test]
    fn test_filter_at_max_depth_with_not() {
        let mut filter_str = "a pr".to_string();
        for _ in 0..MAX_FILTER_DEPTH {
            filter_str = format!("not ({})", filter_str);
        }

        let result = parse_filter(&filter_str);
        assert!(
            result.is_ok(),
            "Filter at max depth should parse successfully: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_filter_exceeds_max_depth_with_groups() {
        let mut filter_str = "a pr".to_string();
        for _ in 0..=MAX_FILTER_DEPTH {
            filter_str = format!("({})", filter_str);
        }

        let err = parse_filter(&filter_str).unwrap_err();
        assert!(
            err.message.contains("maximum nesting depth"),
            "Error should mention maximum nesting depth: {}",
            err.message
        );
    }

    #[test]
    fn test_zero_length_and_whitespace_filter() {
        assert!(parse_filter("").is_err());
        assert!(parse_filter("   ").is_err());
    }
}
