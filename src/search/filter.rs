//! SCIM filter syntax parser and evaluator (RFC 7644 Section 3.4.2.2).
//!
//! A recursive descent parser produces a [`FilterExpr`] which is evaluated
//! directly against rendered JSON resources.

use crate::error::{ScimError, ScimResult};
use crate::schema::Schema;
use serde_json::Value;
use std::cmp::Ordering;

/// SCIM filter comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    /// Present (not null)
    Pr,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
}

impl CompareOp {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "co" => Some(CompareOp::Co),
            "sw" => Some(CompareOp::Sw),
            "ew" => Some(CompareOp::Ew),
            "pr" => Some(CompareOp::Pr),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            _ => None,
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// `[schemaUrn:]attribute[.subAttribute]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    pub schema_urn: Option<String>,
    pub attribute: String,
    pub sub_attribute: Option<String>,
}

impl AttributePath {
    /// Parse a bare attribute path, as used by `sortBy` and PATCH paths.
    pub fn parse(input: &str) -> ScimResult<Self> {
        let input = input.trim();
        let (schema_urn, rest) = match input.rfind(':') {
            Some(idx) => (Some(input[..idx].to_string()), &input[idx + 1..]),
            None => (None, input),
        };

        let mut parts = rest.split('.');
        let attribute = parts.next().unwrap_or_default().to_string();
        let sub_attribute = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(ScimError::InvalidFilter(format!(
                "Attribute path '{}' is nested too deeply",
                input
            )));
        }

        for name in std::iter::once(&attribute).chain(sub_attribute.iter()) {
            if !is_attribute_name(name) {
                return Err(ScimError::InvalidFilter(format!(
                    "Invalid attribute name '{}' in '{}'",
                    name, input
                )));
            }
        }

        Ok(Self {
            schema_urn,
            attribute,
            sub_attribute,
        })
    }

    /// Whether `string` comparisons on this path are case-sensitive.
    pub fn case_exact(&self, schema: Option<&Schema>) -> bool {
        let Some(attr) = schema.and_then(|s| s.attribute(&self.attribute)) else {
            return false;
        };
        match &self.sub_attribute {
            Some(sub) => attr.sub_attribute(sub).map(|s| s.case_exact).unwrap_or(false),
            None if !attr.sub_attributes.is_empty() => attr
                .sub_attribute("value")
                .map(|s| s.case_exact)
                .unwrap_or(false),
            None => attr.case_exact,
        }
    }

    /// All values this path selects in `resource`.
    ///
    /// Multi-valued attributes contribute one value per element. A path that
    /// names a complex multi-valued attribute without a sub-attribute selects
    /// each element's `value`.
    pub fn values<'a>(&self, resource: &'a Value) -> Vec<&'a Value> {
        let Some(top) = get_case_insensitive(resource, &self.attribute) else {
            return Vec::new();
        };

        let elements: Vec<&Value> = match top {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        elements
            .into_iter()
            .filter_map(|element| match (&self.sub_attribute, element) {
                (Some(sub), Value::Object(_)) => get_case_insensitive(element, sub),
                (Some(_), _) => None,
                (None, Value::Object(_)) if top.is_array() => get_case_insensitive(element, "value"),
                (None, other) => Some(other),
            })
            .filter(|v| !v.is_null())
            .collect()
    }

    /// Sort key: the primary element of a multi-valued attribute, otherwise the
    /// first selected value.
    pub fn sort_value<'a>(&self, resource: &'a Value) -> Option<&'a Value> {
        if let Some(Value::Array(items)) = get_case_insensitive(resource, &self.attribute) {
            let primary = items.iter().find(|item| {
                get_case_insensitive(item, "primary")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            });
            if let Some(primary) = primary {
                let single = AttributePath {
                    schema_urn: None,
                    attribute: self.sub_attribute.clone().unwrap_or_else(|| "value".to_string()),
                    sub_attribute: None,
                };
                return single.values(primary).into_iter().next();
            }
        }
        self.values(resource).into_iter().next()
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(urn) = &self.schema_urn {
            write!(f, "{}:", urn)?;
        }
        f.write_str(&self.attribute)?;
        if let Some(sub) = &self.sub_attribute {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Comparison expression: attribute op value
    Compare {
        path: AttributePath,
        op: CompareOp,
        value: Option<Value>,
    },
    /// Logical expression: left AND/OR right
    Logical {
        left: Box<FilterExpr>,
        op: LogicalOp,
        right: Box<FilterExpr>,
    },
    /// Negation: NOT expression
    Not(Box<FilterExpr>),
    /// Grouped expression: (expression)
    Group(Box<FilterExpr>),
}

impl FilterExpr {
    /// Parse a complete filter string.
    pub fn parse(input: &str) -> ScimResult<Self> {
        FilterParser::new(input).parse()
    }

    /// Evaluate against a rendered resource.
    pub fn matches(&self, resource: &Value, schema: Option<&Schema>) -> bool {
        match self {
            FilterExpr::Compare { path, op, value } => {
                let candidates = path.values(resource);
                match (op, value) {
                    (CompareOp::Pr, _) => candidates.iter().any(|v| is_present(v)),
                    (CompareOp::Eq, Some(Value::Null)) => candidates.is_empty(),
                    (CompareOp::Ne, Some(Value::Null)) => !candidates.is_empty(),
                    (CompareOp::Ne, Some(expected)) => {
                        let case_exact = path.case_exact(schema);
                        !candidates
                            .iter()
                            .any(|v| compare(v, CompareOp::Eq, expected, case_exact))
                    }
                    (op, Some(expected)) => {
                        let case_exact = path.case_exact(schema);
                        candidates
                            .iter()
                            .any(|v| compare(v, *op, expected, case_exact))
                    }
                    (_, None) => false,
                }
            }
            FilterExpr::Logical { left, op, right } => match op {
                LogicalOp::And => left.matches(resource, schema) && right.matches(resource, schema),
                LogicalOp::Or => left.matches(resource, schema) || right.matches(resource, schema),
            },
            FilterExpr::Not(inner) => !inner.matches(resource, schema),
            FilterExpr::Group(inner) => inner.matches(resource, schema),
        }
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
        _ => true,
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value, case_exact: bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(e)) => match op {
            CompareOp::Co | CompareOp::Sw | CompareOp::Ew => {
                let (a, e) = if case_exact {
                    (a.clone(), e.clone())
                } else {
                    (a.to_lowercase(), e.to_lowercase())
                };
                match op {
                    CompareOp::Co => a.contains(&e),
                    CompareOp::Sw => a.starts_with(&e),
                    _ => a.ends_with(&e),
                }
            }
            CompareOp::Eq => compare_strings(a, e, case_exact) == Ordering::Equal,
            CompareOp::Ne => compare_strings(a, e, case_exact) != Ordering::Equal,
            _ => ordered(op, compare_strings(a, e, case_exact)),
        },
        (Value::Number(a), Value::Number(e)) => match (a.as_f64(), e.as_f64()) {
            (Some(a), Some(e)) => a
                .partial_cmp(&e)
                .map(|ordering| match op {
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::Ne => ordering != Ordering::Equal,
                    _ => ordered(op, ordering),
                })
                .unwrap_or(false),
            _ => false,
        },
        (Value::Bool(a), Value::Bool(e)) => match op {
            CompareOp::Eq => a == e,
            CompareOp::Ne => a != e,
            _ => false,
        },
        _ => false,
    }
}

fn ordered(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        _ => false,
    }
}

/// Timestamps compare chronologically, everything else lexicographically.
pub(crate) fn compare_strings(a: &str, b: &str, case_exact: bool) -> Ordering {
    match (
        chrono::DateTime::parse_from_rfc3339(a),
        chrono::DateTime::parse_from_rfc3339(b),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ if case_exact => a.cmp(b),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn get_case_insensitive<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = value.as_object()?;
    obj.get(key).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '$')
}

/// SCIM filter parser.
pub struct FilterParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> FilterParser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the filter expression.
    pub fn parse(&mut self) -> ScimResult<FilterExpr> {
        self.skip_whitespace();
        if self.at_end() {
            return Err(ScimError::InvalidFilter("Filter is empty".to_string()));
        }
        let expr = self.parse_or()?;
        self.skip_whitespace();
        if !self.at_end() {
            return Err(ScimError::InvalidFilter(format!(
                "Unexpected characters at position {}: '{}'",
                self.pos,
                &self.input[self.pos..]
            )));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> ScimResult<FilterExpr> {
        let mut left = self.parse_and()?;

        loop {
            self.skip_whitespace();
            if self.try_consume_keyword("or") {
                self.skip_whitespace();
                let right = self.parse_and()?;
                left = FilterExpr::Logical {
                    left: Box::new(left),
                    op: LogicalOp::Or,
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> ScimResult<FilterExpr> {
        let mut left = self.parse_unary()?;

        loop {
            self.skip_whitespace();
            if self.try_consume_keyword("and") {
                self.skip_whitespace();
                let right = self.parse_unary()?;
                left = FilterExpr::Logical {
                    left: Box::new(left),
                    op: LogicalOp::And,
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ScimResult<FilterExpr> {
        self.skip_whitespace();

        if self.try_consume_keyword("not") {
            self.skip_whitespace();
            if !self.try_consume_char('(') {
                return Err(ScimError::InvalidFilter(
                    "Expected '(' after 'not'".to_string(),
                ));
            }
            let expr = self.parse_or()?;
            self.skip_whitespace();
            if !self.try_consume_char(')') {
                return Err(ScimError::InvalidFilter(
                    "Expected ')' to close 'not' expression".to_string(),
                ));
            }
            return Ok(FilterExpr::Not(Box::new(expr)));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ScimResult<FilterExpr> {
        self.skip_whitespace();

        if self.try_consume_char('(') {
            let expr = self.parse_or()?;
            self.skip_whitespace();
            if !self.try_consume_char(')') {
                return Err(ScimError::InvalidFilter(
                    "Expected ')' to close grouped expression".to_string(),
                ));
            }
            return Ok(FilterExpr::Group(Box::new(expr)));
        }

        self.parse_attr_expr()
    }

    fn parse_attr_expr(&mut self) -> ScimResult<FilterExpr> {
        let path = self.parse_attribute()?;
        if self.current_char() == Some('[') {
            return Err(ScimError::InvalidFilter(format!(
                "Value filters on '{}' are not supported",
                path
            )));
        }
        self.skip_whitespace();

        let op_str = self.parse_operator()?;
        let op = CompareOp::parse(&op_str)
            .ok_or_else(|| ScimError::InvalidFilter(format!("Unknown operator: {op_str}")))?;

        // 'pr' operator has no value
        if op == CompareOp::Pr {
            return Ok(FilterExpr::Compare {
                path,
                op,
                value: None,
            });
        }

        self.skip_whitespace();
        let value = self.parse_value()?;

        Ok(FilterExpr::Compare {
            path,
            op,
            value: Some(value),
        })
    }

    fn parse_attribute(&mut self) -> ScimResult<AttributePath> {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-' | '$') {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(ScimError::InvalidFilter(format!(
                "Expected attribute name at position {}",
                start
            )));
        }

        AttributePath::parse(&self.input[start..self.pos])
    }

    fn parse_operator(&mut self) -> ScimResult<String> {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_ascii_alphabetic() {
                self.pos += 1;
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(ScimError::InvalidFilter(format!(
                "Expected operator at position {}",
                start
            )));
        }

        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn parse_value(&mut self) -> ScimResult<Value> {
        let start = self.pos;

        if self.try_consume_char('"') {
            while let Some(c) = self.current_char() {
                match c {
                    '"' => break,
                    '\\' => {
                        self.pos += 1;
                        if let Some(escaped) = self.current_char() {
                            self.pos += escaped.len_utf8();
                        }
                    }
                    other => self.pos += other.len_utf8(),
                }
            }
            if !self.try_consume_char('"') {
                return Err(ScimError::InvalidFilter("Unterminated string".to_string()));
            }
            return serde_json::from_str(&self.input[start..self.pos]).map_err(|e| {
                ScimError::InvalidFilter(format!("Invalid string literal: {}", e))
            });
        }

        while let Some(c) = self.current_char() {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(ScimError::InvalidFilter(format!(
                "Expected value at position {}",
                start
            )));
        }

        let literal = &self.input[start..self.pos];
        match literal.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            _ => serde_json::from_str::<serde_json::Number>(literal)
                .map(Value::Number)
                .map_err(|_| {
                    ScimError::InvalidFilter(format!("Invalid comparison value '{}'", literal))
                }),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn try_consume_char(&mut self, c: char) -> bool {
        if self.current_char() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn try_consume_keyword(&mut self, keyword: &str) -> bool {
        let end = self.pos + keyword.len();
        let Some(candidate) = self.input.get(self.pos..end) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(keyword) {
            return false;
        }
        let boundary = self.input[end..]
            .chars()
            .next()
            .map(|c| !c.is_ascii_alphanumeric())
            .unwrap_or(true);
        if boundary {
            self.pos = end;
        }
        boundary
    }
}
