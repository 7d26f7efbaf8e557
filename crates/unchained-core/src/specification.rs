//! Query specifications.
//!
//! A [`Specification`] is an immutable tree of predicates that renders to a
//! parameterized SQL `WHERE` fragment plus its bound values:
//!
//! ```text
//!   Specification::equal("status", "open") & Specification::greater_than("age", 18)
//!     query:  "status = ? AND age > ?"
//!     values: ["open", 18]
//! ```
//!
//! # Invariants
//!
//! - The number of `?` placeholders in [`Specification::query`] always equals
//!   the length of [`Specification::values`]; values appear in the order
//!   their placeholders do (depth-first, left to right).
//! - Composite children that are themselves `AND`/`OR` are parenthesized;
//!   leaves are not. `NOT` always parenthesizes its operand.
//! - `AND`/`OR` with no children and `IN` with no values cannot be built.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecificationError {
    #[error("IN on {field} requires at least one value")]
    EmptyIn { field: String },

    #[error("{0} requires at least one child specification")]
    EmptyComposite(&'static str),

    #[error("invalid column identifier: {0:?}")]
    InvalidField(String),
}

/// Comparison operators for leaf predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum Operator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(to_string = "<>", serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Lte,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Gte,
    #[strum(to_string = "LIKE", serialize = "like")]
    Like,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Compare {
        field: String,
        operator: Operator,
        value: Value,
    },
    Inverted {
        field: String,
        operator: Operator,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    And(Vec<Specification>),
    Or(Vec<Specification>),
    Not(Box<Specification>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Specification(Node);

impl Specification {
    // ------------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------------

    /// `field <operator> ?`
    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self(Node::Compare {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    /// `? <operator> field`, with the bound value on the left, as in
    /// `? < expires_at`. The field is still validated as a plain column name.
    pub fn compare_inverted(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self(Node::Inverted {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Eq, value)
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::NotEq, value)
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Lt, value)
    }

    pub fn less_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Lte, value)
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Gt, value)
    }

    pub fn greater_or_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Gte, value)
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(field, Operator::Like, Value::String(pattern.into()))
    }

    /// `field IN (?,?,...)`, one placeholder per value.
    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Result<Self, SpecificationError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let field = field.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(SpecificationError::EmptyIn { field });
        }
        Ok(Self(Node::In { field, values }))
    }

    // ------------------------------------------------------------------------
    // Composites
    // ------------------------------------------------------------------------

    /// Conjunction of every child.
    pub fn and<I>(specs: I) -> Result<Self, SpecificationError>
    where
        I: IntoIterator<Item = Self>,
    {
        let children: Vec<Self> = specs.into_iter().collect();
        if children.is_empty() {
            return Err(SpecificationError::EmptyComposite("AND"));
        }
        Ok(Self(Node::And(children)))
    }

    /// Disjunction of every child.
    pub fn or<I>(specs: I) -> Result<Self, SpecificationError>
    where
        I: IntoIterator<Item = Self>,
    {
        let children: Vec<Self> = specs.into_iter().collect();
        if children.is_empty() {
            return Err(SpecificationError::EmptyComposite("OR"));
        }
        Ok(Self(Node::Or(children)))
    }

    pub fn negate(spec: Self) -> Self {
        Self(Node::Not(Box::new(spec)))
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// The parameterized fragment, with `?` placeholders.
    pub fn query(&self) -> String {
        match &self.0 {
            Node::Compare {
                field, operator, ..
            } => format!("{field} {operator} ?"),
            Node::Inverted {
                field, operator, ..
            } => format!("? {operator} {field}"),
            Node::In { field, values } => {
                format!("{field} IN ({})", itertools::repeat_n("?", values.len()).join(","))
            }
            Node::And(children) => children.iter().map(Self::nested_query).join(" AND "),
            Node::Or(children) => children.iter().map(Self::nested_query).join(" OR "),
            Node::Not(inner) => format!("NOT ({})", inner.query()),
        }
    }

    fn nested_query(&self) -> String {
        match &self.0 {
            Node::And(_) | Node::Or(_) => format!("({})", self.query()),
            _ => self.query(),
        }
    }

    /// Bound values in placeholder order.
    pub fn values(&self) -> Vec<Value> {
        let mut out = Vec::new();
        self.collect_values(&mut out);
        out
    }

    fn collect_values(&self, out: &mut Vec<Value>) {
        match &self.0 {
            Node::Compare { value, .. } | Node::Inverted { value, .. } => out.push(value.clone()),
            Node::In { values, .. } => out.extend(values.iter().cloned()),
            Node::And(children) | Node::Or(children) => {
                for child in children {
                    child.collect_values(out);
                }
            }
            Node::Not(inner) => inner.collect_values(out),
        }
    }

    /// Column names referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&str> {
        match &self.0 {
            Node::Compare { field, .. } | Node::Inverted { field, .. } | Node::In { field, .. } => {
                vec![field.as_str()]
            }
            Node::And(children) | Node::Or(children) => {
                children.iter().flat_map(Self::fields).collect()
            }
            Node::Not(inner) => inner.fields(),
        }
    }

    /// Check every referenced column is a plain (optionally table-qualified)
    /// identifier, so the rendered fragment is safe to splice into SQL.
    pub fn validate(&self) -> Result<(), SpecificationError> {
        self.fields()
            .into_iter()
            .find(|field| !is_identifier(field))
            .map_or(Ok(()), |field| {
                Err(SpecificationError::InvalidField(field.to_string()))
            })
    }
}

/// True for a plain or table-qualified SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.query(), self.values().iter().join(", "))
    }
}

/// `a & b` flattens into an existing conjunction on the left.
impl BitAnd for Specification {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        match self.0 {
            Node::And(mut children) => {
                children.push(rhs);
                Self(Node::And(children))
            }
            node => Self(Node::And(vec![Self(node), rhs])),
        }
    }
}

/// `a | b` flattens into an existing disjunction on the left.
impl BitOr for Specification {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        match self.0 {
            Node::Or(mut children) => {
                children.push(rhs);
                Self(Node::Or(children))
            }
            node => Self(Node::Or(vec![Self(node), rhs])),
        }
    }
}

impl Not for Specification {
    type Output = Self;

    fn not(self) -> Self {
        Self::negate(self)
    }
}
