//! Filter conditions
//!
//! Leaf conditions name one field and carry encoded values, so comparisons
//! happen on the same bytes the dictionaries store. `And`, `Or` and `Not`
//! compose them.

use crate::index::FieldValue;

use super::errors::{QueryError, QueryResult};

/// A filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// field = value
    Eq { field: String, value: Vec<u8> },
    /// field is one of values
    In { field: String, values: Vec<Vec<u8>> },
    /// field < value, or <= when `inclusive`
    Less {
        field: String,
        value: Vec<u8>,
        inclusive: bool,
    },
    /// field > value, or >= when `inclusive`
    Greater {
        field: String,
        value: Vec<u8>,
        inclusive: bool,
    },
    /// from < field < to with per-end inclusivity
    Between {
        field: String,
        from: Vec<u8>,
        from_inclusive: bool,
        to: Vec<u8>,
        to_inclusive: bool,
    },
    /// Every child matches
    And(Vec<Condition>),
    /// Any child matches
    Or(Vec<Condition>),
    /// Complement within the snapshot's documents
    Not(Box<Condition>),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Eq {
            field: field.into(),
            value: value.into().encode(),
        }
    }

    pub fn in_values<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Condition::In {
            field: field.into(),
            values: values.into_iter().map(|v| v.into().encode()).collect(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Less {
            field: field.into(),
            value: value.into().encode(),
            inclusive: false,
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Less {
            field: field.into(),
            value: value.into().encode(),
            inclusive: true,
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Greater {
            field: field.into(),
            value: value.into().encode(),
            inclusive: false,
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Condition::Greater {
            field: field.into(),
            value: value.into().encode(),
            inclusive: true,
        }
    }

    /// `from <= field <= to` when both flags are set
    pub fn between(
        field: impl Into<String>,
        from: impl Into<FieldValue>,
        from_inclusive: bool,
        to: impl Into<FieldValue>,
        to_inclusive: bool,
    ) -> Self {
        Condition::Between {
            field: field.into(),
            from: from.into().encode(),
            from_inclusive,
            to: to.into().encode(),
            to_inclusive,
        }
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::And(children)
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Or(children)
    }

    pub fn not(child: Condition) -> Self {
        Condition::Not(Box::new(child))
    }

    /// Field a leaf condition reads
    pub fn field(&self) -> Option<&str> {
        match self {
            Condition::Eq { field, .. }
            | Condition::In { field, .. }
            | Condition::Less { field, .. }
            | Condition::Greater { field, .. }
            | Condition::Between { field, .. } => Some(field),
            Condition::And(_) | Condition::Or(_) | Condition::Not(_) => None,
        }
    }

    /// Rejects structurally malformed conditions
    pub fn validate(&self) -> QueryResult<()> {
        if let Some(field) = self.field() {
            if field.is_empty() {
                return Err(QueryError::invalid("empty field name"));
            }
        }
        match self {
            Condition::In { field, values } if values.is_empty() => {
                Err(QueryError::invalid_field(field.as_str(), "empty value list"))
            }
            Condition::Between {
                field,
                from,
                from_inclusive,
                to,
                to_inclusive,
            } => {
                if from > to {
                    return Err(QueryError::invalid_field(field.as_str(), "inverted range"));
                }
                if from == to && !(*from_inclusive && *to_inclusive) {
                    return Err(QueryError::invalid_field(field.as_str(), "empty range"));
                }
                Ok(())
            }
            Condition::And(children) | Condition::Or(children) => {
                if children.is_empty() {
                    return Err(QueryError::invalid("empty condition group"));
                }
                children.iter().try_for_each(Condition::validate)
            }
            Condition::Not(child) => child.validate(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_encode_values() {
        assert_eq!(
            Condition::eq("text", "doc"),
            Condition::Eq {
                field: "text".into(),
                value: b"doc".to_vec()
            }
        );
        match Condition::gte("int", 5i32) {
            Condition::Greater {
                value, inclusive, ..
            } => {
                assert_eq!(value, FieldValue::I32(5).encode());
                assert!(inclusive);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_wellformed() {
        let condition = Condition::and(vec![
            Condition::eq("a", "x"),
            Condition::not(Condition::in_values("b", ["p", "q"])),
            Condition::between("c", 1i64, true, 1i64, true),
        ]);
        assert!(condition.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let cases = vec![
            Condition::eq("", "x"),
            Condition::in_values("a", Vec::<&str>::new()),
            Condition::between("a", 5i32, true, 1i32, true),
            Condition::between("a", 5i32, true, 5i32, false),
            Condition::and(vec![]),
            Condition::or(vec![]),
            Condition::not(Condition::or(vec![])),
            Condition::or(vec![Condition::eq("a", "x"), Condition::lt("", 1u64)]),
        ];
        for case in cases {
            let err = case.validate().unwrap_err();
            assert_eq!(err.code(), "SEAL_QUERY_INVALID", "{:?}", case);
        }
    }
}
