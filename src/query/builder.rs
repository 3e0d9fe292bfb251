//! Query construction

use super::condition::Condition;
use super::errors::{QueryError, QueryResult};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// One order-by clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub fn is_descending(&self) -> bool {
        self.direction == Direction::Desc
    }
}

/// A validated query
///
/// Top-level conditions are ANDed. Order-by clauses compose
/// lexicographically; documents tied on all of them come out in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    orders: Vec<Order>,
    skip: usize,
    limit: Option<usize>,
}

impl Query {
    /// Every document in id order
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Documents dropped from the front of the result
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Maximum documents returned after `skip`
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns true if the query filters at all
    pub fn has_filter(&self) -> bool {
        !self.conditions.is_empty()
    }
}

/// Builds a `Query`, rejecting malformed input in `build`
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition; all conditions must match
    pub fn filter(mut self, condition: Condition) -> Self {
        self.query.conditions.push(condition);
        self
    }

    /// Appends an order-by clause
    pub fn order_by(mut self, order: Order) -> Self {
        self.query.orders.push(order);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.query.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Validates and returns the query
    pub fn build(self) -> QueryResult<Query> {
        for condition in &self.query.conditions {
            condition.validate()?;
        }
        for order in &self.query.orders {
            if order.field.is_empty() {
                return Err(QueryError::invalid("empty order-by field name"));
            }
        }
        Ok(self.query)
    }
}
