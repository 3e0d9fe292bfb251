//! Query model and execution
//!
//! - `Condition`: leaf predicates on one field plus `And`, `Or`, `Not`
//! - `QueryBuilder`: validates conditions and order-by clauses up front
//! - `Executor`: bit-set filtering, ranked traversal, skip and limit
//!
//! Malformed queries fail in `QueryBuilder::build` with `SEAL_QUERY_INVALID`
//! before any index is read. A condition on a field the snapshot does not
//! index matches nothing.

mod builder;
mod condition;
mod errors;
mod executor;

pub use builder::{Direction, Order, Query, QueryBuilder};
pub use condition::Condition;
pub use errors::{QueryError, QueryResult};
pub use executor::{DocumentProcessor, Executor, Pager, QuerySource, Selection};
