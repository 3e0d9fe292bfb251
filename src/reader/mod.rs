//! Read side
//!
//! - `Database`: one opened file or buffer, queried through a thread's
//!   `QueryContext`
//! - `CompositeDatabase`: an ordered list of databases queried as one
//!   stream, with skip and limit applied across all of them

mod composite;
mod database;

pub use composite::CompositeDatabase;
pub use database::Database;
