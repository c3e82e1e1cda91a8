//! Built-in operators: the block expander, the generic collection-command
//! operator, and the database-scoped operator.

pub mod block;
pub mod collection;
pub mod database;

pub use block::BlockOperator;
pub use collection::CollectionOperator;
pub use database::DatabaseOperator;
