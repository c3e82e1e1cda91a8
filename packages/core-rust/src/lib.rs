//! Docflow Core — document payloads, the store command surface, and an
//! in-memory reference store.
//!
//! This crate is the collaborator boundary of the docflow engine: a value
//! type for structured document payloads ([`Document`]), the traits a remote
//! document store must implement ([`StoreClient`], [`DatabaseHandle`],
//! [`CollectionHandle`]), the per-command options and result structs, and a
//! DashMap-backed [`MemoryStore`](memory::MemoryStore) used as the reference
//! implementation in tests.

pub mod client;
pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod options;
pub mod results;

pub use client::{CollectionHandle, DatabaseHandle, StoreClient};
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use options::{
    AggregateOptions, BulkWriteOptions, CountOptions, DeleteOptions, FindOneAndDeleteOptions,
    FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions,
    InsertOneOptions, ReplaceOptions, ReturnDocument, UpdateOptions,
};
pub use results::{
    BulkWriteResult, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult, UpdateSpec,
    WriteDirective,
};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
