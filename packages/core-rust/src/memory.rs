//! In-memory reference implementation of the store command surface.
//!
//! Backed by [`DashMap`] for database/collection lookup and a
//! `parking_lot::RwLock<Vec<Document>>` per collection. Every command runs
//! under one lock acquisition, so single-command atomicity holds. Suitable
//! for tests and development; documents must fit in memory.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::client::{CollectionHandle, DatabaseHandle, StoreClient};
use crate::doc;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::filter::{self, get_path, matches, sort_documents};
use crate::options::{
    AggregateOptions, BulkWriteOptions, CountOptions, DeleteOptions, FindOneAndDeleteOptions,
    FindOneAndReplaceOptions, FindOneAndUpdateOptions, FindOptions, InsertManyOptions,
    InsertOneOptions, ReplaceOptions, ReturnDocument, UpdateOptions,
};
use crate::results::{
    BulkWriteResult, DeleteResult, InsertManyResult, InsertOneResult, UpdateResult, UpdateSpec,
    WriteDirective,
};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`StoreClient`]: a set of named databases created on first use.
#[derive(Default)]
pub struct MemoryStore {
    databases: DashMap<String, Arc<MemoryDatabase>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreClient for MemoryStore {
    fn database(&self, name: &str) -> Arc<dyn DatabaseHandle> {
        self.databases
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryDatabase::new(name)))
            .clone()
    }
}

// ---------------------------------------------------------------------------
// MemoryDatabase
// ---------------------------------------------------------------------------

/// One in-memory database: named collections created on first use.
pub struct MemoryDatabase {
    name: String,
    collections: DashMap<String, Arc<MemoryCollection>>,
}

impl MemoryDatabase {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: DashMap::new(),
        }
    }
}

#[async_trait]
impl DatabaseHandle for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collection(&self, name: &str) -> StoreResult<Arc<dyn CollectionHandle>> {
        let collection = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone();
        Ok(collection)
    }

    async fn run_command(&self, command: Document) -> StoreResult<Document> {
        if command.contains_key("ping") {
            return Ok(doc! { "ok": 1 });
        }
        let name = command
            .keys()
            .next()
            .cloned()
            .unwrap_or_else(|| "<empty>".to_string());
        Err(StoreError::UnknownCommand(name))
    }

    async fn list_collection_names(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

// ---------------------------------------------------------------------------
// MemoryCollection
// ---------------------------------------------------------------------------

/// One in-memory collection: a locked vector of documents.
pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docs: RwLock::new(Vec::new()),
        }
    }

    /// Indices of matching documents, ordered per `sort` (or storage order).
    fn matching_indices(
        docs: &[Document],
        filter: &Document,
        sort: Option<&Document>,
    ) -> StoreResult<Vec<usize>> {
        let mut hits = Vec::new();
        for (idx, doc) in docs.iter().enumerate() {
            if matches(doc, filter)? {
                hits.push(idx);
            }
        }
        if let Some(sort) = sort {
            hits.sort_by(|&a, &b| filter::sort_ordering(&docs[a], &docs[b], sort));
        }
        Ok(hits)
    }

    fn ensure_id(document: &mut Document) -> Value {
        if let Some(id) = document.get("_id") {
            return id.clone();
        }
        let id = Value::String(Uuid::new_v4().to_string());
        document.insert("_id".to_string(), id.clone());
        id
    }

    /// Base document for an upsert: the filter's plain equality fields.
    fn upsert_seed(filter: &Document) -> Document {
        let mut seed = Document::new();
        for (key, value) in filter {
            let is_operator_value = value
                .as_object()
                .is_some_and(|o| o.keys().any(|k| k.starts_with('$')));
            if !key.starts_with('$') && !key.contains('.') && !is_operator_value {
                seed.insert(key.clone(), value.clone());
            }
        }
        seed
    }

    fn apply_spec(doc: &mut Document, update: &UpdateSpec) -> StoreResult<bool> {
        match update {
            UpdateSpec::Document(modifiers) => filter::apply_update(doc, modifiers),
            UpdateSpec::Pipeline(_) => Err(StoreError::InvalidUpdate(
                "the memory store does not support pipeline updates".to_string(),
            )),
        }
    }

    fn delete_matching(&self, filter: &Document, limit: Option<usize>) -> StoreResult<u64> {
        let mut docs = self.docs.write();
        let hits = Self::matching_indices(&docs, filter, None)?;
        let take = limit.unwrap_or(hits.len()).min(hits.len());
        // Remove back to front so earlier indices stay valid.
        for &idx in hits[..take].iter().rev() {
            docs.remove(idx);
        }
        Ok(take as u64)
    }

    fn update_matching(
        &self,
        filter: &Document,
        update: &UpdateSpec,
        many: bool,
        upsert: bool,
    ) -> StoreResult<UpdateResult> {
        let mut docs = self.docs.write();
        let hits = Self::matching_indices(&docs, filter, None)?;
        if hits.is_empty() {
            if upsert {
                let mut fresh = Self::upsert_seed(filter);
                Self::apply_spec(&mut fresh, update)?;
                let id = Self::ensure_id(&mut fresh);
                docs.push(fresh);
                return Ok(UpdateResult {
                    matched_count: 0,
                    modified_count: 0,
                    upserted_id: Some(id),
                });
            }
            return Ok(UpdateResult {
                matched_count: 0,
                modified_count: 0,
                upserted_id: None,
            });
        }

        let targets = if many { hits.as_slice() } else { &hits[..1] };
        let mut modified = 0u64;
        for &idx in targets {
            if Self::apply_spec(&mut docs[idx], update)? {
                modified += 1;
            }
        }
        Ok(UpdateResult {
            matched_count: targets.len() as u64,
            modified_count: modified,
            upserted_id: None,
        })
    }
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn delete_one(
        &self,
        filter: Document,
        _options: DeleteOptions,
    ) -> StoreResult<DeleteResult> {
        Ok(DeleteResult {
            deleted_count: self.delete_matching(&filter, Some(1))?,
        })
    }

    async fn delete_many(
        &self,
        filter: Document,
        _options: DeleteOptions,
    ) -> StoreResult<DeleteResult> {
        Ok(DeleteResult {
            deleted_count: self.delete_matching(&filter, None)?,
        })
    }

    async fn insert_one(
        &self,
        mut document: Document,
        _options: InsertOneOptions,
    ) -> StoreResult<InsertOneResult> {
        let inserted_id = Self::ensure_id(&mut document);
        self.docs.write().push(document);
        Ok(InsertOneResult { inserted_id })
    }

    async fn insert_many(
        &self,
        documents: Vec<Document>,
        _options: InsertManyOptions,
    ) -> StoreResult<InsertManyResult> {
        let mut docs = self.docs.write();
        let mut inserted_ids = Vec::with_capacity(documents.len());
        for mut document in documents {
            inserted_ids.push(Self::ensure_id(&mut document));
            docs.push(document);
        }
        Ok(InsertManyResult { inserted_ids })
    }

    async fn update_one(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.update_matching(&filter, &update, false, options.upsert)
    }

    async fn update_many(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: UpdateOptions,
    ) -> StoreResult<UpdateResult> {
        self.update_matching(&filter, &update, true, options.upsert)
    }

    async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
        options: ReplaceOptions,
    ) -> StoreResult<UpdateResult> {
        if replacement.keys().any(|k| k.starts_with('$')) {
            return Err(StoreError::InvalidUpdate(
                "replacement documents cannot contain modifiers".to_string(),
            ));
        }
        self.update_matching(
            &filter,
            &UpdateSpec::Document(replacement),
            false,
            options.upsert,
        )
    }

    async fn bulk_write(
        &self,
        directives: Vec<WriteDirective>,
        options: BulkWriteOptions,
    ) -> StoreResult<BulkWriteResult> {
        let mut result = BulkWriteResult::default();
        for directive in directives {
            let outcome = self.apply_directive(directive, &mut result).await;
            if let Err(err) = outcome {
                if options.ordered {
                    return Err(err);
                }
                tracing::warn!(error = %err, "unordered bulk directive failed, continuing");
            }
        }
        Ok(result)
    }

    async fn count(&self, filter: Document, options: CountOptions) -> StoreResult<u64> {
        let docs = self.docs.read();
        let total = Self::matching_indices(&docs, &filter, None)?.len() as u64;
        let after_skip = total.saturating_sub(options.skip.unwrap_or(0));
        Ok(options.limit.map_or(after_skip, |l| after_skip.min(l)))
    }

    async fn estimated_count(&self) -> StoreResult<u64> {
        Ok(self.docs.read().len() as u64)
    }

    async fn find_one_and_delete(
        &self,
        filter: Document,
        options: FindOneAndDeleteOptions,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write();
        let hits = Self::matching_indices(&docs, &filter, options.sort.as_ref())?;
        Ok(hits.first().map(|&idx| docs.remove(idx)))
    }

    async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
        options: FindOneAndReplaceOptions,
    ) -> StoreResult<Option<Document>> {
        if replacement.keys().any(|k| k.starts_with('$')) {
            return Err(StoreError::InvalidUpdate(
                "replacement documents cannot contain modifiers".to_string(),
            ));
        }
        self.find_one_and_apply(
            &filter,
            &UpdateSpec::Document(replacement),
            options.sort.as_ref(),
            options.return_document,
            options.upsert,
        )
    }

    async fn find_one_and_update(
        &self,
        filter: Document,
        update: UpdateSpec,
        options: FindOneAndUpdateOptions,
    ) -> StoreResult<Option<Document>> {
        self.find_one_and_apply(
            &filter,
            &update,
            options.sort.as_ref(),
            options.return_document,
            options.upsert,
        )
    }

    async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<Vec<Document>> {
        let snapshot = self.docs.read().clone();
        let mut found = Vec::new();
        for doc in &snapshot {
            if matches(doc, &filter)? {
                found.push(doc.clone());
            }
        }
        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort);
        }
        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let mut found: Vec<Document> = found.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        if let Some(projection) = &options.projection {
            found = found
                .iter()
                .map(|doc| filter::project(doc, projection))
                .collect();
        }
        Ok(found)
    }

    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        _options: AggregateOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut current = self.docs.read().clone();
        for stage in &pipeline {
            let (name, arg) = stage.iter().next().ok_or_else(|| {
                StoreError::command_failed("aggregate", "empty pipeline stage")
            })?;
            match (name.as_str(), arg) {
                ("$match", Value::Object(filter)) => {
                    let mut kept = Vec::new();
                    for doc in current {
                        if matches(&doc, filter)? {
                            kept.push(doc);
                        }
                    }
                    current = kept;
                }
                ("$sort", Value::Object(sort)) => sort_documents(&mut current, sort),
                ("$limit", Value::Number(n)) => {
                    let limit = n.as_u64().unwrap_or(0);
                    current.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
                }
                ("$skip", Value::Number(n)) => {
                    let skip = usize::try_from(n.as_u64().unwrap_or(0)).unwrap_or(usize::MAX);
                    current = current.into_iter().skip(skip).collect();
                }
                ("$project", Value::Object(projection)) => {
                    current = current
                        .iter()
                        .map(|doc| filter::project(doc, projection))
                        .collect();
                }
                (other, _) => {
                    return Err(StoreError::command_failed(
                        "aggregate",
                        format!("unsupported pipeline stage `{other}`"),
                    ));
                }
            }
        }
        Ok(current)
    }

    async fn distinct(&self, field: &str, filter: Document) -> StoreResult<Vec<Value>> {
        let docs = self.docs.read();
        let mut values: Vec<Value> = Vec::new();
        for doc in docs.iter() {
            if !matches(doc, &filter)? {
                continue;
            }
            if let Some(value) = get_path(doc, field) {
                // Array fields contribute each element, like the remote command.
                let candidates: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for candidate in candidates {
                    if !values.contains(candidate) {
                        values.push(candidate.clone());
                    }
                }
            }
        }
        Ok(values)
    }
}

impl MemoryCollection {
    fn find_one_and_apply(
        &self,
        filter: &Document,
        update: &UpdateSpec,
        sort: Option<&Document>,
        return_document: ReturnDocument,
        upsert: bool,
    ) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write();
        let hits = Self::matching_indices(&docs, filter, sort)?;
        let Some(&idx) = hits.first() else {
            if upsert {
                let mut fresh = Self::upsert_seed(filter);
                Self::apply_spec(&mut fresh, update)?;
                Self::ensure_id(&mut fresh);
                let after = fresh.clone();
                docs.push(fresh);
                return Ok(match return_document {
                    ReturnDocument::Before => None,
                    ReturnDocument::After => Some(after),
                });
            }
            return Ok(None);
        };

        let before = docs[idx].clone();
        Self::apply_spec(&mut docs[idx], update)?;
        Ok(Some(match return_document {
            ReturnDocument::Before => before,
            ReturnDocument::After => docs[idx].clone(),
        }))
    }

    async fn apply_directive(
        &self,
        directive: WriteDirective,
        result: &mut BulkWriteResult,
    ) -> StoreResult<()> {
        match directive {
            WriteDirective::InsertOne { document } => {
                self.insert_one(document, InsertOneOptions::default()).await?;
                result.inserted_count += 1;
            }
            WriteDirective::UpdateOne {
                filter,
                update,
                upsert,
            } => {
                let r = self.update_matching(&filter, &update, false, upsert)?;
                Self::fold_update(result, &r);
            }
            WriteDirective::UpdateMany {
                filter,
                update,
                upsert,
            } => {
                let r = self.update_matching(&filter, &update, true, upsert)?;
                Self::fold_update(result, &r);
            }
            WriteDirective::ReplaceOne {
                filter,
                replacement,
                upsert,
            } => {
                let r = self.update_matching(
                    &filter,
                    &UpdateSpec::Document(replacement),
                    false,
                    upsert,
                )?;
                Self::fold_update(result, &r);
            }
            WriteDirective::DeleteOne { filter } => {
                result.deleted_count += self.delete_matching(&filter, Some(1))?;
            }
            WriteDirective::DeleteMany { filter } => {
                result.deleted_count += self.delete_matching(&filter, None)?;
            }
        }
        Ok(())
    }

    fn fold_update(result: &mut BulkWriteResult, r: &UpdateResult) {
        result.matched_count += r.matched_count;
        result.modified_count += r.modified_count;
        if r.upserted_id.is_some() {
            result.upserted_count += 1;
        }
    }
}
