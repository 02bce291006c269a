//! Harness-facing vector database trait

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::body::SearchFilter;
use crate::error::Result;

/// Operations the benchmarking harness drives against a vector database
#[async_trait]
pub trait VectorDb: Send + Sync {
    /// Connection settings schema
    type Config: DeserializeOwned;
    /// Index algorithm settings schema
    type CaseConfig: DeserializeOwned;

    /// Acquire a session; data operations fail without one
    fn open(&mut self) -> Result<()>;

    /// Release the session. Safe to call when none is open.
    fn close(&mut self);

    /// Insert `embeddings[i]` under `ids[i]`, returning the number attempted
    async fn insert_embeddings(&self, embeddings: &[Vec<f32>], ids: &[i64]) -> Result<usize>;

    /// Identifiers of the `k` nearest neighbours, most similar first
    async fn search_embedding(&self, query: &[f32], k: usize, filter: Option<&SearchFilter>) -> Result<Vec<i64>>;

    /// Prepare the index for queries after loading
    async fn optimize(&self) -> Result<()>;

    /// Hook run before a load phase
    async fn ready_to_load(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the harness must normalize vectors for cosine
    fn need_normalize_cosine(&self) -> bool;

    /// Open a session that closes when the guard drops
    fn session(&mut self) -> Result<Session<'_, Self>>
    where
        Self: Sized,
    {
        self.open()?;
        Ok(Session { db: self })
    }
}

/// Scoped session; closes the database on every exit path
pub struct Session<'a, D: VectorDb> {
    db: &'a mut D,
}

impl<D: VectorDb> Deref for Session<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.db
    }
}

impl<D: VectorDb> DerefMut for Session<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.db
    }
}

impl<D: VectorDb> Drop for Session<'_, D> {
    fn drop(&mut self) {
        self.db.close();
    }
}
