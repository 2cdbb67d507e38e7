//! The CRUD contract every REST resource implements.
//!
//! Implementations hold the domain logic (validation, tenant checks, owned
//! rows); the HTTP layer only maps verbs onto these methods.

use super::tenant::Scope;
use super::validation::WriteMode;
use crate::errors::Result;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use uuid::Uuid;

/// List / create / retrieve / update / delete over one entity
pub trait Resource: Send + Sync + 'static {
    /// Plural name used in URLs, e.g. `"waste-bins"`
    const NAME: &'static str;

    /// Write payload, every field optional (see [`WriteMode`])
    type Input: DeserializeOwned + Send + 'static;

    /// Read representation
    type View: Serialize + Send + 'static;

    /// All rows visible in `scope`.
    fn list(
        db: &DatabaseConnection,
        scope: Scope,
    ) -> impl Future<Output = Result<Vec<Self::View>>> + Send;

    /// One row; `NotFound` when missing, `Forbidden` when outside `scope`.
    fn retrieve(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
    ) -> impl Future<Output = Result<Self::View>> + Send;

    /// Validates and inserts a row with its owned rows.
    fn create(
        db: &DatabaseConnection,
        scope: Scope,
        input: Self::Input,
    ) -> impl Future<Output = Result<Self::View>> + Send;

    /// Full (`Replace`) or partial (`Patch`) update.
    fn update(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
        input: Self::Input,
        mode: WriteMode,
    ) -> impl Future<Output = Result<Self::View>> + Send;

    /// Deletes a row with its owned rows.
    fn delete(
        db: &DatabaseConnection,
        scope: Scope,
        id: Uuid,
    ) -> impl Future<Output = Result<()>> + Send;
}
