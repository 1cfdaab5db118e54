use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::database::query::NoteQuery;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    /// Stored and compared lowercase; uniqueness enforced by the store.
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Immutable after creation; always the creating identity.
    pub owner_id: Uuid,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_archived: bool,
}

/// Partial-merge update: only present fields are written.
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.is_archived.is_none()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email is already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create with server-side timestamps. Fails with `DuplicateEmail` when
    /// the email is taken.
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create(&self, note: NewNote) -> Result<Note, StoreError>;

    /// Execute an owner-scoped query with its skip/limit window, newest
    /// first with a stable tie-break.
    async fn find(&self, query: &NoteQuery) -> Result<Vec<Note>, StoreError>;

    /// Count every match of the query, ignoring its skip/limit window.
    async fn count(&self, query: &NoteQuery) -> Result<i64, StoreError>;

    async fn find_one(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Note>, StoreError>;

    /// Atomic update scoped by (id AND owner_id) in a single store call;
    /// `None` when no note matches both.
    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError>;

    /// Atomic delete scoped by (id AND owner_id); `false` when no note
    /// matches both.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError>;
}
