use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::query::NoteQuery;
use crate::database::store::{
    Account, AccountStore, NewAccount, NewNote, Note, NoteChanges, NoteStore, StoreError,
};

/// In-memory store backend. Used when no DATABASE_URL is configured and by
/// the test suite. Every operation takes the relevant lock for its full
/// duration, which gives the same atomicity the SQL backend gets from
/// single-statement scoped updates.
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    notes: RwLock<Vec<StoredNote>>,
    seq: AtomicU64,
}

/// Insertion sequence number doubles as the stable ordering tie-break when
/// two notes share a creation timestamp.
struct StoredNote {
    seq: u64,
    note: Note,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            notes: RwLock::new(Vec::new()),
            seq: AtomicU64::new(0),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;

        if accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            display_name: account.display_name,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create(&self, note: NewNote) -> Result<Note, StoreError> {
        let now = Utc::now();
        let created = Note {
            id: Uuid::new_v4(),
            title: note.title,
            content: note.content,
            owner_id: note.owner_id,
            tags: note.tags,
            is_archived: note.is_archived,
            created_at: now,
            updated_at: now,
        };

        self.notes.write().await.push(StoredNote {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            note: created.clone(),
        });
        Ok(created)
    }

    async fn find(&self, query: &NoteQuery) -> Result<Vec<Note>, StoreError> {
        let notes = self.notes.read().await;

        let mut matched: Vec<&StoredNote> =
            notes.iter().filter(|s| query.matches(&s.note)).collect();

        // Newest first; insertion order breaks creation-time ties so
        // repeated queries against unchanged data stay deterministic.
        matched.sort_by(|a, b| {
            b.note
                .created_at
                .cmp(&a.note.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        Ok(matched
            .into_iter()
            .skip(query.skip() as usize)
            .take(query.limit as usize)
            .map(|s| s.note.clone())
            .collect())
    }

    async fn count(&self, query: &NoteQuery) -> Result<i64, StoreError> {
        let notes = self.notes.read().await;
        Ok(notes.iter().filter(|s| query.matches(&s.note)).count() as i64)
    }

    async fn find_one(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Note>, StoreError> {
        let notes = self.notes.read().await;
        Ok(notes
            .iter()
            .find(|s| s.note.id == id && s.note.owner_id == owner_id)
            .map(|s| s.note.clone()))
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        let mut notes = self.notes.write().await;

        let Some(stored) = notes
            .iter_mut()
            .find(|s| s.note.id == id && s.note.owner_id == owner_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            stored.note.title = title;
        }
        if let Some(content) = changes.content {
            stored.note.content = content;
        }
        if let Some(tags) = changes.tags {
            stored.note.tags = tags;
        }
        if let Some(is_archived) = changes.is_archived {
            stored.note.is_archived = is_archived;
        }
        stored.note.updated_at = Utc::now();

        Ok(Some(stored.note.clone()))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let mut notes = self.notes.write().await;
        let before = notes.len();
        notes.retain(|s| !(s.note.id == id && s.note.owner_id == owner_id));
        Ok(notes.len() < before)
    }
}
