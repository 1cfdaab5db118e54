use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::query::NoteQuery;
use crate::database::store::{
    Account, AccountStore, NewAccount, NewNote, Note, NoteChanges, NoteStore, StoreError,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id            UUID PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS notes (
    id          UUID PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    owner_id    UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    tags        TEXT[] NOT NULL DEFAULT '{}',
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS notes_owner_created_idx
    ON notes (owner_id, created_at DESC, id DESC);
CREATE INDEX IF NOT EXISTS notes_tags_idx ON notes USING GIN (tags);
"#;

/// Postgres store backend over a lazily-connected, process-cached pool.
/// Scoped updates and deletes are single statements, so the store-level
/// atomicity the mutation invariants rely on comes for free.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Build the pool without connecting; the first query establishes the
    /// connection, which is then reused for the life of the process.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Ensure tables and indexes exist. Run once at startup.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!("database schema ready");
        Ok(())
    }
}

/// Append the WHERE clause for a note query. The owner constraint is
/// unconditional; everything else is optional.
fn push_note_predicate(builder: &mut QueryBuilder<'_, Postgres>, query: &NoteQuery) {
    builder.push(" WHERE owner_id = ");
    builder.push_bind(query.owner_id);

    if let Some(archived) = query.archived {
        builder.push(" AND is_archived = ");
        builder.push_bind(archived);
    }

    if !query.tags.is_empty() {
        // Array overlap: the note's tag set intersects the requested set
        builder.push(" AND tags && ");
        builder.push_bind(query.tags.clone());
    }

    if let Some(search) = &query.search {
        let pattern = like_pattern(search);
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR content ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

/// Substring pattern for ILIKE with the wildcard characters escaped.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some("23505") {
            return StoreError::DuplicateEmail;
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl AccountStore for PostgresStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, display_name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.display_name)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }
}

#[async_trait]
impl NoteStore for PostgresStore {
    async fn create(&self, note: NewNote) -> Result<Note, StoreError> {
        let created = sqlx::query_as::<_, Note>(
            r#"
            INSERT INTO notes (id, title, content, owner_id, tags, is_archived)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&note.title)
        .bind(&note.content)
        .bind(note.owner_id)
        .bind(&note.tags)
        .bind(note.is_archived)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find(&self, query: &NoteQuery) -> Result<Vec<Note>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM notes");
        push_note_predicate(&mut builder, query);
        builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        builder.push_bind(query.limit);
        builder.push(" OFFSET ");
        builder.push_bind(query.skip());

        let notes = builder
            .build_query_as::<Note>()
            .fetch_all(&self.pool)
            .await?;
        Ok(notes)
    }

    async fn count(&self, query: &NoteQuery) -> Result<i64, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notes");
        push_note_predicate(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_one(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        changes: NoteChanges,
    ) -> Result<Option<Note>, StoreError> {
        // One scoped statement: no separate existence/ownership checks
        let mut builder =
            QueryBuilder::<Postgres>::new("UPDATE notes SET updated_at = now()");

        if let Some(title) = changes.title {
            builder.push(", title = ");
            builder.push_bind(title);
        }
        if let Some(content) = changes.content {
            builder.push(", content = ");
            builder.push_bind(content);
        }
        if let Some(tags) = changes.tags {
            builder.push(", tags = ");
            builder.push_bind(tags);
        }
        if let Some(is_archived) = changes.is_archived {
            builder.push(", is_archived = ");
            builder.push_bind(is_archived);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" AND owner_id = ");
        builder.push_bind(owner_id);
        builder.push(" RETURNING *");

        let note = builder
            .build_query_as::<Note>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(note)
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
