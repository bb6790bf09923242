//! SQLite backend.
//!
//! One database file with four tables: `users`, `conversations`,
//! `relationships` and `tones`. Nested values (message logs, preference
//! maps, tone parameters) are stored as JSON text columns; timestamps as
//! fixed-width RFC 3339 strings so they sort lexicographically.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use toneshift_core::error::StoreError;
use toneshift_core::store::{ConversationStore, RelationshipStore, Store, ToneStore, UserStore};
use toneshift_core::{Conversation, Message, Relationship, RelationshipCategory, Tone, User};
use tracing::{debug, info, warn};

/// A production SQLite store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 8] = [
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id            TEXT PRIMARY KEY NOT NULL,
                    username      TEXT UNIQUE NOT NULL,
                    email         TEXT UNIQUE NOT NULL,
                    password_hash TEXT NOT NULL,
                    preferences   TEXT NOT NULL DEFAULT '{}',
                    created_at    TEXT NOT NULL,
                    updated_at    TEXT NOT NULL
                )
                "#,
            ),
            (
                "conversations table",
                r#"
                CREATE TABLE IF NOT EXISTS conversations (
                    id           TEXT PRIMARY KEY NOT NULL,
                    owner_id     TEXT NOT NULL,
                    title        TEXT NOT NULL,
                    context      TEXT NOT NULL DEFAULT '',
                    messages     TEXT NOT NULL DEFAULT '[]',
                    relationship TEXT,
                    created_at   TEXT NOT NULL,
                    updated_at   TEXT NOT NULL
                )
                "#,
            ),
            (
                "conversations index",
                "CREATE INDEX IF NOT EXISTS idx_conversations_owner ON conversations(owner_id, updated_at DESC)",
            ),
            (
                "relationships table",
                r#"
                CREATE TABLE IF NOT EXISTS relationships (
                    id              TEXT PRIMARY KEY NOT NULL,
                    owner_id        TEXT NOT NULL,
                    name            TEXT NOT NULL,
                    category        TEXT NOT NULL DEFAULT 'personal',
                    context         TEXT NOT NULL DEFAULT '',
                    preferred_tones TEXT NOT NULL DEFAULT '[]',
                    additional_info TEXT NOT NULL DEFAULT '{}',
                    created_at      TEXT NOT NULL,
                    updated_at      TEXT NOT NULL
                )
                "#,
            ),
            (
                "relationships index",
                "CREATE INDEX IF NOT EXISTS idx_relationships_owner ON relationships(owner_id, name)",
            ),
            (
                "tones table",
                r#"
                CREATE TABLE IF NOT EXISTS tones (
                    id          TEXT PRIMARY KEY NOT NULL,
                    name        TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    is_system   INTEGER NOT NULL DEFAULT 0,
                    parameters  TEXT NOT NULL DEFAULT '{}',
                    creator_id  TEXT,
                    created_at  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                )
                "#,
            ),
            (
                "tones name index",
                "CREATE INDEX IF NOT EXISTS idx_tones_name ON tones(name COLLATE NOCASE)",
            ),
            (
                "tones creator index",
                "CREATE INDEX IF NOT EXISTS idx_tones_creator ON tones(creator_id)",
            ),
        ];

        for (label, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{label}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
        let preferences_json: String = col(row, "preferences")?;
        let preferences = serde_json::from_str(&preferences_json).unwrap_or_else(|e| {
            warn!(error = %e, "Unreadable preferences column, using defaults");
            Default::default()
        });

        Ok(User {
            id: col(row, "id")?,
            username: col(row, "username")?,
            email: col(row, "email")?,
            password_hash: col(row, "password_hash")?,
            preferences,
            created_at: parse_ts(&col::<String>(row, "created_at")?),
            updated_at: parse_ts(&col::<String>(row, "updated_at")?),
        })
    }

    fn row_to_conversation(row: &SqliteRow) -> Result<Conversation, StoreError> {
        let messages_json: String = col(row, "messages")?;

        Ok(Conversation {
            id: col(row, "id")?,
            owner_id: col(row, "owner_id")?,
            title: col(row, "title")?,
            context: col(row, "context")?,
            messages: serde_json::from_str(&messages_json)?,
            relationship: col(row, "relationship")?,
            created_at: parse_ts(&col::<String>(row, "created_at")?),
            updated_at: parse_ts(&col::<String>(row, "updated_at")?),
        })
    }

    fn row_to_relationship(row: &SqliteRow) -> Result<Relationship, StoreError> {
        let category: String = col(row, "category")?;
        let preferred_json: String = col(row, "preferred_tones")?;
        let info_json: String = col(row, "additional_info")?;

        Ok(Relationship {
            id: col(row, "id")?,
            owner_id: col(row, "owner_id")?,
            name: col(row, "name")?,
            category: RelationshipCategory::from_str(&category).unwrap_or_default(),
            context: col(row, "context")?,
            preferred_tones: serde_json::from_str(&preferred_json)?,
            additional_info: serde_json::from_str(&info_json)?,
            created_at: parse_ts(&col::<String>(row, "created_at")?),
            updated_at: parse_ts(&col::<String>(row, "updated_at")?),
        })
    }

    fn row_to_tone(row: &SqliteRow) -> Result<Tone, StoreError> {
        let parameters_json: String = col(row, "parameters")?;

        Ok(Tone {
            id: col(row, "id")?,
            name: col(row, "name")?,
            description: col(row, "description")?,
            is_system: col(row, "is_system")?,
            parameters: serde_json::from_str(&parameters_json)?,
            creator_id: col(row, "creator_id")?,
            created_at: parse_ts(&col::<String>(row, "created_at")?),
            updated_at: parse_ts(&col::<String>(row, "updated_at")?),
        })
    }
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn query_failed(what: &str, e: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(format!("{what}: {e}"))
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, preferences, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(serde_json::to_string(&user.preferences)?)
        .bind(ts(&user.created_at))
        .bind(ts(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert user", e))?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find user", e))?
            .map(|row| Self::row_to_user(&row))
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find user by email", e))?
            .map(|row| Self::row_to_user(&row))
            .transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find user by username", e))?
            .map(|row| Self::row_to_user(&row))
            .transpose()
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        sqlx::query("SELECT * FROM users WHERE email = ? OR username = ? LIMIT 1")
            .bind(email)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find user by email or username", e))?
            .map(|row| Self::row_to_user(&row))
            .transpose()
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, password_hash = ?, preferences = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(serde_json::to_string(&user.preferences)?)
        .bind(ts(&user.updated_at))
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update user", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, owner_id, title, context, messages, relationship, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&conversation.id)
        .bind(&conversation.owner_id)
        .bind(&conversation.title)
        .bind(&conversation.context)
        .bind(serde_json::to_string(&conversation.messages)?)
        .bind(&conversation.relationship)
        .bind(ts(&conversation.created_at))
        .bind(ts(&conversation.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert conversation", e))?;
        Ok(())
    }

    async fn find_conversation(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        sqlx::query("SELECT * FROM conversations WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find conversation", e))?
            .map(|row| Self::row_to_conversation(&row))
            .transpose()
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE owner_id = ? ORDER BY updated_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list conversations", e))?;

        rows.iter().map(Self::row_to_conversation).collect()
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE conversations
            SET title = ?, context = ?, relationship = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&conversation.title)
        .bind(&conversation.context)
        .bind(&conversation.relationship)
        .bind(ts(&conversation.updated_at))
        .bind(&conversation.id)
        .bind(&conversation.owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update conversation", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError> {
        if messages.is_empty() {
            return Ok(self.find_conversation(id, owner_id).await?.is_some());
        }

        // Single statement: reading and rewriting the log is atomic. `$[#]`
        // is re-evaluated per pair, so messages land in order.
        let pairs = vec!["'$[#]', json(?)"; messages.len()].join(", ");
        let sql = format!(
            "UPDATE conversations SET messages = json_insert(messages, {pairs}), updated_at = ? \
             WHERE id = ? AND owner_id = ?"
        );

        let mut query = sqlx::query(&sql);
        for message in messages {
            query = query.bind(serde_json::to_string(message)?);
        }
        let result = query
            .bind(ts(&Utc::now()))
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("append messages", e))?;
        debug!(conversation_id = %id, count = messages.len(), "Messages appended");
        Ok(result.rows_affected() > 0)
    }

    async fn replace_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE conversations SET messages = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        )
        .bind(serde_json::to_string(messages)?)
        .bind(ts(&Utc::now()))
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("replace messages", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_conversation(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("delete conversation", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RelationshipStore for SqliteStore {
    async fn insert_relationship(&self, relationship: &Relationship) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO relationships
                (id, owner_id, name, category, context, preferred_tones, additional_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&relationship.id)
        .bind(&relationship.owner_id)
        .bind(&relationship.name)
        .bind(relationship.category.as_str())
        .bind(&relationship.context)
        .bind(serde_json::to_string(&relationship.preferred_tones)?)
        .bind(serde_json::to_string(&relationship.additional_info)?)
        .bind(ts(&relationship.created_at))
        .bind(ts(&relationship.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert relationship", e))?;
        Ok(())
    }

    async fn find_relationship(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Relationship>, StoreError> {
        sqlx::query("SELECT * FROM relationships WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find relationship", e))?
            .map(|row| Self::row_to_relationship(&row))
            .transpose()
    }

    async fn list_relationships(&self, owner_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let rows = sqlx::query("SELECT * FROM relationships WHERE owner_id = ? ORDER BY name ASC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_failed("list relationships", e))?;

        rows.iter().map(Self::row_to_relationship).collect()
    }

    async fn update_relationship(&self, relationship: &Relationship) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE relationships
            SET name = ?, category = ?, context = ?, preferred_tones = ?, additional_info = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&relationship.name)
        .bind(relationship.category.as_str())
        .bind(&relationship.context)
        .bind(serde_json::to_string(&relationship.preferred_tones)?)
        .bind(serde_json::to_string(&relationship.additional_info)?)
        .bind(ts(&relationship.updated_at))
        .bind(&relationship.id)
        .bind(&relationship.owner_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update relationship", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_relationship(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM relationships WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| query_failed("delete relationship", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ToneStore for SqliteStore {
    async fn insert_tone(&self, tone: &Tone) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tones (id, name, description, is_system, parameters, creator_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tone.id)
        .bind(&tone.name)
        .bind(&tone.description)
        .bind(tone.is_system)
        .bind(serde_json::to_string(&tone.parameters)?)
        .bind(&tone.creator_id)
        .bind(ts(&tone.created_at))
        .bind(ts(&tone.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("insert tone", e))?;
        Ok(())
    }

    async fn find_tone_by_id(&self, id: &str) -> Result<Option<Tone>, StoreError> {
        sqlx::query("SELECT * FROM tones WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_failed("find tone", e))?
            .map(|row| Self::row_to_tone(&row))
            .transpose()
    }

    async fn find_tone_by_name(
        &self,
        name: &str,
        viewer_id: &str,
    ) -> Result<Option<Tone>, StoreError> {
        // is_system ASC puts the viewer's own tone ahead of a system tone
        sqlx::query(
            r#"
            SELECT * FROM tones
            WHERE name = ? COLLATE NOCASE
              AND (is_system = 1 OR creator_id = ?)
            ORDER BY is_system ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .bind(viewer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_failed("find tone by name", e))?
        .map(|row| Self::row_to_tone(&row))
        .transpose()
    }

    async fn list_visible_tones(&self, viewer_id: &str) -> Result<Vec<Tone>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM tones
            WHERE is_system = 1 OR creator_id = ?
            ORDER BY is_system DESC, name COLLATE NOCASE ASC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_failed("list tones", e))?;

        rows.iter().map(Self::row_to_tone).collect()
    }

    async fn update_tone(&self, tone: &Tone) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE tones
            SET name = ?, description = ?, parameters = ?, updated_at = ?
            WHERE id = ? AND is_system = 0 AND creator_id = ?
            "#,
        )
        .bind(&tone.name)
        .bind(&tone.description)
        .bind(serde_json::to_string(&tone.parameters)?)
        .bind(ts(&tone.updated_at))
        .bind(&tone.id)
        .bind(&tone.creator_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_failed("update tone", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tone(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM tones WHERE id = ? AND is_system = 0 AND creator_id = ?")
                .bind(id)
                .bind(owner_id)
                .execute(&self.pool)
                .await
                .map_err(|e| query_failed("delete tone", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_system_tones(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tones WHERE is_system = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| query_failed("count system tones", e))?;
        Ok(count as usize)
    }
}

impl Store for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }
}
