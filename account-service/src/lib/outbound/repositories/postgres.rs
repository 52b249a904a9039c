use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgExecutor;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;

use crate::account::errors::StoreError;
use crate::account::errors::UniqueKey;
use crate::account::models::EmailAddress;
use crate::account::models::Identity;
use crate::account::models::IdentityId;
use crate::account::models::Nickname;
use crate::account::models::ResetTicket;
use crate::account::models::ResetTicketId;
use crate::account::models::SessionToken;
use crate::account::models::SessionTokenId;
use crate::account::ports::AccountStore;
use crate::account::ports::IdentityStore;
use crate::account::ports::ResetTicketStore;
use crate::account::ports::SessionStore;
use crate::account::ports::StoreTransaction;

const IDENTITY_COLUMNS: &str = "id, password_hash, nickname, email, display_name, avatar_link, \
                                premium, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: String,
    password_hash: String,
    nickname: String,
    email: String,
    display_name: Option<String>,
    avatar_link: Option<String>,
    premium: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(r: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Identity {
            id: IdentityId(r.id),
            password_hash: r.password_hash,
            nickname: Nickname::new(r.nickname)?,
            email: EmailAddress::new(r.email)?,
            display_name: r.display_name,
            avatar_link: r.avatar_link,
            premium: r.premium,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    value: String,
    identity_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionToken {
    fn from(r: SessionRow) -> Self {
        SessionToken {
            id: SessionTokenId(r.id),
            value: r.value,
            identity_id: IdentityId(r.identity_id),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResetTicketRow {
    id: String,
    secret: String,
    identity_id: String,
    created_at: DateTime<Utc>,
    used: bool,
}

impl From<ResetTicketRow> for ResetTicket {
    fn from(r: ResetTicketRow) -> Self {
        ResetTicket {
            id: ResetTicketId(r.id),
            secret: r.secret,
            identity_id: IdentityId(r.identity_id),
            created_at: r.created_at,
            used: r.used,
        }
    }
}

/// Translate a sqlx failure, naming the unique key when a constraint fired.
fn store_error(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let key = match db_err.constraint() {
                Some("identities_pkey") => UniqueKey::IdentityId,
                Some("identities_email_key") => UniqueKey::Email,
                Some("identities_nickname_key") => UniqueKey::Nickname,
                Some("session_tokens_value_key") => UniqueKey::SessionValue,
                Some("reset_tickets_secret_key") => UniqueKey::TicketSecret,
                _ => UniqueKey::Other,
            };
            return StoreError::Conflict(key);
        }
    }
    StoreError::Database(e.to_string())
}

async fn insert_identity<'e, E: PgExecutor<'e>>(
    executor: E,
    identity: &Identity,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO identities
            (id, password_hash, nickname, email, display_name, avatar_link, premium, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(identity.id.as_str())
    .bind(&identity.password_hash)
    .bind(identity.nickname.as_str())
    .bind(identity.email.as_str())
    .bind(&identity.display_name)
    .bind(&identity.avatar_link)
    .bind(identity.premium)
    .bind(identity.created_at)
    .bind(identity.updated_at)
    .execute(executor)
    .await
    .map_err(store_error)?;

    Ok(())
}

async fn update_identity<'e, E: PgExecutor<'e>>(
    executor: E,
    identity: &Identity,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE identities
        SET email = $2, display_name = $3, avatar_link = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(identity.id.as_str())
    .bind(identity.email.as_str())
    .bind(&identity.display_name)
    .bind(&identity.avatar_link)
    .bind(identity.updated_at)
    .execute(executor)
    .await
    .map_err(store_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(identity.id.to_string()));
    }

    Ok(())
}

async fn set_password_hash<'e, E: PgExecutor<'e>>(
    executor: E,
    id: &IdentityId,
    password_hash: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result =
        sqlx::query("UPDATE identities SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id.as_str())
            .bind(password_hash)
            .bind(updated_at)
            .execute(executor)
            .await
            .map_err(store_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(id.to_string()));
    }

    Ok(())
}

async fn insert_session<'e, E: PgExecutor<'e>>(
    executor: E,
    session: &SessionToken,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO session_tokens (id, value, identity_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&session.id.0)
    .bind(&session.value)
    .bind(session.identity_id.as_str())
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(executor)
    .await
    .map_err(store_error)?;

    Ok(())
}

pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_identity_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Identity>, StoreError> {
        let sql = format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE {column} = $1");
        let row = sqlx::query_as::<_, IdentityRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

        row.map(Identity::try_from).transpose()
    }
}

#[async_trait]
impl IdentityStore for PostgresAccountStore {
    async fn create_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        insert_identity(&self.pool, identity).await
    }

    async fn find_identity_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, StoreError> {
        self.find_identity_where("id", id.as_str()).await
    }

    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.find_identity_where("email", email).await
    }

    async fn find_identity_by_nickname(
        &self,
        nickname: &str,
    ) -> Result<Option<Identity>, StoreError> {
        self.find_identity_where("nickname", nickname).await
    }

    async fn update_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        update_identity(&self.pool, identity).await
    }

    async fn set_password_hash(
        &self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        set_password_hash(&self.pool, id, password_hash, updated_at).await
    }
}

#[async_trait]
impl SessionStore for PostgresAccountStore {
    async fn create_session(&self, session: &SessionToken) -> Result<(), StoreError> {
        insert_session(&self.pool, session).await
    }

    async fn find_session_by_value(
        &self,
        value: &str,
    ) -> Result<Option<SessionToken>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, value, identity_id, created_at, updated_at
            FROM session_tokens
            WHERE value = $1
            "#,
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(SessionToken::from))
    }
}

#[async_trait]
impl ResetTicketStore for PostgresAccountStore {
    async fn create_reset_ticket(&self, ticket: &ResetTicket) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO reset_tickets (id, secret, identity_id, created_at, used)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&ticket.id.0)
        .bind(&ticket.secret)
        .bind(ticket.identity_id.as_str())
        .bind(ticket.created_at)
        .bind(ticket.used)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn find_reset_ticket_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<ResetTicket>, StoreError> {
        let row = sqlx::query_as::<_, ResetTicketRow>(
            r#"
            SELECT id, secret, identity_id, created_at, used
            FROM reset_tickets
            WHERE secret = $1
            "#,
        )
        .bind(secret)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.map(ResetTicket::from))
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    type Transaction = PostgresTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let tx = self.pool.begin().await.map_err(store_error)?;
        Ok(PostgresTransaction { tx })
    }
}

/// Transaction handle over a pooled connection.
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn create_identity(&mut self, identity: &Identity) -> Result<(), StoreError> {
        insert_identity(&mut *self.tx, identity).await
    }

    async fn set_password_hash(
        &mut self,
        id: &IdentityId,
        password_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        set_password_hash(&mut *self.tx, id, password_hash, updated_at).await
    }

    async fn create_session(&mut self, session: &SessionToken) -> Result<(), StoreError> {
        insert_session(&mut *self.tx, session).await
    }

    async fn mark_reset_ticket_used(&mut self, id: &ResetTicketId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE reset_tickets SET used = TRUE WHERE id = $1 AND NOT used")
            .bind(&id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(bool,)> = sqlx::query_as("SELECT used FROM reset_tickets WHERE id = $1")
            .bind(&id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_error)
    }
}
