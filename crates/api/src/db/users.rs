//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use corner_shop_core::{Email, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Notification, User};

macro_rules! user_columns {
    () => {
        "id, email, name, notifications, waitlist, created_at"
    };
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    notifications: Json<Vec<Notification>>,
    waitlist: Json<Vec<ProductId>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            notifications: row.notifications.0,
            waitlist: row.waitlist.0,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| Ok((r.user.try_into()?, r.password_hash)))
            .transpose()
    }

    /// Create a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(concat!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING ",
            user_columns!()
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        row.try_into()
    }

    /// Replace a user's notifications.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn save_notifications(
        &self,
        id: UserId,
        notifications: &[Notification],
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET notifications = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(Json(notifications))
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Add a product to a user's restock waitlist. Returns false if it was
    /// already there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn join_waitlist(
        &self,
        id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET waitlist = waitlist || jsonb_build_array($2::int), updated_at = now()
             WHERE id = $1 AND NOT waitlist @> jsonb_build_array($2::int)",
        )
        .bind(id)
        .bind(product_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deliver a notification to everyone waiting on a product and take
    /// them off its waitlist. Returns the notified users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn notify_waitlist(
        &self,
        product_id: ProductId,
        notification: &Notification,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let ids: Vec<i32> = sqlx::query_scalar(
            "UPDATE users SET
                notifications = notifications || jsonb_build_array($2::jsonb),
                waitlist = COALESCE(
                    (SELECT jsonb_agg(e) FROM jsonb_array_elements(waitlist) e
                     WHERE e <> to_jsonb($1::int)),
                    '[]'::jsonb),
                updated_at = now()
             WHERE waitlist @> jsonb_build_array($1::int)
             RETURNING id",
        )
        .bind(product_id)
        .bind(Json(notification))
        .fetch_all(self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }
}
