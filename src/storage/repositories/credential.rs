//! Credential store: identities, profiles and the per-identity session row.
//!
//! Every write to `sessions` happens inside a transaction that holds the row
//! lock for the read-compare-write, so two concurrent rotations of the same
//! token cannot both succeed.

use crate::auth::models::Role;
use crate::auth::user::{Identity, NewIdentity, ProfileFields, UpdateProfileRequest, User};
use crate::domain::UserId;
use crate::errors::types::is_unique_violation;
use crate::errors::{CampusError, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::instrument;

/// Outcome of a compare-and-swap on the stored refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// Stored value matched and was replaced.
    Rotated,
    /// Stored value differs from the presented token.
    Stale,
    /// No session row exists for the identity.
    Missing,
}

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: UserId,
    pub role: String,
    pub email: String,
    pub name: String,
    pub birthdate: NaiveDate,
    pub phone_number: String,
    pub telegram: String,
    pub city: String,
    pub age: Option<i32>,
    pub employment: String,
    pub is_business_owner: String,
    pub position_at_work: String,
    pub month_income: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct CredentialRow {
    pub id: UserId,
    pub password_hash: String,
    pub role: String,
}

const USER_COLUMNS: &str = "i.id, i.role, p.email, p.name, p.birthdate, p.phone_number, \
     p.telegram, p.city, p.age, p.employment, p.is_business_owner, p.position_at_work, \
     p.month_income, i.created_at";

/// Stored roles outside the known set are a data-integrity failure, never a
/// silent downgrade.
pub(crate) fn parse_role(raw: &str) -> Result<Role> {
    Role::from_str(raw).map_err(|err| {
        CampusError::internal(format!("Data integrity violation on identities.role: {}", err))
    })
}

fn row_to_user(row: UserRow) -> Result<User> {
    Ok(User {
        id: row.id,
        role: parse_role(&row.role)?,
        profile: ProfileFields {
            email: row.email,
            name: row.name,
            birthdate: row.birthdate,
            phone_number: row.phone_number,
            telegram: row.telegram,
            city: row.city,
            age: row.age,
            employment: row.employment,
            is_business_owner: row.is_business_owner,
            position_at_work: row.position_at_work,
            month_income: row.month_income,
        },
        created_at: row.created_at,
    })
}

fn map_profile_write_error(err: sqlx::Error, context: &str) -> CampusError {
    if is_unique_violation(&err) {
        CampusError::conflict("Email is already registered", "profile")
    } else {
        CampusError::database(err, context)
    }
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert identity, profile and session as one unit. Nothing is persisted on failure.
    async fn create_identity(&self, identity: NewIdentity) -> Result<User>;

    /// Look up the stored credentials behind an email
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<Identity>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>>;

    /// Replace the editable profile fields. The email is left untouched.
    async fn update_profile(&self, id: &UserId, changes: UpdateProfileRequest) -> Result<User>;

    /// Delete an identity; profile, session and enrollments cascade.
    async fn delete_identity(&self, id: &UserId) -> Result<()>;

    /// Unconditionally overwrite the stored refresh token.
    async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<()>;

    /// Replace the stored refresh token only if it still equals `presented`.
    async fn rotate_refresh_token(
        &self,
        id: &UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<RotationOutcome>;

    async fn get_refresh_token(&self, id: &UserId) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct SqlxCredentialRepository {
    pool: DbPool,
}

impl SqlxCredentialRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRepository for SqlxCredentialRepository {
    #[instrument(skip(self, identity), fields(user_id = %identity.id), name = "db_create_identity")]
    async fn create_identity(&self, identity: NewIdentity) -> Result<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CampusError::database(e, "Failed to begin registration transaction"))?;

        sqlx::query("INSERT INTO identities (id, password_hash, role) VALUES ($1, $2, $3)")
            .bind(identity.id)
            .bind(&identity.password_hash)
            .bind(identity.role.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| CampusError::database(e, "Failed to insert identity"))?;

        let profile = &identity.profile;
        sqlx::query(
            r#"
            INSERT INTO profiles (
                user_id, email, name, birthdate, phone_number, telegram, city, age,
                employment, is_business_owner, position_at_work, month_income
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(identity.id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(profile.birthdate)
        .bind(&profile.phone_number)
        .bind(&profile.telegram)
        .bind(&profile.city)
        .bind(profile.age)
        .bind(&profile.employment)
        .bind(&profile.is_business_owner)
        .bind(&profile.position_at_work)
        .bind(profile.month_income)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_profile_write_error(e, "Failed to insert profile"))?;

        sqlx::query("INSERT INTO sessions (user_id, refresh_token) VALUES ($1, $2)")
            .bind(identity.id)
            .bind(&identity.refresh_token)
            .execute(&mut *tx)
            .await
            .map_err(|e| CampusError::database(e, "Failed to insert session"))?;

        tx.commit()
            .await
            .map_err(|e| CampusError::database(e, "Failed to commit registration"))?;

        self.get_user(&identity.id)
            .await?
            .ok_or_else(|| CampusError::internal("Identity not found after creation"))
    }

    #[instrument(skip(self, email), name = "db_find_credentials")]
    async fn find_credentials_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT i.id, i.password_hash, i.role FROM identities i \
             JOIN profiles p ON p.user_id = i.id WHERE p.email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to fetch credentials"))?;

        row.map(|r| {
            Ok(Identity { id: r.id, password_hash: r.password_hash, role: parse_role(&r.role)? })
        })
        .transpose()
    }

    #[instrument(skip(self, email), name = "db_find_user_by_email")]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM identities i JOIN profiles p ON p.user_id = i.id WHERE p.email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to fetch user by email"))?;

        row.map(row_to_user).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM identities i JOIN profiles p ON p.user_id = i.id WHERE i.id = $1"
        ))
        .bind(*id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to fetch user"))?;

        row.map(row_to_user).transpose()
    }

    #[instrument(skip(self), name = "db_list_users")]
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM identities i JOIN profiles p ON p.user_id = i.id \
             ORDER BY i.created_at, i.id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to list users"))?;

        rows.into_iter().map(row_to_user).collect()
    }

    #[instrument(skip(self, changes), fields(user_id = %id), name = "db_update_profile")]
    async fn update_profile(&self, id: &UserId, changes: UpdateProfileRequest) -> Result<User> {
        // email is the token subject and is never rewritten here
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                name = $2, birthdate = $3, phone_number = $4, telegram = $5,
                city = $6, age = $7, employment = $8, is_business_owner = $9,
                position_at_work = $10, month_income = $11, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $1
            "#,
        )
        .bind(*id)
        .bind(&changes.name)
        .bind(changes.birthdate)
        .bind(&changes.phone_number)
        .bind(&changes.telegram)
        .bind(&changes.city)
        .bind(changes.age)
        .bind(&changes.employment)
        .bind(&changes.is_business_owner)
        .bind(&changes.position_at_work)
        .bind(changes.month_income)
        .execute(&self.pool)
        .await
        .map_err(|e| CampusError::database(e, "Failed to update profile"))?;

        if result.rows_affected() == 0 {
            return Err(CampusError::not_found("identity", id.to_string()));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| CampusError::not_found("identity", id.to_string()))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_delete_identity")]
    async fn delete_identity(&self, id: &UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(*id)
            .execute(&self.pool)
            .await
            .map_err(|e| CampusError::database(e, "Failed to delete identity"))?;

        if result.rows_affected() == 0 {
            return Err(CampusError::not_found("identity", id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %id), name = "db_set_refresh_token")]
    async fn set_refresh_token(&self, id: &UserId, token: &str) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CampusError::database(e, "Failed to begin session transaction"))?;

        let locked: Option<(UserId,)> =
            sqlx::query_as("SELECT user_id FROM sessions WHERE user_id = $1 FOR UPDATE")
                .bind(*id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| CampusError::database(e, "Failed to lock session"))?;

        if locked.is_none() {
            return Err(CampusError::not_found("session", id.to_string()));
        }

        sqlx::query(
            "UPDATE sessions SET refresh_token = $2, updated_at = CURRENT_TIMESTAMP WHERE user_id = $1",
        )
        .bind(*id)
        .bind(token)
        .execute(&mut *tx)
        .await
        .map_err(|e| CampusError::database(e, "Failed to store refresh token"))?;

        tx.commit().await.map_err(|e| CampusError::database(e, "Failed to commit session"))?;
        Ok(())
    }

    #[instrument(skip(self, presented, replacement), fields(user_id = %id), name = "db_rotate_refresh_token")]
    async fn rotate_refresh_token(
        &self,
        id: &UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<RotationOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CampusError::database(e, "Failed to begin rotation transaction"))?;

        // Concurrent rotations for the same identity queue here until we commit.
        let stored: Option<(String,)> =
            sqlx::query_as("SELECT refresh_token FROM sessions WHERE user_id = $1 FOR UPDATE")
                .bind(*id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| CampusError::database(e, "Failed to lock session"))?;

        let outcome = match stored {
            None => RotationOutcome::Missing,
            Some((current,)) if current.is_empty() || current != presented => {
                RotationOutcome::Stale
            }
            Some(_) => {
                sqlx::query(
                    "UPDATE sessions SET refresh_token = $2, updated_at = CURRENT_TIMESTAMP WHERE user_id = $1",
                )
                .bind(*id)
                .bind(replacement)
                .execute(&mut *tx)
                .await
                .map_err(|e| CampusError::database(e, "Failed to rotate refresh token"))?;
                RotationOutcome::Rotated
            }
        };

        tx.commit().await.map_err(|e| CampusError::database(e, "Failed to commit rotation"))?;
        Ok(outcome)
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_refresh_token")]
    async fn get_refresh_token(&self, id: &UserId) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT refresh_token FROM sessions WHERE user_id = $1")
                .bind(*id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CampusError::database(e, "Failed to fetch refresh token"))?;
        Ok(row.map(|(token,)| token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_stored_role_is_integrity_error() {
        assert_eq!(parse_role("administrator").unwrap(), Role::Administrator);
        let err = parse_role("2").unwrap_err();
        assert!(matches!(err, CampusError::Internal { .. }));
        assert!(err.to_string().contains("Data integrity"));
    }

    #[test]
    fn row_conversion_rejects_unknown_role() {
        let row = UserRow {
            id: UserId::new(),
            role: "superuser".into(),
            email: "a@b.co".into(),
            name: "Ann".into(),
            birthdate: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            phone_number: "+70000000000".into(),
            telegram: "@annann".into(),
            city: String::new(),
            age: None,
            employment: String::new(),
            is_business_owner: String::new(),
            position_at_work: String::new(),
            month_income: None,
            created_at: Utc::now(),
        };
        assert!(row_to_user(row).is_err());
    }
}
