//! User repository for database operations

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{CredentialStore, IdentityStore};
use crate::models::{Identity, IdentityChanges, NewIdentity, Role};

const IDENTITY_COLUMNS: &str =
    "id, phone, name, email, address, gender, password_hash, role, created_at, updated_at";

/// User repository backed by the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn identity_from_row(row: &PgRow) -> DatabaseResult<Identity> {
    let role: String = row.try_get("role").map_err(DatabaseError::Query)?;
    let role = role.parse::<Role>().map_err(|e| {
        DatabaseError::Query(sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })
    })?;

    let identity = Identity {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        phone: row.try_get("phone").map_err(DatabaseError::Query)?,
        name: row.try_get("name").map_err(DatabaseError::Query)?,
        email: row.try_get("email").map_err(DatabaseError::Query)?,
        address: row.try_get("address").map_err(DatabaseError::Query)?,
        gender: row.try_get("gender").map_err(DatabaseError::Query)?,
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        role,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    };

    Ok(identity)
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn find_by_key(&self, key: &str) -> DatabaseResult<Option<Identity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn exists_by_key(&self, key: &str) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE phone = $1)")
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        Ok(exists)
    }
}

#[async_trait]
impl IdentityStore for UserRepository {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Identity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn insert(&self, new_identity: NewIdentity) -> DatabaseResult<Identity> {
        info!("Creating new user with role {}", new_identity.role);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, phone, name, email, address, gender, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_identity.phone)
        .bind(&new_identity.name)
        .bind(&new_identity.email)
        .bind(&new_identity.address)
        .bind(&new_identity.gender)
        .bind(&new_identity.password_hash)
        .bind(new_identity.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        identity_from_row(&row)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &IdentityChanges,
    ) -> DatabaseResult<Option<Identity>> {
        info!("Updating user {}", id);

        let profile = &changes.profile;
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                address = COALESCE($4, address),
                phone = COALESCE($5, phone),
                gender = COALESCE($6, gender),
                role = COALESCE($7, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.address)
        .bind(&profile.phone)
        .bind(&profile.gender)
        .bind(changes.role.map(Role::as_str))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        row.as_ref().map(identity_from_row).transpose()
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        info!("Deleting user {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }
}
