use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::member::{Member, MemberSession, SessionMember};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use std::sync::LazyLock;
use uuid::Uuid;

/// Verified against when the e-mail is unknown, so both paths cost one Argon2 run.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash_password("dummy-never-matches").ok());

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(member: &Member, password: &str) -> Result<(), AppError> {
    let password_hash = PasswordHash::new(&member.password_hash).map_err(|e| AppError::password_hash("Failed to parse stored password hash", e))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &password_hash)
        .map_err(|_| AppError::InvalidCredentials)
}

pub fn dummy_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref()
        && let Ok(hash) = PasswordHash::new(hash)
    {
        let _ = Argon2::default().verify_password(password.as_bytes(), &hash);
    }
}

impl PostgresRepository {
    pub async fn get_member_by_email(&self, email: &str) -> Result<Option<Member>, AppError> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, email, password_hash
            FROM members
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn create_member_session(&self, member_id: &Uuid, expires_at: DateTime<Utc>) -> Result<MemberSession, AppError> {
        sqlx::query("DELETE FROM member_session WHERE member_id = $1 AND expires_at <= now()")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        let session = sqlx::query_as::<_, MemberSession>(
            r#"
            INSERT INTO member_session (member_id, expires_at)
            VALUES ($1, $2)
            RETURNING id, member_id, expires_at
            "#,
        )
        .bind(member_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn get_active_session_member(&self, session_id: &Uuid, member_id: &Uuid) -> Result<Option<SessionMember>, AppError> {
        let member = sqlx::query_as::<_, SessionMember>(
            r#"
            SELECT m.id, m.email
            FROM member_session s
            JOIN members m ON m.id = s.member_id
            WHERE s.id = $1
              AND s.member_id = $2
              AND s.expires_at > now()
            "#,
        )
        .bind(session_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    pub async fn delete_member_session(&self, session_id: &Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM member_session WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
