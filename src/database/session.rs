use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::session::ScheduledSession;

/// Where the session feed reads its rows from.
#[async_trait::async_trait]
pub trait SessionSource: Send + Sync {
    async fn fetch_sessions(&self) -> Result<Vec<ScheduledSession>, AppError>;
}

#[async_trait::async_trait]
impl SessionSource for PostgresRepository {
    async fn fetch_sessions(&self) -> Result<Vec<ScheduledSession>, AppError> {
        // Date and time are read as text: a malformed row must not fail the read.
        let sessions = sqlx::query_as::<_, ScheduledSession>(
            r#"
            SELECT sessionid,
                   sessiontitle,
                   sessiondate::text AS sessiondate,
                   sessiontime::text AS sessiontime,
                   sessionlink,
                   name_of_the_trainer,
                   day
            FROM sessions
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}
