use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::exam_schedule::Candidate;

impl PostgresRepository {
    /// Looks a candidate up by numeric membership id or, case-insensitively,
    /// by candidate id.
    pub async fn find_candidate(&self, query: &str) -> Result<Option<Candidate>, AppError> {
        let membership_id = query.parse::<i64>().ok();

        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            SELECT membership_id, name, place, state, can_id, batch_id, batch_name,
                   exam_date::text AS exam_date
            FROM candidate_exam_schedule
            WHERE membership_id = $1
               OR can_id ILIKE $2 ESCAPE '\'
            ORDER BY membership_id
            LIMIT 1
            "#,
        )
        .bind(membership_id)
        .bind(escape_like(query))
        .fetch_optional(&self.pool)
        .await?;

        Ok(candidate)
    }
}

/// Makes `%`, `_` and `\` match literally inside an ILIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
