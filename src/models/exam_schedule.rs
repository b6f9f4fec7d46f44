use rocket::serde::Serialize;
use schemars::JsonSchema;

#[derive(Serialize, Debug, Clone, sqlx::FromRow, JsonSchema)]
pub struct Candidate {
    pub membership_id: i64,
    pub name: String,
    pub place: Option<String>,
    pub state: Option<String>,
    pub can_id: String,
    pub batch_id: Option<String>,
    pub batch_name: Option<String>,
    pub exam_date: Option<String>,
}
