use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::{AppError, UNAUTHORIZED_DESCRIPTION};
use rocket::http::{Cookie, SameSite, Status};
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

pub const MEMBER_COOKIE: &str = "member";

/// A signed-in member. Every portal page except login sits behind this guard.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentMember {
    pub id: Uuid,
    pub email: String,
    pub session_id: Uuid,
}

pub(crate) fn member_cookie_value(session_id: &Uuid, member_id: &Uuid) -> String {
    format!("{}:{}", session_id, member_id)
}

pub(crate) fn parse_member_cookie_value(value: &str) -> Option<(Uuid, Uuid)> {
    let (session_id_str, member_id_str) = value.split_once(':')?;
    let session_id = Uuid::parse_str(session_id_str).ok()?;
    let member_id = Uuid::parse_str(member_id_str).ok()?;
    Some((session_id, member_id))
}

pub(crate) fn build_member_cookie(value: String) -> Cookie<'static> {
    Cookie::build((MEMBER_COOKIE, value)).path("/").http_only(true).same_site(SameSite::Lax).build()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentMember {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let cookies = req.cookies();
        if let Some(cookie) = cookies.get_private(MEMBER_COOKIE)
            && let Some((session_id, member_id)) = parse_member_cookie_value(cookie.value())
        {
            let pool = match req.rocket().state::<PgPool>() {
                Some(pool) => pool,
                None => return Outcome::Error((Status::InternalServerError, AppError::Unauthorized)),
            };

            let repo = PostgresRepository { pool: pool.clone() };

            return match repo.get_active_session_member(&session_id, &member_id).await {
                Ok(Some(member)) => {
                    let current_member = CurrentMember {
                        id: member.id,
                        email: member.email,
                        session_id,
                    };
                    req.local_cache(|| Some(current_member.clone()));
                    Outcome::Success(current_member)
                }
                Ok(None) => {
                    cookies.remove_private(Cookie::build(MEMBER_COOKIE).path("/").build());
                    Outcome::Error((Status::Unauthorized, AppError::Unauthorized))
                }
                Err(err) => Outcome::Error((Status::InternalServerError, err)),
            };
        }

        Outcome::Error((Status::Unauthorized, AppError::Unauthorized))
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentMember {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Cookie-based authentication. Sign in via POST /members/login to obtain the member cookie.".to_string()),
            data: SecuritySchemeData::ApiKey {
                name: MEMBER_COOKIE.to_string(),
                location: "cookie".to_string(),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("memberCookie".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("memberCookie".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: UNAUTHORIZED_DESCRIPTION.to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
