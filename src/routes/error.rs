use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{Request, catch};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct Error {
    pub message: String,
}

fn message(text: &str) -> Json<Error> {
    Json(Error { message: text.to_string() })
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> Json<Error> {
    message("Please sign in to continue")
}

#[catch(404)]
pub fn not_found(_: &Request) -> Json<Error> {
    message("Not found")
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> Json<Error> {
    message("Request body could not be read")
}

#[catch(500)]
pub fn internal_error(_: &Request) -> Json<Error> {
    message("Internal server error")
}
