use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::session::Session;

#[get("/health")]
async fn health(session: web::Data<Session>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "configurationError": session.configuration_error(),
    }))
}
