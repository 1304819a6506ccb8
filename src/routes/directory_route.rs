use actix_web::{post, web, HttpResponse};
use serde::Deserialize;

use crate::{error::ScoutError, session::Session};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveBody {
    url: String,
    #[serde(default)]
    dry_run: bool,
}

#[post("/save")]
async fn save(
    session: web::Data<Session>,
    body: web::Json<SaveBody>,
) -> Result<HttpResponse, ScoutError> {
    let outcome = session.save_to_directory(&body.url, body.dry_run).await?;

    Ok(HttpResponse::Ok().json(outcome))
}
