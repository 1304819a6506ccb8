use actix_web::{post, web, HttpResponse};
use serde::Deserialize;

use crate::{
    error::ScoutError,
    session::{BatchCommand, Session},
};

#[derive(Deserialize)]
struct ClassifyOneBody {
    url: String,
}

#[post("/one")]
async fn classify_one(
    session: web::Data<Session>,
    body: web::Json<ClassifyOneBody>,
) -> Result<HttpResponse, ScoutError> {
    let outcome = session.classify_one(&body.url).await?;

    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/batch")]
async fn classify_batch(
    session: web::Data<Session>,
    body: web::Json<BatchCommand>,
) -> Result<HttpResponse, ScoutError> {
    let reply = session.classify_batch(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(reply))
}
