use actix_web::{get, web, HttpResponse};

use crate::{error::ScoutError, session::Session};

#[get("/{job_id}")]
async fn job(
    session: web::Data<Session>,
    job_id: web::Path<String>,
) -> Result<HttpResponse, ScoutError> {
    let snapshot = session.job(&job_id)?;

    Ok(HttpResponse::Ok().json(snapshot))
}

#[get("/{job_id}/notifications")]
async fn notifications(
    session: web::Data<Session>,
    job_id: web::Path<String>,
) -> Result<HttpResponse, ScoutError> {
    let notifications = session.job_notifications(&job_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "notifications": notifications })))
}
