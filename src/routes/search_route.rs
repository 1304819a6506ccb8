use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    domain::SearchState,
    error::ScoutError,
    session::{HarvestCommand, SearchCommand, Session},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateReply {
    #[serde(flatten)]
    state: SearchState,
    configuration_error: Option<String>,
}

#[derive(Deserialize)]
struct ExpandBody {
    url: String,
}

#[post("")]
async fn run_search(
    session: web::Data<Session>,
    body: web::Json<SearchCommand>,
) -> Result<HttpResponse, ScoutError> {
    let response = session.run_search(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(response))
}

#[post("/harvest")]
async fn harvest(
    session: web::Data<Session>,
    body: web::Json<HarvestCommand>,
) -> Result<HttpResponse, ScoutError> {
    let outcome = session.run_harvest(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/cancel")]
async fn cancel(session: web::Data<Session>) -> HttpResponse {
    let cancelled = session.cancel_search();

    HttpResponse::Ok().json(serde_json::json!({ "cancelled": cancelled }))
}

#[get("/state")]
async fn state(session: web::Data<Session>) -> HttpResponse {
    HttpResponse::Ok().json(StateReply {
        state: session.snapshot(),
        configuration_error: session.configuration_error().map(str::to_string),
    })
}

#[post("/results/expand")]
async fn expand(
    session: web::Data<Session>,
    body: web::Json<ExpandBody>,
) -> Result<HttpResponse, ScoutError> {
    let is_expanded = session.toggle_expanded(&body.url)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "url": body.url, "isExpanded": is_expanded })))
}
