use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth;
use crate::models::BotCreateRequest;
use crate::supervisor::SupervisorError;
use crate::AppState;

const EVENTS_DEFAULT_LIMIT: i64 = 100;
const EVENTS_MAX_LIMIT: i64 = 1000;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/v1/bots").route(web::post().to(create_bot)));
    cfg.service(web::resource("/v1/bots/{bot_id}").route(web::get().to(get_bot_status)));
    cfg.service(web::resource("/v1/bots/{bot_id}/start").route(web::post().to(start_bot)));
    cfg.service(web::resource("/v1/bots/{bot_id}/stop").route(web::post().to(stop_bot)));
    cfg.service(web::resource("/v1/bots/{bot_id}/pause").route(web::post().to(pause_bot)));
    cfg.service(web::resource("/v1/bots/{bot_id}/events").route(web::get().to(get_bot_events)));
}

/// Create a bot in `created` status. Admins must name the owner; regular
/// clients always own what they create.
async fn create_bot(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<BotCreateRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let body = body.into_inner();

    let owner_client_id = if auth.is_admin {
        match body.owner_client_id {
            Some(owner) => owner,
            None => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "owner_client_id is required for admin requests"
                })))
            }
        }
    } else {
        if let Some(requested) = &body.owner_client_id {
            if requested != &auth.client_id {
                return Err(auth::AuthError::Forbidden.into());
            }
        }
        auth.client_id
    };

    let bot = state
        .registry
        .create_bot(&owner_client_id, &body.bot_type, &body.config)?;
    Ok(HttpResponse::Ok().json(bot))
}

async fn get_bot_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let bot = state.registry.get_bot(&path)?;
    auth::ensure_bot_owned_or_admin(&bot.owner_client_id, &auth)?;
    Ok(HttpResponse::Ok().json(bot))
}

async fn start_bot(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let bot = state.registry.get_bot(&path)?;
    auth::ensure_bot_owned_or_admin(&bot.owner_client_id, &auth)?;

    let bot = state.runner.start_bot(&path).await?;
    Ok(HttpResponse::Ok().json(bot))
}

async fn stop_bot(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let bot = state.registry.get_bot(&path)?;
    auth::ensure_bot_owned_or_admin(&bot.owner_client_id, &auth)?;

    let bot = state.runner.stop_bot(&path, false).await?;
    Ok(HttpResponse::Ok().json(bot))
}

async fn pause_bot(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let bot = state.registry.get_bot(&path)?;
    auth::ensure_bot_owned_or_admin(&bot.owner_client_id, &auth)?;

    let bot = state.runner.stop_bot(&path, true).await?;
    Ok(HttpResponse::Ok().json(bot))
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<i64>,
}

/// Events ordered oldest-first; `limit` keeps the most recent ones.
async fn get_bot_events(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<EventsQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let bot = state.registry.get_bot(&path)?;
    auth::ensure_bot_owned_or_admin(&bot.owner_client_id, &auth)?;

    let limit = query
        .limit
        .unwrap_or(EVENTS_DEFAULT_LIMIT)
        .clamp(1, EVENTS_MAX_LIMIT);
    let events = state
        .db
        .list_bot_events(&bot.bot_id, limit)
        .map_err(SupervisorError::from)?;
    Ok(HttpResponse::Ok().json(events))
}
