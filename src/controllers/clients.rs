use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth;
use crate::models::ClientCreateRequest;
use crate::supervisor::SupervisorError;
use crate::AppState;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/v1/clients")
            .route(web::post().to(create_client))
            .route(web::get().to(list_clients)),
    );
}

/// Register a new client. The raw bearer token appears only in this
/// response; at rest only its hash survives.
async fn create_client(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ClientCreateRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    auth::verify_admin_secret(&req, &state.config.shared_secret)?;

    let created = state
        .db
        .create_client(body.name.as_deref(), None, false)
        .map_err(SupervisorError::from)?;
    log::info!("Registered client {}", created.client_id);
    Ok(HttpResponse::Ok().json(created))
}

async fn list_clients(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    auth::verify_admin_secret(&req, &state.config.shared_secret)?;

    let clients = state.db.list_clients().map_err(SupervisorError::from)?;
    Ok(HttpResponse::Ok().json(clients))
}
