use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth;
use crate::db::Database;
use crate::models::{ChatRequest, ChatResponse};
use crate::supervisor::SupervisorError;
use crate::AppState;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/chat").route(web::post().to(chat)));
}

/// One chat turn: fetch scoped history, call the configured LLM provider,
/// persist both sides of the exchange unless the caller opted out.
async fn chat(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let auth = auth::authenticate(&req, &state.db, &state.config.shared_secret)?;
    let body = body.into_inner();

    // reset_conversation discards the supplied id and mints a fresh one
    let incoming = if body.reset_conversation {
        None
    } else {
        body.conversation_id.as_deref()
    };
    let conversation_id = Database::ensure_conversation_id(incoming);

    let history = state
        .db
        .get_recent_messages(&conversation_id, body.history_limit, Some(&auth.client_id))
        .map_err(SupervisorError::from)?;

    let reply = state.ai.generate(&body.message, &history).await;

    if body.persist {
        state
            .db
            .append_message(Some(&auth.client_id), &conversation_id, "user", &body.message)
            .map_err(SupervisorError::from)?;
        state
            .db
            .append_message(Some(&auth.client_id), &conversation_id, "assistant", &reply)
            .map_err(SupervisorError::from)?;
    }

    Ok(HttpResponse::Ok().json(ChatResponse {
        reply,
        conversation_id,
        used_history: history.len(),
    }))
}
