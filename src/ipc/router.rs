use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::drivers::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::kids::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::activities::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::occurrences::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::assignments::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
