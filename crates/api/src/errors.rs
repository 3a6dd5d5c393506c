use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use guestbook_infra::ContractError;
use guestbook_ledger::PostError;

pub fn contract_error_to_response(err: ContractError) -> axum::response::Response {
    match err {
        ContractError::NotInitialized => {
            json_error(StatusCode::CONFLICT, "not_initialized", err.to_string())
        }
        ContractError::AlreadyInitialized => {
            json_error(StatusCode::CONFLICT, "already_initialized", err.to_string())
        }
        ContractError::UnknownMethod(_) => {
            json_error(StatusCode::NOT_FOUND, "unknown_method", err.to_string())
        }
        ContractError::InvalidArgs { .. } => {
            json_error(StatusCode::BAD_REQUEST, "invalid_args", err.to_string())
        }
        ContractError::Rejected(PostError::EmptyMessage) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "empty_message", err.to_string())
        }
        ContractError::Rejected(PostError::MessageTooLong { .. }) => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "message_too_long",
            err.to_string(),
        ),
        ContractError::Service(e) => {
            tracing::error!(error = %e, "ledger service failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ledger_error", e.to_string())
        }
        ContractError::Encode(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "encode_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
