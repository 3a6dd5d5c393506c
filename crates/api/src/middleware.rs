use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use guestbook_core::AccountId;

use crate::context::CallerContext;

/// Header carrying the signing account, set by whatever fronts this host.
pub const ACCOUNT_HEADER: &str = "x-account-id";

pub async fn caller_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let account_id = extract_account(req.headers())?;
    req.extensions_mut().insert(CallerContext::new(account_id));
    Ok(next.run(req).await)
}

fn extract_account(headers: &HeaderMap) -> Result<AccountId, StatusCode> {
    let header = headers
        .get(ACCOUNT_HEADER)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    AccountId::new(header.trim()).map_err(|_| StatusCode::UNAUTHORIZED)
}
