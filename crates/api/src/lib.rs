//! HTTP host: exposes the guestbook contract's methods over HTTP.

pub mod app;
pub mod context;
pub mod errors;
pub mod middleware;
