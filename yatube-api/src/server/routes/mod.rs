use crate::server::{ServerError, ServerRouter};
use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
};
use serde::Deserialize;

mod accounts;
mod feeds;
mod posts;
mod profiles;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(feeds::routes())
        .merge(posts::routes())
        .merge(profiles::routes())
        .merge(accounts::routes())
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
struct Query<T>(T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ServerError))]
struct Form<T>(T);

/// The `?page=` query of paginated views. The raw value is kept so that
/// non-numeric pages fall back to the first page instead of being rejected.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct PageQuery {
    page: Option<String>,
}
