//! Responders for the two outcomes of a view: a rendered page or a redirect.
//!
//! Pages are handed to the presentation layer as the template name together
//! with the serialized context, e.g.
//! `{"template": "posts/index.html", "context": {"page_obj": ...}}`.

use crate::server::json::Json;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const LOGIN_URL: &str = "/auth/login/";

#[derive(Clone, Debug, Serialize)]
pub struct Render<C> {
    pub template: &'static str,
    pub context: C,
}

impl<C> Render<C> {
    pub fn new(template: &'static str, context: C) -> Self {
        Self { template, context }
    }
}

impl<C: Serialize> IntoResponse for Render<C> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `302 Found` redirect.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Found(String);

impl Found {
    pub fn to(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Sends the client to the login page, returning to `next` afterwards.
    pub fn to_login(next: &str) -> Self {
        Self(format!("{LOGIN_URL}?next={}", urlencoding::encode(next)))
    }

    pub fn location(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(header::LOCATION, self.0)]).into_response()
    }
}
