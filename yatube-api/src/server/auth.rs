use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;
use yatube_common::model::{
    Id,
    auth::{AuthToken, AuthTokenHash},
    user::UserMarker,
};
use yatube_db::client::DbClient;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// A request carrying a valid bearer token. Anonymous requests are
/// redirected to the login page.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    id: Id<UserMarker>,
    token_hash: AuthTokenHash,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.id
    }

    #[must_use]
    pub fn token_hash(&self) -> &AuthTokenHash {
        &self.token_hash
    }
}

/// The requesting user if there is one; never rejects anonymous requests.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl MaybeUser {
    #[must_use]
    pub fn user_id(&self) -> Option<Id<UserMarker>> {
        self.0.as_ref().map(AuthenticatedUser::user_id)
    }
}

/// Missing, malformed, unknown and expired tokens all make the request
/// anonymous. Only internal failures are errors.
async fn authenticate<S>(
    parts: &mut Parts,
    state: &S,
) -> Result<Option<AuthenticatedUser>, ServerError>
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    let Ok(header) = AuthorizationHeader::from_request_parts(parts, state).await else {
        return Ok(None);
    };

    let request_token: AuthToken = match header.token().parse() {
        Ok(token) => token,
        Err(err) => {
            debug!(error = %err, "Ignoring undecodable auth token");
            return Ok(None);
        }
    };

    let token_hash = request_token.hash()?;

    let Some(authentication) = Arc::<DbClient>::from_ref(state)
        .fetch_auth(&token_hash)
        .await?
    else {
        debug!(user = %request_token.user_id, "Ignoring unknown auth token");
        return Ok(None);
    };

    if authentication.user != request_token.user_id
        || authentication.is_expired_at(OffsetDateTime::now_utc())
    {
        debug!(user = %authentication.user, "Ignoring expired or mismatched auth token");
        return Ok(None);
    }

    Ok(Some(AuthenticatedUser {
        id: authentication.user,
        token_hash,
    }))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await?.ok_or_else(|| {
            let next = parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_owned(), ToString::to_string);

            ServerError::LoginRequired { next }
        })
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<DbClient>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(MaybeUser)
    }
}
