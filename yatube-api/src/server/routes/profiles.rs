use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    render::{Found, Render},
    routes::{PageQuery, Query},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::{
    model::{
        follow::Follow,
        post::Post,
        user::{User, Username},
    },
    pagination::Page,
};
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(profile)
        .typed_post(profile_follow)
        .typed_post(profile_unfollow)
}

async fn fetch_author(db: &DbClient, username: String) -> Result<User> {
    let Ok(parsed) = Username::new(username.clone()) else {
        return Err(ServerError::UserByUsernameNotFound(username));
    };

    db.fetch_user_by_username(&parsed)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))
}

fn profile_redirect(author: User) -> Found {
    let path = ProfilePath {
        username: author.username.into_inner(),
    };

    Found::to(path.to_string())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/", rejection(ServerError))]
pub struct ProfilePath {
    pub username: String,
}

#[derive(Serialize)]
struct ProfileContext {
    username: Username,
    author: User,
    page_obj: Page<Post>,
    count: u64,
    following: bool,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    State(db): State<Arc<DbClient>>,
    viewer: MaybeUser,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Render<ProfileContext>> {
    let author = fetch_author(&db, username).await?;

    let page_obj = db
        .fetch_posts_page(PostFilter::Author(author.id), page.as_deref())
        .await?;

    let following = match viewer.user_id() {
        Some(viewer_id) => db.is_following(viewer_id, author.id).await?,
        None => false,
    };

    Ok(Render::new(
        "posts/profile.html",
        ProfileContext {
            username: author.username.clone(),
            count: page_obj.count,
            author,
            page_obj,
            following,
        },
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/follow/", rejection(ServerError))]
pub struct ProfileFollowPath {
    pub username: String,
}

async fn profile_follow(
    ProfileFollowPath { username }: ProfileFollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Found> {
    let author = fetch_author(&db, username).await?;

    match Follow::new(user.user_id(), author.id) {
        Some(follow) => {
            if db.create_follow(follow).await? {
                info!(user = %user.user_id(), author = %author.username, "Followed author");
            }
        }
        None => debug!(user = %user.user_id(), "Ignoring self-follow"),
    }

    Ok(profile_redirect(author))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/profile/{username}/unfollow/", rejection(ServerError))]
pub struct ProfileUnfollowPath {
    pub username: String,
}

async fn profile_unfollow(
    ProfileUnfollowPath { username }: ProfileUnfollowPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Found> {
    let author = fetch_author(&db, username).await?;

    let deleted = db.delete_follows(user.user_id(), author.id).await?;
    info!(user = %user.user_id(), author = %author.username, deleted, "Unfollowed author");

    Ok(profile_redirect(author))
}
