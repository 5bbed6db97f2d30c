use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    render::Render,
    routes::{PageQuery, Query},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yatube_common::{
    model::{
        group::{Group, GroupSlug},
        post::Post,
    },
    pagination::Page,
};
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(group_posts)
        .typed_get(follow_index)
}

#[derive(Serialize)]
struct FeedContext {
    page_obj: Page<Post>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
pub struct IndexPath();

async fn index(
    IndexPath(): IndexPath,
    State(db): State<Arc<DbClient>>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Render<FeedContext>> {
    let page_obj = db.fetch_posts_page(PostFilter::All, page.as_deref()).await?;

    Ok(Render::new("posts/index.html", FeedContext { page_obj }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}/", rejection(ServerError))]
pub struct GroupPostsPath {
    pub slug: String,
}

#[derive(Serialize)]
struct GroupFeedContext {
    group: Group,
    page_obj: Page<Post>,
}

async fn group_posts(
    GroupPostsPath { slug }: GroupPostsPath,
    State(db): State<Arc<DbClient>>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Render<GroupFeedContext>> {
    let Ok(group_slug) = GroupSlug::new(slug.clone()) else {
        return Err(ServerError::GroupBySlugNotFound(slug));
    };

    let group = db
        .fetch_group_by_slug(&group_slug)
        .await?
        .ok_or(ServerError::GroupBySlugNotFound(slug))?;

    let page_obj = db
        .fetch_posts_page(PostFilter::Group(group.id), page.as_deref())
        .await?;

    Ok(Render::new(
        "posts/group_list.html",
        GroupFeedContext { group, page_obj },
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow/", rejection(ServerError))]
pub struct FollowIndexPath();

async fn follow_index(
    FollowIndexPath(): FollowIndexPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Result<Render<FeedContext>> {
    let page_obj = db
        .fetch_posts_page(PostFilter::FollowedBy(user.user_id()), page.as_deref())
        .await?;

    Ok(Render::new("posts/follow.html", FeedContext { page_obj }))
}
