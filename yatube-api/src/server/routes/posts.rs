use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    forms::{
        CleanedPost, CommentForm, FormContext, FormErrors, PostFormValues, PostSubmission,
        comment_form, post_form,
    },
    media::MediaStore,
    render::{Found, Render},
    routes::profiles::ProfilePath,
};
use axum::{
    extract::{FromRequest, Request, State},
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use yatube_common::model::{
    Id,
    comment::{Comment, CreateComment},
    post::{CreatePost, Post, PostContent, PostMarker},
};
use yatube_db::client::{DbClient, PostFilter};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(post_detail)
        .typed_get(post_create_form)
        .typed_post(post_create)
        .typed_get(post_edit_form)
        .typed_post(post_edit)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/", rejection(ServerError))]
pub struct PostDetailPath {
    pub id: Id<PostMarker>,
}

#[derive(Serialize)]
struct PostDetailContext {
    post: Post,
    short_text: String,
    count: u64,
    comments: Vec<Comment>,
    form: FormContext<CommentForm>,
}

async fn post_detail(
    PostDetailPath { id }: PostDetailPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Render<PostDetailContext>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    let count = db.count_posts(PostFilter::Author(post.author.id)).await?;
    let comments = db.fetch_post_comments(id).await?;

    Ok(Render::new(
        "posts/post_detail.html",
        PostDetailContext {
            short_text: post.short_text().to_owned(),
            post,
            count,
            comments,
            form: comment_form(CommentForm::default(), FormErrors::default()),
        },
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/create/", rejection(ServerError))]
pub struct PostCreatePath();

#[derive(Serialize)]
struct PostCreateContext {
    form: FormContext<PostFormValues>,
}

async fn post_create_form(
    PostCreatePath(): PostCreatePath,
    State(db): State<Arc<DbClient>>,
    _user: AuthenticatedUser,
) -> Result<Render<PostCreateContext>> {
    let groups = db.fetch_groups().await?;
    let form = post_form(&groups, PostFormValues::default(), FormErrors::default());

    Ok(Render::new("posts/create_post.html", PostCreateContext { form }))
}

async fn post_create(
    PostCreatePath(): PostCreatePath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: AuthenticatedUser,
    submission: PostSubmission,
) -> Result<Response> {
    let groups = db.fetch_groups().await?;
    let values = submission.values();

    let cleaned = match submission.clean(&groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            debug!(?errors, "Rejected invalid post");
            let form = post_form(&groups, values, errors);
            let context = PostCreateContext { form };
            return Ok(Render::new("posts/create_post.html", context).into_response());
        }
    };

    let author = db
        .fetch_user(user.user_id())
        .await?
        .ok_or(ServerError::UserByIdNotFound(user.user_id()))?;

    let image = store_image(&media, &cleaned).await?;
    let post_id = db
        .create_post(&CreatePost {
            author: author.id,
            content: PostContent {
                text: cleaned.text,
                group: cleaned.group,
                image,
            },
        })
        .await?;

    info!(post = %post_id, author = %author.username, "Created post");

    let profile = ProfilePath {
        username: author.username.into_inner(),
    };
    Ok(Found::to(profile.to_string()).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/edit/", rejection(ServerError))]
pub struct PostEditPath {
    pub id: Id<PostMarker>,
}

#[derive(Serialize)]
struct PostEditContext {
    form: FormContext<PostFormValues>,
    is_edit: bool,
    text: String,
    post: Post,
}

/// Fetches the post to edit, or the redirect answered to anyone but its
/// author.
async fn editable_post(
    db: &DbClient,
    id: Id<PostMarker>,
    user: &MaybeUser,
) -> Result<Result<Post, Found>> {
    let post = db
        .fetch_post(id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    if user.user_id() == Some(post.author.id) {
        Ok(Ok(post))
    } else {
        debug!(post = %id, user = ?user.user_id(), "Refusing to edit foreign post");
        Ok(Err(Found::to(PostDetailPath { id }.to_string())))
    }
}

async fn post_edit_form(
    PostEditPath { id }: PostEditPath,
    State(db): State<Arc<DbClient>>,
    user: MaybeUser,
) -> Result<Response> {
    let post = match editable_post(&db, id, &user).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let groups = db.fetch_groups().await?;
    let values = PostFormValues {
        text: post.text.clone(),
        group: post.group.as_ref().map(|group| group.id.to_string()),
        image: post.image.clone(),
    };

    let context = PostEditContext {
        form: post_form(&groups, values, FormErrors::default()),
        is_edit: true,
        text: post.text.clone(),
        post,
    };
    Ok(Render::new("posts/create_post.html", context).into_response())
}

async fn post_edit(
    PostEditPath { id }: PostEditPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    user: MaybeUser,
    request: Request,
) -> Result<Found> {
    let post = match editable_post(&db, id, &user).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };
    let detail = Found::to(PostDetailPath { id }.to_string());

    // Only the author's body is read.
    let submission = PostSubmission::from_request(request, &()).await?;

    let groups = db.fetch_groups().await?;
    let cleaned = match submission.clean(&groups) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            debug!(post = %id, ?errors, "Dropping invalid post edit");
            return Ok(detail);
        }
    };

    let image = match store_image(&media, &cleaned).await? {
        Some(image) => Some(image),
        None if cleaned.image_clear => None,
        None => post.image,
    };

    let content = PostContent {
        text: cleaned.text,
        group: cleaned.group,
        image,
    };
    if db.update_post(id, &content).await? {
        info!(post = %id, "Edited post");
    }

    Ok(detail)
}

async fn store_image(media: &MediaStore, cleaned: &CleanedPost) -> Result<Option<String>> {
    let Some(upload) = &cleaned.image else {
        return Ok(None);
    };

    let path = media
        .save_post_image(&upload.file_name, &upload.bytes)
        .await
        .map_err(ServerError::Media)?;
    Ok(Some(path))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comment/", rejection(ServerError))]
pub struct AddCommentPath {
    pub id: Id<PostMarker>,
}

async fn add_comment(
    AddCommentPath { id }: AddCommentPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    submission: Result<CommentForm, ServerError>,
) -> Result<Found> {
    if db.fetch_post(id).await?.is_none() {
        return Err(ServerError::PostByIdNotFound(id));
    }

    // An unreadable body is an empty comment.
    let form = submission.unwrap_or_else(|err| {
        debug!(post = %id, error = %err, "Could not read comment body");
        CommentForm::default()
    });

    match form.clean() {
        Ok(text) => {
            let comment_id = db
                .create_comment(&CreateComment {
                    post: id,
                    author: user.user_id(),
                    text,
                })
                .await?;
            info!(post = %id, comment = %comment_id, "Added comment");
        }
        Err(errors) => debug!(post = %id, ?errors, "Dropping invalid comment"),
    }

    Ok(Found::to(PostDetailPath { id }.to_string()))
}
