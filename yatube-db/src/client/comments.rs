use crate::{
    client::{DbClient, Result, now_millis},
    record::CommentRecord,
};
use sqlx::{query_as, query_scalar};
use yatube_common::model::{
    Id,
    comment::{Comment, CommentMarker, CreateComment},
    post::PostMarker,
};

impl DbClient {
    pub async fn create_comment(&self, comment: &CreateComment) -> Result<Id<CommentMarker>> {
        let returned_id = query_scalar::<_, i64>(
            "
            INSERT INTO comments (post_id, author_id, text, created)
            VALUES (?, ?, ?, ?)
            RETURNING comments.comment_id
            ",
        )
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(&comment.text)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(returned_id.into())
    }

    /// Comments of a post, oldest first.
    pub async fn fetch_post_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = query_as::<_, CommentRecord>(
            "
            SELECT
                comments.comment_id,
                comments.post_id,
                comments.text,
                comments.created,
                users.user_id AS author_id,
                users.username AS author_username
            FROM
                comments
                JOIN users ON users.user_id = comments.author_id
            WHERE
                comments.post_id = ?
            ORDER BY
                comments.created, comments.comment_id
            ",
        )
        .bind(post_id.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }
}
