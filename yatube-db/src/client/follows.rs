use crate::client::{DbClient, Result, row_count};
use sqlx::{query, query_scalar};
use yatube_common::model::{Id, follow::Follow, user::UserMarker};

impl DbClient {
    /// Returns `false` if the follow already existed.
    pub async fn create_follow(&self, follow: Follow) -> Result<bool> {
        let result = query(
            "
            INSERT INTO follows (user_id, author_id)
            VALUES (?, ?)
            ON CONFLICT (user_id, author_id) DO NOTHING
            ",
        )
        .bind(follow.user().get())
        .bind(follow.author().get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Returns how many follows were removed; zero is not an error.
    pub async fn delete_follows(
        &self,
        user_id: Id<UserMarker>,
        author_id: Id<UserMarker>,
    ) -> Result<u64> {
        let result = query(
            "
            DELETE FROM follows
            WHERE follows.user_id = ? AND follows.author_id = ?
            ",
        )
        .bind(user_id.get())
        .bind(author_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn is_following(
        &self,
        user_id: Id<UserMarker>,
        author_id: Id<UserMarker>,
    ) -> Result<bool> {
        let following = query_scalar::<_, i64>(
            "
            SELECT EXISTS (
                SELECT 1 FROM follows
                WHERE follows.user_id = ? AND follows.author_id = ?
            )
            ",
        )
        .bind(user_id.get())
        .bind(author_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(following != 0)
    }

    /// Number of authors `user_id` follows.
    pub async fn count_follows(&self, user_id: Id<UserMarker>) -> Result<u64> {
        let count = query_scalar::<_, i64>(
            "
            SELECT COUNT(*) FROM follows
            WHERE follows.user_id = ?
            ",
        )
        .bind(user_id.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(row_count(count))
    }
}
