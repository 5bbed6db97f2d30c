use crate::{
    client::{DbClient, Result, now_millis, row_count},
    record::FullPostRecord,
};
use sqlx::{QueryBuilder, Sqlite, query, query_as, query_scalar};
use yatube_common::{
    model::{
        Id,
        group::GroupMarker,
        post::{CreatePost, Post, PostContent, PostMarker},
        user::UserMarker,
    },
    pagination::{POSTS_PER_PAGE, Page, Paginator},
};

const SELECT_FULL_POST: &str = "
    SELECT
        posts.post_id,
        posts.text,
        posts.image,
        posts.pub_date,
        users.user_id AS author_id,
        users.username AS author_username,
        post_groups.group_id,
        post_groups.title AS group_title,
        post_groups.slug AS group_slug,
        post_groups.description AS group_description
    FROM
        posts
        JOIN users ON users.user_id = posts.author_id
        LEFT JOIN post_groups ON post_groups.group_id = posts.group_id
";

/// Which posts a feed shows.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum PostFilter {
    All,
    Group(Id<GroupMarker>),
    Author(Id<UserMarker>),
    /// Posts of every author the given user follows.
    FollowedBy(Id<UserMarker>),
}

impl PostFilter {
    fn push_where(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            PostFilter::All => {}
            PostFilter::Group(group_id) => {
                builder
                    .push(" WHERE posts.group_id = ")
                    .push_bind(group_id.get());
            }
            PostFilter::Author(author_id) => {
                builder
                    .push(" WHERE posts.author_id = ")
                    .push_bind(author_id.get());
            }
            PostFilter::FollowedBy(user_id) => {
                builder
                    .push(
                        " WHERE posts.author_id IN \
                        (SELECT follows.author_id FROM follows WHERE follows.user_id = ",
                    )
                    .push_bind(user_id.get())
                    .push(")");
            }
        }
    }
}

impl DbClient {
    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record = query_as::<_, FullPostRecord>(&format!(
            "{SELECT_FULL_POST} WHERE posts.post_id = ?"
        ))
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn count_posts(&self, filter: PostFilter) -> Result<u64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        filter.push_where(&mut builder);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(row_count(count))
    }

    /// One page of a feed, newest first. `requested_page` is the raw
    /// `?page=` value; see [`Paginator::page_number`] for how it is resolved.
    pub async fn fetch_posts_page(
        &self,
        filter: PostFilter,
        requested_page: Option<&str>,
    ) -> Result<Page<Post>> {
        let mut transaction = self.pool.begin().await?;

        let mut count_builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts");
        filter.push_where(&mut count_builder);
        let count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&mut *transaction)
            .await?;

        let paginator = Paginator::new(row_count(count), POSTS_PER_PAGE);
        let number = paginator.page_number(requested_page);
        let window = paginator.window(number);

        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_FULL_POST);
        filter.push_where(&mut builder);
        builder
            .push(" ORDER BY posts.pub_date DESC, posts.post_id DESC LIMIT ")
            .push_bind(i64::from(window.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));

        let records: Vec<FullPostRecord> = builder
            .build_query_as()
            .fetch_all(&mut *transaction)
            .await?;

        transaction.commit().await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(paginator.page(number, posts))
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Id<PostMarker>> {
        let returned_id = query_scalar::<_, i64>(
            "
            INSERT INTO posts (author_id, group_id, text, image, pub_date)
            VALUES (?, ?, ?, ?, ?)
            RETURNING posts.post_id
            ",
        )
        .bind(post.author.get())
        .bind(post.content.group.map(Id::get))
        .bind(&post.content.text)
        .bind(post.content.image.as_deref())
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(returned_id.into())
    }

    /// Replaces text, group and image of a post. Returns `false` if the post
    /// does not exist.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        content: &PostContent,
    ) -> Result<bool> {
        let result = query(
            "
            UPDATE posts
            SET text = ?, group_id = ?, image = ?
            WHERE posts.post_id = ?
            ",
        )
        .bind(&content.text)
        .bind(content.group.map(Id::get))
        .bind(content.image.as_deref())
        .bind(post_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
