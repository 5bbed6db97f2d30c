//! Data-access tests against a migrated in-memory database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use time::{Duration, OffsetDateTime};
use yatube_common::{
    model::{
        Id,
        auth::{AuthToken, Authentication, PasswordHash},
        comment::CreateComment,
        follow::Follow,
        group::{CreateGroup, Group, GroupSlug},
        post::{CreatePost, PostContent, PostMarker},
        user::{CreateUser, User, Username},
    },
    util::PositiveDuration,
};
use yatube_db::client::{DbClient, PostFilter};

async fn create_user(db: &DbClient, username: &str) -> User {
    let password_hash = PasswordHash::generate("secret-password").unwrap();
    db.create_user(&CreateUser {
        username: Username::new(username.to_owned()).unwrap(),
        password_hash,
    })
    .await
    .unwrap()
    .expect("username should be free")
}

async fn create_group(db: &DbClient, slug: &str) -> Group {
    db.create_group(&CreateGroup {
        title: format!("Group {slug}"),
        slug: GroupSlug::new(slug.to_owned()).unwrap(),
        description: "Test description".to_owned(),
    })
    .await
    .unwrap()
}

async fn create_post(
    db: &DbClient,
    author: &User,
    group: Option<&Group>,
    text: &str,
) -> Id<PostMarker> {
    db.create_post(&CreatePost {
        author: author.id,
        content: PostContent {
            text: text.to_owned(),
            group: group.map(|group| group.id),
            image: None,
        },
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn users_are_unique_by_username() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let user = create_user(&db, "auth").await;

    let duplicate = db
        .create_user(&CreateUser {
            username: user.username.clone(),
            password_hash: PasswordHash::generate("other-password").unwrap(),
        })
        .await
        .unwrap();
    assert!(duplicate.is_none());

    assert_eq!(db.fetch_user(user.id).await.unwrap(), Some(user.clone()));
    assert_eq!(
        db.fetch_user_by_username(&user.username).await.unwrap(),
        Some(user.clone())
    );

    let credentials = db.fetch_credentials(&user.username).await.unwrap().unwrap();
    assert_eq!(credentials.user, user);
    assert!(credentials.password_hash.verify("secret-password"));
}

#[tokio::test]
async fn feed_pages_hold_ten_posts_newest_first() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let user = create_user(&db, "auth").await;
    let group = create_group(&db, "slug").await;

    let mut ids = Vec::new();
    for i in 0..13 {
        ids.push(create_post(&db, &user, Some(&group), &format!("Post {i}")).await);
    }

    let first = db.fetch_posts_page(PostFilter::All, None).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first.count, 13);
    assert_eq!(first.num_pages, 2);
    assert_eq!(first.object_list[0].id, ids[12]);
    assert_eq!(first.object_list[0].group.as_ref(), Some(&group));

    let second = db
        .fetch_posts_page(PostFilter::All, Some("2"))
        .await
        .unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(second.object_list[2].id, ids[0]);

    let clamped = db
        .fetch_posts_page(PostFilter::All, Some("7"))
        .await
        .unwrap();
    assert_eq!(clamped.number, 2);
    assert_eq!(clamped.len(), 3);
}

#[tokio::test]
async fn groups_are_found_by_slug_and_listed_by_title() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let poems = create_group(&db, "poems").await;
    let novels = create_group(&db, "novels").await;

    let found = db
        .fetch_group_by_slug(&GroupSlug::new("poems".to_owned()).unwrap())
        .await
        .unwrap();
    assert_eq!(found, Some(poems.clone()));

    let missing = db
        .fetch_group_by_slug(&GroupSlug::new("plays".to_owned()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing, None);

    assert_eq!(db.fetch_groups().await.unwrap(), vec![novels, poems]);
}

#[tokio::test]
async fn feeds_filter_by_group_and_author() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let leo = create_user(&db, "leo").await;
    let fyodor = create_user(&db, "fyodor").await;
    let group = create_group(&db, "novels").await;
    let empty_group = create_group(&db, "poems").await;

    create_post(&db, &leo, Some(&group), "War and Peace").await;
    create_post(&db, &leo, None, "Anna Karenina").await;
    create_post(&db, &fyodor, Some(&group), "The Idiot").await;

    let group_page = db
        .fetch_posts_page(PostFilter::Group(group.id), None)
        .await
        .unwrap();
    assert_eq!(group_page.len(), 2);

    let empty_page = db
        .fetch_posts_page(PostFilter::Group(empty_group.id), None)
        .await
        .unwrap();
    assert!(empty_page.is_empty());
    assert_eq!(empty_page.num_pages, 1);

    assert_eq!(db.count_posts(PostFilter::Author(leo.id)).await.unwrap(), 2);
    assert_eq!(db.count_posts(PostFilter::All).await.unwrap(), 3);
}

#[tokio::test]
async fn update_post_keeps_author_and_count() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let user = create_user(&db, "auth").await;
    let group = create_group(&db, "slug").await;
    let post_id = create_post(&db, &user, None, "Before").await;

    let updated = db
        .update_post(
            post_id,
            &PostContent {
                text: "After".to_owned(),
                group: Some(group.id),
                image: Some("posts/small.gif".to_owned()),
            },
        )
        .await
        .unwrap();
    assert!(updated);

    let post = db.fetch_post(post_id).await.unwrap().unwrap();
    assert_eq!(post.text, "After");
    assert_eq!(post.group, Some(group));
    assert_eq!(post.image.as_deref(), Some("posts/small.gif"));
    assert_eq!(post.author, user);
    assert_eq!(db.count_posts(PostFilter::All).await.unwrap(), 1);

    let missing = db
        .update_post(Id::new(9_999), &PostContent::default())
        .await
        .unwrap();
    assert!(!missing);
}

#[tokio::test]
async fn comments_belong_to_their_post() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let user = create_user(&db, "auth").await;
    let post_id = create_post(&db, &user, None, "Post").await;
    let other_post_id = create_post(&db, &user, None, "Other post").await;

    for text in ["First", "Second"] {
        db.create_comment(&CreateComment {
            post: post_id,
            author: user.id,
            text: text.to_owned(),
        })
        .await
        .unwrap();
    }

    let comments = db.fetch_post_comments(post_id).await.unwrap();
    let texts: Vec<_> = comments
        .iter()
        .map(|comment| comment.text.as_str())
        .collect();
    assert_eq!(texts, ["First", "Second"]);
    assert!(comments.iter().all(|comment| comment.author == user));
    assert!(comments.iter().all(|comment| comment.post == post_id));

    assert!(
        db.fetch_post_comments(other_post_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn follows_are_idempotent_and_drive_the_follow_feed() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let reader = create_user(&db, "reader").await;
    let author = create_user(&db, "author").await;
    let stranger = create_user(&db, "stranger").await;

    let follow = Follow::new(reader.id, author.id).unwrap();
    assert!(db.create_follow(follow).await.unwrap());
    assert!(!db.create_follow(follow).await.unwrap());
    assert_eq!(db.count_follows(reader.id).await.unwrap(), 1);
    assert!(db.is_following(reader.id, author.id).await.unwrap());
    assert!(!db.is_following(author.id, reader.id).await.unwrap());

    let followed_post = create_post(&db, &author, None, "Followed").await;
    create_post(&db, &stranger, None, "Not followed").await;

    let feed = db
        .fetch_posts_page(PostFilter::FollowedBy(reader.id), None)
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed.object_list[0].id, followed_post);

    assert_eq!(db.delete_follows(reader.id, author.id).await.unwrap(), 1);
    assert_eq!(db.delete_follows(reader.id, author.id).await.unwrap(), 0);
    assert_eq!(db.count_follows(reader.id).await.unwrap(), 0);

    let feed = db
        .fetch_posts_page(PostFilter::FollowedBy(reader.id), None)
        .await
        .unwrap();
    assert!(feed.is_empty());
}

#[tokio::test]
async fn authentications_round_trip() {
    let db = DbClient::connect_in_memory().await.unwrap();
    let user = create_user(&db, "auth").await;

    let token = AuthToken::generate_random(user.id);
    let token_hash = token.hash().unwrap();
    let authentication = Authentication {
        user: user.id,
        token_hash: token_hash.clone(),
        created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        expires_after: PositiveDuration::new(Duration::hours(2)),
    };
    db.create_auth(&authentication).await.unwrap();

    assert_eq!(
        db.fetch_auth(&token_hash).await.unwrap(),
        Some(authentication)
    );

    assert!(db.delete_auth(&token_hash).await.unwrap());
    assert!(!db.delete_auth(&token_hash).await.unwrap());
    assert_eq!(db.fetch_auth(&token_hash).await.unwrap(), None);
}
