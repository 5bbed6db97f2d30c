use crate::{
    client::{DbClient, Result, now_millis},
    record::{CredentialsRecord, UserRecord},
};
use sqlx::{query_as, query_scalar};
use yatube_common::model::{
    Id,
    user::{CreateUser, Credentials, User, UserMarker, Username},
};

impl DbClient {
    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users
            WHERE
                users.user_id = ?
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "
            SELECT
                users.user_id,
                users.username
            FROM
                users
            WHERE
                users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn fetch_credentials(&self, username: &Username) -> Result<Option<Credentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "
            SELECT
                users.user_id,
                users.username,
                users.password_hash
            FROM
                users
            WHERE
                users.username = ?
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let credentials = record.map(Credentials::try_from).transpose()?;
        Ok(credentials)
    }

    /// Returns `None` if the username is already taken.
    pub async fn create_user(&self, user: &CreateUser) -> Result<Option<User>> {
        let returned_id = query_scalar::<_, i64>(
            "
            INSERT INTO users (username, password_hash, date_joined)
            VALUES (?, ?, ?)
            ON CONFLICT (username) DO NOTHING
            RETURNING users.user_id
            ",
        )
        .bind(user.username.get())
        .bind(user.password_hash.get())
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await?;

        Ok(returned_id.map(|user_id| User {
            id: user_id.into(),
            username: user.username.clone(),
        }))
    }
}
