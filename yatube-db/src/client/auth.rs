use crate::{
    client::{DbClient, Result},
    record::AuthenticationRecord,
};
use sqlx::{query, query_as};
use yatube_common::model::{
    auth::{AuthTokenHash, Authentication},
    unix_millis,
};

impl DbClient {
    pub async fn create_auth(&self, authentication: &Authentication) -> Result<()> {
        query(
            "
            INSERT INTO authentications (token_hash, user_id, created_at, expires_after_seconds)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.get())
        .bind(unix_millis(authentication.created_at))
        .bind(
            authentication
                .expires_after
                .map(|expires_after| expires_after.whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_auth(&self, token_hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "
            SELECT
                authentications.user_id,
                authentications.token_hash,
                authentications.created_at,
                authentications.expires_after_seconds
            FROM
                authentications
            WHERE
                authentications.token_hash = ?
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let authentication = record.map(Authentication::try_from).transpose()?;
        Ok(authentication)
    }

    /// Returns `false` if no such token was stored.
    pub async fn delete_auth(&self, token_hash: &AuthTokenHash) -> Result<bool> {
        let result = query(
            "
            DELETE FROM authentications
            WHERE authentications.token_hash = ?
            ",
        )
        .bind(&token_hash.0[..])
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
