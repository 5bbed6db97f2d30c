use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};
use time::Duration;
use yatube_common::util::PositiveDuration;

/// Settings read from the environment, e.g. `SERVER_PORT=8000`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct Env {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub database_url: String,
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// Tokens issued at login never expire when unset.
    pub token_lifetime_seconds: Option<u64>,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

impl Env {
    /// `None` both when unset and when zero.
    #[must_use]
    pub fn token_lifetime(&self) -> Option<PositiveDuration> {
        let seconds = i64::try_from(self.token_lifetime_seconds?).unwrap_or(i64::MAX);
        PositiveDuration::new(Duration::seconds(seconds))
    }
}
