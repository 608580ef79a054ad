use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://leetcode.com/graphql";

/// Placeholder rank for users without a contest ranking, so they sort last.
pub const UNRANKED: u64 = 1_000_000_000;

const CONTEST_QUERY: &str = "
query getContestInfo($username: String!) {
    userContestRanking(username: $username) {
        globalRanking
    }
}
";

#[derive(Debug, Error)]
pub enum RankError {
    /// The endpoint could not be reached, answered with a non-2xx status,
    /// or sent a body that is not a GraphQL response.
    #[error("Failed to fetch data for user {username}: {reason}")]
    Transport {
        username: String,
        status: Option<u16>,
        reason: String,
    },

    /// The endpoint answered but reported errors for the query.
    #[error("Error fetching data for user {username}: {errors}")]
    RemoteApi {
        username: String,
        errors: Value,
    },
}

impl RankError {
    pub fn username(&self) -> &str {
        match self {
            Self::Transport { username, .. } | Self::RemoteApi { username, .. } => username,
        }
    }

    fn transport(username: &str, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Transport {
            username: username.to_string(),
            status,
            reason: reason.into(),
        }
    }
}

pub type RankResult = Result<u64, RankError>;

/// Anything that can look up a single user's global contest ranking.
#[async_trait]
pub trait RankSource: Send + Sync {
    async fn fetch_rank(&self, username: &str) -> RankResult;
}

#[derive(Serialize)]
struct ContestQuery<'a> {
    query: &'static str,
    variables: ContestVariables<'a>,
}

#[derive(Serialize)]
struct ContestVariables<'a> {
    username: &'a str,
}

/// A field that may be `null` but must be present.
fn required<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct ContestResponse {
    /// `None` when the key is missing, `Some(Value::Null)` when it is null.
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
    errors: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContestData {
    #[serde(deserialize_with = "required")]
    user_contest_ranking: Option<UserContestRanking>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserContestRanking {
    #[serde(deserialize_with = "required")]
    global_ranking: Option<u64>,
}

impl ContestResponse {
    fn into_rank(self, username: &str, status: u16) -> RankResult {
        if let Some(errors) = self.errors {
            return Err(RankError::RemoteApi {
                username: username.to_string(),
                errors,
            });
        }

        let data = self
            .data
            .ok_or_else(|| RankError::transport(username, Some(status), "missing field `data`"))?;
        let data: Option<ContestData> = serde_json::from_value(data)
            .map_err(|e| RankError::transport(username, Some(status), e.to_string()))?;

        Ok(data
            .and_then(|d| d.user_contest_ranking)
            .and_then(|r| r.global_ranking)
            .unwrap_or(UNRANKED))
    }
}

/// Anonymous client for the contest ranking GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct ContestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ContestClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RankSource for ContestClient {
    async fn fetch_rank(&self, username: &str) -> RankResult {
        debug!("Fetching contest ranking for {username}");

        let body = ContestQuery {
            query: CONTEST_QUERY,
            variables: ContestVariables { username },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RankError::transport(username, None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RankError::transport(
                username,
                Some(status.as_u16()),
                format!("HTTP {status}"),
            ));
        }

        response
            .json::<ContestResponse>()
            .await
            .map_err(|e| RankError::transport(username, Some(status.as_u16()), e.to_string()))?
            .into_rank(username, status.as_u16())
    }
}
