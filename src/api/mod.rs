/// Blocking HTTP client for the chat statistics backend.
///
/// A thin facade over `ureq`: every call builds a request against the
/// configured base URL, attaches `Authorization: Bearer <token>` when the
/// credential store holds an access token, and decodes the JSON reply into
/// the types in [`models`].
///
/// There is no retry, backoff or token refresh. A failed call returns an
/// [`ApiError`] to the caller as-is; an expired token surfaces as
/// [`ApiError::Unauthorized`].
pub mod models;

use std::rc::Rc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::schema::ApiConfig;
use crate::session::credentials::CredentialStore;
use models::{
    AccountInfo, AverageMessage, ChannelProfile, DatabaseMessage, FilterOptions, MessageDetail,
    MessageQuery, MessageStats, Page, RecentMessages, RegisterRequest, RegisteredUser,
    StatsFilter, StatsList, Timeline, TokenPair, TokenRequest, UserProfile,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout and the like.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// 401/403: missing, invalid or expired token.
    #[error("not authorized (HTTP {status}); run `chatstat login` first")]
    Unauthorized { status: u16 },

    #[error("not found: {path}{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    NotFound { path: String, detail: Option<String> },

    /// Any other non-success status.
    #[error("server returned HTTP {status} for {path}: {body}")]
    Status { status: u16, path: String, body: String },

    /// The body did not have the expected shape.
    #[error("invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous backend client.
///
/// Holds a shared handle to the credential store so that a login performed
/// through [`crate::session::Session`] is visible to the very next request.
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
    credentials: Rc<dyn CredentialStore>,
}

impl ApiClient {
    /// Build a client from the resolved `[api]` config.
    pub fn new(config: &ApiConfig, credentials: Rc<dyn CredentialStore>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- Auth --

    /// Exchange a username and password for a token pair.
    ///
    /// Both tokens must be present in the reply.
    pub fn obtain_token(&self, username: &str, password: &str) -> ApiResult<TokenPair> {
        let path = "/api/token/";
        let pair: TokenPair =
            self.send_json("POST", path, &TokenRequest { username, password })?;
        match (&pair.access, &pair.refresh) {
            (Some(a), Some(r)) if !a.is_empty() && !r.is_empty() => Ok(pair),
            _ => Err(ApiError::InvalidResponse {
                path: path.to_string(),
                message: "token response is missing the access or refresh token".to_string(),
            }),
        }
    }

    /// Create a dashboard account.
    ///
    /// The backend only lets an authenticated account register others, so
    /// without a stored token this fails with [`ApiError::Unauthorized`]. A
    /// taken username comes back as a 400 [`ApiError::Status`].
    pub fn register(&self, request: &RegisterRequest<'_>) -> ApiResult<RegisteredUser> {
        self.send_json("POST", "/api/user/register/", request)
    }

    pub fn current_user(&self) -> ApiResult<AccountInfo> {
        self.get_json("/api/user/me/", &[])
    }

    // -- Statistics --

    pub fn message_stats(&self) -> ApiResult<MessageStats> {
        self.get_json("/api/stats/message-stats/", &[])
    }

    pub fn message_timeline(&self) -> ApiResult<Timeline> {
        self.get_json("/api/stats/message-timeline/", &[])
    }

    pub fn recent_messages(&self) -> ApiResult<RecentMessages> {
        self.get_json("/api/stats/recent-messages/", &[])
    }

    /// Per-user list. Exclusions are sent as comma-separated lists.
    pub fn user_stats(&self, filter: &StatsFilter) -> ApiResult<StatsList> {
        let mut params = Vec::new();
        if filter.exclude_bots {
            params.push(("exclude_bots", "true".to_string()));
        }
        if !filter.exclude_channels.is_empty() {
            params.push(("exclude_channel", filter.exclude_channels.join(",")));
        }
        if !filter.exclude_users.is_empty() {
            params.push(("exclude_user", filter.exclude_users.join(",")));
        }
        self.get_json("/api/stats/users/", &params)
    }

    /// Per-channel list. The backend only supports excluding users here.
    pub fn channel_stats(&self, filter: &StatsFilter) -> ApiResult<StatsList> {
        let mut params = Vec::new();
        if !filter.exclude_users.is_empty() {
            params.push(("exclude", filter.exclude_users.join(",")));
        }
        self.get_json("/api/stats/channels/", &params)
    }

    pub fn user_profile(&self, username: &str) -> ApiResult<UserProfile> {
        let path = format!("/api/discorduser/{}/", urlencoding::encode(username));
        self.get_json(&path, &[])
    }

    pub fn channel_profile(&self, channel: &str) -> ApiResult<ChannelProfile> {
        let path = format!("/api/channel/{}/", urlencoding::encode(channel));
        self.get_json(&path, &[])
    }

    pub fn average_message(&self) -> ApiResult<AverageMessage> {
        self.get_json("/api/stats/average-message/", &[])
    }

    // -- Message database --

    pub fn database_messages(&self, query: &MessageQuery) -> ApiResult<Page<DatabaseMessage>> {
        self.get_json("/api/database/messages/", &query.to_params())
    }

    pub fn message_detail(&self, id: &str) -> ApiResult<MessageDetail> {
        self.get_json(&message_path(id), &[])
    }

    pub fn delete_message(&self, id: &str) -> ApiResult<()> {
        let path = message_path(id);
        self.call(self.request("DELETE", &path), &path, None::<&()>)?;
        Ok(())
    }

    pub fn filter_options(&self) -> ApiResult<FilterOptions> {
        self.get_json("/api/database/filter-options/", &[])
    }

    // -- Plumbing --

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let request = self.agent.request(method, &url);
        match self.credentials.access_token() {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> ApiResult<T> {
        let mut request = self.request("GET", path);
        for (name, value) in params {
            request = request.query(name, value);
        }
        let response = self.call(request, path, None::<&()>)?;
        decode(response, path)
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = self.call(self.request(method, path), path, Some(body))?;
        decode(response, path)
    }

    fn call<B: Serialize>(
        &self,
        request: ureq::Request,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<ureq::Response> {
        let method = request.method().to_string();
        let url = request.url().to_string();
        debug!(%method, %url, "api request");

        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };

        match result {
            Ok(response) => {
                debug!(%method, %url, status = response.status(), "api response");
                Ok(response)
            }
            Err(ureq::Error::Status(status, response)) => {
                debug!(%method, %url, status, "api error status");
                let body = response.into_string().unwrap_or_default();
                Err(status_error(status, path, body))
            }
            Err(ureq::Error::Transport(transport)) => Err(ApiError::Transport {
                url,
                message: transport.to_string(),
            }),
        }
    }
}

fn message_path(id: &str) -> String {
    format!("/api/database/messages/{}/", urlencoding::encode(id))
}

fn decode<T: DeserializeOwned>(response: ureq::Response, path: &str) -> ApiResult<T> {
    response
        .into_json::<T>()
        .map_err(|e| ApiError::InvalidResponse {
            path: path.to_string(),
            message: e.to_string(),
        })
}

/// Map a non-success status to the error taxonomy.
///
/// The backend reports 404 details as `{"error": "..."}`; that message is
/// kept when present.
fn status_error(status: u16, path: &str, body: String) -> ApiError {
    match status {
        401 | 403 => ApiError::Unauthorized { status },
        404 => ApiError::NotFound {
            path: path.to_string(),
            detail: serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string)),
        },
        _ => ApiError::Status {
            status,
            path: path.to_string(),
            body,
        },
    }
}
