//! YouTube Data API v3: live broadcasts and live chat messages.
//!
//! # REST endpoints
//!
//! | Operation          | Method | Path                 | Query                                                  |
//! |--------------------|--------|----------------------|--------------------------------------------------------|
//! | Own broadcasts     | GET    | `/liveBroadcasts`    | `part=snippet,status&mine=true`                        |
//! | Live chat messages | GET    | `/liveChat/messages` | `liveChatId`, `part=snippet,authorDetails`, `pageToken`|
//!
//! The poll loop talks to the API only through [`LiveChatApi`], and obtains
//! an authenticated handle only through [`LiveChatConnector`], so the loop can
//! be driven by an in-memory fake.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::info;
use vf_core::error::VoteError;
use vf_core::types::VoteEvent;

use super::auth::TokenSource;
use super::config::YouTubeConfig;

/// `status.lifeCycleStatus` of a broadcast that is on air.
pub const LIVE_STATUS: &str = "live";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One entry of `liveBroadcasts.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcast {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub snippet: BroadcastSnippet,
    #[serde(default)]
    pub status: BroadcastStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastSnippet {
    pub title: Option<String>,
    pub live_chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastStatus {
    pub life_cycle_status: Option<String>,
}

impl LiveBroadcast {
    pub fn is_live(&self) -> bool {
        self.status.life_cycle_status.as_deref() == Some(LIVE_STATUS)
    }
}

#[derive(Debug, Deserialize)]
struct BroadcastList {
    #[serde(default)]
    items: Vec<LiveBroadcast>,
}

/// One page of `liveChatMessages.list`.
///
/// Items stay raw so that one undecodable item does not discard the page;
/// see [`decode_item`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatPage {
    pub next_page_token: Option<String>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub polling_interval_millis: Option<u64>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// A decoded chat item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessage {
    pub id: Option<String>,
    pub snippet: MessageSnippet,
    pub author_details: AuthorDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnippet {
    pub display_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetails {
    pub channel_id: String,
    pub display_name: Option<String>,
}

impl LiveChatMessage {
    /// The vote this message casts, if any.
    ///
    /// `Username` is the lowercased display name, `ClientId` the author's
    /// channel ID.
    pub fn to_vote(&self) -> Option<VoteEvent> {
        let text = self.snippet.display_message.as_deref()?;
        let name = self.author_details.display_name.as_deref().unwrap_or_default();
        VoteEvent::try_new(name, &self.author_details.channel_id, text)
    }
}

/// Decode one raw page item.
pub fn decode_item(item: &serde_json::Value) -> Result<LiveChatMessage, VoteError> {
    LiveChatMessage::deserialize(item).map_err(|e| VoteError::Parse(format!("chat item: {e}")))
}

/// Accept a JSON number or a numeric string.
fn de_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(v) => v.as_u64(),
        None => None,
    })
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The two calls the poll loop needs.
#[async_trait]
pub trait LiveChatApi: Send + Sync {
    /// Every broadcast owned by the authenticated account.
    async fn list_broadcasts(&self) -> Result<Vec<LiveBroadcast>>;

    /// One page of chat. `page_token` of `None` means the first page.
    async fn list_messages(&self, live_chat_id: &str, page_token: Option<&str>) -> Result<LiveChatPage>;
}

/// Produces an authenticated [`LiveChatApi`] handle.
#[async_trait]
pub trait LiveChatConnector: Send + Sync {
    /// Exchange credentials for a session. Called once per `init`.
    async fn connect(&self) -> Result<Arc<dyn LiveChatApi>>;
}

// ---------------------------------------------------------------------------
// reqwest implementation
// ---------------------------------------------------------------------------

/// Live Chat client authenticated with an OAuth bearer token.
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenSource,
}

impl YouTubeClient {
    pub fn new(http: reqwest::Client, base_url: String, tokens: TokenSource) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string(), tokens }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let bearer = self.tokens.bearer().await?;
        let resp = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VoteError::Http(format!("GET {path} returned {status}: {body}")).into());
        }
        resp.json().await.with_context(|| format!("GET {path} response malformed"))
    }
}

#[async_trait]
impl LiveChatApi for YouTubeClient {
    async fn list_broadcasts(&self) -> Result<Vec<LiveBroadcast>> {
        let list: BroadcastList = self
            .get_json("/liveBroadcasts", &[("part", "snippet,status"), ("mine", "true")])
            .await?;
        Ok(list.items)
    }

    async fn list_messages(&self, live_chat_id: &str, page_token: Option<&str>) -> Result<LiveChatPage> {
        let mut query = vec![("liveChatId", live_chat_id), ("part", "snippet,authorDetails")];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("/liveChat/messages", &query).await
    }
}

/// Connects with the refresh-token grant from a [`YouTubeConfig`].
pub struct YouTubeConnector {
    config: YouTubeConfig,
    http: reqwest::Client,
}

impl YouTubeConnector {
    /// Every request of the returned connector and its clients is bounded by
    /// `config.poll.request_timeout`.
    pub fn new(config: YouTubeConfig) -> Result<Self> {
        let limit = config.poll.request_timeout;
        let http = reqwest::Client::builder()
            .connect_timeout(limit)
            .timeout(limit)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl LiveChatConnector for YouTubeConnector {
    async fn connect(&self) -> Result<Arc<dyn LiveChatApi>> {
        let refresh_token = self.config.refresh_token.clone().ok_or_else(|| {
            VoteError::Auth("no refresh token configured; authorize the YouTube account first".into())
        })?;

        let tokens = TokenSource::new(
            self.http.clone(),
            self.config.token_url.clone(),
            self.config.client_id.clone(),
            self.config.client_secret.clone(),
            refresh_token,
        );
        // fail init now rather than on the first poll
        tokens.bearer().await?;
        info!("[youtube] authentication successful");

        Ok(Arc::new(YouTubeClient::new(self.http.clone(), self.config.api_base_url.clone(), tokens)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::youtube::config::PollSettings;
    use crate::youtube::testutil::{HttpReply, serve_http, serve_silence};

    const PAGE: &str = r#"{
        "kind": "youtube#liveChatMessageListResponse",
        "nextPageToken": "GO2ivJq",
        "pollingIntervalMillis": 1500,
        "items": [
            {
                "id": "LCC.1",
                "snippet": { "type": "textMessageEvent", "displayMessage": " 4 " },
                "authorDetails": { "channelId": "UC123", "displayName": "Big Fan" }
            },
            {
                "id": "LCC.2",
                "snippet": { "type": "superChatEvent" },
                "authorDetails": { "channelId": "UC456", "displayName": "Other" }
            },
            { "id": "LCC.3", "snippet": { "displayMessage": "5" } }
        ]
    }"#;

    #[test]
    fn page_decodes_item_by_item() {
        let page: LiveChatPage = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("GO2ivJq"));
        assert_eq!(page.polling_interval_millis, Some(1500));
        assert_eq!(page.items.len(), 3);

        let first = decode_item(&page.items[0]).unwrap();
        let vote = first.to_vote().unwrap();
        assert_eq!(vote.username(), "big fan");
        assert_eq!(vote.client_id(), "UC123");
        assert_eq!(vote.message(), "4");

        // no display message: decodes, but is not a vote
        assert!(decode_item(&page.items[1]).unwrap().to_vote().is_none());
        // no authorDetails: payload error
        assert!(matches!(decode_item(&page.items[2]), Err(VoteError::Parse(_))));
    }

    #[test]
    fn polling_interval_is_lenient() {
        let page: LiveChatPage = serde_json::from_str(r#"{"pollingIntervalMillis":"750"}"#).unwrap();
        assert_eq!(page.polling_interval_millis, Some(750));
        let page: LiveChatPage = serde_json::from_str(r#"{"items":[]}"#).unwrap();
        assert_eq!(page.polling_interval_millis, None);
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn broadcast_liveness() {
        let list: BroadcastList = serde_json::from_str(
            r#"{"items":[
                {"id":"a","snippet":{"title":"old"},"status":{"lifeCycleStatus":"complete"}},
                {"id":"b","snippet":{"title":"now","liveChatId":"chat-b"},"status":{"lifeCycleStatus":"live"}}
            ]}"#,
        )
        .unwrap();
        assert!(!list.items[0].is_live());
        assert!(list.items[1].is_live());
        assert_eq!(list.items[1].snippet.live_chat_id.as_deref(), Some("chat-b"));
    }

    fn config_for(addr: std::net::SocketAddr) -> YouTubeConfig {
        YouTubeConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            refresh_token: Some("refresh".into()),
            api_base_url: format!("http://{addr}/youtube/v3"),
            token_url: format!("http://{addr}/token"),
            poll: PollSettings::default(),
        }
    }

    #[tokio::test]
    async fn client_sends_bearer_and_cursor() {
        let (addr, requests) = serve_http(vec![
            HttpReply::ok(r#"{"access_token":"tok-1","expires_in":3600}"#),
            HttpReply::ok(r#"{"items":[{"id":"b1","snippet":{"liveChatId":"chat-1"},"status":{"lifeCycleStatus":"live"}}]}"#),
            HttpReply::ok(PAGE),
        ])
        .await;

        let api = YouTubeConnector::new(config_for(addr)).unwrap().connect().await.unwrap();
        let broadcasts = api.list_broadcasts().await.unwrap();
        assert!(broadcasts[0].is_live());
        let page = api.list_messages("chat-1", Some("abc123")).await.unwrap();
        assert_eq!(page.items.len(), 3);

        let requests = requests.await.unwrap();
        assert!(requests[0].starts_with("POST /token"));
        assert!(requests[1].starts_with("GET /youtube/v3/liveBroadcasts?part=snippet%2Cstatus&mine=true"));
        assert!(requests[1].to_lowercase().contains("authorization: bearer tok-1"));
        assert!(requests[2].starts_with("GET /youtube/v3/liveChat/messages?"));
        assert!(requests[2].contains("liveChatId=chat-1"));
        assert!(requests[2].contains("pageToken=abc123"));
    }

    #[tokio::test]
    async fn api_errors_carry_status() {
        let (addr, _requests) = serve_http(vec![
            HttpReply::ok(r#"{"access_token":"tok","expires_in":3600}"#),
            HttpReply::status(403, r#"{"error":{"message":"quotaExceeded"}}"#),
        ])
        .await;
        let api = YouTubeConnector::new(config_for(addr)).unwrap().connect().await.unwrap();
        let err = api.list_messages("chat", None).await.unwrap_err();
        match err.downcast_ref::<VoteError>() {
            Some(VoteError::Http(msg)) => assert!(msg.contains("403") && msg.contains("quotaExceeded"), "{msg}"),
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_without_refresh_token_fails() {
        let mut cfg = config_for("127.0.0.1:1".parse().unwrap());
        cfg.refresh_token = None;
        let err = YouTubeConnector::new(cfg).unwrap().connect().await.err().unwrap();
        assert!(matches!(err.downcast_ref::<VoteError>(), Some(VoteError::Auth(_))));
    }

    #[tokio::test]
    async fn silent_token_endpoint_times_out() {
        let addr = serve_silence().await;
        let mut cfg = config_for(addr);
        cfg.poll.request_timeout = Duration::from_millis(200);

        let connector = YouTubeConnector::new(cfg).unwrap();
        let connecting = connector.connect();
        let result = tokio::time::timeout(Duration::from_secs(5), connecting).await;
        assert!(result.expect("connect must give up on its own").is_err());
    }

    #[tokio::test]
    async fn silent_api_times_out() {
        let (token_addr, _requests) =
            serve_http(vec![HttpReply::ok(r#"{"access_token":"tok","expires_in":3600}"#)]).await;
        let api_addr = serve_silence().await;
        let mut cfg = config_for(token_addr);
        cfg.api_base_url = format!("http://{api_addr}/youtube/v3");
        cfg.poll.request_timeout = Duration::from_millis(200);

        let api = YouTubeConnector::new(cfg).unwrap().connect().await.unwrap();
        let listing = tokio::time::timeout(Duration::from_secs(5), api.list_messages("chat", None)).await;
        assert!(listing.expect("request must give up on its own").is_err());
    }
}
