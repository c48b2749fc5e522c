//! Slack Web API channel client
//!
//! Posts through `chat.postMessage` with the rule's bot token. The message
//! text is the payload's primary line; the descriptive fields travel as a
//! single attachment.

use super::{ChannelClient, DeliveryReceipt};
use crate::error::{NotifierError, Result};
use crate::format::Payload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Slack error codes that mean the token is unusable
const AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "token_revoked",
    "token_expired",
    "account_inactive",
    "missing_scope",
    "not_allowed_token_type",
];

/// Slack error codes that mean the channel is unusable
const DESTINATION_ERRORS: &[&str] = &[
    "channel_not_found",
    "not_in_channel",
    "is_archived",
    "invalid_channel",
    "restricted_action",
];

/// `ChannelClient` backed by the Slack Web API
pub struct SlackClient {
    /// Base URL, e.g. `https://slack.com/api`
    api_url: String,

    client: reqwest::Client,
}

impl SlackClient {
    /// Create a client for the given API base URL
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(NotifierError::Config(
                "Slack API URL cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Endpoint used for deliveries
    pub fn endpoint(&self) -> String {
        format!("{}/chat.postMessage", self.api_url)
    }
}

#[async_trait]
impl ChannelClient for SlackClient {
    async fn post(
        &self,
        channel_id: &str,
        credential: &str,
        payload: &Payload,
    ) -> Result<DeliveryReceipt> {
        let message = SlackMessage::new(channel_id, payload);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(credential)
            .json(&message)
            .send()
            .await
            .map_err(|e| NotifierError::TransientDelivery(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(NotifierError::Authentication(format!(
                "Slack returned {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(NotifierError::TransientDelivery(format!(
                "Slack returned {}",
                status
            )));
        }

        let body: SlackResponse = response.json().await.map_err(|e| {
            NotifierError::TransientDelivery(format!("Unreadable Slack response: {}", e))
        })?;

        if !body.ok {
            let code = body.error.unwrap_or_else(|| "unknown_error".to_string());
            return Err(classify_error(&code));
        }

        Ok(DeliveryReceipt {
            channel_id: body.channel.unwrap_or_else(|| channel_id.to_string()),
            delivery_id: body.ts.unwrap_or_default(),
        })
    }

    fn name(&self) -> &str {
        "slack"
    }
}

/// Map a Slack `error` code onto the delivery error taxonomy
pub fn classify_error(code: &str) -> NotifierError {
    if AUTH_ERRORS.contains(&code) {
        NotifierError::Authentication(code.to_string())
    } else if DESTINATION_ERRORS.contains(&code) {
        NotifierError::InvalidDestination(code.to_string())
    } else {
        NotifierError::TransientDelivery(code.to_string())
    }
}

/// `chat.postMessage` request body
#[derive(Debug, Serialize)]
struct SlackMessage {
    channel: String,
    text: String,
    as_user: bool,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fields: Vec<SlackField>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

impl SlackMessage {
    fn new(channel_id: &str, payload: &Payload) -> Self {
        Self {
            channel: channel_id.to_string(),
            text: payload.text.clone(),
            as_user: true,
            attachments: vec![SlackAttachment {
                fields: payload
                    .fields
                    .iter()
                    .map(|f| SlackField {
                        title: f.title.clone(),
                        value: f.value.clone(),
                        short: false,
                    })
                    .collect(),
            }],
        }
    }
}

/// `chat.postMessage` response body
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::format;
    use crate::types::{ClusterEvent, Destination, Rule};

    fn payload() -> Payload {
        let rule = Rule::new("r1", ["Pod"], "timeout", Destination::new("C1", "t"));
        let event = ClusterEvent::new("Pod", "web-0", "default", "i/o timeout")
            .with_reason("Unhealthy");
        format(&event, &rule)
    }

    #[test]
    fn test_new_rejects_empty_url() {
        assert!(matches!(SlackClient::new(""), Err(NotifierError::Config(_))));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = SlackClient::new("https://slack.example/api/").unwrap();
        assert_eq!(client.endpoint(), "https://slack.example/api/chat.postMessage");
        assert_eq!(client.name(), "slack");
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(classify_error("invalid_auth"), NotifierError::Authentication(_)));
        assert!(matches!(classify_error("token_revoked"), NotifierError::Authentication(_)));
        assert!(matches!(
            classify_error("channel_not_found"),
            NotifierError::InvalidDestination(_)
        ));
        assert!(matches!(
            classify_error("not_in_channel"),
            NotifierError::InvalidDestination(_)
        ));
        assert!(matches!(classify_error("ratelimited"), NotifierError::TransientDelivery(_)));
        assert!(matches!(classify_error("internal_error"), NotifierError::TransientDelivery(_)));
    }

    #[test]
    fn test_message_body() {
        let message = SlackMessage::new("alerts", &payload());
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["channel"], "alerts");
        assert_eq!(json["text"], "*i/o timeout*");
        assert_eq!(json["as_user"], true);
        assert_eq!(json["attachments"][0]["fields"][0]["title"], "Object Kind");
        assert_eq!(json["attachments"][0]["fields"][0]["value"], "Pod");
        assert_eq!(json["attachments"][0]["fields"][4]["value"], "Unhealthy");
    }

    #[test]
    fn test_response_parsing() {
        let ok: SlackResponse =
            serde_json::from_str(r#"{"ok":true,"channel":"C024BE91L","ts":"1401383885.000061"}"#)
                .unwrap();
        assert!(ok.ok);
        assert_eq!(ok.ts.as_deref(), Some("1401383885.000061"));

        let err: SlackResponse =
            serde_json::from_str(r#"{"ok":false,"error":"channel_not_found"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("channel_not_found"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        // Nothing listens on port 1
        let client = SlackClient::new("http://127.0.0.1:1/api").unwrap();
        let err = client.post("alerts", "xoxb", &payload()).await.unwrap_err();
        assert!(matches!(err, NotifierError::TransientDelivery(_)));
    }
}
