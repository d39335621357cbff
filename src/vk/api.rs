use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::Error;
use super::types::{LongPollServer, PollResponse};

const API_URL: &str = "https://api.vk.com/method";
const API_VERSION: &str = "5.199";

/// Seconds the long poll server holds a request open.
const POLL_WAIT: u64 = 25;

pub struct Client {
    token: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

#[derive(Deserialize)]
struct Groups {
    groups: Vec<Group>,
}

#[derive(Deserialize)]
struct Group {
    id: i64,
}

/// Optional parts of an outgoing message.
#[derive(Debug, Default)]
pub struct Outgoing<'a> {
    pub keyboard: Option<&'a str>,
    pub template: Option<&'a str>,
    pub attachment: Option<&'a str>,
}

impl Client {
    pub fn new(token: String) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_WAIT + 10))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { token, http })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T, Error> {
        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("access_token", self.token.clone()));
        form.push(("v", API_VERSION.to_string()));

        let response = self
            .http
            .post(format!("{API_URL}/{method}"))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{method}: {status}: {body}")));
        }

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        match (parsed.response, parsed.error) {
            (_, Some(e)) => Err(Error::Api(format!("{method}: {} {}", e.error_code, e.error_msg))),
            (Some(r), None) => Ok(r),
            (None, None) => Err(Error::Parse(format!("{method}: no response"))),
        }
    }

    /// Id of the community the token belongs to.
    pub async fn group_id(&self) -> Result<i64, Error> {
        let groups: Groups = self.call("groups.getById", &[]).await?;
        groups
            .groups
            .first()
            .map(|g| g.id)
            .ok_or_else(|| Error::Parse("groups.getById: no groups".into()))
    }

    pub async fn long_poll_server(&self, group_id: i64) -> Result<LongPollServer, Error> {
        self.call("groups.getLongPollServer", &[("group_id", group_id.to_string())])
            .await
    }

    pub async fn poll(&self, server: &LongPollServer, ts: &str) -> Result<PollResponse, Error> {
        let wait = POLL_WAIT.to_string();
        let response = self
            .http
            .get(&server.server)
            .query(&[
                ("act", "a_check"),
                ("key", server.key.as_str()),
                ("ts", ts),
                ("wait", wait.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Api(format!("a_check: {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }

    /// Returns the id of the sent message.
    pub async fn send_message(&self, peer_id: i64, text: &str, extra: Outgoing<'_>) -> Result<i64, Error> {
        let mut params = vec![
            ("peer_id", peer_id.to_string()),
            ("random_id", "0".to_string()),
            ("message", text.to_string()),
        ];
        if let Some(keyboard) = extra.keyboard {
            params.push(("keyboard", keyboard.to_string()));
        }
        if let Some(template) = extra.template {
            params.push(("template", template.to_string()));
        }
        if let Some(attachment) = extra.attachment {
            params.push(("attachment", attachment.to_string()));
        }
        debug!("messages.send to {peer_id}");
        self.call("messages.send", &params).await
    }

    /// Acknowledges a callback button press so the client stops its spinner.
    pub async fn answer_event(&self, event_id: &str, user_id: i64, peer_id: i64) -> Result<(), Error> {
        let _: i64 = self
            .call(
                "messages.sendMessageEventAnswer",
                &[
                    ("event_id", event_id.to_string()),
                    ("user_id", user_id.to_string()),
                    ("peer_id", peer_id.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope() {
        let parsed: ApiResponse<i64> =
            serde_json::from_str(r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#)
                .unwrap();
        assert!(parsed.response.is_none());
        let err = parsed.error.unwrap();
        assert_eq!(err.error_code, 5);
        assert_eq!(err.error_msg, "User authorization failed");
    }

    #[test]
    fn test_groups_response() {
        let parsed: ApiResponse<Groups> =
            serde_json::from_str(r#"{"response": {"groups": [{"id": 219009582, "name": "F1"}], "profiles": []}}"#)
                .unwrap();
        assert_eq!(parsed.response.unwrap().groups[0].id, 219009582);
    }

    #[test]
    fn test_long_poll_server_response() {
        let parsed: ApiResponse<LongPollServer> = serde_json::from_str(
            r#"{"response": {"key": "abc", "server": "https://lp.vk.com/wh1", "ts": "17"}}"#,
        )
        .unwrap();
        let server = parsed.response.unwrap();
        assert_eq!(server.key, "abc");
        assert_eq!(server.ts.as_deref(), Some("17"));
    }
}
