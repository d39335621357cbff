use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::api::{Client, Outgoing};
use super::types::{Carousel, LongPollServer, MessageEvent, MessageNew, Update, VkKeyboard};
use super::Error;
use crate::command::{self, Command};
use crate::config::Config;
use crate::ergast::F1Storage;
use crate::router::{self, Reply};
use crate::service::F1Service;

const STREAM_ANNOUNCEMENT: &str =
    "Трансляция 'F1 Memes TV' началась! Смотри в Telegram t.me/f1memestv и в [vk.com/f1memestv|VK].";

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct VkBot<S> {
    client: Client,
    service: Arc<F1Service<S>>,
    streamer_id: i64,
    announce_peer_id: i64,
    carousel_photo: String,
}

/// Video attachment id from `strstart https://vk.com/video-1_2`.
fn stream_attachment(text: &str) -> Option<&str> {
    let link = text.split_whitespace().nth(1)?;
    let id = link.trim_start_matches("https://vk.com/");
    (!id.is_empty()).then_some(id)
}

fn message_time(unix: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(unix, 0).unwrap_or_else(Utc::now)
}

impl<S: F1Storage> VkBot<S> {
    pub fn new(config: &Config, service: Arc<F1Service<S>>) -> Result<Self, Error> {
        Ok(Self {
            client: Client::new(config.vk_group_token.clone())?,
            service,
            streamer_id: config.vk_streamer_id,
            announce_peer_id: config.vk_announce_peer_id,
            carousel_photo: config.vk_carousel_photo.clone(),
        })
    }

    /// Poll until the process stops. Fails only when the group itself
    /// cannot be resolved; transport errors are retried.
    pub async fn run(&self) -> Result<(), Error> {
        let group_id = self.client.group_id().await?;
        info!("Start longpoll for group {group_id}");

        let mut server = self.connect(group_id).await;
        let mut ts = server.ts.clone().unwrap_or_default();

        loop {
            let poll = match self.client.poll(&server, &ts).await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!("Long poll request failed: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            match poll.failed {
                None => {}
                Some(1) => {
                    debug!("Long poll history outdated");
                    if let Some(new_ts) = poll.ts {
                        ts = new_ts;
                    }
                    continue;
                }
                Some(2) => {
                    debug!("Long poll key expired");
                    server = self.connect(group_id).await;
                    continue;
                }
                Some(code) => {
                    debug!("Long poll failed with {code}, reconnecting");
                    server = self.connect(group_id).await;
                    ts = server.ts.clone().unwrap_or_default();
                    continue;
                }
            }

            if let Some(new_ts) = poll.ts {
                ts = new_ts;
            }
            for update in poll.updates {
                self.handle_update(update).await;
            }
        }
    }

    async fn connect(&self, group_id: i64) -> LongPollServer {
        loop {
            match self.client.long_poll_server(group_id).await {
                Ok(server) => return server,
                Err(e) => {
                    warn!("Failed to get long poll server: {e}");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        match update.kind.as_str() {
            "message_new" => match serde_json::from_value::<MessageNew>(update.object) {
                Ok(new) => self.handle_message(new).await,
                Err(e) => warn!("Bad message_new object: {e}"),
            },
            "message_event" => match serde_json::from_value::<MessageEvent>(update.object) {
                Ok(event) => self.handle_event(event).await,
                Err(e) => warn!("Bad message_event object: {e}"),
            },
            other => debug!("Skipping update {other}"),
        }
    }

    async fn handle_message(&self, new: MessageNew) {
        let msg = new.message;
        info!("From id {}: {}", msg.peer_id, msg.text);

        let payload = match command::extract_command(msg.payload.as_deref().unwrap_or_default()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Error reading payload: {e}");
                None
            }
        };

        let (intent, arg) = match payload.as_deref() {
            Some(cmd) => (command::classify(cmd), command::command_arg(cmd).map(str::to_string)),
            None => (command::classify(&msg.text), None),
        };

        if intent == Command::Stream {
            if payload.is_none() && msg.from_id == self.streamer_id {
                self.announce_stream(&msg.text).await;
            }
            return;
        }
        if intent == Command::Unknown {
            info!("Command in message `{}` not recognized", msg.text);
            return;
        }

        self.respond(msg.peer_id, intent, arg.as_deref(), message_time(msg.date))
            .await;
    }

    async fn handle_event(&self, event: MessageEvent) {
        let cmd = match command::extract_command_value(&event.payload) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => {
                warn!("Event {} without command", event.event_id);
                return;
            }
            Err(e) => {
                warn!("Error reading event payload: {e}");
                return;
            }
        };
        info!("Event from id {}: {cmd}", event.peer_id);

        if let Err(e) = self
            .client
            .answer_event(&event.event_id, event.user_id, event.peer_id)
            .await
        {
            warn!("Failed to answer event {}: {e}", event.event_id);
        }

        let intent = command::classify(&cmd);
        if intent == Command::Unknown {
            info!("Event command `{cmd}` not recognized");
            return;
        }
        self.respond(event.peer_id, intent, command::command_arg(&cmd), Utc::now())
            .await;
    }

    async fn announce_stream(&self, text: &str) {
        let Some(attachment) = stream_attachment(text) else {
            warn!("Stream announcement without link: {text}");
            return;
        };
        let extra = Outgoing {
            attachment: Some(attachment),
            ..Default::default()
        };
        match self
            .client
            .send_message(self.announce_peer_id, STREAM_ANNOUNCEMENT, extra)
            .await
        {
            Ok(_) => info!("Stream announced to {}", self.announce_peer_id),
            Err(e) => warn!("Failed to announce stream: {e}"),
        }
    }

    async fn respond(&self, peer_id: i64, intent: Command, arg: Option<&str>, sent_at: DateTime<Utc>) {
        let reply = match router::route(&self.service, intent, arg, sent_at).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("{intent:?} for {peer_id}: {e}");
                Reply::Text(router::FAILURE.to_string())
            }
        };
        if let Err(e) = self.send(peer_id, reply).await {
            warn!("Failed to answer {intent:?} to {peer_id}: {e}");
        }
    }

    async fn send(&self, peer_id: i64, reply: Reply) -> Result<(), Error> {
        match reply {
            Reply::Text(text) | Reply::Table(text) => {
                self.client.send_message(peer_id, &text, Outgoing::default()).await?;
            }
            Reply::Keyboard { text, keyboard } => {
                let keyboard = serde_json::to_string(&VkKeyboard::from_keyboard(&keyboard))?;
                let extra = Outgoing {
                    keyboard: Some(&keyboard),
                    ..Default::default()
                };
                self.client.send_message(peer_id, &text, extra).await?;
            }
            Reply::Card { text, card } => {
                let photo = Some(self.carousel_photo.clone()).filter(|p| !p.is_empty());
                let template = serde_json::to_string(&Carousel::single(&card, photo))?;
                let extra = Outgoing {
                    template: Some(&template),
                    ..Default::default()
                };
                self.client.send_message(peer_id, &text, extra).await?;
            }
            Reply::Silent => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_attachment() {
        assert_eq!(
            stream_attachment("strstart https://vk.com/video-219009582_456239017"),
            Some("video-219009582_456239017")
        );
        assert_eq!(stream_attachment("strstart video-1_2 extra"), Some("video-1_2"));
        assert_eq!(stream_attachment("strstart"), None);
        assert_eq!(stream_attachment("strstart https://vk.com/"), None);
    }

    #[test]
    fn test_message_time() {
        assert_eq!(message_time(1709391600).to_rfc3339(), "2024-03-02T15:00:00+00:00");
    }
}
