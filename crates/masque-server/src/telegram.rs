//! [`Transport`] over the Telegram Bot API.
//!
//! Every call is a JSON POST to `<base>/bot<token>/<method>`; the reply is
//! the usual `{ok, result | error_code, description, parameters}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use masque_relay::{EditContent, Outgoing, Transport, TransportError};
use masque_shared::{AccountId, Actions, MediaKind, MessageId, Payload};

use crate::keyboard;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ReplyParameters>,
}

#[derive(Deserialize)]
struct ReplyParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl HttpTransport {
    pub fn new(api_base: &str, token: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            http,
        })
    }

    async fn call(&self, method: &str, body: Value) -> Result<Value, TransportError> {
        let url = format!("{}/{}", self.endpoint, method);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = resp.status().as_u16();
        let reply: ApiReply = resp.json().await.map_err(request_error)?;
        if reply.ok {
            return Ok(reply.result.unwrap_or(Value::Null));
        }

        let err = classify(
            reply.error_code.unwrap_or(status),
            reply.description.unwrap_or_default(),
            reply.parameters.and_then(|p| p.retry_after),
        );
        debug!(method, error = %err, "Bot API call rejected");
        Err(err)
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Http(err.to_string())
    }
}

/// Map a rejected call onto the relay's failure kinds.
fn classify(code: u16, description: String, retry_after: Option<u64>) -> TransportError {
    let lowered = description.to_ascii_lowercase();
    match code {
        403 => TransportError::Unreachable,
        400 if lowered.contains("chat not found") || lowered.contains("user is deactivated") => {
            TransportError::Unreachable
        }
        429 => TransportError::RateLimited {
            retry_after: retry_after.unwrap_or(1),
        },
        _ => TransportError::Api { code, description },
    }
}

/// Bot API method and file field for a media kind.
fn media_method(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Photo => ("sendPhoto", "photo"),
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Animation => ("sendAnimation", "animation"),
        MediaKind::Audio => ("sendAudio", "audio"),
        MediaKind::Voice => ("sendVoice", "voice"),
        MediaKind::Document => ("sendDocument", "document"),
        MediaKind::Sticker => ("sendSticker", "sticker"),
        MediaKind::VideoNote => ("sendVideoNote", "video_note"),
    }
}

/// Method name and body for an outgoing message.
fn send_request(chat: AccountId, message: &Outgoing) -> (&'static str, Value) {
    let mut body = Map::new();
    body.insert("chat_id".into(), json!(chat.0));

    let method = match &message.payload {
        Payload::Text { text } => {
            body.insert("text".into(), json!(text));
            "sendMessage"
        }
        Payload::Media {
            kind,
            file_id,
            caption,
        } => {
            let (method, field) = media_method(*kind);
            body.insert(field.into(), json!(file_id));
            if let Some(caption) = caption.as_ref().filter(|_| kind.accepts_caption()) {
                body.insert("caption".into(), json!(caption));
            }
            method
        }
    };

    if let Some(reply_to) = message.reply_to {
        body.insert(
            "reply_parameters".into(),
            json!({ "message_id": reply_to.0, "allow_sending_without_reply": true }),
        );
    }
    if let Some(markup) = keyboard::markup(&message.actions) {
        body.insert("reply_markup".into(), markup);
    }
    (method, Value::Object(body))
}

fn edit_request(
    chat: AccountId,
    message: MessageId,
    content: &EditContent,
    actions: &Actions,
) -> (&'static str, Value) {
    let mut body = json!({
        "chat_id": chat.0,
        "message_id": message.0,
        "reply_markup": keyboard::edit_markup(actions),
    });
    let method = match content {
        EditContent::Text(text) => {
            body["text"] = json!(text);
            "editMessageText"
        }
        EditContent::Caption(caption) => {
            body["caption"] = json!(caption);
            "editMessageCaption"
        }
        EditContent::ActionsOnly => "editMessageReplyMarkup",
    };
    (method, body)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, chat: AccountId, message: Outgoing) -> Result<MessageId, TransportError> {
        let (method, body) = send_request(chat, &message);
        let result = self.call(method, body).await?;
        let sent: SentMessage = serde_json::from_value(result).map_err(|e| {
            TransportError::Api {
                code: 200,
                description: format!("unexpected {method} result: {e}"),
            }
        })?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit(
        &self,
        chat: AccountId,
        message: MessageId,
        content: EditContent,
        actions: Actions,
    ) -> Result<(), TransportError> {
        let (method, body) = edit_request(chat, message, &content, &actions);
        match self.call(method, body).await {
            Ok(_) => Ok(()),
            // Same content and markup as before; nothing to do.
            Err(TransportError::Api { code: 400, description })
                if description.contains("message is not modified") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, chat: AccountId, message: MessageId) -> Result<(), TransportError> {
        self.call(
            "deleteMessage",
            json!({ "chat_id": chat.0, "message_id": message.0 }),
        )
        .await
        .map(|_| ())
    }

    async fn answer_action(
        &self,
        action_id: &str,
        text: Option<String>,
        alert: bool,
    ) -> Result<(), TransportError> {
        let mut body = json!({ "callback_query_id": action_id, "show_alert": alert });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        self.call("answerCallbackQuery", body).await.map(|_| ())
    }
}
