//! Decoding of Bot API updates into relay [`Envelope`]s.

use serde::Deserialize;

use masque_shared::{AccountId, Anchor, Command, Envelope, MediaKind, MessageId, Payload};

use crate::keyboard;

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<FileRef>>,
    #[serde(default)]
    pub video: Option<FileRef>,
    #[serde(default)]
    pub animation: Option<FileRef>,
    #[serde(default)]
    pub audio: Option<FileRef>,
    #[serde(default)]
    pub voice: Option<FileRef>,
    #[serde(default)]
    pub document: Option<FileRef>,
    #[serde(default)]
    pub sticker: Option<FileRef>,
    #[serde(default)]
    pub video_note: Option<FileRef>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Turn an update into relay work. `None` for anything the relay ignores:
/// group chats, bots, edited messages, stale or foreign callback data.
pub fn to_envelope(update: Update) -> Option<Envelope> {
    if let Some(query) = update.callback_query {
        return from_callback(query);
    }
    update.message.and_then(from_message)
}

fn from_message(message: Message) -> Option<Envelope> {
    if message.chat.kind != "private" {
        return None;
    }
    let from = message.from.as_ref().filter(|u| !u.is_bot)?;
    let account = AccountId(from.id);
    let display_name = from.first_name.clone();

    let command = match message.text.as_deref() {
        Some(text) => text_command(text).unwrap_or_else(|| Command::Content {
            message_id: MessageId(message.message_id),
            reply_to: reply_to(&message),
            payload: Payload::text(text),
        }),
        None => match media_payload(&message) {
            Some(payload) => Command::Content {
                message_id: MessageId(message.message_id),
                reply_to: reply_to(&message),
                payload,
            },
            None => Command::Unsupported,
        },
    };

    Some(Envelope::message(account, display_name, command))
}

fn reply_to(message: &Message) -> Option<MessageId> {
    message
        .reply_to_message
        .as_ref()
        .map(|m| MessageId(m.message_id))
}

/// Slash commands and reply-keyboard labels.
fn text_command(text: &str) -> Option<Command> {
    if let Some(command) = keyboard::menu_command(text) {
        return Some(command);
    }
    let rest = text.strip_prefix('/')?;
    let (head, argument) = match rest.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    // "/start@masque_bot" addresses this bot explicitly.
    let name = head.split('@').next().unwrap_or(head);
    let command = match name {
        "start" => Command::Start {
            argument: argument.map(str::to_string),
        },
        "cancel" => Command::Cancel,
        "link" => Command::ShareLink,
        "blocklist" => Command::BlockList,
        "support" => Command::Support,
        "help" | "guide" => Command::Guide,
        "account" => Command::Account,
        "nickname" => Command::ChangeNickname,
        _ => return None,
    };
    Some(command)
}

fn media_payload(message: &Message) -> Option<Payload> {
    let (kind, file) = if let Some(sizes) = &message.photo {
        // Sizes come smallest first.
        (MediaKind::Photo, sizes.last()?)
    } else if let Some(f) = &message.video {
        (MediaKind::Video, f)
    } else if let Some(f) = &message.animation {
        (MediaKind::Animation, f)
    } else if let Some(f) = &message.audio {
        (MediaKind::Audio, f)
    } else if let Some(f) = &message.voice {
        (MediaKind::Voice, f)
    } else if let Some(f) = &message.document {
        (MediaKind::Document, f)
    } else if let Some(f) = &message.sticker {
        (MediaKind::Sticker, f)
    } else if let Some(f) = &message.video_note {
        (MediaKind::VideoNote, f)
    } else {
        return None;
    };
    Some(Payload::Media {
        kind,
        file_id: file.file_id.clone(),
        caption: message.caption.clone(),
    })
}

fn from_callback(query: CallbackQuery) -> Option<Envelope> {
    if query.from.is_bot {
        return None;
    }
    let message = query.message?;
    let command = query.data.as_deref().and_then(keyboard::decode_callback)?;
    let anchor = Anchor {
        message_id: MessageId(message.message_id),
        text: message.text,
        caption: message.caption,
    };
    Some(Envelope::action(
        AccountId(query.from.id),
        query.from.first_name,
        query.id,
        anchor,
        command,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use masque_shared::Pseudonym;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Option<Envelope> {
        to_envelope(serde_json::from_value(value).unwrap())
    }

    fn private_message(extra: serde_json::Value) -> serde_json::Value {
        let mut message = json!({
            "message_id": 11,
            "from": { "id": 42, "is_bot": false, "first_name": "Rose" },
            "chat": { "id": 42, "type": "private" },
        });
        if let (Some(base), Some(extra)) = (message.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        json!({ "update_id": 1, "message": message })
    }

    #[test]
    fn test_start_with_argument() {
        let env = parse(private_message(json!({ "text": "/start abc123" }))).unwrap();
        assert_eq!(env.account, AccountId(42));
        assert_eq!(env.display_name, "Rose");
        assert_eq!(
            env.command,
            Command::Start {
                argument: Some("abc123".into())
            }
        );

        let env = parse(private_message(json!({ "text": "/start@masque_bot" }))).unwrap();
        assert_eq!(env.command, Command::Start { argument: None });
    }

    #[test]
    fn test_plain_text_is_content() {
        let env = parse(private_message(json!({
            "text": "hi there",
            "reply_to_message": {
                "message_id": 7,
                "chat": { "id": 42, "type": "private" }
            }
        })))
        .unwrap();
        assert_eq!(
            env.command,
            Command::Content {
                message_id: MessageId(11),
                reply_to: Some(MessageId(7)),
                payload: Payload::text("hi there"),
            }
        );
        assert!(env.action_id.is_none());
    }

    #[test]
    fn test_menu_label_is_command() {
        let env = parse(private_message(json!({ "text": keyboard::LABEL_CANCEL }))).unwrap();
        assert_eq!(env.command, Command::Cancel);
    }

    #[test]
    fn test_photo_uses_largest_size() {
        let env = parse(private_message(json!({
            "photo": [{ "file_id": "small" }, { "file_id": "large" }],
            "caption": "sunset"
        })))
        .unwrap();
        assert_eq!(
            env.command,
            Command::Content {
                message_id: MessageId(11),
                reply_to: None,
                payload: Payload::Media {
                    kind: MediaKind::Photo,
                    file_id: "large".into(),
                    caption: Some("sunset".into()),
                },
            }
        );
    }

    #[test]
    fn test_unknown_content_is_unsupported() {
        let env = parse(private_message(json!({ "location": { "latitude": 1.0 } }))).unwrap();
        assert_eq!(env.command, Command::Unsupported);
    }

    #[test]
    fn test_group_chats_ignored() {
        let update = json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": { "id": 42, "first_name": "Rose" },
                "chat": { "id": -100, "type": "group" },
                "text": "hello"
            }
        });
        assert!(parse(update).is_none());
    }

    #[test]
    fn test_callback_query() {
        let sender = Pseudonym::generate();
        let update = json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb-1",
                "from": { "id": 42, "first_name": "Rose" },
                "data": format!("mark-{sender}-5"),
                "message": {
                    "message_id": 5,
                    "chat": { "id": 42, "type": "private" },
                    "text": "New anonymous message"
                }
            }
        });
        let env = parse(update).unwrap();
        assert_eq!(env.action_id.as_deref(), Some("cb-1"));
        assert_eq!(
            env.command,
            Command::Mark {
                sender,
                message_id: MessageId(5)
            }
        );
        let anchor = env.anchor.unwrap();
        assert_eq!(anchor.message_id, MessageId(5));
        assert_eq!(anchor.text.as_deref(), Some("New anonymous message"));
    }

    #[test]
    fn test_unknown_callback_ignored() {
        let update = json!({
            "update_id": 3,
            "callback_query": {
                "id": "cb-2",
                "from": { "id": 42, "first_name": "Rose" },
                "data": "launch-rockets",
                "message": { "message_id": 5, "chat": { "id": 42, "type": "private" } }
            }
        });
        assert!(parse(update).is_none());
    }
}
