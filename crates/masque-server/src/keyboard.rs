//! Action sets rendered as Bot API keyboards, and the callback data codec.
//!
//! Callback data is `<verb>-<pseudonym>[-<id>...]`. Pseudonyms never
//! contain `-`, so splitting is unambiguous.

use serde_json::{json, Value};

use masque_shared::{Actions, Command, MessageId, Pseudonym, TextField};

// Labels of the persistent reply keyboard. Incoming text equal to one of
// these is a menu command, not content.
pub const LABEL_LINK: &str = "🔗 My link";
pub const LABEL_BLOCK_LIST: &str = "🚫 Block list";
pub const LABEL_ACCOUNT: &str = "👤 Account";
pub const LABEL_SUPPORT: &str = "🛠️ Support";
pub const LABEL_GUIDE: &str = "📖 Guide";
pub const LABEL_CANCEL: &str = "⬅️ Cancel";

/// Map a reply-keyboard label back to its command.
pub fn menu_command(text: &str) -> Option<Command> {
    match text {
        LABEL_LINK => Some(Command::ShareLink),
        LABEL_BLOCK_LIST => Some(Command::BlockList),
        LABEL_ACCOUNT => Some(Command::Account),
        LABEL_SUPPORT => Some(Command::Support),
        LABEL_GUIDE => Some(Command::Guide),
        LABEL_CANCEL => Some(Command::Cancel),
        _ => None,
    }
}

/// `reply_markup` for a new message. `None` sends none.
pub fn markup(actions: &Actions) -> Option<Value> {
    match actions {
        Actions::None => None,
        Actions::Main => Some(json!({
            "keyboard": [
                [{ "text": LABEL_LINK }],
                [{ "text": LABEL_BLOCK_LIST }, { "text": LABEL_ACCOUNT }],
                [{ "text": LABEL_SUPPORT }, { "text": LABEL_GUIDE }],
            ],
            "resize_keyboard": true,
        })),
        Actions::Cancel => Some(json!({
            "keyboard": [[{ "text": LABEL_CANCEL }]],
            "resize_keyboard": true,
        })),
        other => Some(inline_markup(other)),
    }
}

/// `reply_markup` for an edit. Edits only accept inline keyboards, so
/// anything else clears the buttons.
pub fn edit_markup(actions: &Actions) -> Value {
    inline_markup(actions)
}

fn inline_markup(actions: &Actions) -> Value {
    let rows: Vec<Vec<Value>> = match actions {
        Actions::Recipient {
            sender,
            message_id,
            seen,
            marked,
        } => {
            let mut first = vec![button("↩️ Reply", format!("reply-{sender}-{message_id}"))];
            if !seen {
                first.push(button("👀 Seen", format!("seen-{sender}-{message_id}")));
            }
            let mark_label = if *marked { "✖️ Unmark" } else { "📌 Mark" };
            vec![
                first,
                vec![
                    button(mark_label, format!("mark-{sender}-{message_id}")),
                    button("🚫 Block", format!("block-{sender}")),
                ],
            ]
        }
        Actions::Sent {
            recipient,
            delivered,
            origin,
            editable,
        } => {
            let mut row = Vec::new();
            if let Some(field) = editable {
                let verb = match field {
                    TextField::Text => "edit",
                    TextField::Caption => "editc",
                };
                row.push(button(
                    "✏️ Edit",
                    format!("{verb}-{recipient}-{delivered}-{origin}"),
                ));
            }
            row.push(button("🗑️ Delete", format!("delete-{recipient}-{delivered}")));
            vec![row]
        }
        Actions::Account { bot_enabled } => {
            let toggle = if *bot_enabled {
                "⏸️ Turn relay off"
            } else {
                "▶️ Turn relay on"
            };
            vec![vec![
                button("✏️ Change nickname", "nickname".to_string()),
                button(toggle, "bot_status".to_string()),
            ]]
        }
        Actions::BlockList { entries } => entries
            .iter()
            .map(|p| vec![button(&format!("Unblock {p}"), format!("unblock-{p}"))])
            .collect(),
        Actions::Blocked { pseudonym } => {
            vec![vec![button("🔓 Unblock", format!("unblock-{pseudonym}"))]]
        }
        Actions::None | Actions::Main | Actions::Cancel => Vec::new(),
    };
    json!({ "inline_keyboard": rows })
}

fn button(label: &str, data: String) -> Value {
    json!({ "text": label, "callback_data": data })
}

/// Decode callback data produced by [`markup`].
pub fn decode_callback(data: &str) -> Option<Command> {
    let mut parts = data.split('-');
    let verb = parts.next()?;
    let mut pseudonym = || parts.next().and_then(Pseudonym::parse);

    let command = match verb {
        "nickname" => Command::ChangeNickname,
        "bot_status" => Command::ToggleBotStatus,
        "block" => Command::Block {
            pseudonym: pseudonym()?,
        },
        "unblock" => Command::Unblock {
            pseudonym: pseudonym()?,
        },
        "reply" | "seen" | "mark" | "edit" | "editc" | "delete" => {
            let who = pseudonym()?;
            let ids: Vec<MessageId> = parts
                .map(|p| p.parse::<i64>().map(MessageId))
                .collect::<Result<_, _>>()
                .ok()?;
            match (verb, ids.as_slice()) {
                ("reply", [id]) => Command::Reply {
                    sender: who,
                    message_id: *id,
                },
                ("seen", [id]) => Command::Seen {
                    sender: who,
                    message_id: *id,
                },
                ("mark", [id]) => Command::Mark {
                    sender: who,
                    message_id: *id,
                },
                ("edit" | "editc", [delivered, origin]) => Command::EditRequest {
                    recipient: who,
                    delivered: *delivered,
                    origin: *origin,
                    field: if verb == "editc" {
                        TextField::Caption
                    } else {
                        TextField::Text
                    },
                },
                ("delete", [delivered]) => Command::Delete {
                    recipient: who,
                    delivered: *delivered,
                },
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(command)
}
