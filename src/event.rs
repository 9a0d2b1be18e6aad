use serde_json::Value;

/// What kind of inbound message the channel delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Text,
    ButtonReply,
    Image,
    Document,
    Unknown,
}

/// Remote media attachment: the platform-held media id plus the declared
/// MIME type. The binary itself is fetched later through the media gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub id: String,
    pub mime_type: String,
    pub filename: Option<String>,
}

/// The normalized inbound unit. Created fresh per request, never persisted.
///
/// For `ButtonReply` events `text` holds the reply's *identifier* string
/// (the command token), not its display title — the whole multi-step
/// selection state rides in that id.
#[derive(Debug, Clone)]
pub struct ConversationalEvent {
    pub sender: String,
    pub kind: EventKind,
    pub text: Option<String>,
    pub media: Option<MediaRef>,
}

impl ConversationalEvent {
    /// Whether this event should go through the receipt ingestion pipeline
    /// instead of the command router.
    pub fn is_media(&self) -> bool {
        matches!(self.kind, EventKind::Image | EventKind::Document)
    }

    /// Normalize a webhook body into an event.
    ///
    /// Accepts both the flat `{ to, messages: [...] }` shape and the older
    /// Cloud-API shape nested under `entry[0].changes[0].value`; once
    /// unwrapped the two are treated identically. Returns `None` when there
    /// is no well-formed `messages` array or no way to identify the sender —
    /// the caller acks those with the channel's receipt sentinel.
    pub fn from_webhook_body(body: &Value) -> Option<Self> {
        let (envelope, messages) = unwrap_messages(body)?;
        let msg = messages.first()?.as_object()?;

        let sender = envelope
            .get("to")
            .and_then(Value::as_str)
            .or_else(|| msg.get("from").and_then(Value::as_str))?
            .to_string();

        let event = match msg.get("type").and_then(Value::as_str) {
            Some("text") => Self {
                sender,
                kind: EventKind::Text,
                text: msg
                    .get("text")
                    .and_then(|t| t.get("body"))
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                media: None,
            },
            Some("interactive") => {
                let reply_id = msg
                    .get("interactive")
                    .and_then(|i| i.get("button_reply"))
                    .and_then(|b| b.get("id"))
                    .and_then(Value::as_str);
                match reply_id {
                    Some(id) => Self {
                        sender,
                        kind: EventKind::ButtonReply,
                        text: Some(id.to_string()),
                        media: None,
                    },
                    // Interactive types we don't render (lists, flows)
                    None => Self {
                        sender,
                        kind: EventKind::Unknown,
                        text: None,
                        media: None,
                    },
                }
            }
            Some("image") => Self {
                media: parse_media_ref(msg.get("image")),
                sender,
                kind: EventKind::Image,
                text: None,
            },
            Some("document") => Self {
                media: parse_media_ref(msg.get("document")),
                sender,
                kind: EventKind::Document,
                text: None,
            },
            _ => Self {
                sender,
                kind: EventKind::Unknown,
                text: None,
                media: None,
            },
        };
        Some(event)
    }
}

/// Find the `messages` array, unwrapping the nested Cloud-API envelope when
/// the flat shape doesn't carry one. Returns the object that owns the array
/// (needed for the sibling `to` field) alongside the array itself.
fn unwrap_messages(body: &Value) -> Option<(&Value, &Vec<Value>)> {
    if let Some(messages) = body.get("messages").and_then(Value::as_array) {
        return Some((body, messages));
    }
    let value = body
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?;
    let messages = value.get("messages").and_then(Value::as_array)?;
    Some((value, messages))
}

fn parse_media_ref(media: Option<&Value>) -> Option<MediaRef> {
    let media = media?.as_object()?;
    Some(MediaRef {
        id: media.get("id")?.as_str()?.to_string(),
        mime_type: media
            .get("mime_type")
            .and_then(Value::as_str)
            .unwrap_or("application/octet-stream")
            .to_string(),
        filename: media
            .get("filename")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}
