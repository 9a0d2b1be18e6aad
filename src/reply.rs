use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::warn;

/// Interactive-button cap of the channel's reply UI.
pub const MAX_BUTTONS: usize = 3;

/// WhatsApp truncates button titles past 20 characters; cut cleanly ourselves.
pub const MAX_TITLE_CHARS: usize = 20;

pub const HOME_BUTTON_ID: &str = "cmd_menu";
pub const HOME_BUTTON_TITLE: &str = "Main Menu";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: &str) -> Self {
        Self {
            id: id.into(),
            title: truncate_title(title),
        }
    }

    /// The navigation button appended to most menus.
    pub fn home() -> Self {
        Self::new(HOME_BUTTON_ID, HOME_BUTTON_TITLE)
    }
}

/// The closed set of outbound message shapes. Everything the service says
/// goes through one of these two variants and the single encoder below, so
/// a malformed reply body is a compile-time impossibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPayload {
    Text { body: String },
    Buttons { body: String, buttons: Vec<Button> },
}

impl ReplyPayload {
    pub fn text(body: impl Into<String>) -> Self {
        ReplyPayload::Text { body: body.into() }
    }

    /// Build a button menu, enforcing the channel cap. Oversized lists are
    /// truncated with a warning rather than rejected — the channel would
    /// refuse the whole message otherwise.
    pub fn buttons(body: impl Into<String>, mut buttons: Vec<Button>) -> Self {
        if buttons.len() > MAX_BUTTONS {
            warn!(
                "button menu over channel cap ({} > {}), truncating",
                buttons.len(),
                MAX_BUTTONS
            );
            buttons.truncate(MAX_BUTTONS);
        }
        ReplyPayload::Buttons {
            body: body.into(),
            buttons,
        }
    }

    /// Button menu with a trailing home button — unless the entity list
    /// already fills the cap, in which case appending would overflow it.
    pub fn buttons_with_home(body: impl Into<String>, mut buttons: Vec<Button>) -> Self {
        if buttons.len() < MAX_BUTTONS {
            buttons.push(Button::home());
        }
        Self::buttons(body, buttons)
    }

    /// Informational text wrapped with a single home button.
    pub fn text_with_home(body: impl Into<String>) -> Self {
        Self::buttons(body, vec![Button::home()])
    }

    /// The default two-option main menu.
    pub fn main_menu() -> Self {
        Self::buttons(
            "📝 Please choose one option below:",
            vec![
                Button::new("cmd_zoom", "Join Class"),
                Button::new("cmd_pay_fees", "Pay Fees"),
            ],
        )
    }

    /// Upstream-lookup-failure payload with a recovery button.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::text_with_home(body)
    }

    /// Generic failure payload. Internal detail stays in the logs.
    pub fn failure() -> Self {
        Self::text_with_home("⚠️ Something went wrong. Please try again later.")
    }

    /// Shown when a receipt arrives with no open payment request to attach
    /// it to — a legitimate "receipt before payment" case, not an error.
    pub fn start_payment_prompt() -> Self {
        Self::buttons(
            "We couldn't find a pending payment for this receipt. Would you like to start a payment first?",
            vec![
                Button::new("cmd_pay_fees", "Pay Fees"),
                Button::home(),
            ],
        )
    }

    pub fn button_count(&self) -> usize {
        match self {
            ReplyPayload::Text { .. } => 0,
            ReplyPayload::Buttons { buttons, .. } => buttons.len(),
        }
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    title.chars().take(MAX_TITLE_CHARS).collect()
}

// Wire shapes for the WhatsApp reply body. Kept private: callers only ever
// see `ReplyPayload`, which serializes through these.

#[derive(Serialize)]
struct WireText<'a> {
    preview_url: bool,
    body: &'a str,
}

#[derive(Serialize)]
struct WireButton<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    reply: &'a Button,
}

#[derive(Serialize)]
struct WireAction<'a> {
    buttons: Vec<WireButton<'a>>,
}

#[derive(Serialize)]
struct WireBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct WireInteractive<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    body: WireBody<'a>,
    action: WireAction<'a>,
}

impl Serialize for ReplyPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReplyPayload::Text { body } => {
                let mut s = serializer.serialize_struct("ReplyPayload", 2)?;
                s.serialize_field("type", "text")?;
                s.serialize_field(
                    "text",
                    &WireText {
                        preview_url: true,
                        body,
                    },
                )?;
                s.end()
            }
            ReplyPayload::Buttons { body, buttons } => {
                let mut s = serializer.serialize_struct("ReplyPayload", 2)?;
                s.serialize_field("type", "interactive")?;
                s.serialize_field(
                    "interactive",
                    &WireInteractive {
                        kind: "button",
                        body: WireBody { text: body },
                        action: WireAction {
                            buttons: buttons
                                .iter()
                                .map(|b| WireButton {
                                    kind: "reply",
                                    reply: b,
                                })
                                .collect(),
                        },
                    },
                )?;
                s.end()
            }
        }
    }
}
