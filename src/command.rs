//! The encoded-state command grammar.
//!
//! The channel is stateless request/response: the server holds no session, so
//! every multi-step flow smuggles its state through the button id the user
//! tapped (`cmd_<verb>[_<arg>...]`). Parsing is a total function — anything
//! unrecognized lands on `MainMenu` — and matching is ordered most-specific
//! prefix first so `cmd_pay_account_` can never swallow
//! `cmd_pay_account_student_`.

const PAY_ACCOUNT_STUDENT_PREFIX: &str = "cmd_pay_account_student_";
const PAY_ACCOUNT_PREFIX: &str = "cmd_pay_account_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MainMenu,
    PayFees,
    PayAccount { account_id: String },
    PayAccountStudent { account_id: String, student_id: String },
    Zoom,
    WhoAmI,
}

impl Command {
    /// Parse a command token. Case-insensitive; total.
    pub fn parse(text: &str) -> Command {
        let text = text.trim().to_lowercase();

        // Longest shared-stem prefix first.
        if let Some(rest) = text.strip_prefix(PAY_ACCOUNT_STUDENT_PREFIX) {
            let mut parts = rest.splitn(2, '_');
            if let (Some(account), Some(student)) = (parts.next(), parts.next())
                && !account.is_empty()
                && !student.is_empty()
            {
                return Command::PayAccountStudent {
                    account_id: account.to_string(),
                    student_id: student.to_string(),
                };
            }
            return Command::MainMenu;
        }

        if let Some(rest) = text.strip_prefix(PAY_ACCOUNT_PREFIX) {
            if rest.is_empty() {
                return Command::MainMenu;
            }
            return Command::PayAccount {
                account_id: rest.to_string(),
            };
        }

        match text.as_str() {
            "cmd_pay_fees" => Command::PayFees,
            "cmd_zoom" => Command::Zoom,
            // Earlier-generation identity check, kept for old clients.
            "cmd_me" | "me" => Command::WhoAmI,
            _ => Command::MainMenu,
        }
    }

    /// Render the token that round-trips back to this command when placed in
    /// a button id. Inverse of [`Command::parse`] for every variant.
    pub fn token(&self) -> String {
        match self {
            Command::MainMenu => crate::reply::HOME_BUTTON_ID.to_string(),
            Command::PayFees => "cmd_pay_fees".to_string(),
            Command::PayAccount { account_id } => {
                format!("{}{}", PAY_ACCOUNT_PREFIX, account_id)
            }
            Command::PayAccountStudent {
                account_id,
                student_id,
            } => format!(
                "{}{}_{}",
                PAY_ACCOUNT_STUDENT_PREFIX, account_id, student_id
            ),
            Command::Zoom => "cmd_zoom".to_string(),
            Command::WhoAmI => "cmd_me".to_string(),
        }
    }
}
