//! The command router: one inbound conversational event in, one reply
//! payload out.
//!
//! `route` always succeeds from the caller's perspective. Every upstream
//! failure is caught at its branch boundary and degraded to a recoverable
//! payload — the messaging platform retries on anything that isn't a
//! 200-with-structured-body, which would duplicate the conversation turn.

use crate::command::Command;
use crate::config::PortalConfig;
use crate::event::{ConversationalEvent, EventKind};
use crate::lms::{Account, LmsClient, Student};
use crate::reply::{Button, ReplyPayload};
use std::sync::Arc;
use tracing::warn;

pub struct CommandRouter {
    lms: Arc<LmsClient>,
    portal: PortalConfig,
}

impl CommandRouter {
    pub fn new(lms: Arc<LmsClient>, portal: PortalConfig) -> Self {
        Self { lms, portal }
    }

    pub async fn route(&self, event: &ConversationalEvent) -> ReplyPayload {
        // Only Text and ButtonReply carry a command token.
        let text = match event.kind {
            EventKind::Text | EventKind::ButtonReply => event.text.as_deref().unwrap_or(""),
            _ => return ReplyPayload::main_menu(),
        };

        match Command::parse(text) {
            Command::PayAccountStudent {
                account_id,
                student_id,
            } => {
                self.pay_student(&event.sender, &account_id, &student_id)
                    .await
            }
            Command::PayAccount { account_id } => {
                self.pay_account(&event.sender, &account_id).await
            }
            Command::PayFees => self.pay_fees(&event.sender).await,
            Command::Zoom => self.zoom(&event.sender).await,
            Command::WhoAmI => self.who_am_i(&event.sender).await,
            Command::MainMenu => ReplyPayload::main_menu(),
        }
    }

    /// Final step of the payment flow: both ids were carried through the
    /// button token, so re-scope the lookup to `(sender, account, student)`
    /// and hand out the portal link.
    async fn pay_student(&self, sender: &str, account_id: &str, student_id: &str) -> ReplyPayload {
        let student = match self.lms.student(sender, account_id, student_id).await {
            Ok(student) => student,
            Err(e) => {
                warn!("student lookup failed for {}: {}", sender, e);
                None
            }
        };
        let Some(student) = student else {
            return ReplyPayload::not_found("❌ Invalid number.");
        };
        let Some(token) = &student.payment_token else {
            warn!("student {} has no payment token", student.id);
            return ReplyPayload::not_found("❌ Invalid number.");
        };

        let url = format!(
            "{}/portal/pay/init/{}/{}",
            self.portal.base_url.trim_end_matches('/'),
            student.id,
            token
        );
        ReplyPayload::text_with_home(format!("💳 Pay fees for {} here:\n{}", student.name, url))
    }

    /// Middle step: list the account's students as buttons, each carrying
    /// both ids forward in its token.
    async fn pay_account(&self, sender: &str, account_id: &str) -> ReplyPayload {
        let students = match self.lms.students(sender, Some(account_id)).await {
            Ok(students) => students,
            Err(e) => {
                warn!("students lookup failed for {}: {}", sender, e);
                Vec::new()
            }
        };
        if students.is_empty() {
            return ReplyPayload::not_found("❌ Invalid number.");
        }

        let buttons = students
            .iter()
            .map(|s| {
                Button::new(
                    Command::PayAccountStudent {
                        account_id: account_id.to_string(),
                        student_id: s.id.clone(),
                    }
                    .token(),
                    &s.name,
                )
            })
            .collect();
        ReplyPayload::buttons_with_home("👩‍🎓 Choose a student:", buttons)
    }

    /// First step: one button per distinct account the sender's students
    /// belong to, first-seen order preserved.
    async fn pay_fees(&self, sender: &str) -> ReplyPayload {
        let students = match self.lms.students(sender, None).await {
            Ok(students) => students,
            Err(e) => {
                warn!("students lookup failed for {}: {}", sender, e);
                Vec::new()
            }
        };
        if students.is_empty() {
            return ReplyPayload::not_found("❌ Invalid number.");
        }

        let buttons = dedup_accounts(&students)
            .into_iter()
            .map(|account| {
                Button::new(
                    Command::PayAccount {
                        account_id: account.id.clone(),
                    }
                    .token(),
                    &account.name,
                )
            })
            .collect();
        ReplyPayload::buttons_with_home("🏫 Choose an account:", buttons)
    }

    async fn zoom(&self, sender: &str) -> ReplyPayload {
        let meetings = match self.lms.meetings(sender).await {
            Ok(meetings) => meetings,
            Err(e) => {
                warn!("meetings lookup failed for {}: {}", sender, e);
                Vec::new()
            }
        };
        if meetings.is_empty() {
            return ReplyPayload::not_found("You haven't zoom meetings!");
        }

        let body = meetings
            .iter()
            .map(|m| format!("📚 {}\n{}", m.class_name, m.link))
            .collect::<Vec<_>>()
            .join("\n\n");
        ReplyPayload::text_with_home(body)
    }

    async fn who_am_i(&self, sender: &str) -> ReplyPayload {
        match self.lms.students(sender, None).await {
            Ok(students) if !students.is_empty() => ReplyPayload::text(students[0].name.clone()),
            Ok(_) => ReplyPayload::not_found("❌ Invalid number."),
            Err(e) => {
                warn!("identity lookup failed for {}: {}", sender, e);
                ReplyPayload::not_found("❌ Invalid number.")
            }
        }
    }
}

/// Deduplicate students by account, stable first-seen-wins, preserving the
/// order the store returned.
fn dedup_accounts(students: &[Student]) -> Vec<&Account> {
    let mut seen: Vec<&str> = Vec::new();
    let mut accounts = Vec::new();
    for student in students {
        if !seen.contains(&student.account.id.as_str()) {
            seen.push(&student.account.id);
            accounts.push(&student.account);
        }
    }
    accounts
}
