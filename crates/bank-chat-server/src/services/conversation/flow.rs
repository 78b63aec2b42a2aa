//! Guided "open an account" dialogue.

use crate::models::chat::{AccountDetails, FlowState};

const OPEN_INTENT_PHRASES: [&str; 2] = ["open an account", "open a bank account"];
const CONFIRM_WORDS: [&str; 3] = ["yes", "y", "correct"];

pub const START_REPLY: &str = "Great! To get started, what is your full name?";
pub const ASK_ACCOUNT_TYPE_REPLY: &str =
    "What type of account would you like to open? (e.g., Checking, Savings)";
pub const SUBMITTED_REPLY: &str =
    "Thank you! Your account opening request has been submitted. A representative will be in touch shortly.";
pub const RESTART_REPLY: &str = "No problem. Let's start over. What is your full name?";
pub const COMPLETED_REPLY: &str =
    "Your request has been submitted. Feel free to ask any other questions!";

/// Result of feeding one message to the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStep {
    pub reply: String,
    /// Set on the step that confirms the application
    pub submitted: Option<AccountDetails>,
}

impl FlowStep {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            reply: text.into(),
            submitted: None,
        }
    }
}

pub struct AccountOpeningFlow;

impl AccountOpeningFlow {
    /// Case-insensitive phrase match on the raw message
    pub fn is_open_intent(message: &str) -> bool {
        let lowered = message.to_lowercase();
        OPEN_INTENT_PHRASES.iter().any(|p| lowered.contains(p))
    }

    /// Enter the dialogue, discarding any details from a previous run
    pub fn start(state: &mut FlowState, details: &mut AccountDetails) -> FlowStep {
        *state = FlowState::AskName;
        *details = AccountDetails::default();
        FlowStep::reply(START_REPLY)
    }

    /// Advance by one user message. Returns `None` when the dialogue is idle.
    pub fn advance(
        state: &mut FlowState,
        details: &mut AccountDetails,
        input: &str,
    ) -> Option<FlowStep> {
        let input = input.trim();

        let step = match *state {
            FlowState::Idle => return None,
            FlowState::AskName => {
                details.name = Some(input.to_string());
                *state = FlowState::AskEmail;
                FlowStep::reply(format!(
                    "Thank you, {}. What is your email address?",
                    input
                ))
            }
            FlowState::AskEmail => {
                details.email = Some(input.to_string());
                *state = FlowState::AskAccountType;
                FlowStep::reply(ASK_ACCOUNT_TYPE_REPLY)
            }
            FlowState::AskAccountType => {
                details.account_type = Some(input.to_string());
                *state = FlowState::Confirmation;
                FlowStep::reply(Self::confirmation_prompt(details))
            }
            FlowState::Confirmation => {
                if Self::is_confirmation(input) {
                    *state = FlowState::Completed;
                    FlowStep {
                        reply: SUBMITTED_REPLY.to_string(),
                        submitted: Some(details.clone()),
                    }
                } else {
                    *state = FlowState::AskName;
                    FlowStep::reply(RESTART_REPLY)
                }
            }
            FlowState::Completed => {
                *state = FlowState::Idle;
                FlowStep::reply(COMPLETED_REPLY)
            }
        };

        Some(step)
    }

    fn is_confirmation(input: &str) -> bool {
        let lowered = input.to_lowercase();
        CONFIRM_WORDS.contains(&lowered.as_str())
    }

    fn confirmation_prompt(details: &AccountDetails) -> String {
        format!(
            "Please confirm your details:\nName: {}\nEmail: {}\nAccount Type: {}\nIs this correct? (yes/no)",
            details.name.as_deref().unwrap_or_default(),
            details.email.as_deref().unwrap_or_default(),
            details.account_type.as_deref().unwrap_or_default(),
        )
    }
}
