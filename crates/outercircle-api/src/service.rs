use std::sync::Arc;

use outercircle_db::{MessageStore, StoreError};
use outercircle_types::models::{Code, CodeGroup, Message, NewMessage};
use tracing::{debug, info};

use crate::codes::{CodeFormat, generate_unique_code};
use crate::error::ApiError;

pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// The four operations behind the HTTP surface, over an injected store.
#[derive(Clone)]
pub struct DropService {
    store: Arc<dyn MessageStore>,
    format: CodeFormat,
}

impl DropService {
    pub fn new(store: Arc<dyn MessageStore>, format: CodeFormat) -> Self {
        Self { store, format }
    }

    pub fn format(&self) -> &CodeFormat {
        &self.format
    }

    /// Generate a code and persist it. The code is only returned once it is
    /// recorded; losing the race against a concurrent insert of the same code
    /// just means drawing again.
    pub fn issue_code(&self) -> Result<Code, ApiError> {
        let mut rng = rand::rng();
        loop {
            let code = generate_unique_code(self.store.as_ref(), &self.format, &mut rng)?;
            match self.store.create_code(&code) {
                Ok(()) => {
                    info!("Issued code {}", code);
                    return Ok(code);
                }
                Err(StoreError::DuplicateKey(_)) => {
                    debug!("Code {} was taken before insert, drawing again", code);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn validate_code(&self, raw: &str) -> Result<bool, ApiError> {
        match self.format.parse(raw) {
            Some(code) => Ok(self.store.code_exists(&code)?),
            None => Ok(false),
        }
    }

    /// The code is checked before the body, so an unknown code is reported
    /// as such even when the message is also empty.
    pub fn submit_message(
        &self,
        raw_code: &str,
        message: String,
        sensitivity: Option<String>,
        delivery: Option<String>,
    ) -> Result<(Code, Message), ApiError> {
        let code = self.format.parse(raw_code).ok_or(ApiError::InvalidCode)?;
        if !self.store.code_exists(&code)? {
            return Err(ApiError::InvalidCode);
        }

        if message.trim().is_empty() {
            return Err(ApiError::EmptyMessage);
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::MessageTooLong {
                max: MAX_MESSAGE_CHARS,
            });
        }

        let new_message = NewMessage::new(message)
            .with_sensitivity(non_blank(sensitivity))
            .with_delivery(non_blank(delivery));
        let stored = self.store.append_message(&code, new_message)?;

        info!("Message recorded for code {}", code);
        Ok((code, stored))
    }

    pub fn list_messages_for_admin(&self) -> Result<Vec<CodeGroup>, ApiError> {
        Ok(self.store.list_all_grouped()?)
    }
}

fn non_blank(tag: Option<String>) -> Option<String> {
    tag.filter(|t| !t.trim().is_empty())
}
