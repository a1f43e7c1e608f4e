use std::collections::HashSet;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use outercircle_db::{MessageStore, StoreError};
use outercircle_types::api::{IssueCodeResponse, VerifyCodeRequest, VerifyCodeResponse};
use outercircle_types::models::Code;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const DEFAULT_CODE_LENGTH: usize = 4;
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeFormatError {
    #[error("code alphabet is empty")]
    EmptyAlphabet,
    #[error("code length must be at least 1")]
    ZeroLength,
    #[error("code alphabet may only hold A-Z and 0-9, got {0:?}")]
    InvalidSymbol(char),
    #[error("code alphabet repeats {0:?}")]
    DuplicateSymbol(char),
}

/// Shape of an access code: its length and the symbols it is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFormat {
    alphabet: Vec<char>,
    length: usize,
}

impl Default for CodeFormat {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl CodeFormat {
    /// Symbols must be uppercase ASCII letters or digits, since user input is
    /// uppercased before lookup. Repeats would skew the distribution.
    pub fn new(alphabet: &str, length: usize) -> Result<Self, CodeFormatError> {
        if alphabet.is_empty() {
            return Err(CodeFormatError::EmptyAlphabet);
        }
        if length == 0 {
            return Err(CodeFormatError::ZeroLength);
        }

        let mut seen = HashSet::new();
        for c in alphabet.chars() {
            if !(c.is_ascii_uppercase() || c.is_ascii_digit()) {
                return Err(CodeFormatError::InvalidSymbol(c));
            }
            if !seen.insert(c) {
                return Err(CodeFormatError::DuplicateSymbol(c));
            }
        }

        Ok(Self {
            alphabet: alphabet.chars().collect(),
            length,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    /// Number of distinct codes, saturating at `u128::MAX`.
    pub fn space_size(&self) -> u128 {
        (self.alphabet.len() as u128).saturating_pow(self.length as u32)
    }

    /// Draw one candidate uniformly from the code space.
    pub fn random_code<R: Rng + ?Sized>(&self, rng: &mut R) -> Code {
        let code: String = (0..self.length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())])
            .collect();
        Code::new(code)
    }

    /// Normalise user input (trim, uppercase).
    pub fn normalize(&self, raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Normalise user input and return it as a `Code` if it could ever have
    /// been issued under this format.
    pub fn parse(&self, raw: &str) -> Option<Code> {
        let normalized = self.normalize(raw);
        let well_formed = normalized.chars().count() == self.length
            && normalized.chars().all(|c| self.alphabet.contains(&c));
        well_formed.then(|| Code::new(normalized))
    }
}

/// Draw candidates until one is not already in `store`.
///
/// There is no retry bound; the format should leave the code space sparse
/// enough that a retry is rare. The caller still has to persist the code.
pub fn generate_unique_code<R: Rng + ?Sized>(
    store: &dyn MessageStore,
    format: &CodeFormat,
    rng: &mut R,
) -> Result<Code, StoreError> {
    loop {
        let candidate = format.random_code(rng);
        if !store.code_exists(&candidate)? {
            return Ok(candidate);
        }
        debug!("Code collision on {}, drawing again", candidate);
    }
}

// -- Handlers --

/// POST /codes — issue a fresh code, already persisted.
pub async fn issue_code(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let code = run_blocking(move || state.service.issue_code()).await?;
    Ok((StatusCode::CREATED, Json(IssueCodeResponse { code })))
}

/// POST /codes/verify — report whether a code has been issued.
pub async fn verify_code(
    State(state): State<AppState>,
    payload: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let raw = req.code.unwrap_or_default();
    let code = state.service.format().normalize(&raw);
    let valid = run_blocking(move || state.service.validate_code(&raw)).await?;
    Ok(Json(VerifyCodeResponse { code, valid }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use outercircle_db::SqliteStore;
    use outercircle_types::models::{CodeGroup, Message, NewMessage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports the first `taken` lookups as collisions.
    struct Crowded {
        taken: usize,
        lookups: AtomicUsize,
    }

    impl MessageStore for Crowded {
        fn code_exists(&self, _code: &Code) -> outercircle_db::Result<bool> {
            Ok(self.lookups.fetch_add(1, Ordering::SeqCst) < self.taken)
        }
        fn create_code(&self, _code: &Code) -> outercircle_db::Result<()> {
            Ok(())
        }
        fn append_message(&self, code: &Code, _m: NewMessage) -> outercircle_db::Result<Message> {
            Err(StoreError::UnknownCode(code.clone()))
        }
        fn list_all_grouped(&self) -> outercircle_db::Result<Vec<CodeGroup>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn default_format_is_four_uppercase_alphanumerics() {
        let format = CodeFormat::default();
        assert_eq!(format.length(), 4);
        assert_eq!(format.alphabet().len(), 36);
        assert_eq!(format.space_size(), 1_679_616);
    }

    #[test]
    fn random_codes_respect_the_format() {
        let format = CodeFormat::default();
        let mut rng = rand::rng();
        for _ in 0..1_000 {
            let code = format.random_code(&mut rng);
            assert_eq!(code.as_str().len(), 4);
            assert!(code.as_str().chars().all(|c| format.alphabet().contains(&c)));
        }
    }

    #[test]
    fn custom_format_is_honoured() {
        let format = CodeFormat::new("AB", 8).unwrap();
        let code = format.random_code(&mut rand::rng());
        assert_eq!(code.as_str().len(), 8);
        assert!(code.as_str().chars().all(|c| c == 'A' || c == 'B'));
    }

    #[test]
    fn bad_formats_are_rejected() {
        assert_eq!(CodeFormat::new("", 4), Err(CodeFormatError::EmptyAlphabet));
        assert_eq!(CodeFormat::new("ABC", 0), Err(CodeFormatError::ZeroLength));
        assert_eq!(CodeFormat::new("ABc", 4), Err(CodeFormatError::InvalidSymbol('c')));
        assert_eq!(CodeFormat::new("AB-", 4), Err(CodeFormatError::InvalidSymbol('-')));
        assert_eq!(CodeFormat::new("ABA", 4), Err(CodeFormatError::DuplicateSymbol('A')));
    }

    #[test]
    fn parse_normalises_and_checks_shape() {
        let format = CodeFormat::default();
        assert_eq!(format.parse(" 7qx2 "), Some(Code::new("7QX2")));
        assert_eq!(format.parse("7QX"), None);
        assert_eq!(format.parse("7QX22"), None);
        assert_eq!(format.parse("7Q-2"), None);
        assert_eq!(format.parse(""), None);
    }

    #[test]
    fn collisions_are_retried() {
        let store = Crowded {
            taken: 3,
            lookups: AtomicUsize::new(0),
        };
        generate_unique_code(&store, &CodeFormat::default(), &mut rand::rng()).unwrap();
        assert_eq!(store.lookups.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn generated_code_avoids_every_existing_code() {
        // 2-symbol, length-2 space has 4 codes; fill three of them.
        let format = CodeFormat::new("AB", 2).unwrap();
        let store = SqliteStore::open_in_memory().unwrap();
        for taken in ["AA", "AB", "BA"] {
            store.create_code(&Code::new(taken)).unwrap();
        }

        for _ in 0..20 {
            let code = generate_unique_code(&store, &format, &mut rand::rng()).unwrap();
            assert_eq!(code, Code::new("BB"));
        }
    }
}
