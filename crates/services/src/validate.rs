//! # Input Validation
//!
//! Length limits and format rules, accumulated into field-tagged error
//! lists so a caller sees every problem in one response.

use domains::{AppError, FieldError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

pub const TITLE_MAX_LEN: usize = 300;
pub const BODY_MAX_LEN: usize = 40_000;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const TOPIC_TITLE_MAX_LEN: usize = 50;
pub const COMMUNITY_NAME_MAX_LEN: usize = 50;
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 4;
pub const PASSWORD_MAX_LEN: usize = 128;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+([-+.]\w+)*@\w+([-.]\w+)*\.\w+([-.]\w+)*$").unwrap());
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+$").unwrap());
static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// Accumulates field errors across several checks before failing.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: &str) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.push(field, message);
        }
        self
    }

    pub fn title(&mut self, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), "title", "Title is required.")
            .check(
                value.chars().count() <= TITLE_MAX_LEN,
                "title",
                "Title must be at most 300 characters.",
            )
    }

    pub fn body(&mut self, value: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), "text", "Text is required.")
            .check(
                value.chars().count() <= BODY_MAX_LEN,
                "text",
                "Text must be at most 40000 characters.",
            )
    }

    pub fn username(&mut self, value: &str) -> &mut Self {
        let len = value.chars().count();
        self.check(
            WORD_RE.is_match(value),
            "username",
            "Username may only contain letters, numbers and underscores.",
        )
        .check(
            (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len),
            "username",
            "Username must be 3 to 20 characters.",
        )
    }

    pub fn email(&mut self, value: &str) -> &mut Self {
        self.check(EMAIL_RE.is_match(value), "email", "Invalid email address.")
    }

    pub fn password(&mut self, value: &str) -> &mut Self {
        let len = value.chars().count();
        self.check(
            WORD_RE.is_match(value),
            "password",
            "Password may only contain letters, numbers and underscores.",
        )
        .check(
            (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len),
            "password",
            "Password must be 4 to 128 characters.",
        )
    }

    pub fn hex_color(&mut self, field: &str, value: &str) -> &mut Self {
        self.check(
            HEX_COLOR_RE.is_match(value),
            field,
            "Expected a #RRGGBB hex color.",
        )
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the accumulated checks; `Err(AppError::Validation)` carries
    /// every failed field.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}
