//! Input validation for account and task payloads

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::constants::{
    MAX_EMAIL_LEN, MAX_PASSWORD_LEN, MAX_TASK_NAME_LEN, MAX_USERNAME_LEN, MIN_PASSWORD_LEN,
    MIN_TASK_NAME_LEN,
};
use crate::models::{NewTask, Registration, TaskChanges};

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern compiles"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// Per-field validation failures, collected rather than short-circuited
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Messages grouped by field name
    pub fn field_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        map
    }

    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub fn validate_username(username: &str, result: &mut ValidationResult) {
    if username.is_empty() {
        result.add_error("username", "Required");
    } else if username.chars().count() > MAX_USERNAME_LEN {
        result.add_error("username", format!("At most {} characters", MAX_USERNAME_LEN));
    } else if !USERNAME_RE.is_match(username) {
        result.add_error("username", "Only letters, digits and underscores are allowed");
    }
}

pub fn validate_email(email: &str, result: &mut ValidationResult) {
    if email.is_empty() {
        result.add_error("email", "Required");
    } else if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(email) {
        result.add_error("email", "Not a valid email address");
    }
}

pub fn validate_password(field: &str, password: &str, result: &mut ValidationResult) {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        result.add_error(
            field,
            format!(
                "Length must be between {} and {}",
                MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
            ),
        );
    }
}

fn validate_task_name(name: &str, result: &mut ValidationResult) {
    let len = name.trim().chars().count();
    if !(MIN_TASK_NAME_LEN..=MAX_TASK_NAME_LEN).contains(&len) {
        result.add_error(
            "name",
            format!(
                "Length must be between {} and {}",
                MIN_TASK_NAME_LEN, MAX_TASK_NAME_LEN
            ),
        );
    }
}

fn validate_estimation(estimation_secs: Option<i64>, result: &mut ValidationResult) {
    if matches!(estimation_secs, Some(secs) if secs < 0) {
        result.add_error("estimation", "Must not be negative");
    }
}

pub fn validate_registration(registration: &Registration) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_username(registration.username.trim(), &mut result);
    validate_email(registration.email.trim(), &mut result);
    validate_password("password", &registration.password, &mut result);
    result
}

pub fn validate_new_task(task: &NewTask) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_task_name(&task.name, &mut result);
    validate_estimation(task.estimation_secs, &mut result);
    result
}

pub fn validate_task_changes(changes: &TaskChanges) -> ValidationResult {
    let mut result = ValidationResult::new();
    if let Some(name) = &changes.name {
        validate_task_name(name, &mut result);
    }
    validate_estimation(changes.estimation_secs.flatten(), &mut result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_well_formed_registration() {
        let result = validate_registration(&registration("luna_42", "luna@example.com", "s3cret-pw"));
        assert!(result.is_valid(), "{:?}", result);
    }

    #[test]
    fn email_needs_one_at_sign_with_both_parts() {
        let mut ok = ValidationResult::new();
        validate_email("luna@localhost", &mut ok);
        validate_email("luna@example.com", &mut ok);
        assert!(ok.is_valid(), "{:?}", ok);

        for bad in ["a@b@c", "@localhost", "luna@", "luna", "lu na@example.com"] {
            let mut result = ValidationResult::new();
            validate_email(bad, &mut result);
            assert!(!result.is_valid(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn collects_every_failing_field() {
        let result = validate_registration(&registration("luna lovegood", "nope", "short"));
        let fields = result.field_map();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn password_length_bounds_are_inclusive() {
        let mut ok = ValidationResult::new();
        validate_password("password", &"a".repeat(8), &mut ok);
        validate_password("password", &"a".repeat(32), &mut ok);
        assert!(ok.is_valid());

        let mut too_long = ValidationResult::new();
        validate_password("password", &"a".repeat(33), &mut too_long);
        assert!(!too_long.is_valid());
    }

    #[test]
    fn task_name_must_have_three_characters() {
        let task = NewTask {
            name: "ab".into(),
            ..Default::default()
        };
        assert!(!validate_new_task(&task).is_valid());

        let changes = TaskChanges {
            name: Some("abc".into()),
            ..Default::default()
        };
        assert!(validate_task_changes(&changes).is_valid());
    }
}
