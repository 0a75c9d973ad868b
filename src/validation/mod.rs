//! Request body shapes and identifier checks, applied before any handler runs.

use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::database::models::{GroupPatch, Permission, UserPatch};

const NAME_MIN: usize = 4;
const NAME_MAX: usize = 20;
const AGE_MIN: i64 = 4;
const AGE_MAX: i64 = 130;

const PASSWORD_PATTERN_MESSAGE: &str = "Password should contain at least one letter and one number";
const PASSWORD_EMPTY_MESSAGE: &str = "Password is not allowed to be empty";

/// Every rule an input violated, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    details: Vec<String>,
}

impl ValidationErrors {
    fn push(&mut self, message: impl Into<String>) {
        self.details.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn into_details(self) -> Vec<String> {
        self.details
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: {}", self.details.join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

/// A named body schema. Unknown fields are dropped; known ones are coerced.
pub trait Shape {
    type Output;

    fn validate(input: &Value) -> Result<Self::Output, ValidationErrors>;
}

pub fn validate<S: Shape>(input: &Value) -> Result<S::Output, ValidationErrors> {
    S::validate(input)
}

pub struct UserShape;

pub struct GroupShape;

/// Validated group body; `users_ids` is present only when the client sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInput {
    pub patch: GroupPatch,
    pub users_ids: Option<Vec<Uuid>>,
}

impl Shape for UserShape {
    type Output = UserPatch;

    fn validate(input: &Value) -> Result<UserPatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = object(input, &mut errors)?;

        let login = bounded_string(fields, "login", &mut errors);
        let password = password(fields, &mut errors);
        let age = age(fields, &mut errors);

        match (login, password, age) {
            (Some(login), Some(password), Some(age)) if errors.is_empty() => Ok(UserPatch {
                login,
                password,
                age,
            }),
            _ => Err(errors),
        }
    }
}

impl Shape for GroupShape {
    type Output = GroupInput;

    fn validate(input: &Value) -> Result<GroupInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let fields = object(input, &mut errors)?;

        let name = bounded_string(fields, "name", &mut errors);
        let permissions = permissions(fields, &mut errors);
        let users_ids = users_ids(fields, &mut errors);

        match (name, permissions) {
            (Some(name), Some(permissions)) if errors.is_empty() => Ok(GroupInput {
                patch: GroupPatch { name, permissions },
                users_ids,
            }),
            _ => Err(errors),
        }
    }
}

pub fn validate_user(input: &Value) -> Result<UserPatch, ValidationErrors> {
    validate::<UserShape>(input)
}

pub fn validate_group(input: &Value) -> Result<GroupInput, ValidationErrors> {
    validate::<GroupShape>(input)
}

/// True for the canonical hyphenated UUID text form.
pub fn is_well_formed_id(raw: &str) -> bool {
    parse_id(raw).is_some()
}

pub fn parse_id(raw: &str) -> Option<Uuid> {
    if raw.len() != 36 {
        return None;
    }
    Uuid::parse_str(raw).ok()
}

fn object<'a>(
    input: &'a Value,
    errors: &mut ValidationErrors,
) -> Result<&'a Map<String, Value>, ValidationErrors> {
    match input {
        Value::Object(fields) => Ok(fields),
        _ => {
            errors.push("\"value\" must be of type object");
            Err(errors.clone())
        }
    }
}

fn present<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn bounded_string(
    fields: &Map<String, Value>,
    key: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let Some(value) = present(fields, key) else {
        errors.push(format!("\"{}\" is required", key));
        return None;
    };
    let Some(text) = value.as_str() else {
        errors.push(format!("\"{}\" must be a string", key));
        return None;
    };

    let len = text.chars().count();
    if len == 0 {
        errors.push(format!("\"{}\" is not allowed to be empty", key));
        return None;
    }
    if len < NAME_MIN {
        errors.push(format!(
            "\"{}\" length must be at least {} characters long",
            key, NAME_MIN
        ));
        return None;
    }
    if len > NAME_MAX {
        errors.push(format!(
            "\"{}\" length must be less than or equal to {} characters long",
            key, NAME_MAX
        ));
        return None;
    }
    Some(text.to_string())
}

fn password(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<String> {
    let Some(value) = present(fields, "password") else {
        errors.push("\"password\" is required");
        return None;
    };
    let Some(text) = value.as_str() else {
        errors.push("\"password\" must be a string");
        return None;
    };

    if text.is_empty() {
        errors.push(PASSWORD_EMPTY_MESSAGE);
        return None;
    }
    let has_letter = text.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        errors.push(PASSWORD_PATTERN_MESSAGE);
        return None;
    }
    Some(text.to_string())
}

fn age(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<i32> {
    let Some(value) = present(fields, "age") else {
        errors.push("\"age\" is required");
        return None;
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    };
    let Some(number) = number else {
        errors.push("\"age\" must be a number");
        return None;
    };

    if number.fract() != 0.0 {
        errors.push("\"age\" must be an integer");
        return None;
    }
    let age = number as i64;
    if age < AGE_MIN {
        errors.push(format!("\"age\" must be greater than or equal to {}", AGE_MIN));
        return None;
    }
    if age > AGE_MAX {
        errors.push(format!("\"age\" must be less than or equal to {}", AGE_MAX));
        return None;
    }
    Some(age as i32)
}

fn permissions(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Vec<Permission>> {
    let Some(value) = present(fields, "permissions") else {
        errors.push("\"permissions\" is required");
        return None;
    };
    let Some(items) = value.as_array() else {
        errors.push("\"permissions\" must be an array");
        return None;
    };

    let allowed = Permission::ALL
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut permissions = Vec::with_capacity(items.len());
    let mut valid = true;
    for (index, item) in items.iter().enumerate() {
        match item.as_str().and_then(|s| s.parse::<Permission>().ok()) {
            Some(permission) => {
                if !permissions.contains(&permission) {
                    permissions.push(permission);
                }
            }
            None => {
                valid = false;
                errors.push(format!(
                    "\"permissions[{}]\" must be one of [{}]",
                    index, allowed
                ));
            }
        }
    }
    valid.then_some(permissions)
}

fn users_ids(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Vec<Uuid>> {
    let value = fields.get("usersIds")?;
    let Some(items) = value.as_array() else {
        errors.push("\"usersIds\" must be an array");
        return None;
    };

    let mut ids = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item.as_str().and_then(parse_id) {
            Some(id) => ids.push(id),
            None => errors.push(format!("\"usersIds[{}]\" must be a valid GUID", index)),
        }
    }
    Some(ids)
}
