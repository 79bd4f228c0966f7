//! Field extraction from Clerk user objects
//!
//! The same rules apply to webhook `data` and to users fetched from the
//! Clerk Backend API:
//!
//! - email: the `email_addresses` entry whose `id` equals
//!   `primary_email_address_id`, otherwise the first entry
//! - full name: `first_name` and `last_name` joined by a space and trimmed;
//!   an empty result is `None`, never `""`
//!
//! Non-string values (including `null`) count as absent.

use serde_json::{Map, Value};

use super::WebhookError;
use crate::models::user::NewUser;

fn string_field<'a>(data: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    data.get(key).and_then(Value::as_str)
}

/// The Clerk user ID (`data.id`)
pub fn clerk_id(data: &Map<String, Value>) -> Result<&str, WebhookError> {
    string_field(data, "id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(WebhookError::MissingIdentifier)
}

/// Selected email address, if the payload carries one
pub fn primary_email(data: &Map<String, Value>) -> Option<&str> {
    let entries = data.get("email_addresses")?.as_array()?;
    let primary_id = string_field(data, "primary_email_address_id");

    let selected = primary_id
        .and_then(|id| {
            entries
                .iter()
                .find(|entry| entry.get("id").and_then(Value::as_str) == Some(id))
        })
        .or_else(|| entries.first())?;

    selected
        .get("email_address")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|email| !email.is_empty())
}

/// Display name derived from the name fragments
pub fn full_name(data: &Map<String, Value>) -> Option<String> {
    let first = string_field(data, "first_name").unwrap_or_default();
    let last = string_field(data, "last_name").unwrap_or_default();

    let joined = format!("{} {}", first, last);
    let trimmed = joined.trim();

    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Whether either name key is present, even as `null`
pub fn has_name_fields(data: &Map<String, Value>) -> bool {
    data.contains_key("first_name") || data.contains_key("last_name")
}

pub fn image_url(data: &Map<String, Value>) -> Option<String> {
    string_field(data, "image_url")
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Everything needed to create a user from a Clerk object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub clerk_id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub image_url: Option<String>,
}

impl UserProfile {
    /// Validates and extracts a complete profile
    ///
    /// # Errors
    ///
    /// - [`WebhookError::MissingIdentifier`] if `id` is absent or empty
    /// - [`WebhookError::MissingEmail`] if no email address can be selected
    pub fn from_data(data: &Map<String, Value>) -> Result<Self, WebhookError> {
        let clerk_id = clerk_id(data)?.to_string();
        let email = primary_email(data)
            .ok_or(WebhookError::MissingEmail)?
            .to_string();

        Ok(Self {
            clerk_id,
            email,
            full_name: full_name(data),
            image_url: image_url(data),
        })
    }

    /// Active, non-superuser insert for this profile
    pub fn into_new_user(self) -> NewUser {
        NewUser::from_clerk(self.clerk_id, self.email)
            .with_full_name(self.full_name)
            .with_image_url(self.image_url)
    }
}
