//! User lifecycle handlers
//!
//! One session per event. Every path ends in exactly one `commit` or
//! `rollback`; the session is committed only for outcomes that wrote.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::event::ClerkEvent;
use super::payload::{self, UserProfile};
use super::WebhookError;
use crate::models::user::{User, CLERK_ID_CONSTRAINT};
use crate::store::{StoreError, UserSession, UserStore};

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Created(User),

    /// A user with the Clerk ID already existed; nothing was written
    AlreadyExists,

    Updated(User),
    Deactivated(User),

    /// Event type not handled
    Ignored,
}

impl EventOutcome {
    /// Value of the `status` field in the HTTP response
    pub fn status(&self) -> &'static str {
        match self {
            EventOutcome::Created(_) => "created",
            EventOutcome::AlreadyExists => "already_exists",
            EventOutcome::Updated(_) => "updated",
            EventOutcome::Deactivated(_) => "deactivated",
            EventOutcome::Ignored => "ignored",
        }
    }

    /// Whether the session must be committed
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            EventOutcome::Created(_) | EventOutcome::Updated(_) | EventOutcome::Deactivated(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserAction {
    Create,
    Update,
    Deactivate,
}

impl UserAction {
    fn as_str(self) -> &'static str {
        match self {
            UserAction::Create => "create",
            UserAction::Update => "update",
            UserAction::Deactivate => "deactivate",
        }
    }

    fn persistence(self) -> impl FnOnce(StoreError) -> WebhookError {
        move |source| WebhookError::Persistence {
            action: self.as_str(),
            source,
        }
    }
}

/// Routes an event to its handler inside a fresh session
///
/// Unknown events return [`EventOutcome::Ignored`] without opening a
/// session.
pub async fn dispatch(store: &dyn UserStore, event: ClerkEvent) -> Result<EventOutcome, WebhookError> {
    let (action, data) = match event {
        ClerkEvent::UserCreated(data) => (UserAction::Create, data),
        ClerkEvent::UserUpdated(data) => (UserAction::Update, data),
        ClerkEvent::UserDeleted(data) => (UserAction::Deactivate, data),
        ClerkEvent::Unknown(event_type) => {
            debug!(event_type = %event_type, "Ignoring unhandled webhook event");
            return Ok(EventOutcome::Ignored);
        }
    };

    let mut session = store.begin().await.map_err(action.persistence())?;

    let result = match action {
        UserAction::Create => handle_user_created(session.as_mut(), &data).await,
        UserAction::Update => handle_user_updated(session.as_mut(), &data).await,
        UserAction::Deactivate => handle_user_deleted(session.as_mut(), &data).await,
    };

    finish(session, action, result).await
}

async fn finish(
    session: Box<dyn UserSession>,
    action: UserAction,
    result: Result<EventOutcome, WebhookError>,
) -> Result<EventOutcome, WebhookError> {
    match result {
        Ok(outcome) if outcome.is_write() => {
            session.commit().await.map_err(action.persistence())?;
            Ok(outcome)
        }
        Ok(outcome) => {
            if let Err(e) = session.rollback().await {
                warn!(action = action.as_str(), error = %e, "Rollback after no-op event failed");
            }
            Ok(outcome)
        }
        Err(err) => {
            if let Err(e) = session.rollback().await {
                warn!(action = action.as_str(), error = %e, "Rollback after failed event failed");
            }
            Err(err)
        }
    }
}

/// Inserts the user described by a `user.created` payload
///
/// # Errors
///
/// - [`WebhookError::MissingIdentifier`] / [`WebhookError::MissingEmail`]
///   on invalid payloads
/// - [`WebhookError::Persistence`] on any store failure other than a
///   duplicate Clerk ID
pub async fn handle_user_created(
    session: &mut dyn UserSession,
    data: &Map<String, Value>,
) -> Result<EventOutcome, WebhookError> {
    let profile = UserProfile::from_data(data)?;

    if session
        .find_by_clerk_id(&profile.clerk_id)
        .await
        .map_err(UserAction::Create.persistence())?
        .is_some()
    {
        info!(clerk_id = %profile.clerk_id, "User already exists, skipping create");
        return Ok(EventOutcome::AlreadyExists);
    }

    let clerk_id = profile.clerk_id.clone();
    match session.insert(profile.into_new_user()).await {
        Ok(user) => {
            info!(clerk_id = %clerk_id, user_id = %user.id, "Created user from webhook");
            Ok(EventOutcome::Created(user))
        }
        Err(e) if e.violates(CLERK_ID_CONSTRAINT) => {
            info!(clerk_id = %clerk_id, "Concurrent create for user, treating as existing");
            Ok(EventOutcome::AlreadyExists)
        }
        Err(e) => Err(UserAction::Create.persistence()(e)),
    }
}

/// Applies the fields present in a `user.updated` payload
///
/// Email is overwritten only if one can be selected. The name is recomputed
/// whenever either name key is present, so `{"first_name": null}` clears it.
pub async fn handle_user_updated(
    session: &mut dyn UserSession,
    data: &Map<String, Value>,
) -> Result<EventOutcome, WebhookError> {
    let clerk_id = payload::clerk_id(data)?;
    let mut user = find_existing(session, clerk_id, UserAction::Update).await?;

    if let Some(email) = payload::primary_email(data) {
        user.email = email.to_string();
    }
    if payload::has_name_fields(data) {
        user.full_name = payload::full_name(data);
    }
    if data.contains_key("image_url") {
        user.image_url = payload::image_url(data);
    }

    let saved = session
        .save(&user)
        .await
        .map_err(UserAction::Update.persistence())?;

    info!(clerk_id = %clerk_id, user_id = %saved.id, "Updated user from webhook");
    Ok(EventOutcome::Updated(saved))
}

/// Soft-deletes the user named by a `user.deleted` payload
///
/// Already inactive users are returned unchanged without a write.
pub async fn handle_user_deleted(
    session: &mut dyn UserSession,
    data: &Map<String, Value>,
) -> Result<EventOutcome, WebhookError> {
    let clerk_id = payload::clerk_id(data)?;
    let mut user = find_existing(session, clerk_id, UserAction::Deactivate).await?;

    if !user.is_active {
        debug!(clerk_id = %clerk_id, "User already inactive");
        return Ok(EventOutcome::Deactivated(user));
    }

    user.is_active = false;
    let saved = session
        .save(&user)
        .await
        .map_err(UserAction::Deactivate.persistence())?;

    info!(clerk_id = %clerk_id, user_id = %saved.id, "Deactivated user from webhook");
    Ok(EventOutcome::Deactivated(saved))
}

async fn find_existing(
    session: &mut dyn UserSession,
    clerk_id: &str,
    action: UserAction,
) -> Result<User, WebhookError> {
    session
        .find_by_clerk_id(clerk_id)
        .await
        .map_err(action.persistence())?
        .ok_or_else(|| {
            debug!(clerk_id = %clerk_id, action = action.as_str(), "No user for Clerk ID");
            WebhookError::UserNotFound(clerk_id.to_string())
        })
}
