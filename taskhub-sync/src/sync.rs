/// Reconciliation of Clerk users with the local users table
///
/// All changes of one run happen in a single [`UserSession`]: committed at
/// the end, or rolled back for a dry run. Profile extraction uses the same
/// rules as the webhook handlers ([`UserProfile::from_data`]).

use std::collections::HashSet;
use std::fmt;

use taskhub_shared::store::{StoreError, UserSession, UserStore};
use taskhub_shared::webhooks::payload::{self, UserProfile};
use tracing::{info, warn};

use crate::clerk::ClerkUser;

/// Counters for one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deactivated: usize,
    pub errors: usize,
}

impl SyncStats {
    fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Created => self.created += 1,
            SyncAction::Updated => self.updated += 1,
            SyncAction::Unchanged => self.unchanged += 1,
            SyncAction::Skipped => self.errors += 1,
        }
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sync Summary:")?;
        writeln!(f, "   Created:     {}", self.created)?;
        writeln!(f, "   Updated:     {}", self.updated)?;
        writeln!(f, "   Unchanged:   {}", self.unchanged)?;
        writeln!(f, "   Deactivated: {}", self.deactivated)?;
        write!(f, "   Errors:      {}", self.errors)
    }
}

/// What happened to one remote user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    Updated,
    Unchanged,

    /// Remote record lacked an id or email
    Skipped,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOptions {
    /// Roll back instead of committing
    pub dry_run: bool,

    /// Deactivate active local users absent from Clerk
    pub deactivate_missing: bool,
}

/// Mirrors one Clerk user into the session
///
/// An existing user is overwritten and reactivated if any of email, name,
/// image or active flag differs.
pub async fn sync_user(session: &mut dyn UserSession, remote: &ClerkUser) -> Result<SyncAction, StoreError> {
    let profile = match UserProfile::from_data(remote) {
        Ok(profile) => profile,
        Err(e) => {
            warn!(clerk_id = ?remote.get("id"), error = %e, "Skipping Clerk user with missing data");
            return Ok(SyncAction::Skipped);
        }
    };

    let Some(mut user) = session.find_by_clerk_id(&profile.clerk_id).await? else {
        let created = session.insert(profile.into_new_user()).await?;
        info!(clerk_id = ?created.clerk_id, email = %created.email, "Created user");
        return Ok(SyncAction::Created);
    };

    let unchanged = user.email == profile.email
        && user.full_name == profile.full_name
        && user.image_url == profile.image_url
        && user.is_active;

    if unchanged {
        return Ok(SyncAction::Unchanged);
    }

    info!(
        clerk_id = %profile.clerk_id,
        email = %profile.email,
        previous_email = %user.email,
        reactivated = !user.is_active,
        "Updated user"
    );

    user.email = profile.email;
    user.full_name = profile.full_name;
    user.image_url = profile.image_url;
    user.is_active = true;
    session.save(&user).await?;

    Ok(SyncAction::Updated)
}

/// Deactivates active users whose Clerk ID is not in `seen`
///
/// Users without a Clerk ID count as missing.
pub async fn deactivate_missing(
    session: &mut dyn UserSession,
    seen: &HashSet<String>,
) -> Result<usize, StoreError> {
    let mut deactivated = 0;

    for mut user in session.list_active().await? {
        let present = user.clerk_id.as_ref().is_some_and(|id| seen.contains(id));
        if present {
            continue;
        }

        user.is_active = false;
        session.save(&user).await?;
        info!(user_id = %user.id, email = %user.email, "Deactivated user not found in Clerk");
        deactivated += 1;
    }

    Ok(deactivated)
}

/// Applies a full Clerk listing to the store
///
/// # Errors
///
/// Any store error aborts the run; nothing is committed.
pub async fn run_sync(
    store: &dyn UserStore,
    remote_users: &[ClerkUser],
    options: SyncOptions,
) -> Result<SyncStats, StoreError> {
    let mut session = store.begin().await?;

    match apply(session.as_mut(), remote_users, options).await {
        Ok(stats) if options.dry_run => {
            session.rollback().await?;
            info!("Dry run, no changes were made");
            Ok(stats)
        }
        Ok(stats) => {
            session.commit().await?;
            info!("Changes committed");
            Ok(stats)
        }
        Err(e) => {
            if let Err(rollback) = session.rollback().await {
                warn!(error = %rollback, "Rollback after failed sync failed");
            }
            Err(e)
        }
    }
}

async fn apply(
    session: &mut dyn UserSession,
    remote_users: &[ClerkUser],
    options: SyncOptions,
) -> Result<SyncStats, StoreError> {
    let mut stats = SyncStats::default();
    let mut seen = HashSet::new();

    for remote in remote_users {
        if let Ok(clerk_id) = payload::clerk_id(remote) {
            seen.insert(clerk_id.to_string());
        }

        let action = sync_user(session, remote).await?;
        stats.record(action);
    }

    if options.deactivate_missing {
        stats.deactivated = deactivate_missing(session, &seen).await?;
    }

    Ok(stats)
}
