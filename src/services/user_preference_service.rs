use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Frequency, UpdateUserPreference, UserPreference};
use crate::store::PreferenceStore;

/// Get user preferences, creating the defaults on first load
pub async fn get_or_create<S>(store: &S, user_id: Uuid) -> Result<UserPreference, AppError>
where
    S: PreferenceStore + ?Sized,
{
    match store.get_preference(user_id).await {
        Ok(Some(prefs)) => Ok(prefs),
        Ok(None) => {
            info!("No preferences found for user {}, creating defaults", user_id);
            let defaults = UserPreference::default_for_user(user_id);
            Ok(store.upsert_preference(&defaults).await?)
        }
        Err(e) => {
            warn!("Storage error fetching preferences: {}", e);
            Err(e.into())
        }
    }
}

/// Update user preferences with validation
pub async fn update<S>(
    store: &S,
    user_id: Uuid,
    mut update: UpdateUserPreference,
) -> Result<UserPreference, AppError>
where
    S: PreferenceStore + ?Sized,
{
    info!("Updating preferences for user {}", user_id);
    update.validate().map_err(AppError::Validation)?;

    let mut prefs = get_or_create(store, user_id).await?;
    prefs.apply(update);
    Ok(store.upsert_preference(&prefs).await?)
}

/// Restore defaults, keeping the original creation time
pub async fn reset<S>(store: &S, user_id: Uuid) -> Result<UserPreference, AppError>
where
    S: PreferenceStore + ?Sized,
{
    info!("Resetting preferences for user {}", user_id);
    Ok(store
        .upsert_preference(&UserPreference::default_for_user(user_id))
        .await?)
}

/// Users who should receive notifications at `frequency`
pub async fn list_eligible<S>(store: &S, frequency: Frequency) -> Result<Vec<UserPreference>, AppError>
where
    S: PreferenceStore + ?Sized,
{
    Ok(store.list_enabled_by_frequency(frequency).await?)
}
