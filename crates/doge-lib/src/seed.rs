// ============================
// doge-lib/src/seed.rs
// ============================
//! Startup seeding of placeholder users.
use crate::error::AppError;
use crate::storage::DocumentStore;
use crate::users::{User, UserRepository};

/// Runs once after wiring, before the listener accepts traffic. Seeding is
/// an upsert by username, so re-running against an existing store is
/// harmless.
pub async fn seed_users<S: DocumentStore>(
    repository: &UserRepository<S>,
) -> Result<(), AppError> {
    repository.save(User::new("philwebb", "Phil Webb")).await?;
    repository.save(User::new("joshlong", "Josh Long")).await?;

    for user in repository.find_all().await? {
        tracing::info!(username = %user.username, display_name = %user.display_name, "seeded user");
    }
    Ok(())
}
