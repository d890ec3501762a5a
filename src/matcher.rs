//! Skill matcher
//!
//! Picks the moderator whose declared skills overlap most with a ticket's
//! required skills. Ties go to the longest-serving moderator, so the choice
//! is reproducible for the same pool. When nobody overlaps, the moderator with
//! the fewest open assigned tickets is chosen instead.

use crate::core::{User, UserId, skills};
use crate::error::Result;
use crate::storage::{TicketRepository, UserRepository};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Selects a moderator for a set of required skills
#[derive(Clone)]
pub struct SkillMatcher {
    users: Arc<dyn UserRepository>,
    tickets: Arc<dyn TicketRepository>,
    fallback_to_least_loaded: bool,
}

impl SkillMatcher {
    pub fn new(users: Arc<dyn UserRepository>, tickets: Arc<dyn TicketRepository>) -> Self {
        Self {
            users,
            tickets,
            fallback_to_least_loaded: true,
        }
    }

    /// Enable or disable the least-loaded fallback
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_least_loaded = enabled;
        self
    }

    /// Choose a moderator for `required`, or `None` when there is nobody
    pub async fn assign(&self, required: &[String]) -> Result<Option<UserId>> {
        let moderators = self.users.moderators().await?;
        if moderators.is_empty() {
            debug!("No moderators registered; leaving ticket unassigned");
            return Ok(None);
        }

        if let Some(best) = best_skill_match(&moderators, required) {
            return Ok(Some(best));
        }

        if !self.fallback_to_least_loaded {
            return Ok(None);
        }

        let load = self.tickets.open_load().await?;
        let chosen = least_loaded(&moderators, &load);
        debug!(moderator = ?chosen, "No skill overlap; assigned least-loaded moderator");
        Ok(chosen)
    }
}

/// Ordering key shared by both selection rules: earliest `createdAt`, then id
fn seniority(user: &User) -> (chrono::DateTime<chrono::Utc>, UserId) {
    (user.created_at, user.id)
}

/// Moderator with the largest skill intersection, if any overlap exists
#[must_use]
pub fn best_skill_match(moderators: &[User], required: &[String]) -> Option<UserId> {
    moderators
        .iter()
        .map(|m| (skills::overlap(&m.skills, required), m))
        .filter(|(score, _)| *score > 0)
        .min_by_key(|(score, m)| (Reverse(*score), seniority(m)))
        .map(|(_, m)| m.id)
}

/// Moderator with the fewest open assigned tickets
#[must_use]
pub fn least_loaded(moderators: &[User], load: &HashMap<UserId, usize>) -> Option<UserId> {
    moderators
        .iter()
        .min_by_key(|m| (load.get(&m.id).copied().unwrap_or(0), seniority(m)))
        .map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Role, Status, TicketUpdate, UpdateGuard, UserBuilder};
    use crate::storage::FileStorage;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn moderator(minutes_ago: i64, skills: &[&str]) -> User {
        UserBuilder::new()
            .role(Role::Moderator)
            .skills(skills.iter().copied())
            .created_at(Utc::now() - Duration::minutes(minutes_ago))
            .build()
    }

    fn required(skills: &[&str]) -> Vec<String> {
        skills.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_largest_overlap_wins() {
        let web = moderator(10, &["React", "CSS", "Node"]);
        let backend = moderator(20, &["Node", "Postgres"]);
        let pool = vec![backend.clone(), web.clone()];

        assert_eq!(best_skill_match(&pool, &required(&["react", "css"])), Some(web.id));
        assert_eq!(
            best_skill_match(&pool, &required(&["Postgres", "Node"])),
            Some(backend.id)
        );
    }

    #[test]
    fn test_tie_goes_to_earliest_created() {
        let newer = moderator(1, &["Rust"]);
        let older = moderator(60, &["Rust"]);
        let pool = vec![newer, older.clone()];

        for _ in 0..5 {
            assert_eq!(best_skill_match(&pool, &required(&["Rust"])), Some(older.id));
        }
    }

    #[test]
    fn test_no_overlap_returns_none() {
        let pool = vec![moderator(5, &["Go"])];
        assert_eq!(best_skill_match(&pool, &required(&["Haskell"])), None);
        assert_eq!(best_skill_match(&pool, &[]), None);
    }

    #[test]
    fn test_least_loaded() {
        let busy = moderator(30, &[]);
        let idle = moderator(10, &[]);
        let mut load = HashMap::new();
        load.insert(busy.id, 3);
        load.insert(idle.id, 1);

        let pool = vec![busy.clone(), idle.clone()];
        assert_eq!(least_loaded(&pool, &load), Some(idle.id));

        // equal load falls back to seniority
        load.insert(idle.id, 3);
        assert_eq!(least_loaded(&pool, &load), Some(busy.id));
        assert_eq!(least_loaded(&[], &load), None);
    }

    #[tokio::test]
    async fn test_assign_against_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(temp_dir.path()));
        let matcher = SkillMatcher::new(storage.clone(), storage.clone());

        assert_eq!(matcher.assign(&required(&["React"])).await.unwrap(), None);

        let first = storage
            .create_user(moderator(30, &["Go"]))
            .await
            .unwrap();
        let second = storage
            .create_user(moderator(20, &["Python"]))
            .await
            .unwrap();
        for _ in 0..2 {
            let ticket = storage
                .create("t".into(), "d".into(), second.id)
                .await
                .unwrap();
            storage
                .update(
                    &ticket.id,
                    UpdateGuard::Any,
                    TicketUpdate {
                        status: Some(Status::InProgress),
                        assigned_to: Some(Some(first.id)),
                        ..TicketUpdate::default()
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(
            matcher.assign(&required(&["React"])).await.unwrap(),
            Some(second.id)
        );
        assert_eq!(
            matcher
                .clone()
                .with_fallback(false)
                .assign(&required(&["React"]))
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            matcher.assign(&required(&["go"])).await.unwrap(),
            Some(first.id)
        );
    }
}
