use std::sync::Arc;
use tracing::debug;

use crate::models::{AccountId, TeamId, TeamMembership, TeamRole};
use crate::storage::{Storage, StorageError};

/// Team membership reads and provisioning. Roles are recorded but grant
/// nothing beyond plain membership.
#[derive(Clone)]
pub struct TeamService {
    storage: Arc<dyn Storage>,
}

impl TeamService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Adds the account to the team, or changes its role if already a member
    pub async fn add_member(
        &self,
        account_id: AccountId,
        team_id: TeamId,
        role: TeamRole,
    ) -> Result<(), StorageError> {
        debug!("adding account {} to team {} as {}", account_id, team_id, role);
        self.storage
            .add_team_member(&TeamMembership {
                account_id,
                team_id,
                role,
            })
            .await
    }

    pub async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>, StorageError> {
        self.storage.list_teams(account_id).await
    }

    pub async fn role_in_team(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<TeamRole>, StorageError> {
        self.storage.get_team_role(account_id, team_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn re_adding_a_member_changes_the_role() {
        let teams = TeamService::new(Arc::new(MemoryStorage::new()));
        teams.add_member(1, 10, TeamRole::Member).await.unwrap();
        teams.add_member(1, 20, TeamRole::Owner).await.unwrap();
        teams.add_member(1, 10, TeamRole::Admin).await.unwrap();

        let listed = teams.list_teams(1).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(teams.role_in_team(1, 10).await.unwrap(), Some(TeamRole::Admin));
        assert_eq!(teams.role_in_team(2, 10).await.unwrap(), None);
    }
}
