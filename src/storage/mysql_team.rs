use crate::models::{AccountId, TeamId, TeamMembership, TeamRole};
use crate::storage::mysql::MySqlStorage;
use crate::storage::mysql_models::MembershipRow;
use crate::storage::{Result, StorageError};

/// MySQL team membership reads
pub trait MySqlTeamExt {
    async fn add_team_member(&self, membership: &TeamMembership) -> Result<()>;

    async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>>;

    async fn get_team_role(&self, account_id: AccountId, team_id: TeamId)
        -> Result<Option<TeamRole>>;
}

impl MySqlTeamExt for MySqlStorage {
    async fn add_team_member(&self, membership: &TeamMembership) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO team_memberships (account_id, team_id, role) VALUES (?, ?, ?)
              ON DUPLICATE KEY UPDATE role = VALUES(role)"#,
        )
        .bind(membership.account_id)
        .bind(membership.team_id)
        .bind(membership.role.as_str())
        .execute(self.get_sqlx_pool())
        .await?;
        Ok(())
    }

    async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            "SELECT account_id, team_id, role FROM team_memberships \
             WHERE account_id = ? ORDER BY team_id",
        )
        .bind(account_id)
        .fetch_all(self.get_sqlx_pool())
        .await?;
        rows.into_iter().map(MembershipRow::into_membership).collect()
    }

    async fn get_team_role(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<TeamRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM team_memberships WHERE account_id = ? AND team_id = ?",
        )
        .bind(account_id)
        .bind(team_id)
        .fetch_optional(self.get_sqlx_pool())
        .await?;
        role.map(|r| r.parse::<TeamRole>().map_err(StorageError::InvalidData))
            .transpose()
    }
}
