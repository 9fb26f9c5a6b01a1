//! Teams, contests and contest entries.

use super::{parse_points, to_u32, Repository};
use crate::datasource::{ContestStore, StoreError, TeamStore};
use crate::domain::{
    ContestId, ContestInfo, ContestParticipant, ContestStatus, MatchId, PlayerId, TeamComposition,
    TeamId, TimeMs, UserId,
};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;

impl Repository {
    /// Create a contest or update its match/status.
    pub async fn upsert_contest(
        &self,
        contest_id: &ContestId,
        match_id: &MatchId,
        status: ContestStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO contests (contest_id, match_id, status)
            VALUES (?, ?, ?)
            ON CONFLICT(contest_id) DO UPDATE SET
                match_id = excluded.match_id,
                status = excluded.status
            "#,
        )
        .bind(contest_id.as_str())
        .bind(match_id.as_str())
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a team and its squad. Teams are immutable once saved.
    ///
    /// Returns `false` when the team already exists.
    pub async fn insert_team(&self, team: &TeamComposition) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO teams (team_id, owner_user_id, match_id, captain_id, vice_captain_id,
                               credits_used, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(team_id) DO NOTHING
            "#,
        )
        .bind(team.team_id.as_str())
        .bind(team.owner_user_id.as_str())
        .bind(team.match_id.as_str())
        .bind(team.captain_id.as_str())
        .bind(team.vice_captain_id.as_str())
        .bind(team.credits_used.to_canonical_string())
        .bind(team.created_at.as_i64())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for (position, player_id) in team.player_ids.iter().enumerate() {
            sqlx::query("INSERT INTO team_players (team_id, position, player_id) VALUES (?, ?, ?)")
                .bind(team.team_id.as_str())
                .bind(position as i64)
                .bind(player_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Enter a saved team into a contest.
    ///
    /// Returns `false` when the team was already entered.
    pub async fn enter_team(
        &self,
        contest_id: &ContestId,
        team_id: &TeamId,
        user_id: &UserId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO contest_participants (contest_id, team_id, user_id)
            VALUES (?, ?, ?)
            ON CONFLICT(contest_id, team_id) DO NOTHING
            "#,
        )
        .bind(contest_id.as_str())
        .bind(team_id.as_str())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a team from a contest.
    pub async fn withdraw_team(
        &self,
        contest_id: &ContestId,
        team_id: &TeamId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM contest_participants WHERE contest_id = ? AND team_id = ?")
                .bind(contest_id.as_str())
                .bind(team_id.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn squads_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<HashMap<String, Vec<PlayerId>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT tp.team_id, tp.player_id
            FROM team_players tp
            JOIN contest_participants cp ON cp.team_id = tp.team_id
            WHERE cp.contest_id = ?
            ORDER BY tp.team_id ASC, tp.position ASC
            "#,
        )
        .bind(contest_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut squads: HashMap<String, Vec<PlayerId>> = HashMap::new();
        for row in &rows {
            let team_id: String = row.try_get("team_id")?;
            let player_id: String = row.try_get("player_id")?;
            squads
                .entry(team_id)
                .or_default()
                .push(PlayerId::new(player_id));
        }
        Ok(squads)
    }
}

#[async_trait]
impl TeamStore for Repository {
    async fn teams_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<TeamComposition>, StoreError> {
        let mut squads = self.squads_in_contest(contest_id).await?;

        let rows = sqlx::query(
            r#"
            SELECT t.team_id, t.owner_user_id, t.match_id, t.captain_id, t.vice_captain_id,
                   t.credits_used, t.created_at_ms
            FROM teams t
            JOIN contest_participants cp ON cp.team_id = t.team_id
            WHERE cp.contest_id = ?
            ORDER BY t.team_id ASC
            "#,
        )
        .bind(contest_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut teams = Vec::with_capacity(rows.len());
        for row in &rows {
            let team_id: String = row.try_get("team_id")?;
            let credits_used: String = row.try_get("credits_used")?;
            let owner: String = row.try_get("owner_user_id")?;
            let match_id: String = row.try_get("match_id")?;
            let captain_id: String = row.try_get("captain_id")?;
            let vice_captain_id: String = row.try_get("vice_captain_id")?;
            let created_at_ms: i64 = row.try_get("created_at_ms")?;

            teams.push(TeamComposition {
                credits_used: parse_points("credits_used", &team_id, &credits_used)?,
                player_ids: squads.remove(&team_id).unwrap_or_default(),
                team_id: TeamId::new(team_id),
                owner_user_id: UserId::new(owner),
                match_id: MatchId::new(match_id),
                captain_id: PlayerId::new(captain_id),
                vice_captain_id: PlayerId::new(vice_captain_id),
                created_at: TimeMs::new(created_at_ms),
            });
        }
        Ok(teams)
    }

    async fn participants_in_contest(
        &self,
        contest_id: &ContestId,
    ) -> Result<Vec<ContestParticipant>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT team_id, user_id, rank, prize_won
            FROM contest_participants
            WHERE contest_id = ?
            ORDER BY team_id ASC
            "#,
        )
        .bind(contest_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut participants = Vec::with_capacity(rows.len());
        for row in &rows {
            let team_id: String = row.try_get("team_id")?;
            let user_id: String = row.try_get("user_id")?;
            let rank: Option<i64> = row.try_get("rank")?;
            let prize_won: Option<String> = row.try_get("prize_won")?;

            participants.push(ContestParticipant {
                rank: rank.map(|r| to_u32("rank", &team_id, r)).transpose()?,
                prize_won: prize_won
                    .as_deref()
                    .map(|p| parse_points("prize_won", &team_id, p))
                    .transpose()?,
                contest_id: contest_id.clone(),
                team_id: TeamId::new(team_id),
                user_id: UserId::new(user_id),
            });
        }
        Ok(participants)
    }

    async fn record_ranks(
        &self,
        contest_id: &ContestId,
        ranks: &[(TeamId, u32)],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE contest_participants SET rank = NULL WHERE contest_id = ?")
            .bind(contest_id.as_str())
            .execute(&mut *tx)
            .await?;

        for (team_id, rank) in ranks {
            sqlx::query(
                "UPDATE contest_participants SET rank = ? WHERE contest_id = ? AND team_id = ?",
            )
            .bind(i64::from(*rank))
            .bind(contest_id.as_str())
            .bind(team_id.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ContestStore for Repository {
    async fn contest_info(
        &self,
        contest_id: &ContestId,
    ) -> Result<Option<ContestInfo>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT c.match_id, c.status,
                   (SELECT COUNT(*) FROM contest_participants cp
                    WHERE cp.contest_id = c.contest_id) AS total
            FROM contests c
            WHERE c.contest_id = ?
            "#,
        )
        .bind(contest_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let match_id: String = row.try_get("match_id")?;
        let status: String = row.try_get("status")?;
        let total: i64 = row.try_get("total")?;

        Ok(Some(ContestInfo {
            contest_id: contest_id.clone(),
            match_id: MatchId::new(match_id),
            total_participants: to_u32("total", contest_id.as_str(), total)?,
            status: ContestStatus::from_str(&status).map_err(StoreError::Corrupt)?,
        }))
    }

    async fn contests_for_match(&self, match_id: &MatchId) -> Result<Vec<ContestId>, StoreError> {
        let rows = sqlx::query("SELECT contest_id FROM contests WHERE match_id = ? ORDER BY contest_id")
            .bind(match_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<ContestId, StoreError> {
                let id: String = row.try_get("contest_id")?;
                Ok(ContestId::new(id))
            })
            .collect()
    }
}
