//! Match event ingestion and per-player reads.

use super::{parse_points, to_u32, Repository};
use crate::datasource::{MatchEventStore, StoreError};
use crate::domain::{MatchEvent, MatchId, PlayerId, TimeMs};
use async_trait::async_trait;
use sqlx::Row;

impl Repository {
    /// Insert a match event idempotently on `event_id`.
    ///
    /// Returns `false` when the event was already stored.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_event(&self, event: &MatchEvent) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO match_events (event_id, player_id, match_id, points, round, timestamp_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(event_id) DO NOTHING
            "#,
        )
        .bind(event.event_id.as_str())
        .bind(event.player_id.as_str())
        .bind(event.match_id.as_str())
        .bind(event.points.to_canonical_string())
        .bind(i64::from(event.round))
        .bind(event.timestamp.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a batch of events in one transaction.
    ///
    /// Returns the number of newly inserted events (excludes duplicates).
    pub async fn insert_events_batch(&self, events: &[MatchEvent]) -> Result<usize, sqlx::Error> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0usize;
        let mut tx = self.pool.begin().await?;

        for event in events {
            let result = sqlx::query(
                r#"
                INSERT INTO match_events (event_id, player_id, match_id, points, round, timestamp_ms)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(event_id) DO NOTHING
                "#,
            )
            .bind(event.event_id.as_str())
            .bind(event.player_id.as_str())
            .bind(event.match_id.as_str())
            .bind(event.points.to_canonical_string())
            .bind(i64::from(event.round))
            .bind(event.timestamp.as_i64())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[async_trait]
impl MatchEventStore for Repository {
    async fn events_for(
        &self,
        player_id: &PlayerId,
        match_id: &MatchId,
    ) -> Result<Vec<MatchEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, points, round, timestamp_ms
            FROM match_events
            WHERE match_id = ? AND player_id = ?
            ORDER BY timestamp_ms ASC, event_id ASC
            "#,
        )
        .bind(match_id.as_str())
        .bind(player_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<MatchEvent, StoreError> {
                let event_id: String = row.try_get("event_id")?;
                let points: String = row.try_get("points")?;
                let round: i64 = row.try_get("round")?;
                let timestamp_ms: i64 = row.try_get("timestamp_ms")?;

                Ok(MatchEvent {
                    points: parse_points("points", &event_id, &points)?,
                    round: to_u32("round", &event_id, round)?,
                    player_id: player_id.clone(),
                    match_id: match_id.clone(),
                    timestamp: TimeMs::new(timestamp_ms),
                    event_id,
                })
            })
            .collect()
    }
}
