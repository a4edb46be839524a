//! Trending cache: a ranked snapshot replaced as one unit.
//!
//! `replace_trending` deletes the old snapshot and inserts the new one inside
//! a single IMMEDIATE transaction.  Readers on other connections keep seeing
//! the previous snapshot (WAL) until the commit, so `top_trending` can never
//! return an empty or mixed-generation result while a refresh is in flight.

use rusqlite::{params, TransactionBehavior};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::TrendingEntry;
use crate::sql::{course_at, ts, ts_at};

impl Database {
    /// Atomically swap the whole trending snapshot for `entries`.
    ///
    /// The entries must carry ranks `1..=N` in order and non-negative, finite
    /// velocities; anything else is rejected before the old snapshot is touched.
    pub fn replace_trending(&mut self, entries: &[TrendingEntry]) -> Result<()> {
        validate_snapshot(entries)?;

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM trending_entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trending_entries
                    (item_id, velocity, signups_24h, signups_previous_24h, rank, category, calculated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    entry.item_id.to_string(),
                    entry.velocity,
                    entry.signups_24h,
                    entry.signups_previous_24h,
                    entry.rank,
                    entry.category,
                    ts(&entry.calculated_at),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(entries = entries.len(), "trending snapshot replaced");
        Ok(())
    }

    /// The first `limit` entries by rank.
    pub fn top_trending(&self, limit: u32) -> Result<Vec<TrendingEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT item_id, velocity, signups_24h, signups_previous_24h, rank, category, calculated_at
             FROM trending_entries
             ORDER BY rank ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(TrendingEntry {
                item_id: course_at(row, 0)?,
                velocity: row.get(1)?,
                signups_24h: row.get(2)?,
                signups_previous_24h: row.get(3)?,
                rank: row.get(4)?,
                category: row.get(5)?,
                calculated_at: ts_at(row, 6)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

fn validate_snapshot(entries: &[TrendingEntry]) -> Result<()> {
    for (idx, entry) in entries.iter().enumerate() {
        if !entry.velocity.is_finite() || entry.velocity < 0.0 {
            return Err(StoreError::Validation(format!(
                "invalid velocity {} for {}",
                entry.velocity, entry.item_id
            )));
        }
        if entry.rank as usize != idx + 1 {
            return Err(StoreError::Validation(format!(
                "rank {} at position {}; ranks must be dense from 1",
                entry.rank,
                idx + 1
            )));
        }
    }
    Ok(())
}
