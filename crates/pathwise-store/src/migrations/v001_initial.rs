//! v001 -- Initial schema creation.
//!
//! Creates the five engine tables: `relationships`, `activity_events`,
//! `recommendations`, `trending_entries` and `unlocked_achievements`.
//!
//! All timestamps are fixed-width RFC-3339 UTC strings (microsecond
//! precision, `Z` suffix) so lexical order equals chronological order.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Relationships (directed follow edges)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS relationships (
    follower_id  TEXT NOT NULL,               -- UUID
    following_id TEXT NOT NULL,               -- UUID
    created_at   TEXT NOT NULL,

    PRIMARY KEY (follower_id, following_id),
    CHECK (follower_id <> following_id)
);

CREATE INDEX IF NOT EXISTS idx_relationships_following
    ON relationships(following_id, created_at DESC);

-- ----------------------------------------------------------------
-- Activity events (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS activity_events (
    id             TEXT PRIMARY KEY NOT NULL, -- UUID v4
    actor_user_id  TEXT NOT NULL,
    activity_type  TEXT NOT NULL,
    reference_type TEXT NOT NULL,
    reference_id   TEXT NOT NULL,
    metadata       TEXT NOT NULL DEFAULT '{}',-- JSON object
    visibility     TEXT NOT NULL CHECK (visibility IN ('public', 'friends', 'private')),
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_actor_ts
    ON activity_events(actor_user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Recommendations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS recommendations (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4, kept across upserts
    user_id     TEXT NOT NULL,
    item_id     TEXT NOT NULL,
    strategy    TEXT NOT NULL,
    match_score INTEGER NOT NULL CHECK (match_score BETWEEN 0 AND 100),
    reason      TEXT NOT NULL,
    metadata    TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL,
    expires_at  TEXT,                         -- NULL = never expires

    UNIQUE (user_id, item_id, strategy)
);

CREATE INDEX IF NOT EXISTS idx_recommendations_user_score
    ON recommendations(user_id, match_score DESC);

-- ----------------------------------------------------------------
-- Trending snapshot (replaced wholesale on refresh)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS trending_entries (
    item_id              TEXT PRIMARY KEY NOT NULL,
    velocity             REAL NOT NULL CHECK (velocity >= 0),
    signups_24h          INTEGER NOT NULL,
    signups_previous_24h INTEGER NOT NULL,
    rank                 INTEGER NOT NULL UNIQUE CHECK (rank > 0),
    category             TEXT NOT NULL,
    calculated_at        TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Unlocked achievements (write-once)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS unlocked_achievements (
    user_id        TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    unlocked_at    TEXT NOT NULL,

    PRIMARY KEY (user_id, achievement_id)
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
