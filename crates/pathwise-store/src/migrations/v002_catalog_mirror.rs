//! v002 -- Read-only mirror of catalog and identity data.
//!
//! These tables are filled by the course and identity domains. The engine
//! only ever reads them.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS courses (
    id       TEXT PRIMARY KEY NOT NULL,       -- UUID
    title    TEXT NOT NULL,
    category TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS course_skills (
    course_id TEXT NOT NULL,
    skill     TEXT NOT NULL,

    PRIMARY KEY (course_id, skill),
    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_course_skills_skill ON course_skills(skill);

CREATE TABLE IF NOT EXISTS enrollments (
    user_id      TEXT NOT NULL,
    course_id    TEXT NOT NULL,
    started_at   TEXT NOT NULL,
    completed_at TEXT,                        -- NULL while in progress

    PRIMARY KEY (user_id, course_id),
    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_enrollments_course_started
    ON enrollments(course_id, started_at);

CREATE TABLE IF NOT EXISTS learner_stats (
    user_id              TEXT PRIMARY KEY NOT NULL,
    modules_completed    INTEGER NOT NULL DEFAULT 0,
    exercises_solved     INTEGER NOT NULL DEFAULT 0,
    perfect_scores       INTEGER NOT NULL DEFAULT 0,
    average_review_score REAL NOT NULL DEFAULT 0,
    consecutive_days     INTEGER NOT NULL DEFAULT 0,
    total_hours          REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_archetypes (
    user_id   TEXT PRIMARY KEY NOT NULL,
    archetype TEXT NOT NULL
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
