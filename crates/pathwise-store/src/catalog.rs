//! Read access to the catalog mirror (courses, enrollments, learner stats,
//! archetypes).
//!
//! The `put_*` helpers are the ingestion side used by the course and identity
//! domains when they sync into this database.  The discovery engine never
//! calls them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use pathwise_shared::{CourseId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Course, Enrollment, LearnerStats};
use crate::sql::{course_at, ts, ts_at, user_at};

impl Database {
    // ------------------------------------------------------------------
    // Courses
    // ------------------------------------------------------------------

    pub fn list_courses(&self) -> Result<Vec<Course>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, title, category FROM courses ORDER BY title ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((course_at(row, 0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;

        let mut courses = Vec::new();
        for row in rows {
            let (id, title, category) = row?;
            courses.push(Course {
                id,
                title,
                category,
                skills: self.course_skills(id)?,
            });
        }
        Ok(courses)
    }

    pub fn course_skills(&self, id: CourseId) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT skill FROM course_skills WHERE course_id = ?1 ORDER BY skill ASC")?;
        let rows = stmt.query_map(params![id.to_string()], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn courses_with_skill(&self, skill: &str) -> Result<Vec<CourseId>> {
        let mut stmt = self.conn().prepare(
            "SELECT cs.course_id FROM course_skills cs
             JOIN courses c ON c.id = cs.course_id
             WHERE cs.skill = ?1
             ORDER BY c.title ASC",
        )?;
        let rows = stmt.query_map(params![skill], |row| course_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Enrollments
    // ------------------------------------------------------------------

    pub fn completed_course_ids(&self, user: UserId) -> Result<HashSet<CourseId>> {
        self.course_id_set(
            "SELECT course_id FROM enrollments WHERE user_id = ?1 AND completed_at IS NOT NULL",
            &user.to_string(),
        )
    }

    /// Every course the user has enrolled in, finished or not.
    pub fn started_course_ids(&self, user: UserId) -> Result<HashSet<CourseId>> {
        self.course_id_set(
            "SELECT course_id FROM enrollments WHERE user_id = ?1",
            &user.to_string(),
        )
    }

    pub fn learners_who_completed(&self, course: CourseId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM enrollments
             WHERE course_id = ?1 AND completed_at IS NOT NULL
             ORDER BY completed_at ASC",
        )?;
        let rows = stmt.query_map(params![course.to_string()], |row| user_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Enrollment start times for `course` strictly after `since`.
    pub fn enrollment_timestamps(
        &self,
        course: CourseId,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let mut stmt = self.conn().prepare(
            "SELECT started_at FROM enrollments
             WHERE course_id = ?1 AND started_at > ?2
             ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map(params![course.to_string(), ts(&since)], |row| ts_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Learner stats / identity
    // ------------------------------------------------------------------

    pub fn learner_stats(&self, user: UserId) -> Result<Option<LearnerStats>> {
        let stats = self
            .conn()
            .query_row(
                "SELECT user_id, modules_completed, exercises_solved, perfect_scores,
                        average_review_score, consecutive_days, total_hours
                 FROM learner_stats WHERE user_id = ?1",
                params![user.to_string()],
                |row| {
                    Ok(LearnerStats {
                        user_id: user_at(row, 0)?,
                        modules_completed: row.get(1)?,
                        exercises_solved: row.get(2)?,
                        perfect_scores: row.get(3)?,
                        average_review_score: row.get(4)?,
                        consecutive_days: row.get(5)?,
                        total_hours: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }

    pub fn archetype(&self, user: UserId) -> Result<Option<String>> {
        let archetype = self
            .conn()
            .query_row(
                "SELECT archetype FROM user_archetypes WHERE user_id = ?1",
                params![user.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(archetype)
    }

    // ------------------------------------------------------------------
    // Mirror ingestion
    // ------------------------------------------------------------------

    pub fn put_course(&self, course: &Course) -> Result<()> {
        self.conn().execute(
            "INSERT INTO courses (id, title, category) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, category = excluded.category",
            params![course.id.to_string(), course.title, course.category],
        )?;
        self.conn().execute(
            "DELETE FROM course_skills WHERE course_id = ?1",
            params![course.id.to_string()],
        )?;
        for skill in &course.skills {
            self.conn().execute(
                "INSERT OR IGNORE INTO course_skills (course_id, skill) VALUES (?1, ?2)",
                params![course.id.to_string(), skill],
            )?;
        }
        Ok(())
    }

    pub fn put_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO enrollments (user_id, course_id, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, course_id) DO UPDATE SET
                started_at = excluded.started_at,
                completed_at = excluded.completed_at",
            params![
                enrollment.user_id.to_string(),
                enrollment.course_id.to_string(),
                ts(&enrollment.started_at),
                enrollment.completed_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    pub fn put_learner_stats(&self, stats: &LearnerStats) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO learner_stats
                (user_id, modules_completed, exercises_solved, perfect_scores,
                 average_review_score, consecutive_days, total_hours)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stats.user_id.to_string(),
                stats.modules_completed,
                stats.exercises_solved,
                stats.perfect_scores,
                stats.average_review_score,
                stats.consecutive_days,
                stats.total_hours,
            ],
        )?;
        Ok(())
    }

    pub fn put_archetype(&self, user: UserId, archetype: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO user_archetypes (user_id, archetype) VALUES (?1, ?2)",
            params![user.to_string(), archetype],
        )?;
        Ok(())
    }

    fn course_id_set(&self, sql: &str, key: &str) -> Result<HashSet<CourseId>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| course_at(row, 0))?;
        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}
