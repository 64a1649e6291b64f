//! Assessments store.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::MutexGuard;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Pending,
    Completed,
}

impl AssessmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AssessmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(AssessmentStatus::Pending),
            "completed" => Ok(AssessmentStatus::Completed),
            _ => Err(format!("Unknown assessment status: {}", s)),
        }
    }
}

/// Data provided when an assessment is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssessment {
    pub age: u8,
    pub gender: String,
    pub profession: String,
    pub track: String,
    pub scenario: String,
    pub questions: Vec<String>,
}

/// Data stored when an assessment is scored.
#[derive(Debug, Clone, Copy)]
pub struct Completion<'a> {
    pub responses: &'a [String],
    pub report: &'a serde_json::Value,
    pub overall_score: f64,
    pub eq_level: &'a str,
}

/// A fully loaded assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: String,
    pub age: u8,
    pub gender: String,
    pub profession: String,
    pub track: String,
    pub scenario: String,
    pub questions: Vec<String>,
    pub responses: Option<Vec<String>>,
    pub report: Option<serde_json::Value>,
    pub overall_score: Option<f64>,
    pub eq_level: Option<String>,
    pub status: AssessmentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Summary for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: String,
    pub age: u8,
    pub gender: String,
    pub profession: String,
    pub track: String,
    pub status: AssessmentStatus,
    pub overall_score: Option<f64>,
    pub eq_level: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Filter parameters for listing assessments.
#[derive(Debug, Default, Clone)]
pub struct AssessmentFilter {
    pub status: Option<AssessmentStatus>,
    pub eq_level: Option<String>,
    pub track: Option<String>,
    /// Substring match on profession
    pub search: Option<String>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AssessmentFilter {
    /// First instant of `date` in UTC.
    pub fn day_start(date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_opt(0, 0, 0).map(|t| Utc.from_utc_datetime(&t))
    }

    /// Last instant of `date` in UTC at the microsecond precision timestamps
    /// are stored with.
    pub fn day_end(date: NaiveDate) -> Option<DateTime<Utc>> {
        date.and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|t| Utc.from_utc_datetime(&t))
    }
}

/// Aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub completion_rate: f64,
    pub avg_overall_score: Option<f64>,
    pub by_level: Vec<LevelCount>,
    pub by_track: Vec<TrackStats>,
    pub over_time: Vec<DayCount>,
}

/// Completed assessments for one EQ level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelCount {
    pub eq_level: String,
    pub count: usize,
}

/// Per-track statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStats {
    pub track: String,
    pub total: usize,
    pub completed: usize,
    pub avg_overall_score: Option<f64>,
}

/// Assessments started on a single day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayCount {
    pub date: String,
    pub count: usize,
}

const SUMMARY_COLUMNS: &str =
    "id, age, gender, profession, track, status, overall_score, eq_level, created_at, completed_at";

const RECORD_COLUMNS: &str = "id, age, gender, profession, track, scenario, questions, responses, \
     report, overall_score, eq_level, status, created_at, completed_at";

/// Assessments store with a borrowed connection.
pub struct Assessments<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Assessments<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Store a pending assessment and return its id.
    pub fn create(&self, new: &NewAssessment) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            r#"
            INSERT INTO assessments (id, age, gender, profession, track, scenario, questions, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)
            "#,
            params![
                id,
                new.age,
                new.gender,
                new.profession,
                new.track,
                new.scenario,
                serde_json::to_string(&new.questions)?,
                timestamp(Utc::now()),
            ],
        )?;

        Ok(id)
    }

    /// Record answers and the scored report.
    ///
    /// Returns `false` when the assessment does not exist or was already
    /// completed.
    pub fn complete(&self, id: &str, completion: Completion<'_>) -> Result<bool> {
        let rows = self.conn.execute(
            r#"
            UPDATE assessments SET
                responses = ?2,
                report = ?3,
                overall_score = ?4,
                eq_level = ?5,
                status = 'completed',
                completed_at = ?6
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![
                id,
                serde_json::to_string(completion.responses)?,
                serde_json::to_string(completion.report)?,
                completion.overall_score,
                completion.eq_level,
                timestamp(Utc::now()),
            ],
        )?;

        Ok(rows > 0)
    }

    /// Get an assessment by ID.
    pub fn get(&self, id: &str) -> Result<Option<AssessmentRecord>> {
        let sql = format!("SELECT {} FROM assessments WHERE id = ?1", RECORD_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], RawRecord::from_row)
            .optional()?;

        raw.map(RawRecord::into_record).transpose()
    }

    /// List assessments, newest first.
    pub fn list(&self, filter: &AssessmentFilter) -> Result<Vec<AssessmentSummary>> {
        let mut sql = format!("SELECT {} FROM assessments WHERE 1=1", SUMMARY_COLUMNS);
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            param_values.push(Box::new(status.as_str()));
        }

        if let Some(ref eq_level) = filter.eq_level {
            sql.push_str(" AND eq_level = ?");
            param_values.push(Box::new(eq_level.clone()));
        }

        if let Some(ref track) = filter.track {
            sql.push_str(" AND track = ?");
            param_values.push(Box::new(track.clone()));
        }

        if let Some(ref search) = filter.search {
            sql.push_str(" AND profession LIKE ?");
            param_values.push(Box::new(format!("%{}%", search)));
        }

        if let Some(after) = filter.after {
            sql.push_str(" AND created_at >= ?");
            param_values.push(Box::new(timestamp(after)));
        }

        if let Some(before) = filter.before {
            sql.push_str(" AND created_at <= ?");
            param_values.push(Box::new(timestamp(before)));
        }

        sql.push_str(" ORDER BY created_at DESC");

        match (filter.limit, filter.offset) {
            (Some(limit), offset) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset.unwrap_or(0)));
            }
            (None, Some(offset)) => {
                sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset));
            }
            (None, None) => {}
        }

        let params: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), Self::row_to_summary)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }

        Ok(summaries)
    }

    /// Delete an assessment by ID.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM assessments WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    /// Compute aggregate statistics over assessments matching the filter.
    ///
    /// Paging fields of the filter are ignored.
    pub fn stats(&self, filter: &AssessmentFilter) -> Result<AssessmentStats> {
        let summaries = self.list(&AssessmentFilter {
            limit: None,
            offset: None,
            ..filter.clone()
        })?;
        let total = summaries.len();

        if total == 0 {
            return Ok(AssessmentStats {
                total: 0,
                completed: 0,
                pending: 0,
                completion_rate: 0.0,
                avg_overall_score: None,
                by_level: Vec::new(),
                by_track: Vec::new(),
                over_time: Vec::new(),
            });
        }

        let scores: Vec<f64> = summaries.iter().filter_map(|s| s.overall_score).collect();
        let completed = summaries
            .iter()
            .filter(|s| s.status == AssessmentStatus::Completed)
            .count();

        Ok(AssessmentStats {
            total,
            completed,
            pending: total - completed,
            completion_rate: completed as f64 / total as f64,
            avg_overall_score: mean(&scores),
            by_level: Self::compute_by_level(&summaries),
            by_track: Self::compute_by_track(&summaries),
            over_time: Self::compute_over_time(&summaries),
        })
    }

    fn compute_by_level(summaries: &[AssessmentSummary]) -> Vec<LevelCount> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for level in summaries.iter().filter_map(|s| s.eq_level.as_ref()) {
            *counts.entry(level.clone()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(eq_level, count)| LevelCount { eq_level, count })
            .collect()
    }

    fn compute_by_track(summaries: &[AssessmentSummary]) -> Vec<TrackStats> {
        let mut track_map: HashMap<&str, (usize, Vec<f64>)> = HashMap::new();
        for s in summaries {
            let entry = track_map.entry(s.track.as_str()).or_default();
            entry.0 += 1;
            if let Some(score) = s.overall_score {
                entry.1.push(score);
            }
        }

        let mut by_track: Vec<TrackStats> = track_map
            .into_iter()
            .map(|(track, (total, scores))| TrackStats {
                track: track.to_string(),
                total,
                completed: scores.len(),
                avg_overall_score: mean(&scores),
            })
            .collect();
        by_track.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.track.cmp(&b.track)));
        by_track
    }

    fn compute_over_time(summaries: &[AssessmentSummary]) -> Vec<DayCount> {
        let mut day_counts: BTreeMap<String, usize> = BTreeMap::new();
        for s in summaries {
            let date = s.created_at.format("%Y-%m-%d").to_string();
            *day_counts.entry(date).or_insert(0) += 1;
        }
        day_counts
            .into_iter()
            .map(|(date, count)| DayCount { date, count })
            .collect()
    }

    fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<AssessmentSummary> {
        let status: String = row.get(5)?;
        let created_at: String = row.get(8)?;
        let completed_at: Option<String> = row.get(9)?;

        Ok(AssessmentSummary {
            id: row.get(0)?,
            age: row.get(1)?,
            gender: row.get(2)?,
            profession: row.get(3)?,
            track: row.get(4)?,
            status: parse_status(&status),
            overall_score: row.get(6)?,
            eq_level: row.get(7)?,
            created_at: parse_timestamp(&created_at),
            completed_at: completed_at.as_deref().map(parse_timestamp),
        })
    }
}

/// Row as stored, before JSON columns are decoded.
struct RawRecord {
    id: String,
    age: u8,
    gender: String,
    profession: String,
    track: String,
    scenario: String,
    questions: String,
    responses: Option<String>,
    report: Option<String>,
    overall_score: Option<f64>,
    eq_level: Option<String>,
    status: String,
    created_at: String,
    completed_at: Option<String>,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            age: row.get(1)?,
            gender: row.get(2)?,
            profession: row.get(3)?,
            track: row.get(4)?,
            scenario: row.get(5)?,
            questions: row.get(6)?,
            responses: row.get(7)?,
            report: row.get(8)?,
            overall_score: row.get(9)?,
            eq_level: row.get(10)?,
            status: row.get(11)?,
            created_at: row.get(12)?,
            completed_at: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<AssessmentRecord> {
        Ok(AssessmentRecord {
            id: self.id,
            age: self.age,
            gender: self.gender,
            profession: self.profession,
            track: self.track,
            scenario: self.scenario,
            questions: serde_json::from_str(&self.questions)?,
            responses: self
                .responses
                .as_deref()
                .map(|s| serde_json::from_str(s))
                .transpose()?,
            report: self
                .report
                .as_deref()
                .map(|s| serde_json::from_str(s))
                .transpose()?,
            overall_score: self.overall_score,
            eq_level: self.eq_level,
            status: parse_status(&self.status),
            created_at: parse_timestamp(&self.created_at),
            completed_at: self.completed_at.as_deref().map(parse_timestamp),
        })
    }
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_status(s: &str) -> AssessmentStatus {
    s.parse().unwrap_or(AssessmentStatus::Pending)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn new_assessment(profession: &str, track: &str) -> NewAssessment {
        NewAssessment {
            age: 35,
            gender: "female".to_string(),
            profession: profession.to_string(),
            track: track.to_string(),
            scenario: "A tense meeting.".to_string(),
            questions: vec!["How would you feel?".to_string()],
        }
    }

    fn complete(db: &Database, id: &str, score: f64, level: &str) -> bool {
        let report = serde_json::json!({ "overall_score": score });
        db.assessments()
            .complete(
                id,
                Completion {
                    responses: &["I would stay calm.".to_string()],
                    report: &report,
                    overall_score: score,
                    eq_level: level,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_create_and_get_pending() {
        let db = db();
        let id = db.assessments().create(&new_assessment("Teacher", "education")).unwrap();

        let record = db.assessments().get(&id).unwrap().unwrap();
        assert_eq!(record.status, AssessmentStatus::Pending);
        assert_eq!(record.profession, "Teacher");
        assert_eq!(record.questions, vec!["How would you feel?"]);
        assert!(record.responses.is_none());
        assert!(record.report.is_none());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_complete_only_once() {
        let db = db();
        let id = db.assessments().create(&new_assessment("Nurse", "healthcare")).unwrap();

        assert!(complete(&db, &id, 62.5, "Average EQ"));
        assert!(!complete(&db, &id, 80.0, "High EQ"));
        assert!(!complete(&db, "missing", 80.0, "High EQ"));

        let record = db.assessments().get(&id).unwrap().unwrap();
        assert_eq!(record.status, AssessmentStatus::Completed);
        assert_eq!(record.overall_score, Some(62.5));
        assert_eq!(record.eq_level.as_deref(), Some("Average EQ"));
        assert_eq!(record.report.unwrap()["overall_score"], 62.5);
        assert_eq!(record.responses.unwrap().len(), 1);
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_list_filters() {
        let db = db();
        let a = db.assessments().create(&new_assessment("Teacher", "education")).unwrap();
        let _b = db.assessments().create(&new_assessment("Nurse", "healthcare")).unwrap();
        complete(&db, &a, 75.0, "High EQ");

        let all = db.assessments().list(&AssessmentFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        let completed = db
            .assessments()
            .list(&AssessmentFilter {
                status: Some(AssessmentStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, a);

        let searched = db
            .assessments()
            .list(&AssessmentFilter {
                search: Some("nur".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].track, "healthcare");

        let high = db
            .assessments()
            .list(&AssessmentFilter {
                eq_level: Some("High EQ".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(high.len(), 1);

        let paged = db
            .assessments()
            .list(&AssessmentFilter {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(paged.len(), 1);
    }

    #[test]
    fn test_list_date_range() {
        let db = db();
        db.assessments().create(&new_assessment("Teacher", "education")).unwrap();

        let future = Utc::now() + chrono::Duration::hours(1);
        let none = db
            .assessments()
            .list(&AssessmentFilter {
                after: Some(future),
                ..Default::default()
            })
            .unwrap();
        assert!(none.is_empty());

        let all = db
            .assessments()
            .list(&AssessmentFilter {
                before: Some(future),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_before_day_end_includes_last_second() {
        let db = db();
        let id = db.assessments().create(&new_assessment("Nurse", "healthcare")).unwrap();
        db.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE assessments SET created_at = '2024-03-02T23:59:59.500000Z' WHERE id = ?1",
                params![id],
            )
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let on_day = db
            .assessments()
            .list(&AssessmentFilter {
                after: AssessmentFilter::day_start(day),
                before: AssessmentFilter::day_end(day),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(on_day.len(), 1);

        let day_before = db
            .assessments()
            .list(&AssessmentFilter {
                before: AssessmentFilter::day_end(day.pred_opt().unwrap()),
                ..Default::default()
            })
            .unwrap();
        assert!(day_before.is_empty());
    }

    #[test]
    fn test_delete() {
        let db = db();
        let id = db.assessments().create(&new_assessment("Teacher", "education")).unwrap();

        assert!(db.assessments().delete(&id).unwrap());
        assert!(db.assessments().get(&id).unwrap().is_none());
        assert!(!db.assessments().delete(&id).unwrap());
    }

    #[test]
    fn test_stats() {
        let db = db();
        let a = db.assessments().create(&new_assessment("Teacher", "education")).unwrap();
        let b = db.assessments().create(&new_assessment("Lecturer", "education")).unwrap();
        db.assessments().create(&new_assessment("Nurse", "healthcare")).unwrap();
        complete(&db, &a, 80.0, "High EQ");
        complete(&db, &b, 50.0, "Average EQ");

        let stats = db.assessments().stats(&AssessmentFilter::default()).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.pending, 1);
        assert!((stats.completion_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.avg_overall_score, Some(65.0));
        assert_eq!(stats.by_level.len(), 2);

        assert_eq!(stats.by_track[0].track, "education");
        assert_eq!(stats.by_track[0].total, 2);
        assert_eq!(stats.by_track[0].avg_overall_score, Some(65.0));
        assert_eq!(stats.by_track[1].avg_overall_score, None);

        assert_eq!(stats.over_time.len(), 1);
        assert_eq!(stats.over_time[0].count, 3);
    }

    #[test]
    fn test_stats_empty() {
        let db = db();
        let stats = db.assessments().stats(&AssessmentFilter::default()).unwrap();
        assert_eq!(stats.total, 0);
        assert!(stats.avg_overall_score.is_none());
    }
}
