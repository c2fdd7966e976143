//! SQLite 存储
//!
//! 同一个连接同时承载 `syllabi` 与 `topic_stats` 两张表。
//! 生命周期：`open` / `in_memory` → 通过 `Arc` 共享给各组件 → `close`

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppResult, StoreError};
use crate::infrastructure::store::{StatsStore, SyllabusStore};
use crate::models::{SyllabusDocument, TopicStat, TopicStatKey};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS syllabi (
        course_code        TEXT PRIMARY KEY,
        extracted_syllabus TEXT NOT NULL,
        updated_at         TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS topic_stats (
        course_code   TEXT NOT NULL,
        exam_type     TEXT NOT NULL,
        module_number TEXT NOT NULL,
        topic         TEXT NOT NULL,
        count         INTEGER NOT NULL,
        PRIMARY KEY (course_code, exam_type, module_number, topic)
    );
    CREATE INDEX IF NOT EXISTS idx_topic_stats_course ON topic_stats(course_code, exam_type);
";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;
        info!("SQLite 存储已打开: {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 显式关闭连接
    pub fn close(self) -> AppResult<()> {
        self.conn
            .into_inner()
            .close()
            .map_err(|(_, e)| StoreError::Sqlite(e))?;
        info!("SQLite 存储已关闭");
        Ok(())
    }
}

#[async_trait]
impl SyllabusStore for SqliteStore {
    async fn find_by_course_code(&self, course_code: &str) -> AppResult<Option<SyllabusDocument>> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT extracted_syllabus FROM syllabi WHERE course_code = ?1",
                params![course_code],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let syllabus = serde_json::from_str(&json).map_err(StoreError::Json)?;
                Ok(Some(syllabus))
            }
            None => Ok(None),
        }
    }

    async fn replace(&self, syllabus: &SyllabusDocument) -> AppResult<()> {
        let json = serde_json::to_string(syllabus).map_err(StoreError::Json)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO syllabi (course_code, extracted_syllabus, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(course_code) DO UPDATE SET
                 extracted_syllabus = excluded.extracted_syllabus,
                 updated_at = excluded.updated_at",
            params![
                syllabus.course_code,
                json,
                chrono::Local::now().to_rfc3339()
            ],
        )?;
        debug!("大纲已写入: {}", syllabus.course_code);
        Ok(())
    }
}

#[async_trait]
impl StatsStore for SqliteStore {
    async fn increment_count(&self, key: &TopicStatKey, delta: u64) -> AppResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO topic_stats (course_code, exam_type, module_number, topic, count)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(course_code, exam_type, module_number, topic) DO UPDATE SET
                 count = count + excluded.count",
            params![
                key.course_code,
                key.exam_type,
                key.module_number,
                key.topic,
                i64::try_from(delta).unwrap_or(i64::MAX)
            ],
        )?;
        Ok(())
    }

    async fn get_count(&self, key: &TopicStatKey) -> AppResult<u64> {
        let conn = self.conn.lock().await;
        let count: Option<i64> = conn
            .query_row(
                "SELECT count FROM topic_stats
                 WHERE course_code = ?1 AND exam_type = ?2 AND module_number = ?3 AND topic = ?4",
                params![key.course_code, key.exam_type, key.module_number, key.topic],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    async fn list_stats(
        &self,
        course_code: &str,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<TopicStat>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT course_code, exam_type, module_number, topic, count FROM topic_stats
             WHERE course_code = ?1 AND (?2 IS NULL OR exam_type = ?2)
             ORDER BY exam_type, module_number, count DESC, topic",
        )?;
        let rows = stmt.query_map(params![course_code, exam_type], |row| {
            Ok(TopicStat {
                key: TopicStatKey {
                    course_code: row.get(0)?,
                    exam_type: row.get(1)?,
                    module_number: row.get(2)?,
                    topic: row.get(3)?,
                },
                count: row.get::<_, i64>(4)?.max(0) as u64,
            })
        })?;

        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Module;

    fn key(topic: &str) -> TopicStatKey {
        TopicStatKey::new("BITE301L", "CAT1", "2", topic)
    }

    #[tokio::test]
    async fn test_increment_creates_then_adds() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get_count(&key("Recursion")).await.unwrap(), 0);

        store.increment_count(&key("Recursion"), 2).await.unwrap();
        store.increment_count(&key("Recursion"), 2).await.unwrap();

        assert_eq!(store.get_count(&key("Recursion")).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_keys_differing_in_one_field_are_independent() {
        let store = SqliteStore::in_memory().unwrap();
        store.increment_count(&key("Recursion"), 1).await.unwrap();
        store
            .increment_count(&TopicStatKey::new("BITE301L", "FAT", "2", "Recursion"), 5)
            .await
            .unwrap();

        assert_eq!(store.get_count(&key("Recursion")).await.unwrap(), 1);
        let cat1 = store.list_stats("BITE301L", Some("CAT1")).await.unwrap();
        assert_eq!(cat1.len(), 1);
        let all = store.list_stats("BITE301L", None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_not_lost() {
        let store = std::sync::Arc::new(SqliteStore::in_memory().unwrap());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_count(&key("Stacks"), 3).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get_count(&key("Stacks")).await.unwrap(), 60);
    }

    #[tokio::test]
    async fn test_large_counts_stay_readable() {
        let store = SqliteStore::in_memory().unwrap();
        for _ in 0..3 {
            store
                .increment_count(&key("Heaps"), crate::models::topic::MAX_OCCURRENCES)
                .await
                .unwrap();
        }

        let expected = 3 * crate::models::topic::MAX_OCCURRENCES;
        assert_eq!(store.get_count(&key("Heaps")).await.unwrap(), expected);
        let stats = store.list_stats("BITE301L", None).await.unwrap();
        assert_eq!(stats[0].count, expected);
    }

    #[tokio::test]
    async fn test_syllabus_replace_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.find_by_course_code("BITE301L").await.unwrap().is_none());

        let first = SyllabusDocument::new("BITE301L", vec![Module::new("1", vec!["Arrays"])]);
        store.replace(&first).await.unwrap();
        let second =
            SyllabusDocument::new("BITE301L", vec![Module::new("1", vec!["Linked Lists"])]);
        store.replace(&second).await.unwrap();

        let loaded = store.find_by_course_code("BITE301L").await.unwrap().unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn test_open_and_close_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("stats.db")).unwrap();
        store.close().unwrap();
    }
}
