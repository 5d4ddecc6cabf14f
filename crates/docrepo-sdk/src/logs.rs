use serde_json::Value;
use tracing::trace;

use docrepo_store::{Document, Filter, FindOptions, Sort, WriteConcern};
use docrepo_types::{LogEntry, LogLevel, LEVEL_FIELD};

use crate::db::{DocumentDb, LOG_COLLECTION};
use crate::error::{DbError, DbResult};

/// Page of the log collection to read, most recent entries first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogQuery {
    /// Page size.
    pub count: u64,
    /// 1-based page number.
    pub page: u64,
    /// Only entries at this level or above.
    pub level: Option<LogLevel>,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            count: 100,
            page: 1,
            level: None,
        }
    }
}

impl LogQuery {
    pub fn paged(count: u64, page: u64) -> Self {
        Self {
            count,
            page,
            level: None,
        }
    }

    pub fn at_least(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    fn find_options(&self) -> DbResult<FindOptions> {
        if self.count == 0 {
            return Err(DbError::InvalidArgument("log page size must be at least 1".into()));
        }
        if self.page == 0 {
            return Err(DbError::InvalidArgument("log pages are numbered from 1".into()));
        }
        Ok(FindOptions::default()
            .sorted(Sort::NaturalDescending)
            .skip((self.page - 1).saturating_mul(self.count))
            .limit(self.count))
    }

    fn filter(&self) -> Filter {
        match self.level {
            Some(level) => Filter::gte(LEVEL_FIELD, level.rank()),
            None => Filter::All,
        }
    }
}

fn log_document(entry: &LogEntry) -> DbResult<Document> {
    match serde_json::to_value(entry)? {
        Value::Object(doc) => Ok(doc),
        other => Err(DbError::Serialization(format!("log entry serialized to {other}"))),
    }
}

impl DocumentDb {
    /// Append one entry under a fresh ObjectId.
    pub async fn write_log(&self, mut entry: LogEntry) -> DbResult<LogEntry> {
        let store = self.store().await?;
        entry.id = store.new_object_id().to_hex();
        store
            .insert_one(LOG_COLLECTION, log_document(&entry)?, WriteConcern::Acknowledged)
            .await?;
        trace!(id = %entry.id, level = %entry.level, "log entry written");
        Ok(entry)
    }

    /// Append entries as one batch, each under a fresh ObjectId.
    pub async fn write_logs(&self, mut entries: Vec<LogEntry>) -> DbResult<Vec<LogEntry>> {
        let store = self.store().await?;
        let mut docs = Vec::with_capacity(entries.len());
        for entry in &mut entries {
            entry.id = store.new_object_id().to_hex();
            docs.push(log_document(entry)?);
        }
        store
            .insert_many(LOG_COLLECTION, docs, WriteConcern::Acknowledged)
            .await?;
        trace!(count = entries.len(), "log entries written");
        Ok(entries)
    }

    /// One page of log entries, newest first.
    pub async fn get_logs(&self, query: LogQuery) -> DbResult<Vec<LogEntry>> {
        let options = query.find_options()?;
        let store = self.store().await?;
        store
            .find(LOG_COLLECTION, &query.filter(), options)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(Value::Object(doc)).map_err(DbError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use docrepo_store::InMemoryClient;
    use serde_json::json;
    use std::sync::Arc;

    fn facade() -> DocumentDb {
        DocumentDb::new(Arc::new(InMemoryClient::new()))
    }

    async fn seeded(db: &DocumentDb) -> Vec<LogEntry> {
        let levels = [
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Error,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ];
        let entries = levels
            .iter()
            .enumerate()
            .map(|(i, &level)| LogEntry::new(level, format!("entry {i}")))
            .collect();
        db.write_logs(entries).await.unwrap()
    }

    fn messages(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().filter_map(|e| e.message.as_deref()).collect()
    }

    #[tokio::test]
    async fn write_log_assigns_object_id() {
        let db = facade();
        let entry = db
            .write_log(
                LogEntry::new(LogLevel::Warning, "disk almost full")
                    .with_source("monitor")
                    .with_parameters(json!({ "free": 12 })),
            )
            .await
            .unwrap();
        assert_eq!(entry.id.len(), 24);
        let logs = db.get_logs(LogQuery::default()).await.unwrap();
        assert_eq!(logs, vec![entry]);
    }

    #[tokio::test]
    async fn write_logs_assigns_distinct_ids() {
        let db = facade();
        let written = seeded(&db).await;
        let mut ids: Vec<&str> = written.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn level_threshold_is_inclusive_newest_first() {
        let db = facade();
        seeded(&db).await;
        let logs = db
            .get_logs(LogQuery::default().at_least(LogLevel::Warning))
            .await
            .unwrap();
        assert_eq!(messages(&logs), vec!["entry 5", "entry 4", "entry 2"]);
    }

    #[tokio::test]
    async fn pages_walk_back_in_time() {
        let db = facade();
        seeded(&db).await;
        let page = db.get_logs(LogQuery::paged(2, 2)).await.unwrap();
        assert_eq!(messages(&page), vec!["entry 3", "entry 2"]);
        let past_end = db.get_logs(LogQuery::paged(2, 4)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn zero_page_or_count_is_rejected() {
        let db = facade();
        assert!(matches!(
            db.get_logs(LogQuery::paged(0, 1)).await,
            Err(DbError::InvalidArgument(_))
        ));
        assert!(matches!(
            db.get_logs(LogQuery::paged(10, 0)).await,
            Err(DbError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn capped_log_drops_oldest() {
        let db = facade();
        db.configure(Some(DbConfig::default().with_log_collection_size(2_000)))
            .await
            .unwrap();
        for i in 0..100 {
            db.write_log(LogEntry::new(LogLevel::Info, format!("entry {i}")))
                .await
                .unwrap();
        }
        let logs = db.get_logs(LogQuery::paged(1_000, 1)).await.unwrap();
        assert!(logs.len() < 100);
        assert_eq!(logs[0].message.as_deref(), Some("entry 99"));
    }
}
