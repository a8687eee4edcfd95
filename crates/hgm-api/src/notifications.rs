//! Local activity log: "household registered" and "photo uploaded" events
//! synthesized on this device, kept for 24 hours.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{Entries, KvStore, LATEST_FAMILY_KEY, NOTIFICATIONS_KEY};

pub const RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FamilyRegistered,
    PhotoUploaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    fn new(kind: NotificationKind, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message,
            timestamp: now,
            kind,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp > Duration::hours(RETENTION_HOURS)
    }
}

/// Sole owner of the notification list and the latest-household marker.
/// Each operation runs under the store lock.
pub struct NotificationLog {
    store: KvStore,
}

impl NotificationLog {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Entries younger than 24 hours, newest first. Expired entries are
    /// removed from storage.
    pub fn load(&self, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        self.store.transaction(|entries| {
            let mut list = read_list(entries);
            let before = list.len();
            list.retain(|n| !n.is_expired(now));
            if list.len() != before {
                log::debug!("Pruned {} expired notifications", before - list.len());
                write_list(entries, &list)?;
            }
            Ok(list)
        })
    }

    /// Compare `latest` against the stored marker. A change from a known
    /// previous name records a registration; the marker always advances.
    pub fn observe_latest_family(
        &self,
        latest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>> {
        if latest.is_empty() {
            return Ok(None);
        }
        self.store.transaction(|entries| {
            let previous = entries.insert(LATEST_FAMILY_KEY.to_string(), latest.to_string());
            match previous {
                Some(previous) if !previous.is_empty() && previous != latest => {
                    let notification = Notification::new(
                        NotificationKind::FamilyRegistered,
                        format!("New household registered: {latest}"),
                        now,
                    );
                    push(entries, notification.clone(), now)?;
                    Ok(Some(notification))
                }
                _ => Ok(None),
            }
        })
    }

    pub fn record_photo_upload(&self, name: &str, now: DateTime<Utc>) -> Result<Notification> {
        let notification = Notification::new(
            NotificationKind::PhotoUploaded,
            format!("Plant photo uploaded for {name}"),
            now,
        );
        self.store.transaction(|entries| push(entries, notification.clone(), now))?;
        Ok(notification)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(NOTIFICATIONS_KEY)
    }
}

fn read_list(entries: &Entries) -> Vec<Notification> {
    let Some(raw) = entries.get(NOTIFICATIONS_KEY) else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        log::warn!("Discarding unreadable notification list: {e}");
        Vec::new()
    })
}

fn write_list(entries: &mut Entries, list: &[Notification]) -> Result<()> {
    entries.insert(NOTIFICATIONS_KEY.to_string(), serde_json::to_string(list)?);
    Ok(())
}

fn push(entries: &mut Entries, notification: Notification, now: DateTime<Utc>) -> Result<()> {
    let mut list = read_list(entries);
    list.retain(|n| !n.is_expired(now));
    list.insert(0, notification);
    write_list(entries, &list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in(dir: &tempfile::TempDir) -> NotificationLog {
        NotificationLog::new(KvStore::open(dir.path()).unwrap())
    }

    fn stored(id: &str, age: Duration, now: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            message: format!("event {id}"),
            timestamp: now - age,
            kind: NotificationKind::PhotoUploaded,
        }
    }

    #[test]
    fn test_load_prunes_entries_older_than_a_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let now = Utc::now();
        store
            .set_json(
                NOTIFICATIONS_KEY,
                &vec![
                    stored("recent", Duration::hours(1), now),
                    stored("old", Duration::hours(25), now),
                ],
            )
            .unwrap();

        let log = log_in(&dir);
        let loaded = log.load(now).unwrap();
        let ids: Vec<_> = loaded.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["recent"]);

        // pruning is persisted
        let raw: Vec<Notification> = store.get_json(NOTIFICATIONS_KEY).unwrap().unwrap();
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_first_observation_only_sets_marker() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        let now = Utc::now();

        assert_eq!(log.observe_latest_family("Aarav", now).unwrap(), None);
        assert_eq!(log.observe_latest_family("Aarav", now).unwrap(), None);
        assert!(log.load(now).unwrap().is_empty());

        let created = log.observe_latest_family("Diya", now).unwrap().unwrap();
        assert_eq!(created.kind, NotificationKind::FamilyRegistered);
        assert_eq!(created.message, "New household registered: Diya");
        assert_eq!(log.load(now).unwrap(), vec![created]);
    }

    #[test]
    fn test_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let log = log_in(&dir);
        let now = Utc::now();

        log.record_photo_upload("Aarav", now - Duration::minutes(5)).unwrap();
        log.record_photo_upload("Diya", now).unwrap();

        let messages: Vec<_> = log
            .load(now)
            .unwrap()
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(
            messages,
            vec!["Plant photo uploaded for Diya", "Plant photo uploaded for Aarav"]
        );
    }

    #[test]
    fn test_serialized_shape() {
        let now = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let n = stored("n1", Duration::zero(), now);
        insta::assert_snapshot!(serde_json::to_string(&n).unwrap(), @r#"{"id":"n1","message":"event n1","timestamp":"2024-03-01T10:00:00Z","type":"photo_uploaded"}"#);
    }
}
