use crate::db::DeviceStorage;
use crate::store::{PendingOp, RemoteStore};
use serde::Serialize;
use serde_json::Value;

pub const QUEUE_KEY_PREFIX: &str = "ctms_write_queue";

pub fn queue_key(uid: &str) -> String {
    format!("{}_{}", QUEUE_KEY_PREFIX, uid)
}

/// The queued write a flush stopped at, with the store's answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedOp {
    pub op: PendingOp,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub applied: usize,
    pub remaining: usize,
    pub blocked: Option<BlockedOp>,
}

/// Durable FIFO of one account's mutations that could not reach the
/// remote store.
pub struct WriteQueue<'a> {
    device: &'a DeviceStorage,
    key: String,
}

impl<'a> WriteQueue<'a> {
    pub fn new(device: &'a DeviceStorage, uid: &str) -> Self {
        Self {
            device,
            key: queue_key(uid),
        }
    }

    pub fn pending(&self) -> Vec<PendingOp> {
        self.device
            .get_json::<Vec<Value>>(&self.key)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<PendingOp>(raw) {
                Ok(op) => Some(op),
                Err(e) => {
                    log::warn!("dropping unreadable queued write: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn enqueue(&self, op: PendingOp) -> anyhow::Result<()> {
        let mut ops = self.pending();
        log::info!("queued {} {} for replay", op.kind(), op.path());
        ops.push(op);
        self.save(&ops)
    }

    fn save(&self, ops: &[PendingOp]) -> anyhow::Result<()> {
        if ops.is_empty() {
            self.device.remove(&self.key)
        } else {
            self.device.set_json(&self.key, &ops)
        }
    }

    /// Replays queued writes in order. Stops at the first write that fails
    /// for any reason; it and everything after it stay queued.
    pub fn flush<R: RemoteStore + ?Sized>(&self, remote: &mut R) -> anyhow::Result<FlushReport> {
        let ops = self.pending();
        let mut report = FlushReport::default();
        if ops.is_empty() {
            return Ok(report);
        }

        let mut remaining = Vec::new();
        let mut iter = ops.into_iter();
        while let Some(op) = iter.next() {
            match remote.apply(&op) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    if e.is_offline() {
                        log::info!("still offline, keeping {} queued writes", iter.len() + 1);
                    } else {
                        log::error!(
                            "store refused queued {} {}, keeping {} queued writes: {}",
                            op.kind(),
                            op.path(),
                            iter.len() + 1,
                            e
                        );
                        report.blocked = Some(BlockedOp {
                            op: op.clone(),
                            error: e.to_string(),
                        });
                    }
                    remaining.push(op);
                    remaining.extend(iter.by_ref());
                    break;
                }
            }
        }

        report.remaining = remaining.len();
        self.save(&remaining)?;
        if report.applied > 0 {
            log::info!(
                "replayed {} queued writes, {} remaining",
                report.applied,
                report.remaining
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteRemote;
    use serde_json::{json, Map};

    fn remote_for(uid: &str) -> SqliteRemote {
        let mut remote = SqliteRemote::in_memory();
        remote.set_auth(Some(uid.to_string()));
        remote
    }

    #[test]
    fn corrupt_queue_reads_as_empty() {
        let device = DeviceStorage::in_memory();
        device.set(&queue_key("u1"), "not-json").unwrap();
        assert!(WriteQueue::new(&device, "u1").pending().is_empty());
    }

    #[test]
    fn flush_replays_in_order_and_consumes() {
        let device = DeviceStorage::in_memory();
        let queue = WriteQueue::new(&device, "u1");
        let mut remote = remote_for("u1");

        queue
            .enqueue(PendingOp::Set {
                path: "users/u1/fees/f1".to_string(),
                value: json!({ "paidAmount": 0, "totalAmount": 100 }),
            })
            .unwrap();
        let mut first = Map::new();
        first.insert("paidAmount".to_string(), json!(40));
        queue
            .enqueue(PendingOp::Update {
                path: "users/u1/fees/f1".to_string(),
                values: first,
            })
            .unwrap();
        let mut second = Map::new();
        second.insert("paidAmount".to_string(), json!(100));
        queue
            .enqueue(PendingOp::Update {
                path: "users/u1/fees/f1".to_string(),
                values: second,
            })
            .unwrap();
        assert_eq!(queue.len(), 3);

        let report = queue.flush(&mut remote).unwrap();
        assert_eq!(report.applied, 3);
        assert_eq!(report.remaining, 0);
        assert_eq!(
            remote.get("users/u1/fees/f1/paidAmount").unwrap(),
            Some(json!(100))
        );

        // Consume-once: a second flush has nothing to replay.
        remote.set("users/u1/fees/f1/paidAmount", &json!(7)).unwrap();
        let again = queue.flush(&mut remote).unwrap();
        assert_eq!(again.applied, 0);
        assert_eq!(
            remote.get("users/u1/fees/f1/paidAmount").unwrap(),
            Some(json!(7))
        );
    }

    #[test]
    fn offline_flush_keeps_everything_in_order() {
        let device = DeviceStorage::in_memory();
        let queue = WriteQueue::new(&device, "u1");
        let mut remote = remote_for("u1");
        let a = PendingOp::Remove {
            path: "users/u1/fees/a".to_string(),
        };
        let b = PendingOp::Remove {
            path: "users/u1/fees/b".to_string(),
        };
        queue.enqueue(a.clone()).unwrap();
        queue.enqueue(b.clone()).unwrap();

        remote.set_reachable(false);
        let report = queue.flush(&mut remote).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.remaining, 2);
        assert_eq!(queue.pending(), vec![a, b]);
    }

    #[test]
    fn refused_write_blocks_and_stays_queued() {
        let device = DeviceStorage::in_memory();
        let queue = WriteQueue::new(&device, "u1");
        let mut remote = remote_for("u2");
        let first = PendingOp::Set {
            path: "users/u1/students/s1".to_string(),
            value: json!({ "name": "A" }),
        };
        let second = PendingOp::Remove {
            path: "users/u1/fees/f1".to_string(),
        };
        queue.enqueue(first.clone()).unwrap();
        queue.enqueue(second.clone()).unwrap();

        let report = queue.flush(&mut remote).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.remaining, 2);
        let blocked = report.blocked.expect("blocked op");
        assert_eq!(blocked.op, first);
        assert_eq!(queue.pending(), vec![first, second]);

        remote.set_auth(Some("u1".to_string()));
        let report = queue.flush(&mut remote).unwrap();
        assert_eq!(report.applied, 2);
        assert!(report.blocked.is_none());
        assert_eq!(
            remote.get("users/u1/students/s1/name").unwrap(),
            Some(json!("A"))
        );
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn queues_are_kept_per_account() {
        let device = DeviceStorage::in_memory();
        WriteQueue::new(&device, "u1")
            .enqueue(PendingOp::Remove {
                path: "users/u1/fees/f1".to_string(),
            })
            .unwrap();

        let other = WriteQueue::new(&device, "u2");
        assert_eq!(other.len(), 0);
        let mut remote = remote_for("u2");
        let report = other.flush(&mut remote).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(WriteQueue::new(&device, "u1").len(), 1);
    }
}
