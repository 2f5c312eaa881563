use crate::shared_data::{ClassCounts, CountSnapshot};
use std::sync::Mutex;

/// Read side of the vehicle-counting subsystem. The controller only ever
/// reads through this; how counts are produced (camera feed, simulated
/// roadway, queue consumer) is the producer's business.
pub trait TrafficCountSource: Send + Sync {
    /// Latest per-class counts for the given approach group. A group the
    /// source has no data for reads as all-zero.
    fn counts(&self, group: usize) -> ClassCounts;
}

struct BoardInner {
    groups: Vec<ClassCounts>,
    last_published: Option<u64>,
}

/// Shared count board with a whole-snapshot publish contract: a producer
/// replaces the entire per-group vector under one lock, so a reader can
/// never observe a half-written six-category row.
pub struct CountBoard {
    inner: Mutex<BoardInner>,
}

impl CountBoard {
    pub fn new(group_count: usize) -> Self {
        Self {
            inner: Mutex::new(BoardInner {
                groups: vec![ClassCounts::default(); group_count],
                last_published: None,
            }),
        }
    }

    /// Replaces the board contents with a fresh snapshot.
    pub fn publish(&self, snapshot: CountSnapshot) {
        let mut inner = self.inner.lock().unwrap();
        inner.groups = snapshot.groups;
        inner.last_published = Some(snapshot.timestamp);
    }

    /// Timestamp of the most recent snapshot, if any was ever published.
    pub fn last_published(&self) -> Option<u64> {
        self.inner.lock().unwrap().last_published
    }

    /// Seconds since the last publish. `None` before the first snapshot.
    pub fn age(&self, now: u64) -> Option<u64> {
        self.last_published().map(|ts| now.saturating_sub(ts))
    }
}

impl TrafficCountSource for CountBoard {
    fn counts(&self, group: usize) -> ClassCounts {
        let inner = self.inner.lock().unwrap();
        inner.groups.get(group).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_replaces_the_whole_board() {
        let board = CountBoard::new(4);
        board.publish(CountSnapshot {
            timestamp: 100,
            groups: vec![
                ClassCounts {
                    car: 3,
                    ..Default::default()
                },
                ClassCounts {
                    bus: 1,
                    ..Default::default()
                },
            ],
        });
        assert_eq!(board.counts(0).car, 3);
        assert_eq!(board.counts(1).bus, 1);
        assert_eq!(board.last_published(), Some(100));
    }

    #[test]
    fn absent_groups_read_as_zero() {
        let board = CountBoard::new(4);
        board.publish(CountSnapshot {
            timestamp: 1,
            groups: vec![ClassCounts {
                car: 9,
                ..Default::default()
            }],
        });
        // Group 3 was never covered by the snapshot; fail soft, not fatal.
        assert_eq!(board.counts(3), ClassCounts::default());
        assert_eq!(board.counts(17), ClassCounts::default());
    }

    #[test]
    fn age_tracks_the_latest_snapshot() {
        let board = CountBoard::new(2);
        assert_eq!(board.age(50), None);
        board.publish(CountSnapshot {
            timestamp: 40,
            groups: vec![ClassCounts::default(); 2],
        });
        assert_eq!(board.age(50), Some(10));
        assert_eq!(board.age(30), Some(0));
    }
}
