use crate::detection::count_source::CountBoard;
use crate::global_variables::{AMQP_URL, QUEUE_TRAFFIC_COUNTS};
use crate::shared_data::{
    current_timestamp, ClassCounts, CountRecord, CountSnapshot, VehicleClass,
};
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish, QueueDeclareOptions,
    Result as AmiquipResult,
};
use rand::Rng;
use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tokio::task;
use tokio::time::{sleep, Duration};

/// Snapshots are persisted to disk every this many observations, matching
/// the camera detector's write-every-N-frames cadence.
const PERSIST_EVERY: usize = 10;
const DETECTOR_CSV: &str = "video_detection.csv";

/// Stand-in for the camera/YOLO pipeline: produces per-group class counts
/// with roughly the class mix the real detector reports.
pub struct SimulatedDetector {
    group_count: usize,
    max_per_group: u32,
}

impl SimulatedDetector {
    pub fn new(group_count: usize) -> Self {
        Self {
            group_count,
            max_per_group: 25,
        }
    }

    /// One full observation of the intersection.
    pub fn observe(&self) -> CountSnapshot {
        let mut rng = rand::rng();
        let groups = (0..self.group_count)
            .map(|_| {
                let mut counts = ClassCounts::default();
                let observed = rng.random_range(0..=self.max_per_group);
                for _ in 0..observed {
                    counts.add(random_class(&mut rng));
                }
                counts
            })
            .collect();
        CountSnapshot {
            timestamp: current_timestamp(),
            groups,
        }
    }
}

// Cars dominate; heavy vehicles are a meaningful minority.
fn random_class(rng: &mut impl Rng) -> VehicleClass {
    let rand_val: f64 = rng.random_range(0.0..1.0);
    if rand_val < 0.50 {
        VehicleClass::Car
    } else if rand_val < 0.70 {
        VehicleClass::Truck
    } else if rand_val < 0.80 {
        VehicleClass::Bus
    } else if rand_val < 0.90 {
        VehicleClass::Motorbike
    } else if rand_val < 0.95 {
        VehicleClass::Bicycle
    } else {
        VehicleClass::Person
    }
}

fn persist_snapshot(snapshot: &CountSnapshot) -> Result<(), Box<dyn Error>> {
    let file_exists = Path::new(DETECTOR_CSV).exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(DETECTOR_CSV)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    for record in CountRecord::from_snapshot(snapshot) {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Publishes simulated count snapshots to the `traffic_counts` queue once a
/// second, persisting every Nth snapshot as the durable side channel.
pub fn run_simulated_detector(group_count: usize) -> AmiquipResult<()> {
    let mut connection = Connection::insecure_open(AMQP_URL)?;
    let channel = connection.open_channel(None)?;
    let exchange = Exchange::direct(&channel);
    channel.queue_declare(QUEUE_TRAFFIC_COUNTS, QueueDeclareOptions::default())?;

    let detector = SimulatedDetector::new(group_count);
    let mut published = 0usize;
    loop {
        let snapshot = detector.observe();
        if let Ok(payload) = serde_json::to_vec(&snapshot) {
            exchange.publish(Publish::new(&payload, QUEUE_TRAFFIC_COUNTS))?;
        }
        published += 1;
        if published % PERSIST_EVERY == 0 {
            if let Err(e) = persist_snapshot(&snapshot) {
                log::error!("failed to persist count snapshot: {}", e);
            }
        }
        thread::sleep(std::time::Duration::from_secs(1));
    }
}

/// Consumes count snapshots from the `traffic_counts` queue and applies
/// each one to the shared board.
pub async fn start_count_feed(board: Arc<CountBoard>) -> AmiquipResult<()> {
    task::spawn_blocking(move || -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let queue = channel.queue_declare(QUEUE_TRAFFIC_COUNTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        log::info!("count feed waiting on '{}'", QUEUE_TRAFFIC_COUNTS);

        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        match serde_json::from_str::<CountSnapshot>(json_str) {
                            Ok(snapshot) => board.publish(snapshot),
                            Err(e) => log::warn!("dropping malformed count snapshot: {}", e),
                        }
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    log::info!("count feed consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

/// Queue-less variant for single-process runs: generates counts in-process
/// and publishes them straight onto the board.
pub async fn run_local_feed(board: Arc<CountBoard>, group_count: usize) {
    let detector = SimulatedDetector::new(group_count);
    loop {
        board.publish(detector.observe());
        sleep(Duration::from_secs(1)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::count_source::TrafficCountSource;

    #[test]
    fn simulated_snapshots_cover_every_group() {
        let detector = SimulatedDetector::new(4);
        let snapshot = detector.observe();
        assert_eq!(snapshot.groups.len(), 4);
    }

    #[test]
    fn observed_counts_land_on_the_board() {
        let board = CountBoard::new(4);
        let detector = SimulatedDetector::new(4);
        board.publish(detector.observe());
        assert!(board.last_published().is_some());
        // Reading any group is total, even if the detector saw nothing.
        for group in 0..4 {
            let _ = board.counts(group);
        }
    }
}
