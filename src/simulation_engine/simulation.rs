// simulation.rs
use crate::control_system::config::{ConfigError, SignalConfig};
use crate::control_system::signal_controller::{ControllerMode, SignalController};
use crate::detection::count_source::CountBoard;
use crate::detection::detector_feed::{run_local_feed, start_count_feed};
use crate::global_variables::{AMQP_URL, QUEUE_PHASE_EVENTS};
use crate::shared_data::{current_timestamp, PhaseEvent};
use crate::simulation_engine::approaches::create_approach_groups;
use crate::simulation_engine::clock::SimClock;

use amiquip::{Channel, Connection, Exchange, Publish, QueueDeclareOptions};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Counts older than this many simulation seconds are considered stale.
/// Stale data is logged and tolerated; the controller keeps running on the
/// last snapshot.
const STALE_AFTER_SECS: u64 = 10;

fn open_event_channel() -> Option<(Connection, Channel)> {
    match Connection::insecure_open(AMQP_URL) {
        Ok(mut connection) => match connection.open_channel(None) {
            Ok(channel) => {
                if let Err(e) =
                    channel.queue_declare(QUEUE_PHASE_EVENTS, QueueDeclareOptions::default())
                {
                    log::warn!("phase event queue unavailable: {}", e);
                    return None;
                }
                Some((connection, channel))
            }
            Err(e) => {
                log::warn!("phase event publishing disabled: {}", e);
                None
            }
        },
        Err(e) => {
            log::warn!("phase event publishing disabled: {}", e);
            None
        }
    }
}

/// Main driver loop: advances the clock, ticks the controller once per
/// step, publishes phase events, and credits vehicles passing on green.
///
/// With `local_feed` set the count producer runs in-process; otherwise
/// snapshots arrive from the `traffic_counts` queue.
pub async fn run_simulation(config: SignalConfig, local_feed: bool) -> Result<(), ConfigError> {
    let group_count = config.group_count();
    let board = Arc::new(CountBoard::new(group_count));
    let mut controller = SignalController::new(config, board.clone())?;
    let approach_groups = create_approach_groups();

    if local_feed {
        tokio::spawn(run_local_feed(board.clone(), group_count));
    } else {
        let feed_board = Arc::clone(&board);
        tokio::spawn(async move {
            if let Err(e) = start_count_feed(feed_board).await {
                log::error!("count feed terminated: {}", e);
            }
        });
    }

    // Connection must outlive the channel; both live for the whole run.
    let event_channel = open_event_channel();

    let mut clock = SimClock::new(1.0);
    let mut rng = SmallRng::seed_from_u64(1);
    let mut stale_logged = false;
    let mut passed_reported = 0;

    loop {
        let now = clock.advance();
        let previous_phase = controller.phase_index();
        controller.tick(now);

        if controller.phase_index() != previous_phase {
            let entered = controller.phase_index();
            let green: Vec<&str> = approach_groups
                .iter()
                .filter(|g| g.is_green(&controller))
                .map(|g| g.name.as_str())
                .collect();
            log::info!(
                "t={:.0}: phase {} for {:.1}s, green approaches: {:?}",
                now,
                entered,
                controller.phase_duration(entered),
                green
            );
            let event = PhaseEvent {
                timestamp: current_timestamp(),
                phase_index: entered,
                duration: controller.phase_duration(entered),
                adaptive: controller.mode() == ControllerMode::Adaptive,
            };
            if let Some((_, channel)) = &event_channel {
                let exchange = Exchange::direct(channel);
                if let Ok(payload) = serde_json::to_vec(&event) {
                    if let Err(e) = exchange.publish(Publish::new(&payload, QUEUE_PHASE_EVENTS)) {
                        log::warn!("failed to publish phase event: {}", e);
                    }
                }
            }
        }

        match board.age(current_timestamp()) {
            Some(age) if age > STALE_AFTER_SECS => {
                if !stale_logged {
                    log::warn!("count snapshot is {}s old, proceeding on last data", age);
                    stale_logged = true;
                }
            }
            Some(_) => stale_logged = false,
            None => {}
        }

        // Vehicles clear the intersection only on green approaches.
        for group in &approach_groups {
            if group.is_green(&controller) && rng.random_bool(0.4) {
                controller.record_vehicle_passed();
            }
        }
        if controller.vehicles_passed() >= passed_reported + 100 {
            passed_reported = controller.vehicles_passed();
            log::info!("{} vehicles passed so far", passed_reported);
        }

        sleep(Duration::from_millis(1000)).await;
    }
}
