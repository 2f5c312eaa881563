use crate::global_variables::{AMQP_URL, QUEUE_PHASE_EVENTS, QUEUE_TRAFFIC_COUNTS};
use crate::shared_data::{CountRecord, CountSnapshot, PhaseEvent};
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, QueueDeclareOptions,
    Result as AmiquipResult,
};
use plotters::prelude::*;
use serde::Serialize;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{stdin, stdout, Write};
use std::path::Path;

const PHASE_EVENTS_CSV: &str = "phase_events.csv";
const TRAFFIC_COUNTS_CSV: &str = "traffic_counts.csv";
const PHASE_DURATIONS_PNG: &str = "phase_durations.png";

/// Generic helper to append a record to a CSV file.
fn log_to_csv<T: Serialize>(filename: &str, record: &T) -> Result<(), Box<dyn Error>> {
    let file_exists = Path::new(filename).exists();
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(filename)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);
    wtr.serialize(record)?;
    wtr.flush()?;
    Ok(())
}

pub fn log_phase_event(event: &PhaseEvent) {
    if let Err(e) = log_to_csv(PHASE_EVENTS_CSV, event) {
        eprintln!("Error logging phase event: {}", e);
    }
}

pub fn log_count_snapshot(snapshot: &CountSnapshot) {
    for record in CountRecord::from_snapshot(snapshot) {
        if let Err(e) = log_to_csv(TRAFFIC_COUNTS_CSV, &record) {
            eprintln!("Error logging count record: {}", e);
            break;
        }
    }
}

/// Listens to the "phase_events" queue and logs each incoming event.
pub async fn listen_phase_events() -> AmiquipResult<()> {
    tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let _exchange = Exchange::direct(&channel);
        let queue = channel.queue_declare(QUEUE_PHASE_EVENTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        log::info!("listening for phase events...");
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        if let Ok(event) = serde_json::from_str::<PhaseEvent>(json_str) {
                            log_phase_event(&event);
                        }
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    log::info!("phase events consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

/// Listens to the "traffic_counts" queue and logs each incoming snapshot.
pub async fn listen_traffic_counts() -> AmiquipResult<()> {
    tokio::task::spawn_blocking(|| -> AmiquipResult<()> {
        let mut connection = Connection::insecure_open(AMQP_URL)?;
        let channel = connection.open_channel(None)?;
        let _exchange = Exchange::direct(&channel);
        let queue = channel.queue_declare(QUEUE_TRAFFIC_COUNTS, QueueDeclareOptions::default())?;
        let consumer = queue.consume(ConsumerOptions::default())?;
        log::info!("listening for traffic counts...");
        for message in consumer.receiver() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    if let Ok(json_str) = std::str::from_utf8(&delivery.body) {
                        if let Ok(snapshot) = serde_json::from_str::<CountSnapshot>(json_str) {
                            log_count_snapshot(&snapshot);
                        }
                    }
                    consumer.ack(delivery)?;
                }
                other => {
                    log::info!("traffic counts consumer ended: {:?}", other);
                    break;
                }
            }
        }
        connection.close()
    })
    .await
    .unwrap()
}

/// Scatter plot of phase durations over time, one color per phase.
pub fn show_phase_durations() -> Result<(), Box<dyn Error>> {
    let mut rdr = csv::Reader::from_path(PHASE_EVENTS_CSV)?;
    let events: Vec<PhaseEvent> = rdr.deserialize().filter_map(Result::ok).collect();

    if events.is_empty() {
        println!("No phase event data available.");
        return Ok(());
    }

    let min_ts = events.iter().map(|e| e.timestamp).min().unwrap();
    let max_ts = events.iter().map(|e| e.timestamp).max().unwrap();
    let max_duration = events
        .iter()
        .map(|e| e.duration)
        .fold(f64::NEG_INFINITY, f64::max);

    let backend = BitMapBackend::new(PHASE_DURATIONS_PNG, (800, 600));
    let root = backend.into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Phase Durations Over Time", ("sans-serif", 20))
        .margin(40)
        .x_label_area_size(40)
        .y_label_area_size(40)
        .build_cartesian_2d(min_ts..max_ts, 0.0..max_duration + 10.0)?;

    chart.configure_mesh().draw()?;
    chart
        .draw_series(
            events
                .iter()
                .filter(|e| e.phase_index == 0)
                .map(|e| Circle::new((e.timestamp, e.duration), 5, RED.filled())),
        )?
        .label("phase 0")
        .legend(|(x, y)| Circle::new((x, y), 5, RED.filled()));
    chart
        .draw_series(
            events
                .iter()
                .filter(|e| e.phase_index != 0)
                .map(|e| Circle::new((e.timestamp, e.duration), 5, BLUE.filled())),
        )?
        .label("phase 1")
        .legend(|(x, y)| Circle::new((x, y), 5, BLUE.filled()));
    chart.configure_series_labels().draw()?;

    root.present()?;
    println!("Phase duration chart saved to {}", PHASE_DURATIONS_PNG);
    Ok(())
}

/// Prints row counts for the persisted CSVs plus the latest durations.
pub fn generate_report_summary() -> Result<(), Box<dyn Error>> {
    let mut phase_events = 0usize;
    let mut adaptive_events = 0usize;
    let mut latest: Option<PhaseEvent> = None;
    if Path::new(PHASE_EVENTS_CSV).exists() {
        let mut rdr = csv::Reader::from_path(PHASE_EVENTS_CSV)?;
        for result in rdr.deserialize::<PhaseEvent>() {
            let event = result?;
            phase_events += 1;
            if event.adaptive {
                adaptive_events += 1;
            }
            latest = Some(event);
        }
    }

    let mut count_records = 0usize;
    if Path::new(TRAFFIC_COUNTS_CSV).exists() {
        let mut rdr = csv::Reader::from_path(TRAFFIC_COUNTS_CSV)?;
        count_records = rdr.deserialize::<CountRecord>().count();
    }

    println!("Phase events recorded:   {}", phase_events);
    println!("  of which adaptive:     {}", adaptive_events);
    println!("Count records persisted: {}", count_records);
    if let Some(event) = latest {
        println!(
            "Latest: phase {} for {:.1}s at {}",
            event.phase_index, event.duration, event.timestamp
        );
    }
    Ok(())
}

pub async fn run_cli() {
    loop {
        println!("\nSignal Monitoring Admin CLI");
        println!("1. Display report summary");
        println!("2. Chart phase durations");
        println!("3. Exit");
        print!("Enter your choice: ");
        stdout().flush().unwrap();
        let mut input = String::new();
        stdin().read_line(&mut input).unwrap();
        let choice = input.trim().parse::<u32>().unwrap_or(0);
        match choice {
            1 => {
                if let Err(e) = generate_report_summary() {
                    eprintln!("Error generating report summary: {}", e);
                }
            }
            2 => {
                if let Err(e) = show_phase_durations() {
                    eprintln!("Error charting phase durations: {}", e);
                }
            }
            3 => {
                println!("Exiting CLI.");
                break;
            }
            _ => {
                println!("Invalid choice. Try again.");
            }
        }
    }
}
