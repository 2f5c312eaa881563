use smart_intersection::monitoring::phase_monitor::{
    listen_phase_events, listen_traffic_counts, run_cli,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    tokio::spawn(async {
        if let Err(e) = listen_phase_events().await {
            eprintln!("Phase events listener error: {}", e);
        }
    });
    tokio::spawn(async {
        if let Err(e) = listen_traffic_counts().await {
            eprintln!("Traffic counts listener error: {}", e);
        }
    });

    run_cli().await;
}
