// simulation_main.rs
use smart_intersection::control_system::config::SignalConfig;
use smart_intersection::simulation_engine::simulation::run_simulation;

#[tokio::main]
async fn main() {
    env_logger::init();

    // --local runs the count producer in-process instead of consuming the
    // traffic_counts queue.
    let local_feed = std::env::args().any(|arg| arg == "--local");

    if let Err(e) = run_simulation(SignalConfig::default(), local_feed).await {
        eprintln!("Controller configuration error: {}", e);
        std::process::exit(1);
    }
}
