use smart_intersection::control_system::config::SignalConfig;
use smart_intersection::detection::detector_feed::run_simulated_detector;

fn main() {
    env_logger::init();
    println!("Starting simulated vehicle detector...");
    let group_count = SignalConfig::default().group_count();
    if let Err(e) = run_simulated_detector(group_count) {
        eprintln!("Detector error: {}", e);
    }
}
