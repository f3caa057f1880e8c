use std::env;

use hand_damper::{config::DamperConfig, simulation::HeadlessSimulation};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let json_output = args.contains(&"--json".to_string()) || args.contains(&"-j".to_string());
    let config_path = args
        .iter()
        .position(|arg| arg == "--config" || arg == "-c")
        .and_then(|i| args.get(i + 1));

    let config = match config_path {
        Some(path) => DamperConfig::load(path).expect("Could not load config"),
        None => DamperConfig::default(),
    };
    config.validate().expect("Invalid config");

    let mut simulation = HeadlessSimulation::new(&config).expect("Could not set up simulation");
    let report = simulation.run();

    if json_output {
        let json = serde_json::to_string_pretty(&report).expect("Could not serialize report");
        println!("{json}");
        return;
    }

    let metrics = &report.metrics;
    println!(
        "drag_scale={} min_follow_factor={} rotation={:?}",
        report.params.drag_scale, report.params.min_follow_factor, report.params.rotation
    );
    println!(
        "{} ticks @ {} Hz over {:.1}s",
        metrics.ticks, report.ticks_per_second, report.duration_secs
    );
    println!(
        "lag: avg {:.4} m, max {:.4} m",
        metrics.avg_lag, metrics.max_lag
    );
    println!("avg follow factor: {:.3}", metrics.avg_follow_factor);
    println!(
        "jitter: raw {:.5} m, filtered {:.5} m",
        metrics.avg_raw_jitter, metrics.avg_filtered_jitter
    );
}
