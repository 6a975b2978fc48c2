use std::str::FromStr;

use clap::Parser;
use fire_ignition_core::{
    FireConfig, FireSystem, IgnitionConfig, IgnitionEvent, ObserverFocusConfig, SandboxScene,
    SparkSourceConfig, TargetId, Vec3,
};
use tracing_subscriber::EnvFilter;

/// Scene fire demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "fire-ignition-demo")]
#[command(about = "Headless scene fire ignition demo", long_about = None)]
struct Args {
    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 120.0)]
    duration: f64,

    /// Time step in seconds (must be positive)
    #[arg(long, default_value_t = 0.1, value_parser = positive::<f32>)]
    dt: f32,

    /// Rows of crates
    #[arg(long, default_value_t = 8)]
    rows: u32,

    /// Columns of crates
    #[arg(long, default_value_t = 8)]
    cols: u32,

    /// Crate spacing in meters
    #[arg(short, long, default_value_t = 2.5)]
    spacing: f32,

    /// Every Nth crate is a permanent structure (0 = none)
    #[arg(long, default_value_t = 10)]
    permanent_every: u32,

    /// Heat needed to ignite a crate
    #[arg(long, default_value_t = 100.0)]
    heat_threshold: f32,

    /// Sparks needed to ignite a crate
    #[arg(long, default_value_t = 5)]
    sparks_before_ignition: u32,

    /// Chance a spark emission force-ignites its target
    #[arg(long, default_value_t = 0.1)]
    ignition_chance: f32,

    /// Seed for the spark source (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Walk an observer from the edge of the scene to its centre
    #[arg(long)]
    track_focus: bool,

    /// Print every ignition and burn-out
    #[arg(short, long)]
    events: bool,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 5.0, value_parser = positive::<f64>)]
    report_interval: f64,
}

/// Parse a finite value greater than zero
fn positive<T: FromStr>(s: &str) -> Result<T, String> {
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            s.parse().map_err(|_| format!("invalid number '{s}'"))
        }
        _ => Err(format!("must be a finite number greater than zero, got '{s}'")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    println!("=== Scene Fire Ignition Demo ===\n");

    let scene = SandboxScene::new(4.0);
    let half_width = (args.cols.saturating_sub(1)) as f32 * args.spacing / 2.0;
    let half_depth = (args.rows.saturating_sub(1)) as f32 * args.spacing / 2.0;

    let mut light = Vec::new();
    let mut heavy = Vec::new();
    for row in 0..args.rows {
        for col in 0..args.cols {
            let id = TargetId(row * args.cols + col);
            let center = Vec3::new(
                col as f32 * args.spacing - half_width,
                row as f32 * args.spacing - half_depth,
                0.5,
            );
            scene.add_box(id, center, Vec3::new(0.5, 0.5, 0.5));

            if args.permanent_every > 0 && id.0 % args.permanent_every == 0 {
                heavy.push(id);
            } else {
                light.push(id);
            }
        }
    }
    println!(
        "Placed {} crates ({} permanent) in a {}x{} grid, {:.1}m apart",
        scene.object_count(),
        heavy.len(),
        args.rows,
        args.cols,
        args.spacing
    );

    let config = FireConfig {
        ignition: IgnitionConfig {
            sparks_before_ignition: args.sparks_before_ignition,
            ..Default::default()
        },
        observer: ObserverFocusConfig {
            blur_center: args.track_focus.then(Vec3::zeros),
            ..Default::default()
        },
        ..Default::default()
    };

    let mut builder = FireSystem::builder(config).scene(&scene);
    for &id in light.iter().chain(&heavy) {
        builder = builder.flammable(id, args.heat_threshold);
    }
    for &id in &heavy {
        builder = builder.permanent(id);
    }
    let builder = builder.spark_source(SparkSourceConfig {
        random_ignition_chance: args.ignition_chance,
        light_targets: light,
        heavy_targets: heavy,
        seed: args.seed,
        ..Default::default()
    });

    let mut system = match builder.build() {
        Ok(system) => system,
        Err(e) => {
            eprintln!("Failed to build fire system: {e}");
            std::process::exit(1);
        }
    };

    println!("Running simulation...\n");
    println!("Time(s) | Unburnt | Igniting | Burning | Burnt | Fires | Smoke | Heat sources | Sparks");
    println!("--------|---------|----------|---------|-------|-------|-------|--------------|-------");

    let observer_start = half_width.max(half_depth) + 50.0;
    let mut next_report = 0.0;

    while system.time() < args.duration {
        if args.track_focus {
            let progress = (system.time() / args.duration) as f32;
            let x = observer_start * (1.0 - progress);
            system.set_observer(Some(Vec3::new(x, 0.0, 1.8)));
        }

        for event in system.step(args.dt) {
            if args.events {
                match event {
                    IgnitionEvent::Ignited { target, anchor, at } => println!(
                        "  [{at:7.2}] {target} ignited at ({:.1}, {:.1}, {:.1})",
                        anchor.x, anchor.y, anchor.z
                    ),
                    IgnitionEvent::Extinguished { target, at } => {
                        println!("  [{at:7.2}] {target} burned out");
                    }
                }
            }
        }

        if system.time() >= next_report {
            let stats = system.stats();
            println!(
                "{:7.1} | {:7} | {:8} | {:7} | {:5} | {:5} | {:5.2} | {:12} | {:6}",
                stats.time,
                stats.unburnt,
                stats.igniting,
                stats.burning,
                stats.extinguished,
                stats.fire_count,
                stats.smoke_level,
                stats.active_heat_sources,
                stats.spark_emissions
            );
            next_report += args.report_interval;
        }
    }

    let stats = system.stats();
    println!("\n=== Simulation Complete ===");
    println!("Final time: {:.1}s", stats.time);
    println!("Total ignitions: {}", stats.fire_count);
    println!(
        "Spark emissions: {} ({} forced ignitions)",
        stats.spark_emissions, stats.forced_ignitions
    );
    println!("Crates burned out: {}", stats.extinguished);
    println!("Crates still standing: {}", scene.object_count());
    println!("Final smoke level: {:.2}", stats.smoke_level);
    if let Some(distance) = scene.focus_distance() {
        println!("Final focus distance: {distance:.1}m");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_must_be_positive() {
        for dt in ["0", "-0.1", "NaN", "inf"] {
            assert!(
                Args::try_parse_from(["demo-headless", "--dt", dt]).is_err(),
                "accepted --dt {dt}"
            );
        }
        assert!(Args::try_parse_from(["demo-headless", "--report-interval", "0"]).is_err());

        let args = Args::try_parse_from(["demo-headless", "--dt", "0.25"]).unwrap();
        assert_eq!(args.dt, 0.25);
    }
}
