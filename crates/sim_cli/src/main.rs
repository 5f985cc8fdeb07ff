use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sim_control::{ControlSource, CruiseDriver};
use sim_core::{KinematicsVariant, SimEvent, Simulation, Snapshot};
use sim_world::{build_simulation, load_config_or_default};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "sim_cli", about = "EV simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation headless for a fixed number of ticks.
    Run {
        #[arg(long)]
        ticks: u64,
        /// Overrides the config seed. Random when neither is set.
        #[arg(long)]
        seed: Option<u64>,
        /// Driving mode key (urban, sport, highway, eco).
        #[arg(long)]
        mode: Option<String>,
        /// Simulated seconds per tick.
        #[arg(long, default_value_t = 0.2)]
        dt: f64,
        #[arg(long, value_parser = ["mode_target", "pedal"])]
        kinematics: Option<String>,
        /// Hold a steady throttle (0..1). Only the pedal variant reads it.
        #[arg(long)]
        throttle: Option<f64>,
        /// JSON config file. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 25)]
        print_every: u64,
        /// Print snapshots as JSON lines instead of status lines.
        #[arg(long)]
        json: bool,
    },
}

struct RunArgs {
    ticks: u64,
    dt: f64,
    print_every: u64,
    json: bool,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(sim: &mut Simulation, mut driver: Option<CruiseDriver>, args: &RunArgs) -> Result<()> {
    let print_every = args.print_every.max(1);
    if !args.json {
        println!(
            "Starting simulation: ticks={} seed={} vehicle={} mode={} kinematics={:?} dt={}",
            args.ticks,
            sim.seed(),
            sim.vehicle_id(),
            sim.mode(),
            sim.config().kinematics,
            args.dt,
        );
        println!("{}", "-".repeat(80));
    }

    for _ in 0..args.ticks {
        if let Some(driver) = driver.as_mut() {
            let input = driver.controls(sim.state(), sim.state().mode.profile());
            sim.set_controls(input);
        }
        let output = sim
            .step(args.dt)
            .with_context(|| format!("simulation stopped at tick {}", sim.tick()))?;

        if args.json {
            if output.snapshot.tick % print_every == 0 {
                println!("{}", serde_json::to_string(&output.snapshot)?);
            }
            continue;
        }
        // Print notable events regardless of print_every.
        for event in &output.events {
            print_event(output.snapshot.tick, event);
        }
        if output.snapshot.tick % print_every == 0 {
            print_status(&output.snapshot);
        }
    }

    if !args.json {
        println!("{}", "-".repeat(80));
        println!("Done. Final state at tick {}:", sim.tick());
        print_status(&sim.snapshot());
        println!(
            "distance={:.2} km  energy={:.3} kWh",
            sim.state().total_distance_m / 1000.0,
            sim.state().total_energy_kwh
        );
    }
    Ok(())
}

fn print_event(tick: u64, event: &SimEvent) {
    match event {
        SimEvent::EnvironmentEventStarted {
            description,
            duration_ticks,
            ..
        } => println!("*** EVENT: {description} for {duration_ticks} ticks at tick={tick:05} ***"),
        SimEvent::EnvironmentEventEnded { kind } => {
            println!("*** EVENT ENDED: {kind:?} at tick={tick:05} ***");
        }
        SimEvent::ModelFault { model, detail } => {
            println!("!!! {model:?} fault at tick={tick:05}: {detail}");
        }
        SimEvent::BatteryDepleted => println!("!!! BATTERY DEPLETED at tick={tick:05}"),
        SimEvent::ModeChanged { from, to } => println!("*** MODE: {from} -> {to} ***"),
    }
}

fn print_status(snapshot: &Snapshot) {
    let s = &snapshot.state;
    let event = snapshot
        .active_event
        .as_ref()
        .map_or("-", |e| e.description.as_str());
    println!(
        "[tick={tick:05}  t={t:7.1}s]  mode={mode:<7}  speed={speed:6.1} km/h  \
         battery={battery:6.2}%  power={power:6.2} kW  range={range:6.1} km  \
         motor={motor:5.1}C  brake={brake:5.1}C  event={event}",
        tick = snapshot.tick,
        t = snapshot.timestamp_s,
        mode = s.mode.key(),
        speed = s.speed_kmh,
        battery = s.battery_level_pct,
        power = s.instant_power_kw,
        range = s.autonomy_remaining_km,
        motor = s.motor_temp_c,
        brake = s.brake_temp_c,
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            ticks,
            seed,
            mode,
            dt,
            kinematics,
            throttle,
            config,
            print_every,
            json,
        } => {
            let mut sim_config = load_config_or_default(config.as_deref())?;
            match kinematics.as_deref() {
                Some("pedal") => sim_config.kinematics = KinematicsVariant::Pedal,
                Some(_) => sim_config.kinematics = KinematicsVariant::ModeTarget,
                None => {}
            }
            let mut sim = build_simulation(sim_config, seed)?;
            if let Some(key) = mode {
                sim.change_mode(&key).context("--mode")?;
            }
            let args = RunArgs {
                ticks,
                dt,
                print_every,
                json,
            };
            run(&mut sim, throttle.map(CruiseDriver::steady), &args)?;
        }
    }
    Ok(())
}
