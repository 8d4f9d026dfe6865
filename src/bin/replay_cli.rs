//! replay-cli
//!
//! Loads a simulation result from a JSON file, replays it day by day and
//! prints the final classified table.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use uplift_replay::{
    ChannelObserver, ClassifiedTable, Dashboard, DashboardConfig, Figure, Kpis, PointFilter, ReplayCompletion,
    ReplayEvent, SimulationResult, UpliftError,
};

struct Args {
    input: PathBuf,
    interval_ms: Option<u64>,
    point: Option<String>,
    config: Option<PathBuf>,
}

fn usage() {
    println!("replay-cli - replay a simulation result");
    println!();
    println!("USAGE:");
    println!("    replay-cli --input <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -i, --input <FILE>          Simulation result JSON");
    println!("    -n, --interval-ms <MS>      Delay between frames [default: from config]");
    println!("    -p, --point <ID>            Show the by-point view for one point");
    println!("    -c, --config <FILE>         Dashboard config JSON");
    println!("    -h, --help                  Print help information");
}

fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut input = None;
    let mut interval_ms = None;
    let mut point = None;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            usage();
            std::process::exit(0);
        }
        let Some(value) = args.get(i + 1) else {
            fail(&format!("{flag} requires a value"));
        };
        match flag {
            "--input" | "-i" => input = Some(PathBuf::from(value)),
            "--interval-ms" | "-n" => {
                let ms = value
                    .parse::<u64>()
                    .unwrap_or_else(|_| fail(&format!("invalid interval: {value}")));
                interval_ms = Some(ms);
            }
            "--point" | "-p" => point = Some(value.clone()),
            "--config" | "-c" => config = Some(PathBuf::from(value)),
            other => fail(&format!("unknown argument: {other}")),
        }
        i += 2;
    }

    let Some(input) = input else {
        usage();
        fail("--input is required");
    };

    Args {
        input,
        interval_ms,
        point,
        config,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<DashboardConfig, UpliftError> {
    match path {
        None => Ok(DashboardConfig::default()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| UpliftError::internal(format!("reading {}: {e}", path.display())))?;
            DashboardConfig::from_json_str(&raw)
        }
    }
}

fn load_result(path: &PathBuf) -> Result<SimulationResult, UpliftError> {
    let file = File::open(path).map_err(|e| UpliftError::internal(format!("opening {}: {e}", path.display())))?;
    SimulationResult::from_json_reader(BufReader::new(file))
}

fn print_kpis(kpis: &Kpis) {
    println!(
        "control CR {}  best CR {}  uplift {}  ({} users)",
        kpis.control_cr.format_percent(),
        kpis.best_cr.format_percent(),
        kpis.uplift.format_signed_percent(),
        kpis.users_for_uplift
    );
}

fn badges(winner: bool, loser: bool, control: bool) -> String {
    let mut out = Vec::new();
    if winner {
        out.push("winner");
    }
    if loser {
        out.push("loser");
    }
    if control {
        out.push("control");
    }
    out.join(",")
}

fn print_row(rank: usize, label: &str, cr: Figure, uplift: Figure, tags: &str) {
    println!(
        "{rank:>3}  {label:<24} {:>9} {:>9}  {tags}",
        cr.format_percent(),
        uplift.format_signed_percent()
    );
}

fn print_table(table: &ClassifiedTable) {
    println!("{:>3}  {:<24} {:>9} {:>9}", "#", "row", "CR", "uplift");
    match table {
        ClassifiedTable::ByGoal(rows) => {
            for r in rows {
                let f = r.flags;
                let tags = badges(f.is_winner, f.is_loser, f.is_control);
                print_row(f.rank, r.row.combo_id.as_str(), r.display.conversion_rate, r.display.uplift, &tags);
            }
        }
        ClassifiedTable::ByPoint(rows) => {
            for r in rows {
                let f = r.flags;
                let tags = badges(f.is_winner, f.is_loser, f.is_control);
                print_row(f.rank, &r.row.variant_name, r.display.conversion_rate, r.display.uplift, &tags);
            }
        }
    }
}

fn print_completion(done: &ReplayCompletion) {
    println!();
    println!("replay complete after {} frames", done.frames_applied);
    print_kpis(&done.view.kpis);
    print_table(&done.table);
}

fn run(args: &Args) -> Result<(), UpliftError> {
    let config = load_config(args.config.as_ref())?;
    let interval = args
        .interval_ms
        .map_or_else(|| config.replay_interval(), Duration::from_millis);
    let capacity = config.event_capacity;

    let dashboard = Dashboard::new(config)?;
    dashboard.load(load_result(&args.input)?)?;
    dashboard.set_point_filter(PointFilter::parse(args.point.as_deref()));

    let (observer, events) = ChannelObserver::new(capacity);
    let frames = dashboard.store().current_frames();
    let handle = dashboard.start_replay_with(frames, interval, Arc::new(observer))?;

    loop {
        match events.recv()? {
            ReplayEvent::Frame(update) => {
                println!(
                    "day {:>3}  [{:>5.1}%]  best CR {}",
                    update.day,
                    update.progress * 100.0,
                    update.view.kpis.best_cr.format_percent()
                );
            }
            ReplayEvent::Warning(w) => {
                let ids: Vec<&str> = w.unknown_combos.iter().map(|c| c.as_str()).collect();
                eprintln!("warning: day {} skipped unknown combinations: {}", w.day, ids.join(", "));
            }
            ReplayEvent::Completed(done) => {
                print_completion(&done);
                break;
            }
            ReplayEvent::Cancelled(info) => {
                println!("replay cancelled after {} frames", info.frames_applied);
                break;
            }
        }
    }

    handle.join()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("uplift_replay=info")))
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
