use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use coursework_sim::{run_certification, run_simulator, SimulatorConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coursework_sync=error".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("coursework-sim")
        .version(coursework_sync::VERSION)
        .about("Randomized simulator for assignment autosave sessions")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Run one seeded simulation")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.1")
                        .value_parser(value_parser!(f64))
                        .help("Probability that a backend call fails"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("certify")
                .about("Run simulations over a range of seeds")
                .arg(
                    Arg::new("seeds")
                        .long("seeds")
                        .default_value("20")
                        .value_parser(value_parser!(u64))
                        .help("Number of seeds, starting at 0"),
                )
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("200")
                        .value_parser(value_parser!(u64))
                        .help("Operations per seed"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("simulate", args)) => {
            let config = SimulatorConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                operations: args.get_one::<u64>("operations").copied().unwrap_or(500),
                failure_rate: args.get_one::<f64>("failure-rate").copied().unwrap_or(0.1),
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                ..Default::default()
            };
            if !(0.0..=1.0).contains(&config.failure_rate) {
                bail!("--failure-rate must be within 0.0..=1.0");
            }

            let report = run_simulator(config).await;
            if args.get_flag("json") {
                println!("{}", report.to_json().context("serializing report")?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("certify", args)) => {
            let seeds = args.get_one::<u64>("seeds").copied().unwrap_or(20);
            let operations = args.get_one::<u64>("operations").copied().unwrap_or(200);

            println!("Certifying {seeds} seeds x {operations} operations...");
            let report = run_certification(
                0..seeds,
                SimulatorConfig {
                    operations,
                    stop_on_first_violation: true,
                    ..Default::default()
                },
            )
            .await;

            println!("Seeds tested: {}", report.seeds_tested);
            println!("Violations: {}", report.total_violations);
            if report.passed() {
                println!("=== Result: PASS ===");
            } else {
                println!("Failed seeds: {:?}", report.failed_seeds);
                println!("=== Result: FAIL ===");
                std::process::exit(1);
            }
        }
        _ => {}
    }
    Ok(())
}
