use clap::Parser;
use fio_bench::cli::{load_config, Command, FioBenchCli};
use fio_bench::{run_benchmarks, summarise, BatchOutcome};
use fio_bench_runner::prelude::start_shutdown_listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = FioBenchCli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            log::debug!("Running with {config:?}");

            let shutdown = start_shutdown_listener();
            match run_benchmarks(&config, &shutdown).await? {
                BatchOutcome::Completed { report } => {
                    log::info!("Benchmark complete, report at {}", report.display());
                }
                BatchOutcome::Cancelled => println!("Benchmark cancelled"),
            }
        }
        Command::Summarise(args) => {
            args.output.apply(&mut config);
            summarise(&config, args.artifacts)?;
        }
    }

    Ok(())
}
