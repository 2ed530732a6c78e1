use gumdrop::Options;

use stasis_bench::config::BenchConfiguration;
use stasis_bench::{BenchError, Benchmark};

#[tokio::main]
async fn main() -> Result<(), BenchError> {
    let configuration = BenchConfiguration::parse_args_default_or_exit();

    // If version flag is set, display package name and version and exit.
    if configuration.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    configuration.initialize_logger();

    let run_configuration = configuration.configure()?;
    // A failed health check is reported by `execute` and isn't an error.
    let _report = Benchmark::new(run_configuration)?.execute().await?;

    Ok(())
}
