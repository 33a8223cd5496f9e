use clap::Parser;
use log::info;
use miette::{IntoDiagnostic, Result};
use regatta_analyzer::storage::ReportStorage;
use regatta_analyzer::{Cli, Session, VERSION};

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    info!("regatta-analyzer {} loading {}", VERSION, args.input.display());

    let output = args.output.clone();
    let session = Session::new(args)?;
    let report = session.run()?;

    match output {
        Some(dir) => {
            let storage = ReportStorage::new(&dir)?;
            let paths = storage.write_report(&report)?;
            info!(
                "Wrote {} reports to {}, stored for {}: {}",
                paths.len(),
                dir.display(),
                report.race(),
                storage.list_keys(report.race()).join(", ")
            );
        }
        None => {
            let json = serde_json::to_string_pretty(&report).into_diagnostic()?;
            println!("{}", json);
        }
    }
    Ok(())
}
