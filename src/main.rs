//! Super-server binary: loads the service table and runs the dispatcher.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use netvisor::{
    Config, ConsoleWriter, LoadOutcome, ServiceDescriptor, Subscribe, Supervisor,
};

#[derive(Parser, Debug)]
#[command(name = "netvisor", about = "A single-process network super-server")]
struct Args {
    /// Print the loaded service table and trace dispatch events.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let cfg = Config::default();

    println!("netvisor running...");

    let outcome = match netvisor::load_services(&cfg.config_path, cfg.max_services_clamped()) {
        Ok(outcome) => outcome,
        Err(err) => {
            // an unreadable table is not fatal; run with no services
            eprintln!(
                "config: cannot read {}: {err}; starting with an empty service table",
                cfg.config_path.display()
            );
            LoadOutcome::default()
        }
    };
    for (line, err) in &outcome.rejected {
        eprintln!("config: line {line} rejected: {err}");
    }

    let services: Vec<ServiceDescriptor> = outcome
        .services
        .into_iter()
        .map(ServiceDescriptor::from_config)
        .collect();

    if args.verbose {
        print_services(&services);
    }

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(ConsoleWriter::new(args.verbose))];
    let supervisor = Supervisor::new(cfg, subscribers);

    match supervisor.run(services).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Prints the honored service table, one line per service.
fn print_services(services: &[ServiceDescriptor]) {
    println!("services loaded: {}", services.len());
    for svc in services {
        println!(
            "  {} {} {} {} {}",
            svc.executable().display(),
            svc.name(),
            svc.transport().as_token(),
            svc.port(),
            svc.mode().as_token(),
        );
    }
}
