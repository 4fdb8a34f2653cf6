//! catalyst binary entry point.

use std::process::ExitCode;

use catalyst::cli::{self, Action, Args};
use catalyst::config::Config;
use catalyst::dispatch::{self, HostReport, Task};
use catalyst::{logging, Inventory, SshTransport};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run 'catalyst --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    // Initialize logging
    logging::try_init_with(config.log_filter()).ok();
    if let Some(path) = &config.logging.file {
        let level = logging::level_for(config.log_filter(), "catalyst").unwrap_or_else(|| {
            warn!(
                "No catalyst level in log filter '{}', file logging at info",
                config.log_filter()
            );
            tracing::Level::INFO
        });
        if let Err(e) = logging::get_logger("catalyst", level, Some(path)) {
            eprintln!("warning: cannot open log file {}: {e}", path.display());
        }
    }

    match run(&args, &config) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &Config) -> catalyst::Result<ExitCode> {
    let Some(action) = &args.action else {
        cli::print_help();
        return Ok(ExitCode::from(2));
    };

    let inventory = Inventory::from_source(&config.inventory.path)?;
    let targets = dispatch::resolve_targets(&inventory, args.target.as_deref())?;
    info!("Selected {} of {} hosts", targets.len(), inventory.len());

    if *action == Action::Hosts {
        for (name, host) in &targets {
            println!(
                "{name}\t{}@{}:{}\t{}",
                host.username,
                host.hostname,
                host.port,
                host.groups.join(",")
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(task) = Task::from_args(args) else {
        return Ok(ExitCode::SUCCESS);
    };
    task.check_target_count(targets.len())?;

    if args.dry_run {
        for (name, host) in &targets {
            println!(
                "[{name}] {}@{}:{} {}",
                host.username,
                host.hostname,
                host.port,
                task.for_host(name).describe()
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let print = |report: &HostReport| {
        if args.json {
            println!("{}", report.render_json());
        } else {
            println!("{}", report.render_text());
        }
    };
    let failures = dispatch::run_on_targets(
        &targets,
        &task,
        config.connect_timeout(),
        SshTransport::new,
        print,
    );

    if failures > 0 {
        info!("{} of {} hosts failed", failures, targets.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
