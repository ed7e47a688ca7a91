use clap::Parser;
use std::path::Path;
use unicore::cli::dispatcher::Dispatcher;
use unicore::cli::main_types::Cli;
use unicore::storage::config::Config;
use unicore::utils::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match Config::config_file_path(cli.config_dir.as_deref().map(Path::new)) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("Error locating config: {}", err);
            std::process::exit(1);
        }
    };

    let config = match Config::load(Some(config_path.clone())) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {}", err);
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("Verbose mode is enabled");
        eprintln!("Using config file: {}", config_path.display());
    }

    let mut dispatcher = Dispatcher::new(config, config_path, cli.verbose);

    match dispatcher.dispatch(cli.command).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            let severity = e.severity();
            eprintln!("{} Error: {}", severity.emoji(), e);
            if let Some(hint) = e.troubleshooting_hint() {
                eprintln!("💡 {}", hint);
            }
            std::process::exit(1);
        }
    }
}
