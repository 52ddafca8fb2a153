use clap::{CommandFactory, Parser};
use clap_complete::aot::generate;
use devhost::cli::{Cli, Commands};
use devhost::commands;
use devhost::commands::dev::DevOptions;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support.
    let default_level = if cli.global.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config_file = cli.global.config_file.as_deref();

    let result = match cli.command {
        Commands::Dev {
            port,
            linked,
            no_seed,
        } => {
            commands::dev::run(
                config_file,
                DevOptions {
                    port,
                    linked,
                    no_seed,
                },
            )
            .await
        }
        Commands::Down => commands::down::run(config_file, false).await,
        Commands::Purge => commands::down::run(config_file, true).await,
        Commands::Logs { service, output } => {
            commands::logs::run(config_file, &service, output.as_deref()).await
        }
        Commands::Execute { service, command } => {
            commands::exec::run(config_file, &service, command).await
        }
        Commands::Doctor => commands::doctor::run(config_file),
        Commands::Validate => commands::validate::run(config_file),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "devhost", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
