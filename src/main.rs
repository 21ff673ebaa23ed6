use clap::Parser;
use mo_e2e::cli::commands::{cmd_elements, cmd_preflight, cmd_run, cmd_teardown};
use mo_e2e::cli::config::{Cli, Commands, Settings, load_config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    mo_e2e::init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    // Resolve settings: CLI > environment > config file > defaults
    let mut settings = Settings::from_env(&config, cli.env.as_deref())?;

    match cli.command {
        Commands::Run {
            scenario,
            format,
            output,
            retries,
        } => {
            if let Some(retries) = retries {
                settings.retries = retries;
            }
            let format = format.unwrap_or_else(|| settings.run.format.clone());
            let output = output.or_else(|| settings.run.output.clone());
            let all_passed = cmd_run(&settings, &scenario, &format, output.as_deref())?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::Elements { json, refresh } => cmd_elements(&settings, json, refresh)?,
        Commands::Preflight => cmd_preflight(&settings)?,
        Commands::Teardown => cmd_teardown(&settings),
    }

    Ok(())
}
