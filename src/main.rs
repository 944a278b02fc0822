use clap::Parser;

use anvil::{Args, Command, Result, command, config::AnvilConfig};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("anvil")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = Args::parse();

    initialize_logger(cli_args.debug)?;

    let config = AnvilConfig::from_env()?;

    match cli_args.command {
        Command::Check {
            path,
            dry_run: _,
            apply,
            analysis,
        } => command::check::execute(&path, apply, &analysis, config).await,
        Command::Upgrade { path, analysis } => {
            command::upgrade::execute(&path, &analysis, config).await
        }
        Command::Changelog { package, from, to } => {
            command::changelog::execute(&package, &from, &to, &config).await
        }
    }
}
