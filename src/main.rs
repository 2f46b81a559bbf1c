use std::sync::Arc;

use anyhow::Result;
use explorer_core::{AppError, Config};
use explorer_dashboard::{
    render, DashboardController, DashboardDeps, DashboardSettings, FileStore, KeyValueStore,
    MemoryStore, SystemClock,
};
use explorer_services::{SuggestionClient, UserClient};
use tokio::io::{AsyncBufReadExt, BufReader};

enum Command {
    Allow,
    Select(usize, usize),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "allow" => Some(Command::Allow),
        "quit" | "exit" => Some(Command::Quit),
        "select" => {
            let group = parts.next()?.parse().ok()?;
            let place = parts.next()?.parse().ok()?;
            Some(Command::Select(group, place))
        }
        _ => None,
    }
}

fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    let path = config.store_path();
    match FileStore::open_or_reset(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "Failed to open store at {}, using memory store: {}",
                path.display(),
                e
            );
            Arc::new(MemoryStore::new())
        }
    }
}

async fn run() -> Result<(), AppError> {
    let (config, _validation) = Config::load_validated().map_err(AppError::classify)?;
    let profile = config.profile();

    let users = UserClient::new(&profile.backend_url)?;
    tracing::info!(
        environment = %explorer_core::current_environment(),
        backend = %users.base_url(),
        "LocalExplorer starting"
    );

    let deps = DashboardDeps {
        users: Arc::new(users),
        suggestions: Arc::new(SuggestionClient::new(&profile.suggestion_url)?),
        geolocator: explorer_weather::location::from_config(&config.location)?,
        store: open_store(&config),
        time: Arc::new(SystemClock),
    };
    let settings = DashboardSettings::from_config(&config);
    let tick = settings.clock_tick;

    let controller = DashboardController::new(deps, settings);
    controller.initialize().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(tick);

    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", render(&controller.view()));
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(AppError::Io(e)),
                };
                match parse_command(&line) {
                    Some(Command::Allow) => {
                        if let Err(e) = controller.allow_location_access().await {
                            println!("{}", e.user_message());
                        }
                    }
                    Some(Command::Select(group, place)) => {
                        if controller.select_recommended_place(group, place).is_none() {
                            println!("No place at {} {}", group, place);
                        }
                    }
                    Some(Command::Quit) => break Ok(()),
                    None => println!("Commands: allow | select <group> <place> | quit"),
                }
            }
            _ = tokio::signal::ctrl_c() => break Ok(()),
        }
    };

    controller.shutdown();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    explorer_core::init()?;

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        return Err(e.into());
    }

    tracing::info!("LocalExplorer stopped");
    Ok(())
}
