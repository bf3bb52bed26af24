mod args;

use args::*;
use datastore::Datastore;
use fixtures::{Command, Config};
use log::*;
use logger::Logger;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

static LOGGER: Logger = Logger;

fn execute(config: &Config, commands: &[Command]) -> Result<(), String> {
    let mut store = Datastore::open(&config.store_directory).map_err(|error| {
        format!(
            "Failed to open datastore {}: {}",
            config.store_directory.display(),
            error
        )
    })?;
    info!("Using datastore {}.", store.root().display());
    for command in commands {
        fixtures::run(*command, &mut store, config)
            .map_err(|error| format!("Command '{}' failed: {}", command, error))?;
    }
    Ok(())
}

fn main() {
    // Force exit if panics on thread.
    let original_panic_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Use custom logger.
        let payload = panic_info.payload();
        let error = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied());
        if let Some(error) = error {
            if let Some(location) = panic_info.location() {
                Logger::error(&format!(
                    "Panic (File: {}, Line: {}, Column: {}): {}",
                    location.file(),
                    location.line(),
                    location.column(),
                    error
                ));
            } else {
                Logger::error(&format!("Panic: {}", error));
            }
        } else {
            // Invoke the default handler as a fallback.
            original_panic_hook(panic_info);
        }
        std::process::exit(1);
    }));

    // Process arguments and execute the given commands.
    let matches = args().get_matches();

    // Configure logger.
    if let Ok(()) = log::set_logger(&LOGGER) {
        log::set_max_level(Logger::level(matches.is_present("verbose")))
    }

    let config = get_config(&matches);
    let commands = get_commands(&matches);
    if let Err(error) = execute(&config, &commands) {
        Logger::error(&error);
        std::process::exit(1);
    }
}
