mod serve;

use std::process;

use clap::{Parser, Subcommand};

/// Wild-encounter microservice.
#[derive(Parser)]
#[command(name = "safari", version, about = "Wild-encounter microservice")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP encounter service
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8085)]
        port: u16,

        /// Base URL of the species (pokedex) collaborator
        #[arg(long, default_value = "http://pokedex-service:3003")]
        species_url: String,

        /// Base URL of the collection collaborator
        #[arg(long, default_value = "http://collection-service:3004")]
        collection_url: String,

        /// TTL for the species cache, in seconds
        #[arg(long, default_value_t = 3600)]
        species_cache_ttl_secs: u64,

        /// Fix the engine's random seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            species_url,
            collection_url,
            species_cache_ttl_secs,
            seed,
        } => {
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            let config = serve::ServeConfig {
                port,
                species_url,
                collection_url,
                species_cache_ttl_secs,
                seed,
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
