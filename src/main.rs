//! desk-search CLI - interactive and one-shot record search.

use clap::{Parser, Subcommand};
use colored::Colorize;
use desk_search::session::{format_field_listing, format_record};
use desk_search::{
    Collection, Config, LinePrompt, RecordStore, Resolver, Session, TerminalPrompt, load_config,
    resolver_from_config,
};
use serde_json::{Map, Value, json};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "desk-search")]
#[command(about = "Search users, tickets and organizations, resolving their relationships")]
#[command(version)]
struct Cli {
    /// Directory holding users.json, tickets.json and organizations.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (defaults to ./desk-search.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Simulated latency before resolving relationships, in milliseconds
    #[arg(long, global = true)]
    latency_ms: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive search menu (default)
    Interactive,

    /// Look up one record by field and value
    Search {
        /// Collection to search (users, tickets, organizations)
        collection: String,

        /// Field to match on (e.g., _id, name, tags)
        field: String,

        /// Value to match, compared exactly
        value: String,

        /// Skip resolving related tickets, users and organizations
        #[arg(long)]
        no_relationships: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List the searchable fields of each collection
    Fields {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn is_json(format: &str) -> bool {
    format == "json"
}

fn emit_error(format: &str, code: &str, detail: &str) -> ! {
    if is_json(format) {
        eprintln!("{}", json!({"error": code, "detail": detail}));
    } else {
        eprintln!("{}", format!("Error: {}", detail).red());
    }
    process::exit(1);
}

fn check_format(format: &str) {
    if format != "text" && !is_json(format) {
        emit_error(
            "text",
            "invalid_format",
            &format!("Unknown format: {}. Use: text, json", format),
        );
    }
}

fn output_format(command: &Option<Commands>) -> &str {
    match command {
        Some(Commands::Search { format, .. }) | Some(Commands::Fields { format }) => format.as_str(),
        _ => "text",
    }
}

fn resolve_config(cli: &Cli) -> Config {
    let format = output_format(&cli.command);
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => emit_error(format, "config_error", &e.to_string()),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ms) = cli.latency_ms {
        config.latency_ms = ms;
    }
    config
}

fn print_fields(resolver: &Resolver<'_>, format: &str) {
    if is_json(format) {
        let mut listing = Map::new();
        for collection in Collection::ALL {
            let fields: Vec<Value> = resolver
                .fields(collection)
                .iter()
                .map(|f| Value::String(f.to_string()))
                .collect();
            listing.insert(collection.to_string(), Value::Array(fields));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print!("{}", format_field_listing(resolver));
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Commands::Search { format, .. } | Commands::Fields { format }) = &cli.command {
        check_format(format);
    }

    let config = resolve_config(&cli);
    let format = output_format(&cli.command).to_string();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => emit_error(&format, "runtime_error", &e.to_string()),
    };

    // The field listing needs no data.
    let store = if matches!(cli.command, Some(Commands::Fields { .. })) {
        RecordStore::default()
    } else {
        match rt.block_on(RecordStore::load(&config.data_dir)) {
            Ok(store) => store,
            Err(e) => emit_error(&format, "load_error", &e.to_string()),
        }
    };
    let resolver = resolver_from_config(&store, &config);

    match cli.command {
        None | Some(Commands::Interactive) => {
            let result = if io::stdin().is_terminal() {
                match TerminalPrompt::new() {
                    Ok(prompt) => rt.block_on(
                        Session::new(&resolver, prompt, io::stdout())
                            .include_relationships(config.include_relationships)
                            .run(config.welcome_delay()),
                    ),
                    Err(e) => Err(e),
                }
            } else {
                let prompt = LinePrompt::new(io::stdin().lock(), io::stdout());
                rt.block_on(
                    Session::new(&resolver, prompt, io::stdout())
                        .include_relationships(config.include_relationships)
                        .run(config.welcome_delay()),
                )
            };

            if let Err(e) = result {
                emit_error(&format, "session_error", &e.to_string());
            }
        }

        Some(Commands::Search {
            collection,
            field,
            value,
            no_relationships,
            format,
        }) => {
            let collection: Collection = match collection.parse() {
                Ok(collection) => collection,
                Err(e) => emit_error(&format, "invalid_collection", &e.to_string()),
            };
            let include = config.include_relationships && !no_relationships;

            match rt.block_on(resolver.find(collection, &field, &value, include)) {
                Some(record) => {
                    if is_json(&format) {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&record)
                                .unwrap_or_else(|_| "{}".to_string())
                        );
                    } else {
                        println!("{}", format!("{} match", collection.title()).bold());
                        print!("{}", format_record(&record));
                    }
                }
                None => {
                    if is_json(&format) {
                        println!("null");
                    } else {
                        println!(
                            "{}",
                            format!(
                                "No resource found in {} where {} = {}",
                                collection, field, value
                            )
                            .yellow()
                        );
                    }
                }
            }
        }

        Some(Commands::Fields { format }) => print_fields(&resolver, &format),
    }
}
