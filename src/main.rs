//! # Pubcat CLI (`pubcat`)
//!
//! The `pubcat` binary drives the catalog engine from the command line
//! and starts the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! pubcat --config ./config/pubcat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pubcat build` | Rebuild all programme catalogs from the store |
//! | `pubcat catalog <programme>` | Print a programme's catalog snapshot |
//! | `pubcat resolve <programme> <publication>` | Resolve a publication to an envelope |
//! | `pubcat assemble <map> <topic>` | Print the composite reading view for a topic |
//! | `pubcat serve http` | Start the HTTP API server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pubcat::config::{self, Config};
use pubcat::models::Programme;
use pubcat::rebuild;
use pubcat::resolve::{ResolveRequest, Resolver};
use pubcat::server;
use pubcat::snapshot::fs::FsSnapshotStore;
use pubcat::snapshot::SnapshotStore;
use pubcat::source::http::HttpEnvelopeSource;
use pubcat::source::{EnvelopeSource, RawDocument};
use pubcat::{ditamap, navigator};

/// Pubcat — a multilingual publication catalog and resolution engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pubcat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pubcat",
    about = "Pubcat — a multilingual publication catalog and resolution engine",
    version,
    long_about = "Pubcat reads publication envelopes from a document store, builds \
    per-programme catalogs grouped by subject and translation group, resolves \
    (programme, publication, language) requests with English fallback, and navigates \
    publication maps into composite reading views."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pubcat.toml`. Store, snapshot, and server
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/pubcat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Rebuild all programme catalogs from the envelope store.
    ///
    /// Lists every envelope, constructs the four programme catalogs, and
    /// atomically replaces the snapshot files. Programmes with no
    /// envelopes get an empty catalog.
    Build,

    /// Print a programme's catalog snapshot as JSON.
    Catalog {
        /// Programme code: `pyp`, `myp`, `dp`, or `cp`.
        programme: String,
    },

    /// Resolve a publication to the concrete envelope to serve.
    ///
    /// Falls back to the English edition when the desired language does
    /// not exist. Prints the resolved envelope as JSON, including the
    /// canonical publication name when it differs from the request.
    Resolve {
        /// Programme code: `pyp`, `myp`, `dp`, or `cp`.
        programme: String,

        /// Publication name (matched case-insensitively).
        publication: String,

        /// Desired language code (defaults to `en`).
        #[arg(long, default_value = "en")]
        language: String,

        /// Previously-learned translation group, used instead of the
        /// publication name when supplied.
        #[arg(long)]
        group: Option<String>,
    },

    /// Print the composite reading view for a topic within a map.
    Assemble {
        /// URI of the map document in the store.
        map: String,

        /// URI of the target topic.
        topic: String,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// the catalog, resolve, rebuild, and map navigation endpoints.
    Http,
}

fn open_stores(cfg: &Config) -> anyhow::Result<(Arc<dyn EnvelopeSource>, Arc<dyn SnapshotStore>)> {
    let source = Arc::new(HttpEnvelopeSource::new(&cfg.store)?);
    let snapshots = Arc::new(FsSnapshotStore::new(&cfg.snapshots.dir)?);
    Ok((source, snapshots))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build => {
            let (source, snapshots) = open_stores(&cfg)?;
            let summary = rebuild::run_rebuild(source.as_ref(), snapshots.as_ref()).await?;
            println!("Rebuilt catalogs from {} envelopes:", summary.envelopes);
            for count in &summary.programmes {
                println!("  {:4} {} publications", count.programme, count.publications);
            }
        }
        Commands::Catalog { programme } => {
            let (_, snapshots) = open_stores(&cfg)?;
            let programme = Programme::from_code(&programme)
                .ok_or_else(|| anyhow::anyhow!("unknown programme: {programme}"))?;
            match snapshots.read(programme).await? {
                Some(catalog) => println!("{}", serde_json::to_string_pretty(&*catalog)?),
                None => eprintln!(
                    "No catalog snapshot for {}. Run `pubcat build` first.",
                    programme.code()
                ),
            }
        }
        Commands::Resolve {
            programme,
            publication,
            language,
            group,
        } => {
            let (source, snapshots) = open_stores(&cfg)?;
            let resolver = Resolver::new(source, snapshots);
            let request = ResolveRequest {
                programme,
                publication,
                language,
                group_hint: group,
            };
            match resolver.resolve(&request).await? {
                Some(resolution) => {
                    if let Some(canonical) = &resolution.canonical_name {
                        eprintln!("Note: publication is stored as '{canonical}'");
                    }
                    println!("{}", serde_json::to_string_pretty(&resolution)?);
                }
                None => {
                    eprintln!(
                        "No envelope matched publication '{}' in programme '{}'.",
                        request.publication, request.programme
                    );
                    std::process::exit(1);
                }
            }
        }
        Commands::Assemble { map, topic } => {
            let (source, _) = open_stores(&cfg)?;
            let doc = source
                .read_document(&map)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no document at {map}"))?;
            let topics = match doc {
                RawDocument::Xml(xml) => ditamap::parse_map(&xml)?,
                _ => anyhow::bail!("document at {map} is not a map"),
            };
            match navigator::assemble(&topics, &topic)? {
                Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
                None => {
                    eprintln!("Topic {topic} is not in map {map}.");
                    std::process::exit(1);
                }
            }
        }
        Commands::Serve { service } => match service {
            ServeService::Http => {
                let (source, snapshots) = open_stores(&cfg)?;
                server::run_server(&cfg, source, snapshots).await?;
            }
        },
    }

    Ok(())
}
