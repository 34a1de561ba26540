use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use hsu_common::{Error, ModuleID, ObjectType, ResultExt};
use hsu_service_factory::{ModuleHandle, ServiceCatalog, ServiceRegistry};

/// HSU Factory Inspect - query a service catalog
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service catalog file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    catalog: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every declared implementation
    List,

    /// Show one implementation
    Describe {
        /// Implementation id, e.g. Writer.VTK
        id: String,
    },

    /// Resolve the default implementation for an object type
    Default {
        #[arg(short, long)]
        object: String,
        #[arg(short, long)]
        service: String,
    },

    /// Check whether any implementation supports an object type
    Support {
        #[arg(short, long)]
        object: String,
        #[arg(short, long)]
        service: String,
    },

    /// List every implementation accepting an object type
    Implementations {
        #[arg(short, long)]
        object: String,
        #[arg(short, long)]
        service: String,
    },
}

/// A module known only from the catalog. Its code is not linked into this
/// binary, so it can be inspected but never started.
struct DeclaredModule {
    id: ModuleID,
}

impl ModuleHandle for DeclaredModule {
    fn id(&self) -> &ModuleID {
        &self.id
    }

    fn is_started(&self) -> bool {
        false
    }

    fn start(&self, _registry: &ServiceRegistry) -> hsu_common::Result<()> {
        Err(Error::module_not_found(self.id.clone()))
            .context("Module code is not linked into the inspector")
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    info!("Catalog file: {}", args.catalog);
    let catalog = ServiceCatalog::load_from_file(&args.catalog)?;
    info!(
        "Loaded catalog with {} enabled module(s), {} service(s)",
        catalog.enabled_modules().len(),
        catalog.service_count()
    );

    // Handles must outlive the registry queries: it only keeps weak references.
    let modules: Vec<Arc<dyn ModuleHandle>> = catalog
        .enabled_modules()
        .iter()
        .map(|m| Arc::new(DeclaredModule { id: m.id.clone() }) as Arc<dyn ModuleHandle>)
        .collect();
    let descriptors = catalog.module_descriptors(|id| modules.iter().find(|m| m.id() == id).cloned())?;

    let registry = ServiceRegistry::default();
    registry.parse_module_descriptors(&descriptors);
    debug!("Registry: {:?}", registry);

    run(&registry, args.command, args.json)
}

fn run(registry: &ServiceRegistry, command: Command, json: bool) -> Result<()> {
    match command {
        Command::List => {
            let summaries = registry.describe();
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for s in summaries {
                    let objects: Vec<_> = s.objects.iter().map(|o| o.as_str()).collect();
                    println!("{:<30} {:<20} [{}]", s.implementation, s.service_type, objects.join(", "));
                }
            }
        }
        Command::Describe { id } => {
            let summary = registry
                .describe()
                .into_iter()
                .find(|s| s.implementation.as_str() == id)
                .ok_or_else(|| anyhow!("Unknown service implementation '{}'", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Implementation: {}", summary.implementation);
                println!("Service type:   {}", summary.service_type);
                println!("Objects:        {:?}", summary.objects);
                if let Some(module) = &summary.module {
                    println!("Module:         {}", module);
                }
                if !summary.description.is_empty() {
                    println!("Description:    {}", summary.description);
                }
                if !summary.tags.is_empty() {
                    println!("Tags:           {}", summary.tags);
                }
            }
        }
        Command::Default { object, service } => {
            if object == ObjectType::GENERIC {
                return Err(anyhow!("'{}' is not a concrete object type", object));
            }
            let implementation = registry.resolve_default_implementation(object.as_str(), service.as_str())?;
            if json {
                println!("{}", serde_json::json!({ "implementation": implementation }));
            } else {
                println!("{}", implementation);
            }
        }
        Command::Support { object, service } => {
            let supported = registry.support(object.as_str(), service.as_str());
            if json {
                println!("{}", serde_json::json!({ "supported": supported }));
            } else {
                println!("{}", supported);
            }
        }
        Command::Implementations { object, service } => {
            let ids = registry.get_implementations_for(object.as_str(), service.as_str());
            if json {
                println!("{}", serde_json::to_string_pretty(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
    }

    Ok(())
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
