// src/main.rs

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use tarpkg::reconcile::{self, UpdateOutcome};
use tarpkg::db::ManifestStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "tarpkg")]
#[command(author, version, about = "Tarball package tracker with differential updates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the manifest database
    Init {
        /// Root directory packages are installed under
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Database path (default: <root>/.tarpkg/tarpkg.db)
        #[arg(short, long)]
        db_path: Option<String>,
    },
    /// Install or update tarballs into the root directory
    Update {
        /// Paths to the tarball files
        #[arg(required = true)]
        tarball: Vec<String>,
        /// Root directory packages are installed under
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Database path (default: <root>/.tarpkg/tarpkg.db)
        #[arg(short, long)]
        db_path: Option<String>,
    },
    /// Delete installed packages and their files
    Delete {
        /// Package names (a path is reduced to its base name)
        #[arg(required = true)]
        tarball: Vec<String>,
        /// Root directory packages are installed under
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Database path (default: <root>/.tarpkg/tarpkg.db)
        #[arg(short, long)]
        db_path: Option<String>,
    },
    /// List installed packages
    List {
        /// Root directory packages are installed under
        #[arg(short, long, default_value = ".")]
        root: String,
        /// Database path (default: <root>/.tarpkg/tarpkg.db)
        #[arg(short, long)]
        db_path: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Database path: explicit flag, or the default location under the root
fn resolve_db_path(root: &Path, db_path: Option<String>) -> String {
    db_path.unwrap_or_else(|| {
        tarpkg::db::default_db_path(root)
            .to_string_lossy()
            .to_string()
    })
}

/// Reduce a package argument to its base name
fn base_name(arg: &str) -> String {
    Path::new(arg)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| arg.to_string())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { root, db_path }) => {
            let root = PathBuf::from(root);
            let db_path = resolve_db_path(&root, db_path);
            info!("Initializing manifest database at: {}", db_path);
            tarpkg::db::init(&db_path)?;
            println!("Database initialized successfully at: {}", db_path);
            Ok(())
        }
        Some(Commands::Update {
            tarball,
            root,
            db_path,
        }) => {
            let root = PathBuf::from(root);
            let db_path = resolve_db_path(&root, db_path);
            let mut store = ManifestStore::open(&db_path)?;

            let mut failed = 0usize;
            for path in &tarball {
                match reconcile::update(Path::new(path), &root, &mut store) {
                    Ok(UpdateOutcome::Installed { entries }) => {
                        println!("Installed {}: {} entries", base_name(path), entries);
                    }
                    Ok(UpdateOutcome::Updated { extracted, removed }) => {
                        println!(
                            "Updated {}: {} extracted, {} removed",
                            base_name(path),
                            extracted,
                            removed
                        );
                    }
                    Err(e) => {
                        eprintln!("Failed to update {}: {}", path, e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                return Err(anyhow::anyhow!(
                    "{} of {} packages failed",
                    failed,
                    tarball.len()
                ));
            }
            Ok(())
        }
        Some(Commands::Delete {
            tarball,
            root,
            db_path,
        }) => {
            let root = PathBuf::from(root);
            let db_path = resolve_db_path(&root, db_path);
            let mut store = ManifestStore::open(&db_path)?;

            let mut failed = 0usize;
            for arg in &tarball {
                let name = base_name(arg);
                match reconcile::delete(&name, &root, &mut store) {
                    Ok(removed) => {
                        println!("Deleted {}: {} files removed", name, removed);
                    }
                    Err(e) => {
                        eprintln!("Failed to delete {}: {}", name, e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                return Err(anyhow::anyhow!(
                    "{} of {} packages failed",
                    failed,
                    tarball.len()
                ));
            }
            Ok(())
        }
        Some(Commands::List { root, db_path }) => {
            let root = PathBuf::from(root);
            let db_path = resolve_db_path(&root, db_path);
            let store = ManifestStore::open(&db_path)?;

            let names = reconcile::list(&store)?;
            if names.is_empty() {
                println!("No packages installed.");
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
            Ok(())
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tarpkg", &mut std::io::stdout());
            Ok(())
        }
        None => {
            // No command provided, show help
            println!("Tarpkg Package Tracker v{}", env!("CARGO_PKG_VERSION"));
            println!("Run 'tarpkg --help' for usage information");
            Ok(())
        }
    }
}
