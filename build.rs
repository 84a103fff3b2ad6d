// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("tarpkg")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Tarpkg Contributors")
        .about("Tarball package tracker with differential updates")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Initialize the manifest database")
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value(".")
                        .help("Root directory packages are installed under"),
                )
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .value_name("PATH")
                        .help("Database path (default: <root>/.tarpkg/tarpkg.db)"),
                ),
        )
        .subcommand(
            Command::new("update")
                .about("Install or update tarballs into the root directory")
                .arg(
                    Arg::new("tarball")
                        .required(true)
                        .num_args(1..)
                        .help("Paths to the tarball files"),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value(".")
                        .help("Root directory packages are installed under"),
                )
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .help("Database path (default: <root>/.tarpkg/tarpkg.db)"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete installed packages and their files")
                .arg(
                    Arg::new("tarball")
                        .required(true)
                        .num_args(1..)
                        .help("Package names (a path is reduced to its base name)"),
                )
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value(".")
                        .help("Root directory packages are installed under"),
                )
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .help("Database path (default: <root>/.tarpkg/tarpkg.db)"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List installed packages")
                .arg(
                    Arg::new("root")
                        .short('r')
                        .long("root")
                        .default_value(".")
                        .help("Root directory packages are installed under"),
                )
                .arg(
                    Arg::new("db_path")
                        .short('d')
                        .long("db-path")
                        .help("Database path (default: <root>/.tarpkg/tarpkg.db)"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("tarpkg.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
