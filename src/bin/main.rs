use clap::{Parser, Subcommand};
use orikomi::config::{
    self, FoldingSettings, defaults, load_config_file, load_user_config, user_config_path,
};
use orikomi::folding::{ParsedSignature, parse_signature};
use std::path::{Path, PathBuf};

const PROJECT_CONFIG_FILE: &str = "orikomi.toml";

/// Inspect orikomi folding configuration and signatures
#[derive(Parser)]
#[command(name = "orikomi")]
#[command(version)]
#[command(about = "Inspect orikomi folding configuration and signatures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Work with region signatures
    Signature {
        #[command(subcommand)]
        command: SignatureCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write the default configuration
    Init {
        /// Target file (default: the user configuration file)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings (defaults, user, project)
    Show {
        /// Project configuration file
        #[arg(long, default_value = PROJECT_CONFIG_FILE)]
        project: PathBuf,

        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SignatureCommand {
    /// Decode a signature string and print its parts
    Parse {
        signature: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config { command } => match command {
            ConfigCommand::Init {
                output,
                stdout,
                force,
            } => init_config(output, stdout, force),
            ConfigCommand::Show { project, json } => show_config(&project, json),
        },
        Commands::Signature {
            command: SignatureCommand::Parse { signature },
        } => describe_signature(&signature),
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

fn init_config(output: Option<PathBuf>, stdout: bool, force: bool) -> Result<(), String> {
    let content = defaults::default_settings_toml()
        .map_err(|e| format!("Failed to render default configuration: {}", e))?;
    if stdout {
        print!("{}", content);
        return Ok(());
    }

    let path = output.or_else(user_config_path).ok_or_else(|| {
        "Could not determine the configuration directory. Please specify --output.".to_string()
    })?;
    if path.exists() && !force {
        return Err(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&path, content)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    eprintln!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn show_config(project: &Path, json: bool) -> Result<(), String> {
    let user = load_user_config().map_err(|e| e.to_string())?;
    let project = load_config_file(project).map_err(|e| e.to_string())?;
    let effective: FoldingSettings =
        config::merge_all(&[Some(defaults::default_settings()), user, project]).unwrap_or_default();

    let rendered = if json {
        serde_json::to_string_pretty(&effective).map_err(|e| e.to_string())?
    } else {
        toml::to_string_pretty(&effective).map_err(|e| e.to_string())?
    };
    println!("{}", rendered);
    Ok(())
}

fn describe_signature(signature: &str) -> Result<(), String> {
    match parse_signature(signature).map_err(|e| e.to_string())? {
        ParsedSignature::Generic { range, index } => {
            println!("strategy: generic");
            println!("range: {}", range);
            println!("ancestor index: {}", index);
        }
        ParsedSignature::Kind { kind, range } => {
            println!("strategy: kind");
            println!("kind: {}", kind);
            println!("range: {}", range);
        }
    }
    Ok(())
}
