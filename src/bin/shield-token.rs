use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use request_shield::config::{self, ShieldConfig, TokenFormat};
use request_shield::crypto::{Keyring, PayloadCodec, StaticKeyProvider};

#[derive(Parser)]
#[command(name = "shield-token")]
#[command(about = "Encrypt and decrypt request-shield payload tokens", long_about = None)]
struct Cli {
    /// Configuration file naming the key sources
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Token format for `encrypt` (overrides the configuration)
    #[arg(short, long, value_parser = parse_format)]
    format: Option<TokenFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text into a token ("-" reads stdin)
    Encrypt { text: String },
    /// Decrypt a token back into text ("-" reads stdin)
    Decrypt { token: String },
}

fn parse_format(value: &str) -> Result<TokenFormat, String> {
    match value {
        "aead-v1" => Ok(TokenFormat::AeadV1),
        "legacy-cbc" => Ok(TokenFormat::LegacyCbc),
        other => Err(format!("unknown token format '{}' (aead-v1 | legacy-cbc)", other)),
    }
}

fn read_arg(value: String) -> Result<String, std::io::Error> {
    if value != "-" {
        return Ok(value);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ShieldConfig::default(),
    };
    if let Some(format) = cli.format {
        config.codec.format = format;
    }

    let keyring = Keyring::from_config(&config.codec, |name| std::env::var(name).ok())?;
    let codec = PayloadCodec::new(Arc::new(StaticKeyProvider::new(keyring)), config.codec.format);

    match cli.command {
        Commands::Encrypt { text } => {
            println!("{}", codec.encrypt(&read_arg(text)?)?);
        }
        Commands::Decrypt { token } => {
            println!("{}", codec.decrypt(&read_arg(token)?)?);
        }
    }

    Ok(())
}
