//! SecureStore developer CLI.
//!
//! Drives [`SecureStorage`] from a terminal with the in-process software
//! vault, a JSON file store and a y/N confirmation standing in for the
//! biometric prompt. The private key is kept as a PEM file next to the
//! entries, so this tool is for development only.

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr as _};
use securestore_core::config::DEFAULT_KEY_SIZE_BITS;
use securestore_core::vault::{SoftwareKeyVault, VaultBackend};
use securestore_core::{
    Authenticator, BiometricGate, FileStore, PlatformCapabilities, SecureStorage,
    SecureStorageConfig,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod prompt;

use prompt::TerminalPrompt;

/// Biometric-gated encrypted key-value storage, from the terminal.
#[derive(Debug, Parser)]
#[command(name = "securestore", author, version, about)]
struct Cli {
    /// Directory holding the entries and the development private key.
    /// Defaults to `<data dir>/securestore`.
    #[arg(long, env = "SECURESTORE_ROOT")]
    root: Option<PathBuf>,

    /// Application id the keypair alias is derived from.
    #[arg(long, env = "SECURESTORE_APP_ID", default_value = "dev.securestore.cli")]
    app_id: String,

    /// Authenticators accepted by a newly created key and offered by the
    /// prompt, comma separated: `biometric_strong`, `device_credential`.
    #[arg(long, value_delimiter = ',')]
    authenticators: Vec<Authenticator>,

    /// RSA modulus size used when the keypair is first created. An existing
    /// key keeps its own size.
    #[arg(long, default_value_t = DEFAULT_KEY_SIZE_BITS)]
    key_size: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encrypt VALUE and store it under KEY
    Set {
        key: String,
        value: String,
        /// VALUE is base64 encoded bytes
        #[arg(long)]
        base64: bool,
    },
    /// Authenticate and print the value stored under KEY
    Get {
        key: String,
        /// Print the value base64 encoded
        #[arg(long)]
        base64: bool,
    },
    /// List stored keys
    Keys,
    /// Delete the entry under KEY
    Remove { key: String },
    /// Delete every entry
    Clear,
}

impl Cli {
    fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("securestore"))
                .ok_or_else(|| eyre!("no data directory on this platform, pass --root")),
        }
    }

    fn open_storage(&self) -> Result<SecureStorage> {
        let root = self.root()?;
        let mut config = SecureStorageConfig::for_app(self.app_id.clone());
        if !self.authenticators.is_empty() {
            config.allowed_authenticators.clone_from(&self.authenticators);
        }
        let alias = config.key_alias();

        let vault = Arc::new(SoftwareKeyVault::persistent(&root));
        vault
            .load_persisted(&alias)
            .wrap_err_with(|| format!("failed to load the private key from {}", root.display()))?;
        config.key_size_bits = vault.key_size_bits(&alias).unwrap_or(self.key_size);

        let store = Arc::new(
            FileStore::open_in(&root)
                .wrap_err_with(|| format!("failed to open store in {}", root.display()))?,
        );
        let storage = SecureStorage::with_backend(
            &config,
            PlatformCapabilities {
                hardware_keystore: false,
                authenticator_selection: true,
            },
            VaultBackend::Software(vault),
            store,
            BiometricGate::global(),
        )?;
        debug!("opened {} in {}", storage.alias(), root.display());
        Ok(storage)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let storage = cli.open_storage()?;
    match cli.command {
        Command::Set { key, value, base64 } => {
            let value = if base64 {
                STANDARD
                    .decode(value.trim())
                    .wrap_err("VALUE is not valid base64")?
            } else {
                value.into_bytes()
            };
            storage.set_data(key, value)?;
        }
        Command::Get { key, base64 } => {
            let Some(value) = storage
                .get_data(key.clone(), Arc::new(TerminalPrompt))
                .await?
            else {
                return Err(eyre!("no entry for {key}"));
            };
            if base64 {
                println!("{}", STANDARD.encode(&value));
            } else {
                let text = String::from_utf8(value)
                    .map_err(|_| eyre!("value of {key} is not UTF-8, use --base64"))?;
                println!("{text}");
            }
        }
        Command::Keys => {
            for key in storage.keys()? {
                println!("{key}");
            }
        }
        Command::Remove { key } => storage.remove(key)?,
        Command::Clear => storage.clear()?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
