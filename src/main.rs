//! Algo-Atomic CLI Application
//!
//! A command-line interface for building, grouping and inspecting
//! transactions.

use algo_atomic::cli;
use algo_atomic::config::CliConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "algo-atomic")]
#[command(version = "0.1.0")]
#[command(about = "Atomic transaction groups, multisig and ABI tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new ed25519 key
    Keygen,

    /// Compute a multisig account address
    MsigAddress {
        /// Multisig version
        #[arg(long, default_value = "1")]
        version: u8,

        /// Signatures required
        #[arg(long)]
        threshold: u8,

        /// Member addresses, in order
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Group id operations on base64 transactions (one per line)
    Group {
        #[command(subcommand)]
        action: GroupCommands,
    },

    /// ABI encoding and method descriptors
    Abi {
        #[command(subcommand)]
        action: AbiCommands,
    },

    /// Multisig signature operations
    Msig {
        #[command(subcommand)]
        action: MsigCommands,
    },

    /// Transaction construction and inspection
    Txn {
        #[command(subcommand)]
        action: TxnCommands,
    },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// Assign a group id and print the grouped transactions
    Assign {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Check that all transactions form one valid group
    Verify {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Split into groups and check each one
    Find {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum AbiCommands {
    /// Encode a JSON value, print hex
    Encode {
        #[arg(short, long = "type")]
        type_name: String,
        #[arg(short, long)]
        value: String,
    },
    /// Decode hex bytes, print JSON
    Decode {
        #[arg(short, long = "type")]
        type_name: String,
        #[arg(long)]
        hex: String,
    },
    /// Show a method's selector and JSON description
    Method {
        #[arg(short, long)]
        signature: String,
    },
}

#[derive(Subcommand)]
enum MsigCommands {
    /// Merge two partially signed transactions (base64)
    Merge { first: String, second: String },
}

#[derive(Subcommand)]
enum TxnCommands {
    /// Build an unsigned payment
    Pay {
        #[arg(short, long)]
        from: String,
        #[arg(short, long)]
        to: String,
        #[arg(short, long)]
        amount: u64,
        #[arg(short, long)]
        note: Option<String>,
        /// Suggested params JSON file
        #[arg(short, long)]
        params: Option<PathBuf>,
    },
    /// Print a base64 transaction as JSON
    Show {
        #[arg(short, long)]
        input: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::default();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen => cli::cmd_keygen()?,
        Commands::MsigAddress {
            version,
            threshold,
            addresses,
        } => cli::cmd_msig_address(version, threshold, &addresses)?,
        Commands::Group { action } => match action {
            GroupCommands::Assign { input } => cli::cmd_group_assign(&input)?,
            GroupCommands::Verify { input } => cli::cmd_group_verify(&input)?,
            GroupCommands::Find { input } => cli::cmd_group_find(&input)?,
        },
        Commands::Abi { action } => match action {
            AbiCommands::Encode { type_name, value } => cli::cmd_abi_encode(&type_name, &value)?,
            AbiCommands::Decode { type_name, hex } => cli::cmd_abi_decode(&type_name, &hex)?,
            AbiCommands::Method { signature } => cli::cmd_abi_method(&signature)?,
        },
        Commands::Msig { action } => match action {
            MsigCommands::Merge { first, second } => cli::cmd_msig_merge(&first, &second)?,
        },
        Commands::Txn { action } => match action {
            TxnCommands::Pay {
                from,
                to,
                amount,
                note,
                params,
            } => {
                let params = params.unwrap_or(config.params_file);
                cli::cmd_txn_pay(&from, &to, amount, note.as_deref(), &params)?
            }
            TxnCommands::Show { input } => cli::cmd_txn_show(&input)?,
        },
    }

    Ok(())
}
