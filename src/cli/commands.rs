//! CLI commands
//!
//! Implements all command handlers for the CLI interface. Encoded
//! transactions are exchanged as standard base64, one per line.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::abi::{Method, Type};
use crate::config::SuggestedParamsFile;
use crate::core::{
    assign_group_id_encoded, find_and_verify_groups_encoded, verify_group_id_encoded,
    Transaction, TransactionBuilder,
};
use crate::crypto::{Address, KeyPair};
use crate::multisig::{merge_multisig_encoded, MultisigAccount};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Read base64 blobs, one per non-empty line
pub fn read_encoded_lines(path: &Path) -> CliResult<Vec<Vec<u8>>> {
    let text = fs::read_to_string(path)?;
    let mut blobs = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let blob = STANDARD
            .decode(line)
            .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
        blobs.push(blob);
    }
    Ok(blobs)
}

/// Generate a new key pair
pub fn cmd_keygen() -> CliResult<()> {
    let key = KeyPair::generate();

    println!("🔐 New key generated!");
    println!("   📍 Address: {}", key.address());
    println!("   🔑 Private key: {}", STANDARD.encode(key.private_key()));
    println!("\n   ⚠️  IMPORTANT: Keep the private key secret.");

    Ok(())
}

/// Print the address of a multisig account
pub fn cmd_msig_address(version: u8, threshold: u8, addresses: &[String]) -> CliResult<()> {
    let keys = addresses
        .iter()
        .map(|a| a.parse::<Address>())
        .collect::<Result<Vec<_>, _>>()?;
    let account = MultisigAccount::new(version, threshold, keys)?;

    println!("🔐 Multisig account");
    println!("   📍 Address: {}", account.address());
    println!("   🔧 {}", account.description());
    for (slot, key) in account.public_keys().iter().enumerate() {
        println!("   └─ [{}] {}", slot, key);
    }

    Ok(())
}

/// Assign a group id to the transactions in `input`
pub fn cmd_group_assign(input: &Path) -> CliResult<()> {
    let encoded = read_encoded_lines(input)?;
    for blob in assign_group_id_encoded(&encoded)? {
        println!("{}", STANDARD.encode(blob));
    }
    Ok(())
}

/// Check that the transactions in `input` form one valid group
pub fn cmd_group_verify(input: &Path) -> CliResult<()> {
    let encoded = read_encoded_lines(input)?;
    if verify_group_id_encoded(&encoded)? {
        println!("✅ Group of {} transaction(s) is valid", encoded.len());
    } else {
        println!("❌ Group of {} transaction(s) is NOT valid", encoded.len());
    }
    Ok(())
}

/// Split the transactions in `input` into groups and check each one
pub fn cmd_group_find(input: &Path) -> CliResult<()> {
    let encoded = read_encoded_lines(input)?;
    let segments = find_and_verify_groups_encoded(&encoded)?;

    println!("📋 {} transaction(s):", encoded.len());
    for (index, segment) in segments.iter().enumerate() {
        println!("   {} -> group {}", index, segment);
    }
    Ok(())
}

/// Encode an ABI value given as JSON
pub fn cmd_abi_encode(type_name: &str, value: &str) -> CliResult<()> {
    let ty: Type = type_name.parse()?;
    println!("{}", hex::encode(ty.encode_json(value)?));
    Ok(())
}

/// Decode hex bytes as an ABI value and print its JSON
pub fn cmd_abi_decode(type_name: &str, hex_bytes: &str) -> CliResult<()> {
    let ty: Type = type_name.parse()?;
    let bytes = hex::decode(hex_bytes.trim_start_matches("0x"))?;
    println!("{}", ty.decode_json(&bytes)?);
    Ok(())
}

/// Describe a method signature
pub fn cmd_abi_method(signature: &str) -> CliResult<()> {
    let method = Method::from_signature(signature)?;

    println!("📜 Method {}", method.signature());
    println!("   ├─ Selector: {}", hex::encode(method.selector()));
    println!("   ├─ Transactions: {}", method.tx_count());
    println!("   └─ JSON: {}", method.to_json()?);
    Ok(())
}

/// Merge two partially signed multisig transactions
pub fn cmd_msig_merge(first: &str, second: &str) -> CliResult<()> {
    let first = STANDARD.decode(first.trim())?;
    let second = STANDARD.decode(second.trim())?;
    println!("{}", STANDARD.encode(merge_multisig_encoded(&first, &second)?));
    Ok(())
}

/// Build an unsigned payment
pub fn cmd_txn_pay(
    from: &str,
    to: &str,
    amount: u64,
    note: Option<&str>,
    params_file: &Path,
) -> CliResult<()> {
    let params = SuggestedParamsFile::load(params_file)?.to_params()?;
    let mut builder = TransactionBuilder::payment(from.parse()?, to.parse()?, amount);
    if let Some(note) = note {
        builder = builder.note(note.as_bytes().to_vec());
    }
    let txn = builder.build(&params)?;

    log::info!("Built payment {} with fee {}", txn.id_string()?, txn.fee);
    println!("{}", STANDARD.encode(txn.encode()?));
    Ok(())
}

/// Decode a base64 transaction and print it as JSON
pub fn cmd_txn_show(input: &str) -> CliResult<()> {
    let txn = Transaction::decode(&STANDARD.decode(input.trim())?)?;

    println!("🧾 Transaction {}", txn.id_string()?);
    println!("{}", serde_json::to_string_pretty(&txn)?);
    Ok(())
}
