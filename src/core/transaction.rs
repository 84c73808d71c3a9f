//! Transaction model
//!
//! A transaction is one flat record: a common header (sender, fee, validity
//! window, genesis, group, lease, rekey) plus the fields of exactly one
//! transaction type. Encoding is canonical msgpack, so field declaration
//! order below is the sorted wire-key order and every field that can be
//! empty is skipped when empty.
//!
//! The builder covers payments, key registration, assets and application
//! calls. Fees are flat or per byte of the signed encoding, never below
//! [`MIN_TXN_FEE`]. Ids hash the encoding under the `"TX"` prefix.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use super::encoding::{self, base64_bytes, bytes_list, is_false, is_zero, EncodingError};
use super::signed::SignedTxn;
use crate::crypto::{
    hash_with_prefix, with_prefix, Address, Digest, KeyError, Signature, SIGNATURE_LEN,
    TX_PREFIX,
};

// =============================================================================
// Constants
// =============================================================================

/// Minimum fee for any transaction, in microalgos
pub const MIN_TXN_FEE: u64 = 1000;

/// Maximum number of transactions in one atomic group
pub const MAX_TX_GROUP_SIZE: usize = 16;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("all integer arguments must be >= 0: {0}")]
    NegativeArgument(String),
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("the app id {0} provided for this box is not in the foreignApps array")]
    UnknownBoxApp(u64),
    #[error("Unknown transaction type: {0}")]
    UnknownType(String),
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

// =============================================================================
// Enumerations
// =============================================================================

/// Transaction type tag (`type` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    #[default]
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
}

impl TxType {
    /// Wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            TxType::Payment => "pay",
            TxType::KeyRegistration => "keyreg",
            TxType::AssetConfig => "acfg",
            TxType::AssetTransfer => "axfer",
            TxType::AssetFreeze => "afrz",
            TxType::ApplicationCall => "appl",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pay" => Ok(TxType::Payment),
            "keyreg" => Ok(TxType::KeyRegistration),
            "acfg" => Ok(TxType::AssetConfig),
            "axfer" => Ok(TxType::AssetTransfer),
            "afrz" => Ok(TxType::AssetFreeze),
            "appl" => Ok(TxType::ApplicationCall),
            other => Err(TransactionError::UnknownType(other.to_string())),
        }
    }
}

impl Serialize for TxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TxType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Side effect of an application call (`apan` on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnCompletion {
    #[default]
    NoOp,
    OptIn,
    CloseOut,
    ClearState,
    UpdateApplication,
    DeleteApplication,
}

impl OnCompletion {
    /// Numeric wire value
    pub fn as_u64(&self) -> u64 {
        match self {
            OnCompletion::NoOp => 0,
            OnCompletion::OptIn => 1,
            OnCompletion::CloseOut => 2,
            OnCompletion::ClearState => 3,
            OnCompletion::UpdateApplication => 4,
            OnCompletion::DeleteApplication => 5,
        }
    }

    /// Parse the numeric wire value
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(OnCompletion::NoOp),
            1 => Some(OnCompletion::OptIn),
            2 => Some(OnCompletion::CloseOut),
            3 => Some(OnCompletion::ClearState),
            4 => Some(OnCompletion::UpdateApplication),
            5 => Some(OnCompletion::DeleteApplication),
            _ => None,
        }
    }

    /// Parse a lowercase action name such as `optin` or `delete`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "noop" => Some(OnCompletion::NoOp),
            "optin" => Some(OnCompletion::OptIn),
            "closeout" => Some(OnCompletion::CloseOut),
            "clearstate" => Some(OnCompletion::ClearState),
            "update" | "updateapplication" => Some(OnCompletion::UpdateApplication),
            "delete" | "deleteapplication" => Some(OnCompletion::DeleteApplication),
            _ => None,
        }
    }
}

impl Serialize for OnCompletion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.as_u64())
    }
}

impl<'de> Deserialize<'de> for OnCompletion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u64::deserialize(deserializer)?;
        OnCompletion::from_u64(value)
            .ok_or_else(|| de::Error::custom(format!("invalid on-completion value {}", value)))
    }
}

// =============================================================================
// Nested Records
// =============================================================================

/// Parameters of an asset (`apar`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetParams {
    #[serde(rename = "am", default, skip_serializing_if = "Digest::is_zero")]
    pub metadata_hash: Digest,
    #[serde(rename = "an", default, skip_serializing_if = "String::is_empty")]
    pub asset_name: String,
    #[serde(rename = "au", default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "c", default, skip_serializing_if = "Address::is_zero")]
    pub clawback: Address,
    #[serde(rename = "dc", default, skip_serializing_if = "is_zero")]
    pub decimals: u32,
    #[serde(rename = "df", default, skip_serializing_if = "is_false")]
    pub default_frozen: bool,
    #[serde(rename = "f", default, skip_serializing_if = "Address::is_zero")]
    pub freeze: Address,
    #[serde(rename = "m", default, skip_serializing_if = "Address::is_zero")]
    pub manager: Address,
    #[serde(rename = "r", default, skip_serializing_if = "Address::is_zero")]
    pub reserve: Address,
    #[serde(rename = "t", default, skip_serializing_if = "is_zero")]
    pub total: u64,
    #[serde(rename = "un", default, skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
}

/// Storage limits of an application (`apgs` / `apls`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSchema {
    #[serde(rename = "nbs", default, skip_serializing_if = "is_zero")]
    pub num_byte_slice: u64,
    #[serde(rename = "nui", default, skip_serializing_if = "is_zero")]
    pub num_uint: u64,
}

impl StateSchema {
    /// Create a new schema
    pub fn new(num_uint: u64, num_byte_slice: u64) -> Self {
        Self {
            num_byte_slice,
            num_uint,
        }
    }
}

/// Box reference as it appears on the wire (`apbx`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoxReference {
    /// 0 for the called app, otherwise 1 + position in the foreign apps
    #[serde(rename = "i", default, skip_serializing_if = "is_zero")]
    pub foreign_app_index: u64,
    #[serde(rename = "n", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<u8>,
}

/// Box reference as a caller names it: by application id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBoxReference {
    pub app_id: u64,
    #[serde(with = "serde_bytes")]
    pub name: Vec<u8>,
}

impl AppBoxReference {
    /// Create a new box reference
    pub fn new(app_id: u64, name: impl Into<Vec<u8>>) -> Self {
        Self {
            app_id,
            name: name.into(),
        }
    }
}

/// Resolve caller box references into wire box references
///
/// A box of app 0 or of the called app gets index 0; any other app must
/// appear in `foreign_apps` and gets its 1-based position there.
pub fn resolve_box_references(
    boxes: &[AppBoxReference],
    foreign_apps: &[u64],
    current_app: u64,
) -> Result<Vec<BoxReference>, TransactionError> {
    boxes
        .iter()
        .map(|b| {
            let index = if b.app_id == 0 || b.app_id == current_app {
                0
            } else {
                let pos = foreign_apps
                    .iter()
                    .position(|app| *app == b.app_id)
                    .ok_or(TransactionError::UnknownBoxApp(b.app_id))?;
                pos as u64 + 1
            };
            Ok(BoxReference {
                foreign_app_index: index,
                name: b.name.clone(),
            })
        })
        .collect()
}

// =============================================================================
// Suggested Parameters
// =============================================================================

/// Network parameters a caller supplies for new transactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestedParams {
    /// Per-byte fee, or the whole fee when `flat_fee` is set
    pub fee: u64,
    pub genesis_id: String,
    pub genesis_hash: Digest,
    pub first_valid: u64,
    pub last_valid: u64,
    pub flat_fee: bool,
}

// =============================================================================
// Transaction
// =============================================================================

/// A transaction of any type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    #[serde(rename = "aamt", default, skip_serializing_if = "is_zero")]
    pub asset_amount: u64,
    #[serde(rename = "aclose", default, skip_serializing_if = "Address::is_zero")]
    pub asset_close_to: Address,
    #[serde(rename = "afrz", default, skip_serializing_if = "is_false")]
    pub asset_frozen: bool,
    #[serde(rename = "amt", default, skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", default, with = "bytes_list", skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<Vec<u8>>,
    #[serde(rename = "apan", default, skip_serializing_if = "is_zero")]
    pub on_completion: OnCompletion,
    #[serde(rename = "apap", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub approval_program: Vec<u8>,
    #[serde(rename = "apar", default, skip_serializing_if = "is_zero")]
    pub asset_params: AssetParams,
    #[serde(rename = "apas", default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<u64>,
    #[serde(rename = "apat", default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Address>,
    #[serde(rename = "apbx", default, skip_serializing_if = "Vec::is_empty")]
    pub box_references: Vec<BoxReference>,
    #[serde(rename = "apep", default, skip_serializing_if = "is_zero")]
    pub extra_program_pages: u32,
    #[serde(rename = "apfa", default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_apps: Vec<u64>,
    #[serde(rename = "apgs", default, skip_serializing_if = "is_zero")]
    pub global_state_schema: StateSchema,
    #[serde(rename = "apid", default, skip_serializing_if = "is_zero")]
    pub application_id: u64,
    #[serde(rename = "apls", default, skip_serializing_if = "is_zero")]
    pub local_state_schema: StateSchema,
    #[serde(rename = "apsu", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub clear_state_program: Vec<u8>,
    #[serde(rename = "arcv", default, skip_serializing_if = "Address::is_zero")]
    pub asset_receiver: Address,
    #[serde(rename = "asnd", default, skip_serializing_if = "Address::is_zero")]
    pub asset_sender: Address,
    #[serde(rename = "caid", default, skip_serializing_if = "is_zero")]
    pub config_asset: u64,
    #[serde(rename = "close", default, skip_serializing_if = "Address::is_zero")]
    pub close_remainder_to: Address,
    #[serde(rename = "fadd", default, skip_serializing_if = "Address::is_zero")]
    pub freeze_account: Address,
    #[serde(rename = "faid", default, skip_serializing_if = "is_zero")]
    pub freeze_asset: u64,
    #[serde(rename = "fee", default, skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", default, skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", default, skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh", default, skip_serializing_if = "Digest::is_zero")]
    pub genesis_hash: Digest,
    #[serde(rename = "grp", default, skip_serializing_if = "Digest::is_zero")]
    pub group: Digest,
    #[serde(rename = "lv", default, skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(rename = "lx", default, skip_serializing_if = "Digest::is_zero")]
    pub lease: Digest,
    #[serde(rename = "nonpart", default, skip_serializing_if = "is_false")]
    pub non_participation: bool,
    #[serde(rename = "note", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<u8>,
    #[serde(rename = "rcv", default, skip_serializing_if = "Address::is_zero")]
    pub receiver: Address,
    #[serde(rename = "rekey", default, skip_serializing_if = "Address::is_zero")]
    pub rekey_to: Address,
    #[serde(rename = "selkey", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub selection_key: Vec<u8>,
    #[serde(rename = "snd", default, skip_serializing_if = "Address::is_zero")]
    pub sender: Address,
    #[serde(rename = "sprfkey", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub state_proof_key: Vec<u8>,
    #[serde(rename = "type", default)]
    pub tx_type: TxType,
    #[serde(rename = "votefst", default, skip_serializing_if = "is_zero")]
    pub vote_first: u64,
    #[serde(rename = "votekd", default, skip_serializing_if = "is_zero")]
    pub vote_key_dilution: u64,
    #[serde(rename = "votekey", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub vote_key: Vec<u8>,
    #[serde(rename = "votelst", default, skip_serializing_if = "is_zero")]
    pub vote_last: u64,
    #[serde(rename = "xaid", default, skip_serializing_if = "is_zero")]
    pub xfer_asset: u64,
}

impl Transaction {
    /// Canonical msgpack bytes
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(encoding::encode(self)?)
    }

    /// Decode from canonical msgpack bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        Ok(encoding::decode(bytes)?)
    }

    /// Bytes covered by a signature: `"TX" || encode(txn)`
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(with_prefix(TX_PREFIX, &self.encode()?))
    }

    /// Raw transaction id
    pub fn id(&self) -> Result<Digest, TransactionError> {
        Ok(Digest(hash_with_prefix(TX_PREFIX, &self.encode()?)))
    }

    /// Transaction id in its base32 text form
    pub fn id_string(&self) -> Result<String, TransactionError> {
        Ok(BASE32_NOPAD.encode(self.id()?.as_bytes()))
    }

    /// Whether a group id has been assigned
    pub fn has_group(&self) -> bool {
        !self.group.is_zero()
    }

    /// Size of this transaction once wrapped with a single signature
    pub fn estimate_size(&self) -> Result<u64, TransactionError> {
        let signed = SignedTxn {
            sig: Some(Signature::from_bytes([0u8; SIGNATURE_LEN])),
            ..SignedTxn::new(self.clone())
        };
        Ok(signed.encode()?.len() as u64)
    }

    /// Apply the fee rule for the given parameters
    ///
    /// Flat fees are copied as-is. Per-byte fees are multiplied by the
    /// estimated signed size, measured while the fee field still holds the
    /// per-byte rate, and raised to [`MIN_TXN_FEE`].
    pub fn apply_fee(&mut self, params: &SuggestedParams) -> Result<(), TransactionError> {
        self.fee = params.fee;
        if !params.flat_fee {
            let size = self.estimate_size()?;
            let fee = size.checked_mul(params.fee).ok_or_else(|| {
                TransactionError::InvalidTransaction("fee overflows u64".to_string())
            })?;
            self.fee = fee.max(MIN_TXN_FEE);
        }
        Ok(())
    }
}

/// Convert a msgpack transaction to its JSON form
///
/// JSON keeps the wire keys; byte strings, addresses and hashes are base64.
pub fn transaction_msgpack_to_json(encoded: &[u8]) -> Result<String, TransactionError> {
    let txn = Transaction::decode(encoded)?;
    Ok(serde_json::to_string(&txn).map_err(EncodingError::from)?)
}

/// Convert a JSON transaction to canonical msgpack
pub fn transaction_json_to_msgpack(json: &str) -> Result<Vec<u8>, TransactionError> {
    let txn: Transaction = serde_json::from_str(json).map_err(EncodingError::from)?;
    txn.encode()
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Participation keys for an online key registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipationKeys {
    pub vote_key: Vec<u8>,
    pub selection_key: Vec<u8>,
    pub state_proof_key: Vec<u8>,
    pub vote_first: u64,
    pub vote_last: u64,
    pub vote_key_dilution: u64,
}

/// Fields of an application call, with box references named by app id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppCall {
    pub app_id: u64,
    pub on_completion: OnCompletion,
    pub app_args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
    pub boxes: Vec<AppBoxReference>,
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u32,
}

/// Builder for creating transactions with all options
///
/// Type-specific fields are set by the constructor; header options are
/// chained; [`TransactionBuilder::build`] fills in the validity window and
/// computes the fee last so that it covers every field.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    txn: Transaction,
    /// Rekey target set only after the fee is computed
    rekey_after_fee: Option<Address>,
}

impl TransactionBuilder {
    fn with_type(sender: Address, tx_type: TxType) -> Self {
        Self {
            txn: Transaction {
                sender,
                tx_type,
                ..Default::default()
            },
            rekey_after_fee: None,
        }
    }

    /// Payment of `amount` microalgos
    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        let mut builder = Self::with_type(sender, TxType::Payment);
        builder.txn.receiver = receiver;
        builder.txn.amount = amount;
        builder
    }

    /// Zero payment to self that moves signing authority to `rekey_to`
    ///
    /// The fee is sized without the rekey field.
    pub fn rekey(sender: Address, rekey_to: Address) -> Self {
        let mut builder = Self::payment(sender, sender, 0);
        builder.rekey_after_fee = Some(rekey_to);
        builder
    }

    /// Register participation keys (go online)
    pub fn key_registration_online(sender: Address, keys: ParticipationKeys) -> Self {
        let mut builder = Self::with_type(sender, TxType::KeyRegistration);
        builder.txn.vote_key = keys.vote_key;
        builder.txn.selection_key = keys.selection_key;
        builder.txn.state_proof_key = keys.state_proof_key;
        builder.txn.vote_first = keys.vote_first;
        builder.txn.vote_last = keys.vote_last;
        builder.txn.vote_key_dilution = keys.vote_key_dilution;
        builder
    }

    /// Deregister participation keys (go offline)
    pub fn key_registration_offline(sender: Address) -> Self {
        Self::with_type(sender, TxType::KeyRegistration)
    }

    /// Mark the account as permanently non-participating
    pub fn key_registration_nonparticipating(sender: Address) -> Self {
        let mut builder = Self::with_type(sender, TxType::KeyRegistration);
        builder.txn.non_participation = true;
        builder
    }

    /// Create a new asset
    pub fn asset_create(sender: Address, params: AssetParams) -> Self {
        let mut builder = Self::with_type(sender, TxType::AssetConfig);
        builder.txn.asset_params = params;
        builder
    }

    /// Change the management addresses of an asset
    pub fn asset_config(
        sender: Address,
        asset_id: u64,
        manager: Address,
        reserve: Address,
        freeze: Address,
        clawback: Address,
    ) -> Self {
        let mut builder = Self::with_type(sender, TxType::AssetConfig);
        builder.txn.config_asset = asset_id;
        builder.txn.asset_params = AssetParams {
            manager,
            reserve,
            freeze,
            clawback,
            ..Default::default()
        };
        builder
    }

    /// Destroy an asset
    pub fn asset_destroy(sender: Address, asset_id: u64) -> Self {
        let mut builder = Self::with_type(sender, TxType::AssetConfig);
        builder.txn.config_asset = asset_id;
        builder
    }

    /// Transfer `amount` units of an asset
    pub fn asset_transfer(sender: Address, receiver: Address, amount: u64, asset_id: u64) -> Self {
        let mut builder = Self::with_type(sender, TxType::AssetTransfer);
        builder.txn.asset_receiver = receiver;
        builder.txn.asset_amount = amount;
        builder.txn.xfer_asset = asset_id;
        builder
    }

    /// Opt in to an asset (zero transfer to self)
    pub fn asset_opt_in(sender: Address, asset_id: u64) -> Self {
        Self::asset_transfer(sender, sender, 0, asset_id)
    }

    /// Claw back `amount` units from `target` (sender must be the clawback address)
    pub fn asset_revoke(
        sender: Address,
        target: Address,
        receiver: Address,
        amount: u64,
        asset_id: u64,
    ) -> Self {
        let mut builder = Self::asset_transfer(sender, receiver, amount, asset_id);
        builder.txn.asset_sender = target;
        builder
    }

    /// Freeze or unfreeze an account's holding of an asset
    pub fn asset_freeze(sender: Address, asset_id: u64, target: Address, frozen: bool) -> Self {
        let mut builder = Self::with_type(sender, TxType::AssetFreeze);
        builder.txn.freeze_asset = asset_id;
        builder.txn.freeze_account = target;
        builder.txn.asset_frozen = frozen;
        builder
    }

    /// Application call of any kind (create, update, delete, opt-in, close-out, clear-state, no-op)
    pub fn application_call(sender: Address, call: AppCall) -> Result<Self, TransactionError> {
        let box_references = resolve_box_references(&call.boxes, &call.foreign_apps, call.app_id)?;
        let mut builder = Self::with_type(sender, TxType::ApplicationCall);
        let txn = &mut builder.txn;
        txn.application_id = call.app_id;
        txn.on_completion = call.on_completion;
        txn.app_args = call.app_args;
        txn.accounts = call.accounts;
        txn.foreign_apps = call.foreign_apps;
        txn.foreign_assets = call.foreign_assets;
        txn.box_references = box_references;
        txn.approval_program = call.approval_program;
        txn.clear_state_program = call.clear_program;
        txn.global_state_schema = call.global_schema;
        txn.local_state_schema = call.local_schema;
        txn.extra_program_pages = call.extra_pages;
        Ok(builder)
    }

    /// Close the sender's remaining algos to `to`
    pub fn close_remainder_to(mut self, to: Address) -> Self {
        self.txn.close_remainder_to = to;
        self
    }

    /// Close the sender's remaining asset holding to `to`
    pub fn asset_close_to(mut self, to: Address) -> Self {
        self.txn.asset_close_to = to;
        self
    }

    /// Attach a note
    pub fn note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.txn.note = note.into();
        self
    }

    /// Attach a lease
    pub fn lease(mut self, lease: Digest) -> Self {
        self.txn.lease = lease;
        self
    }

    /// Move signing authority after this transaction
    pub fn rekey_to(mut self, to: Address) -> Self {
        self.txn.rekey_to = to;
        self
    }

    /// Fill in network parameters and the fee
    pub fn build(mut self, params: &SuggestedParams) -> Result<Transaction, TransactionError> {
        if params.last_valid < params.first_valid {
            return Err(TransactionError::InvalidTransaction(format!(
                "last valid round {} is before first valid round {}",
                params.last_valid, params.first_valid
            )));
        }
        self.txn.first_valid = params.first_valid;
        self.txn.last_valid = params.last_valid;
        self.txn.genesis_id = params.genesis_id.clone();
        self.txn.genesis_hash = params.genesis_hash;
        self.txn.apply_fee(params)?;
        if let Some(rekey_to) = self.rekey_after_fee {
            self.txn.rekey_to = rekey_to;
        }
        Ok(self.txn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn b64(text: &str) -> Vec<u8> {
        STANDARD.decode(text).unwrap()
    }

    fn addr(text: &str) -> Address {
        text.parse().unwrap()
    }

    fn devnet_params() -> SuggestedParams {
        SuggestedParams {
            fee: 4,
            genesis_id: "devnet-v33.0".to_string(),
            genesis_hash: Digest::from_slice(&b64("JgsgCaCTqIaLeVhyL6XlRu3n7Rfk2FxMeK+wRSaQ7dI="))
                .unwrap(),
            first_valid: 12466,
            last_valid: 13466,
            flat_fee: false,
        }
    }

    #[test]
    fn test_payment_encoding() {
        let txn = TransactionBuilder::payment(
            addr("47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU"),
            addr("PNWOET7LLOWMBMLE4KOCELCX6X3D3Q4H2Q4QJASYIEOF7YIPPQBG3YQ5YI"),
            1000,
        )
        .note(b64("6gAVR0Nsv5Y="))
        .close_remainder_to(addr(
            "IDUTJEUIEVSMXTU4LGTJWZ2UE2E6TIODUKU6UW3FU3UKIQQ77RLUBBBFLA",
        ))
        .build(&devnet_params())
        .unwrap();

        // 4 per byte over the 294-byte signed encoding
        assert_eq!(txn.fee, 1176);
        let expected = b64("i6NhbXTNA+ilY2xvc2XEIEDpNJKIJWTLzpxZpptnVCaJ6aHDoqnqW2Wm6KRCH/xXo2ZlZc0EmKJmds0wsqNnZW6sZGV2bmV0LXYzMy4womdoxCAmCyAJoJOohot5WHIvpeVG7eftF+TYXEx4r7BFJpDt0qJsds00mqRub3RlxAjqABVHQ2y/lqNyY3bEIHts4k/rW6zAsWTinCIsV/X2PcOH1DkEglhBHF/hD3wCo3NuZMQg5/D4TQaBHfnzHI2HixFV9GcdUaGFwgCQhmf0SVhwaKGkdHlwZaNwYXk=");
        assert_eq!(txn.encode().unwrap(), expected);
        assert_eq!(Transaction::decode(&expected).unwrap(), txn);
    }

    #[test]
    fn test_rekey_encoding() {
        let txn = TransactionBuilder::rekey(
            addr("47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU"),
            addr("PNWOET7LLOWMBMLE4KOCELCX6X3D3Q4H2Q4QJASYIEOF7YIPPQBG3YQ5YI"),
        )
        .build(&devnet_params())
        .unwrap();

        assert_eq!(txn.fee, MIN_TXN_FEE);
        assert_eq!(txn.rekey_to, addr("PNWOET7LLOWMBMLE4KOCELCX6X3D3Q4H2Q4QJASYIEOF7YIPPQBG3YQ5YI"));
        let expected = b64("iaNmZWXNA+iiZnbNMLKjZ2VurGRldm5ldC12MzMuMKJnaMQgJgsgCaCTqIaLeVhyL6XlRu3n7Rfk2FxMeK+wRSaQ7dKibHbNNJqjcmN2xCDn8PhNBoEd+fMcjYeLEVX0Zx1RoYXCAJCGZ/RJWHBooaVyZWtlecQge2ziT+tbrMCxZOKcIixX9fY9w4fUOQSCWEEcX+EPfAKjc25kxCDn8PhNBoEd+fMcjYeLEVX0Zx1RoYXCAJCGZ/RJWHBooaR0eXBlo3BheQ==");
        assert_eq!(txn.encode().unwrap(), expected);
    }

    /// Append `"zzz": 7` to an encoded fixmap
    fn with_extra_key(encoded: &[u8]) -> Vec<u8> {
        assert!(encoded[0] >= 0x80 && encoded[0] < 0x8f);
        let mut out = encoded.to_vec();
        out[0] += 1;
        out.extend_from_slice(&[0xa3, b'z', b'z', b'z', 0x07]);
        out
    }

    #[test]
    fn test_decode_rejects_unknown_field() {
        let txn = TransactionBuilder::payment(
            addr("47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU"),
            addr("PNWOET7LLOWMBMLE4KOCELCX6X3D3Q4H2Q4QJASYIEOF7YIPPQBG3YQ5YI"),
            1000,
        )
        .build(&devnet_params())
        .unwrap();
        let encoded = txn.encode().unwrap();
        assert_eq!(Transaction::decode(&encoded).unwrap(), txn);
        assert!(Transaction::decode(&with_extra_key(&encoded)).is_err());

        let schema = encoding::encode(&StateSchema::new(1, 2)).unwrap();
        assert!(encoding::decode::<StateSchema>(&with_extra_key(&schema)).is_err());
    }

    fn assert_json_conversion(msgpack: &str, json: &str) {
        let encoded = b64(msgpack);
        let actual: serde_json::Value =
            serde_json::from_str(&transaction_msgpack_to_json(&encoded).unwrap()).unwrap();
        let expected: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(transaction_json_to_msgpack(json).unwrap(), encoded);
    }

    #[test]
    fn test_json_conversion_asset_config() {
        assert_json_conversion(
            "iaRhcGFyiaJhbcQgZkFDUE80blJnTzU1ajFuZEFLM1c2U2djNEFQa2N5RmiiYW6sVGVzdCBBc3NldCAyomF1s2h0dHBzOi8vZXhhbXBsZS5jb22hY8QgtJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+yhZsQgtJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+yhbcQgtJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+yhcsQgtJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+yhdM///////////6J1bqRUU1Qyo2ZlZc0D6KJmds4A3/ljo2dlbqx0ZXN0bmV0LXYxLjCiZ2jEIEhjtRiks8hOyBDyLU8QgcsPcfBZp6wg3sYvf3DlCToiomx2zgDf/Uukbm90ZcQOVGhpcyBpcyBhIG5vdGWjc25kxCC0kna9PsCXfquGoyHESerYAslsC9l8KVYTFRHS8R7r7KR0eXBlpGFjZmc=",
            r#"{
                "apar": {
                    "am": "ZkFDUE80blJnTzU1ajFuZEFLM1c2U2djNEFQa2N5Rmg=",
                    "an": "Test Asset 2",
                    "au": "https://example.com",
                    "c": "tJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+w=",
                    "f": "tJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+w=",
                    "m": "tJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+w=",
                    "r": "tJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+w=",
                    "t": 18446744073709551615,
                    "un": "TST2"
                },
                "fee": 1000,
                "fv": 14678371,
                "gen": "testnet-v1.0",
                "gh": "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=",
                "lv": 14679371,
                "note": "VGhpcyBpcyBhIG5vdGU=",
                "snd": "tJJ2vT7Al36rhqMhxEnq2ALJbAvZfClWExUR0vEe6+w=",
                "type": "acfg"
            }"#,
        );
    }

    #[test]
    fn test_json_conversion_app_call_boxes() {
        assert_json_conversion(
            "i6RhcGFhkcQEdGVzdKRhcGF0ksQgACoyATtqMON+4ohUJO59fQVV6uCTn7aa/GvfndL+5/7EIAAHBAuPYqMysOAF8ALIwKUWNGgBCjFYJ8bPUnx4aXnnpGFwYniSgaFuxAVhbGljZYKhaQKhbsQDYm9ipGFwZmGSzRWzzRoKpGFwaWRko2ZlZc0E0qJmds0jKKJnaMQgMf0h6zjkEIEZPtNM3zsrg+iHQFS0fZxhgr7w35I464OibHbNIzKjc25kxCAJ+9J2LAj4bFrmv23Xp6kB3mZ111Dgfoxcdphkfbbh/aR0eXBlpGFwcGw=",
            r#"{
                "apaa": ["dGVzdA=="],
                "apat": [
                    "ACoyATtqMON+4ohUJO59fQVV6uCTn7aa/GvfndL+5/4=",
                    "AAcEC49iozKw4AXwAsjApRY0aAEKMVgnxs9SfHhpeec="
                ],
                "apbx": [{"n": "YWxpY2U="}, {"i": 2, "n": "Ym9i"}],
                "apfa": [5555, 6666],
                "apid": 100,
                "fee": 1234,
                "fv": 9000,
                "gh": "Mf0h6zjkEIEZPtNM3zsrg+iHQFS0fZxhgr7w35I464M=",
                "lv": 9010,
                "snd": "CfvSdiwI+Gxa5r9t16epAd5mdddQ4H6MXHaYZH224f0=",
                "type": "appl"
            }"#,
        );
    }

    #[test]
    fn test_json_conversion_empty_box() {
        assert_json_conversion(
            "iaRhcGFhkcQEdGVzdKRhcGJ4kYCkYXBpZGSjZmVlzQTSomZ2zSMoomdoxCAx/SHrOOQQgRk+00zfOyuD6IdAVLR9nGGCvvDfkjjrg6Jsds0jMqNzbmTEIAn70nYsCPhsWua/bdenqQHeZnXXUOB+jFx2mGR9tuH9pHR5cGWkYXBwbA==",
            r#"{
                "apaa": ["dGVzdA=="],
                "apbx": [{}],
                "apid": 100,
                "fee": 1234,
                "fv": 9000,
                "gh": "Mf0h6zjkEIEZPtNM3zsrg+iHQFS0fZxhgr7w35I464M=",
                "lv": 9010,
                "snd": "CfvSdiwI+Gxa5r9t16epAd5mdddQ4H6MXHaYZH224f0=",
                "type": "appl"
            }"#,
        );
        assert!(transaction_json_to_msgpack(r#"{"type":"appl","zzz":1}"#).is_err());
    }

    #[test]
    fn test_application_create_encoding() {
        let params = SuggestedParams {
            fee: 1000,
            genesis_id: "devnet-v1.0".to_string(),
            genesis_hash: Digest::from_slice(&b64("sC3P7e2SdbqKJK0tbiCdK9tdSpbe6XeCGKdoNzmlj0E="))
                .unwrap(),
            first_valid: 2063137,
            last_valid: 2064137,
            flat_fee: true,
        };
        let program = vec![1, 32, 1, 1, 34];
        let call = AppCall {
            app_id: 0,
            on_completion: OnCompletion::NoOp,
            app_args: vec![b"123".to_vec(), b"456".to_vec()],
            accounts: vec![addr("47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU")],
            foreign_apps: vec![10],
            foreign_assets: vec![10],
            boxes: vec![
                AppBoxReference::new(0, "box_name"),
                AppBoxReference::new(10, "box_name"),
                AppBoxReference::new(10, "box_name2"),
            ],
            approval_program: program.clone(),
            clear_program: program,
            global_schema: StateSchema::new(1, 1),
            local_schema: StateSchema::new(1, 1),
            extra_pages: 2,
        };
        let txn = TransactionBuilder::application_call(Address::ZERO, call)
            .unwrap()
            .note(b64("8xMCTuLQ810="))
            .build(&params)
            .unwrap();

        let expected = b64("3gARpGFwYWGSxAMxMjPEAzQ1NqRhcGFwxAUBIAEBIqRhcGFzkQqkYXBhdJHEIOfw+E0GgR358xyNh4sRVfRnHVGhhcIAkIZn9ElYcGihpGFwYniTgaFuxAhib3hfbmFtZYKhaQGhbsQIYm94X25hbWWCoWkBoW7ECWJveF9uYW1lMqRhcGVwAqRhcGZhkQqkYXBnc4KjbmJzAaNudWkBpGFwbHOCo25icwGjbnVpAaRhcHN1xAUBIAEBIqNmZWXNA+iiZnbOAB97IaNnZW6rZGV2bmV0LXYxLjCiZ2jEILAtz+3tknW6iiStLW4gnSvbXUqW3ul3ghinaDc5pY9Bomx2zgAffwmkbm90ZcQI8xMCTuLQ812kdHlwZaRhcHBs");
        assert_eq!(txn.encode().unwrap(), expected);
    }

    #[test]
    fn test_box_reference_unknown_app() {
        let err = resolve_box_references(&[AppBoxReference::new(99, "b")], &[10], 4).unwrap_err();
        assert!(matches!(err, TransactionError::UnknownBoxApp(99)));
    }

    #[test]
    fn test_box_reference_current_app_is_zero() {
        let refs = resolve_box_references(
            &[AppBoxReference::new(4, "a"), AppBoxReference::new(20, "b")],
            &[4, 20],
            4,
        )
        .unwrap();
        assert_eq!(refs[0].foreign_app_index, 0);
        assert_eq!(refs[1].foreign_app_index, 2);
    }

    #[test]
    fn test_per_byte_fee_above_minimum() {
        let params = SuggestedParams {
            fee: 10,
            first_valid: 1,
            last_valid: 100,
            ..Default::default()
        };
        let txn = TransactionBuilder::payment(Address::ZERO, Address::ZERO, 5)
            .note(vec![7u8; 200])
            .build(&params)
            .unwrap();
        let mut at_rate = txn.clone();
        at_rate.fee = 10;
        let size = at_rate.estimate_size().unwrap();
        assert_eq!(size, at_rate.encode().unwrap().len() as u64 + 75);
        assert_eq!(txn.fee, size * 10);
        assert!(txn.fee > MIN_TXN_FEE);
    }

    #[test]
    fn test_rekey_fee_excludes_rekey_field() {
        let sender = addr("47YPQTIGQEO7T4Y4RWDYWEKV6RTR2UNBQXBABEEGM72ESWDQNCQ52OPASU");
        let target = addr("PNWOET7LLOWMBMLE4KOCELCX6X3D3Q4H2Q4QJASYIEOF7YIPPQBG3YQ5YI");
        let params = SuggestedParams {
            fee: 10,
            ..devnet_params()
        };

        let rekeyed = TransactionBuilder::rekey(sender, target).build(&params).unwrap();
        let plain = TransactionBuilder::payment(sender, sender, 0).build(&params).unwrap();
        assert_eq!(rekeyed.fee, plain.fee);
        assert_eq!(rekeyed.rekey_to, target);

        let chained = TransactionBuilder::payment(sender, sender, 0)
            .rekey_to(target)
            .build(&params)
            .unwrap();
        assert!(chained.fee > plain.fee);
    }

    #[test]
    fn test_invalid_validity_window() {
        let params = SuggestedParams {
            first_valid: 10,
            last_valid: 5,
            ..Default::default()
        };
        assert!(TransactionBuilder::payment(Address::ZERO, Address::ZERO, 1)
            .build(&params)
            .is_err());
    }

    #[test]
    fn test_on_completion_names() {
        assert_eq!(OnCompletion::from_name("optin"), Some(OnCompletion::OptIn));
        assert_eq!(OnCompletion::from_u64(5), Some(OnCompletion::DeleteApplication));
        assert_eq!(OnCompletion::from_u64(6), None);
        assert_eq!("axfer".parse::<TxType>().unwrap(), TxType::AssetTransfer);
    }
}
