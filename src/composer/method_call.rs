//! ABI method call parameters
//!
//! Argument values are collected slot by slot, then turned into one
//! application call whose app args are the method selector followed by the
//! encoded arguments. Transaction arguments are not encoded; they become the
//! group entries right before the call.

use super::ComposerError;
use crate::abi::{ArgKind, Method, ReferenceType, Type, Value};
use crate::core::{
    AppBoxReference, AppCall, OnCompletion, StateSchema, SuggestedParams, TransactionBuilder,
};
use crate::crypto::{Address, Digest};
use crate::signer::{Signer, TransactionWithSigner};

/// Maximum app args of one application call, selector included
pub const MAX_APP_ARGS: usize = 16;

/// Position from which trailing arguments share one tuple app arg
const ARGS_TUPLE_THRESHOLD: usize = MAX_APP_ARGS - 2;

/// A value supplied for one method argument slot
#[derive(Debug, Clone, PartialEq)]
pub enum MethodArgValue {
    /// Basic ABI value, or the account/asset/application a reference names
    Value(Value),
    /// Transaction placed in the group before the call
    Transaction(TransactionWithSigner),
}

/// Everything needed to add one ABI method call to a composer
#[derive(Debug, Clone)]
pub struct MethodCallParams {
    app_id: u64,
    method: Method,
    sender: Address,
    params: SuggestedParams,
    signer: Signer,
    on_completion: OnCompletion,
    accounts: Vec<Address>,
    foreign_apps: Vec<u64>,
    foreign_assets: Vec<u64>,
    boxes: Vec<AppBoxReference>,
    note: Vec<u8>,
    lease: Option<Digest>,
    rekey_to: Option<Address>,
    approval_program: Vec<u8>,
    clear_program: Vec<u8>,
    global_schema: StateSchema,
    local_schema: StateSchema,
    extra_pages: u32,
    args: Vec<MethodArgValue>,
}

impl MethodCallParams {
    /// Call `method` on `app_id` (0 creates the application)
    pub fn new(
        app_id: u64,
        method: Method,
        sender: Address,
        params: SuggestedParams,
        signer: Signer,
    ) -> Self {
        Self {
            app_id,
            method,
            sender,
            params,
            signer,
            on_completion: OnCompletion::NoOp,
            accounts: Vec::new(),
            foreign_apps: Vec::new(),
            foreign_assets: Vec::new(),
            boxes: Vec::new(),
            note: Vec::new(),
            lease: None,
            rekey_to: None,
            approval_program: Vec::new(),
            clear_program: Vec::new(),
            global_schema: StateSchema::default(),
            local_schema: StateSchema::default(),
            extra_pages: 0,
            args: Vec::new(),
        }
    }

    pub fn on_completion(mut self, on_completion: OnCompletion) -> Self {
        self.on_completion = on_completion;
        self
    }

    pub fn accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn foreign_apps(mut self, apps: Vec<u64>) -> Self {
        self.foreign_apps = apps;
        self
    }

    pub fn foreign_assets(mut self, assets: Vec<u64>) -> Self {
        self.foreign_assets = assets;
        self
    }

    pub fn boxes(mut self, boxes: Vec<AppBoxReference>) -> Self {
        self.boxes = boxes;
        self
    }

    pub fn note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.note = note.into();
        self
    }

    pub fn lease(mut self, lease: Digest) -> Self {
        self.lease = Some(lease);
        self
    }

    pub fn rekey_to(mut self, to: Address) -> Self {
        self.rekey_to = Some(to);
        self
    }

    /// Approval and clear-state programs, for creation and update calls
    pub fn with_programs(mut self, approval: Vec<u8>, clear: Vec<u8>) -> Self {
        self.approval_program = approval;
        self.clear_program = clear;
        self
    }

    /// State schemas and extra program pages, for creation calls
    pub fn with_app_schema(
        mut self,
        global: StateSchema,
        local: StateSchema,
        extra_pages: u32,
    ) -> Self {
        self.global_schema = global;
        self.local_schema = local;
        self.extra_pages = extra_pages;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn args(&self) -> &[MethodArgValue] {
        &self.args
    }

    /// Fill the next slot from ABI JSON text
    ///
    /// Reference slots take the value they refer to: an address for
    /// `account`, an id for `asset` and `application`.
    pub fn add_method_argument(&mut self, text: &str) -> Result<(), ComposerError> {
        let (index, kind, type_name) = self.next_slot()?;
        let value = match kind {
            ArgKind::Value(ty) => ty.parse_json(text)?,
            ArgKind::Reference(reference) => reference.proxy_type().parse_json(text)?,
            ArgKind::Transaction(_) => {
                return Err(ComposerError::ArgKind {
                    index,
                    expected: type_name,
                    got: "json",
                })
            }
        };
        self.args.push(MethodArgValue::Value(value));
        Ok(())
    }

    /// Fill the next slot with a structured value
    pub fn add_method_argument_value(
        &mut self,
        value: impl Into<Value>,
    ) -> Result<(), ComposerError> {
        let value = value.into();
        let (index, kind, type_name) = self.next_slot()?;
        match kind {
            ArgKind::Value(ty) => {
                ty.encode(&value)?;
            }
            ArgKind::Reference(reference) => {
                reference.proxy_type().encode(&value)?;
            }
            ArgKind::Transaction(_) => {
                return Err(ComposerError::ArgKind {
                    index,
                    expected: type_name,
                    got: value.kind(),
                })
            }
        }
        self.args.push(MethodArgValue::Value(value));
        Ok(())
    }

    /// Fill the next slot, which must be a transaction argument
    pub fn add_method_argument_transaction(
        &mut self,
        entry: TransactionWithSigner,
    ) -> Result<(), ComposerError> {
        let (index, kind, type_name) = self.next_slot()?;
        if !kind.is_transaction() {
            return Err(ComposerError::ArgKind {
                index,
                expected: type_name,
                got: "transaction",
            });
        }
        self.args.push(MethodArgValue::Transaction(entry));
        Ok(())
    }

    fn next_slot(&self) -> Result<(usize, ArgKind, String), ComposerError> {
        let index = self.args.len();
        let arg = self
            .method
            .args
            .get(index)
            .ok_or_else(|| ComposerError::TooManyArguments(self.method.name.clone()))?;
        Ok((index, arg.kind()?, arg.type_name.clone()))
    }

    fn check_programs(&self) -> Result<(), ComposerError> {
        let has_programs = !self.approval_program.is_empty() || !self.clear_program.is_empty();
        let has_all_programs =
            !self.approval_program.is_empty() && !self.clear_program.is_empty();
        let has_schema = self.global_schema != StateSchema::default()
            || self.local_schema != StateSchema::default()
            || self.extra_pages != 0;

        if self.app_id == 0 {
            if !has_all_programs {
                return Err(ComposerError::ProgramRules(
                    "ApprovalProgram and ClearProgram must be provided for an application creation call",
                ));
            }
        } else if self.on_completion == OnCompletion::UpdateApplication {
            if !has_all_programs {
                return Err(ComposerError::ProgramRules(
                    "ApprovalProgram and ClearProgram must be provided for an application update call",
                ));
            }
            if has_schema {
                return Err(ComposerError::ProgramRules(
                    "GlobalSchema and LocalSchema must not be provided for an application update call",
                ));
            }
        } else if has_programs || has_schema {
            return Err(ComposerError::ProgramRules(
                "ApprovalProgram, ClearProgram, GlobalSchema, and LocalSchema must not be provided for a non-creation call",
            ));
        }
        Ok(())
    }

    /// Expand into group entries: transaction arguments, then the call
    ///
    /// The params are left untouched, so the same call can be added to
    /// several composers.
    pub(crate) fn to_entries(&self) -> Result<Vec<TransactionWithSigner>, ComposerError> {
        let kinds = self.method.arg_kinds()?;
        if self.args.len() != kinds.len() {
            return Err(ComposerError::ArgCount {
                expected: kinds.len(),
                got: self.args.len(),
            });
        }
        self.check_programs()?;

        let mut foreign = ForeignArrays {
            accounts: self.accounts.clone(),
            apps: self.foreign_apps.clone(),
            assets: self.foreign_assets.clone(),
        };
        let mut entries = Vec::new();
        let mut types = Vec::new();
        let mut values = Vec::new();

        for (index, (kind, arg)) in kinds.into_iter().zip(&self.args).enumerate() {
            match (kind, arg) {
                (ArgKind::Transaction(expected), MethodArgValue::Transaction(entry)) => {
                    let actual = entry.txn().tx_type;
                    if let Some(expected) = expected {
                        if actual != expected {
                            return Err(ComposerError::TransactionArgType {
                                index,
                                expected: expected.to_string(),
                                got: actual.to_string(),
                            });
                        }
                    }
                    if entry.txn().has_group() {
                        return Err(ComposerError::NonZeroGroup);
                    }
                    entries.push(entry.clone());
                }
                (ArgKind::Reference(reference), MethodArgValue::Value(value)) => {
                    let position = foreign
                        .resolve(reference, value, &self.sender, self.app_id)
                        .ok_or_else(|| ComposerError::ArgKind {
                            index,
                            expected: reference.as_str().to_string(),
                            got: value.kind(),
                        })?;
                    types.push(Type::Uint(8));
                    values.push(Value::from(position as u64));
                }
                (ArgKind::Value(ty), MethodArgValue::Value(value)) => {
                    types.push(ty);
                    values.push(value.clone());
                }
                (_, arg) => {
                    return Err(ComposerError::ArgKind {
                        index,
                        expected: self.method.args[index].type_name.clone(),
                        got: match arg {
                            MethodArgValue::Value(value) => value.kind(),
                            MethodArgValue::Transaction(_) => "transaction",
                        },
                    })
                }
            }
        }

        if values.len() > MAX_APP_ARGS - 1 {
            let packed_types = types.split_off(ARGS_TUPLE_THRESHOLD);
            let packed_values = values.split_off(ARGS_TUPLE_THRESHOLD);
            types.push(Type::Tuple(packed_types));
            values.push(Value::Tuple(packed_values));
        }

        let mut app_args = Vec::with_capacity(values.len() + 1);
        app_args.push(self.method.selector().to_vec());
        for (ty, value) in types.iter().zip(&values) {
            app_args.push(ty.encode(value)?);
        }

        let call = AppCall {
            app_id: self.app_id,
            on_completion: self.on_completion,
            app_args,
            accounts: foreign.accounts,
            foreign_apps: foreign.apps,
            foreign_assets: foreign.assets,
            boxes: self.boxes.clone(),
            approval_program: self.approval_program.clone(),
            clear_program: self.clear_program.clone(),
            global_schema: self.global_schema,
            local_schema: self.local_schema,
            extra_pages: self.extra_pages,
        };
        let mut builder = TransactionBuilder::application_call(self.sender, call)?
            .note(self.note.clone());
        if let Some(lease) = self.lease {
            builder = builder.lease(lease);
        }
        if let Some(to) = self.rekey_to {
            builder = builder.rekey_to(to);
        }
        let txn = builder.build(&self.params)?;

        log::debug!(
            "Method call {} on app {} expands to {} transaction(s)",
            self.method.signature(),
            self.app_id,
            entries.len() + 1
        );
        entries.push(TransactionWithSigner::new(txn, self.signer.clone()));
        Ok(entries)
    }
}

/// Working copies of the call's foreign arrays
struct ForeignArrays {
    accounts: Vec<Address>,
    apps: Vec<u64>,
    assets: Vec<u64>,
}

impl ForeignArrays {
    /// Index a reference argument encodes to, appending unseen entries
    ///
    /// `None` when the value is not of the referenced kind.
    fn resolve(
        &mut self,
        reference: ReferenceType,
        value: &Value,
        sender: &Address,
        app_id: u64,
    ) -> Option<usize> {
        let index = match reference {
            ReferenceType::Account => {
                let account = value.as_address()?;
                if account == *sender {
                    0
                } else {
                    1 + position_or_append(&mut self.accounts, account)
                }
            }
            ReferenceType::Application => {
                let app = value.as_u64()?;
                if app == app_id {
                    0
                } else {
                    1 + position_or_append(&mut self.apps, app)
                }
            }
            ReferenceType::Asset => position_or_append(&mut self.assets, value.as_u64()?),
        };
        Some(index)
    }
}

fn position_or_append<T: PartialEq>(items: &mut Vec<T>, item: T) -> usize {
    match items.iter().position(|existing| *existing == item) {
        Some(position) => position,
        None => {
            items.push(item);
            items.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TransactionError, TxType};
    use crate::crypto::KeyPair;
    use crate::signer::tests::{params, payment};

    fn call(signature: &str, app_id: u64, key: &KeyPair) -> MethodCallParams {
        MethodCallParams::new(
            app_id,
            Method::from_signature(signature).unwrap(),
            key.address(),
            params(),
            Signer::basic(key.clone()),
        )
    }

    #[test]
    fn test_application_reference_appended() {
        let key = KeyPair::generate();
        let mut params = call("add(application)uint32", 5, &key).foreign_apps(vec![1]);
        params.add_method_argument_value(2u64).unwrap();

        let entries = params.to_entries().unwrap();
        assert_eq!(entries.len(), 1);
        let txn = entries[0].txn();
        assert_eq!(txn.foreign_apps, vec![1, 2]);
        assert_eq!(txn.app_args[0], params.method().selector().to_vec());
        assert_eq!(txn.app_args[1], vec![2]);

        // the params keep their own list, so a second expansion is identical
        let again = params.to_entries().unwrap();
        assert_eq!(again[0].txn().foreign_apps, vec![1, 2]);
    }

    #[test]
    fn test_reference_indexes() {
        let key = KeyPair::generate();
        let other = KeyPair::generate().address();
        let mut params = call("refs(account,account,application,asset,asset)void", 9, &key)
            .accounts(vec![other])
            .foreign_assets(vec![40]);
        params.add_method_argument_value(key.address()).unwrap();
        params.add_method_argument_value(other).unwrap();
        params.add_method_argument_value(9u64).unwrap();
        params.add_method_argument_value(41u64).unwrap();
        params.add_method_argument_value(40u64).unwrap();

        let entries = params.to_entries().unwrap();
        let txn = entries[0].txn();
        let encoded: Vec<u8> = txn.app_args[1..].iter().map(|arg| arg[0]).collect();
        assert_eq!(encoded, vec![0, 1, 0, 1, 0]);
        assert_eq!(txn.accounts, vec![other]);
        assert!(txn.foreign_apps.is_empty());
        assert_eq!(txn.foreign_assets, vec![40, 41]);
    }

    #[test]
    fn test_json_arguments() {
        let key = KeyPair::generate();
        let mut params = call("greet(string,account)void", 3, &key);
        params.add_method_argument("\"hello\"").unwrap();
        params
            .add_method_argument(&format!("\"{}\"", key.address()))
            .unwrap();

        let entries = params.to_entries().unwrap();
        let txn = entries[0].txn();
        assert_eq!(txn.app_args[1], b"\x00\x05hello".to_vec());
        assert_eq!(txn.app_args[2], vec![0]);
    }

    #[test]
    fn test_trailing_args_packed_into_tuple() {
        let key = KeyPair::generate();
        let signature = format!("many({})void", vec!["uint64"; 17].join(","));
        let mut params = call(&signature, 3, &key);
        for n in 0..17u64 {
            params.add_method_argument_value(n).unwrap();
        }

        let entries = params.to_entries().unwrap();
        let args = &entries[0].txn().app_args;
        assert_eq!(args.len(), MAX_APP_ARGS);
        assert_eq!(args[14], 13u64.to_be_bytes().to_vec());
        let tail: Vec<u8> = [14u64, 15, 16].iter().flat_map(|n| n.to_be_bytes()).collect();
        assert_eq!(args[15], tail);
    }

    #[test]
    fn test_fifteen_args_not_packed() {
        let key = KeyPair::generate();
        let signature = format!("many({})void", vec!["uint8"; 15].join(","));
        let mut params = call(&signature, 3, &key);
        for n in 0..15u64 {
            params.add_method_argument_value(n).unwrap();
        }

        let entries = params.to_entries().unwrap();
        let args = &entries[0].txn().app_args;
        assert_eq!(args.len(), 16);
        assert_eq!(args[15], vec![14]);
    }

    #[test]
    fn test_transaction_argument() {
        let key = KeyPair::generate();
        let pay = TransactionWithSigner::new(payment(key.address(), 7), Signer::basic(key.clone()));

        let mut params = call("deposit(pay,uint64)void", 3, &key);
        params.add_method_argument_transaction(pay.clone()).unwrap();
        params.add_method_argument_value(7u64).unwrap();
        let entries = params.to_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], pay);
        assert_eq!(entries[1].txn().tx_type, TxType::ApplicationCall);
        // the transaction argument takes no app arg
        assert_eq!(entries[1].txn().app_args.len(), 2);

        let mut wrong = call("swap(axfer)void", 3, &key);
        wrong.add_method_argument_transaction(pay).unwrap();
        assert!(matches!(
            wrong.to_entries(),
            Err(ComposerError::TransactionArgType { index: 0, .. })
        ));
    }

    #[test]
    fn test_slot_kind_mismatch() {
        let key = KeyPair::generate();
        let pay = TransactionWithSigner::new(payment(key.address(), 1), Signer::basic(key.clone()));

        let mut params = call("deposit(pay,uint64)void", 3, &key);
        assert!(matches!(
            params.add_method_argument_value(1u64),
            Err(ComposerError::ArgKind { index: 0, .. })
        ));
        params.add_method_argument_transaction(pay.clone()).unwrap();
        assert!(matches!(
            params.add_method_argument_transaction(pay),
            Err(ComposerError::ArgKind { index: 1, .. })
        ));
        assert!(matches!(
            params.add_method_argument("\"text\""),
            Err(ComposerError::Abi(_))
        ));
    }

    #[test]
    fn test_argument_count() {
        let key = KeyPair::generate();
        let mut params = call("add(uint64,uint64)uint128", 3, &key);
        params.add_method_argument_value(1u64).unwrap();
        assert!(matches!(
            params.to_entries(),
            Err(ComposerError::ArgCount { expected: 2, got: 1 })
        ));

        params.add_method_argument_value(2u64).unwrap();
        let err = params.add_method_argument_value(3u64).unwrap_err();
        assert!(matches!(&err, ComposerError::TooManyArguments(name) if name == "add"));
        assert!(params.to_entries().is_ok());
    }

    #[test]
    fn test_reference_value_must_fit_uint8() {
        let key = KeyPair::generate();
        let apps: Vec<u64> = (100..356).collect();
        let mut params = call("big(application)void", 3, &key).foreign_apps(apps);
        params.add_method_argument_value(999u64).unwrap();
        assert!(matches!(params.to_entries(), Err(ComposerError::Abi(_))));
    }

    #[test]
    fn test_program_rules() {
        let key = KeyPair::generate();
        let create = call("create()void", 0, &key);
        assert!(matches!(
            create.to_entries(),
            Err(ComposerError::ProgramRules(_))
        ));
        let create = create.with_programs(vec![0x06, 0x81, 0x01], vec![0x06, 0x81, 0x01]);
        let entries = create.to_entries().unwrap();
        assert_eq!(entries[0].txn().approval_program, vec![0x06, 0x81, 0x01]);

        let update = call("update()void", 3, &key)
            .on_completion(OnCompletion::UpdateApplication)
            .with_programs(vec![1], vec![1])
            .with_app_schema(
                StateSchema {
                    num_uint: 1,
                    num_byte_slice: 0,
                },
                StateSchema::default(),
                0,
            );
        assert!(matches!(
            update.to_entries(),
            Err(ComposerError::ProgramRules(_))
        ));

        let plain = call("noop()void", 3, &key).with_programs(vec![1], vec![1]);
        assert!(matches!(
            plain.to_entries(),
            Err(ComposerError::ProgramRules(_))
        ));
    }

    #[test]
    fn test_box_references() {
        let key = KeyPair::generate();
        let params = call("boxes()void", 3, &key)
            .foreign_apps(vec![8])
            .boxes(vec![
                AppBoxReference::new(3, "own"),
                AppBoxReference::new(8, "theirs"),
            ]);
        let entries = params.to_entries().unwrap();
        let refs = &entries[0].txn().box_references;
        assert_eq!(refs[0].foreign_app_index, 0);
        assert_eq!(refs[1].foreign_app_index, 1);

        let unknown = call("boxes()void", 3, &key).boxes(vec![AppBoxReference::new(9, "x")]);
        assert!(matches!(
            unknown.to_entries(),
            Err(ComposerError::Transaction(TransactionError::UnknownBoxApp(9)))
        ));
    }

    #[test]
    fn test_header_options() {
        let key = KeyPair::generate();
        let auth = KeyPair::generate().address();
        let params = call("noop()void", 3, &key)
            .note(b"hi".to_vec())
            .lease(Digest([1u8; 32]))
            .rekey_to(auth);
        let txn = params.to_entries().unwrap()[0].txn().clone();
        assert_eq!(txn.note, b"hi".to_vec());
        assert_eq!(txn.lease, Digest([1u8; 32]));
        assert_eq!(txn.rekey_to, auth);
        assert_eq!(txn.fee, 1000);
    }
}
