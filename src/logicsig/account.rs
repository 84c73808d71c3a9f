//! Logic signature accounts
//!
//! A logic signature authorizes transactions with a program instead of a
//! key. Without a delegation proof the program controls its own escrow
//! address; with a single-key or multisig signature over the program it
//! may act for the delegating account.

use serde::{Deserialize, Serialize};

use super::program::{program_address, program_for_signing, sanity_check_program};
use super::LogicSigError;
use crate::core::encoding::{base64_bytes, bytes_list};
use crate::core::{SignedTxn, Transaction};
use crate::crypto::{verify_signature, Address, KeyPair, Signature};
use crate::multisig::{MultisigAccount, MultisigSig};

/// Program, arguments and optional delegation proof (`lsig`)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogicSig {
    #[serde(rename = "arg", default, with = "bytes_list", skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Vec<u8>>,
    #[serde(rename = "l", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub logic: Vec<u8>,
    #[serde(rename = "msig", default, skip_serializing_if = "Option::is_none")]
    pub msig: Option<MultisigSig>,
    #[serde(rename = "sig", default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Signature>,
}

impl LogicSig {
    /// Check the program and delegation proof against the address it acts for
    pub fn verify(&self, address: &Address) -> Result<(), LogicSigError> {
        sanity_check_program(&self.logic)?;
        let message = program_for_signing(&self.logic);

        match (&self.sig, &self.msig) {
            (Some(_), Some(_)) => Err(LogicSigError::TooManySignatures),
            (Some(sig), None) => verify_signature(address.as_bytes(), &message, sig)
                .map_err(|_| LogicSigError::InvalidSignature),
            (None, Some(msig)) => {
                if msig.account()?.address() != *address {
                    return Err(LogicSigError::InvalidSignature);
                }
                Ok(msig.verify(&message)?)
            }
            (None, None) => {
                if program_address(&self.logic) == *address {
                    Ok(())
                } else {
                    Err(LogicSigError::InvalidSignature)
                }
            }
        }
    }
}

/// A logic signature plus the key that delegated it, if any
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicSigAccount {
    #[serde(rename = "lsig")]
    lsig: LogicSig,
    #[serde(rename = "sigkey", default, skip_serializing_if = "Option::is_none")]
    signing_key: Option<Address>,
}

impl LogicSigAccount {
    /// Create an escrow account controlled by `program`
    pub fn escrow(program: Vec<u8>, args: Vec<Vec<u8>>) -> Result<Self, LogicSigError> {
        sanity_check_program(&program)?;
        Ok(Self {
            lsig: LogicSig {
                args,
                logic: program,
                ..Default::default()
            },
            signing_key: None,
        })
    }

    /// Delegate `key`'s account to the program by signing it
    pub fn delegated_sign(
        program: Vec<u8>,
        args: Vec<Vec<u8>>,
        key: &KeyPair,
    ) -> Result<Self, LogicSigError> {
        let mut account = Self::escrow(program, args)?;
        account.lsig.sig = Some(key.sign(&program_for_signing(&account.lsig.logic)));
        account.signing_key = Some(key.address());
        Ok(account)
    }

    /// Delegate `signer`'s account with a signature produced elsewhere
    ///
    /// The signature is verified before the account is returned.
    pub fn delegated_attach(
        program: Vec<u8>,
        args: Vec<Vec<u8>>,
        signer: Address,
        signature: &[u8],
    ) -> Result<Self, LogicSigError> {
        let signature = Signature::from_slice(signature)?;
        let mut account = Self::escrow(program, args)?;
        account.lsig.sig = Some(signature);
        account.signing_key = Some(signer);
        account.lsig.verify(&signer)?;
        Ok(account)
    }

    /// Delegate a multisig account; members then add their signatures
    pub fn delegated_multisig(
        program: Vec<u8>,
        args: Vec<Vec<u8>>,
        msig_account: &MultisigAccount,
    ) -> Result<Self, LogicSigError> {
        let mut account = Self::escrow(program, args)?;
        account.lsig.msig = Some(MultisigSig::blank(msig_account));
        Ok(account)
    }

    /// Add a multisig member's signature, computed with their key
    pub fn append_sign_multisig(&mut self, key: &KeyPair) -> Result<(), LogicSigError> {
        let signature = key.sign(&program_for_signing(&self.lsig.logic));
        self.append_attach_multisig(&key.address(), signature.as_bytes())
    }

    /// Add a multisig member's signature produced elsewhere
    ///
    /// The threshold may not be met yet, so the envelope is not verified here.
    pub fn append_attach_multisig(
        &mut self,
        signer: &Address,
        signature: &[u8],
    ) -> Result<(), LogicSigError> {
        let signature = Signature::from_slice(signature)?;
        let msig = self.lsig.msig.as_mut().ok_or(LogicSigError::MissingMultisig)?;
        let slot = msig
            .subsigs
            .iter_mut()
            .find(|s| s.key == *signer)
            .ok_or(LogicSigError::KeyNotInMultisig(*signer))?;
        slot.sig = Some(signature);
        Ok(())
    }

    /// Whether the program acts for another account
    pub fn is_delegated(&self) -> bool {
        self.lsig.sig.is_some() || self.lsig.msig.is_some()
    }

    /// The address this account has authority over
    ///
    /// The delegating account if delegated, else the program's escrow address.
    pub fn address(&self) -> Result<Address, LogicSigError> {
        match (&self.lsig.sig, &self.lsig.msig) {
            (Some(_), Some(_)) => Err(LogicSigError::TooManySignatures),
            (Some(_), None) => self.signing_key.ok_or(LogicSigError::NoSigningKey),
            (None, Some(msig)) => Ok(msig.account()?.address()),
            (None, None) => Ok(program_address(&self.lsig.logic)),
        }
    }

    pub fn lsig(&self) -> &LogicSig {
        &self.lsig
    }

    pub fn signing_key(&self) -> Option<Address> {
        self.signing_key
    }

    /// Authorize a transaction with this logic signature
    ///
    /// `sgnr` is set when the authorizing address is not the sender. The
    /// delegation proof must verify.
    pub fn sign_transaction(&self, txn: &Transaction) -> Result<SignedTxn, LogicSigError> {
        let address = self.address()?;
        self.lsig.verify(&address)?;
        Ok(SignedTxn {
            lsig: Some(self.lsig.clone()),
            auth_addr: (txn.sender != address).then_some(address),
            txn: txn.clone(),
            ..Default::default()
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, LogicSigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(text: &str) -> Result<Self, LogicSigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Rebuild an account from a logic signature found on a signed transaction
    ///
    /// For a single-key delegation, `signer` is the delegating address; the
    /// signature is checked against it.
    pub fn from_logic_sig(lsig: LogicSig, signer: Option<Address>) -> Result<Self, LogicSigError> {
        let signing_key = match (&lsig.sig, &lsig.msig) {
            (Some(_), Some(_)) => return Err(LogicSigError::TooManySignatures),
            (Some(sig), None) => {
                let key = signer.ok_or(LogicSigError::NoSigningKey)?;
                verify_signature(key.as_bytes(), &program_for_signing(&lsig.logic), sig)
                    .map_err(|_| LogicSigError::InvalidSignature)?;
                Some(key)
            }
            _ => None,
        };
        Ok(Self { lsig, signing_key })
    }
}

/// Logic signature account that signed an encoded transaction, if any
pub fn extract_logicsig_account(signed: &[u8]) -> Result<Option<LogicSigAccount>, LogicSigError> {
    let stx = SignedTxn::decode(signed)?;
    let authorizer = stx.authorizer();
    stx.lsig
        .map(|lsig| LogicSigAccount::from_logic_sig(lsig, Some(authorizer)))
        .transpose()
}
