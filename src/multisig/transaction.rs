//! Partially signed multisig transactions
//!
//! Each co-signer produces an envelope with only their own slot filled;
//! envelopes for the same transaction are merged slot by slot until the
//! threshold is reached.

use serde::{Deserialize, Serialize};

use super::account::{MultisigAccount, MultisigError};
use crate::core::{SignedTxn, Transaction};
use crate::crypto::{verify_signature, Address, KeyPair, Signature};

/// One slot of a multisig envelope
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultisigSubsig {
    #[serde(rename = "pk")]
    pub key: Address,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Signature>,
}

/// Multisig envelope (`msig`): one slot per descriptor key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultisigSig {
    #[serde(rename = "subsig", default)]
    pub subsigs: Vec<MultisigSubsig>,
    #[serde(rename = "thr", default)]
    pub threshold: u8,
    #[serde(rename = "v", default)]
    pub version: u8,
}

impl MultisigSig {
    /// An envelope with every slot empty
    pub fn blank(account: &MultisigAccount) -> Self {
        Self {
            subsigs: account
                .public_keys()
                .iter()
                .map(|key| MultisigSubsig { key: *key, sig: None })
                .collect(),
            threshold: account.threshold(),
            version: account.version(),
        }
    }

    /// Descriptor this envelope was made for
    pub fn account(&self) -> Result<MultisigAccount, MultisigError> {
        MultisigAccount::new(
            self.version,
            self.threshold,
            self.subsigs.iter().map(|s| s.key).collect(),
        )
    }

    /// Number of filled slots
    pub fn signature_count(&self) -> usize {
        self.subsigs.iter().filter(|s| s.sig.is_some()).count()
    }

    /// Fill every slot held by `key` with `sig`
    pub fn fill(&mut self, key: &Address, sig: Signature) -> Result<(), MultisigError> {
        let mut found = false;
        for subsig in self.subsigs.iter_mut().filter(|s| s.key == *key) {
            subsig.sig = Some(sig);
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(MultisigError::KeyNotInAccount(*key))
        }
    }

    /// Union of two envelopes over the same descriptor
    pub fn merge(&self, other: &MultisigSig) -> Result<MultisigSig, MultisigError> {
        if self.account()? != other.account()? {
            return Err(MultisigError::ParametersMismatch);
        }

        let mut merged = self.clone();
        for (slot, incoming) in merged.subsigs.iter_mut().zip(&other.subsigs) {
            match (slot.sig, incoming.sig) {
                (None, Some(sig)) => slot.sig = Some(sig),
                (Some(ours), Some(theirs)) if ours != theirs => {
                    return Err(MultisigError::MismatchedDuplicateSignatures);
                }
                _ => {}
            }
        }
        Ok(merged)
    }

    /// Verify the envelope over `message`
    ///
    /// The version must be 1, at least `threshold` slots must be filled and
    /// every filled slot must hold a valid signature by its key.
    pub fn verify(&self, message: &[u8]) -> Result<(), MultisigError> {
        if self.version != 1 {
            return Err(MultisigError::UnknownVersion(self.version));
        }
        if self.subsigs.is_empty() || self.threshold == 0 {
            return Err(MultisigError::VerificationFailed(
                "empty multisig envelope".to_string(),
            ));
        }
        if self.threshold as usize > self.subsigs.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds key count {}",
                self.threshold,
                self.subsigs.len()
            )));
        }

        let filled = self.signature_count();
        if filled < self.threshold as usize {
            return Err(MultisigError::VerificationFailed(format!(
                "{} of {} required signatures present",
                filled, self.threshold
            )));
        }

        for subsig in &self.subsigs {
            if let Some(sig) = &subsig.sig {
                verify_signature(subsig.key.as_bytes(), message, sig).map_err(|_| {
                    MultisigError::VerificationFailed(format!("bad signature from {}", subsig.key))
                })?;
            }
        }
        Ok(())
    }
}

fn envelope(account: &MultisigAccount, msig: MultisigSig, txn: &Transaction) -> SignedTxn {
    let msig_address = account.address();
    SignedTxn {
        msig: Some(msig),
        auth_addr: (txn.sender != msig_address).then_some(msig_address),
        txn: txn.clone(),
        ..Default::default()
    }
}

/// Sign a transaction as one member of a multisig account
///
/// The result carries the full envelope with only this key's slot filled.
pub fn sign_multisig_transaction(
    key: &KeyPair,
    account: &MultisigAccount,
    txn: &Transaction,
) -> Result<SignedTxn, MultisigError> {
    let public_key = key.address();
    if !account.contains(&public_key) {
        return Err(MultisigError::KeyNotInAccount(public_key));
    }

    let signature = key.sign(&txn.bytes_to_sign()?);
    let mut msig = MultisigSig::blank(account);
    msig.fill(&public_key, signature)?;
    log::debug!("{} signed for multisig {}", public_key, account.address());
    Ok(envelope(account, msig, txn))
}

/// Attach a signature produced elsewhere by `signer`, a member of the account
pub fn attach_multisig_signature(
    signer: &Address,
    signature: &[u8],
    account: &MultisigAccount,
    txn: &Transaction,
) -> Result<SignedTxn, MultisigError> {
    let signature = Signature::from_slice(signature)?;
    let mut msig = MultisigSig::blank(account);
    msig.fill(signer, signature)?;
    Ok(envelope(account, msig, txn))
}

/// Merge two partially signed copies of the same multisig transaction
pub fn merge_multisig_transactions(
    first: &SignedTxn,
    second: &SignedTxn,
) -> Result<SignedTxn, MultisigError> {
    let ours = first.msig.as_ref().ok_or(MultisigError::NotMultisig)?;
    let theirs = second.msig.as_ref().ok_or(MultisigError::NotMultisig)?;

    let merged = ours.merge(theirs)?;
    if first.auth_addr != second.auth_addr {
        return Err(MultisigError::AuthAddrMismatch);
    }
    if first.txn != second.txn {
        return Err(MultisigError::TransactionMismatch);
    }

    log::debug!(
        "Merged multisig envelopes: {} signatures present",
        merged.signature_count()
    );
    Ok(SignedTxn {
        msig: Some(merged),
        ..first.clone()
    })
}

/// Merge any number of partially signed copies, left to right
pub fn merge_all(parts: &[SignedTxn]) -> Result<SignedTxn, MultisigError> {
    let (head, rest) = parts.split_first().ok_or(MultisigError::NothingToMerge)?;
    if head.msig.is_none() {
        return Err(MultisigError::NotMultisig);
    }
    rest.iter()
        .try_fold(head.clone(), |acc, part| merge_multisig_transactions(&acc, part))
}

/// [`merge_multisig_transactions`] over encoded signed transactions
pub fn merge_multisig_encoded(first: &[u8], second: &[u8]) -> Result<Vec<u8>, MultisigError> {
    let merged = merge_multisig_transactions(&SignedTxn::decode(first)?, &SignedTxn::decode(second)?)?;
    Ok(merged.encode()?)
}

/// Descriptor of the multisig that signed an encoded transaction, if any
pub fn extract_multisig_account(
    signed: &[u8],
) -> Result<Option<MultisigAccount>, MultisigError> {
    let stx = SignedTxn::decode(signed)?;
    stx.msig.as_ref().map(MultisigSig::account).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SuggestedParams, TransactionBuilder};
    use crate::crypto::Digest;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    const ADDRS: [&str; 3] = [
        "2RQ7JAZ4YXJ5SNBP7PDG6QW2QSQK2BWXDMJX23LQSCERD6AHYDRH4N4MXY",
        "S64XU5HQEY2XLHVUSO6RI3JL6NHC32I4LJHM32ZOM5VC4QPON7BZZRCU2E",
        "W3KCADJF23RDTO3TMY63YQBKYDYFPHFBU75JQMX5QHOERRBOZ75L3B2J7Y",
    ];

    const SIG_1: &str = "g6Rtc2lng6ZzdWJzaWeTgqJwa8Qg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKhc8RAL+e7SP6OijDGQTe4wzHdI9kXM4erxh15OOphWBXmvrEv/DjBFpgqFldJVt5Oeva50CxtzFZSbuaFhPMfsB4TB4GicGvEIJe5enTwJjV1nrSTvRRtK/NOLekcWk7N6y5nai5B7m/DgaJwa8QgttQgDSXW4jm7c2Y9vEAqwPBXnKGn+pgy/YHcSMQuz/qjdGhyAqF2AaRzZ25yxCBV7Fim/O7pWd3xjoD79JCDdpgmoraJ4ADSuU70NrvuxKN0eG6Jo2FtdM4AD0JAo2ZlZc0D6KJmdgKjZ2VurHRlc3RuZXQtdjEuMKJnaMQgSGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiKibHbNA+qjcmN2xCCXuXp08CY1dZ60k70UbSvzTi3pHFpOzesuZ2ouQe5vw6NzbmTEINRh9IM8xdPZNC/7xm9C2oSgrQbXGxN9bXCQiRH4B8DipHR5cGWjcGF5";
    const SIG_3: &str = "g6Rtc2lng6ZzdWJzaWeTgaJwa8Qg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKBonBrxCCXuXp08CY1dZ60k70UbSvzTi3pHFpOzesuZ2ouQe5vw4KicGvEILbUIA0l1uI5u3NmPbxAKsDwV5yhp/qYMv2B3EjELs/6oXPEQIiLK0/gZgTI6gqPx5LqtfzZ5h3FM2Yl2EcjrR7D8V4unSaPJtejdNIlP/z3euUG2WKanOgzJfjrIAaTJtFsnQqjdGhyAqF2AaRzZ25yxCBV7Fim/O7pWd3xjoD79JCDdpgmoraJ4ADSuU70NrvuxKN0eG6Jo2FtdM4AD0JAo2ZlZc0D6KJmdgKjZ2VurHRlc3RuZXQtdjEuMKJnaMQgSGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiKibHbNA+qjcmN2xCCXuXp08CY1dZ60k70UbSvzTi3pHFpOzesuZ2ouQe5vw6NzbmTEINRh9IM8xdPZNC/7xm9C2oSgrQbXGxN9bXCQiRH4B8DipHR5cGWjcGF5";
    const SIG_1_AND_3: &str = "g6Rtc2lng6ZzdWJzaWeTgqJwa8Qg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKhc8RAL+e7SP6OijDGQTe4wzHdI9kXM4erxh15OOphWBXmvrEv/DjBFpgqFldJVt5Oeva50CxtzFZSbuaFhPMfsB4TB4GicGvEIJe5enTwJjV1nrSTvRRtK/NOLekcWk7N6y5nai5B7m/DgqJwa8QgttQgDSXW4jm7c2Y9vEAqwPBXnKGn+pgy/YHcSMQuz/qhc8RAiIsrT+BmBMjqCo/Hkuq1/NnmHcUzZiXYRyOtHsPxXi6dJo8m16N00iU//Pd65QbZYpqc6DMl+OsgBpMm0WydCqN0aHICoXYBpHNnbnLEIFXsWKb87ulZ3fGOgPv0kIN2mCaitongANK5TvQ2u+7Eo3R4bomjYW10zgAPQkCjZmVlzQPoomZ2AqNnZW6sdGVzdG5ldC12MS4womdoxCBIY7UYpLPITsgQ8i1PEIHLD3HwWaesIN7GL39w5Qk6IqJsds0D6qNyY3bEIJe5enTwJjV1nrSTvRRtK/NOLekcWk7N6y5nai5B7m/Do3NuZMQg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKkdHlwZaNwYXk=";
    const SIG_1_CONFLICTING: &str = "g6Rtc2lng6ZzdWJzaWeTgqJwa8Qg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKhc8RAQ+e7SP6OijDGQTe4wzHdI9kXM4erxh15OOphWBXmvrEv/DjBFpgqFldJVt5Oeva50CxtzFZSbuaFhPMfsB4TB4GicGvEIJe5enTwJjV1nrSTvRRtK/NOLekcWk7N6y5nai5B7m/DgaJwa8QgttQgDSXW4jm7c2Y9vEAqwPBXnKGn+pgy/YHcSMQuz/qjdGhyAqF2AaRzZ25yxCBV7Fim/O7pWd3xjoD79JCDdpgmoraJ4ADSuU70NrvuxKN0eG6Jo2FtdM4AD0JAo2ZlZc0D6KJmdgKjZ2VurHRlc3RuZXQtdjEuMKJnaMQgSGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiKibHbNA+qjcmN2xCCXuXp08CY1dZ60k70UbSvzTi3pHFpOzesuZ2ouQe5vw6NzbmTEINRh9IM8xdPZNC/7xm9C2oSgrQbXGxN9bXCQiRH4B8DipHR5cGWjcGF5";
    const OTHER_MSIG: &str = "g6Rtc2lng6ZzdWJzaWeTgqJwa8Qg1GH0gzzF09k0L/vGb0LahKCtBtcbE31tcJCJEfgHwOKhc8RAL+e7SP6OijDGQTe4wzHdI9kXM4erxh15OOphWBXmvrEv/DjBFpgqFldJVt5Oeva50CxtzFZSbuaFhPMfsB4TB4GicGvEIJe5enTwJjV1nrSTvRRtK/NOLekcWk7N6y5nai5B7m/DgaJwa8Qg7C0NjeEq5un7i63DFepDX8kkj1acaRia6umO9DnJgIijdGhyAqF2AaRzZ25yxCAG82xYho8S8l9dBd1U/FY5osUnPuM36f6uJztT62jZ2aN0eG6Jo2FtdM4AD0JAo2ZlZc0D6KJmdgKjZ2VurHRlc3RuZXQtdjEuMKJnaMQgSGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiKibHbNA+qjcmN2xCCXuXp08CY1dZ60k70UbSvzTi3pHFpOzesuZ2ouQe5vw6NzbmTEINRh9IM8xdPZNC/7xm9C2oSgrQbXGxN9bXCQiRH4B8DipHR5cGWjcGF5";
    const PLAIN_SIG: &str = "gqNzaWfEQC/nu0j+joowxkE3uMMx3SPZFzOHq8YdeTjqYVgV5r6xL/w4wRaYKhZXSVbeTnr2udAsbcxWUm7mhYTzH7AeEwejdHhuiaNhbXTOAA9CQKNmZWXNA+iiZnYCo2dlbqx0ZXN0bmV0LXYxLjCiZ2jEIEhjtRiks8hOyBDyLU8QgcsPcfBZp6wg3sYvf3DlCToiomx2zQPqo3JjdsQgl7l6dPAmNXWetJO9FG0r804t6RxaTs3rLmdqLkHub8Ojc25kxCDUYfSDPMXT2TQv+8ZvQtqEoK0G1xsTfW1wkIkR+AfA4qR0eXBlo3BheQ==";

    fn b64(text: &str) -> Vec<u8> {
        STANDARD.decode(text).unwrap()
    }

    fn reference_account() -> MultisigAccount {
        MultisigAccount::from_addresses(1, 2, &ADDRS).unwrap()
    }

    fn payment_from(sender: Address) -> Transaction {
        let params = SuggestedParams {
            fee: 0,
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: Digest::from_slice(&b64("SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI="))
                .unwrap(),
            first_valid: 2,
            last_valid: 1002,
            flat_fee: false,
        };
        TransactionBuilder::payment(sender, ADDRS[1].parse().unwrap(), 1_000_000)
            .build(&params)
            .unwrap()
    }

    #[test]
    fn test_attach_signature_encoding() {
        let signer: Address = ADDRS[0].parse().unwrap();
        let txn = payment_from(signer);
        let signature = b64("L+e7SP6OijDGQTe4wzHdI9kXM4erxh15OOphWBXmvrEv/DjBFpgqFldJVt5Oeva50CxtzFZSbuaFhPMfsB4TBw==");
        let stx = attach_multisig_signature(&signer, &signature, &reference_account(), &txn).unwrap();
        assert_eq!(stx.auth_addr, Some(reference_account().address()));
        assert_eq!(stx.encode().unwrap(), b64(SIG_1));
    }

    #[test]
    fn test_attach_rejects_non_member_and_bad_length() {
        let txn = payment_from(ADDRS[0].parse().unwrap());
        let stranger = KeyPair::generate().address();
        assert!(matches!(
            attach_multisig_signature(&stranger, &[0u8; 64], &reference_account(), &txn),
            Err(MultisigError::KeyNotInAccount(_))
        ));
        let member: Address = ADDRS[0].parse().unwrap();
        assert!(matches!(
            attach_multisig_signature(&member, &[0u8; 63], &reference_account(), &txn),
            Err(MultisigError::CryptoError(_))
        ));
    }

    #[test]
    fn test_merge_no_overlap() {
        let merged = merge_multisig_encoded(&b64(SIG_1), &b64(SIG_3)).unwrap();
        assert_eq!(merged, b64(SIG_1_AND_3));
        let reversed = merge_multisig_encoded(&b64(SIG_3), &b64(SIG_1)).unwrap();
        assert_eq!(reversed, b64(SIG_1_AND_3));
    }

    #[test]
    fn test_merge_overlap() {
        let merged = merge_multisig_encoded(&b64(SIG_1), &b64(SIG_1_AND_3)).unwrap();
        assert_eq!(merged, b64(SIG_1_AND_3));
        let again = merge_multisig_encoded(&merged, &merged).unwrap();
        assert_eq!(again, merged);
    }

    #[test]
    fn test_merge_conflicting_signatures() {
        let err = merge_multisig_encoded(&b64(SIG_1_CONFLICTING), &b64(SIG_1_AND_3)).unwrap_err();
        assert!(err.to_string().contains("mismatched duplicate signatures"));
    }

    #[test]
    fn test_merge_different_accounts() {
        let err = merge_multisig_encoded(&b64(SIG_3), &b64(OTHER_MSIG)).unwrap_err();
        assert!(err.to_string().contains("multisig parameters do not match"));
    }

    #[test]
    fn test_merge_all() {
        let parts: Vec<SignedTxn> = [SIG_1, SIG_3, SIG_1_AND_3]
            .iter()
            .map(|p| SignedTxn::decode(&b64(p)).unwrap())
            .collect();
        let merged = merge_all(&parts).unwrap();
        assert_eq!(merged.encode().unwrap(), b64(SIG_1_AND_3));
        assert!(matches!(merge_all(&[]), Err(MultisigError::NothingToMerge)));
    }

    #[test]
    fn test_extract_account() {
        let account = extract_multisig_account(&b64(SIG_1_AND_3)).unwrap().unwrap();
        assert_eq!(account, reference_account());
        assert!(extract_multisig_account(&b64(PLAIN_SIG)).unwrap().is_none());
    }

    #[test]
    fn test_sign_and_verify_threshold() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let account =
            MultisigAccount::new(1, 2, keys.iter().map(KeyPair::address).collect()).unwrap();
        let txn = payment_from(account.address());
        let message = txn.bytes_to_sign().unwrap();

        let first = sign_multisig_transaction(&keys[0], &account, &txn).unwrap();
        assert!(first.auth_addr.is_none());
        let first_msig = first.msig.clone().unwrap();
        assert_eq!(first_msig.signature_count(), 1);
        assert!(first_msig.verify(&message).is_err());

        let second = sign_multisig_transaction(&keys[2], &account, &txn).unwrap();
        let merged = merge_multisig_transactions(&first, &second).unwrap();
        let msig = merged.msig.unwrap();
        assert_eq!(msig.signature_count(), 2);
        assert!(msig.verify(&message).is_ok());
        assert!(msig.subsigs[1].sig.is_none());

        let mut tampered = msig.clone();
        tampered.subsigs[0].sig = tampered.subsigs[2].sig;
        assert!(tampered.verify(&message).is_err());
    }

    #[test]
    fn test_sign_rejects_stranger() {
        let account = reference_account();
        let txn = payment_from(account.address());
        assert!(matches!(
            sign_multisig_transaction(&KeyPair::generate(), &account, &txn),
            Err(MultisigError::KeyNotInAccount(_))
        ));
    }

    #[test]
    fn test_merge_requires_same_transaction() {
        let keys: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        let account =
            MultisigAccount::new(1, 2, keys.iter().map(KeyPair::address).collect()).unwrap();
        let txn = payment_from(account.address());
        let mut other = txn.clone();
        other.amount += 1;
        let a = sign_multisig_transaction(&keys[0], &account, &txn).unwrap();
        let b = sign_multisig_transaction(&keys[1], &account, &other).unwrap();
        assert!(matches!(
            merge_multisig_transactions(&a, &b),
            Err(MultisigError::TransactionMismatch)
        ));
    }
}
