//! Program bytes checks and program-derived addresses

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::LogicSigError;
use crate::crypto::{hash_with_prefix, with_prefix, Address, PROGRAM_PREFIX};

/// Reject inputs that are obviously not compiled bytecode
///
/// Compiled programs always contain non-printable bytes; an all-printable
/// buffer is an address, base64 text or source code passed by mistake.
pub fn sanity_check_program(program: &[u8]) -> Result<(), LogicSigError> {
    if program.is_empty() {
        return Err(LogicSigError::EmptyProgram);
    }
    if !program.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Ok(());
    }

    let text = String::from_utf8_lossy(program);
    if Address::decode(&text).is_ok() {
        return Err(LogicSigError::ProgramIsAddress);
    }
    if STANDARD.decode(text.as_bytes()).is_ok() {
        return Err(LogicSigError::ProgramIsBase64);
    }
    Err(LogicSigError::PrintableProgram)
}

/// Bytes a delegating key signs: `"Program" || program`
pub fn program_for_signing(program: &[u8]) -> Vec<u8> {
    with_prefix(PROGRAM_PREFIX, program)
}

/// Escrow address controlled by a program
pub fn program_address(program: &[u8]) -> Address {
    Address::from_bytes(hash_with_prefix(PROGRAM_PREFIX, program))
}
