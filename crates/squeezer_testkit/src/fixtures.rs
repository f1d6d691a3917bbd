//! Test fixtures for common scenarios.

use crate::server::FakePulp;
use sha2::{Digest, Sha256};
use squeezer_core::{Engine, EngineConfig, PollPolicy};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Creates a fresh fake server, shareable with engines.
pub fn fake_pulp() -> Arc<FakePulp> {
    Arc::new(FakePulp::new())
}

/// Creates an engine against `pulp` that polls tasks without sleeping.
pub fn engine_for(pulp: &Arc<FakePulp>) -> Engine {
    engine_with(pulp, EngineConfig::new())
}

/// Creates a check-mode engine against `pulp`.
pub fn check_engine_for(pulp: &Arc<FakePulp>) -> Engine {
    engine_with(pulp, EngineConfig::new().with_check_mode(true))
}

/// Creates an engine against `pulp` from `config`, forcing immediate polls.
pub fn engine_with(pulp: &Arc<FakePulp>, config: EngineConfig) -> Engine {
    Engine::shared(config.with_poll(PollPolicy::immediate()), pulp.clone())
}

/// Lower-case hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Deterministic payload of `size` bytes.
///
/// The pattern does not repeat on chunk boundaries, so misplaced chunks
/// change the digest.
pub fn payload_bytes(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| ((i * 31 + i / 251) % 256) as u8)
        .collect()
}

/// Writes a deterministic payload of `size` bytes to a temporary file.
///
/// Returns the file, which is removed on drop, and its digest.
pub fn payload_file(size: usize) -> (NamedTempFile, String) {
    let data = payload_bytes(size);
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(&data).expect("write payload");
    file.flush().expect("flush payload");
    (file, sha256_hex(&data))
}
