//! Key-generation workload: RSA key pair + OpenSSH-style SHA-256 fingerprint.
//!
//! Fingerprint rules (same string `ssh-keygen -lf` prints):
//! - Blob = string("ssh-rsa") || mpint(e) || mpint(n), each length-prefixed (u32 BE).
//! - mpint gets a leading 0x00 when its top bit is set.
//! - Output = "SHA256:" + unpadded standard base64 of SHA-256(blob).

use std::hint::black_box;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{CpuLoadError, Result};

const SSH_RSA: &[u8] = b"ssh-rsa";

/// Generate `iterations` key pairs of `bits` bits, fingerprint and drop each.
/// The first failure aborts the remaining iterations.
pub fn keygen(iterations: u64, bits: usize) -> Result<()> {
    let mut rng = OsRng;
    for i in 0..iterations {
        let private_key = generate_key(&mut rng, bits).inspect_err(|e| {
            tracing::warn!(iteration = i, bits, error = %e, "rsa key generation failed");
        })?;
        let public_key = RsaPublicKey::from(&private_key);
        black_box(fingerprint_sha256(&public_key)?);
    }
    Ok(())
}

/// Generate one RSA key from `rng`. A failing randomness source is reported
/// as `CpuLoadError::Generation` instead of panicking inside `rsa`.
pub fn generate_key<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> Result<RsaPrivateKey> {
    let mut checked = CheckedRng::new(rng);
    let key = RsaPrivateKey::new(&mut checked, bits)
        .map_err(|e| CpuLoadError::Generation(e.to_string()))?;
    match checked.failure {
        Some(e) => Err(CpuLoadError::Generation(format!("randomness source failed: {e}"))),
        None => Ok(key),
    }
}

/// Routes `fill_bytes` through `try_fill_bytes` and remembers the first error.
///
/// After a failure the remaining bytes come from a fixed-seed `StdRng` so the
/// prime search still terminates; that key is always discarded.
struct CheckedRng<'a, R> {
    inner: &'a mut R,
    failure: Option<rand::Error>,
    fallback: Option<StdRng>,
}

impl<'a, R: RngCore> CheckedRng<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            failure: None,
            fallback: None,
        }
    }
}

impl<R: RngCore> RngCore for CheckedRng<'_, R> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.failure.is_none() {
            match self.inner.try_fill_bytes(dest) {
                Ok(()) => return,
                Err(e) => self.failure = Some(e),
            }
        }
        self.fallback
            .get_or_insert_with(|| StdRng::seed_from_u64(0))
            .fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl<R: RngCore + CryptoRng> CryptoRng for CheckedRng<'_, R> {}

/// OpenSSH `SHA256:` fingerprint of an RSA public key.
pub fn fingerprint_sha256(key: &RsaPublicKey) -> Result<String> {
    let blob = ssh_public_key_blob(key)?;
    let digest = Sha256::digest(&blob);
    Ok(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest)))
}

/// Wire encoding of an `ssh-rsa` public key.
pub fn ssh_public_key_blob(key: &RsaPublicKey) -> Result<Vec<u8>> {
    let e = key.e().to_bytes_be();
    let n = key.n().to_bytes_be();

    let mut blob = Vec::with_capacity(SSH_RSA.len() + e.len() + n.len() + 14);
    put_string(&mut blob, SSH_RSA)?;
    put_mpint(&mut blob, &e)?;
    put_mpint(&mut blob, &n)?;
    Ok(blob)
}

fn put_string(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| CpuLoadError::Generation("public key field exceeds u32 length".into()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(data);
    Ok(())
}

fn put_mpint(out: &mut Vec<u8>, magnitude_be: &[u8]) -> Result<()> {
    // strip leading zeros; zero itself encodes as an empty string
    let start = magnitude_be
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(magnitude_be.len());
    let digits = &magnitude_be[start..];

    match digits.first() {
        Some(top) if top & 0x80 != 0 => {
            let mut padded = Vec::with_capacity(digits.len() + 1);
            padded.push(0);
            padded.extend_from_slice(digits);
            put_string(out, &padded)
        }
        _ => put_string(out, digits),
    }
}
