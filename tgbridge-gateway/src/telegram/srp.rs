//! SRP-2048 proof for the cloud password check (`auth.checkPassword`)
//!
//! Implements the `SHA256_SHA256_PBKDF2_HMAC_SHA512_iter100000_SHA256_ModPow`
//! password KDF.

use num_bigint::{BigInt, Sign};
use num_traits::Euclid;
use sha2::{Digest, Sha256, Sha512};

const PBKDF2_ROUNDS: u32 = 100_000;
const SRP_BYTES: usize = 256;

/// Parameters of the account's current password algorithm
pub struct SrpParams<'a> {
    pub salt1: &'a [u8],
    pub salt2: &'a [u8],
    pub p: &'a [u8],
    pub g: i32,
    /// Server public value `g_b` (`srp_B`)
    pub g_b: &'a [u8],
    /// Client secret `a`
    pub a: &'a [u8],
}

/// Client proof `(M1, g_a)`
pub struct SrpProof {
    pub m1: [u8; 32],
    pub g_a: [u8; SRP_BYTES],
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// SH(data, salt) = H(salt | data | salt)
fn salted(data: &[u8], salt: &[u8]) -> [u8; 32] {
    sha256(&[salt, data, salt])
}

fn password_hash(password: &[u8], salt1: &[u8], salt2: &[u8]) -> [u8; 32] {
    let inner = salted(&salted(password, salt1), salt2);
    let mut derived = [0u8; 64];
    pbkdf2::pbkdf2_hmac::<Sha512>(&inner, salt1, PBKDF2_ROUNDS, &mut derived);
    salted(&derived, salt2)
}

/// Left-pad (or truncate from the left) to 256 bytes
fn pad(data: &[u8]) -> [u8; SRP_BYTES] {
    let mut out = [0u8; SRP_BYTES];
    let data = &data[data.len().saturating_sub(SRP_BYTES)..];
    out[SRP_BYTES - data.len()..].copy_from_slice(data);
    out
}

fn big(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

pub fn compute_proof(params: &SrpParams<'_>, password: &[u8]) -> SrpProof {
    let p = big(params.p);
    let g = BigInt::from(params.g);
    let g_padded = pad(&[params.g as u8]);
    let g_b_padded = pad(params.g_b);

    let a = big(&pad(params.a));
    let g_a = pad(&g.modpow(&a, &p).to_bytes_be().1);

    let k = big(&sha256(&[params.p, &g_padded]));
    let u = big(&sha256(&[&g_a, &g_b_padded]));
    let x = big(&password_hash(password, params.salt1, params.salt2));

    let v = g.modpow(&x, &p);
    let kv = (k * v) % &p;
    let t = (big(&g_b_padded) - kv).rem_euclid(&p);
    let s_a = t.modpow(&(a + u * x), &p);
    let k_a = sha256(&[&pad(&s_a.to_bytes_be().1)]);

    let h_p = sha256(&[params.p]);
    let h_g = sha256(&[&g_padded]);
    let mut p_xor_g = [0u8; 32];
    for (out, (l, r)) in p_xor_g.iter_mut().zip(h_p.iter().zip(h_g.iter())) {
        *out = l ^ r;
    }

    let m1 = sha256(&[
        &p_xor_g,
        &sha256(&[params.salt1]),
        &sha256(&[params.salt2]),
        &g_a,
        &g_b_padded,
        &k_a,
    ]);

    SrpProof { m1, g_a }
}
