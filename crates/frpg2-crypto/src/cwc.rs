//! CWC (Carter-Wegman + Counter) authenticated encryption.
//!
//! Implements the CWC-AES-128 mode the game binary uses for its datagram
//! layer. The mode is encrypt-then-MAC: the payload is encrypted with AES in
//! CTR mode, then a Carter-Wegman polynomial hash over GF(2^127 − 1) of the
//! associated data and ciphertext is encrypted into the tag. As in the game,
//! the associated data is the 11-byte nonce itself.
//!
//! # Datagram layout
//!
//! ```text
//! [IV: 11 bytes] || [TAG: 16 bytes] || [CIPHERTEXT: variable]
//! ```
//!
//! # Block derivations
//!
//! - Hash key: `E_K(0xC0 || 0^15)`, masked to the low 127 bits.
//! - Keystream block i: `E_K(0x80 || nonce(11) || i(4, BE))`, i starting at 1.
//! - Tag: `E_K(hash) XOR E_K(0x80 || nonce || 0^4)`.
//!
//! The leading byte of each derivation block (`0xC0` / `0x80` / hash result
//! with a clear top bit) keeps the three block families disjoint.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::CryptoError;

/// Nonce length prepended to every datagram.
pub const CWC_IV_SIZE: usize = 11;

/// Authentication tag length.
pub const CWC_TAG_SIZE: usize = 16;

/// The field modulus 2^127 − 1.
const P127: u128 = (1u128 << 127) - 1;

const LOW64: u128 = u64::MAX as u128;

/// Width of one polynomial-hash input block, in bytes.
const HASH_BLOCK_SIZE: usize = 12;

/// CWC cipher context for one session.
///
/// Holds the AES-128 key schedule and the derived polynomial hash key. The
/// session key is issued by the login service and never changes for the
/// lifetime of a connection.
pub struct CwcCipher {
    cipher: Aes128,
    hash_key: u128,
}

impl CwcCipher {
    /// Create a cipher context from a 16-byte session key.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let key: &[u8; 16] = key.try_into().map_err(|_| CryptoError::InvalidLength {
            reason: "session key must be 16 bytes",
        })?;

        let cipher = Aes128::new(GenericArray::from_slice(key));

        let mut block = [0u8; 16];
        block[0] = 0xC0;
        let derived = encrypt_block(&cipher, block);
        let hash_key = u128::from_be_bytes(derived) & P127;

        Ok(Self { cipher, hash_key })
    }

    /// Encrypt `plaintext` under a freshly generated random nonce.
    ///
    /// Returns the complete datagram: `IV || TAG || CIPHERTEXT`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        use rand::Rng;
        let mut iv = [0u8; CWC_IV_SIZE];
        rand::rngs::OsRng.fill(&mut iv);
        self.encrypt_with_iv(plaintext, &iv)
    }

    /// Encrypt `plaintext` with a specific nonce (for deterministic testing).
    ///
    /// Returns the complete datagram: `IV || TAG || CIPHERTEXT`.
    pub fn encrypt_with_iv(&self, plaintext: &[u8], iv: &[u8; CWC_IV_SIZE]) -> Vec<u8> {
        let mut ciphertext = plaintext.to_vec();
        self.ctr_xor(&mut ciphertext, iv);

        let tag = self.compute_tag(iv, &ciphertext);

        let mut out = Vec::with_capacity(CWC_IV_SIZE + CWC_TAG_SIZE + ciphertext.len());
        out.extend_from_slice(iv);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&ciphertext);
        out
    }

    /// Decrypt a datagram, verifying the tag before releasing plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidLength`] if the input is shorter than
    /// `IV + TAG + 1` and [`CryptoError::InvalidTag`] if authentication
    /// fails.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < CWC_IV_SIZE + CWC_TAG_SIZE + 1 {
            return Err(CryptoError::InvalidLength {
                reason: "datagram too short: need at least 28 bytes (11 IV + 16 tag + 1 payload)",
            });
        }

        let iv: [u8; CWC_IV_SIZE] = data[..CWC_IV_SIZE]
            .try_into()
            .expect("slice is exactly CWC_IV_SIZE bytes");
        let tag = &data[CWC_IV_SIZE..CWC_IV_SIZE + CWC_TAG_SIZE];
        let ciphertext = &data[CWC_IV_SIZE + CWC_TAG_SIZE..];

        let expected = self.compute_tag(&iv, ciphertext);
        if expected != tag {
            return Err(CryptoError::InvalidTag);
        }

        let mut plaintext = ciphertext.to_vec();
        self.ctr_xor(&mut plaintext, &iv);
        Ok(plaintext)
    }

    /// XOR `data` with the CTR keystream for `nonce`. Symmetric, so this is
    /// both the encrypt and decrypt direction.
    fn ctr_xor(&self, data: &mut [u8], nonce: &[u8; CWC_IV_SIZE]) {
        for (i, chunk) in data.chunks_mut(16).enumerate() {
            let keystream = self.counter_block(nonce, (i + 1) as u32);
            for (byte, key) in chunk.iter_mut().zip(keystream.iter()) {
                *byte ^= key;
            }
        }
    }

    /// `E_K(0x80 || nonce || counter)`.
    fn counter_block(&self, nonce: &[u8; CWC_IV_SIZE], counter: u32) -> [u8; 16] {
        let mut block = [0u8; 16];
        block[0] = 0x80;
        block[1..1 + CWC_IV_SIZE].copy_from_slice(nonce);
        block[12..16].copy_from_slice(&counter.to_be_bytes());
        encrypt_block(&self.cipher, block)
    }

    /// Polynomial hash of `AD || ciphertext` plus the length block, encrypted
    /// and masked with the zero-counter block.
    fn compute_tag(&self, nonce: &[u8; CWC_IV_SIZE], ciphertext: &[u8]) -> [u8; 16] {
        let mut acc: u128 = 0;
        self.hash_chunks(&mut acc, nonce);
        self.hash_chunks(&mut acc, ciphertext);

        let length_block = ((nonce.len() as u128) << 64) | ciphertext.len() as u128;
        acc = add_mod(mul_mod(acc, self.hash_key), length_block);

        // acc < 2^127, so the top bit of the hash block is always clear.
        let hashed = encrypt_block(&self.cipher, acc.to_be_bytes());
        let mask = self.counter_block(nonce, 0);

        let mut tag = [0u8; 16];
        for i in 0..16 {
            tag[i] = hashed[i] ^ mask[i];
        }
        tag
    }

    /// Fold `data` into the running hash as zero-padded 96-bit big-endian
    /// blocks.
    fn hash_chunks(&self, acc: &mut u128, data: &[u8]) {
        for chunk in data.chunks(HASH_BLOCK_SIZE) {
            let mut block = [0u8; 16];
            block[4..4 + chunk.len()].copy_from_slice(chunk);
            let x = u128::from_be_bytes(block);
            *acc = add_mod(mul_mod(*acc, self.hash_key), x);
        }
    }
}

fn encrypt_block(cipher: &Aes128, block: [u8; 16]) -> [u8; 16] {
    let mut b = GenericArray::from(block);
    cipher.encrypt_block(&mut b);
    b.into()
}

/// Single folding step for values ≤ 2^128 − 1: `v ≡ (v >> 127) + (v & P127)`.
fn fold(value: u128) -> u128 {
    (value >> 127) + (value & P127)
}

/// `a · b mod (2^127 − 1)` for `a, b < 2^127`.
fn mul_mod(a: u128, b: u128) -> u128 {
    let (a1, a0) = (a >> 64, a & LOW64);
    let (b1, b0) = (b >> 64, b & LOW64);

    // 256-bit product as (hi, lo); the cross terms cannot overflow because
    // the high limbs are below 2^63.
    let ll = a0 * b0;
    let mid = a0 * b1 + a1 * b0;
    let hh = a1 * b1;

    let (lo, carry) = ll.overflowing_add(mid << 64);
    let hi = hh + (mid >> 64) + carry as u128;

    // 2^128 ≡ 2 (mod 2^127 − 1), so hi contributes 2·hi.
    let reduced = fold(fold(lo) + fold(hi << 1));
    if reduced >= P127 {
        reduced - P127
    } else {
        reduced
    }
}

/// `a + b mod (2^127 − 1)` for `a, b < 2^127`.
fn add_mod(a: u128, b: u128) -> u128 {
    let reduced = fold(a + b);
    if reduced >= P127 {
        reduced - P127
    } else {
        reduced
    }
}
