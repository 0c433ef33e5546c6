//! Digest helpers used by the address and transaction codecs

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest as _};
use ripemd::Ripemd160;
use sha2::{Sha256, Sha512, Sha512_256};
use sha3::Sha3_256;
use tiny_keccak::{Hasher, Keccak};

/// SHA-256
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256 (Bitcoin checksums and txids)
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// First 32 bytes of SHA-512 (XRPL "SHA-512Half")
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// SHA-512/256 (Algorand address checksums)
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    Sha512_256::digest(data).into()
}

/// SHA3-256 (Aptos account addresses and signing domain tags)
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    Sha3_256::digest(data).into()
}

/// RIPEMD160(SHA256(x)) (Bitcoin and Ripple account hashing)
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// Blake2b-224 (Cardano payment credentials)
pub fn blake2b224(data: &[u8]) -> [u8; 28] {
    Blake2b::<U28>::digest(data).into()
}

/// Blake2b-256 (Cardano transaction ids and signing preimages)
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    Blake2b::<U32>::digest(data).into()
}

/// Keccak-256 (EVM addresses)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256d() {
        // hex of double-sha256("hello")
        assert_eq!(
            hex::encode(sha256d(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_sha512_half_is_prefix() {
        let full = Sha512::digest(b"payload");
        assert_eq!(sha512_half(b"payload"), full[..32]);
    }

    #[test]
    fn test_hash160_length() {
        assert_eq!(hash160(&[0x02; 33]).len(), 20);
    }

    #[test]
    fn test_blake2b_lengths() {
        assert_eq!(blake2b224(b"x").len(), 28);
        assert_eq!(blake2b256(b"x").len(), 32);
    }
}
