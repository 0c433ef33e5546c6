//! Aptos transaction codec
//!
//! Transaction bodies are BCS-encoded `RawTransaction`s. The structs and
//! enums below mirror the on-chain layouts field-for-field and
//! variant-for-variant; BCS derives the wire format from declaration order,
//! so the order here is load-bearing.
//!
//! Signing preimage = `SHA3-256("APTOS::RawTransaction") ‖ BCS(raw_txn)`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::encoding::hash::sha3_256;
use crate::error::{AdapterError, Result};

/// Domain-separation tag hashed into every signing preimage
pub const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";

// ============================================================================
// Account addresses and type tags
// ============================================================================

/// 32-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountAddress(pub [u8; 32]);

impl AccountAddress {
    pub const ONE: AccountAddress = {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        AccountAddress(bytes)
    };

    /// Parse `0x`-prefixed hex, accepting the short leading-zero-trimmed form
    pub fn parse(text: &str) -> Result<Self> {
        let stripped = text.strip_prefix("0x").unwrap_or(text);
        if stripped.is_empty() || stripped.len() > 64 {
            return Err(AdapterError::address("aptos", format!("bad address: {}", text)));
        }
        let padded = format!("{:0>64}", stripped);
        let bytes = hex::decode(&padded)
            .map_err(|e| AdapterError::address("aptos", format!("bad address {}: {}", text, e)))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(AccountAddress(out))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Move type tag; variant order matches the on-chain enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Bool,
    U8,
    U64,
    U128,
    Address,
    Signer,
    Vector(Box<TypeTag>),
    Struct(Box<StructTag>),
    U16,
    U32,
    U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructTag {
    pub address: AccountAddress,
    pub module: String,
    pub name: String,
    pub type_args: Vec<TypeTag>,
}

impl StructTag {
    /// Fully qualified name, short address form (`0x1::aptos_coin::AptosCoin`)
    pub fn to_canonical_string(&self) -> String {
        let hex = hex::encode(self.address.0);
        let short = hex.trim_start_matches('0');
        let short = if short.is_empty() { "0" } else { short };
        format!("0x{}::{}::{}", short, self.module, self.name)
    }
}

impl FromStr for StructTag {
    type Err = AdapterError;

    /// Parse `address::module::Name`; generic struct tags are not accepted
    fn from_str(s: &str) -> Result<Self> {
        if s.contains('<') {
            return Err(AdapterError::InvalidInput(format!(
                "generic type arguments are not supported: {}",
                s
            )));
        }
        let parts: Vec<&str> = s.split("::").collect();
        if parts.len() != 3 {
            return Err(AdapterError::InvalidInput(format!(
                "expected address::module::Name, got {}",
                s
            )));
        }
        Ok(StructTag {
            address: AccountAddress::parse(parts[0])?,
            module: parts[1].to_string(),
            name: parts[2].to_string(),
            type_args: vec![],
        })
    }
}

// ============================================================================
// Transaction body
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleId {
    pub address: AccountAddress,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunction {
    pub module: ModuleId,
    pub function: String,
    pub ty_args: Vec<TypeTag>,
    /// Each argument is itself BCS-encoded
    pub args: Vec<Vec<u8>>,
}

/// Payload kinds; only `EntryFunction` is produced here, but the other
/// variants hold their on-chain indices so the discriminants line up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    Script,
    ModuleBundle,
    EntryFunction(EntryFunction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: TransactionPayload,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

/// Signature carrier; Ed25519 is variant 0 on-chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuthenticator {
    Ed25519 {
        public_key: Vec<u8>,
        signature: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub raw_txn: RawTransaction,
    pub authenticator: TransactionAuthenticator,
}

// ============================================================================
// Codec operations
// ============================================================================

pub fn encode_unsigned(tx: &RawTransaction) -> Result<Vec<u8>> {
    bcs::to_bytes(tx).map_err(|e| AdapterError::Codec(format!("bcs encode: {}", e)))
}

pub fn decode_unsigned(bytes: &[u8]) -> Result<RawTransaction> {
    bcs::from_bytes(bytes).map_err(|e| AdapterError::Codec(format!("bcs decode: {}", e)))
}

/// `SHA3-256("APTOS::RawTransaction") ‖ BCS(raw_txn)`
pub fn signing_preimage(tx: &RawTransaction) -> Result<Vec<u8>> {
    let body = encode_unsigned(tx)?;
    let mut preimage = Vec::with_capacity(32 + body.len());
    preimage.extend_from_slice(&sha3_256(RAW_TRANSACTION_SALT));
    preimage.extend_from_slice(&body);
    Ok(preimage)
}

/// Wrap the body and an Ed25519 (pubkey, signature) pair into the
/// submittable `SignedTransaction`
pub fn attach_signature(unsigned: &[u8], signature: &[u8], pubkey: &[u8]) -> Result<Vec<u8>> {
    if signature.len() != 64 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "aptos signature must be 64 bytes, got {}",
            signature.len()
        )));
    }
    if pubkey.len() != 32 {
        return Err(AdapterError::EnvelopeMalformed(format!(
            "aptos public key must be 32 bytes, got {}",
            pubkey.len()
        )));
    }
    let raw_txn = decode_unsigned(unsigned)?;
    let signed = SignedTransaction {
        raw_txn,
        authenticator: TransactionAuthenticator::Ed25519 {
            public_key: pubkey.to_vec(),
            signature: signature.to_vec(),
        },
    };
    bcs::to_bytes(&signed).map_err(|e| AdapterError::Codec(format!("bcs encode: {}", e)))
}

// ============================================================================
// Entry-function builders
// ============================================================================

/// `0x1::aptos_account::transfer(recipient, amount)`
pub fn native_transfer_payload(recipient: AccountAddress, amount: u64) -> Result<TransactionPayload> {
    Ok(TransactionPayload::EntryFunction(EntryFunction {
        module: ModuleId {
            address: AccountAddress::ONE,
            name: "aptos_account".into(),
        },
        function: "transfer".into(),
        ty_args: vec![],
        args: vec![bcs_arg(&recipient)?, bcs_arg(&amount)?],
    }))
}

/// `0x1::aptos_account::transfer_coins<CoinType>(recipient, amount)`
pub fn coin_transfer_payload(
    coin_type: StructTag,
    recipient: AccountAddress,
    amount: u64,
) -> Result<TransactionPayload> {
    Ok(TransactionPayload::EntryFunction(EntryFunction {
        module: ModuleId {
            address: AccountAddress::ONE,
            name: "aptos_account".into(),
        },
        function: "transfer_coins".into(),
        ty_args: vec![TypeTag::Struct(Box::new(coin_type))],
        args: vec![bcs_arg(&recipient)?, bcs_arg(&amount)?],
    }))
}

/// `0x1::primary_fungible_store::transfer<Metadata>(metadata, recipient, amount)`
pub fn fungible_transfer_payload(
    metadata: AccountAddress,
    recipient: AccountAddress,
    amount: u64,
) -> Result<TransactionPayload> {
    let metadata_type = StructTag {
        address: AccountAddress::ONE,
        module: "fungible_asset".into(),
        name: "Metadata".into(),
        type_args: vec![],
    };
    Ok(TransactionPayload::EntryFunction(EntryFunction {
        module: ModuleId {
            address: AccountAddress::ONE,
            name: "primary_fungible_store".into(),
        },
        function: "transfer".into(),
        ty_args: vec![TypeTag::Struct(Box::new(metadata_type))],
        args: vec![bcs_arg(&metadata)?, bcs_arg(&recipient)?, bcs_arg(&amount)?],
    }))
}

fn bcs_arg<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bcs::to_bytes(value).map_err(|e| AdapterError::Codec(format!("bcs arg: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_fixture() -> RawTransaction {
        RawTransaction {
            sender: AccountAddress::parse("0xcafe").unwrap(),
            sequence_number: 7,
            payload: native_transfer_payload(AccountAddress::parse("0xbeef").unwrap(), 79_999_900_000)
                .unwrap(),
            max_gas_amount: 2000,
            gas_unit_price: 100,
            expiration_timestamp_secs: 1_700_000_600,
            chain_id: 1,
        }
    }

    #[test]
    fn test_address_parse_short_form() {
        let one = AccountAddress::parse("0x1").unwrap();
        assert_eq!(one, AccountAddress::ONE);
        assert_eq!(
            one.to_hex(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_struct_tag_parse() {
        let tag: StructTag = "0x1::aptos_coin::AptosCoin".parse().unwrap();
        assert_eq!(tag.address, AccountAddress::ONE);
        assert_eq!(tag.module, "aptos_coin");
        assert_eq!(tag.name, "AptosCoin");
        assert_eq!(tag.to_canonical_string(), "0x1::aptos_coin::AptosCoin");

        assert!("0x1::coin".parse::<StructTag>().is_err());
        assert!("0x1::coin::Coin<0x1::a::B>".parse::<StructTag>().is_err());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let tx = raw_fixture();
        let bytes = encode_unsigned(&tx).unwrap();
        assert_eq!(decode_unsigned(&bytes).unwrap(), tx);
    }

    #[test]
    fn test_account_address_is_fixed_width() {
        // A bare address must BCS-encode to exactly 32 bytes, no length prefix
        let bytes = bcs::to_bytes(&AccountAddress::ONE).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[31], 1);
    }

    #[test]
    fn test_entry_function_discriminant() {
        // TransactionPayload::EntryFunction is variant 2 on-chain
        let tx = raw_fixture();
        let bytes = encode_unsigned(&tx).unwrap();
        // sender(32) + sequence_number(8), then the payload discriminant
        assert_eq!(bytes[40], 2);
    }

    #[test]
    fn test_preimage_prefixed_with_salt_hash() {
        let tx = raw_fixture();
        let preimage = signing_preimage(&tx).unwrap();
        assert_eq!(&preimage[..32], &sha3_256(RAW_TRANSACTION_SALT));
        assert_eq!(&preimage[32..], encode_unsigned(&tx).unwrap().as_slice());
    }

    #[test]
    fn test_attach_signature_layout() {
        let tx = raw_fixture();
        let unsigned = encode_unsigned(&tx).unwrap();
        let signed = attach_signature(&unsigned, &[0x55; 64], &[0x44; 32]).unwrap();

        // raw body first, then authenticator variant 0, then the two
        // length-prefixed byte strings
        assert_eq!(&signed[..unsigned.len()], unsigned.as_slice());
        let tail = &signed[unsigned.len()..];
        assert_eq!(tail[0], 0); // Ed25519 authenticator
        assert_eq!(tail[1], 32); // public key length
        assert_eq!(&tail[2..34], &[0x44; 32]);
        assert_eq!(tail[34], 64); // signature length
        assert_eq!(&tail[35..99], &[0x55; 64]);
    }

    #[test]
    fn test_attach_rejects_bad_lengths() {
        let unsigned = encode_unsigned(&raw_fixture()).unwrap();
        assert!(attach_signature(&unsigned, &[0u8; 63], &[0u8; 32]).is_err());
        assert!(attach_signature(&unsigned, &[0u8; 64], &[0u8; 31]).is_err());
    }
}
