//! Cross-family contract surface tests
//!
//! Everything here runs offline: adapter construction, address derivation
//! and validation, codec round-trips, and the invariants that tie withdraw
//! building to the signing preimage. Network-facing paths are covered by
//! the per-module unit tests against canned records.

use multichain_adapters::{
    ChainDescriptor, ChainFamily, ChainRegistry, KeyCurve, NetworkType, ZERO_ADDRESS,
};

/// Ed25519 base-point encoding, shared across the reference vectors
const ED25519_PK_HEX: &str = "5866666666666666666666666666666666666666666666666666666666666666";

/// secp256k1 generator point, compressed
const SECP_PK_HEX: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

fn descriptor(family: ChainFamily, network: NetworkType) -> ChainDescriptor {
    let key_curve = match family {
        ChainFamily::Bitcoin | ChainFamily::Evm => "secp256k1",
        _ => "ed25519",
    };
    serde_json::from_value(serde_json::json!({
        "chain_id": format!("{}-{}", family, network),
        "family": family.as_str(),
        "network": network.as_str(),
        "node_url": "http://localhost:9999",
        "indexer_url": "http://localhost:9998",
        "key_curve": key_curve,
        "signing_encoding": "hex",
        "token_symbol": "TEST",
        "request_timeout_secs": 2
    }))
    .expect("descriptor fixture")
}

fn registry() -> ChainRegistry {
    ChainRegistry::new(vec![
        descriptor(ChainFamily::Algorand, NetworkType::Mainnet),
        descriptor(ChainFamily::Aptos, NetworkType::Mainnet),
        descriptor(ChainFamily::Bitcoin, NetworkType::Mainnet),
        descriptor(ChainFamily::Cardano, NetworkType::Mainnet),
        descriptor(ChainFamily::Ripple, NetworkType::Mainnet),
        descriptor(ChainFamily::Stellar, NetworkType::Mainnet),
        descriptor(ChainFamily::Evm, NetworkType::Mainnet),
    ])
}

#[tokio::test]
async fn derived_addresses_validate_on_their_own_chain() {
    let registry = registry();
    let ed25519_pk = hex::decode(ED25519_PK_HEX).unwrap();
    let secp_pk = hex::decode(SECP_PK_HEX).unwrap();

    for family in [
        ChainFamily::Algorand,
        ChainFamily::Aptos,
        ChainFamily::Bitcoin,
        ChainFamily::Cardano,
        ChainFamily::Ripple,
        ChainFamily::Stellar,
        ChainFamily::Evm,
    ] {
        let adapter = registry.get(family, NetworkType::Mainnet).unwrap();
        let pk = match adapter.key_curve() {
            KeyCurve::Ed25519 => &ed25519_pk,
            KeyCurve::Secp256k1 => &secp_pk,
        };
        let address = adapter.pubkey_bytes_to_address(pk).unwrap();
        assert!(
            adapter.validate_address(&address),
            "{} rejected its own derived address {}",
            family,
            address
        );
        // Wrong-curve key material must not derive
        let wrong = match adapter.key_curve() {
            KeyCurve::Ed25519 => vec![0u8; 31],
            KeyCurve::Secp256k1 => vec![0u8; 32],
        };
        assert!(adapter.pubkey_bytes_to_address(&wrong).is_err());
    }
}

#[tokio::test]
async fn reference_address_vectors() {
    let registry = registry();
    let pk = hex::decode(ED25519_PK_HEX).unwrap();

    let ripple = registry.get(ChainFamily::Ripple, NetworkType::Mainnet).unwrap();
    assert_eq!(
        ripple.pubkey_bytes_to_address(&pk).unwrap(),
        "rGGasCecEGuD39ag5S1cgKHdMxMyn6nfDh"
    );
    assert_eq!(
        ripple.pubkey_bytes_to_pubkey_str(&pk).unwrap(),
        format!("ED{}", ED25519_PK_HEX.to_uppercase())
    );

    let cardano = registry.get(ChainFamily::Cardano, NetworkType::Mainnet).unwrap();
    assert_eq!(
        cardano.pubkey_bytes_to_address(&pk).unwrap(),
        "addr1vx8huzmqryfxf65e8f6mv6q87ce2thfsgp20pg96ea3x49cgg73d3"
    );
}

#[tokio::test]
async fn curve_tags_are_canonical() {
    let registry = registry();
    for (family, curve) in [
        (ChainFamily::Algorand, "ed25519"),
        (ChainFamily::Bitcoin, "secp256k1"),
        (ChainFamily::Evm, "secp256k1"),
        (ChainFamily::Stellar, "ed25519"),
    ] {
        let adapter = registry.get(family, NetworkType::Mainnet).unwrap();
        assert_eq!(adapter.key_curve().as_str(), curve);
        assert_eq!(adapter.signing_encoding(), "hex");
    }
}

#[tokio::test]
async fn evm_transaction_operations_are_unsupported() {
    let registry = registry();
    let evm = registry.get(ChainFamily::Evm, NetworkType::Mainnet).unwrap();

    let err = evm.build_withdraw("0x0", "1", "0x0", None).await.unwrap_err();
    assert!(matches!(err, multichain_adapters::AdapterError::Unsupported(_)));
    let err = evm.broadcast(&[], &[0u8; 64], None).await.unwrap_err();
    assert!(matches!(err, multichain_adapters::AdapterError::Unsupported(_)));
}

#[test]
fn unsigned_handles_tie_preimage_to_serialized_bytes() {
    // Algorand: preimage is the domain prefix over the exact body bytes
    let algorand_tx = multichain_adapters::algorand::codec::AlgorandTransaction {
        tx_type: multichain_adapters::algorand::codec::TxType::Payment,
        sender: [1; 32],
        receiver: [2; 32],
        amount: 1,
        fee: 1000,
        first_valid: 100,
        last_valid: 1100,
        genesis_id: "mainnet-v1.0".into(),
        genesis_hash: [9; 32],
        asset_id: 0,
    };
    let bytes = multichain_adapters::algorand::codec::encode_unsigned(&algorand_tx);
    let decoded = multichain_adapters::algorand::codec::decode_unsigned(&bytes).unwrap();
    let preimage = multichain_adapters::algorand::codec::signing_preimage(&decoded);
    assert_eq!(&preimage[..2], b"TX");
    assert_eq!(&preimage[2..], bytes.as_slice());

    // Ripple: preimage survives the decode round-trip
    let ripple_tx = multichain_adapters::ripple::codec::RipplePayment {
        account: [3; 20],
        destination: [4; 20],
        amount: multichain_adapters::ripple::codec::RippleAmount::Drops(10),
        fee_drops: 10,
        sequence: 1,
        flags: multichain_adapters::ripple::codec::TF_FULLY_CANONICAL_SIG,
        signing_pubkey: {
            let mut pk = vec![0xed];
            pk.extend_from_slice(&[7; 32]);
            pk
        },
        txn_signature: None,
    };
    let bytes = multichain_adapters::ripple::codec::encode_unsigned(&ripple_tx).unwrap();
    let decoded = multichain_adapters::ripple::codec::decode_unsigned(&bytes).unwrap();
    assert_eq!(
        multichain_adapters::ripple::codec::signing_preimage(&ripple_tx).unwrap(),
        multichain_adapters::ripple::codec::signing_preimage(&decoded).unwrap()
    );
}

#[test]
fn native_transfers_use_the_zero_address_sentinel() {
    // Every extractor marks native transfers with the shared sentinel
    let algorand_tx = multichain_adapters::algorand::transfers::IndexerTransaction::from_value(
        &serde_json::json!({
            "sender": "S",
            "tx-type": "pay",
            "payment-transaction": { "amount": 1, "receiver": "R" }
        }),
    )
    .unwrap();
    let transfer =
        multichain_adapters::algorand::transfers::extract_payment(&algorand_tx, "ALGO").unwrap();
    assert!(transfer.is_native);
    assert_eq!(transfer.token_address, ZERO_ADDRESS);
    assert_eq!(transfer.amount, "0.000001");

    let ripple_record = serde_json::json!({
        "TransactionType": "Payment",
        "Account": "rA",
        "Destination": "rB",
        "Amount": "7"
    });
    let transfers =
        multichain_adapters::ripple::transfers::extract(&ripple_record, "XRP").unwrap();
    assert!(transfers[0].is_native);
    assert_eq!(transfers[0].token_address, ZERO_ADDRESS);

    let stellar_ops = vec![serde_json::json!({
        "type": "payment",
        "asset_type": "native",
        "from": "GA",
        "to": "GB",
        "amount": "1.0000000"
    })];
    let transfers =
        multichain_adapters::stellar::transfers::extract(&stellar_ops, "XLM").unwrap();
    assert!(transfers[0].is_native);
    assert_eq!(transfers[0].token_address, ZERO_ADDRESS);
}

#[test]
fn amount_and_scaled_amount_agree() {
    // parse(amount) * 10^decimals == scaled_amount across extractors
    let cases = [
        ("0.000001", 6u32, "1"),
        ("799.99900000", 8, "79999900000"),
        ("25.000000", 6, "25000000"),
    ];
    for (amount, decimals, scaled) in cases {
        let parsed = multichain_adapters::encoding::parse_units(amount, decimals).unwrap();
        assert_eq!(parsed.to_string(), scaled);
        assert_eq!(
            multichain_adapters::encoding::format_units(parsed, decimals),
            amount
        );
    }
}
