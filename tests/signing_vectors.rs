//! End-to-end signing properties through the public API

use std::sync::Arc;

use orderly_near_sdk::config::NetworkId;
use orderly_near_sdk::keys::{
    verify_orderly_signature, verify_trading_signature, AccountIdentity, OrderlyKeyPair,
    TradingKeyPair, TRADING_SIGNATURE_HEX_LEN,
};
use orderly_near_sdk::signing::{
    canonical_order_message, FixedClock, HttpMethod, Params, RequestSigner, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, HEADER_TRADING_KEY, SIGNATURE_FIELD,
};
use orderly_near_sdk::SdkError;
use serde_json::{json, Value};

const TS: u64 = 1_649_920_583_000;

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

fn signer_with(trading_key: TradingKeyPair) -> RequestSigner {
    let identity = AccountIdentity::new("alice.testnet", NetworkId::Testnet).unwrap();
    RequestSigner::new(identity, OrderlyKeyPair::generate())
        .with_trading_key(trading_key)
        .with_clock(Arc::new(FixedClock(TS)))
}

fn row_signatures(body: &str) -> Vec<String> {
    let body: Value = serde_json::from_str(body).unwrap();
    body["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[SIGNATURE_FIELD].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_canonical_message_ignores_key_order() {
    let a = params(json!({"symbol": "SPOT_NEAR_USDC", "order_price": 1.5, "side": "BUY"}));
    let mut b = Params::new();
    b.insert("side".into(), json!("BUY"));
    b.insert("order_price".into(), json!(1.5));
    b.insert("symbol".into(), json!("SPOT_NEAR_USDC"));

    let message = canonical_order_message(&a).unwrap();
    assert_eq!(message, canonical_order_message(&b).unwrap());
    assert_eq!(message, "order_price=1.5&side=BUY&symbol=SPOT_NEAR_USDC");
}

#[test]
fn test_trading_signatures_are_fixed_width() {
    for _ in 0..64 {
        let key = TradingKeyPair::generate();
        let signature = key.sign("order_price=1&order_quantity=2").unwrap();
        assert_eq!(signature.len(), TRADING_SIGNATURE_HEX_LEN);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(signature.ends_with("00") || signature.ends_with("01"));
    }
}

#[test]
fn test_order_request_round_trip_and_tamper() {
    let signer = signer_with(TradingKeyPair::generate());
    let order = params(json!({
        "symbol": "SPOT_NEAR_USDC",
        "order_type": "LIMIT",
        "order_price": 2,
        "order_quantity": 3,
        "side": "SELL"
    }));

    let signed = signer
        .sign_order_request(HttpMethod::Post, "/v1/order", &order)
        .unwrap();

    assert_eq!(signed.header(HEADER_TIMESTAMP), Some("1649920583000"));
    let trading_pub = signed.header(HEADER_TRADING_KEY).unwrap().to_string();
    assert_eq!(trading_pub, signer.trading_key().unwrap().public_key());

    let body: Value = serde_json::from_str(signed.body.as_deref().unwrap()).unwrap();
    let trading_sig = body[SIGNATURE_FIELD].as_str().unwrap();
    let message = canonical_order_message(&order).unwrap();
    assert!(verify_trading_signature(&trading_pub, &message, trading_sig).unwrap());

    let orderly_pub = signer.orderly_key().public_key();
    let orderly_sig = signed.header(HEADER_SIGNATURE).unwrap();
    assert!(verify_orderly_signature(orderly_pub, &signed.canonical_message, orderly_sig).unwrap());

    // flipping one byte of the message breaks both signatures
    let mut tampered = message.clone().into_bytes();
    tampered[0] ^= 0x01;
    let tampered = String::from_utf8(tampered).unwrap();
    assert!(!verify_trading_signature(&trading_pub, &tampered, trading_sig).unwrap());
    let tampered_request = signed.canonical_message.replacen("POST", "PUT", 1);
    assert!(!verify_orderly_signature(orderly_pub, &tampered_request, orderly_sig).unwrap());
}

#[test]
fn test_signing_is_deterministic_for_fixed_inputs() {
    let key = TradingKeyPair::generate();
    let signer = signer_with(key);
    let order = params(json!({"symbol": "SPOT_NEAR_USDC", "order_price": 1, "order_quantity": 2}));

    let first = signer.sign_order_request(HttpMethod::Post, "/v1/order", &order).unwrap();
    let second = signer.sign_order_request(HttpMethod::Post, "/v1/order", &order).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_batch_row_swap_changes_envelope_only() {
    let signer = signer_with(TradingKeyPair::generate());
    let row_a = params(json!({"price": 1, "qty": 2}));
    let row_b = params(json!({"price": 3, "qty": 4}));

    let forward = signer
        .sign_batch_request(HttpMethod::Post, "/v1/batch-order", &[row_a.clone(), row_b.clone()])
        .unwrap();
    let swapped = signer
        .sign_batch_request(HttpMethod::Post, "/v1/batch-order", &[row_b, row_a])
        .unwrap();

    let forward_rows = row_signatures(forward.body.as_deref().unwrap());
    let swapped_rows = row_signatures(swapped.body.as_deref().unwrap());

    // two row signatures plus one envelope signature per request
    assert_eq!(forward_rows.len(), 2);
    assert!(!forward.signature.is_empty());

    assert_eq!(forward_rows[0], swapped_rows[1]);
    assert_eq!(forward_rows[1], swapped_rows[0]);
    assert_ne!(forward.canonical_message, swapped.canonical_message);
    assert_ne!(forward.signature, swapped.signature);
}

#[test]
fn test_order_signing_requires_trading_key() {
    let identity = AccountIdentity::new("alice.testnet", NetworkId::Testnet).unwrap();
    let signer = RequestSigner::new(identity, OrderlyKeyPair::generate());

    let err = signer
        .sign_order_request(HttpMethod::Post, "/v1/order", &params(json!({"symbol": "X"})))
        .unwrap_err();
    assert!(matches!(err, SdkError::MissingCredential(_)));
}

// ============================================================================
// Known-answer vectors
// ============================================================================

/// secp256k1 secret with a well-known public key
const TRADING_SECRET: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
/// ed25519 seed 0x01..0x20
const ORDERLY_SECRET: &str = "ed25519:4wBqpZM9xaSheZzJSMawUKKwhdpChKbZ5eu5ky4Vigw";

const ROW_1_SIGNATURE: &str = "bed97f052bc37f976de2edda9c3dbbea6a67282790d349ddf370e60e89d2c9d6\
                               1acf03ba72d0ee35bae0b91d6834ea91dd9568327e28da12ce926776eb0cd64001";
const ROW_2_SIGNATURE: &str = "5e4c59e674d26de84dff7d248752df4f199595d9b13006a3813b30478f198f1d\
                               253d7e91b7ab6f0ea537134048747919c90d231359068aa3ae1217cdc4dec79d00";

fn fixed_signer() -> RequestSigner {
    let identity = AccountIdentity::new("alice.testnet", NetworkId::Testnet).unwrap();
    RequestSigner::new(identity, OrderlyKeyPair::from_secret_str(ORDERLY_SECRET).unwrap())
        .with_trading_key(TradingKeyPair::from_secret_hex(TRADING_SECRET).unwrap())
        .with_clock(Arc::new(FixedClock(TS)))
}

#[test]
fn test_fixed_key_identifiers() {
    let signer = fixed_signer();
    assert_eq!(
        signer.orderly_key().public_key(),
        "ed25519:9C6hybhQ6Aycep9jaUnP6uL9ZYvDjUp1aSkFWPUFJtpj"
    );
    assert_eq!(
        signer.trading_key().unwrap().normalized_key_id(),
        "OTcxODZhMDY4YTZkNDI0NmFjMGVkMGNmNDg0NDI4ODYzZTU1ODdkZWVhNzZlMThkZWFhYjAzZTJhN2Y0NzExMQ=="
    );
}

#[test]
fn test_fixed_batch_vector() {
    let signer = fixed_signer();
    let rows = [
        params(json!({"price": 1, "qty": 2})),
        params(json!({"price": 3, "qty": 4})),
    ];

    let signed = signer
        .sign_batch_request(HttpMethod::Post, "/v1/batch-order", &rows)
        .unwrap();

    assert_eq!(row_signatures(signed.body.as_deref().unwrap()), vec![ROW_1_SIGNATURE, ROW_2_SIGNATURE]);
    assert_eq!(
        signed.body.as_deref().unwrap(),
        format!(
            r#"{{"orders":[{{"price":1,"qty":2,"signature":"{}"}},{{"price":3,"qty":4,"signature":"{}"}}]}}"#,
            ROW_1_SIGNATURE, ROW_2_SIGNATURE
        )
    );
    assert!(signed
        .canonical_message
        .starts_with("1649920583000POST/v1/batch-order{\"orders\":"));
    assert_eq!(
        signed.signature,
        "3G0JJ6x9iVJ9J1gHnDQ4lYgbb5Aq/Fi+67BNwV8nxGmdJFcELYI5GeYrYZ5wg3pq4sl5Bi7PVtR8/C+qYy6vBQ=="
    );
    assert_eq!(signed.header(HEADER_SIGNATURE), Some(signed.signature.as_str()));
}

#[test]
fn test_fixed_timestamp_signature() {
    let signer = fixed_signer();
    assert_eq!(
        signer.sign_timestamp(TS).unwrap(),
        "Ez8rVpAcgUx04gQ4WPrytSJB6P1/dSr9De6BVE3r/b2B4dy1tA669ucT/MP23rMQYvrVa4cMwCMO25WgsB8zCw=="
    );
}
