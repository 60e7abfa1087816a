//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod recording_dao;
pub mod user;

use serde_json::{Map, Value};

/// Install a fmt subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Object literal to attribute map.
pub fn attrs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
