//! JSON result reporting.
//!
//! Results go on stdout so they stay machine-readable; logs go to
//! stderr. A successful run exits 0, a failed run exits 1 after
//! emitting `{"failed": true, "msg": ...}`.

use serde::Serialize;
use serde_json::{json, Value};

/// Report a successful run with a result payload under `key`.
pub fn success<T: Serialize>(changed: bool, key: &str, payload: &T) {
    let mut result = serde_json::Map::new();
    result.insert("changed".to_string(), Value::Bool(changed));
    result.insert(key.to_string(), json!(payload));
    emit(&Value::Object(result));
}

/// Report a successful run with no payload (check mode, absent state).
pub fn changed_only(changed: bool) {
    emit(&json!({ "changed": changed }));
}

/// Report a failed run and exit with a non-zero status.
pub fn failure(msg: &str) -> ! {
    emit(&json!({ "failed": true, "msg": msg }));
    std::process::exit(1);
}

fn emit(value: &Value) {
    println!("{value}");
}
