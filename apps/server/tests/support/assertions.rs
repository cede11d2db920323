use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::Value;

pub fn assert_status(actual: StatusCode, expected: StatusCode, context: &str) {
    assert_eq!(actual, expected, "{context}: expected {expected}, got {actual}");
}

/// Assert the shared JSON error body and return its message.
pub fn assert_error_body(body: &Bytes, expected_status: StatusCode) -> String {
    let value: Value = serde_json::from_slice(body).expect("error body is JSON");
    assert_eq!(
        value["status"].as_u64(),
        Some(u64::from(expected_status.as_u16())),
        "error body status"
    );
    value["message"]
        .as_str()
        .expect("error body has a message")
        .to_string()
}

/// Ids of a question list, in response order.
pub fn question_ids(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("question list is an array")
        .iter()
        .map(|q| q["id"].as_str().expect("question has id").to_string())
        .collect()
}
