use serde_json::{json, Value};

pub fn question_body(title: &str, tags: &[&str]) -> Value {
    json!({
        "title": title,
        "content": format!("Details about {title}"),
        "tags": tags,
    })
}

pub fn alice() -> String {
    super::token_for("alice", "Alice")
}

pub fn bob() -> String {
    super::token_for("bob", "Bob")
}
