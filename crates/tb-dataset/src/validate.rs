use serde_json::Value;
use tb_core::core::Role;

/// Checks that a parsed line has the OpenAI chat shape:
/// `{"messages": [{"role": ..., "content": ...}, ...]}` with every role one of
/// `system`, `user` or `assistant`.
///
/// Pure predicate; the reason for a rejection is not reported.
pub fn validate(record: &Value) -> bool {
    let Some(messages) = record.get("messages").and_then(Value::as_array) else {
        return false;
    };

    messages.iter().all(|message| {
        let Some(fields) = message.as_object() else {
            return false;
        };
        let role_ok = fields
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .is_some();
        let content_ok = fields.get("content").is_some_and(Value::is_string);
        role_ok && content_ok
    })
}
