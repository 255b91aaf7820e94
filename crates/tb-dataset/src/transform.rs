use tb_core::core::{ChatRecord, DatasetError, Role, TuningExample};

/// Flattens a validated chat record into one `(input, output)` pair.
///
/// System content is appended to the input followed by a single space, user
/// content is appended as-is, and the result is trimmed at both ends. The last
/// assistant message becomes the output verbatim.
pub fn transform(record: &ChatRecord) -> Result<TuningExample, DatasetError> {
    let mut input_text = String::new();
    let mut output_text: Option<&str> = None;

    for message in &record.messages {
        match message.role {
            Role::System => {
                input_text.push_str(&message.content);
                input_text.push(' ');
            }
            Role::User => input_text.push_str(&message.content),
            Role::Assistant => output_text = Some(&message.content),
        }
    }

    let output_text = output_text.ok_or(DatasetError::MissingField {
        field: Role::Assistant.as_str(),
        location: None,
    })?;

    Ok(TuningExample {
        input_text: input_text.trim().to_owned(),
        output_text: output_text.to_owned(),
    })
}
