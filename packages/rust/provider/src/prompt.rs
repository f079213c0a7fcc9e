//! Per-field user prompt.

use fieldfill_shared::FieldDescriptor;

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() { placeholder } else { value }
}

/// Describe the field and ask for a bare value.
pub fn field_prompt(field: &FieldDescriptor) -> String {
    let max_length = field
        .max_length
        .map(|n| n.to_string())
        .unwrap_or_else(|| "No limit".to_string());

    format!(
        r#"Fill this form field based on the system instructions:

Field Information:
- Type: {kind}
- Label: {label}
- Placeholder: {placeholder}
- Context: {context}
- Required: {required}
- Max Length: {max_length}

Instructions:
1. Provide ONLY the value to fill in this field
2. Do not include quotes, explanations, or additional text
3. Make sure the response fits the field type and constraints
4. If it's an email field, provide a valid email format
5. If it's a phone field, provide a valid phone number format
6. Keep responses concise and appropriate for form filling

Response:"#,
        kind = field.kind,
        label = or_placeholder(&field.label, "No label"),
        placeholder = or_placeholder(&field.placeholder, "No placeholder"),
        context = or_placeholder(&field.context, "No additional context"),
        required = if field.required { "Yes" } else { "No" },
    )
}
