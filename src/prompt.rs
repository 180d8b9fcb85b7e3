use crate::schema::{Field, MISSING};

pub const SYSTEM_PROMPT: &str = "Extract interview data from text.";

/// Generate a prompt asking the model to pull the interview fields out of a post or comment.
pub fn field_extraction_prompt(text: &str) -> String {
    let keys = Field::ALL
        .iter()
        .map(|field| format!("\"{}\"", field.key()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
You are an expert data extractor for medical school interview statistics. Extract the following fields from the provided text:
1) time_stamp (the date or time information)
2) program (e.g., MD, MD/PhD, etc.)
3) result (e.g., Invite, Rejection)
4) omsas_gpa (if provided)
5) cars (if provided)
6) casper (if provided)
7) geography (e.g., IP/OOP)
8) current_year (e.g., 3rd, 4th, etc.)

If any field is missing, use "{missing}" as its value.
Return the answer as valid JSON with exactly these keys: {keys}.
Do not add any commentary before or after the JSON.

Text:
"""{text}"""
"#,
        missing = MISSING,
        keys = keys,
        text = text,
    )
}
