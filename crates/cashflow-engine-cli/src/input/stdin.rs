use serde_json::Value;
use std::io::{self, Read};

/// Piped request body, if any. An interactive terminal or blank input
/// yields `None` so the caller can ask for `--input` instead.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut body = String::new();
    io::stdin().lock().read_to_string(&mut body)?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    let request = serde_json::from_str(&body)
        .map_err(|e| format!("Failed to parse request from stdin: {}", e))?;
    Ok(Some(request))
}
