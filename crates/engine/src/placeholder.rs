// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command-template placeholder grammar (§6, §4.5 step 2, §4.7 steps
//! 6-7): literal tokens `%IN` and `%<UPPER>` (one per declared output key
//! and secondary-input key). Validation requires every declared key to
//! appear at least once in the command; runtime substitution requires the
//! map to be exhaustive.

use std::collections::HashMap;

const INPUT_TOKEN: &str = "%IN";

fn output_token(key: &str) -> String {
    format!("%{key}")
}

/// Every `%<UPPER>` token literally present in `command`, in first-seen
/// order, excluding the reserved `%IN` token.
pub fn declared_tokens(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let bytes = command.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                let token = format!("%{}", &command[start..end]);
                if token != INPUT_TOKEN && !tokens.contains(&token) {
                    tokens.push(token);
                }
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    tokens
}

/// Validate that `command` mentions `%IN` (if `requires_input`) and every
/// declared output/secondary key at least once (§4.7 steps 6-7).
pub fn validate_declared_keys(
    command: &str,
    requires_input: bool,
    output_keys: &[String],
    secondary_keys: &[String],
) -> Result<(), String> {
    if requires_input && !command.contains(INPUT_TOKEN) {
        return Err("command does not reference %IN".to_string());
    }
    for key in output_keys {
        let token = output_token(key);
        if !command.contains(&token) {
            return Err(format!("command does not reference output key {token}"));
        }
    }
    for key in secondary_keys {
        let token = output_token(key);
        if !command.contains(&token) {
            return Err(format!("command does not reference secondary key {token}"));
        }
    }
    Ok(())
}

/// Substitute every `%TOKEN` in `command` with its mapped value. The map's
/// keys must already carry the leading `%` (e.g. `"%IN"`, `"%OUT"`).
/// Fails if any `%<UPPER>` token in the command has no entry in `substitutions`.
pub fn substitute(
    command: &str,
    substitutions: &HashMap<String, String>,
) -> Result<String, String> {
    let mut result = String::with_capacity(command.len());
    let bytes = command.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
                end += 1;
            }
            if end > start {
                let token = format!("%{}", &command[start..end]);
                match substitutions.get(&token) {
                    Some(value) => result.push_str(value),
                    None => return Err(format!("unresolved placeholder {token}")),
                }
                i = end;
                continue;
            }
        }
        result.push(bytes[i] as char);
        i += 1;
    }
    Ok(result)
}
