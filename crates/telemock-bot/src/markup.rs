// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply markup accepted from bots.

use serde_json::Value;

use telemock_core::TelemockError;

const KINDS: [&str; 4] = ["inline_keyboard", "keyboard", "remove_keyboard", "force_reply"];

/// Decode a `reply_markup` parameter, which bots send either as an object
/// or as a JSON-encoded string, and validate it.
pub fn parse_reply_markup(raw: &Value) -> Result<Value, TelemockError> {
    let markup = match raw {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map_err(|e| TelemockError::invalid(format!("reply_markup is not valid JSON: {e}")))?,
        other => other.clone(),
    };
    validate_reply_markup(&markup)?;
    Ok(markup)
}

/// Exactly one markup kind must be present. Inline buttons need `text` and
/// either `callback_data` or `url`; reply keyboard buttons need `text`.
pub fn validate_reply_markup(markup: &Value) -> Result<(), TelemockError> {
    let obj = markup
        .as_object()
        .ok_or_else(|| TelemockError::invalid("reply_markup must be an object"))?;

    let present: Vec<&str> = KINDS.into_iter().filter(|k| obj.contains_key(*k)).collect();
    let kind = match present.as_slice() {
        [kind] => *kind,
        [] => {
            return Err(TelemockError::invalid(
                "reply_markup must contain one of inline_keyboard, keyboard, remove_keyboard, force_reply",
            ));
        }
        _ => {
            return Err(TelemockError::invalid(format!(
                "reply_markup mixes {}",
                present.join(" and ")
            )));
        }
    };

    match kind {
        "inline_keyboard" => for_each_button(&obj[kind], kind, |button| {
            let has_target = ["callback_data", "url"]
                .iter()
                .any(|k| button.get(*k).and_then(Value::as_str).is_some_and(|s| !s.is_empty()));
            if has_text(button) && has_target {
                Ok(())
            } else {
                Err("inline buttons need text and callback_data or url")
            }
        }),
        "keyboard" => for_each_button(&obj[kind], kind, |button| {
            if has_text(button) || button.as_str().is_some_and(|s| !s.is_empty()) {
                Ok(())
            } else {
                Err("keyboard buttons need text")
            }
        }),
        _ => Ok(()),
    }
}

fn has_text(button: &Value) -> bool {
    button
        .get("text")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty())
}

fn for_each_button(
    rows: &Value,
    kind: &str,
    check: impl Fn(&Value) -> Result<(), &'static str>,
) -> Result<(), TelemockError> {
    let rows = rows
        .as_array()
        .ok_or_else(|| TelemockError::invalid(format!("{kind} must be an array of rows")))?;
    for (r, row) in rows.iter().enumerate() {
        let buttons = row
            .as_array()
            .ok_or_else(|| TelemockError::invalid(format!("{kind} row {r} must be an array")))?;
        for (b, button) in buttons.iter().enumerate() {
            check(button)
                .map_err(|reason| TelemockError::invalid(format!("{kind}[{r}][{b}]: {reason}")))?;
        }
    }
    Ok(())
}
