use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, INDEX_COMMANDS, INDEX_PATH_COMMANDS, NO_ARG_COMMANDS, OPTIONAL_PATH_COMMANDS,
};

/// One parsed line of the interactive session.
///
/// Plain text becomes a `generate` intent carrying the untrimmed text in
/// `prompt`; slash commands map to an `action` plus `command_args`.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub prompt: Option<String>,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            prompt: None,
            command_args: BTreeMap::new(),
        }
    }

    /// 1-based gallery position converted to a 0-based index.
    pub fn index(&self) -> Option<usize> {
        self.command_args
            .get("index")
            .and_then(Value::as_u64)
            .filter(|value| *value > 0)
            .map(|value| value as usize - 1)
    }

    pub fn path(&self) -> Option<&str> {
        self.command_args
            .get("path")
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn index_value(raw: Option<&String>) -> Value {
    raw.and_then(|value| value.parse::<u64>().ok())
        .map(|value| Value::Number(value.into()))
        .unwrap_or(Value::Null)
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, INDEX_COMMANDS) {
                let parts = split_args(arg);
                let mut intent = Intent::new(action, text);
                intent
                    .command_args
                    .insert("index".to_string(), index_value(parts.first()));
                return intent;
            }

            if let Some(action) = find_action(&command, INDEX_PATH_COMMANDS) {
                let mut parts = split_args(arg);
                let mut intent = Intent::new(action, text);
                let index = index_value(parts.first());
                if !index.is_null() {
                    parts.remove(0);
                }
                intent.command_args.insert("index".to_string(), index);
                intent
                    .command_args
                    .insert("path".to_string(), Value::String(parts.join(" ")));
                return intent;
            }

            if let Some(action) = find_action(&command, OPTIONAL_PATH_COMMANDS) {
                let mut intent = Intent::new(action, text);
                intent.command_args.insert(
                    "path".to_string(),
                    Value::String(split_args(arg).join(" ")),
                );
                return intent;
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent
                .command_args
                .insert("command".to_string(), Value::String(command));
            intent
                .command_args
                .insert("arg".to_string(), Value::String(arg.to_string()));
            return intent;
        }
    }

    let mut intent = Intent::new("generate", text);
    intent.prompt = Some(text.trim_end_matches(['\n', '\r']).to_string());
    intent
}
