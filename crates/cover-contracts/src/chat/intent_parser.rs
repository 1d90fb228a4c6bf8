use super::command_registry::{find_command, ArgKind, CommandSpec};

/// One line of terminal input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Noop,
    Help,
    SetTitle(String),
    SetBody(String),
    LoadBody { path: String },
    Produce,
    Refine(String),
    /// `index` is `None` when the argument was not a non-negative integer.
    Restore { index: Option<usize> },
    History,
    Status,
    Export { path: Option<String> },
    Reset,
    SetTextModel(String),
    SetImageModel(String),
    /// Plain text; the front end decides whether it is a title or an edit.
    Text(String),
    Unknown { command: String, arg: String },
}

fn parse_path_args(arg: &str) -> Vec<String> {
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

fn parse_single_path_arg(arg: &str) -> String {
    parse_path_args(arg).join(" ")
}

fn build_intent(spec: &CommandSpec, arg: &str) -> Intent {
    let value = match spec.arg {
        ArgKind::None => String::new(),
        ArgKind::Raw | ArgKind::Index => arg.to_string(),
        ArgKind::Path | ArgKind::OptionalPath => parse_single_path_arg(arg),
    };
    match spec.command {
        "title" => Intent::SetTitle(value),
        "body" => Intent::SetBody(value),
        "body_file" => Intent::LoadBody { path: value },
        "produce" => Intent::Produce,
        "refine" => Intent::Refine(value),
        "restore" => Intent::Restore {
            index: value.parse::<usize>().ok(),
        },
        "history" => Intent::History,
        "status" => Intent::Status,
        "export" => Intent::Export {
            path: (!value.is_empty()).then_some(value),
        },
        "reset" => Intent::Reset,
        "text_model" => Intent::SetTextModel(value),
        "image_model" => Intent::SetImageModel(value),
        "help" => Intent::Help,
        other => Intent::Unknown {
            command: other.to_string(),
            arg: arg.to_string(),
        },
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            return match find_command(&command) {
                Some(spec) => build_intent(spec, arg),
                None => Intent::Unknown {
                    command,
                    arg: arg.to_string(),
                },
            };
        }
    }

    Intent::Text(raw_trimmed.to_string())
}
