use super::types::{Command, ToggleAction};

const PREFIX: char = '!';

fn quiet_action(arg: &str) -> ToggleAction {
    match arg {
        "" | "status" => ToggleAction::Status,
        "on" | "true" | "1" | "enable" | "enabled" => ToggleAction::Set(true),
        "off" | "false" | "0" | "disable" | "disabled" => ToggleAction::Set(false),
        _ => ToggleAction::Usage,
    }
}

fn travel_action(arg: &str) -> ToggleAction {
    match arg {
        "" | "status" => ToggleAction::Status,
        "pause" => ToggleAction::Set(true),
        "resume" => ToggleAction::Set(false),
        _ => ToggleAction::Usage,
    }
}

/// Recognises `!quiet` and `!travel`. Anything else, including other `!`
/// words, is not a command.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if !trimmed.starts_with(PREFIX) {
        return None;
    }

    // Only the first word after the command counts; the rest is ignored.
    let mut words = trimmed.split_whitespace();
    let cmd = words.next()?.to_lowercase();
    let arg = words.next().unwrap_or("").to_lowercase();

    match cmd.as_str() {
        "!quiet" => Some(Command::Quiet(quiet_action(&arg))),
        "!travel" => Some(Command::Travel(travel_action(&arg))),
        _ => None,
    }
}
