#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Cancel,
    /// Copies a code block (1-based) of the latest assistant reply.
    Copy { block: usize },
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed);
    let argument = words.next();

    let parsed = match (command, argument) {
        ("/help", _) => SlashCommand::Help,
        ("/clear", _) => SlashCommand::Clear,
        ("/cancel", _) => SlashCommand::Cancel,
        ("/quit" | "/exit", _) => SlashCommand::Quit,
        ("/copy", None) => SlashCommand::Copy { block: 1 },
        ("/copy", Some(raw)) => match raw.parse::<usize>() {
            Ok(block) if block > 0 => SlashCommand::Copy { block },
            _ => SlashCommand::Unknown(trimmed.to_string()),
        },
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
