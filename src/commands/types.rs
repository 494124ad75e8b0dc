/// What a toggle command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Status,
    Set(bool),
    /// Unrecognised argument; answered with a usage line.
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `!quiet [status|on|off]`. `Set(true)` silences `@here`.
    Quiet(ToggleAction),
    /// `!travel [status|pause|resume]`. `Set(true)` pauses tracking.
    Travel(ToggleAction),
}

/// Text posted back in the command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
}

impl CommandReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
