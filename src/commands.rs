pub const HELP_MSG: &str = "
Hi, I'm Nozomi.
I re-send any media that was forwarded from another channel.

Just add me to your group, make me admin (to allow deleting the forwards), and I'll do my work.
";

pub const VIBECHECK_MSG: &str = "yeah, I'm good, thanks";

/// Commands the bot understands. Names are matched case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    VibeCheck,
    Resend,
}

impl Command {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "vibecheck" => Some(Command::VibeCheck),
            "resend" => Some(Command::Resend),
            _ => None,
        }
    }
}

/// What the dispatcher should do for a command message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Reply(&'static str),
    /// Relay the message the command replies to
    Resend,
    Ignore,
}

pub fn route(name: &str) -> CommandAction {
    match Command::parse(name) {
        Some(Command::Start | Command::Help) => CommandAction::Reply(HELP_MSG),
        Some(Command::VibeCheck) => CommandAction::Reply(VIBECHECK_MSG),
        Some(Command::Resend) => CommandAction::Resend,
        None => CommandAction::Ignore,
    }
}
