//! Text command parsing

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    History,
    Clear,
    Unknown(String),
}

impl Command {
    /// Parse a `/command`, ignoring a `@botname` suffix and any arguments
    ///
    /// Returns `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let name = word.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "history" => Command::History,
            "clear" => Command::Clear,
            _ => Command::Unknown(name),
        })
    }

    /// Bot username from a `/command@botname` suffix, if the text has one
    pub fn addressee(text: &str) -> Option<&str> {
        let word = text.split_whitespace().next()?;
        let (_, username) = word.strip_prefix('/')?.split_once('@')?;
        Some(username).filter(|name| !name.is_empty())
    }
}
