//! Slash-command grammar: `/name[@bot] [params]`, case-insensitive.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Today,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "today" => Some(Command::Today),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Today => "today",
        }
    }
}

/// A well-formed slash command, recognized or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased, without the leading `/` or any `@bot` suffix.
    pub name: String,
    pub params: String,
}

impl ParsedCommand {
    pub fn command(&self) -> Option<Command> {
        Command::from_name(&self.name)
    }
}

/// `None` for anything that is not a slash command.
pub fn parse(text: Option<&str>) -> Option<ParsedCommand> {
    let text = text?.trim();
    let rest = text.strip_prefix('/')?;
    let (head, params) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or_default().to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        name,
        params: params.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Option<String> {
        parse(Some(text)).map(|p| p.name)
    }

    #[test]
    fn recognizes_commands_case_insensitively() {
        assert_eq!(parse(Some("/today")).and_then(|p| p.command()), Some(Command::Today));
        assert_eq!(parse(Some("  /HELP  ")).and_then(|p| p.command()), Some(Command::Help));
        assert_eq!(
            parse(Some("/Start@DafHistoryBot")).and_then(|p| p.command()),
            Some(Command::Start)
        );
    }

    #[test]
    fn keeps_params() {
        let parsed = parse(Some("/today   some   thing ")).unwrap();
        assert_eq!(parsed.name, "today");
        assert_eq!(parsed.params, "some   thing");
        let parsed = parse(Some("/today@bot\textra")).unwrap();
        assert_eq!(parsed.name, "today");
        assert_eq!(parsed.params, "extra");
    }

    #[test]
    fn unknown_commands_parse_but_do_not_map() {
        let parsed = parse(Some("/subscribe")).unwrap();
        assert_eq!(parsed.name, "subscribe");
        assert_eq!(parsed.command(), None);
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse(None), None);
        assert_eq!(name(""), None);
        assert_eq!(name("   "), None);
        assert_eq!(name("hello /today"), None);
        assert_eq!(name("/"), None);
        assert_eq!(name("/@bot"), None);
    }
}
