// Command-line tokenizing for the dungeon console.

/// A typed line split into its verb and the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// First token, lower-cased.
    pub verb: String,
    /// Remaining tokens joined by single spaces, case preserved.
    pub argument: String,
}

impl CommandLine {
    pub fn verb_kind(&self) -> Verb {
        Verb::parse(&self.verb)
    }
}

/// Split a raw line. Blank input yields `None`.
pub fn parse(raw: &str) -> Option<CommandLine> {
    let mut tokens = raw.split_whitespace();
    let verb = tokens.next()?.to_lowercase();
    let argument = tokens.collect::<Vec<_>>().join(" ");
    Some(CommandLine { verb, argument })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Go,
    Back,
    Examine,
    Read,
    Inventory,
    /// `structure` or `map`.
    Structure,
    Help,
    Clear,
    Exit,
    Unknown,
}

impl Verb {
    pub fn parse(verb: &str) -> Self {
        match verb.to_lowercase().as_str() {
            "go" => Verb::Go,
            "back" => Verb::Back,
            "examine" => Verb::Examine,
            "read" => Verb::Read,
            "inventory" => Verb::Inventory,
            "structure" | "map" => Verb::Structure,
            "help" => Verb::Help,
            "clear" => Verb::Clear,
            "exit" => Verb::Exit,
            _ => Verb::Unknown,
        }
    }

    /// Verbs that work whether or not a repository is loaded.
    pub fn is_session_independent(self) -> bool {
        matches!(self, Verb::Help | Verb::Exit | Verb::Clear)
    }
}
