// Console flavor text.

use rand::seq::SliceRandom;

pub const WELCOME: &[&str] = &[
    "Welcome to The Coder's Dungeon!",
    "Enter a GitHub repository URL to begin your adventure (e.g., facebook/react):",
];

pub const CLEARED: &str =
    "✨ The mystical console has been cleared. Type \"help\" to consult your spellbook.";

pub const FAREWELL: &str = "🚪 You step through the portal and leave the dungeon. \
                            Enter a new repository to begin another adventure.";

pub const UNKNOWN_COMMAND: &str = "Unknown command. Type \"help\" for a list of commands.";

pub const AT_ENTRANCE: &str =
    "🏛️ You are already at the entrance of the dungeon. There is nowhere to go back to.";

pub const INVALID_REPOSITORY: &str =
    "Please provide a valid GitHub repository path (e.g., facebook/react)";

pub const HELP: &[&str] = &[
    "📚 Your Arcane Spellbook - Available Commands:",
    "",
    "🧭 go [chamber] - Venture into a new chamber (directory)",
    "🔄 back - Return to the previous chamber you visited",
    "🔍 examine [artifact] - Study a magical artifact (file)",
    "📖 read [scroll] - Decipher the runes of an artifact (file contents)",
    "🎒 inventory - Check your magical satchel",
    "🗺️ structure/map - Unfurl the dungeon map (repo structure)",
    "❓ help - Consult your spellbook",
    "✨ clear - Clear the mystical console",
    "🚪 exit - Leave the current dungeon",
    "",
    "💡 Tip: Use \"back\" to retrace your steps through the dungeon!",
];

pub const COMPASS: &[&str] = &["north", "south", "east", "west", "up", "down"];

const ROOM_TEMPLATES: &[&str] = &[
    "🏛️ You step into the {} chamber. The walls are lined with ancient scrolls and magical artifacts.",
    "🌌 You enter the {} realm. Mystical energies pulse through the air.",
    "🏰 You cross the threshold into {}. This chamber holds secrets yet to be discovered.",
    "⚡ You venture into the {} sanctum. Arcane symbols glow faintly on the walls.",
    "🔮 You find yourself in the {} library. Knowledge awaits those who seek it.",
];

const RETRACE: &[&str] = &[
    "🔄 You retrace your steps through the mystical corridors.",
    "🏛️ You return to the previous chamber, the familiar arcane energies welcome you back.",
    "🧭 You navigate back through the dungeon's winding passages.",
    "⚡ You step back through the portal to the previous realm.",
    "🔮 You find yourself back in the familiar chamber you visited before.",
];

pub fn entered_repository(repo: &str) -> Vec<String> {
    vec![
        format!("🏰 You have entered the mystical repository: {repo}"),
        "The air hums with arcane energy. Ancient code artifacts await your discovery.".into(),
        "Type \"go [directory]\" to explore chambers, \"examine [file]\" to inspect artifacts, \
         or \"help\" for your spellbook."
            .into(),
    ]
}

/// A randomly chosen arrival line for `chamber`.
pub fn room_description(chamber: &str) -> String {
    let template = ROOM_TEMPLATES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(ROOM_TEMPLATES[0]);
    template.replace("{}", chamber)
}

pub fn retrace_description() -> String {
    RETRACE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(RETRACE[0])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_description_names_chamber() {
        for _ in 0..20 {
            assert!(room_description("docs").contains("docs"));
        }
    }

    #[test]
    fn test_retrace_description_is_known() {
        let line = retrace_description();
        assert!(RETRACE.contains(&line.as_str()));
    }
}
