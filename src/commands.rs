//! `:` commands and their autocomplete.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Assets,
  WorkOrders,
  Resources,
  Inventory,
  Logout,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub kind: CommandKind,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "assets",
    aliases: &["a", "asset", "equipment"],
    description: "Browse assets",
    kind: CommandKind::Assets,
  },
  Command {
    name: "workorders",
    aliases: &["w", "wo", "work-orders"],
    description: "Browse work orders",
    kind: CommandKind::WorkOrders,
  },
  Command {
    name: "resources",
    aliases: &["r", "users", "people"],
    description: "Technicians and assignments",
    kind: CommandKind::Resources,
  },
  Command {
    name: "inventory",
    aliases: &["i", "inv", "parts"],
    description: "Spare parts stock",
    kind: CommandKind::Inventory,
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "End the session",
    kind: CommandKind::Logout,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit m9s",
    kind: CommandKind::Quit,
  },
];

/// Rank of `cmd` for `input` (lower is better), or None when it doesn't match.
fn rank(cmd: &Command, input: &str) -> Option<u32> {
  let aliases = || cmd.aliases.iter();
  if cmd.name == input {
    Some(0)
  } else if aliases().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if aliases().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// Get autocomplete suggestions for a given input, best first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (cmd, r)))
    .collect();
  // Stable sort keeps declaration order among equal ranks
  matches.sort_by_key(|(_, r)| *r);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve a submitted command name
pub fn resolve(name: &str) -> Option<CommandKind> {
  get_suggestions(name).first().map(|cmd| cmd.kind)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_and_alias_match() {
    assert_eq!(get_suggestions("assets")[0].name, "assets");
    assert_eq!(get_suggestions("wo")[0].name, "workorders");
    assert_eq!(get_suggestions("users")[0].name, "resources");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("inv")[0].name, "inventory");
    assert_eq!(get_suggestions("work")[0].name, "workorders");
  }

  #[test]
  fn test_fuzzy_match() {
    assert_eq!(get_suggestions("order")[0].name, "workorders");
  }

  #[test]
  fn test_resolve() {
    assert_eq!(resolve("a"), Some(CommandKind::Assets));
    assert_eq!(resolve("Quit"), Some(CommandKind::Quit));
    assert_eq!(resolve("zzz"), None);
  }
}
