//! Line-oriented control commands for interactive runs.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Spawn this many healthy phones
    Spawn(usize),
    /// Infect a random healthy phone
    Infect,
    /// Toggle pause
    Pause,
    /// Log current statistics
    Status,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();

        let command = match verb.as_str() {
            "spawn" | "s" => {
                let count = match arg {
                    Some(n) => n.parse().map_err(|_| format!("invalid phone count: {n}"))?,
                    None => 1,
                };
                Command::Spawn(count)
            }
            "infect" | "i" => Command::Infect,
            "pause" | "p" => Command::Pause,
            "status" => Command::Status,
            "quit" | "exit" | "q" => Command::Quit,
            "" => return Err("empty command".to_string()),
            other => {
                return Err(format!(
                    "unknown command: {other} (spawn [n], infect, pause, status, quit)"
                ))
            }
        };

        if words.next().is_some() || (arg.is_some() && !matches!(command, Command::Spawn(_))) {
            return Err(format!("too many arguments: {}", s.trim()));
        }
        Ok(command)
    }
}
