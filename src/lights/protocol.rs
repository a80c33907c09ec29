use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// One `p<channel>s<0|1>` instruction for the light controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightCommand {
    pub channel: usize,
    pub on: bool,
}

impl fmt::Display for LightCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}s{}", self.channel, if self.on { 1 } else { 0 })
    }
}

/// Newline-terminated line for one time step, or `None` if nothing changed.
pub fn encode_line(commands: &[LightCommand]) -> Option<String> {
    if commands.is_empty() {
        return None;
    }
    let mut line: String = commands.iter().map(|c| c.to_string()).collect();
    line.push('\n');
    Some(line)
}

/// Extracts every command from a line, ignoring anything else on it.
pub fn parse_line(line: &str) -> Vec<LightCommand> {
    static COMMAND_RE: OnceLock<Regex> = OnceLock::new();
    let re = COMMAND_RE.get_or_init(|| Regex::new(r"p(\d+)s([01])").expect("command regex must compile"));

    re.captures_iter(line)
        .filter_map(|caps| {
            let channel = caps[1].parse().ok()?;
            Some(LightCommand {
                channel,
                on: &caps[2] == "1",
            })
        })
        .collect()
}
