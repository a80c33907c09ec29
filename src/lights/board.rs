use super::protocol::LightCommand;

const LIT: &str = "\x1b[93m\\!/";
const DARK: &str = "\x1b[90m . ";
const RESET: &str = "\x1b[m";

#[derive(Debug, thiserror::Error)]
#[error("invalid channel number {channel} (must be between 0 and {max})")]
pub struct InvalidChannel {
    pub channel: usize,
    pub max: usize,
}

/// Terminal stand-in for the light hardware.
#[derive(Debug)]
pub struct LightBoard {
    lights: Vec<bool>,
}

impl LightBoard {
    pub fn new(light_count: usize) -> Self {
        Self {
            lights: vec![false; light_count],
        }
    }

    pub fn apply(&mut self, command: LightCommand) -> Result<(), InvalidChannel> {
        let max = self.lights.len().saturating_sub(1);
        let light = self
            .lights
            .get_mut(command.channel)
            .ok_or(InvalidChannel {
                channel: command.channel,
                max,
            })?;
        *light = command.on;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = self
            .lights
            .iter()
            .map(|&on| if on { LIT } else { DARK })
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(RESET);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_commands() {
        let mut board = LightBoard::new(3);
        board.apply(LightCommand { channel: 1, on: true }).unwrap();
        assert_eq!(&board.lights[..], &[false, true, false]);
        board.apply(LightCommand { channel: 1, on: false }).unwrap();
        assert_eq!(&board.lights[..], &[false, false, false]);
    }

    #[test]
    fn out_of_range_channel_is_rejected() {
        let mut board = LightBoard::new(2);
        let err = board.apply(LightCommand { channel: 9, on: true }).unwrap_err();
        assert_eq!(err.channel, 9);
        assert_eq!(err.to_string(), "invalid channel number 9 (must be between 0 and 1)");
        assert_eq!(&board.lights[..], &[false, false]);
    }

    #[test]
    fn renders_one_cell_per_light() {
        let mut board = LightBoard::new(2);
        board.apply(LightCommand { channel: 0, on: true }).unwrap();
        assert_eq!(board.render(), "\x1b[93m\\!/ \x1b[90m . \x1b[m");
    }
}
