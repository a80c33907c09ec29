use super::protocol::LightCommand;

/// Turns calibrated bucket amplitudes into on/off commands, one channel per bucket.
#[derive(Debug)]
pub struct LightController {
    thresholds: Vec<f64>,
    states: Vec<bool>,
    last_switch_ms: Vec<Option<f64>>,
    hold_off_ms: f64,
}

impl LightController {
    pub fn new(thresholds: Vec<f64>, hold_off_ms: f64) -> Self {
        let n = thresholds.len();
        Self {
            thresholds,
            states: vec![false; n],
            last_switch_ms: vec![None; n],
            hold_off_ms,
        }
    }

    /// Commands for the channels that change state at `now_ms`. A channel that
    /// switched less than `hold_off_ms` ago keeps its state.
    pub fn update(&mut self, amplitudes: &[f64], now_ms: f64) -> Vec<LightCommand> {
        let mut commands = Vec::new();
        for (channel, (&amplitude, &threshold)) in
            amplitudes.iter().zip(&self.thresholds).enumerate()
        {
            let on = amplitude > threshold;
            if on == self.states[channel] {
                continue;
            }
            let settled = self.last_switch_ms[channel]
                .map_or(true, |last| now_ms - last >= self.hold_off_ms);
            if !settled {
                continue;
            }
            self.states[channel] = on;
            self.last_switch_ms[channel] = Some(now_ms);
            commands.push(LightCommand { channel, on });
        }
        commands
    }
}
