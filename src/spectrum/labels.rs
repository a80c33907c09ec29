/// Display name for each channel: stereo gets Left/Right, anything else is numbered.
pub fn channel_labels(channel_count: usize) -> Vec<String> {
    match channel_count {
        2 => vec!["Left".to_string(), "Right".to_string()],
        n => (0..n).map(|i| format!("Channel {}", i)).collect(),
    }
}

/// Column headers in channel-major, bucket-ascending order.
pub fn column_labels(channels: &[String], centers: &[f64]) -> Vec<String> {
    channels
        .iter()
        .flat_map(|channel| {
            centers
                .iter()
                .map(move |center| format!("{} {:.1} Hz", channel, center))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_is_named() {
        assert_eq!(channel_labels(2), vec!["Left", "Right"]);
    }

    #[test]
    fn other_layouts_are_numbered() {
        assert_eq!(channel_labels(1), vec!["Channel 0"]);
        assert_eq!(
            channel_labels(3),
            vec!["Channel 0", "Channel 1", "Channel 2"]
        );
    }

    #[test]
    fn columns_are_channel_major() {
        let cols = column_labels(&channel_labels(2), &[25.0, 1000.4]);
        assert_eq!(
            cols,
            vec!["Left 25.0 Hz", "Left 1000.4 Hz", "Right 25.0 Hz", "Right 1000.4 Hz"]
        );
    }
}
