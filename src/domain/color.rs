pub const COMPLETED_LIGHTEN_PERCENT: u8 = 55;

pub fn random_batch_color() -> String {
    let value = rand::random::<u32>() & 0x00FF_FFFF;
    format!("#{value:06x}")
}

pub fn is_valid_hex_color(value: &str) -> bool {
    parse_hex_color(value).is_some()
}

fn parse_hex_color(value: &str) -> Option<[u8; 3]> {
    let digits = value.strip_prefix('#')?;
    if digits.len() != 6 || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

/// Moves every channel `percent`% of the way towards white.
///
/// Percentages above 100 are clamped. Values that are not `#RRGGBB` (for example the
/// short colors written by older clients) are returned unchanged.
pub fn lighten_color(color: &str, percent: u8) -> String {
    let Some(channels) = parse_hex_color(color) else {
        return color.to_string();
    };
    let percent = u16::from(percent.min(100));
    let [red, green, blue] = channels.map(|channel| {
        let channel = u16::from(channel);
        let lifted = channel + (255 - channel) * percent / 100;
        lifted.min(255) as u8
    });
    format!("#{red:02x}{green:02x}{blue:02x}")
}

pub fn display_color(color: &str, completed: bool) -> String {
    if completed {
        lighten_color(color, COMPLETED_LIGHTEN_PERCENT)
    } else {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn channel_sum(color: &str) -> u32 {
        parse_hex_color(color)
            .expect("valid color")
            .iter()
            .map(|channel| u32::from(*channel))
            .sum()
    }

    #[test]
    fn random_colors_are_valid_hex() {
        for _ in 0..256 {
            let color = random_batch_color();
            assert!(is_valid_hex_color(&color), "invalid color {color}");
        }
    }

    #[test]
    fn hex_validation_rejects_short_and_malformed_values() {
        assert!(is_valid_hex_color("#a1B2c3"));
        assert!(!is_valid_hex_color("#3fa2"));
        assert!(!is_valid_hex_color("a1b2c3"));
        assert!(!is_valid_hex_color("#g1b2c3"));
        assert!(!is_valid_hex_color("#a1b2c3ff"));
    }

    #[test]
    fn lighten_color_hits_endpoints() {
        assert_eq!(lighten_color("#204080", 0), "#204080");
        assert_eq!(lighten_color("#204080", 100), "#ffffff");
        assert_eq!(lighten_color("#204080", 250), "#ffffff");
        assert_eq!(lighten_color("#000000", 50), "#7f7f7f");
    }

    #[test]
    fn lighten_color_passes_through_legacy_values() {
        assert_eq!(lighten_color("#3fa2", 40), "#3fa2");
    }

    #[test]
    fn display_color_only_changes_completed_blocks() {
        assert_eq!(display_color("#336699", false), "#336699");
        assert_ne!(display_color("#336699", true), "#336699");
    }

    proptest! {
        #[test]
        fn lightening_is_monotonic_and_valid(
            value in 0u32..=0x00FF_FFFF,
            lower in 0u8..=100,
            step in 0u8..=100,
        ) {
            let color = format!("#{value:06x}");
            let higher = lower.saturating_add(step).min(100);

            let light = lighten_color(&color, lower);
            let lighter = lighten_color(&color, higher);

            prop_assert!(is_valid_hex_color(&light));
            prop_assert!(is_valid_hex_color(&lighter));
            prop_assert!(channel_sum(&light) <= channel_sum(&lighter));
            prop_assert!(channel_sum(&color) <= channel_sum(&light));
        }
    }
}
