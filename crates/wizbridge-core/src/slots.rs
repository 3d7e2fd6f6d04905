//! DMX slot extraction and the semantic slot vector derived from it.

/// The semantic value of one bulb's six DMX slots at a point in time.
///
/// `dimming` and `state` are derived, not raw: `dimming` is the dimmer
/// slot rescaled to 0-100, and `state` is simply `dimming > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotVector {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub c: u8,
    pub w: u8,
    pub dimming: u8,
    pub state: bool,
}

impl SlotVector {
    /// Extract the slot vector for a bulb starting at 1-based DMX
    /// `channel`.
    ///
    /// Per the original implementation's (preserved) off-by-one, the
    /// six slots occupy array indices `channel-1 ..= channel+4`: the
    /// first slot is read at `channel-1` but the remaining five are
    /// read starting at `channel`, not `channel+1`. Reads past the end
    /// of `data` are treated as 0.
    pub fn extract(data: &[u8], channel: u16) -> Self {
        let base = channel.saturating_sub(1) as usize;
        let at = |offset: usize| data.get(base + offset).copied().unwrap_or(0);

        let r = at(0);
        let g = at(1);
        let b = at(2);
        let c = at(3);
        let w = at(4);
        let dimmer_raw = at(5);

        let dimming = dimmer_percent(dimmer_raw);

        Self {
            r,
            g,
            b,
            c,
            w,
            dimming,
            state: dimming > 0,
        }
    }
}

/// `round(raw / 255 * 100)`, clamped to 0..=100.
fn dimmer_percent(raw: u8) -> u8 {
    let scaled = (raw as f64 / 255.0 * 100.0).round();
    scaled.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimmer_raw_zero_is_off() {
        assert_eq!(dimmer_percent(0), 0);
        assert!(!SlotVector::extract(&[0; 512], 1).state);
    }

    #[test]
    fn dimmer_raw_max_is_full() {
        assert_eq!(dimmer_percent(255), 100);
    }

    #[test]
    fn dimmer_raw_half_rounds_to_fifty() {
        assert_eq!(dimmer_percent(127), 50);
    }

    #[test]
    fn extract_reads_six_slots_at_channel_minus_one_offset() {
        let mut data = [0u8; 512];
        // channel = 1 -> base index 0, slots at 0..=5
        data[0] = 255; // r
        data[1] = 10; // g
        data[2] = 20; // b
        data[3] = 30; // c
        data[4] = 40; // w
        data[5] = 255; // dimmer

        let v = SlotVector::extract(&data, 1);
        assert_eq!(v.r, 255);
        assert_eq!(v.g, 10);
        assert_eq!(v.b, 20);
        assert_eq!(v.c, 30);
        assert_eq!(v.w, 40);
        assert_eq!(v.dimming, 100);
        assert!(v.state);
    }

    #[test]
    fn extract_out_of_range_reads_as_zero() {
        let data = [0u8; 4];
        let v = SlotVector::extract(&data, 1);
        assert_eq!(v, SlotVector::default());
    }

    #[test]
    fn channel_offset_matches_second_bulb_example() {
        // channel = 7 -> base index 6, slots at 6..=11
        let mut data = [0u8; 512];
        data[6] = 1;
        data[11] = 255;
        let v = SlotVector::extract(&data, 7);
        assert_eq!(v.r, 1);
        assert_eq!(v.dimming, 100);
    }
}
