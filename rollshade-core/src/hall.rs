//! Quadrature decoding of the two Hall sensors.
//!
//! The sensors fire in this order:
//! - Upward movement: HALL1 high, HALL2 high, HALL1 low, HALL2 low
//! - Downward movement: HALL2 high, HALL1 high, HALL2 low, HALL1 low
//!
//! Each edge maps to one of four rotor phases; the phase delta between
//! consecutive edges gives the sensed rotation direction. Hall-1 edges also
//! feed the inter-edge interval used for RPM and stall detection.

use crate::bridge::Direction;
use crate::config::GEAR_RATIO;

/// Which Hall sensor produced an edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HallSensor {
    Hall1,
    Hall2,
}

/// Edge decoder state plus the Hall-1 timing counters.
pub struct HallDecoder {
    /// Last decoded rotor phase (0..=3); -1 until the first edge is seen.
    rotor_position: i32,
    hall_1_ticks: u32,
    hall_2_ticks: u32,
    /// Milliseconds since the last Hall-1 edge, bumped by the 1 ms tick.
    hall_1_idle_ms: u32,
    /// Last measured gap between Hall-1 edges; 0 until two edges are seen.
    hall_1_interval_ms: u32,
}

impl HallDecoder {
    pub fn new() -> Self {
        Self {
            rotor_position: -1,
            hall_1_ticks: 0,
            hall_2_ticks: 0,
            hall_1_idle_ms: 0,
            hall_1_interval_ms: 0,
        }
    }

    /// Decode one sensor edge.
    ///
    /// Returns the sensed rotation direction, or `None` for the very first
    /// edge and for a phase skip of 2 (direction change between edges).
    pub fn feed(&mut self, sensor: HallSensor, level: bool) -> Option<Direction> {
        // HALL1 high = 0, HALL2 high = 1, HALL1 low = 2, HALL2 low = 3.
        // Up cycles 0,1,2,3,...; down cycles 1,0,3,2,...
        let index = match sensor {
            HallSensor::Hall1 => 0,
            HallSensor::Hall2 => 1,
        };
        let new_phase = index + if level { 0 } else { 2 };

        match sensor {
            HallSensor::Hall1 => {
                self.hall_1_ticks += 1;
                if self.hall_1_ticks > 1 {
                    // At least two edges are needed before the gap is a
                    // meaningful interval.
                    self.hall_1_interval_ms = self.hall_1_idle_ms;
                }
                self.hall_1_idle_ms = 0;
            }
            HallSensor::Hall2 => self.hall_2_ticks += 1,
        }

        let sense = if self.rotor_position >= 0 {
            match (4 + new_phase - self.rotor_position) & 0x3 {
                1 => Some(Direction::Up),
                3 => Some(Direction::Down),
                // A skip of 2 means the rotor reversed between edges; no
                // location delta can be attributed to it.
                _ => None,
            }
        } else {
            None
        };

        self.rotor_position = new_phase;
        sense
    }

    /// Advance the idle counter by one millisecond of the stall tick.
    #[inline]
    pub fn bump_idle(&mut self) {
        self.hall_1_idle_ms += 1;
    }

    /// Current curtain-rod RPM derived from the Hall-1 interval.
    pub fn rpm(&self) -> u32 {
        if self.hall_1_interval_ms != 0 {
            // 60000 ms per minute, two Hall-1 edges per motor revolution,
            // GEAR_RATIO motor revolutions per rod revolution.
            60 * 1000 / GEAR_RATIO as u32 / self.hall_1_interval_ms / 2
        } else {
            0
        }
    }

    /// Zero the per-movement counters. The rotor phase survives so a
    /// direction change across a stop is still detected.
    pub fn reset_motion(&mut self) {
        self.hall_1_ticks = 0;
        self.hall_2_ticks = 0;
        self.hall_1_idle_ms = 0;
        self.hall_1_interval_ms = 0;
    }

    #[inline]
    pub fn idle_ms(&self) -> u32 {
        self.hall_1_idle_ms
    }

    #[inline]
    pub fn interval_ms(&self) -> u32 {
        self.hall_1_interval_ms
    }

    #[inline]
    pub fn hall_1_ticks(&self) -> u32 {
        self.hall_1_ticks
    }

    #[inline]
    pub fn hall_2_ticks(&self) -> u32 {
        self.hall_2_ticks
    }
}

impl Default for HallDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed the four-edge cycle of an upward rotation once.
    fn feed_up_cycle(dec: &mut HallDecoder) -> [Option<Direction>; 4] {
        [
            dec.feed(HallSensor::Hall1, true),
            dec.feed(HallSensor::Hall2, true),
            dec.feed(HallSensor::Hall1, false),
            dec.feed(HallSensor::Hall2, false),
        ]
    }

    #[test]
    fn first_edge_yields_no_direction() {
        let mut dec = HallDecoder::new();
        assert_eq!(dec.feed(HallSensor::Hall1, true), None);
    }

    #[test]
    fn upward_sequence_decodes_up() {
        let mut dec = HallDecoder::new();
        let senses = feed_up_cycle(&mut dec);
        assert_eq!(senses[0], None); // fresh decoder
        assert_eq!(senses[1..], [Some(Direction::Up); 3]);
        // Next cycle is all Up.
        assert_eq!(feed_up_cycle(&mut dec), [Some(Direction::Up); 4]);
    }

    #[test]
    fn downward_sequence_decodes_down() {
        let mut dec = HallDecoder::new();
        dec.feed(HallSensor::Hall2, true);
        assert_eq!(dec.feed(HallSensor::Hall1, true), Some(Direction::Down));
        assert_eq!(dec.feed(HallSensor::Hall2, false), Some(Direction::Down));
        assert_eq!(dec.feed(HallSensor::Hall1, false), Some(Direction::Down));
    }

    #[test]
    fn direction_change_skips_one_phase() {
        let mut dec = HallDecoder::new();
        // Up to phase 2 (HALL2 high then HALL1 low)...
        dec.feed(HallSensor::Hall1, true);
        dec.feed(HallSensor::Hall2, true);
        dec.feed(HallSensor::Hall1, false);
        // ...then the rotor reverses: HALL1 high is phase 0, a skip of 2.
        assert_eq!(dec.feed(HallSensor::Hall1, true), None);
        // The reversal continues cleanly as Down.
        assert_eq!(dec.feed(HallSensor::Hall2, false), Some(Direction::Down));
    }

    #[test]
    fn interval_needs_two_hall_1_edges() {
        let mut dec = HallDecoder::new();
        for _ in 0..7 {
            dec.bump_idle();
        }
        dec.feed(HallSensor::Hall1, true);
        assert_eq!(dec.interval_ms(), 0);
        for _ in 0..9 {
            dec.bump_idle();
        }
        dec.feed(HallSensor::Hall1, false);
        assert_eq!(dec.interval_ms(), 9);
        assert_eq!(dec.idle_ms(), 0);
    }

    #[test]
    fn hall_2_edges_do_not_touch_interval() {
        let mut dec = HallDecoder::new();
        dec.feed(HallSensor::Hall1, true);
        for _ in 0..5 {
            dec.bump_idle();
        }
        dec.feed(HallSensor::Hall2, true);
        assert_eq!(dec.idle_ms(), 5);
        assert_eq!(dec.interval_ms(), 0);
        assert_eq!(dec.hall_2_ticks(), 1);
    }

    #[test]
    fn rpm_from_interval() {
        let mut dec = HallDecoder::new();
        assert_eq!(dec.rpm(), 0);
        dec.feed(HallSensor::Hall1, true);
        for _ in 0..9 {
            dec.bump_idle();
        }
        dec.feed(HallSensor::Hall1, false);
        // 60000 / 171 / 9 / 2
        assert_eq!(dec.rpm(), 19);
    }

    #[test]
    fn reset_motion_keeps_rotor_phase() {
        let mut dec = HallDecoder::new();
        feed_up_cycle(&mut dec);
        dec.reset_motion();
        assert_eq!(dec.hall_1_ticks(), 0);
        assert_eq!(dec.interval_ms(), 0);
        // Phase was 3 (HALL2 low); HALL1 high (phase 0) continues upward.
        assert_eq!(dec.feed(HallSensor::Hall1, true), Some(Direction::Up));
    }
}
