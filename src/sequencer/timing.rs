// Timing - Step interval, gate length and micro-timing calculations
// All durations are expressed in seconds as f64

use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;

/// MIDI clock resolution (pulses per quarter note)
pub const PULSES_PER_QUARTER: u32 = 24;

/// Fractions of the half interval a quantized gate may move by
const QUANTIZED_GATE_OFFSETS: [f64; 8] = [-0.75, -0.5, -0.25, -0.125, 0.125, 0.25, 0.5, 0.75];

/// Time between consecutive step triggers at the requested subdivision.
///
/// `note_value` is the subdivision of a whole note (16 = sixteenths).
pub fn nominal_interval(bpm: u32, note_value: u32) -> f64 {
    (16.0 / note_value as f64) * ((60.0 / bpm as f64) / 4.0)
}

/// Time between two MIDI clock ticks at `bpm`
pub fn clock_tick_interval(bpm: u32) -> f64 {
    60.0 / (PULSES_PER_QUARTER as f64 * bpm as f64)
}

/// Continuous gate-length modulation around half the step interval.
///
/// A uniform draw scaled by `gate_mod_pct` is added to or subtracted from
/// the half interval with equal probability.
pub fn gate_length<R: Rng + ?Sized>(rng: &mut R, interval: f64, gate_mod_pct: u8) -> f64 {
    let half = interval / 2.0;
    let mod_amount = rng.gen_range(0.0..1.0) * gate_mod_pct as f64 / 100.0;

    if rng.gen_bool(0.5) {
        half + half * mod_amount
    } else {
        half - half * mod_amount
    }
}

/// Gate-length modulation restricted to fixed fractions of the half interval.
///
/// Offsets larger than `gate_mod_pct` are discarded, then the survivors are
/// padded with zero offsets (half their count) so small settings lean
/// towards an unmodulated gate.
pub fn gate_length_quantized<R: Rng + ?Sized>(rng: &mut R, interval: f64, gate_mod_pct: u8) -> f64 {
    let half = interval / 2.0;

    let mut options: Vec<f64> = QUANTIZED_GATE_OFFSETS
        .iter()
        .copied()
        .filter(|offset| (offset * 100.0).abs() <= gate_mod_pct as f64)
        .collect();
    let padding = options.len() / 2;
    options.extend(std::iter::repeat(0.0).take(padding));

    let offset = options.choose(rng).copied().unwrap_or(0.0);
    half + offset * half
}

/// Micro-timing: perturbs the time until the next step by ±`time_mod_pct`
/// of the nominal interval.
pub fn micro_time<R: Rng + ?Sized>(rng: &mut R, interval: f64, time_mod_pct: u8) -> f64 {
    let shift = interval * (time_mod_pct as f64 / 100.0);

    if rng.gen_bool(0.5) {
        interval + shift
    } else {
        interval - shift
    }
}

/// Converts seconds to a `Duration`, treating negative values as zero
pub fn to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_nominal_interval_sixteenths_at_120() {
        assert!((nominal_interval(120, 16) - 0.125).abs() < EPSILON);
        assert!((nominal_interval(120, 8) - 0.25).abs() < EPSILON);
        assert!((nominal_interval(120, 4) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_nominal_interval_inverse_to_bpm() {
        let slow = nominal_interval(60, 16);
        let fast = nominal_interval(120, 16);
        assert!((slow - 2.0 * fast).abs() < EPSILON);
        assert_eq!(nominal_interval(97, 16), nominal_interval(97, 16));
    }

    #[test]
    fn test_clock_tick_interval() {
        // 24 ticks per beat, 2 beats per second at 120 BPM
        assert!((clock_tick_interval(120) - 1.0 / 48.0).abs() < EPSILON);
    }

    #[test]
    fn test_gate_without_modulation_is_half_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!((gate_length(&mut rng, 0.125, 0) - 0.0625).abs() < EPSILON);
            assert!((gate_length_quantized(&mut rng, 0.125, 0) - 0.0625).abs() < EPSILON);
        }
    }

    #[test]
    fn test_full_gate_modulation_range_and_symmetry() {
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 20_000;
        let mut sum = 0.0;

        for _ in 0..trials {
            let gate = gate_length(&mut rng, 0.125, 100);
            assert!((0.0..=0.125).contains(&gate), "gate {} out of range", gate);
            sum += gate;
        }

        let mean = sum / trials as f64;
        assert!((mean - 0.0625).abs() < 0.002, "mean {} not centred", mean);
    }

    #[test]
    fn test_quantized_gate_uses_allowed_offsets_only() {
        let mut rng = StdRng::seed_from_u64(3);
        let interval = 1.0;
        // 30% admits ±0.25 and ±0.125 plus two zero pads
        let allowed = [0.5 - 0.125, 0.5 - 0.0625, 0.5, 0.5 + 0.0625, 0.5 + 0.125];

        for _ in 0..1000 {
            let gate = gate_length_quantized(&mut rng, interval, 30);
            assert!(
                allowed.iter().any(|a| (a - gate).abs() < EPSILON),
                "unexpected gate {}",
                gate
            );
        }
    }

    #[test]
    fn test_quantized_gate_small_setting_mixes_zero_and_eighth() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen_zero = false;
        let mut seen_offset = false;

        for _ in 0..500 {
            let gate = gate_length_quantized(&mut rng, 1.0, 15);
            if (gate - 0.5).abs() < EPSILON {
                seen_zero = true;
            } else {
                assert!(((gate - 0.5).abs() - 0.0625).abs() < EPSILON);
                seen_offset = true;
            }
        }

        assert!(seen_zero && seen_offset);
    }

    #[test]
    fn test_micro_time() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            assert!((micro_time(&mut rng, 0.125, 0) - 0.125).abs() < EPSILON);
            let shifted = micro_time(&mut rng, 0.2, 50);
            assert!((shifted - 0.1).abs() < EPSILON || (shifted - 0.3).abs() < EPSILON);
        }
    }

    #[test]
    fn test_to_duration_clamps_negative() {
        assert_eq!(to_duration(-0.5), Duration::ZERO);
        assert_eq!(to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(to_duration(0.25), Duration::from_millis(250));
    }
}
