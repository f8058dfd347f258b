//! Quadrature decoder
//!
//! Decodes the two phase-shifted encoder lines (A, B) into a signed pulse
//! count. [`QuadratureDecoder::on_edge`] runs in interrupt context on every
//! level change of either line; [`QuadratureDecoder::reset_and_read`] runs in
//! the sampling task and hands over the pulses accumulated since the last
//! call.
//!
//! Decoding rule (2-bit Gray code):
//!
//! | changed line | lines agree | step |
//! |--------------|-------------|------|
//! | A            | no          | +1   |
//! | A            | yes         | -1   |
//! | B            | yes         | +1   |
//! | B            | no          | -1   |
//!
//! If both lines changed between two interrupts the edge is decoded as an A
//! edge. That is the nearest single step, not a correction; a missed
//! transition is lost.
//!
//! Neither method blocks or takes a lock. On targets without native
//! read-modify-write atomics (Cortex-M0+), `portable-atomic` falls back to a
//! critical section spanning the single update.

use portable_atomic::{AtomicI32, AtomicU8, Ordering};

const LEVEL_A: u8 = 0b01;
const LEVEL_B: u8 = 0b10;

fn pack(a: bool, b: bool) -> u8 {
    (if a { LEVEL_A } else { 0 }) | (if b { LEVEL_B } else { 0 })
}

/// Interrupt-driven pulse counter for one encoder channel
#[derive(Debug)]
pub struct QuadratureDecoder {
    /// Net pulses since the last `reset_and_read`
    count: AtomicI32,
    /// Last observed line levels (written only from the edge handler)
    levels: AtomicU8,
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureDecoder {
    /// Create a decoder with both lines assumed low
    pub const fn new() -> Self {
        Self {
            count: AtomicI32::new(0),
            levels: AtomicU8::new(0),
        }
    }

    /// Record the current line levels without counting
    ///
    /// Call once before enabling the edge interrupt so the first edge is
    /// decoded against the real idle state.
    pub fn prime(&self, a: bool, b: bool) {
        self.levels.store(pack(a, b), Ordering::Relaxed);
    }

    /// Handle a level change on either line
    ///
    /// `a` and `b` are the line levels read inside the interrupt. Returns the
    /// step applied to the counter (0 if neither level changed).
    pub fn on_edge(&self, a: bool, b: bool) -> i8 {
        let now = pack(a, b);
        let prev = self.levels.load(Ordering::Relaxed);
        if now == prev {
            return 0;
        }

        let step: i8 = if (now ^ prev) & LEVEL_A != 0 {
            if a != b {
                1
            } else {
                -1
            }
        } else if a == b {
            1
        } else {
            -1
        };

        self.levels.store(now, Ordering::Relaxed);
        // Single-variable RMW; nothing else is published through it
        self.count.fetch_add(step as i32, Ordering::Relaxed);
        step
    }

    /// Atomically take the pulse count and reset it to zero
    ///
    /// Pulses arriving after the swap belong to the next window.
    pub fn reset_and_read(&self) -> i32 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Read the pulse count without resetting it
    pub fn peek(&self) -> i32 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Forward Gray-code sequence starting from (low, low)
    const FORWARD: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    fn rotate(decoder: &QuadratureDecoder, steps: usize, forward: bool) {
        // Position in the cycle is tracked by the decoder's own levels
        for _ in 0..steps {
            let prev = decoder.levels.load(Ordering::Relaxed);
            let idx = FORWARD
                .iter()
                .position(|&(a, b)| pack(a, b) == prev)
                .unwrap();
            let next = if forward {
                FORWARD[(idx + 1) % 4]
            } else {
                FORWARD[(idx + 3) % 4]
            };
            decoder.on_edge(next.0, next.1);
        }
    }

    #[test]
    fn test_forward_sequence_counts_up() {
        let decoder = QuadratureDecoder::new();
        for (a, b) in FORWARD {
            assert_eq!(decoder.on_edge(a, b), 1);
        }
        assert_eq!(decoder.peek(), 4);
    }

    #[test]
    fn test_reverse_sequence_counts_down() {
        let decoder = QuadratureDecoder::new();
        for (a, b) in [(false, true), (true, true), (true, false), (false, false)] {
            assert_eq!(decoder.on_edge(a, b), -1);
        }
        assert_eq!(decoder.peek(), -4);
    }

    #[test]
    fn test_no_change_is_ignored() {
        let decoder = QuadratureDecoder::new();
        assert_eq!(decoder.on_edge(false, false), 0);
        assert_eq!(decoder.peek(), 0);
    }

    #[test]
    fn test_double_edge_counts_once() {
        let decoder = QuadratureDecoder::new();
        // Both lines flip between interrupts: decoded as one A edge
        let step = decoder.on_edge(true, true);
        assert_eq!(step.abs(), 1);
        assert_eq!(decoder.peek().abs(), 1);
    }

    #[test]
    fn test_prime_sets_reference_levels() {
        let decoder = QuadratureDecoder::new();
        decoder.prime(true, true);
        // (1,1) -> (0,1) is a forward step
        assert_eq!(decoder.on_edge(false, true), 1);
    }

    #[test]
    fn test_reset_and_read_twice() {
        let decoder = QuadratureDecoder::new();
        rotate(&decoder, 7, true);
        assert_eq!(decoder.reset_and_read(), 7);
        assert_eq!(decoder.reset_and_read(), 0);
    }

    #[test]
    fn test_forward_then_back_returns_to_start() {
        let decoder = QuadratureDecoder::new();
        rotate(&decoder, 440, true);
        rotate(&decoder, 440, false);
        assert_eq!(decoder.peek(), 0);
    }

    #[test]
    fn test_concurrent_edges_and_sampling_lose_nothing() {
        const TOTAL: usize = 10_000;
        const BURST: usize = 50;

        let decoder = QuadratureDecoder::new();
        let done = std::sync::atomic::AtomicBool::new(false);

        let sampled = std::thread::scope(|s| {
            s.spawn(|| {
                for _ in 0..TOTAL / BURST {
                    rotate(&decoder, BURST, true);
                    std::thread::yield_now();
                }
                done.store(true, std::sync::atomic::Ordering::Release);
            });

            let sampler = s.spawn(|| {
                let mut total: i64 = 0;
                while !done.load(std::sync::atomic::Ordering::Acquire) {
                    total += decoder.reset_and_read() as i64;
                    std::thread::yield_now();
                }
                total
            });
            sampler.join().unwrap()
        });

        let residual = decoder.reset_and_read() as i64;
        assert_eq!(sampled + residual, TOTAL as i64);
    }

    proptest! {
        #[test]
        fn net_count_matches_gray_steps(moves in proptest::collection::vec(any::<bool>(), 0..500)) {
            let decoder = QuadratureDecoder::new();
            let mut expected: i32 = 0;
            for forward in moves {
                rotate(&decoder, 1, forward);
                expected += if forward { 1 } else { -1 };
            }
            prop_assert_eq!(decoder.peek(), expected);
        }
    }
}
