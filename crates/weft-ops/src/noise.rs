//! Stochastic and playback sources: Gaussian white noise and pre-drawn
//! sample playback.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use weft_core::{BaseSignal, Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::{expect_column, expect_non_negative, expect_positive};

/// Gaussian sample via the Box–Muller transform.
/// Avoids the `rand_distr` dependency.
fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

// ── WhiteNoise ─────────────────────────────────────────────────────

/// IID Gaussian noise source.
///
/// Draws `N(mean, std)` per element per step, scaled by `1/dt` when
/// `do_scale` is set, and either overwrites or accumulates into the
/// output. Owns its generator; `reset(seed)` reseeds it, so noise
/// sequences are insensitive to unrelated operators.
pub struct WhiteNoise {
    output: SignalView,
    mean: f64,
    std: f64,
    alpha: f64,
    inc: bool,
    rng: ChaCha8Rng,
}

impl WhiteNoise {
    /// Create a white-noise source writing into `output`.
    pub fn new(
        output: SignalView,
        mean: f64,
        std: f64,
        do_scale: bool,
        inc: bool,
        dt: f64,
    ) -> Result<Self, SetupError> {
        expect_column("WhiteNoise", "output", &output)?;
        expect_non_negative("WhiteNoise", "std", std)?;
        expect_positive("WhiteNoise", "dt", dt)?;
        if !mean.is_finite() {
            return Err(SetupError::InvalidParameter {
                operator: "WhiteNoise",
                detail: format!("mean must be finite, got {mean}"),
            });
        }
        Ok(Self {
            output,
            mean,
            std,
            alpha: if do_scale { 1.0 / dt } else { 1.0 },
            inc,
            rng: ChaCha8Rng::seed_from_u64(0),
        })
    }

    fn draw(&mut self) -> f64 {
        self.alpha * (self.mean + self.std * box_muller(&mut self.rng))
    }
}

impl Operator for WhiteNoise {
    fn name(&self) -> &str {
        "WhiteNoise"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        for i in 0..self.output.rows() {
            let v = self.draw();
            if self.inc {
                ctx.store().add(&self.output, i, 0, v);
            } else {
                ctx.store().set(&self.output, i, 0, v);
            }
        }
        Ok(())
    }

    fn reset(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }
}

// ── WhiteSignal ────────────────────────────────────────────────────

/// Pre-drawn sample playback.
///
/// At step `k`, writes `out[i, 0] = coefs[k mod rows(coefs), i]`; the
/// coefficient table cycles forever. `reset` rewinds the sample counter.
pub struct WhiteSignal {
    output: SignalView,
    coefs: BaseSignal,
    idx: u64,
}

impl WhiteSignal {
    /// Create a playback source for the given coefficient table.
    pub fn new(output: SignalView, coefs: BaseSignal) -> Result<Self, SetupError> {
        expect_column("WhiteSignal", "output", &output)?;
        if coefs.rows() == 0 {
            return Err(SetupError::InvalidParameter {
                operator: "WhiteSignal",
                detail: "coefficient table must have at least one row".to_string(),
            });
        }
        if coefs.cols() != output.rows() {
            return Err(SetupError::ShapeMismatch {
                operator: "WhiteSignal",
                detail: format!(
                    "coefficient table has {} columns but output has {} rows",
                    coefs.cols(),
                    output.rows()
                ),
            });
        }
        Ok(Self {
            output,
            coefs,
            idx: 0,
        })
    }
}

impl Operator for WhiteSignal {
    fn name(&self) -> &str {
        "WhiteSignal"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let row = (self.idx % self.coefs.rows() as u64) as usize;
        for i in 0..self.output.rows() {
            ctx.store().set(&self.output, i, 0, self.coefs.get(row, i));
        }
        self.idx += 1;
        Ok(())
    }

    fn reset(&mut self, _seed: u64) {
        self.idx = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{SignalKey, SignalStore, StepId};

    fn column_store(key: i64, values: &[f64]) -> SignalStore {
        let mut store = SignalStore::new();
        store
            .register(SignalKey(key), "sig", BaseSignal::column(values))
            .unwrap();
        store
    }

    fn run(op: &mut dyn Operator, store: &mut SignalStore) {
        let mut ctx = StepContext::new(store, None, 0.0, StepId(0));
        op.step(&mut ctx).unwrap();
    }

    #[test]
    fn white_noise_same_seed_same_sequence() {
        let mut store = column_store(1, &[0.0; 8]);
        let out = store.full_view(SignalKey(1)).unwrap();

        let draw = |store: &mut SignalStore| {
            let mut op = WhiteNoise::new(out, 0.0, 1.0, false, false, 0.001).unwrap();
            op.reset(42);
            run(&mut op, store);
            store.read(&out).into_vec()
        };

        let a = draw(&mut store);
        let b = draw(&mut store);
        assert_eq!(a, b, "same seed must give bit-identical noise");
        assert!(a.iter().any(|&v| v != 0.0));
    }

    #[test]
    fn white_noise_different_seeds_differ() {
        let mut store = column_store(1, &[0.0; 8]);
        let out = store.full_view(SignalKey(1)).unwrap();
        let mut op = WhiteNoise::new(out, 0.0, 1.0, false, false, 0.001).unwrap();

        op.reset(1);
        run(&mut op, &mut store);
        let a = store.read(&out).into_vec();

        op.reset(2);
        run(&mut op, &mut store);
        let b = store.read(&out).into_vec();
        assert_ne!(a, b);
    }

    #[test]
    fn white_noise_scales_by_inverse_dt() {
        let mut store = column_store(1, &[0.0; 4]);
        let out = store.full_view(SignalKey(1)).unwrap();
        let dt = 0.5;

        let mut scaled = WhiteNoise::new(out, 0.0, 1.0, true, false, dt).unwrap();
        scaled.reset(7);
        run(&mut scaled, &mut store);
        let a = store.read(&out).into_vec();

        let mut plain = WhiteNoise::new(out, 0.0, 1.0, false, false, dt).unwrap();
        plain.reset(7);
        run(&mut plain, &mut store);
        let b = store.read(&out).into_vec();

        for (x, y) in a.iter().zip(&b) {
            assert!((x - y / dt).abs() < 1e-12);
        }
    }

    #[test]
    fn white_noise_inc_accumulates() {
        let mut store = column_store(1, &[10.0]);
        let out = store.full_view(SignalKey(1)).unwrap();
        let mut op = WhiteNoise::new(out, 5.0, 0.0, false, true, 0.001).unwrap();
        run(&mut op, &mut store);
        assert_eq!(store.get(&out, 0, 0), 15.0);
    }

    #[test]
    fn white_noise_rejects_bad_params() {
        let store = column_store(1, &[0.0]);
        let out = store.full_view(SignalKey(1)).unwrap();
        assert!(matches!(
            WhiteNoise::new(out, 0.0, -1.0, false, false, 0.001),
            Err(SetupError::InvalidParameter { .. })
        ));
        assert!(matches!(
            WhiteNoise::new(out, 0.0, 1.0, false, false, 0.0),
            Err(SetupError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn white_signal_cycles_rows() {
        let mut store = column_store(1, &[0.0]);
        let out = store.full_view(SignalKey(1)).unwrap();
        let coefs = BaseSignal::new(3, 1, vec![0.1, 0.2, 0.3]);
        let mut op = WhiteSignal::new(out, coefs).unwrap();

        let mut seen = Vec::new();
        for _ in 0..7 {
            run(&mut op, &mut store);
            seen.push(store.get(&out, 0, 0));
        }
        assert_eq!(seen, vec![0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1]);
    }

    #[test]
    fn white_signal_reset_rewinds() {
        let mut store = column_store(1, &[0.0]);
        let out = store.full_view(SignalKey(1)).unwrap();
        let coefs = BaseSignal::new(2, 1, vec![1.0, 2.0]);
        let mut op = WhiteSignal::new(out, coefs).unwrap();

        run(&mut op, &mut store);
        run(&mut op, &mut store);
        op.reset(0);
        run(&mut op, &mut store);
        assert_eq!(store.get(&out, 0, 0), 1.0);
    }

    #[test]
    fn white_signal_rejects_column_mismatch() {
        let store = column_store(1, &[0.0, 0.0]);
        let out = store.full_view(SignalKey(1)).unwrap();
        // Two output rows need two coefficient columns.
        let coefs = BaseSignal::new(3, 1, vec![0.1, 0.2, 0.3]);
        assert!(matches!(
            WhiteSignal::new(out, coefs),
            Err(SetupError::ShapeMismatch { .. })
        ));
    }
}
