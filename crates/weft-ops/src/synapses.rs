//! Synapse filters: pure gain, one-pole, general IIR, and triangle.
//!
//! The general filters keep one small circular buffer per signal row.
//! Tap counts in practice are ≤ 4, so the rings live in a `SmallVec`
//! and push-front is a short shift rather than a head index.

use smallvec::SmallVec;
use weft_core::{Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::{expect_column_of, expect_same_shape};

// ── Ring ───────────────────────────────────────────────────────────

/// Fixed-capacity ring that drops its oldest element on push-front.
///
/// Starts empty and grows to capacity; iteration yields newest first.
#[derive(Clone, Debug)]
pub(crate) struct Ring {
    buf: SmallVec<[f64; 4]>,
    cap: usize,
}

impl Ring {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            buf: SmallVec::new(),
            cap,
        }
    }

    pub(crate) fn push_front(&mut self, value: f64) {
        if self.cap == 0 {
            return;
        }
        self.buf.insert(0, value);
        self.buf.truncate(self.cap);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.buf.iter().copied()
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }
}

// ── NoDenSynapse ───────────────────────────────────────────────────

/// Denominator-free synapse: `out = b · in`.
pub struct NoDenSynapse {
    input: SignalView,
    output: SignalView,
    b: f64,
}

impl NoDenSynapse {
    /// Create a pure-gain synapse.
    pub fn new(input: SignalView, output: SignalView, b: f64) -> Result<Self, SetupError> {
        expect_same_shape("NoDenSynapse", "input", &input, "output", &output)?;
        Ok(Self { input, output, b })
    }
}

impl Operator for NoDenSynapse {
    fn name(&self) -> &str {
        "NoDenSynapse"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        for i in 0..self.input.rows() {
            for j in 0..self.input.cols() {
                let v = self.b * store.get(&self.input, i, j);
                store.set(&self.output, i, j, v);
            }
        }
        Ok(())
    }
}

// ── SimpleSynapse ──────────────────────────────────────────────────

/// One-pole synapse, applied literally as `out *= −a; out += b · in`.
///
/// The update rule is therefore `out_{k+1} = −a·out_k + b·in_{k+1}`,
/// a first-order IIR whose effective pole is `−a`.
pub struct SimpleSynapse {
    input: SignalView,
    output: SignalView,
    a: f64,
    b: f64,
}

impl SimpleSynapse {
    /// Create a one-pole synapse with coefficients `(a, b)`.
    pub fn new(input: SignalView, output: SignalView, a: f64, b: f64) -> Result<Self, SetupError> {
        expect_same_shape("SimpleSynapse", "input", &input, "output", &output)?;
        Ok(Self { input, output, a, b })
    }
}

impl Operator for SimpleSynapse {
    fn name(&self) -> &str {
        "SimpleSynapse"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        // Two full passes, as the update is written: scale first, then
        // accumulate. The passes are distinct so aliasing input/output
        // views observe the scaled intermediate, not the old output.
        for i in 0..self.output.rows() {
            for j in 0..self.output.cols() {
                let v = store.get(&self.output, i, j) * -self.a;
                store.set(&self.output, i, j, v);
            }
        }
        for i in 0..self.output.rows() {
            for j in 0..self.output.cols() {
                let v = self.b * store.get(&self.input, i, j);
                store.add(&self.output, i, j, v);
            }
        }
        Ok(())
    }
}

// ── Synapse ────────────────────────────────────────────────────────

/// General IIR filter applied independently per row.
///
/// Keeps per-row input and output histories `x` and `y` of lengths
/// `numer.len()` and `denom.len()`. Each step, per row: push the input
/// onto `x`, compute `out = Σ numer[j]·x[j] − Σ denom[j]·y[j]`, push
/// `out` onto `y`.
pub struct Synapse {
    input: SignalView,
    output: SignalView,
    numer: Vec<f64>,
    denom: Vec<f64>,
    x: Vec<Ring>,
    y: Vec<Ring>,
}

impl Synapse {
    /// Create a general IIR synapse with the given tap coefficients.
    pub fn new(
        input: SignalView,
        output: SignalView,
        numer: Vec<f64>,
        denom: Vec<f64>,
    ) -> Result<Self, SetupError> {
        expect_column_of("Synapse", "input", &input, input.rows())?;
        expect_column_of("Synapse", "output", &output, input.rows())?;
        if numer.is_empty() {
            return Err(SetupError::InvalidParameter {
                operator: "Synapse",
                detail: "numerator must have at least one tap".to_string(),
            });
        }
        let rows = input.rows();
        let x = vec![Ring::new(numer.len()); rows];
        let y = vec![Ring::new(denom.len()); rows];
        Ok(Self {
            input,
            output,
            numer,
            denom,
            x,
            y,
        })
    }
}

impl Operator for Synapse {
    fn name(&self) -> &str {
        "Synapse"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        for i in 0..self.input.rows() {
            self.x[i].push_front(store.get(&self.input, i, 0));

            let mut out = 0.0;
            for (coef, xv) in self.numer.iter().zip(self.x[i].iter()) {
                out += coef * xv;
            }
            for (coef, yv) in self.denom.iter().zip(self.y[i].iter()) {
                out -= coef * yv;
            }

            store.set(&self.output, i, 0, out);
            self.y[i].push_front(out);
        }
        Ok(())
    }

    fn reset(&mut self, _seed: u64) {
        for ring in self.x.iter_mut().chain(self.y.iter_mut()) {
            ring.clear();
        }
    }
}

// ── TriangleSynapse ────────────────────────────────────────────────

/// Triangle filter: `out += n0·in − Σ x[j]`, then push `ndiff·in` onto a
/// ring of capacity `n_taps`.
pub struct TriangleSynapse {
    input: SignalView,
    output: SignalView,
    n0: f64,
    ndiff: f64,
    x: Vec<Ring>,
}

impl TriangleSynapse {
    /// Create a triangle synapse with `n_taps` history taps.
    pub fn new(
        input: SignalView,
        output: SignalView,
        n0: f64,
        ndiff: f64,
        n_taps: usize,
    ) -> Result<Self, SetupError> {
        expect_column_of("TriangleSynapse", "input", &input, input.rows())?;
        expect_column_of("TriangleSynapse", "output", &output, input.rows())?;
        if n_taps == 0 {
            return Err(SetupError::InvalidParameter {
                operator: "TriangleSynapse",
                detail: "n_taps must be at least 1".to_string(),
            });
        }
        let x = vec![Ring::new(n_taps); input.rows()];
        Ok(Self {
            input,
            output,
            n0,
            ndiff,
            x,
        })
    }
}

impl Operator for TriangleSynapse {
    fn name(&self) -> &str {
        "TriangleSynapse"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        for i in 0..self.input.rows() {
            let input = store.get(&self.input, i, 0);
            let mut delta = self.n0 * input;
            for xv in self.x[i].iter() {
                delta -= xv;
            }
            store.add(&self.output, i, 0, delta);
            self.x[i].push_front(self.ndiff * input);
        }
        Ok(())
    }

    fn reset(&mut self, _seed: u64) {
        for ring in self.x.iter_mut() {
            ring.clear();
        }
    }
}
