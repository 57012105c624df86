//! Learning-rule operators.
//!
//! Each rule writes a weight-update matrix `delta` of shape
//! `(post rows, pre rows)` from filtered pre- and post-synaptic
//! activities. The learning rate is folded with `dt` into a single
//! `alpha = rate · dt` at construction.

use weft_core::{Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::{expect_column, expect_column_of, shape_string};

fn expect_delta_shape(
    operator: &'static str,
    delta: &SignalView,
    post_rows: usize,
    pre_rows: usize,
) -> Result<(), SetupError> {
    if delta.shape() != (post_rows, pre_rows) {
        return Err(SetupError::ShapeMismatch {
            operator,
            detail: format!(
                "delta is {} but post x pre is ({post_rows}, {pre_rows})",
                shape_string(delta)
            ),
        });
    }
    Ok(())
}

// ── Bcm ────────────────────────────────────────────────────────────

/// Bienenstock–Cooper–Munro rule:
/// `Δ += α · (post ⊙ (post − θ)) · preᵀ`.
pub struct Bcm {
    pre: SignalView,
    post: SignalView,
    theta: SignalView,
    delta: SignalView,
    alpha: f64,
}

impl Bcm {
    /// Create a BCM update into `delta`.
    pub fn new(
        pre: SignalView,
        post: SignalView,
        theta: SignalView,
        delta: SignalView,
        learning_rate: f64,
        dt: f64,
    ) -> Result<Self, SetupError> {
        expect_column("BCM", "pre", &pre)?;
        expect_column("BCM", "post", &post)?;
        expect_column_of("BCM", "theta", &theta, post.rows())?;
        expect_delta_shape("BCM", &delta, post.rows(), pre.rows())?;
        Ok(Self {
            pre,
            post,
            theta,
            delta,
            alpha: learning_rate * dt,
        })
    }
}

impl Operator for Bcm {
    fn name(&self) -> &str {
        "BCM"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        for i in 0..self.post.rows() {
            let post = store.get(&self.post, i, 0);
            let theta = store.get(&self.theta, i, 0);
            let coef = self.alpha * post * (post - theta);
            for j in 0..self.pre.rows() {
                let pre = store.get(&self.pre, j, 0);
                store.add(&self.delta, i, j, coef * pre);
            }
        }
        Ok(())
    }
}

// ── Oja ────────────────────────────────────────────────────────────

/// Oja's rule: `Δ = α · post · preᵀ − α · β · W · diag(post²)`.
pub struct Oja {
    pre: SignalView,
    post: SignalView,
    weights: SignalView,
    delta: SignalView,
    alpha: f64,
    beta: f64,
}

impl Oja {
    /// Create an Oja update into `delta`.
    pub fn new(
        pre: SignalView,
        post: SignalView,
        weights: SignalView,
        delta: SignalView,
        learning_rate: f64,
        dt: f64,
        beta: f64,
    ) -> Result<Self, SetupError> {
        expect_column("Oja", "pre", &pre)?;
        expect_column("Oja", "post", &post)?;
        expect_delta_shape("Oja", &delta, post.rows(), pre.rows())?;
        if weights.shape() != delta.shape() {
            return Err(SetupError::ShapeMismatch {
                operator: "Oja",
                detail: format!(
                    "weights is {} but delta is {}",
                    shape_string(&weights),
                    shape_string(&delta)
                ),
            });
        }
        Ok(Self {
            pre,
            post,
            weights,
            delta,
            alpha: learning_rate * dt,
            beta,
        })
    }
}

impl Operator for Oja {
    fn name(&self) -> &str {
        "Oja"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        // Forgetting term overwrites, Hebbian term accumulates on top.
        for i in 0..self.post.rows() {
            let post = store.get(&self.post, i, 0);
            let post_squared = self.alpha * post * post;
            for j in 0..self.pre.rows() {
                let w = store.get(&self.weights, i, j);
                store.set(&self.delta, i, j, -self.beta * w * post_squared);
            }
        }
        for i in 0..self.post.rows() {
            let post = self.alpha * store.get(&self.post, i, 0);
            for j in 0..self.pre.rows() {
                let pre = store.get(&self.pre, j, 0);
                store.add(&self.delta, i, j, post * pre);
            }
        }
        Ok(())
    }
}

// ── Voja ───────────────────────────────────────────────────────────

/// Vector Oja rule for encoder learning:
/// `Δ = α · L₀ · (scale · post · preᵀ − post ⊙ E)`.
///
/// `L` is a single-element learning gate read each step.
pub struct Voja {
    pre_decoded: SignalView,
    post_filtered: SignalView,
    scaled_encoders: SignalView,
    delta: SignalView,
    learning_signal: SignalView,
    scale: weft_core::BaseSignal,
    alpha: f64,
}

impl Voja {
    /// Create a Voja update into `delta`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pre_decoded: SignalView,
        post_filtered: SignalView,
        scaled_encoders: SignalView,
        delta: SignalView,
        learning_signal: SignalView,
        scale: weft_core::BaseSignal,
        learning_rate: f64,
        dt: f64,
    ) -> Result<Self, SetupError> {
        expect_column("Voja", "pre_decoded", &pre_decoded)?;
        expect_column_of(
            "Voja",
            "post_filtered",
            &post_filtered,
            scaled_encoders.rows(),
        )?;
        if learning_signal.len() != 1 {
            return Err(SetupError::InvalidParameter {
                operator: "Voja",
                detail: format!(
                    "learning signal must be a single element, got {}",
                    shape_string(&learning_signal)
                ),
            });
        }
        if delta.shape() != scaled_encoders.shape() {
            return Err(SetupError::ShapeMismatch {
                operator: "Voja",
                detail: format!(
                    "delta is {} but encoders is {}",
                    shape_string(&delta),
                    shape_string(&scaled_encoders)
                ),
            });
        }
        if pre_decoded.rows() != scaled_encoders.cols() {
            return Err(SetupError::ShapeMismatch {
                operator: "Voja",
                detail: format!(
                    "pre_decoded has {} rows but encoders has {} columns",
                    pre_decoded.rows(),
                    scaled_encoders.cols()
                ),
            });
        }
        if scale.rows() != scaled_encoders.rows() || scale.cols() != 1 {
            return Err(SetupError::ShapeMismatch {
                operator: "Voja",
                detail: format!(
                    "scale is ({}, {}) but encoders has {} rows",
                    scale.rows(),
                    scale.cols(),
                    scaled_encoders.rows()
                ),
            });
        }
        Ok(Self {
            pre_decoded,
            post_filtered,
            scaled_encoders,
            delta,
            learning_signal,
            scale,
            alpha: learning_rate * dt,
        })
    }
}

impl Operator for Voja {
    fn name(&self) -> &str {
        "Voja"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        let coef = self.alpha * store.get(&self.learning_signal, 0, 0);
        for i in 0..self.scaled_encoders.rows() {
            let scale = self.scale.get(i, 0);
            let post = store.get(&self.post_filtered, i, 0);
            for j in 0..self.scaled_encoders.cols() {
                let pre = store.get(&self.pre_decoded, j, 0);
                let enc = store.get(&self.scaled_encoders, i, j);
                store.set(&self.delta, i, j, coef * (scale * post * pre - post * enc));
            }
        }
        Ok(())
    }
}
