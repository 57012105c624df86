//! Accumulating products: matrix/scalar dot product and broadcasting
//! element-wise product.

use weft_core::{Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::shape_string;

// ── DotInc ─────────────────────────────────────────────────────────

/// `Y += A · X`, with the mode fixed at construction.
///
/// If the column count of `A` equals the row count of `X`, this is a
/// full matrix product. Otherwise `A` must be 1×1 and the operator
/// performs scalar-times-elementwise accumulation. Any other shape
/// combination is rejected.
pub struct DotInc {
    a: SignalView,
    x: SignalView,
    y: SignalView,
    scalar: bool,
}

impl DotInc {
    /// Create a dot-increment of `A · X` into `Y`.
    pub fn new(a: SignalView, x: SignalView, y: SignalView) -> Result<Self, SetupError> {
        let mismatch = || SetupError::ShapeMismatch {
            operator: "DotInc",
            detail: format!(
                "A is {}, X is {}, Y is {}",
                shape_string(&a),
                shape_string(&x),
                shape_string(&y)
            ),
        };

        let scalar = a.cols() != x.rows();
        if scalar {
            if a.rows() != 1 || a.cols() != 1 || x.shape() != y.shape() {
                return Err(mismatch());
            }
        } else if a.rows() != y.rows() || x.cols() != y.cols() {
            return Err(mismatch());
        }

        Ok(Self { a, x, y, scalar })
    }
}

impl Operator for DotInc {
    fn name(&self) -> &str {
        "DotInc"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        if self.scalar {
            let coef = store.get(&self.a, 0, 0);
            for i in 0..self.x.rows() {
                for j in 0..self.x.cols() {
                    let v = coef * store.get(&self.x, i, j);
                    store.add(&self.y, i, j, v);
                }
            }
        } else {
            for i in 0..self.a.rows() {
                for j in 0..self.x.cols() {
                    let mut acc = 0.0;
                    for k in 0..self.a.cols() {
                        acc += store.get(&self.a, i, k) * store.get(&self.x, k, j);
                    }
                    store.add(&self.y, i, j, acc);
                }
            }
        }
        Ok(())
    }
}

// ── ElementwiseInc ─────────────────────────────────────────────────

/// `Y += A ⊙ X` with broadcasting.
///
/// A dimension of size 1 in `A` or `X` is replicated along the matching
/// dimension of `Y`; the broadcast is implemented by precomputing a 0 or
/// 1 stride per dimension at construction.
pub struct ElementwiseInc {
    a: SignalView,
    x: SignalView,
    y: SignalView,
    a_row_stride: usize,
    a_col_stride: usize,
    x_row_stride: usize,
    x_col_stride: usize,
}

impl ElementwiseInc {
    /// Create an element-wise increment of `A ⊙ X` into `Y`.
    pub fn new(a: SignalView, x: SignalView, y: SignalView) -> Result<Self, SetupError> {
        let check = |name: &str, v: &SignalView| -> Result<(usize, usize), SetupError> {
            let ok_rows = v.rows() == y.rows() || v.rows() == 1;
            let ok_cols = v.cols() == y.cols() || v.cols() == 1;
            if !ok_rows || !ok_cols {
                return Err(SetupError::ShapeMismatch {
                    operator: "ElementwiseInc",
                    detail: format!(
                        "{name} is {} and cannot broadcast to Y {}",
                        shape_string(v),
                        shape_string(&y)
                    ),
                });
            }
            Ok((
                usize::from(v.rows() > 1),
                usize::from(v.cols() > 1),
            ))
        };

        let (a_row_stride, a_col_stride) = check("A", &a)?;
        let (x_row_stride, x_col_stride) = check("X", &x)?;

        Ok(Self {
            a,
            x,
            y,
            a_row_stride,
            a_col_stride,
            x_row_stride,
            x_col_stride,
        })
    }
}

impl Operator for ElementwiseInc {
    fn name(&self) -> &str {
        "ElementwiseInc"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let store = ctx.store();
        for i in 0..self.y.rows() {
            for j in 0..self.y.cols() {
                let av = store.get(&self.a, i * self.a_row_stride, j * self.a_col_stride);
                let xv = store.get(&self.x, i * self.x_row_stride, j * self.x_col_stride);
                store.add(&self.y, i, j, av * xv);
            }
        }
        Ok(())
    }
}
