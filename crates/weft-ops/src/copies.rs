//! Value-moving operators: constant reset, whole-view copy, and the
//! gather/scatter sliced copy.

use weft_core::{Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::{expect_column, expect_same_shape};

// ── Reset ──────────────────────────────────────────────────────────

/// Set every element of a view to a constant.
pub struct Reset {
    dst: SignalView,
    value: f64,
}

impl Reset {
    /// Create a reset of `dst` to `value`.
    pub fn new(dst: SignalView, value: f64) -> Self {
        Self { dst, value }
    }
}

impl Operator for Reset {
    fn name(&self) -> &str {
        "Reset"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        ctx.store().fill(&self.dst, self.value);
        Ok(())
    }
}

// ── CopySignal ─────────────────────────────────────────────────────

/// Element-wise copy between two same-shape views.
///
/// The views may alias the same base signal, including overlapping
/// windows: the source is snapshotted before the destination is
/// written, so the result is the value of `src` at the start of the
/// operator.
pub struct CopySignal {
    dst: SignalView,
    src: SignalView,
}

impl CopySignal {
    /// Create a copy of `src` into `dst`.
    pub fn new(dst: SignalView, src: SignalView) -> Result<Self, SetupError> {
        expect_same_shape("Copy", "src", &src, "dst", &dst)?;
        Ok(Self { dst, src })
    }
}

impl Operator for CopySignal {
    fn name(&self) -> &str {
        "Copy"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let snapshot = ctx.store().read(&self.src);
        ctx.store().write(&self.dst, &snapshot);
        Ok(())
    }
}

// ── SlicedCopy ─────────────────────────────────────────────────────

/// Gather/scatter between two column views.
///
/// Each side's index stream is either a strided range
/// `start, start+step, …` (stopping before `stop`) or an explicit index
/// sequence; indices wrap modulo the view's length. When `inc` is set
/// the assignment accumulates instead of overwriting.
pub struct SlicedCopy {
    dst: SignalView,
    src: SignalView,
    inc: bool,
    range_src: (i64, i64, i64),
    range_dst: (i64, i64, i64),
    seq_src: Vec<i64>,
    seq_dst: Vec<i64>,
    count: usize,
}

fn side_count(
    side: &str,
    seq: &[i64],
    (start, stop, step): (i64, i64, i64),
) -> Result<usize, SetupError> {
    if !seq.is_empty() {
        if start != 0 || stop != 0 || step != 0 {
            return Err(SetupError::InvalidParameter {
                operator: "SlicedCopy",
                detail: format!(
                    "seq_{side} is non-empty but start/stop/step of {side} are not all zero"
                ),
            });
        }
        return Ok(seq.len());
    }
    if step == 0 {
        return Err(SetupError::InvalidParameter {
            operator: "SlicedCopy",
            detail: format!("step of {side} is zero"),
        });
    }
    Ok(((stop - start) as f64 / step as f64).ceil().max(0.0) as usize)
}

impl SlicedCopy {
    /// Create a sliced copy of `src` into `dst`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dst: SignalView,
        src: SignalView,
        inc: bool,
        range_src: (i64, i64, i64),
        range_dst: (i64, i64, i64),
        seq_src: Vec<i64>,
        seq_dst: Vec<i64>,
    ) -> Result<Self, SetupError> {
        expect_column("SlicedCopy", "src", &src)?;
        expect_column("SlicedCopy", "dst", &dst)?;

        let n_src = side_count("src", &seq_src, range_src)?;
        let n_dst = side_count("dst", &seq_dst, range_dst)?;
        if n_src != n_dst {
            return Err(SetupError::ShapeMismatch {
                operator: "SlicedCopy",
                detail: format!("src slice selects {n_src} elements, dst slice {n_dst}"),
            });
        }

        Ok(Self {
            dst,
            src,
            inc,
            range_src,
            range_dst,
            seq_src,
            seq_dst,
            count: n_src,
        })
    }

    fn index(seq: &[i64], (start, _stop, step): (i64, i64, i64), i: usize) -> i64 {
        if seq.is_empty() {
            start + step * i as i64
        } else {
            seq[i]
        }
    }
}

impl Operator for SlicedCopy {
    fn name(&self) -> &str {
        "SlicedCopy"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        let len_src = self.src.rows() as i64;
        let len_dst = self.dst.rows() as i64;
        let store = ctx.store();
        for i in 0..self.count {
            let si = Self::index(&self.seq_src, self.range_src, i).rem_euclid(len_src) as usize;
            let di = Self::index(&self.seq_dst, self.range_dst, i).rem_euclid(len_dst) as usize;
            let value = store.get(&self.src, si, 0);
            if self.inc {
                store.add(&self.dst, di, 0, value);
            } else {
                store.set(&self.dst, di, 0, value);
            }
        }
        Ok(())
    }
}
