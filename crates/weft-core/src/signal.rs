//! Dense base signals, strided views, and the per-chunk signal store.
//!
//! All simulation state lives in [`BaseSignal`]s owned by a
//! [`SignalStore`]. Operators never hold references into the store;
//! they carry [`SignalView`] descriptors (cheap value handles naming a
//! resolved storage slot plus a rectangular strided window) and resolve
//! them through the store on every element access. Bounds are checked
//! once, when a view is constructed; the step-loop hot path is index
//! arithmetic only.

use indexmap::IndexMap;

use crate::error::SetupError;
use crate::id::SignalKey;
use crate::parse::{self, ViewSpec};

// ── BaseSignal ─────────────────────────────────────────────────────

/// A dense 2-D array of `f64`, stored row-major.
///
/// Created once at registration time, never resized, destroyed with the
/// owning chunk. Also used for owned snapshots (probe samples, operator
/// coefficient tables, transfer payloads).
#[derive(Clone, Debug, PartialEq)]
pub struct BaseSignal {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl BaseSignal {
    /// Construct from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "base signal data length {} does not match {rows}x{cols}",
            data.len(),
        );
        Self { rows, cols, data }
    }

    /// A zero-filled signal of the given extents.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// An n×1 column from a slice of values.
    pub fn column(values: &[f64]) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Row extent.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column extent.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the signal holds zero elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Set the element at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Row-major element slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume into the row-major element vector.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}

// ── SignalView ─────────────────────────────────────────────────────

/// A rectangular strided window into a base signal.
///
/// Value-like handle: cheap to copy, no ownership. Several views may
/// alias the same base signal, including overlapping windows; that is
/// the intended mechanism for slicing and broadcasting. A zero stride
/// repeats an index along that dimension; negative strides walk the
/// base array backwards. Views are created by [`SignalStore::view`],
/// which validates the window against the base extent, so element
/// access through the store never needs a bounds check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalView {
    slot: usize,
    rows: usize,
    cols: usize,
    row_stride: isize,
    col_stride: isize,
    offset: usize,
}

impl SignalView {
    /// Row extent of the window.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column extent of the window.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)` of the window.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Total element count of the window.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the window holds zero elements (never true for views
    /// built by a store).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is an n×1 column view.
    pub fn is_column(&self) -> bool {
        self.cols == 1
    }

    /// Linear index into the base array for `(row, col)`.
    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        (self.offset as isize + row as isize * self.row_stride + col as isize * self.col_stride)
            as usize
    }
}

// ── SignalStore ────────────────────────────────────────────────────

/// Owns the base signals of one chunk and issues views into them.
///
/// Registration is setup-time only; the store never drops or resizes a
/// signal, so view slot indices stay valid for the chunk's lifetime.
#[derive(Debug, Default)]
pub struct SignalStore {
    signals: Vec<BaseSignal>,
    labels: Vec<String>,
    by_key: IndexMap<SignalKey, usize>,
}

impl SignalStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a base signal under `key`.
    ///
    /// Fails with [`SetupError::DuplicateKey`] if the key is taken.
    pub fn register(
        &mut self,
        key: SignalKey,
        label: impl Into<String>,
        signal: BaseSignal,
    ) -> Result<(), SetupError> {
        if self.by_key.contains_key(&key) {
            return Err(SetupError::DuplicateKey { key });
        }
        self.by_key.insert(key, self.signals.len());
        self.signals.push(signal);
        self.labels.push(label.into());
        Ok(())
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: SignalKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Number of registered base signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether the store holds no signals.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = SignalKey> + '_ {
        self.by_key.keys().copied()
    }

    /// The base signal registered under `key`.
    pub fn base(&self, key: SignalKey) -> Result<&BaseSignal, SetupError> {
        self.slot(key).map(|s| &self.signals[s])
    }

    /// The label recorded for `key`.
    pub fn label(&self, key: SignalKey) -> Result<&str, SetupError> {
        self.slot(key).map(|s| self.labels[s].as_str())
    }

    fn slot(&self, key: SignalKey) -> Result<usize, SetupError> {
        self.by_key
            .get(&key)
            .copied()
            .ok_or(SetupError::UnknownSignal { key })
    }

    /// A view covering the whole base signal under `key`.
    pub fn full_view(&self, key: SignalKey) -> Result<SignalView, SetupError> {
        let base = self.base(key)?;
        let (rows, cols) = (base.rows(), base.cols());
        self.view(key, rows, cols, cols as isize, 1, 0)
    }

    /// Construct a strided view into the base signal under `key`.
    ///
    /// Validates that every element the window can address lies within
    /// the base array; fails with [`SetupError::ViewOutOfBounds`]
    /// otherwise. Zero extents are rejected: an empty window addresses
    /// nothing and always indicates a builder bug.
    pub fn view(
        &self,
        key: SignalKey,
        rows: usize,
        cols: usize,
        row_stride: isize,
        col_stride: isize,
        offset: usize,
    ) -> Result<SignalView, SetupError> {
        let slot = self.slot(key)?;
        let len = self.signals[slot].len();

        let oob = |why: &str| SetupError::ViewOutOfBounds {
            key,
            window: format!("({rows},{cols}):({row_stride},{col_stride}):{offset} [{why}]"),
            len,
        };

        if rows == 0 || cols == 0 {
            return Err(oob("empty extent"));
        }

        // Extreme linear indices over the window's corners.
        let r = (rows as isize - 1) * row_stride;
        let c = (cols as isize - 1) * col_stride;
        let lo = offset as isize + r.min(0) + c.min(0);
        let hi = offset as isize + r.max(0) + c.max(0);
        if lo < 0 || hi as usize >= len {
            return Err(oob("window exceeds base"));
        }

        Ok(SignalView {
            slot,
            rows,
            cols,
            row_stride,
            col_stride,
            offset,
        })
    }

    /// Construct a view from a parsed [`ViewSpec`].
    pub fn view_from_spec(&self, spec: &ViewSpec) -> Result<SignalView, SetupError> {
        let bad = |field: &str| SetupError::Parse {
            input: spec.to_string(),
            reason: format!("{field} must be non-negative"),
        };
        let rows = usize::try_from(spec.rows).map_err(|_| bad("rows"))?;
        let cols = usize::try_from(spec.cols).map_err(|_| bad("cols"))?;
        let offset = usize::try_from(spec.offset).map_err(|_| bad("offset"))?;
        self.view(
            SignalKey(spec.key),
            rows,
            cols,
            spec.row_stride as isize,
            spec.col_stride as isize,
            offset,
        )
    }

    /// Construct a view from its serialized form
    /// `key:(rows,cols):(row_stride,col_stride):offset`.
    pub fn parse_view(&self, s: &str) -> Result<SignalView, SetupError> {
        let spec = parse::view_spec(s)?;
        self.view_from_spec(&spec)
    }

    // ── Element access ─────────────────────────────────────────────

    /// Element of `view` at `(row, col)`.
    #[inline]
    pub fn get(&self, view: &SignalView, row: usize, col: usize) -> f64 {
        self.signals[view.slot].data[view.index(row, col)]
    }

    /// Set the element of `view` at `(row, col)`.
    #[inline]
    pub fn set(&mut self, view: &SignalView, row: usize, col: usize, value: f64) {
        let idx = view.index(row, col);
        self.signals[view.slot].data[idx] = value;
    }

    /// Add `value` to the element of `view` at `(row, col)`.
    #[inline]
    pub fn add(&mut self, view: &SignalView, row: usize, col: usize, value: f64) {
        let idx = view.index(row, col);
        self.signals[view.slot].data[idx] += value;
    }

    /// Set every element of `view` to `value`.
    pub fn fill(&mut self, view: &SignalView, value: f64) {
        for i in 0..view.rows {
            for j in 0..view.cols {
                self.set(view, i, j, value);
            }
        }
    }

    /// Dense row-major snapshot of `view`.
    pub fn read(&self, view: &SignalView) -> BaseSignal {
        let mut out = BaseSignal::zeros(view.rows, view.cols);
        for i in 0..view.rows {
            for j in 0..view.cols {
                out.set(i, j, self.get(view, i, j));
            }
        }
        out
    }

    /// Write a dense snapshot back through `view`.
    ///
    /// # Panics
    ///
    /// Panics if `src` does not have the view's shape.
    pub fn write(&mut self, view: &SignalView, src: &BaseSignal) {
        assert_eq!(
            (src.rows(), src.cols()),
            view.shape(),
            "snapshot shape does not match view",
        );
        for i in 0..view.rows {
            for j in 0..view.cols {
                self.set(view, i, j, src.get(i, j));
            }
        }
    }

    /// Write a flat row-major slice through `view`.
    ///
    /// # Panics
    ///
    /// Panics if `src.len()` does not equal the view's element count.
    pub fn write_flat(&mut self, view: &SignalView, src: &[f64]) {
        assert_eq!(src.len(), view.len(), "payload length does not match view");
        let mut k = 0;
        for i in 0..view.rows {
            for j in 0..view.cols {
                self.set(view, i, j, src[k]);
                k += 1;
            }
        }
    }
}
