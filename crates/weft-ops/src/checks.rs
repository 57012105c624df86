//! Shared construction-time validators.

use weft_core::{SetupError, SignalView};

pub(crate) fn shape_string(v: &SignalView) -> String {
    format!("({}, {})", v.rows(), v.cols())
}

/// The two views must have identical extents.
pub(crate) fn expect_same_shape(
    operator: &'static str,
    a_name: &str,
    a: &SignalView,
    b_name: &str,
    b: &SignalView,
) -> Result<(), SetupError> {
    if a.shape() != b.shape() {
        return Err(SetupError::ShapeMismatch {
            operator,
            detail: format!(
                "{a_name} is {} but {b_name} is {}",
                shape_string(a),
                shape_string(b)
            ),
        });
    }
    Ok(())
}

/// The view must be an n×1 column.
pub(crate) fn expect_column(
    operator: &'static str,
    name: &str,
    v: &SignalView,
) -> Result<(), SetupError> {
    if !v.is_column() {
        return Err(SetupError::ShapeMismatch {
            operator,
            detail: format!("{name} must be a column, got {}", shape_string(v)),
        });
    }
    Ok(())
}

/// The view must be an n×1 column with exactly `rows` rows.
pub(crate) fn expect_column_of(
    operator: &'static str,
    name: &str,
    v: &SignalView,
    rows: usize,
) -> Result<(), SetupError> {
    expect_column(operator, name, v)?;
    if v.rows() != rows {
        return Err(SetupError::ShapeMismatch {
            operator,
            detail: format!("{name} must have {rows} rows, got {}", v.rows()),
        });
    }
    Ok(())
}

/// The scalar must be finite and strictly positive.
pub(crate) fn expect_positive(
    operator: &'static str,
    name: &str,
    value: f64,
) -> Result<(), SetupError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SetupError::InvalidParameter {
            operator,
            detail: format!("{name} must be finite and positive, got {value}"),
        });
    }
    Ok(())
}

/// The scalar must be finite and non-negative.
pub(crate) fn expect_non_negative(
    operator: &'static str,
    name: &str,
    value: f64,
) -> Result<(), SetupError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SetupError::InvalidParameter {
            operator,
            detail: format!("{name} must be finite and non-negative, got {value}"),
        });
    }
    Ok(())
}
