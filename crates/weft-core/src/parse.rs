//! String grammars used by the setup protocol.
//!
//! Two small formats arrive over the wire while a chunk is being built:
//! view strings (`key:(rows,cols):(row_stride,col_stride):offset`) and
//! float lists (`[a, b, c]` for a column, `rows,cols,a,b,…` for a 2-D
//! literal). Whitespace is insignificant in both. Failures carry the
//! offending input verbatim.

use std::fmt;

use crate::error::SetupError;
use crate::signal::BaseSignal;

/// The five integers of a serialized view, before resolution against a
/// signal store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSpec {
    /// Key of the base signal the view targets.
    pub key: i64,
    /// Row extent.
    pub rows: i64,
    /// Column extent.
    pub cols: i64,
    /// Row stride, in base-array elements.
    pub row_stride: i64,
    /// Column stride, in base-array elements.
    pub col_stride: i64,
    /// Starting offset into the base array.
    pub offset: i64,
}

impl fmt::Display for ViewSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:({},{}):({},{}):{}",
            self.key, self.rows, self.cols, self.row_stride, self.col_stride, self.offset
        )
    }
}

fn parse_err(input: &str, reason: impl Into<String>) -> SetupError {
    SetupError::Parse {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn int(input: &str, s: &str) -> Result<i64, SetupError> {
    s.parse::<i64>()
        .map_err(|_| parse_err(input, format!("'{s}' is not an integer")))
}

fn float(input: &str, s: &str) -> Result<f64, SetupError> {
    s.parse::<f64>()
        .map_err(|_| parse_err(input, format!("'{s}' is not a number")))
}

/// Strip a single layer of parentheses and split on the comma.
fn pair(input: &str, s: &str) -> Result<(i64, i64), SetupError> {
    let inner = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| parse_err(input, format!("expected '(a,b)', got '{s}'")))?;
    let (a, b) = inner
        .split_once(',')
        .ok_or_else(|| parse_err(input, format!("expected two values in '{s}'")))?;
    Ok((int(input, a)?, int(input, b)?))
}

/// Parse a serialized view string.
pub fn view_spec(input: &str) -> Result<ViewSpec, SetupError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let parts: Vec<&str> = compact.split(':').collect();
    if parts.len() != 4 {
        return Err(parse_err(input, "expected four ':'-separated parts"));
    }
    let key = int(input, parts[0])?;
    let (rows, cols) = pair(input, parts[1])?;
    let (row_stride, col_stride) = pair(input, parts[2])?;
    let offset = int(input, parts[3])?;
    Ok(ViewSpec {
        key,
        rows,
        cols,
        row_stride,
        col_stride,
        offset,
    })
}

/// Parse a float list into a dense signal.
///
/// `[a, b, c]` yields an n×1 column (n may be zero); `rows,cols,a,b,…`
/// yields a 2-D literal with exactly `rows·cols` values.
pub fn float_list(input: &str) -> Result<BaseSignal, SetupError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(inner) = compact.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| parse_err(input, "missing closing ']'"))?;
        if inner.is_empty() {
            return Ok(BaseSignal::zeros(0, 1));
        }
        let values = inner
            .split(',')
            .map(|s| float(input, s))
            .collect::<Result<Vec<f64>, _>>()?;
        return Ok(BaseSignal::column(&values));
    }

    let mut parts = compact.split(',');
    let rows = int(input, parts.next().unwrap_or(""))?;
    let cols = int(
        input,
        parts
            .next()
            .ok_or_else(|| parse_err(input, "expected 'rows,cols,…'"))?,
    )?;
    if rows < 0 || cols < 0 {
        return Err(parse_err(input, "extents must be non-negative"));
    }
    let values = parts
        .map(|s| float(input, s))
        .collect::<Result<Vec<f64>, _>>()?;
    let expected = (rows * cols) as usize;
    if values.len() != expected {
        return Err(parse_err(
            input,
            format!("expected {expected} values for {rows}x{cols}, got {}", values.len()),
        ));
    }
    Ok(BaseSignal::new(rows as usize, cols as usize, values))
}

/// Parse an integer list `[a, b, c]` (possibly empty: `[]`).
pub fn int_list(input: &str) -> Result<Vec<i64>, SetupError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let inner = compact
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| parse_err(input, "expected '[a, b, …]'"))?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner.split(',').map(|s| int(input, s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn view_spec_basic() {
        let spec = view_spec("12:(3,1):(4,1):2").unwrap();
        assert_eq!(
            spec,
            ViewSpec {
                key: 12,
                rows: 3,
                cols: 1,
                row_stride: 4,
                col_stride: 1,
                offset: 2,
            }
        );
    }

    #[test]
    fn view_spec_whitespace_insignificant() {
        let a = view_spec("-7 : ( 2 , 3 ) : ( -1 , 0 ) : 10").unwrap();
        let b = view_spec("-7:(2,3):(-1,0):10").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key, -7);
        assert_eq!(a.row_stride, -1);
    }

    #[test]
    fn view_spec_malformed_rejected() {
        for bad in ["", "1:(2,3)", "1:(2,3):(1,1):x", "1:2,3:(1,1):0", "1:(2):(1,1):0"] {
            let err = view_spec(bad).unwrap_err();
            match err {
                SetupError::Parse { input, .. } => assert_eq!(input, bad),
                other => panic!("expected Parse, got {other:?}"),
            }
        }
    }

    #[test]
    fn float_list_column() {
        let sig = float_list("[0.1, 0.2, 0.3]").unwrap();
        assert_eq!((sig.rows(), sig.cols()), (3, 1));
        assert_eq!(sig.as_slice(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn float_list_empty() {
        let sig = float_list("[]").unwrap();
        assert!(sig.is_empty());
    }

    #[test]
    fn float_list_two_dim() {
        let sig = float_list("2,3,1,2,3,4,5,6").unwrap();
        assert_eq!((sig.rows(), sig.cols()), (2, 3));
        assert_eq!(sig.get(1, 2), 6.0);
    }

    #[test]
    fn float_list_count_mismatch_rejected() {
        assert!(matches!(
            float_list("2,3,1,2,3"),
            Err(SetupError::Parse { .. })
        ));
    }

    #[test]
    fn int_list_round_trip() {
        assert_eq!(int_list("[3, 1, -2]").unwrap(), vec![3, 1, -2]);
        assert_eq!(int_list("[]").unwrap(), Vec::<i64>::new());
        assert!(int_list("3,1").is_err());
    }

    proptest! {
        /// Formatting a spec and parsing it back is the identity.
        #[test]
        fn view_spec_display_round_trips(
            key in -1_000_000i64..1_000_000,
            rows in 0i64..100,
            cols in 0i64..100,
            row_stride in -100i64..100,
            col_stride in -100i64..100,
            offset in 0i64..10_000,
        ) {
            let spec = ViewSpec { key, rows, cols, row_stride, col_stride, offset };
            prop_assert_eq!(view_spec(&spec.to_string()).unwrap(), spec);
        }
    }
}
