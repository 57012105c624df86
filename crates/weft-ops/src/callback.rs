//! Host-callback operator.
//!
//! A collaborator (typically a scripting boundary) may register an
//! opaque callable as an operator. Four shapes exist, chosen at
//! construction: the callable may consume the current simulation time,
//! may consume an input view, and may produce values for an output
//! view. Input is staged through a 1-D buffer before each call.

use weft_core::{Operator, SetupError, SignalView, StepContext, StepError};

use crate::checks::expect_column;

/// Arguments handed to the host callable each step.
pub struct CallbackArgs<'a> {
    /// Current simulated time, when the callback was registered with
    /// time supply.
    pub time: Option<f64>,
    /// Staged input column, when the callback was registered with an
    /// input view.
    pub input: Option<&'a [f64]>,
}

/// The host callable. Returning `None` is only valid for callbacks
/// without an output view.
pub type CallbackFn = Box<dyn FnMut(CallbackArgs<'_>) -> Option<Vec<f64>> + Send>;

/// Operator wrapping a collaborator-supplied callable.
///
/// Shape mismatches between the returned vector and the output view
/// are surfaced at step time as [`StepError::OutputShape`].
pub struct Callback {
    func: CallbackFn,
    supply_time: bool,
    input: Option<SignalView>,
    output: Option<SignalView>,
    staging: Vec<f64>,
}

impl Callback {
    /// Create a callback operator.
    ///
    /// `input` and `output`, when present, must be column views; the
    /// staging buffer is sized to the input.
    pub fn new(
        func: CallbackFn,
        supply_time: bool,
        input: Option<SignalView>,
        output: Option<SignalView>,
    ) -> Result<Self, SetupError> {
        if let Some(view) = &input {
            expect_column("Callback", "input", view)?;
        }
        if let Some(view) = &output {
            expect_column("Callback", "output", view)?;
        }
        let staging = vec![0.0; input.map_or(0, |v| v.rows())];
        Ok(Self {
            func,
            supply_time,
            input,
            output,
            staging,
        })
    }
}

impl Operator for Callback {
    fn name(&self) -> &str {
        "Callback"
    }

    fn step(&mut self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        if let Some(view) = &self.input {
            let store = ctx.store_ref();
            for (i, slot) in self.staging.iter_mut().enumerate() {
                *slot = store.get(view, i, 0);
            }
        }

        let args = CallbackArgs {
            time: self.supply_time.then(|| ctx.time()),
            input: self.input.is_some().then_some(self.staging.as_slice()),
        };
        let returned = (self.func)(args);

        if let Some(view) = &self.output {
            let values = returned.ok_or(StepError::OutputShape {
                expected: view.rows(),
                got: 0,
            })?;
            if values.len() != view.rows() {
                return Err(StepError::OutputShape {
                    expected: view.rows(),
                    got: values.len(),
                });
            }
            for (i, value) in values.iter().enumerate() {
                ctx.store().set(view, i, 0, *value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{BaseSignal, SignalKey, SignalStore, StepId};

    fn column_store(pairs: &[(i64, &[f64])]) -> SignalStore {
        let mut store = SignalStore::new();
        for (key, values) in pairs {
            store
                .register(SignalKey(*key), "sig", BaseSignal::column(values))
                .unwrap();
        }
        store
    }

    #[test]
    fn callback_reads_input_and_writes_output() {
        let mut store = column_store(&[(1, &[1.0, 2.0]), (2, &[0.0, 0.0])]);
        let input = store.full_view(SignalKey(1)).unwrap();
        let output = store.full_view(SignalKey(2)).unwrap();
        let mut op = Callback::new(
            Box::new(|args: CallbackArgs<'_>| {
                let input = args.input.unwrap();
                Some(input.iter().map(|v| v * 10.0).collect())
            }),
            false,
            Some(input),
            Some(output),
        )
        .unwrap();

        let mut ctx = StepContext::new(&mut store, None, 0.0, StepId(0));
        op.step(&mut ctx).unwrap();
        assert_eq!(store.read(&output).as_slice(), &[10.0, 20.0]);
    }

    #[test]
    fn callback_receives_time_when_requested() {
        let mut store = column_store(&[(1, &[0.0])]);
        let output = store.full_view(SignalKey(1)).unwrap();
        let mut op = Callback::new(
            Box::new(|args: CallbackArgs<'_>| Some(vec![args.time.unwrap() * 2.0])),
            true,
            None,
            Some(output),
        )
        .unwrap();

        let mut ctx = StepContext::new(&mut store, None, 0.25, StepId(250));
        op.step(&mut ctx).unwrap();
        assert_eq!(store.get(&output, 0, 0), 0.5);
    }

    #[test]
    fn callback_output_shape_mismatch_is_step_error() {
        let mut store = column_store(&[(1, &[0.0, 0.0, 0.0])]);
        let output = store.full_view(SignalKey(1)).unwrap();
        let mut op = Callback::new(
            Box::new(|_| Some(vec![1.0])),
            false,
            None,
            Some(output),
        )
        .unwrap();

        let mut ctx = StepContext::new(&mut store, None, 0.0, StepId(0));
        match op.step(&mut ctx) {
            Err(StepError::OutputShape { expected: 3, got: 1 }) => {}
            other => panic!("expected OutputShape, got {other:?}"),
        }
    }

    #[test]
    fn sink_callback_may_return_none() {
        let mut store = column_store(&[(1, &[7.0])]);
        let input = store.full_view(SignalKey(1)).unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let mut op = Callback::new(
            Box::new(move |args: CallbackArgs<'_>| {
                tx.send(args.input.unwrap()[0]).unwrap();
                None
            }),
            false,
            Some(input),
            None,
        )
        .unwrap();

        let mut ctx = StepContext::new(&mut store, None, 0.0, StepId(0));
        op.step(&mut ctx).unwrap();
        assert_eq!(rx.try_recv().unwrap(), 7.0);
    }
}
