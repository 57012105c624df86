//! Periodic signal samplers.

use weft_core::{BaseSignal, ProbeKey, SetupError, SignalStore, SignalView};

/// Samples a view every `period` steps into a pre-allocated list of
/// snapshots.
///
/// Storage is sized once per run: `init_for_run(n)` allocates
/// `floor(n / period)` slots, and sampling ignores any step whose slot
/// would fall past that capacity, so a probe holds exactly
/// `floor(n / period)` snapshots after a run of `n` steps regardless of
/// where the cadence lands.
#[derive(Debug)]
pub struct Probe {
    target: SignalView,
    period: u64,
    start_step: u64,
    data: Vec<BaseSignal>,
}

impl Probe {
    /// Create a probe over `target` sampling every `period` steps.
    ///
    /// The period must be a positive integer number of steps.
    pub fn new(target: SignalView, period: u64) -> Result<Self, SetupError> {
        if period == 0 {
            return Err(SetupError::InvalidParameter {
                operator: "Probe",
                detail: "period must be a positive number of steps".to_string(),
            });
        }
        Ok(Self {
            target,
            period,
            start_step: 0,
            data: Vec::new(),
        })
    }

    /// The sampled view.
    pub fn target(&self) -> SignalView {
        self.target
    }

    /// Sample period in steps.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Number of snapshots currently held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the probe holds no snapshots.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pre-allocate storage for a run of `n_steps` starting at
    /// `start_step`.
    ///
    /// Fails with [`SetupError::NotEmpty`] if snapshots from a previous
    /// run have not been harvested.
    pub fn init_for_run(
        &mut self,
        key: ProbeKey,
        start_step: u64,
        n_steps: u64,
    ) -> Result<(), SetupError> {
        if !self.data.is_empty() {
            return Err(SetupError::NotEmpty { key });
        }
        self.start_step = start_step;
        let slots = (n_steps / self.period) as usize;
        self.data = (0..slots)
            .map(|_| BaseSignal::zeros(self.target.rows(), self.target.cols()))
            .collect();
        Ok(())
    }

    /// Record a snapshot if `step` is on the sampling cadence.
    ///
    /// Called after the operator list has run, so the snapshot reflects
    /// the view's value at the end of the step.
    pub fn sample(&mut self, step: u64, store: &SignalStore) {
        if step % self.period != 0 {
            return;
        }
        let slot = ((step - self.start_step) / self.period) as usize;
        if slot < self.data.len() {
            self.data[slot] = store.read(&self.target);
        }
    }

    /// Hand back the accumulated snapshots and clear the probe.
    pub fn harvest(&mut self) -> Vec<BaseSignal> {
        std::mem::take(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::SignalKey;

    fn store_with_counter() -> (SignalStore, SignalView) {
        let mut store = SignalStore::new();
        store
            .register(SignalKey(1), "counter", BaseSignal::column(&[0.0]))
            .unwrap();
        let view = store.full_view(SignalKey(1)).unwrap();
        (store, view)
    }

    #[test]
    fn period_zero_rejected() {
        let (store, view) = store_with_counter();
        let _ = store;
        assert!(matches!(
            Probe::new(view, 0),
            Err(SetupError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn cadence_floor_of_steps_over_period() {
        let (mut store, view) = store_with_counter();
        let mut probe = Probe::new(view, 3).unwrap();
        probe.init_for_run(ProbeKey(9), 0, 10).unwrap();

        for step in 0..10u64 {
            store.set(&view, 0, 0, step as f64);
            probe.sample(step, &store);
        }
        let frames = probe.harvest();
        // floor(10/3) = 3 snapshots, captured at steps 0, 3, 6.
        assert_eq!(frames.len(), 3);
        let values: Vec<f64> = frames.iter().map(|f| f.get(0, 0)).collect();
        assert_eq!(values, vec![0.0, 3.0, 6.0]);
    }

    #[test]
    fn period_one_captures_every_step() {
        let (mut store, view) = store_with_counter();
        let mut probe = Probe::new(view, 1).unwrap();
        probe.init_for_run(ProbeKey(9), 0, 4).unwrap();
        for step in 0..4u64 {
            store.set(&view, 0, 0, step as f64 + 1.0);
            probe.sample(step, &store);
        }
        let values: Vec<f64> = probe.harvest().iter().map(|f| f.get(0, 0)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn reinit_without_harvest_rejected() {
        let (store, view) = store_with_counter();
        let mut probe = Probe::new(view, 1).unwrap();
        probe.init_for_run(ProbeKey(5), 0, 2).unwrap();
        probe.sample(0, &store);
        match probe.init_for_run(ProbeKey(5), 2, 2) {
            Err(SetupError::NotEmpty { key }) => assert_eq!(key, ProbeKey(5)),
            other => panic!("expected NotEmpty, got {other:?}"),
        }
    }

    #[test]
    fn harvest_clears_and_allows_reinit() {
        let (store, view) = store_with_counter();
        let mut probe = Probe::new(view, 1).unwrap();
        probe.init_for_run(ProbeKey(5), 0, 2).unwrap();
        probe.sample(0, &store);
        probe.sample(1, &store);
        assert_eq!(probe.harvest().len(), 2);
        assert!(probe.is_empty());
        probe.init_for_run(ProbeKey(5), 2, 2).unwrap();
    }

    #[test]
    fn second_run_slots_are_relative_to_start() {
        let (mut store, view) = store_with_counter();
        let mut probe = Probe::new(view, 2).unwrap();

        probe.init_for_run(ProbeKey(5), 0, 4).unwrap();
        for step in 0..4u64 {
            probe.sample(step, &store);
        }
        probe.harvest();

        // Continue at step 4; slots must index from the new start.
        probe.init_for_run(ProbeKey(5), 4, 4).unwrap();
        for step in 4..8u64 {
            store.set(&view, 0, 0, step as f64);
            probe.sample(step, &store);
        }
        let values: Vec<f64> = probe.harvest().iter().map(|f| f.get(0, 0)).collect();
        assert_eq!(values, vec![4.0, 6.0]);
    }
}
