//! Operator construction from serialized form.
//!
//! The setup protocol ships operators as `ClassName; arg1; arg2; …`
//! lines. Arguments are view strings, scalar literals, float lists, or
//! integers, in the order of the corresponding constructor. Transport
//! operators (`Send`, `Recv`, `Wait`, `Barrier`) are not built here:
//! they need the chunk's wiring tables and are intercepted by the chunk
//! before the line reaches this factory.

use weft_core::{parse, BaseSignal, Operator, SetupError, SignalStore, SignalView};

use crate::copies::{CopySignal, Reset, SlicedCopy};
use crate::learning::{Bcm, Oja, Voja};
use crate::neurons::{
    AdaptiveLif, AdaptiveLifRate, Izhikevich, Lif, LifRate, RectifiedLinear, Sigmoid,
};
use crate::noise::{WhiteNoise, WhiteSignal};
use crate::products::{DotInc, ElementwiseInc};
use crate::synapses::{NoDenSynapse, SimpleSynapse, Synapse, TriangleSynapse};

/// Cursor over the `;`-separated arguments of one operator line.
struct Args<'a> {
    line: &'a str,
    parts: Vec<&'a str>,
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(line: &'a str, parts: Vec<&'a str>) -> Self {
        Self {
            line,
            parts,
            pos: 0,
        }
    }

    fn parse_err(&self, reason: impl Into<String>) -> SetupError {
        SetupError::Parse {
            input: self.line.to_string(),
            reason: reason.into(),
        }
    }

    fn next(&mut self) -> Result<&'a str, SetupError> {
        let part = self
            .parts
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.parse_err(format!("missing argument {}", self.pos)))?;
        self.pos += 1;
        Ok(part)
    }

    fn view(&mut self, store: &SignalStore) -> Result<SignalView, SetupError> {
        store.parse_view(self.next()?)
    }

    fn float(&mut self) -> Result<f64, SetupError> {
        let s = self.next()?;
        s.parse::<f64>()
            .map_err(|_| self.parse_err(format!("'{s}' is not a number")))
    }

    fn int(&mut self) -> Result<i64, SetupError> {
        let s = self.next()?;
        s.parse::<i64>()
            .map_err(|_| self.parse_err(format!("'{s}' is not an integer")))
    }

    fn uint(&mut self) -> Result<usize, SetupError> {
        let v = self.int()?;
        usize::try_from(v).map_err(|_| self.parse_err(format!("'{v}' must be non-negative")))
    }

    fn flag(&mut self) -> Result<bool, SetupError> {
        match self.int()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.parse_err(format!("flag must be 0 or 1, got {other}"))),
        }
    }

    fn float_list(&mut self) -> Result<BaseSignal, SetupError> {
        parse::float_list(self.next()?)
    }

    fn int_list(&mut self) -> Result<Vec<i64>, SetupError> {
        parse::int_list(self.next()?)
    }

    fn finish(self) -> Result<(), SetupError> {
        if self.pos != self.parts.len() {
            return Err(SetupError::Parse {
                input: self.line.to_string(),
                reason: format!(
                    "expected {} arguments, got {}",
                    self.pos,
                    self.parts.len()
                ),
            });
        }
        Ok(())
    }
}

/// Build an operator from its serialized form, resolving views against
/// `store`.
///
/// Fails with [`SetupError::UnknownOperator`] for unrecognized class
/// names and [`SetupError::Parse`] for malformed argument lists.
pub fn build_operator(line: &str, store: &SignalStore) -> Result<Box<dyn Operator>, SetupError> {
    let mut parts = line.split(';').map(str::trim);
    let class = parts.next().unwrap_or("").to_string();
    let mut args = Args::new(line, parts.collect());

    let op: Box<dyn Operator> = match class.as_str() {
        "Reset" => {
            let dst = args.view(store)?;
            let value = args.float()?;
            Box::new(Reset::new(dst, value))
        }
        "Copy" => {
            let dst = args.view(store)?;
            let src = args.view(store)?;
            Box::new(CopySignal::new(dst, src)?)
        }
        "SlicedCopy" => {
            let dst = args.view(store)?;
            let src = args.view(store)?;
            let inc = args.flag()?;
            let range_src = (args.int()?, args.int()?, args.int()?);
            let range_dst = (args.int()?, args.int()?, args.int()?);
            let seq_src = args.int_list()?;
            let seq_dst = args.int_list()?;
            Box::new(SlicedCopy::new(
                dst, src, inc, range_src, range_dst, seq_src, seq_dst,
            )?)
        }
        "DotInc" => {
            let a = args.view(store)?;
            let x = args.view(store)?;
            let y = args.view(store)?;
            Box::new(DotInc::new(a, x, y)?)
        }
        "ElementwiseInc" => {
            let a = args.view(store)?;
            let x = args.view(store)?;
            let y = args.view(store)?;
            Box::new(ElementwiseInc::new(a, x, y)?)
        }
        "NoDenSynapse" => {
            let input = args.view(store)?;
            let output = args.view(store)?;
            let b = args.float()?;
            Box::new(NoDenSynapse::new(input, output, b)?)
        }
        "SimpleSynapse" => {
            let input = args.view(store)?;
            let output = args.view(store)?;
            let a = args.float()?;
            let b = args.float()?;
            Box::new(SimpleSynapse::new(input, output, a, b)?)
        }
        "Synapse" => {
            let input = args.view(store)?;
            let output = args.view(store)?;
            let numer = args.float_list()?.into_vec();
            let denom = args.float_list()?.into_vec();
            Box::new(Synapse::new(input, output, numer, denom)?)
        }
        "TriangleSynapse" => {
            let input = args.view(store)?;
            let output = args.view(store)?;
            let n0 = args.float()?;
            let ndiff = args.float()?;
            let n_taps = args.uint()?;
            Box::new(TriangleSynapse::new(input, output, n0, ndiff, n_taps)?)
        }
        "WhiteNoise" => {
            let output = args.view(store)?;
            let mean = args.float()?;
            let std = args.float()?;
            let do_scale = args.flag()?;
            let inc = args.flag()?;
            let dt = args.float()?;
            Box::new(WhiteNoise::new(output, mean, std, do_scale, inc, dt)?)
        }
        "WhiteSignal" => {
            let output = args.view(store)?;
            let coefs = args.float_list()?;
            Box::new(WhiteSignal::new(output, coefs)?)
        }
        "LIF" => {
            let n = args.uint()?;
            let tau_rc = args.float()?;
            let tau_ref = args.float()?;
            let min_voltage = args.float()?;
            let dt = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            let voltage = args.view(store)?;
            let ref_time = args.view(store)?;
            Box::new(Lif::new(
                n, tau_rc, tau_ref, min_voltage, dt, j, output, voltage, ref_time,
            )?)
        }
        "LIFRate" => {
            let n = args.uint()?;
            let tau_rc = args.float()?;
            let tau_ref = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            Box::new(LifRate::new(n, tau_rc, tau_ref, j, output)?)
        }
        "AdaptiveLIF" => {
            let n = args.uint()?;
            let tau_n = args.float()?;
            let inc_n = args.float()?;
            let tau_rc = args.float()?;
            let tau_ref = args.float()?;
            let min_voltage = args.float()?;
            let dt = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            let voltage = args.view(store)?;
            let ref_time = args.view(store)?;
            let adaptation = args.view(store)?;
            Box::new(AdaptiveLif::new(
                n, tau_n, inc_n, tau_rc, tau_ref, min_voltage, dt, j, output, voltage, ref_time,
                adaptation,
            )?)
        }
        "AdaptiveLIFRate" => {
            let n = args.uint()?;
            let tau_n = args.float()?;
            let inc_n = args.float()?;
            let tau_rc = args.float()?;
            let tau_ref = args.float()?;
            let dt = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            let adaptation = args.view(store)?;
            Box::new(AdaptiveLifRate::new(
                n, tau_n, inc_n, tau_rc, tau_ref, dt, j, output, adaptation,
            )?)
        }
        "RectifiedLinear" => {
            let n = args.uint()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            Box::new(RectifiedLinear::new(n, j, output)?)
        }
        "Sigmoid" => {
            let n = args.uint()?;
            let tau_ref = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            Box::new(Sigmoid::new(n, tau_ref, j, output)?)
        }
        "Izhikevich" => {
            let n = args.uint()?;
            let tau_recovery = args.float()?;
            let coupling = args.float()?;
            let reset_voltage = args.float()?;
            let reset_recovery = args.float()?;
            let dt = args.float()?;
            let j = args.view(store)?;
            let output = args.view(store)?;
            let voltage = args.view(store)?;
            let recovery = args.view(store)?;
            Box::new(Izhikevich::new(
                n,
                tau_recovery,
                coupling,
                reset_voltage,
                reset_recovery,
                dt,
                j,
                output,
                voltage,
                recovery,
            )?)
        }
        "BCM" => {
            let pre = args.view(store)?;
            let post = args.view(store)?;
            let theta = args.view(store)?;
            let delta = args.view(store)?;
            let rate = args.float()?;
            let dt = args.float()?;
            Box::new(Bcm::new(pre, post, theta, delta, rate, dt)?)
        }
        "Oja" => {
            let pre = args.view(store)?;
            let post = args.view(store)?;
            let weights = args.view(store)?;
            let delta = args.view(store)?;
            let rate = args.float()?;
            let dt = args.float()?;
            let beta = args.float()?;
            Box::new(Oja::new(pre, post, weights, delta, rate, dt, beta)?)
        }
        "Voja" => {
            let pre = args.view(store)?;
            let post = args.view(store)?;
            let encoders = args.view(store)?;
            let delta = args.view(store)?;
            let learning = args.view(store)?;
            let scale = args.float_list()?;
            let rate = args.float()?;
            let dt = args.float()?;
            Box::new(Voja::new(
                pre, post, encoders, delta, learning, scale, rate, dt,
            )?)
        }
        _ => {
            return Err(SetupError::UnknownOperator { name: class });
        }
    };

    args.finish()?;
    Ok(op)
}
