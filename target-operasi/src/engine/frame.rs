use amr_client::domain::{Indicator, IndicatorResult, MeterRecord};

use super::catalog::{Reading, CATALOG};
use crate::config::ThresholdConfig;

type Phases = [Vec<f64>; 3];

/// Column-oriented, normalized copy of a record batch.
///
/// Values are finite (non-finite readings become 0 on the way in), so rules
/// evaluated over a frame see the same inputs as the row-wise reference.
/// Per-row maxima and the average current are derived once here and shared
/// by every rule that needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterFrame {
    voltage: Phases,
    current: Phases,
    current_n: Vec<f64>,
    active_power: Phases,
    power_factor: Phases,
    active_power_day: Vec<f64>,
    active_power_night: Vec<f64>,
    kwh_import: Vec<f64>,
    kwh_export: Vec<f64>,
    current_loop: Vec<bool>,
    freeze: Vec<bool>,
    max_voltage: Vec<f64>,
    max_current: Vec<f64>,
    avg_current: Vec<f64>,
    len: usize,
}

impl MeterFrame {
    pub fn from_records(records: &[MeterRecord]) -> Self {
        let mut frame = MeterFrame {
            len: records.len(),
            ..Default::default()
        };

        for record in records {
            let r = Reading::from_record(record);
            for phase in 0..3 {
                frame.voltage[phase].push(r.voltage[phase]);
                frame.current[phase].push(r.current[phase]);
                frame.active_power[phase].push(r.active_power[phase]);
                frame.power_factor[phase].push(r.power_factor[phase]);
            }
            frame.current_n.push(r.current_n);
            frame.active_power_day.push(r.active_power_day);
            frame.active_power_night.push(r.active_power_night);
            frame.kwh_import.push(r.kwh_import);
            frame.kwh_export.push(r.kwh_export);
            frame.current_loop.push(r.current_loop);
            frame.freeze.push(r.freeze);
            frame.max_voltage.push(r.max_voltage());
            frame.max_current.push(r.max_current());
            frame.avg_current.push(r.avg_current());
        }

        frame
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One indicator over the whole frame.
    pub fn column(&self, indicator: Indicator, cfg: &ThresholdConfig) -> Vec<bool> {
        let (v, i, p, pf) = (&self.voltage, &self.current, &self.active_power, &self.power_factor);
        match indicator {
            Indicator::VDrop => any_phase(v, i, |v, i| v < cfg.v_drop_tm && i > cfg.i_min),
            Indicator::VLost => any_phase(v, i, |v, i| v <= 0.0 && i > cfg.i_min),
            Indicator::OverVoltage => map(&self.max_voltage, |v| v > cfg.v_max),
            Indicator::CosPhiKecil => any_phase(pf, i, |pf, i| pf <= cfg.cos_phi_max && i > cfg.cos_phi_i_min),
            Indicator::ArusHilang => {
                let lost = any_phase(i, i, |i, _| i < cfg.i_lost_floor);
                zip(&lost, &self.max_current, |lost, max_i| lost && max_i > cfg.i_min)
            }
            Indicator::InMoreImax => zip2(&self.current_n, &self.max_current, |n, max_i| {
                max_i > 0.0 && n > cfg.i_n_min && n > cfg.netral_vs_fasa * max_i
            }),
            Indicator::OverCurrent => map(&self.max_current, |max_i| max_i > cfg.i_max),
            Indicator::ReversePower => any_phase(p, i, |p, i| p < cfg.p_reverse_max && i > cfg.i_min),
            Indicator::UnbalanceI => {
                let mut out = vec![false; self.len];
                for phase in i {
                    for ((o, i), avg) in out.iter_mut().zip(phase).zip(&self.avg_current) {
                        *o |= *avg > 0.0 && (i - avg).abs() / avg > cfg.unbalance_tol && *i > cfg.i_min;
                    }
                }
                out
            }
            Indicator::ActivePLost => {
                let one_lost = any_phase(p, i, |p, i| p == 0.0 && i > cfg.i_lost_min);
                let any_live = any_phase(p, p, |p, _| p != 0.0);
                one_lost.iter().zip(&any_live).map(|(lost, live)| *lost && *live).collect()
            }
            Indicator::ActivePowerNegativeSiang => map(&self.active_power_day, |p| p < 0.0),
            Indicator::ActivePowerNegativeMalam => map(&self.active_power_night, |p| p < 0.0),
            Indicator::CurrentLoop => self.current_loop.clone(),
            Indicator::Freeze => self.freeze.clone(),
            Indicator::ReversePhase => any_phase(p, i, |p, i| p < 0.0 && i > cfg.i_min),
            Indicator::ImportGtExport => zip2(&self.kwh_import, &self.kwh_export, |imp, exp| imp > exp),
            Indicator::VLostAdaArus => any_phase(v, i, |v, i| v <= 0.0 && i > 0.0),
        }
    }
}

fn map(col: &[f64], pred: impl Fn(f64) -> bool) -> Vec<bool> {
    col.iter().map(|x| pred(*x)).collect()
}

fn zip2(a: &[f64], b: &[f64], pred: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    a.iter().zip(b).map(|(a, b)| pred(*a, *b)).collect()
}

fn zip(mask: &[bool], col: &[f64], pred: impl Fn(bool, f64) -> bool) -> Vec<bool> {
    mask.iter().zip(col).map(|(m, x)| pred(*m, *x)).collect()
}

/// Per row: does `pred` hold on any phase, pairing phase `k` of `a` with
/// phase `k` of `b`.
fn any_phase(a: &Phases, b: &Phases, pred: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    let mut out = vec![false; a[0].len()];
    for (col_a, col_b) in a.iter().zip(b) {
        for ((o, x), y) in out.iter_mut().zip(col_a).zip(col_b) {
            *o |= pred(*x, *y);
        }
    }
    out
}

/// Batch evaluation: one indicator column at a time over the whole frame.
///
/// Disabled indicators are skipped outright and stay `false`.
pub fn evaluate_frame(frame: &MeterFrame, cfg: &ThresholdConfig) -> Vec<IndicatorResult> {
    let mut results = vec![IndicatorResult::default(); frame.len()];

    for rule in CATALOG.iter().filter(|r| cfg.is_enabled(r.indicator)) {
        let column = frame.column(rule.indicator, cfg);
        for (result, raised) in results.iter_mut().zip(column) {
            result.set(rule.indicator, raised);
        }
    }

    results
}
