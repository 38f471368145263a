//! The indicator rule catalog.
//!
//! Each rule is a pure predicate over one normalized [`Reading`]. Rules never
//! fail: every ratio guards its zero denominator and resolves to `false`.

use amr_client::domain::{Indicator, IndicatorResult, MeterRecord};

use crate::config::ThresholdConfig;

/// Numeric view of one record as the rules see it. All values are finite.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub voltage: [f64; 3],
    pub current: [f64; 3],
    pub current_n: f64,
    pub active_power: [f64; 3],
    pub power_factor: [f64; 3],
    pub active_power_day: f64,
    pub active_power_night: f64,
    pub kwh_import: f64,
    pub kwh_export: f64,
    pub current_loop: bool,
    pub freeze: bool,
}

impl Reading {
    pub fn from_record(record: &MeterRecord) -> Self {
        let z = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            voltage: record.voltage.map(z),
            current: record.current.map(z),
            current_n: z(record.current_n),
            active_power: record.active_power.map(z),
            power_factor: record.power_factor.map(z),
            active_power_day: z(record.active_power_day),
            active_power_night: z(record.active_power_night),
            kwh_import: z(record.kwh_import),
            kwh_export: z(record.kwh_export),
            current_loop: record.current_loop,
            freeze: record.freeze,
        }
    }

    pub(crate) fn max_current(&self) -> f64 {
        self.current.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub(crate) fn max_voltage(&self) -> f64 {
        self.voltage.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub(crate) fn avg_current(&self) -> f64 {
        self.current.iter().sum::<f64>() / 3.0
    }

    fn any_phase(&self, f: impl Fn(usize) -> bool) -> bool {
        (0..3).any(f)
    }
}

pub type RuleFn = fn(&Reading, &ThresholdConfig) -> bool;

pub struct Rule {
    pub indicator: Indicator,
    pub description: &'static str,
    pub check: RuleFn,
}

impl Rule {
    /// Evaluate, honoring gates and the `disabled` list.
    pub fn evaluate(&self, reading: &Reading, cfg: &ThresholdConfig) -> bool {
        cfg.is_enabled(self.indicator) && (self.check)(reading, cfg)
    }
}

fn v_drop(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.voltage[i] < cfg.v_drop_tm && r.current[i] > cfg.i_min)
}

fn v_lost(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.voltage[i] <= 0.0 && r.current[i] > cfg.i_min)
}

fn over_voltage(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.max_voltage() > cfg.v_max
}

fn cos_phi_kecil(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.power_factor[i] <= cfg.cos_phi_max && r.current[i] > cfg.cos_phi_i_min)
}

fn arus_hilang(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.current[i] < cfg.i_lost_floor) && r.max_current() > cfg.i_min
}

fn in_more_imax(r: &Reading, cfg: &ThresholdConfig) -> bool {
    let max_i = r.max_current();
    if max_i <= 0.0 {
        return false;
    }
    r.current_n > cfg.i_n_min && r.current_n > cfg.netral_vs_fasa * max_i
}

fn over_current(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.max_current() > cfg.i_max
}

fn reverse_power(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.active_power[i] < cfg.p_reverse_max && r.current[i] > cfg.i_min)
}

fn unbalance_i(r: &Reading, cfg: &ThresholdConfig) -> bool {
    let avg = r.avg_current();
    if avg <= 0.0 {
        return false;
    }
    r.any_phase(|i| (r.current[i] - avg).abs() / avg > cfg.unbalance_tol && r.current[i] > cfg.i_min)
}

fn active_p_lost(r: &Reading, cfg: &ThresholdConfig) -> bool {
    // All three at zero is an outage, not a single-phase anomaly.
    if r.active_power.iter().all(|p| *p == 0.0) {
        return false;
    }
    r.any_phase(|i| r.active_power[i] == 0.0 && r.current[i] > cfg.i_lost_min)
}

fn active_power_negative_siang(r: &Reading, _: &ThresholdConfig) -> bool {
    r.active_power_day < 0.0
}

fn active_power_negative_malam(r: &Reading, _: &ThresholdConfig) -> bool {
    r.active_power_night < 0.0
}

fn current_loop(r: &Reading, _: &ThresholdConfig) -> bool {
    r.current_loop
}

fn freeze(r: &Reading, _: &ThresholdConfig) -> bool {
    r.freeze
}

fn reverse_phase(r: &Reading, cfg: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.active_power[i] < 0.0 && r.current[i] > cfg.i_min)
}

fn import_gt_export(r: &Reading, _: &ThresholdConfig) -> bool {
    r.kwh_import > r.kwh_export
}

fn v_lost_ada_arus(r: &Reading, _: &ThresholdConfig) -> bool {
    r.any_phase(|i| r.voltage[i] <= 0.0 && r.current[i] > 0.0)
}

/// Every rule, in [`Indicator::ALL`] order.
pub static CATALOG: [Rule; Indicator::COUNT] = [
    Rule {
        indicator: Indicator::VDrop,
        description: "loaded phase below the voltage-drop limit",
        check: v_drop,
    },
    Rule {
        indicator: Indicator::VLost,
        description: "loaded phase with no voltage",
        check: v_lost,
    },
    Rule {
        indicator: Indicator::OverVoltage,
        description: "highest phase voltage above the ceiling",
        check: over_voltage,
    },
    Rule {
        indicator: Indicator::CosPhiKecil,
        description: "loaded phase with low power factor",
        check: cos_phi_kecil,
    },
    Rule {
        indicator: Indicator::ArusHilang,
        description: "one phase carries no current while another is loaded",
        check: arus_hilang,
    },
    Rule {
        indicator: Indicator::InMoreImax,
        description: "neutral current exceeds the largest phase current by the configured ratio",
        check: in_more_imax,
    },
    Rule {
        indicator: Indicator::OverCurrent,
        description: "highest phase current above the ceiling",
        check: over_current,
    },
    Rule {
        indicator: Indicator::ReversePower,
        description: "loaded phase with near-zero or negative active power",
        check: reverse_power,
    },
    Rule {
        indicator: Indicator::UnbalanceI,
        description: "loaded phase deviates from the average current beyond tolerance",
        check: unbalance_i,
    },
    Rule {
        indicator: Indicator::ActivePLost,
        description: "loaded phase records zero active power while others do not",
        check: active_p_lost,
    },
    Rule {
        indicator: Indicator::ActivePowerNegativeSiang,
        description: "negative daytime active power",
        check: active_power_negative_siang,
    },
    Rule {
        indicator: Indicator::ActivePowerNegativeMalam,
        description: "negative night-time active power",
        check: active_power_negative_malam,
    },
    Rule {
        indicator: Indicator::CurrentLoop,
        description: "meter reports a current loop",
        check: current_loop,
    },
    Rule {
        indicator: Indicator::Freeze,
        description: "meter reports frozen readings",
        check: freeze,
    },
    Rule {
        indicator: Indicator::ReversePhase,
        description: "loaded phase with negative active power (K-L terminals swapped)",
        check: reverse_phase,
    },
    Rule {
        indicator: Indicator::ImportGtExport,
        description: "imported energy exceeds exported energy",
        check: import_gt_export,
    },
    Rule {
        indicator: Indicator::VLostAdaArus,
        description: "phase without voltage while current flows",
        check: v_lost_ada_arus,
    },
];

/// Row-wise reference evaluation of one record.
pub fn evaluate_record(record: &MeterRecord, cfg: &ThresholdConfig) -> IndicatorResult {
    evaluate_reading(&Reading::from_record(record), cfg)
}

pub fn evaluate_reading(reading: &Reading, cfg: &ThresholdConfig) -> IndicatorResult {
    let mut result = IndicatorResult::default();
    for rule in &CATALOG {
        result.set(rule.indicator, rule.evaluate(reading, cfg));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThresholdSettings;
    use amr_client::domain::Gate;

    fn cfg() -> ThresholdConfig {
        ThresholdConfig::default()
    }

    fn raised(record: &MeterRecord, cfg: &ThresholdConfig) -> Vec<Indicator> {
        evaluate_record(record, cfg).raised().collect()
    }

    /// Three healthy, balanced, loaded phases.
    fn healthy() -> MeterRecord {
        MeterRecord::new("510000000001")
            .with_voltage([230.0, 231.0, 229.0])
            .with_current([2.0, 2.1, 1.9])
            .with_current_n(0.2)
            .with_active_power([0.4, 0.42, 0.38])
            .with_power_factor([0.92, 0.9, 0.95])
    }

    #[test]
    fn catalog_is_in_indicator_order() {
        for (rule, indicator) in CATALOG.iter().zip(Indicator::ALL) {
            assert_eq!(rule.indicator, indicator);
        }
    }

    #[test]
    fn healthy_record_raises_nothing() {
        assert!(raised(&healthy(), &cfg()).is_empty());
    }

    #[test]
    fn voltage_drop_needs_current_on_the_same_phase() {
        let dropped = MeterRecord::new("a").with_voltage([40.0, 0.0, 0.0]).with_current([1.0, 0.0, 0.0]);
        assert!(evaluate_record(&dropped, &cfg()).get(Indicator::VDrop));

        let de_energized = MeterRecord::new("b").with_voltage([40.0, 230.0, 230.0]).with_current([0.0, 1.0, 1.0]);
        assert!(!evaluate_record(&de_energized, &cfg()).get(Indicator::VDrop));
    }

    #[test]
    fn voltage_lost_and_overvoltage() {
        let lost = healthy().with_voltage([0.0, 230.0, 230.0]);
        let result = evaluate_record(&lost, &cfg());
        assert!(result.get(Indicator::VLost));
        assert!(result.get(Indicator::VDrop));

        let high = healthy().with_voltage([230.0, 242.0, 230.0]);
        assert!(evaluate_record(&high, &cfg()).get(Indicator::OverVoltage));
        let at_limit = healthy().with_voltage([230.0, 241.0, 230.0]);
        assert!(!evaluate_record(&at_limit, &cfg()).get(Indicator::OverVoltage));
    }

    #[test]
    fn low_power_factor_ignores_lightly_loaded_phases() {
        let loaded = healthy().with_power_factor([0.4, 0.9, 0.9]);
        assert!(evaluate_record(&loaded, &cfg()).get(Indicator::CosPhiKecil));

        let light = healthy().with_current([0.7, 2.0, 2.0]).with_power_factor([0.1, 0.9, 0.9]);
        assert!(!evaluate_record(&light, &cfg()).get(Indicator::CosPhiKecil));
    }

    #[test]
    fn lost_current_is_asymmetric() {
        let one_lost = healthy().with_current([0.01, 2.0, 2.0]);
        assert!(evaluate_record(&one_lost, &cfg()).get(Indicator::ArusHilang));

        let all_idle = healthy().with_current([0.01, 0.01, 0.0]);
        assert!(!evaluate_record(&all_idle, &cfg()).get(Indicator::ArusHilang));
    }

    #[test]
    fn neutral_over_phase_uses_ratio_of_max_phase_current() {
        let diverted = healthy().with_current_n(3.0);
        assert!(evaluate_record(&diverted, &cfg()).get(Indicator::InMoreImax));

        let within_ratio = healthy().with_current_n(2.5);
        assert!(!evaluate_record(&within_ratio, &cfg()).get(Indicator::InMoreImax));
    }

    #[test]
    fn all_zero_currents_never_trigger_ratio_rules() {
        let record = MeterRecord::new("z").with_current([0.0, 0.0, 0.0]).with_current_n(4.0);
        let result = evaluate_record(&record, &cfg());
        assert!(!result.get(Indicator::UnbalanceI));
        assert!(!result.get(Indicator::InMoreImax));
    }

    #[test]
    fn overcurrent_and_reverse_power() {
        let heavy = healthy().with_current([6.0, 2.0, 2.0]);
        assert!(evaluate_record(&heavy, &cfg()).get(Indicator::OverCurrent));

        let reversed = healthy().with_active_power([-0.3, 0.4, 0.4]);
        let result = evaluate_record(&reversed, &cfg());
        assert!(result.get(Indicator::ReversePower));
        assert!(!result.get(Indicator::ReversePhase), "gate is off by default");
    }

    #[test]
    fn unbalance_flags_deviating_loaded_phase() {
        let unbalanced = healthy().with_current([4.0, 1.0, 1.0]);
        assert!(evaluate_record(&unbalanced, &cfg()).get(Indicator::UnbalanceI));

        let balanced = healthy().with_current([2.0, 2.5, 1.8]);
        assert!(!evaluate_record(&balanced, &cfg()).get(Indicator::UnbalanceI));
    }

    #[test]
    fn active_power_lost_excludes_full_outage() {
        let one_phase = healthy().with_active_power([0.0, 0.4, 0.4]);
        assert!(evaluate_record(&one_phase, &cfg()).get(Indicator::ActivePLost));

        let outage = healthy().with_active_power([0.0, 0.0, 0.0]);
        assert!(!evaluate_record(&outage, &cfg()).get(Indicator::ActivePLost));
    }

    #[test]
    fn digital_flags_and_day_night_power() {
        let mut record = healthy();
        record.active_power_day = -1.0;
        record.active_power_night = 3.0;
        record.current_loop = true;
        let result = evaluate_record(&record, &cfg());
        assert!(result.get(Indicator::ActivePowerNegativeSiang));
        assert!(!result.get(Indicator::ActivePowerNegativeMalam));
        assert!(result.get(Indicator::CurrentLoop));
        assert!(!result.get(Indicator::Freeze));
    }

    #[test]
    fn gated_rules_only_fire_when_their_gate_is_on() {
        let mut record = healthy().with_active_power([-0.3, 0.4, 0.4]).with_voltage([0.0, 230.0, 230.0]);
        record.kwh_import = 120.0;
        record.kwh_export = 80.0;

        let off = evaluate_record(&record, &cfg());
        assert!(!off.get(Indicator::ReversePhase));
        assert!(!off.get(Indicator::ImportGtExport));
        assert!(!off.get(Indicator::VLostAdaArus));

        let mut settings = ThresholdSettings::default();
        for gate in Gate::ALL {
            settings.set_gate(gate, true);
        }
        let on = evaluate_record(&record, &settings.build().unwrap());
        assert!(on.get(Indicator::ReversePhase));
        assert!(on.get(Indicator::ImportGtExport));
        assert!(on.get(Indicator::VLostAdaArus));
    }

    #[test]
    fn disabled_rules_stay_false() {
        let settings = ThresholdSettings {
            disabled: vec!["v_drop".to_string()],
            ..Default::default()
        };
        let record = MeterRecord::new("a").with_voltage([40.0, 0.0, 0.0]).with_current([1.0, 0.0, 0.0]);
        assert!(!evaluate_record(&record, &settings.build().unwrap()).get(Indicator::VDrop));
    }

    #[test]
    fn non_finite_readings_are_treated_as_zero() {
        let record = healthy().with_current([f64::NAN, f64::NAN, f64::NAN]).with_current_n(f64::INFINITY);
        let result = evaluate_record(&record, &cfg());
        assert!(!result.get(Indicator::UnbalanceI));
        assert!(!result.get(Indicator::InMoreImax));
        assert!(!result.get(Indicator::OverCurrent));
    }
}
