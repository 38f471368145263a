use std::{fmt, str::FromStr};

/// A named boolean anomaly rule evaluated per meter record.
///
/// Declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Indicator {
    VDrop,
    VLost,
    OverVoltage,
    CosPhiKecil,
    ArusHilang,
    InMoreImax,
    OverCurrent,
    ReversePower,
    UnbalanceI,
    ActivePLost,
    ActivePowerNegativeSiang,
    ActivePowerNegativeMalam,
    CurrentLoop,
    Freeze,
    ReversePhase,
    ImportGtExport,
    VLostAdaArus,
}

/// Switches that must be turned on before their indicator is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// K-L (current terminal) reversal detection.
    KlTerbalik,
    ImpGtExp,
    VLostAdaArus,
}

impl Gate {
    pub const ALL: [Gate; 3] = [Gate::KlTerbalik, Gate::ImpGtExp, Gate::VLostAdaArus];

    pub const fn key(self) -> &'static str {
        match self {
            Gate::KlTerbalik => "kl_terbalik",
            Gate::ImpGtExp => "imp_gt_exp",
            Gate::VLostAdaArus => "v_lost_ada_arus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown indicator '{0}'")]
pub struct UnknownIndicator(pub String);

impl Indicator {
    pub const COUNT: usize = 17;

    pub const ALL: [Indicator; Indicator::COUNT] = [
        Indicator::VDrop,
        Indicator::VLost,
        Indicator::OverVoltage,
        Indicator::CosPhiKecil,
        Indicator::ArusHilang,
        Indicator::InMoreImax,
        Indicator::OverCurrent,
        Indicator::ReversePower,
        Indicator::UnbalanceI,
        Indicator::ActivePLost,
        Indicator::ActivePowerNegativeSiang,
        Indicator::ActivePowerNegativeMalam,
        Indicator::CurrentLoop,
        Indicator::Freeze,
        Indicator::ReversePhase,
        Indicator::ImportGtExport,
        Indicator::VLostAdaArus,
    ];

    /// Output column name.
    pub const fn column(self) -> &'static str {
        match self {
            Indicator::VDrop => "v_drop",
            Indicator::VLost => "v_lost",
            Indicator::OverVoltage => "over_voltage",
            Indicator::CosPhiKecil => "cos_phi_kecil",
            Indicator::ArusHilang => "arus_hilang",
            Indicator::InMoreImax => "in_more_Imax",
            Indicator::OverCurrent => "over_current",
            Indicator::ReversePower => "reverse_power",
            Indicator::UnbalanceI => "unbalance_I",
            Indicator::ActivePLost => "active_p_lost",
            Indicator::ActivePowerNegativeSiang => "active_power_negative_siang",
            Indicator::ActivePowerNegativeMalam => "active_power_negative_malam",
            Indicator::CurrentLoop => "current_loop",
            Indicator::Freeze => "freeze",
            Indicator::ReversePhase => "reverse_phase",
            Indicator::ImportGtExport => "import_gt_export",
            Indicator::VLostAdaArus => "v_lost_ada_arus",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The gate this indicator waits on, if any.
    pub const fn gate(self) -> Option<Gate> {
        match self {
            Indicator::ReversePhase => Some(Gate::KlTerbalik),
            Indicator::ImportGtExport => Some(Gate::ImpGtExp),
            Indicator::VLostAdaArus => Some(Gate::VLostAdaArus),
            _ => None,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Indicator {
    type Err = UnknownIndicator;

    /// Column names match case-insensitively (`in_more_imax` is accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Indicator::ALL
            .into_iter()
            .find(|i| i.column().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownIndicator(s.to_string()))
    }
}

/// Per-record indicator outcomes, one slot per catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct IndicatorResult {
    flags: [bool; Indicator::COUNT],
}

impl IndicatorResult {
    pub fn get(&self, indicator: Indicator) -> bool {
        self.flags[indicator.index()]
    }

    pub fn set(&mut self, indicator: Indicator, raised: bool) {
        self.flags[indicator.index()] = raised;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Indicator, bool)> + '_ {
        Indicator::ALL.into_iter().map(|i| (i, self.get(i)))
    }

    /// Indicators that came out true.
    pub fn raised(&self) -> impl Iterator<Item = Indicator> + '_ {
        self.iter().filter_map(|(i, raised)| raised.then_some(i))
    }

    pub fn count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

impl FromIterator<Indicator> for IndicatorResult {
    fn from_iter<T: IntoIterator<Item = Indicator>>(iter: T) -> Self {
        let mut result = IndicatorResult::default();
        for indicator in iter {
            result.set(indicator, true);
        }
        result
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for IndicatorResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(Indicator::COUNT))?;
        for (indicator, raised) in self.iter() {
            map.serialize_entry(indicator.column(), &raised)?;
        }
        map.end()
    }
}
