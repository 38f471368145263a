/// One row of AMR readings for a single customer meter.
///
/// Phase arrays are indexed L1, L2, L3. Absent readings are already filled
/// with 0 (numeric) or `false` (flags) by the time a record exists.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MeterRecord {
    /// `IDPEL` (customer id), or `LOCATION_CODE` when no IDPEL column exists.
    pub id: String,
    pub name: Option<String>,
    pub tariff: Option<String>,
    /// Contracted power (`DAYA`), kept verbatim.
    pub power_class: Option<String>,
    /// Service unit (`NAMAUP`).
    pub unit: Option<String>,
    pub substation: Option<String>,
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

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl MeterRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_voltage(mut self, voltage: [f64; 3]) -> Self {
        self.voltage = voltage;
        self
    }

    pub fn with_current(mut self, current: [f64; 3]) -> Self {
        self.current = current;
        self
    }

    pub fn with_current_n(mut self, current_n: f64) -> Self {
        self.current_n = current_n;
        self
    }

    pub fn with_active_power(mut self, active_power: [f64; 3]) -> Self {
        self.active_power = active_power;
        self
    }

    pub fn with_power_factor(mut self, power_factor: [f64; 3]) -> Self {
        self.power_factor = power_factor;
        self
    }

    /// Number of numeric readings that are NaN or infinite.
    pub fn non_finite_count(&self) -> usize {
        self.numeric_values().filter(|v| !v.is_finite()).count()
    }

    /// Copy with every non-finite numeric reading replaced by 0 and the
    /// identifier trimmed.
    pub fn normalized(&self) -> Self {
        let phases = |a: [f64; 3]| a.map(finite_or_zero);
        Self {
            id: self.id.trim().to_string(),
            name: self.name.clone(),
            tariff: self.tariff.clone(),
            power_class: self.power_class.clone(),
            unit: self.unit.clone(),
            substation: self.substation.clone(),
            voltage: phases(self.voltage),
            current: phases(self.current),
            current_n: finite_or_zero(self.current_n),
            active_power: phases(self.active_power),
            power_factor: phases(self.power_factor),
            active_power_day: finite_or_zero(self.active_power_day),
            active_power_night: finite_or_zero(self.active_power_night),
            kwh_import: finite_or_zero(self.kwh_import),
            kwh_export: finite_or_zero(self.kwh_export),
            current_loop: self.current_loop,
            freeze: self.freeze,
        }
    }

    fn numeric_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.voltage
            .iter()
            .chain(&self.current)
            .chain(&self.active_power)
            .chain(&self.power_factor)
            .copied()
            .chain([
                self.current_n,
                self.active_power_day,
                self.active_power_night,
                self.kwh_import,
                self.kwh_export,
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_replaces_non_finite_readings() {
        let mut record = MeterRecord::new("  5123 ")
            .with_voltage([f64::NAN, 220.0, f64::INFINITY])
            .with_current_n(f64::NEG_INFINITY);
        record.kwh_export = f64::NAN;
        assert_eq!(record.non_finite_count(), 4);

        let n = record.normalized();
        assert_eq!(n.id, "5123");
        assert_eq!(n.voltage, [0.0, 220.0, 0.0]);
        assert_eq!(n.current_n, 0.0);
        assert_eq!(n.kwh_export, 0.0);
        assert_eq!(n.non_finite_count(), 0);
    }

    #[test]
    fn normalized_keeps_finite_record_unchanged() {
        let record = MeterRecord::new("1")
            .with_voltage([230.0, 231.0, 229.5])
            .with_current([1.0, 2.0, 3.0])
            .with_power_factor([0.9, 0.95, 0.99]);
        assert_eq!(record.normalized(), record);
    }
}
