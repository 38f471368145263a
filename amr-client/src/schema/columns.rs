//! Fixed column names of the AMR export spreadsheet.

pub const IDPEL: &str = "IDPEL";
pub const LOCATION_CODE: &str = "LOCATION_CODE";
pub const NAMA: &str = "NAMA";
pub const TARIF: &str = "TARIF";
pub const DAYA: &str = "DAYA";
pub const NAMAUP: &str = "NAMAUP";
pub const GARDU: &str = "GARDU";

pub const VOLTAGE: [&str; 3] = ["VOLTAGE_L1", "VOLTAGE_L2", "VOLTAGE_L3"];
pub const CURRENT: [&str; 3] = ["CURRENT_L1", "CURRENT_L2", "CURRENT_L3"];
pub const CURRENT_N: &str = "CURRENT_N";
pub const ACTIVE_POWER: [&str; 3] = ["ACTIVE_POWER_L1", "ACTIVE_POWER_L2", "ACTIVE_POWER_L3"];
pub const POWER_FACTOR: [&str; 3] = ["POWER_FACTOR_L1", "POWER_FACTOR_L2", "POWER_FACTOR_L3"];
pub const ACTIVE_POWER_SIANG: &str = "ACTIVE_POWER_SIANG";
pub const ACTIVE_POWER_MALAM: &str = "ACTIVE_POWER_MALAM";
pub const KWH_IMP: &str = "KWH_IMP";
pub const KWH_EXP: &str = "KWH_EXP";
pub const CURRENT_LOOP: &str = "CURRENT_LOOP";
pub const FREEZE: &str = "FREEZE";

/// Identifier columns in order of preference.
pub const IDENTIFIER: [&str; 2] = [IDPEL, LOCATION_CODE];

/// Descriptive columns carried through to the output table.
pub const DESCRIPTIVE: [&str; 6] = [IDPEL, NAMA, TARIF, DAYA, NAMAUP, GARDU];

/// Numeric columns read by the indicator catalog.
pub const NUMERIC: [&str; 17] = [
    VOLTAGE[0],
    VOLTAGE[1],
    VOLTAGE[2],
    CURRENT[0],
    CURRENT[1],
    CURRENT[2],
    CURRENT_N,
    ACTIVE_POWER[0],
    ACTIVE_POWER[1],
    ACTIVE_POWER[2],
    POWER_FACTOR[0],
    POWER_FACTOR[1],
    POWER_FACTOR[2],
    ACTIVE_POWER_SIANG,
    ACTIVE_POWER_MALAM,
    KWH_IMP,
    KWH_EXP,
];

pub const FLAGS: [&str; 2] = [CURRENT_LOOP, FREEZE];
