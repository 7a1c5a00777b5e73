//! Fixed catalogue of the registers this client reads.
//!
//! Codes follow IS 15959 / the DLMS Blue Book for three-phase energy
//! meters: cumulative energies on `C.8.0`, maximum demand on `C.6.0`,
//! instantaneous quantities on `C.7.0`, and tariff registers on `C.D.1`
//! through `C.D.8`.

use super::code::{InterfaceClass, ObisCode, Unit};

/// One catalogue entry: code plus display and decode metadata.
#[derive(Debug, Clone, Copy)]
pub struct ObisEntry {
    pub code: ObisCode,
    pub name: &'static str,
    pub unit: Unit,
    pub class: InterfaceClass,
}

impl ObisEntry {
    pub const fn new(
        code: ObisCode,
        name: &'static str,
        unit: Unit,
        class: InterfaceClass,
    ) -> Self {
        ObisEntry {
            code,
            name,
            unit,
            class,
        }
    }
}

// Meter identification

pub const METER_SERIAL_NUMBER: ObisEntry = ObisEntry::new(
    ObisCode::new(0, 0, 96, 1, 0, 255),
    "Serial Number",
    Unit::None,
    InterfaceClass::Data,
);
pub const METER_MANUFACTURER: ObisEntry = ObisEntry::new(
    ObisCode::new(0, 0, 96, 1, 1, 255),
    "Manufacturer",
    Unit::None,
    InterfaceClass::Data,
);
pub const METER_TYPE: ObisEntry = ObisEntry::new(
    ObisCode::new(0, 0, 96, 1, 2, 255),
    "Meter Type",
    Unit::None,
    InterfaceClass::Data,
);
pub const MULTIPLICATION_FACTOR: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 0, 4, 3, 255),
    "Multiplication Factor",
    Unit::None,
    InterfaceClass::Data,
);

// Cumulative energy

pub const KWH_IMPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 1, 8, 0, 255),
    "Active Energy Import",
    Unit::KilowattHour,
    InterfaceClass::Register,
);
pub const KWH_EXPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 2, 8, 0, 255),
    "Active Energy Export",
    Unit::KilowattHour,
    InterfaceClass::Register,
);
pub const KVAH_IMPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 9, 8, 0, 255),
    "Apparent Energy Import",
    Unit::KilovoltAmpereHour,
    InterfaceClass::Register,
);
pub const KVAH_EXPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 10, 8, 0, 255),
    "Apparent Energy Export",
    Unit::KilovoltAmpereHour,
    InterfaceClass::Register,
);
pub const KVARH_LAG: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 5, 8, 0, 255),
    "Reactive Energy Lag",
    Unit::KilovarHour,
    InterfaceClass::Register,
);
pub const KVARH_LEAD: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 8, 8, 0, 255),
    "Reactive Energy Lead",
    Unit::KilovarHour,
    InterfaceClass::Register,
);

// Maximum demand, with occurrence time (extended registers)

pub const MD_KW_IMPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 1, 6, 0, 255),
    "MD Active Import",
    Unit::Kilowatt,
    InterfaceClass::ExtendedRegister,
);
pub const MD_KW_EXPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 2, 6, 0, 255),
    "MD Active Export",
    Unit::Kilowatt,
    InterfaceClass::ExtendedRegister,
);
pub const MD_KVA_IMPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 9, 6, 0, 255),
    "MD Apparent Import",
    Unit::KilovoltAmpere,
    InterfaceClass::ExtendedRegister,
);
pub const MD_KVA_EXPORT: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 10, 6, 0, 255),
    "MD Apparent Export",
    Unit::KilovoltAmpere,
    InterfaceClass::ExtendedRegister,
);

// Instantaneous values

pub const VOLTAGE_R: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 32, 7, 0, 255),
    "Voltage Phase R",
    Unit::Volt,
    InterfaceClass::Register,
);
pub const VOLTAGE_Y: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 52, 7, 0, 255),
    "Voltage Phase Y",
    Unit::Volt,
    InterfaceClass::Register,
);
pub const VOLTAGE_B: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 72, 7, 0, 255),
    "Voltage Phase B",
    Unit::Volt,
    InterfaceClass::Register,
);
pub const CURRENT_R: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 31, 7, 0, 255),
    "Current Phase R",
    Unit::Ampere,
    InterfaceClass::Register,
);
pub const CURRENT_Y: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 51, 7, 0, 255),
    "Current Phase Y",
    Unit::Ampere,
    InterfaceClass::Register,
);
pub const CURRENT_B: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 71, 7, 0, 255),
    "Current Phase B",
    Unit::Ampere,
    InterfaceClass::Register,
);
pub const CURRENT_NEUTRAL: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 91, 7, 0, 255),
    "Current Neutral",
    Unit::Ampere,
    InterfaceClass::Register,
);
pub const POWER_FACTOR: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 13, 7, 0, 255),
    "Power Factor",
    Unit::None,
    InterfaceClass::Register,
);
pub const FREQUENCY: ObisEntry = ObisEntry::new(
    ObisCode::new(1, 0, 14, 7, 0, 255),
    "Frequency",
    Unit::Hertz,
    InterfaceClass::Register,
);

// Time-of-day tariff registers, rates 1 through 8

pub const KWH_IMPORT_RATES: [ObisEntry; 8] = [
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 1, 255), "kWh Import Rate 1", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 2, 255), "kWh Import Rate 2", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 3, 255), "kWh Import Rate 3", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 4, 255), "kWh Import Rate 4", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 5, 255), "kWh Import Rate 5", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 6, 255), "kWh Import Rate 6", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 7, 255), "kWh Import Rate 7", Unit::KilowattHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 1, 8, 8, 255), "kWh Import Rate 8", Unit::KilowattHour, InterfaceClass::Register),
];

pub const KVAH_IMPORT_RATES: [ObisEntry; 8] = [
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 1, 255), "kVAh Import Rate 1", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 2, 255), "kVAh Import Rate 2", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 3, 255), "kVAh Import Rate 3", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 4, 255), "kVAh Import Rate 4", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 5, 255), "kVAh Import Rate 5", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 6, 255), "kVAh Import Rate 6", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 7, 255), "kVAh Import Rate 7", Unit::KilovoltAmpereHour, InterfaceClass::Register),
    ObisEntry::new(ObisCode::new(1, 0, 9, 8, 8, 255), "kVAh Import Rate 8", Unit::KilovoltAmpereHour, InterfaceClass::Register),
];

pub const MD_KW_IMPORT_RATES: [ObisEntry; 8] = [
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 1, 255), "MD kW Import Rate 1", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 2, 255), "MD kW Import Rate 2", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 3, 255), "MD kW Import Rate 3", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 4, 255), "MD kW Import Rate 4", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 5, 255), "MD kW Import Rate 5", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 6, 255), "MD kW Import Rate 6", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 7, 255), "MD kW Import Rate 7", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 1, 6, 8, 255), "MD kW Import Rate 8", Unit::Kilowatt, InterfaceClass::ExtendedRegister),
];

pub const MD_KVA_IMPORT_RATES: [ObisEntry; 8] = [
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 1, 255), "MD kVA Import Rate 1", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 2, 255), "MD kVA Import Rate 2", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 3, 255), "MD kVA Import Rate 3", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 4, 255), "MD kVA Import Rate 4", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 5, 255), "MD kVA Import Rate 5", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 6, 255), "MD kVA Import Rate 6", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 7, 255), "MD kVA Import Rate 7", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
    ObisEntry::new(ObisCode::new(1, 0, 9, 6, 8, 255), "MD kVA Import Rate 8", Unit::KilovoltAmpere, InterfaceClass::ExtendedRegister),
];
