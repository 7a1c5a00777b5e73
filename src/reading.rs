//! The meter reading record produced by one read cycle.

use crate::constants::TOD_ZONES;
use crate::cosem::axdr::DateTime;
use crate::obis::Unit;
use chrono::NaiveDateTime;
use std::fmt;

/// A scaled numeric value that carries its engineering unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub const fn zero(unit: Unit) -> Self {
        Measurement { value: 0.0, unit }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit == Unit::None {
            write!(f, "{:.3}", self.value)
        } else {
            write!(f, "{:.3} {}", self.value, self.unit)
        }
    }
}

/// Maximum demand: the peak value and when it occurred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaximumDemand {
    pub value: Measurement,
    pub capture_time: Option<DateTime>,
}

impl MaximumDemand {
    pub const fn cleared(unit: Unit) -> Self {
        MaximumDemand {
            value: Measurement::zero(unit),
            capture_time: None,
        }
    }
}

/// One time-of-day billing zone: energies plus their demand peaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TodZone {
    pub kwh: Measurement,
    pub kvah: Measurement,
    pub md_kw: MaximumDemand,
    pub md_kva: MaximumDemand,
}

impl TodZone {
    pub const fn cleared() -> Self {
        TodZone {
            kwh: Measurement::zero(Unit::KilowattHour),
            kvah: Measurement::zero(Unit::KilovoltAmpereHour),
            md_kw: MaximumDemand::cleared(Unit::Kilowatt),
            md_kva: MaximumDemand::cleared(Unit::KilovoltAmpere),
        }
    }
}

impl Default for TodZone {
    fn default() -> Self {
        Self::cleared()
    }
}

/// Everything one read cycle extracts from the meter.
///
/// Created by the reading assembler, mutated only during its session, and
/// handed to the caller whole; a failed session never leaks a partial
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    // Identification
    pub serial_number: String,
    pub manufacturer: String,
    pub meter_type: String,
    pub multiplication_factor: f64,

    // Cumulative energy
    pub kwh_import: Measurement,
    pub kwh_export: Measurement,
    pub kvah_import: Measurement,
    pub kvah_export: Measurement,
    pub kvarh_lag: Measurement,
    pub kvarh_lead: Measurement,

    // Maximum demand
    pub md_kw_import: MaximumDemand,
    pub md_kw_export: MaximumDemand,
    pub md_kva_import: MaximumDemand,
    pub md_kva_export: MaximumDemand,

    // Instantaneous
    pub voltage_r: Measurement,
    pub voltage_y: Measurement,
    pub voltage_b: Measurement,
    pub current_r: Measurement,
    pub current_y: Measurement,
    pub current_b: Measurement,
    pub current_neutral: Measurement,
    pub power_factor: Measurement,
    pub frequency: Measurement,

    // Tariff
    pub tod_zones: [TodZone; TOD_ZONES],

    // Metadata
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub error_count: u32,
}

impl MeterReading {
    /// A cleared draft stamped with the cycle start time.
    pub fn new(timestamp: NaiveDateTime) -> Self {
        MeterReading {
            serial_number: String::new(),
            manufacturer: String::new(),
            meter_type: String::new(),
            multiplication_factor: 1.0,
            kwh_import: Measurement::zero(Unit::KilowattHour),
            kwh_export: Measurement::zero(Unit::KilowattHour),
            kvah_import: Measurement::zero(Unit::KilovoltAmpereHour),
            kvah_export: Measurement::zero(Unit::KilovoltAmpereHour),
            kvarh_lag: Measurement::zero(Unit::KilovarHour),
            kvarh_lead: Measurement::zero(Unit::KilovarHour),
            md_kw_import: MaximumDemand::cleared(Unit::Kilowatt),
            md_kw_export: MaximumDemand::cleared(Unit::Kilowatt),
            md_kva_import: MaximumDemand::cleared(Unit::KilovoltAmpere),
            md_kva_export: MaximumDemand::cleared(Unit::KilovoltAmpere),
            voltage_r: Measurement::zero(Unit::Volt),
            voltage_y: Measurement::zero(Unit::Volt),
            voltage_b: Measurement::zero(Unit::Volt),
            current_r: Measurement::zero(Unit::Ampere),
            current_y: Measurement::zero(Unit::Ampere),
            current_b: Measurement::zero(Unit::Ampere),
            current_neutral: Measurement::zero(Unit::Ampere),
            power_factor: Measurement::zero(Unit::None),
            frequency: Measurement::zero(Unit::Hertz),
            tod_zones: [TodZone::cleared(); TOD_ZONES],
            timestamp,
            valid: false,
            error_count: 0,
        }
    }

    /// True when at least one cumulative energy register decoded nonzero.
    pub fn has_energy(&self) -> bool {
        [
            &self.kwh_import,
            &self.kwh_export,
            &self.kvah_import,
            &self.kvah_export,
            &self.kvarh_lag,
            &self.kvarh_lead,
        ]
        .iter()
        .any(|m| !m.is_zero())
    }
}

impl fmt::Display for MeterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Meter {} ({}) at {}",
            self.serial_number, self.manufacturer, self.timestamp
        )?;
        writeln!(f, "  kWh import:  {}", self.kwh_import)?;
        writeln!(f, "  kWh export:  {}", self.kwh_export)?;
        writeln!(f, "  kVAh import: {}", self.kvah_import)?;
        writeln!(f, "  kVArh lag:   {}", self.kvarh_lag)?;
        write!(f, "  MD kW import: {}", self.md_kw_import.value)?;
        if let Some(at) = self.md_kw_import.capture_time {
            write!(f, " at {at}")?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "  V: {} / {} / {}",
            self.voltage_r, self.voltage_y, self.voltage_b
        )?;
        writeln!(
            f,
            "  I: {} / {} / {} (N {})",
            self.current_r, self.current_y, self.current_b, self.current_neutral
        )?;
        writeln!(f, "  PF {} @ {}", self.power_factor, self.frequency)?;
        write!(
            f,
            "  valid: {}, errors: {}",
            self.valid, self.error_count
        )
    }
}
