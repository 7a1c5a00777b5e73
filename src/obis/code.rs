//! OBIS codes, interface classes, and engineering units.
//!
//! An OBIS code is a six-byte tuple `(A, B, C, D, E, F)`: A selects the
//! medium (1 = electricity), B the channel, C the physical quantity, D the
//! measurement type, E the tariff rate, and F the billing period.

use std::fmt;

/// Six-byte OBIS identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObisCode(pub [u8; 6]);

impl ObisCode {
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        ObisCode([a, b, c, d, e, f])
    }

    pub const fn bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for ObisCode {
    /// Renders the reduced OBIS notation, e.g. `1-0:1.8.0*255`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, ff] = self.0;
        write!(f, "{a}-{b}:{c}.{d}.{e}*{ff}")
    }
}

/// COSEM interface classes used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceClass {
    /// Class 1: untyped data (identification strings, configuration).
    Data,
    /// Class 3: register with value and scaler/unit attributes.
    Register,
    /// Class 4: extended register, adds a capture-time attribute.
    ExtendedRegister,
}

impl InterfaceClass {
    /// Class id as carried in the GET request (u16, big-endian on the wire).
    pub const fn id(self) -> u16 {
        match self {
            InterfaceClass::Data => 1,
            InterfaceClass::Register => 3,
            InterfaceClass::ExtendedRegister => 4,
        }
    }

    /// Whether objects of this class carry a scaler/unit attribute.
    pub const fn has_scaler(self) -> bool {
        matches!(
            self,
            InterfaceClass::Register | InterfaceClass::ExtendedRegister
        )
    }

    /// Whether objects of this class carry a capture-time attribute.
    pub const fn has_capture_time(self) -> bool {
        matches!(self, InterfaceClass::ExtendedRegister)
    }
}

/// Engineering unit attached to a catalogue entry.
///
/// The energy units are the customary billing units (kWh rather than Wh);
/// meters report the corresponding base unit in their scaler/unit
/// structure, which `accepts_dlms_code` treats as a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    KilowattHour,
    KilovoltAmpereHour,
    KilovarHour,
    Kilowatt,
    KilovoltAmpere,
    Volt,
    Ampere,
    Hertz,
    None,
}

impl Unit {
    pub const fn label(self) -> &'static str {
        match self {
            Unit::KilowattHour => "kWh",
            Unit::KilovoltAmpereHour => "kVAh",
            Unit::KilovarHour => "kVArh",
            Unit::Kilowatt => "kW",
            Unit::KilovoltAmpere => "kVA",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Hertz => "Hz",
            Unit::None => "",
        }
    }

    /// Checks a DLMS unit enumeration (Blue Book table) against this unit.
    ///
    /// Unit code 255 means "no unit" and is accepted everywhere; a handful
    /// of meters use it for power factor and identification objects.
    pub fn accepts_dlms_code(self, code: u8) -> bool {
        if code == 255 {
            return true;
        }
        match self {
            Unit::KilowattHour => code == 30,       // Wh
            Unit::KilovoltAmpereHour => code == 31, // VAh
            Unit::KilovarHour => code == 32,        // varh
            Unit::Kilowatt => code == 27,           // W
            Unit::KilovoltAmpere => code == 28,     // VA
            Unit::Volt => code == 35,
            Unit::Ampere => code == 33,
            Unit::Hertz => code == 44,
            Unit::None => true,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
