//! The reading assembler: drives one session and populates a
//! [`MeterReading`].
//!
//! Registers are read in a fixed order so wire traces are reproducible
//! across runs. A failed identification round aborts the cycle; any other
//! single-register failure is counted and the cycle continues. The session
//! budget, when configured, is checked before every transaction.

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::cosem::session::Session;
use crate::error::DlmsError;
use crate::hdlc::serial::MeterPort;
use crate::obis::catalogue;
use crate::obis::ObisEntry;
use crate::reading::{MaximumDemand, Measurement, MeterReading};
use log::{info, warn};
use tokio::time::Instant;

/// One-meter reading driver.
pub struct MeterReader<P: MeterPort, C: Clock> {
    session: Session<P>,
    clock: C,
}

impl<P: MeterPort, C: Clock> MeterReader<P, C> {
    pub fn new(port: P, config: ClientConfig, clock: C) -> Self {
        MeterReader {
            session: Session::new(port, config),
            clock,
        }
    }

    pub fn session(&self) -> &Session<P> {
        &self.session
    }

    /// Runs one complete read cycle.
    ///
    /// Returns the populated reading, or a session-level error when the
    /// handshake, the identification round, or the session budget fails.
    /// The draft reading of a failed cycle is discarded.
    pub async fn read_cycle(&mut self) -> Result<MeterReading, DlmsError> {
        let mut reading = MeterReading::new(self.clock.now());
        let deadline = self
            .session
            .config()
            .session_budget
            .map(|budget| Instant::now() + budget);

        self.session.connect().await?;

        if let Err(e) = self.read_identification(&mut reading, deadline).await {
            let _ = self.session.disconnect().await;
            return Err(e);
        }

        let result = self.read_registers(&mut reading, deadline).await;
        let _ = self.session.disconnect().await;
        result?;

        reading.valid = reading.has_energy();
        info!(
            "read cycle complete: serial {}, {} errors",
            reading.serial_number, reading.error_count
        );
        Ok(reading)
    }

    /// Serial number and manufacturer are required; meter type and the
    /// multiplication factor only add to the error count when missing.
    async fn read_identification(
        &mut self,
        reading: &mut MeterReading,
        deadline: Option<Instant>,
    ) -> Result<(), DlmsError> {
        ensure_budget(deadline)?;
        let serial = self.session.read_string(&catalogue::METER_SERIAL_NUMBER).await;
        ensure_budget(deadline)?;
        let manufacturer = self.session.read_string(&catalogue::METER_MANUFACTURER).await;

        match (serial, manufacturer) {
            (Ok(serial), Ok(manufacturer)) => {
                reading.serial_number = serial;
                reading.manufacturer = manufacturer;
            }
            (serial, manufacturer) => {
                for result in [&serial, &manufacturer] {
                    if let Err(e) = result {
                        warn!("identification: {e}");
                    }
                }
                return Err(DlmsError::IdentificationFailed);
            }
        }

        ensure_budget(deadline)?;
        match self.session.read_string(&catalogue::METER_TYPE).await {
            Ok(meter_type) => reading.meter_type = meter_type,
            Err(e) => record(&mut reading.error_count, &e),
        }

        ensure_budget(deadline)?;
        match self.session.read_register(&catalogue::MULTIPLICATION_FACTOR).await {
            Ok(value) => reading.multiplication_factor = value.engineering,
            Err(e) => record(&mut reading.error_count, &e),
        }

        Ok(())
    }

    async fn read_registers(
        &mut self,
        reading: &mut MeterReading,
        deadline: Option<Instant>,
    ) -> Result<(), DlmsError> {
        // Cumulative energy
        self.read_into(&catalogue::KWH_IMPORT, &mut reading.kwh_import, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::KWH_EXPORT, &mut reading.kwh_export, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::KVAH_IMPORT, &mut reading.kvah_import, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::KVAH_EXPORT, &mut reading.kvah_export, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::KVARH_LAG, &mut reading.kvarh_lag, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::KVARH_LEAD, &mut reading.kvarh_lead, &mut reading.error_count, deadline).await?;

        // Maximum demand
        self.read_demand(&catalogue::MD_KW_IMPORT, &mut reading.md_kw_import, &mut reading.error_count, deadline).await?;
        self.read_demand(&catalogue::MD_KW_EXPORT, &mut reading.md_kw_export, &mut reading.error_count, deadline).await?;
        self.read_demand(&catalogue::MD_KVA_IMPORT, &mut reading.md_kva_import, &mut reading.error_count, deadline).await?;
        self.read_demand(&catalogue::MD_KVA_EXPORT, &mut reading.md_kva_export, &mut reading.error_count, deadline).await?;

        // Instantaneous
        self.read_into(&catalogue::VOLTAGE_R, &mut reading.voltage_r, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::VOLTAGE_Y, &mut reading.voltage_y, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::VOLTAGE_B, &mut reading.voltage_b, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::CURRENT_R, &mut reading.current_r, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::CURRENT_Y, &mut reading.current_y, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::CURRENT_B, &mut reading.current_b, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::CURRENT_NEUTRAL, &mut reading.current_neutral, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::POWER_FACTOR, &mut reading.power_factor, &mut reading.error_count, deadline).await?;
        self.read_into(&catalogue::FREQUENCY, &mut reading.frequency, &mut reading.error_count, deadline).await?;

        // Time-of-day zones
        let zones = (self.session.config().read_tod_zones as usize).min(reading.tod_zones.len());
        let errors = &mut reading.error_count;
        for (zone, slot) in reading.tod_zones.iter_mut().take(zones).enumerate() {
            self.read_into(&catalogue::KWH_IMPORT_RATES[zone], &mut slot.kwh, errors, deadline).await?;
            self.read_into(&catalogue::KVAH_IMPORT_RATES[zone], &mut slot.kvah, errors, deadline).await?;
            self.read_demand(&catalogue::MD_KW_IMPORT_RATES[zone], &mut slot.md_kw, errors, deadline).await?;
            self.read_demand(&catalogue::MD_KVA_IMPORT_RATES[zone], &mut slot.md_kva, errors, deadline).await?;
        }

        Ok(())
    }

    /// Reads one numeric register into its slot. Register failures are
    /// recorded; only an exhausted session budget aborts the cycle.
    async fn read_into(
        &mut self,
        entry: &ObisEntry,
        slot: &mut Measurement,
        errors: &mut u32,
        deadline: Option<Instant>,
    ) -> Result<(), DlmsError> {
        ensure_budget(deadline)?;
        match self.session.read_register(entry).await {
            Ok(value) => slot.value = value.engineering,
            Err(e) => record(errors, &e),
        }
        Ok(())
    }

    async fn read_demand(
        &mut self,
        entry: &ObisEntry,
        slot: &mut MaximumDemand,
        errors: &mut u32,
        deadline: Option<Instant>,
    ) -> Result<(), DlmsError> {
        ensure_budget(deadline)?;
        match self.session.read_register(entry).await {
            Ok(value) => {
                slot.value.value = value.engineering;
                slot.capture_time = value.capture_time;
            }
            Err(e) => record(errors, &e),
        }
        Ok(())
    }
}

fn ensure_budget(deadline: Option<Instant>) -> Result<(), DlmsError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(DlmsError::SessionBudgetExceeded),
        _ => Ok(()),
    }
}

fn record(errors: &mut u32, error: &DlmsError) {
    warn!("{error}");
    *errors += 1;
}
