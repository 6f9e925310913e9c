//! Observed daily records and the validated record set.
//!
//! Records come from an external supplier and are read-only to the engine.
//! A [`RecordSet`] guarantees:
//! - at least one record
//! - consecutive dates (no gaps, no duplicates)
//! - non-decreasing confirmed, recovered and fatal counts
//! - `confirmed = infected + recovered + fatal`
//! - `susceptible = population - confirmed`

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily compartment counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub confirmed: u64,
    pub infected: u64,
    pub recovered: u64,
    pub fatal: u64,
    pub susceptible: u64,
}

impl Record {
    /// Build a record from cumulative counts, deriving infected and susceptible.
    pub fn from_cumulative(
        date: NaiveDate,
        confirmed: u64,
        recovered: u64,
        fatal: u64,
        population: u64,
    ) -> Result<Self> {
        let closed = recovered
            .checked_add(fatal)
            .filter(|closed| *closed <= confirmed)
            .ok_or_else(|| {
                Error::InvalidRecords(format!(
                    "{date}: recovered ({recovered}) + fatal ({fatal}) exceeds confirmed ({confirmed})"
                ))
            })?;
        if confirmed > population {
            return Err(Error::InvalidRecords(format!(
                "{date}: confirmed ({confirmed}) exceeds population ({population})"
            )));
        }
        Ok(Record {
            date,
            confirmed,
            infected: confirmed - closed,
            recovered,
            fatal,
            susceptible: population - confirmed,
        })
    }
}

/// Wire format used by record suppliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSupply {
    pub population: u64,
    pub records: Vec<Record>,
}

/// Validated, date-ordered records sharing one population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSet {
    population: u64,
    records: Vec<Record>,
}

impl RecordSet {
    /// Validate and wrap a record sequence.
    pub fn new(records: Vec<Record>, population: u64) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::InsufficientRecords {
                context: "record set".to_string(),
                needed: 1,
                available: 0,
            });
        }
        if population == 0 {
            return Err(Error::InvalidRecords("population must be positive".to_string()));
        }

        for record in &records {
            check_identity(record, population)?;
        }

        for pair in records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if prev.date.succ_opt() != Some(next.date) {
                return Err(Error::InvalidRecords(format!(
                    "dates must be consecutive: {} is followed by {}",
                    prev.date, next.date
                )));
            }
            for (field, before, after) in [
                ("confirmed", prev.confirmed, next.confirmed),
                ("recovered", prev.recovered, next.recovered),
                ("fatal", prev.fatal, next.fatal),
            ] {
                if after < before {
                    return Err(Error::InvalidRecords(format!(
                        "{field} decreased from {before} to {after} on {}",
                        next.date
                    )));
                }
            }
        }

        Ok(RecordSet {
            population,
            records,
        })
    }

    /// Validate records delivered in the supplier wire format.
    pub fn from_supply(supply: RecordSupply) -> Result<Self> {
        Self::new(supply.records, supply.population)
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false: a record set holds at least one record.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    /// Position of `date` within the record sequence.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if date < self.first_date() || date > self.last_date() {
            return None;
        }
        usize::try_from((date - self.first_date()).num_days()).ok()
    }

    /// Record observed on `date`.
    pub fn get(&self, date: NaiveDate) -> Option<&Record> {
        self.index_of(date).map(|idx| &self.records[idx])
    }

    /// Records between `start` and `end`, both inclusive.
    ///
    /// Fails when the range is inverted or not fully covered by records.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Result<&[Record]> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }
        let (Some(from), Some(to)) = (self.index_of(start), self.index_of(end)) else {
            return Err(Error::InvalidDateRange(format!(
                "{start}..={end} is outside the records ({}..={})",
                self.first_date(),
                self.last_date()
            )));
        };
        Ok(&self.records[from..=to])
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} confirmed={} infected={} recovered={} fatal={} susceptible={}",
            self.date, self.confirmed, self.infected, self.recovered, self.fatal, self.susceptible
        )
    }
}

fn check_identity(record: &Record, population: u64) -> Result<()> {
    let closed = record.infected as u128 + record.recovered as u128 + record.fatal as u128;
    if closed != record.confirmed as u128 {
        return Err(Error::InvalidRecords(format!(
            "{}: infected + recovered + fatal ({closed}) does not equal confirmed ({})",
            record.date, record.confirmed
        )));
    }
    if record.confirmed > population
        || record.susceptible != population - record.confirmed
    {
        return Err(Error::InvalidRecords(format!(
            "{}: susceptible ({}) must equal population ({population}) - confirmed ({})",
            record.date, record.susceptible, record.confirmed
        )));
    }
    Ok(())
}
