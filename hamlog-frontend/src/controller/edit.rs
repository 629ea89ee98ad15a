//! Edit form state and the batch update protocol.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::future::join_all;
use thiserror::Error;

use hamlog_common::datetime::{parse_record_date, parse_record_time, truncate_to_minute, DATE_WIRE_FORMAT, TIME_WIRE_FORMAT};
use hamlog_common::{QslStatus, Record, RecordId, UpdateFields, DEFAULT_MODE};

use crate::backend::{RecordSource, SourceError};

/// Reasons a form cannot be submitted. Checked before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Callsign is required")]
    MissingCallsign,
    #[error("Mode is required")]
    MissingMode,
    #[error("Frequency must be a number")]
    NonNumericFrequency,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),
    #[error("Invalid time '{0}', expected HH:MM")]
    Time(String),
    #[error("Invalid QSL status '{0}', expected not-sent, sent or eyeball")]
    QslStatus(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Callsign,
    Frequency,
    Mode,
    Equipment,
    Antenna,
    Power,
    Dxcc,
    Grid,
    Province,
    Band,
    QslCard,
    Notes,
    Date,
    Time,
}

impl FormField {
    pub const ALL: [FormField; 14] = [
        FormField::Date,
        FormField::Time,
        FormField::Callsign,
        FormField::Frequency,
        FormField::Mode,
        FormField::Equipment,
        FormField::Antenna,
        FormField::Power,
        FormField::Dxcc,
        FormField::Grid,
        FormField::Province,
        FormField::Band,
        FormField::QslCard,
        FormField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Callsign => "callsign",
            FormField::Frequency => "frequency",
            FormField::Mode => "mode",
            FormField::Equipment => "equipment",
            FormField::Antenna => "antenna",
            FormField::Power => "power",
            FormField::Dxcc => "dxcc",
            FormField::Grid => "grid",
            FormField::Province => "province",
            FormField::Band => "band",
            FormField::QslCard => "qsl",
            FormField::Notes => "notes",
            FormField::Date => "date",
            FormField::Time => "time",
        }
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "callsign" | "call" => Ok(FormField::Callsign),
            "frequency" | "freq" => Ok(FormField::Frequency),
            "mode" => Ok(FormField::Mode),
            "equipment" | "rig" => Ok(FormField::Equipment),
            "antenna" | "ant" => Ok(FormField::Antenna),
            "power" | "pwr" => Ok(FormField::Power),
            "dxcc" | "country" => Ok(FormField::Dxcc),
            "grid" => Ok(FormField::Grid),
            "province" => Ok(FormField::Province),
            "band" => Ok(FormField::Band),
            "qsl" | "qslcard" => Ok(FormField::QslCard),
            "notes" | "note" => Ok(FormField::Notes),
            "date" => Ok(FormField::Date),
            "time" => Ok(FormField::Time),
            _ => Err(format!("Unknown field: {}", s)),
        }
    }
}

/// Working copy of the editable fields.
///
/// Numbers are kept as typed text until submit so a bad frequency can be
/// reported instead of silently replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub callsign: String,
    pub frequency: String,
    pub mode: String,
    pub equipment: String,
    pub antenna: String,
    pub power: String,
    pub dxcc: String,
    pub grid: String,
    pub province: String,
    pub band: String,
    pub qslcard: QslStatus,
    pub notes: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl EditForm {
    /// The one place where missing record fields get their editing defaults:
    /// numbers become 0, text becomes empty, QSL becomes not-sent, mode
    /// becomes SSB and date/time become `now`. Seconds are dropped from the time.
    pub fn from_record(record: &Record, now: NaiveDateTime) -> Self {
        let date = record
            .date
            .as_deref()
            .and_then(parse_record_date)
            .unwrap_or_else(|| now.date());
        let time = record
            .time
            .as_deref()
            .and_then(parse_record_time)
            .or_else(|| truncate_to_minute(now.time()))
            .unwrap_or(NaiveTime::MIN);
        let mode = record
            .mode
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MODE);

        Self {
            callsign: text(&record.callsign),
            frequency: number(record.frequency),
            mode: mode.to_string(),
            equipment: text(&record.equipment),
            antenna: text(&record.antenna),
            power: number(record.power),
            dxcc: text(&record.dxcc),
            grid: text(&record.grid),
            province: text(&record.province),
            band: text(&record.band),
            qslcard: record.qsl_status().unwrap_or_default(),
            notes: text(&record.notes),
            date,
            time,
        }
    }

    pub fn get(&self, field: FormField) -> String {
        match field {
            FormField::Callsign => self.callsign.clone(),
            FormField::Frequency => self.frequency.clone(),
            FormField::Mode => self.mode.clone(),
            FormField::Equipment => self.equipment.clone(),
            FormField::Antenna => self.antenna.clone(),
            FormField::Power => self.power.clone(),
            FormField::Dxcc => self.dxcc.clone(),
            FormField::Grid => self.grid.clone(),
            FormField::Province => self.province.clone(),
            FormField::Band => self.band.clone(),
            FormField::QslCard => self.qslcard.as_str().to_string(),
            FormField::Notes => self.notes.clone(),
            FormField::Date => self.date.format(DATE_WIRE_FORMAT).to_string(),
            FormField::Time => self.time.format(TIME_WIRE_FORMAT).to_string(),
        }
    }

    pub fn set(&mut self, field: FormField, value: &str) -> Result<(), FieldError> {
        let value_owned = value.to_string();
        match field {
            FormField::Callsign => self.callsign = value_owned,
            FormField::Frequency => self.frequency = value_owned,
            FormField::Mode => self.mode = value_owned,
            FormField::Equipment => self.equipment = value_owned,
            FormField::Antenna => self.antenna = value_owned,
            FormField::Power => self.power = value_owned,
            FormField::Dxcc => self.dxcc = value_owned,
            FormField::Grid => self.grid = value_owned,
            FormField::Province => self.province = value_owned,
            FormField::Band => self.band = value_owned,
            FormField::QslCard => {
                self.qslcard = value
                    .parse()
                    .map_err(|_| FieldError::QslStatus(value_owned))?;
            }
            FormField::Notes => self.notes = value_owned,
            FormField::Date => {
                self.date = NaiveDate::parse_from_str(value.trim(), DATE_WIRE_FORMAT)
                    .map_err(|_| FieldError::Date(value_owned))?;
            }
            FormField::Time => {
                self.time = parse_record_time(value).ok_or(FieldError::Time(value_owned))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.parsed_frequency().map(|_| ())
    }

    fn parsed_frequency(&self) -> Result<f64, ValidationError> {
        if self.callsign.trim().is_empty() {
            return Err(ValidationError::MissingCallsign);
        }
        if self.mode.trim().is_empty() {
            return Err(ValidationError::MissingMode);
        }
        match self.frequency.trim().parse::<f64>() {
            Ok(freq) if freq.is_finite() => Ok(freq),
            _ => Err(ValidationError::NonNumericFrequency),
        }
    }

    /// Validated payload sent to every target. Text is trimmed; a power that
    /// is not a number is sent as 0.
    pub fn to_update_fields(&self) -> Result<UpdateFields, ValidationError> {
        let frequency = self.parsed_frequency()?;
        let power = self
            .power
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .unwrap_or(0.0);

        Ok(UpdateFields {
            callsign: self.callsign.trim().to_string(),
            frequency,
            mode: self.mode.trim().to_string(),
            equipment: self.equipment.trim().to_string(),
            antenna: self.antenna.trim().to_string(),
            power,
            dxcc: self.dxcc.trim().to_string(),
            grid: self.grid.trim().to_string(),
            province: self.province.trim().to_string(),
            band: self.band.trim().to_string(),
            qslcard: self.qslcard,
            notes: self.notes.trim().to_string(),
            date: self.date.format(DATE_WIRE_FORMAT).to_string(),
            time: self.time.format(TIME_WIRE_FORMAT).to_string(),
        })
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number(value: Option<f64>) -> String {
    value.unwrap_or(0.0).to_string()
}

/// The open edit form and the records it will overwrite
#[derive(Debug, Clone)]
pub struct EditSession {
    targets: Vec<RecordId>,
    form: EditForm,
}

impl EditSession {
    pub fn single(id: RecordId, form: EditForm) -> Self {
        Self {
            targets: vec![id],
            form,
        }
    }

    pub fn batch(targets: Vec<RecordId>, form: EditForm) -> Self {
        Self { targets, form }
    }

    /// Form for a contact that is not logged yet; it has no targets
    pub fn new_record(form: EditForm) -> Self {
        Self {
            targets: Vec::new(),
            form,
        }
    }

    pub fn is_new(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &[RecordId] {
        &self.targets
    }

    pub fn is_batch(&self) -> bool {
        self.targets.len() > 1
    }

    pub fn form(&self) -> &EditForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EditForm {
        &mut self.form
    }

    /// Send the same payload to every target concurrently and wait for all
    /// of them. Nothing is undone when some of the calls fail.
    pub async fn commit<S>(&self, source: &S) -> Result<CommitReport, ValidationError>
    where
        S: RecordSource + ?Sized,
    {
        let fields = self.form.to_update_fields()?;

        tracing::info!("Updating {} record(s): {:?}", self.targets.len(), self.targets);

        let calls = self.targets.iter().map(|id| source.update_one(*id, &fields));
        let results = join_all(calls).await;

        let failures = self
            .targets
            .iter()
            .zip(results)
            .filter_map(|(id, result)| result.err().map(|e| (*id, e)))
            .collect();

        Ok(CommitReport {
            targets: self.targets.clone(),
            failures,
        })
    }

    /// Log the form as a new contact
    pub async fn create<S>(&self, source: &S) -> Result<Result<(), SourceError>, ValidationError>
    where
        S: RecordSource + ?Sized,
    {
        let fields = self.form.to_update_fields()?;
        tracing::info!("Creating record for {}", fields.callsign);
        Ok(source.create_one(&fields).await)
    }
}

/// Settled outcome of every update call of one commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub targets: Vec<RecordId>,
    /// Failed calls in target order
    pub failures: Vec<(RecordId, SourceError)>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&(RecordId, SourceError)> {
        self.failures.first()
    }

    pub fn succeeded(&self) -> Vec<RecordId> {
        self.targets
            .iter()
            .filter(|id| !self.failures.iter().any(|(failed, _)| failed == *id))
            .copied()
            .collect()
    }
}
