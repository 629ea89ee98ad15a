use serde::{Deserialize, Deserializer, Serialize};

/// Stable key of one logged contact, as assigned by the log server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(RecordId)
            .map_err(|_| format!("Invalid record id: {}", s))
    }
}

/// QSL card state, stored as `qslcard` 0/1/2 on the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum QslStatus {
    #[default]
    NotSent,
    Sent,
    Eyeball,
}

impl QslStatus {
    pub const ALL: [QslStatus; 3] = [QslStatus::NotSent, QslStatus::Sent, QslStatus::Eyeball];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(QslStatus::NotSent),
            1 => Some(QslStatus::Sent),
            2 => Some(QslStatus::Eyeball),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            QslStatus::NotSent => 0,
            QslStatus::Sent => 1,
            QslStatus::Eyeball => 2,
        }
    }

    /// Text shown in the log table
    pub fn display_text(&self) -> &'static str {
        match self {
            QslStatus::NotSent => "Not sent",
            QslStatus::Sent => "Sent",
            QslStatus::Eyeball => "Eyeball",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QslStatus::NotSent => "not-sent",
            QslStatus::Sent => "sent",
            QslStatus::Eyeball => "eyeball",
        }
    }
}

impl TryFrom<u8> for QslStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        QslStatus::from_code(value as i64).ok_or_else(|| format!("Unknown QSL status code: {}", value))
    }
}

impl From<QslStatus> for u8 {
    fn from(value: QslStatus) -> Self {
        value.code()
    }
}

impl std::fmt::Display for QslStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

impl std::str::FromStr for QslStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "not-sent" | "notsent" | "not_sent" => Ok(QslStatus::NotSent),
            "1" | "sent" => Ok(QslStatus::Sent),
            "2" | "eyeball" => Ok(QslStatus::Eyeball),
            _ => Err(format!("Unknown QSL status: {}", s)),
        }
    }
}

/// Modes offered by the log form. Other values are still accepted by the server.
pub const MODE_CHOICES: [&str; 9] = ["SSB", "USB", "DSB", "CW", "FM", "SSTV", "FT8", "FT4", "DIGITAL"];

/// Mode used when a record has none
pub const DEFAULT_MODE: &str = "SSB";

/// One QSO row as returned by `/api/logs`.
///
/// Every field except `id` may be null or missing on the wire. Decimal columns
/// arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub callsign: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub equipment: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub antenna: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub power: Option<f64>,
    /// DXCC entity / country code
    #[serde(default, deserialize_with = "lenient_text")]
    pub dxcc: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub grid: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub province: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub band: Option<String>,
    /// Raw QSL code; see [`Record::qsl_status`]
    #[serde(default, deserialize_with = "lenient_code")]
    pub qslcard: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// `None` when the code is absent or outside the known range
    pub fn qsl_status(&self) -> Option<QslStatus> {
        self.qslcard.and_then(QslStatus::from_code)
    }
}

/// One fetched slice of the log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    /// 1-based page index that produced this slice
    pub page: u32,
    pub records: Vec<Record>,
    /// Total number of records on the server, across all pages
    pub total: u64,
}

impl RecordPage {
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

/// Body of `PUT /api/logs/{id}`. Every editable field is always sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFields {
    pub callsign: String,
    pub frequency: f64,
    pub mode: String,
    pub equipment: String,
    pub antenna: String,
    pub power: f64,
    pub dxcc: String,
    pub grid: String,
    pub province: String,
    pub band: String,
    pub qslcard: QslStatus,
    pub notes: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
}

/// Previous contact with a callsign, from `/api/history/{callsign}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub mode: Option<String>,
}

/// JSON envelope used by every log API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            total: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            total: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}
