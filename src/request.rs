//! Request descriptors and validation
//!
//! A [`RequestDescriptor`] captures everything the export engine needs for one
//! run: the site, the local date range and what to fetch for it. Descriptors
//! are validated on construction and immutable afterwards.

use crate::{DataKind, Granularity, MeterKind};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeSet;
use std::fmt;

/// Request validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Start instant is after the end instant
    #[error("start {start} is after end {end}")]
    StartAfterEnd {
        /// Requested start
        start: NaiveDateTime,
        /// Requested end
        end: NaiveDateTime,
    },

    /// Hour outside 0-23
    #[error("invalid hour: {0} (expected 0-23)")]
    InvalidHour(u32),

    /// Site identifier is empty
    #[error("site identifier cannot be empty")]
    EmptySiteId,

    /// Production request without any meter
    #[error("at least one meter must be selected for production data")]
    NoMetersSelected,

    /// Voltage request without an equipment serial number
    #[error("equipment serial number is required for voltage data")]
    MissingSerialNumber,
}

/// Inclusive range of timezone-naive local instants with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, RequestError> {
        if start > end {
            return Err(RequestError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range from `start_date start_hour:00:00` to `end_date end_hour:59:59`
    ///
    /// This is how export ranges are entered: whole hours on both ends, with
    /// the end hour fully included.
    pub fn from_dates_and_hours(
        start_date: NaiveDate,
        start_hour: u32,
        end_date: NaiveDate,
        end_hour: u32,
    ) -> Result<Self, RequestError> {
        let start_time =
            NaiveTime::from_hms_opt(start_hour, 0, 0).ok_or(RequestError::InvalidHour(start_hour))?;
        let end_time =
            NaiveTime::from_hms_opt(end_hour, 59, 59).ok_or(RequestError::InvalidHour(end_hour))?;
        Self::new(start_date.and_time(start_time), end_date.and_time(end_time))
    }

    /// Range covering whole days, `00:00:00` through `23:59:59`
    pub fn whole_days(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self, RequestError> {
        Self::from_dates_and_hours(start_date, 0, end_date, 23)
    }

    /// First instant of the range
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Last instant of the range (inclusive)
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Number of calendar days touched by the range
    pub fn calendar_days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// What to fetch for the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSelection {
    /// Energy details for the selected meters
    Production {
        /// Selected meters (ordered in wire order)
        meters: BTreeSet<MeterKind>,
        /// Aggregation granularity
        granularity: Granularity,
    },
    /// Equipment telemetry for one inverter
    Voltage {
        /// Inverter serial number
        serial_number: String,
    },
}

impl DataSelection {
    /// Production selection from any collection of meters
    pub fn production(meters: impl IntoIterator<Item = MeterKind>, granularity: Granularity) -> Self {
        Self::Production {
            meters: meters.into_iter().collect(),
            granularity,
        }
    }

    /// Voltage selection for an inverter serial number
    pub fn voltage(serial_number: impl Into<String>) -> Self {
        Self::Voltage {
            serial_number: serial_number.into(),
        }
    }

    /// Data kind of this selection
    pub fn kind(&self) -> DataKind {
        match self {
            DataSelection::Production { .. } => DataKind::Production,
            DataSelection::Voltage { .. } => DataKind::Voltage,
        }
    }

    /// Granularity, for production selections
    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            DataSelection::Production { granularity, .. } => Some(*granularity),
            DataSelection::Voltage { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), RequestError> {
        match self {
            DataSelection::Production { meters, .. } if meters.is_empty() => {
                Err(RequestError::NoMetersSelected)
            }
            DataSelection::Voltage { serial_number } if serial_number.trim().is_empty() => {
                Err(RequestError::MissingSerialNumber)
            }
            _ => Ok(()),
        }
    }
}

/// Immutable description of one export run
///
/// # Examples
///
/// ```
/// use solaredge_data_downloader::request::{DataSelection, DateRange, RequestDescriptor};
/// use solaredge_data_downloader::DataKind;
/// use chrono::NaiveDate;
///
/// let range = DateRange::whole_days(
///     NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
/// ).unwrap();
/// let request = RequestDescriptor::new(" 42 ", range, DataSelection::voltage("7F1234-AB")).unwrap();
/// assert_eq!(request.site_id(), "42");
/// assert_eq!(request.data_kind(), DataKind::Voltage);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    site_id: String,
    range: DateRange,
    selection: DataSelection,
}

impl RequestDescriptor {
    /// Validate and build a descriptor
    ///
    /// # Errors
    ///
    /// Returns an error for an empty site identifier, a production selection
    /// without meters or a voltage selection without a serial number.
    pub fn new(
        site_id: impl Into<String>,
        range: DateRange,
        selection: DataSelection,
    ) -> Result<Self, RequestError> {
        let site_id = site_id.into().trim().to_string();
        if site_id.is_empty() {
            return Err(RequestError::EmptySiteId);
        }
        selection.validate()?;

        let selection = match selection {
            DataSelection::Voltage { serial_number } => DataSelection::Voltage {
                serial_number: serial_number.trim().to_string(),
            },
            other => other,
        };

        Ok(Self {
            site_id,
            range,
            selection,
        })
    }

    /// Site identifier
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    /// Requested range
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Requested data
    pub fn selection(&self) -> &DataSelection {
        &self.selection
    }

    /// Data kind shortcut
    pub fn data_kind(&self) -> DataKind {
        self.selection.kind()
    }

    /// Granularity shortcut (production only)
    pub fn granularity(&self) -> Option<Granularity> {
        self.selection.granularity()
    }
}
