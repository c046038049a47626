//! Procurement order records
//!
//! An [`Order`] is one row of the registry export decoded into typed fields.
//! Decoding never fails as a whole: each field that cannot be decoded gets
//! a default value and a [`FieldError`] pushed onto [`Order::errors`], so a
//! partially broken order still reaches the reader (who can check the
//! original notice).

use crate::dates::{parse_rus_date, DateError};
use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Number of columns in a row of the order export
pub const ORDER_COLUMN_COUNT: usize = 17;

// Column positions in the export.
const FIELD_LAW_ID: usize = 0;
const FIELD_ORDER_ID: usize = 1;
const FIELD_ORDER_TYPE: usize = 2;
const FIELD_ORDER_NAME: usize = 3;
const FIELD_LOT_NUMBER: usize = 4;
const FIELD_LOT_NAME: usize = 5;
const FIELD_START_PRICE: usize = 6;
const FIELD_CURRENCY_ID: usize = 7;
const FIELD_OKDP: usize = 8;
const FIELD_OKPD: usize = 9;
const FIELD_ORGANISATION_NAME: usize = 10;
const FIELD_PUB_DATE: usize = 11;
const FIELD_LAST_EVENT_DATE: usize = 12;
const FIELD_ORDER_STAGE: usize = 13;
const FIELD_FEATURES: usize = 14;
const FIELD_FILING_START_DATE: usize = 15;
const FIELD_FILING_END_DATE: usize = 16;

// ============================================================================
// Field Errors
// ============================================================================

/// Non-fatal problem with a single field of an order
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Invalid or unknown law id '{0}'")]
    UnknownLaw(String),

    #[error("Invalid lot number: {0}")]
    InvalidLotNumber(String),

    #[error("Invalid order price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("Unknown currency")]
    MissingCurrency,

    #[error("Unknown {field}: {source}")]
    InvalidDate {
        field: DateField,
        #[source]
        source: DateError,
    },
}

/// Which date column an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Publication,
    LastEvent,
    FilingStart,
    FilingEnd,
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateField::Publication => "publish date",
            DateField::LastEvent => "last event date",
            DateField::FilingStart => "start filing date",
            DateField::FilingEnd => "finish filing date",
        })
    }
}

// ============================================================================
// Law
// ============================================================================

/// Federal law the procurement is conducted under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum OrderLaw {
    #[default]
    Unknown,
    #[serde(rename = "44-FZ")]
    Fz44,
    #[serde(rename = "223-FZ")]
    Fz223,
    #[serde(rename = "94-FZ")]
    Fz94,
}

impl OrderLaw {
    /// Recognise the law by the number mentioned in the column
    /// ("44-ФЗ", "ФЗ 223", ...). "44" is checked first, then "223", then "94".
    pub fn parse(value: &str) -> Result<Self, FieldError> {
        if value.contains("44") {
            Ok(OrderLaw::Fz44)
        } else if value.contains("223") {
            Ok(OrderLaw::Fz223)
        } else if value.contains("94") {
            Ok(OrderLaw::Fz94)
        } else {
            Err(FieldError::UnknownLaw(value.to_string()))
        }
    }
}

impl fmt::Display for OrderLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderLaw::Unknown => "unknown",
            OrderLaw::Fz44 => "44-FZ",
            OrderLaw::Fz223 => "223-FZ",
            OrderLaw::Fz94 => "94-FZ",
        })
    }
}

// ============================================================================
// Price
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("'{0}' is out of range")]
    OutOfRange(String),
}

/// Non-negative money amount held in whole kopecks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub fn cents(&self) -> u64 {
        self.cents
    }

    pub fn as_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Parse a price, taking the absolute value and rounding half-up to kopecks.
///
/// Rounding works on the shortest decimal representation of the parsed
/// number, so `10.005` rounds to `10.01` even though the nearest binary
/// double is slightly below it.
pub fn parse_price(value: &str) -> Result<Price, PriceError> {
    let trimmed = value.trim();
    let number: f64 = trimmed
        .parse()
        .map_err(|_| PriceError::NotANumber(trimmed.to_string()))?;
    if !number.is_finite() {
        return Err(PriceError::NotANumber(trimmed.to_string()));
    }

    // f64 Display never uses exponent notation.
    let decimal = number.abs().to_string();
    let (whole, fraction) = decimal.split_once('.').unwrap_or((decimal.as_str(), ""));
    let out_of_range = || PriceError::OutOfRange(trimmed.to_string());

    let whole: u64 = whole.parse().map_err(|_| out_of_range())?;
    let mut digits = fraction.bytes().map(|d| u64::from(d - b'0')).chain(std::iter::repeat(0));
    let kopecks = digits.next().unwrap_or(0) * 10 + digits.next().unwrap_or(0);
    let round_up = digits.next().unwrap_or(0) >= 5;

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(kopecks + u64::from(round_up)))
        .map(Price::from_cents)
        .ok_or_else(out_of_range)
}

// ============================================================================
// Order
// ============================================================================

/// One procurement order from the registry export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub law: OrderLaw,
    pub order_id: String,
    pub order_type: String,
    pub order_name: String,
    /// Lot number; only multi-lot 223-FZ orders fill it
    pub lot_number: u32,
    pub lot_name: String,
    pub start_price: Price,
    pub currency_id: String,
    /// OKDP classification code
    pub okdp: String,
    /// OKPD classification code
    pub okpd: String,
    pub organisation_name: String,
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub last_event_date: Option<DateTime<FixedOffset>>,
    pub order_stage: String,
    pub features: String,
    pub filing_start_date: Option<DateTime<FixedOffset>>,
    pub filing_end_date: Option<DateTime<FixedOffset>>,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<FieldError>,
}

impl Order {
    /// Decode the 17 columns of a row. Missing trailing columns are treated
    /// as empty; the tokenizer guarantees the count for parsed rows.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let field = |index: usize| fields.get(index).map(AsRef::<str>::as_ref).unwrap_or("");

        let mut order = Order {
            law: OrderLaw::Unknown,
            order_id: field(FIELD_ORDER_ID).trim_start_matches('№').trim().to_string(),
            order_type: field(FIELD_ORDER_TYPE).to_string(),
            order_name: field(FIELD_ORDER_NAME).to_string(),
            lot_number: 0,
            lot_name: field(FIELD_LOT_NAME).to_string(),
            start_price: Price::default(),
            currency_id: field(FIELD_CURRENCY_ID).to_string(),
            okdp: field(FIELD_OKDP).to_string(),
            okpd: field(FIELD_OKPD).to_string(),
            organisation_name: field(FIELD_ORGANISATION_NAME).to_string(),
            pub_date: None,
            last_event_date: None,
            order_stage: field(FIELD_ORDER_STAGE).to_string(),
            features: field(FIELD_FEATURES).to_string(),
            filing_start_date: None,
            filing_end_date: None,
            errors: Vec::new(),
        };

        match OrderLaw::parse(field(FIELD_LAW_ID)) {
            Ok(law) => order.law = law,
            Err(e) => order.push_error(e),
        }

        let lot = field(FIELD_LOT_NUMBER).trim();
        if !lot.is_empty() {
            match lot.parse() {
                Ok(number) => order.lot_number = number,
                Err(e) => order.push_error(FieldError::InvalidLotNumber(format!("'{}': {}", lot, e))),
            }
        }

        match parse_price(field(FIELD_START_PRICE)) {
            Ok(price) => order.start_price = price,
            Err(e) => order.push_error(e.into()),
        }

        if order.currency_id.trim().is_empty() {
            order.push_error(FieldError::MissingCurrency);
        }

        order.pub_date = order.date(field(FIELD_PUB_DATE), DateField::Publication);
        order.last_event_date = order.date(field(FIELD_LAST_EVENT_DATE), DateField::LastEvent);
        order.filing_start_date = order.date(field(FIELD_FILING_START_DATE), DateField::FilingStart);
        order.filing_end_date = order.date(field(FIELD_FILING_END_DATE), DateField::FilingEnd);

        order
    }

    // A missing date is reported, never filled in from another column.
    fn date(&mut self, value: &str, field: DateField) -> Option<DateTime<FixedOffset>> {
        match parse_rus_date(value) {
            Ok(date) => Some(date),
            Err(source) => {
                self.push_error(FieldError::InvalidDate { field, source });
                None
            },
        }
    }

    pub fn push_error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn serialize_errors<S: Serializer>(errors: &[FieldError], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(|e| e.to_string()))
}
