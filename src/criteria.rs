// Criteria model: the canonical search request shared by every editing surface

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::{self, DateRangeError};

pub const MIN_ADULTS: u32 = 1;
pub const MAX_ADULTS: u32 = 10;
pub const MIN_CHILDREN: u32 = 0;
pub const MAX_CHILDREN: u32 = 5;
pub const MIN_RATING: u32 = 1;
pub const MAX_RATING: u32 = 5;

// Machine form sent to the API and display form shown on the search surfaces
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A validated check-in/check-out pair.
///
/// Only constructible through [`StayDates::new`], which applies the date range
/// rules, so a `StayDates` held anywhere is always a bookable stay. The ISO and
/// display forms are both derived from the stored dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawStayDates", rename_all = "camelCase")]
pub struct StayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStayDates {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl TryFrom<RawStayDates> for StayDates {
    type Error = DateRangeError;

    fn try_from(raw: RawStayDates) -> Result<Self, Self::Error> {
        StayDates::new(raw.check_in, raw.check_out)
    }
}

impl StayDates {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DateRangeError> {
        date_range::validate(check_in, check_out)?;
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn check_in_iso(&self) -> String {
        self.check_in.format(ISO_DATE_FORMAT).to_string()
    }

    pub fn check_out_iso(&self) -> String {
        self.check_out.format(ISO_DATE_FORMAT).to_string()
    }

    pub fn check_in_label(&self) -> String {
        self.check_in.format(DISPLAY_DATE_FORMAT).to_string()
    }

    pub fn check_out_label(&self) -> String {
        self.check_out.format(DISPLAY_DATE_FORMAT).to_string()
    }

    // "01/06/2024 - 03/06/2024"
    pub fn label(&self) -> String {
        format!("{} - {}", self.check_in_label(), self.check_out_label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    pub stay: StayDates,
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub price_from: Option<f64>,
    #[serde(default)]
    pub price_to: Option<f64>,
    #[serde(default)]
    pub rating_stars: Option<u32>,
}

impl SearchCriteria {
    pub fn new(location: impl Into<String>, stay: StayDates) -> Self {
        Self {
            location: location.into(),
            coordinates: None,
            stay,
            adults: MIN_ADULTS,
            children: MIN_CHILDREN,
            price_from: None,
            price_to: None,
            rating_stars: None,
        }
    }

    /// The criteria a fresh session starts with: no location, one night from `today`.
    pub fn starting_on(today: NaiveDate) -> Result<Self, DateRangeError> {
        let check_out = today.succ_opt().ok_or(DateRangeError::OutOfOrder)?;
        Ok(Self::new(String::new(), StayDates::new(today, check_out)?))
    }

    pub fn needs_geocoding(&self) -> bool {
        !self.location.is_empty() && self.coordinates.is_none()
    }

    pub fn history_key(&self) -> HistoryKey {
        HistoryKey {
            location: self.location.clone(),
            check_in: self.stay.check_in(),
            check_out: self.stay.check_out(),
            adults: self.adults,
            children: self.children,
        }
    }
}

// Two searches with the same key are the same history entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryKey {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    pub children: u32,
}

/// Edit to a nullable criteria field.
///
/// `Keep` leaves the current value alone, `Clear` removes it and `Set`
/// replaces it. Non-nullable fields use plain `Option` in [`CriteriaPatch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Patch::Keep => Patch::Keep,
            Patch::Clear => Patch::Clear,
            Patch::Set(value) => Patch::Set(f(value)),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        }
    }
}

/// A partial edit produced by one of the search surfaces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CriteriaPatch {
    pub location: Option<String>,
    pub coordinates: Patch<GeoPoint>,
    pub stay: Option<(NaiveDate, NaiveDate)>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
    pub price_from: Patch<f64>,
    pub price_to: Patch<f64>,
    pub rating_stars: Patch<u32>,
}

impl CriteriaPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Patch::Set(GeoPoint {
            latitude,
            longitude,
        });
        self
    }

    pub fn clear_coordinates(mut self) -> Self {
        self.coordinates = Patch::Clear;
        self
    }

    pub fn stay(mut self, check_in: NaiveDate, check_out: NaiveDate) -> Self {
        self.stay = Some((check_in, check_out));
        self
    }

    pub fn adults(mut self, adults: u32) -> Self {
        self.adults = Some(adults);
        self
    }

    pub fn children(mut self, children: u32) -> Self {
        self.children = Some(children);
        self
    }

    pub fn price_from(mut self, price: f64) -> Self {
        self.price_from = Patch::Set(price);
        self
    }

    pub fn price_to(mut self, price: f64) -> Self {
        self.price_to = Patch::Set(price);
        self
    }

    pub fn clear_price(mut self) -> Self {
        self.price_from = Patch::Clear;
        self.price_to = Patch::Clear;
        self
    }

    pub fn rating_stars(mut self, stars: u32) -> Self {
        self.rating_stars = Patch::Set(stars);
        self
    }

    pub fn clear_rating(mut self) -> Self {
        self.rating_stars = Patch::Clear;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.coordinates.is_keep()
            && self.stay.is_none()
            && self.adults.is_none()
            && self.children.is_none()
            && self.price_from.is_keep()
            && self.price_to.is_keep()
            && self.rating_stars.is_keep()
    }
}
