// Date range rules shared by the calendar surface and the composer

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::criteria::StayDates;

pub const MAX_STAY_DAYS: i64 = 30;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("Check-out date must be after check-in date")]
    OutOfOrder,

    #[error("Stay cannot be longer than 30 days")]
    StayTooLong,

    #[error("Check-in date has not been selected")]
    MissingCheckIn,

    #[error("Check-out date has not been selected")]
    Incomplete,
}

pub fn validate(check_in: NaiveDate, check_out: NaiveDate) -> Result<(), DateRangeError> {
    if check_out <= check_in {
        return Err(DateRangeError::OutOfOrder);
    }
    if check_out - check_in > Duration::days(MAX_STAY_DAYS) {
        return Err(DateRangeError::StayTooLong);
    }
    Ok(())
}

/// Calendar selection state of the date picker.
///
/// Picking a check-in that invalidates the chosen check-out clears the
/// check-out so the user has to pick it again; it is never moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateSelection {
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
}

impl DateSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stay(stay: &StayDates) -> Self {
        Self {
            check_in: Some(stay.check_in()),
            check_out: Some(stay.check_out()),
        }
    }

    pub fn check_in(&self) -> Option<NaiveDate> {
        self.check_in
    }

    pub fn check_out(&self) -> Option<NaiveDate> {
        self.check_out
    }

    pub fn select_check_in(&mut self, date: NaiveDate) {
        self.check_in = Some(date);
        if let Some(check_out) = self.check_out {
            if let Err(e) = validate(date, check_out) {
                debug!("Clearing check-out {} after check-in change: {}", check_out, e);
                self.check_out = None;
            }
        }
    }

    pub fn select_check_out(&mut self, date: NaiveDate) -> Result<(), DateRangeError> {
        let check_in = self.check_in.ok_or(DateRangeError::MissingCheckIn)?;
        validate(check_in, date)?;
        self.check_out = Some(date);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.check_in = None;
        self.check_out = None;
    }

    pub fn commit(&self) -> Result<StayDates, DateRangeError> {
        let check_in = self.check_in.ok_or(DateRangeError::MissingCheckIn)?;
        let check_out = self.check_out.ok_or(DateRangeError::Incomplete)?;
        StayDates::new(check_in, check_out)
    }
}
