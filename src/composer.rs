// Criteria composer: merges partial edits from the search surfaces into one snapshot

use tracing::debug;

use crate::criteria::{
    CriteriaPatch, Patch, SearchCriteria, StayDates, MAX_ADULTS, MAX_CHILDREN, MAX_RATING,
    MIN_ADULTS, MIN_CHILDREN, MIN_RATING,
};
use crate::date_range::DateRangeError;

/// Apply `patch` on top of `current`.
///
/// Fields missing from the patch are carried over. Counts and ratings are
/// clamped into range, price bounds are kept ordered, and a location change
/// without coordinates drops the old coordinates. The only failure is an
/// invalid stay, in which case `current` is left as it was.
pub fn apply_patch(
    current: &SearchCriteria,
    patch: &CriteriaPatch,
) -> Result<SearchCriteria, DateRangeError> {
    let mut next = current.clone();

    if let Some((check_in, check_out)) = patch.stay {
        next.stay = StayDates::new(check_in, check_out)?;
    }

    if let Some(location) = &patch.location {
        if *location != current.location && patch.coordinates.is_keep() {
            debug!("Location changed to {:?} without coordinates", location);
            next.coordinates = None;
        }
        next.location = location.clone();
    }
    next.coordinates = patch.coordinates.apply(next.coordinates);

    if let Some(adults) = patch.adults {
        next.adults = adults.clamp(MIN_ADULTS, MAX_ADULTS);
    }
    if let Some(children) = patch.children {
        next.children = children.clamp(MIN_CHILDREN, MAX_CHILDREN);
    }
    next.rating_stars = patch
        .rating_stars
        .map(|stars| stars.clamp(MIN_RATING, MAX_RATING))
        .apply(next.rating_stars);

    apply_price_patch(&mut next, patch.price_from, patch.price_to);

    Ok(next)
}

fn apply_price_patch(next: &mut SearchCriteria, from: Patch<f64>, to: Patch<f64>) {
    let from = sanitize_price(from);
    let to = sanitize_price(to);

    match (from, to) {
        (Patch::Set(low), Patch::Set(high)) => {
            next.price_from = Some(low.min(high));
            next.price_to = Some(low.max(high));
        }
        (Patch::Set(low), to) => {
            next.price_from = Some(low);
            next.price_to = match to.apply(next.price_to) {
                Some(high) if high < low => Some(low),
                other => other,
            };
        }
        (from, Patch::Set(high)) => {
            next.price_to = Some(high);
            next.price_from = match from.apply(next.price_from) {
                Some(low) if low > high => Some(high),
                other => other,
            };
        }
        (from, to) => {
            next.price_from = from.apply(next.price_from);
            next.price_to = to.apply(next.price_to);
        }
    }
}

// An infinite bound is no bound at all
fn sanitize_price(patch: Patch<f64>) -> Patch<f64> {
    match patch {
        Patch::Set(price) if price == f64::INFINITY => Patch::Clear,
        other => other.map(non_negative),
    }
}

// f64::max drops NaN in favour of the other operand
fn non_negative(price: f64) -> f64 {
    price.max(0.0)
}
