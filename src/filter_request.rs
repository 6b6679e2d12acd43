// Translation of search criteria into the remote filter request body

use serde::{Deserialize, Serialize};

use crate::criteria::SearchCriteria;

// Absent fields are left out of the JSON body; the API reads a missing
// field differently from a zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FilterRequest {
    pub check_in_date: String,
    pub check_out_date: String,
    pub number_of_adults: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_children: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

pub fn to_filter_request(criteria: &SearchCriteria) -> FilterRequest {
    FilterRequest {
        check_in_date: criteria.stay.check_in_iso(),
        check_out_date: criteria.stay.check_out_iso(),
        number_of_adults: criteria.adults,
        number_of_children: Some(criteria.children).filter(|children| *children > 0),
        min_price: criteria.price_from,
        max_price: criteria.price_to,
        rating: criteria.rating_stars,
        latitude: criteria.coordinates.map(|point| point.latitude),
        longitude: criteria.coordinates.map(|point| point.longitude),
    }
}

impl From<&SearchCriteria> for FilterRequest {
    fn from(criteria: &SearchCriteria) -> Self {
        to_filter_request(criteria)
    }
}
