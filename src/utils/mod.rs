//! Shared utility functions.
//!
//! Parsers for the fields derived from raw listing text:
//! - `location`: city and province codes
//! - `salary`: amounts and pay period
//! - `posted_date`: posting dates in the handful of formats listings use
//! - `identity`: external ids and source host checks

mod identity;
mod location;
mod posted_date;
mod salary;

pub use identity::{absolutize, external_id, is_external_posting};
pub use location::{parse_location, province_code, ParsedLocation};
pub use posted_date::parse_posted_date;
pub use salary::{parse_salary, salary_type};
