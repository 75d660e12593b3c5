pub mod backend;
pub mod converter;
pub mod frontend;

pub use crate::domain::model::{LookupRequest, LookupResult, PostalCode, WeatherReport};
pub use crate::domain::ports::{LocationResolver, WeatherResolver};
pub use crate::utils::error::Result;
