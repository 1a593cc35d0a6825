//! Time series input adapter
//!
//! Raw inputs arrive at their own sampling rate and time zone. They are read
//! into [`TimeSeries`] and aligned onto the horizon before any network is
//! built.

pub mod align;
pub mod csv;
pub mod series;

pub use align::{align, align_all, FillMethod};
pub use csv::{read_series, read_series_file, Column, CsvFormat};
pub use series::{SeriesError, TimeSeries};
