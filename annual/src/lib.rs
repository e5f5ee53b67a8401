mod reduce;
mod series;
mod tally;
mod window;

pub mod para;

pub use reduce::Reducer;
pub use series::YearSeries;
pub use tally::{count_per_year, map_series, tally_years, ParaSettings};
pub use window::{in_window, try_in_window, YearWindow};

//calendar year of a publication or membership
pub type Year = u16;
