pub mod catalog;
pub mod grid;
pub mod regions;
pub mod series_csv;
