pub mod aggregate;
pub mod compose;
pub mod consts;
pub mod error;
pub mod frame;
pub mod index;
pub mod io;
pub mod period;
pub mod pipeline;
pub mod region;
pub mod series;
pub mod source;
