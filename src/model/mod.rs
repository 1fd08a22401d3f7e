//! Data types shared by the visitors and the front end.

pub mod part;
