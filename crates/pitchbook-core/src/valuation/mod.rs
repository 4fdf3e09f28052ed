pub mod dcf;

#[cfg(feature = "comps")]
pub mod comps;

#[cfg(feature = "comps")]
pub mod precedents;
