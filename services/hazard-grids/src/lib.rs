//! Hazard grid products from gridded model output.
//!
//! Locates input files from path templates, loads and joins the model
//! series, computes the wind, rain and operational forecast hazard grids
//! and writes them to NetCDF. Also renders the impact-forecasting workflow
//! diagram.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod sources;
pub mod workflow;
