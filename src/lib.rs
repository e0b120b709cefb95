//! Core library for the rust_scan engine.
//!
//! This library contains the scan-argument resolution and multi-dimensional
//! scan construction engine for a beamline instrument-control system: the
//! command family (`scan`, `ascan`, `dscan`, `mesh`, `cscan`, `scancn`,
//! `rscan`, `mrscan`, ...) that turns one flat, heterogeneous argument list
//! into an executable scan, with guaranteed return-to-start behaviour for
//! relative scans.
//!
//! Hardware is consumed only through the [`axis::Axis`] capability trait
//! and scans are executed through the
//! [`scan::executor::ScanEngine`] contract; [`engine::SimEngine`] is a
//! reference implementation for development and tests.

pub mod axis;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod processing;
pub mod scan;
