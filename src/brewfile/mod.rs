//! Brewfile reading and writing
//!
//! This module splits a Brewfile into its tap, brew, cask and mas sections
//! and renders them back in a stable, grouped order.

mod packages;

pub use packages::{PackageKind, Packages};
