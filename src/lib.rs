//! Core firmware logic for a two-half split keyboard: per-key sensing,
//! tap/hold and layer resolution, HID report generation and the inter-half
//! link/USB-role arbitration that lets either half own the USB connection.
//!
//! Built `#![no_std]` for the target, but compiled with `std` under `test`
//! so the unit test suites in each module run on the host.

#![cfg_attr(not(test), no_std)]

pub mod action;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod hid_queue;
pub mod key;
pub mod keycode;
pub mod keylist;
pub mod layout;
pub mod led;
pub mod link;
pub mod scanner;
pub mod usb_role;
