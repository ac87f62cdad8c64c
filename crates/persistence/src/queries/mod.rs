// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Query modules for persistence layer.
//!
//! This module contains all read-only queries for the persistence layer.
//!
//! ## Module Organization
//!
//! - `users`: Users, profiles and sessions
//! - `catalog`: Zones, permits and phases
//! - `availability`: Slots and outings with derived availability
//! - `bookings`: Bookings with resolved target owners
//! - `requests`: Requests and exam attempts

pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod requests;
pub mod users;

pub use availability::{OutingFilter, SlotFilter};
pub use bookings::BookingFilter;
