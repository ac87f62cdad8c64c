// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Mutation modules for persistence layer.
//!
//! This module contains all write operations for the persistence layer.
//!
//! ## Module Organization
//!
//! - `users`: Accounts, profiles, registration and sessions
//! - `catalog`: Zones, permits and phase sequences
//! - `availability`: Slot and outing creation and removal
//! - `bookings`: The reservation engine
//! - `requests`: Request lifecycle, phase progression and exam attempts

pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod requests;
pub mod users;
