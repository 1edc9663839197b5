// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the traveler record store and the daily quota counter.

pub mod quota;
pub mod travelers;
pub mod uploads;
