// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Common utility functions.

mod env;
mod network;

pub use env::*;
pub use network::*;
