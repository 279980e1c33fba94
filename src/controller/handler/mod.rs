// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Actix message handlers.

mod conversation;
mod entry;
mod flow;
