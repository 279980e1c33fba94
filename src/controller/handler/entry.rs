// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

//! Config entry lifecycle message handlers.

use crate::controller::{Controller, GetConfigEntries, ReloadEntry, RemoveEntry};
use crate::errors::ServiceError;
use actix::{Handler, MessageResult};

impl Handler<GetConfigEntries> for Controller {
    type Result = MessageResult<GetConfigEntries>;

    fn handle(&mut self, _msg: GetConfigEntries, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.entries.iter().map(|h| h.info()).collect())
    }
}

impl Handler<ReloadEntry> for Controller {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: ReloadEntry, _ctx: &mut Self::Context) -> Self::Result {
        self.reload_entry(&msg.entry_id)
    }
}

impl Handler<RemoveEntry> for Controller {
    type Result = Result<(), ServiceError>;

    fn handle(&mut self, msg: RemoveEntry, _ctx: &mut Self::Context) -> Self::Result {
        self.remove_entry(&msg.entry_id)
    }
}
