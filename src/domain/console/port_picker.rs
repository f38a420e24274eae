// Copyright 2025 Cosmonic.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::infrastructure::constants::{LOCAL_END_PORT, LOCAL_START_PORT};
use crate::shared::error::{CosmoError, Result};
use std::net::{Ipv4Addr, TcpListener};
use tracing::debug;

/// Inclusive range of local ports to try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: LOCAL_START_PORT,
            end: LOCAL_END_PORT,
        }
    }
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

/// Return the first port in the range that accepts a bind on the wildcard
/// address. The probe listener is closed before returning, so the port is
/// unbound until the tunnel claims it.
pub fn pick_port(range: PortRange) -> Result<u16> {
    for port in range.start..=range.end {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(listener) => {
                drop(listener);
                return Ok(port);
            }
            Err(e) => debug!(port, error = %e, "Local port unavailable"),
        }
    }

    Err(CosmoError::PortRangeExhausted {
        start: range.start,
        end: range.end,
    })
}
