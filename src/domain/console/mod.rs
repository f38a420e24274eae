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

pub mod launcher;
pub mod pod_locator;
pub mod port_picker;
pub mod tunnel;

pub use launcher::{stdin_newline, wait_for_newline, ConsoleLauncher};
pub use pod_locator::{ensure_ready, find_pod, label_selector, PodRef, WorkloadRef};
pub use port_picker::{pick_port, PortRange};
pub use tunnel::{open_tunnel, TunnelSession, TunnelSpec, TunnelState};
