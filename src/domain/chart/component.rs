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

use crate::infrastructure::constants::{
    CHART_REGISTRY_BASE, CONTROL_CHART_NAME, CONTROL_RELEASE_NAME, HOSTGROUP_CHART_NAME,
    HOSTGROUP_RELEASE_NAME, REGISTRY_ORGANIZATION,
};

/// A chart the plugin manages, and the release it is installed under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    pub display_name: &'static str,
    pub chart_name: &'static str,
    pub release_name: &'static str,
}

pub const NEXUS: Component = Component {
    display_name: "nexus control",
    chart_name: CONTROL_CHART_NAME,
    release_name: CONTROL_RELEASE_NAME,
};

pub const HOSTGROUP: Component = Component {
    display_name: "hostgroup",
    chart_name: HOSTGROUP_CHART_NAME,
    release_name: HOSTGROUP_RELEASE_NAME,
};

pub const ALL: [Component; 2] = [NEXUS, HOSTGROUP];

impl Component {
    /// `oci://ghcr.io/cosmonic/{chart}`
    pub fn chart_reference(&self) -> String {
        format!("{}/{}", CHART_REGISTRY_BASE, self.chart_name)
    }

    /// Repository path inside the registry
    pub fn repository(&self) -> String {
        format!("{}/{}", REGISTRY_ORGANIZATION, self.chart_name)
    }
}
