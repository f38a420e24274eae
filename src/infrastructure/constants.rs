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

/// Namespace that hosts every Cosmonic Control workload
pub const COSMONIC_NAMESPACE: &str = "cosmonic-system";

/// Console deployment
pub const CONSOLE_DEPLOYMENT: &str = "console";
pub const CONSOLE_CONTAINER_PORT: u16 = 8080;

/// Local port range scanned for the console tunnel (inclusive)
pub const LOCAL_START_PORT: u16 = 8080;
pub const LOCAL_END_PORT: u16 = 8280;

/// OCI registry hosting the charts
pub const REGISTRY_HOST: &str = "ghcr.io";
pub const REGISTRY_ORGANIZATION: &str = "cosmonic";
pub const CHART_REGISTRY_BASE: &str = "oci://ghcr.io/cosmonic";

/// Nexus control plane chart
pub const CONTROL_CHART_NAME: &str = "cosmonic-control";
pub const CONTROL_RELEASE_NAME: &str = "cosmonic-control";

/// Hostgroup chart
pub const HOSTGROUP_CHART_NAME: &str = "cosmonic-control-hostgroup";
pub const HOSTGROUP_RELEASE_NAME: &str = "hostgroup";

/// Helm runtime
pub const DEFAULT_HELM_BINARY: &str = "helm";
pub const DELETION_PROPAGATION_FOREGROUND: &str = "foreground";

/// External links
pub const DOCUMENTATION_URL: &str = "https://cosmonic.com/docs";
pub const LICENSE_URL: &str = "https://cosmonic.com/trial";
