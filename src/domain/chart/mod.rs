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

pub mod component;
pub mod loader;
pub mod manager;
pub mod version;

pub use component::{Component, ALL, HOSTGROUP, NEXUS};
pub use loader::{ChartDependency, ChartMetadata, LoadedChart};
pub use manager::{ChartManager, ChartRelease};
pub use version::{compare_versions, is_update_available, latest_version, parse_version};
