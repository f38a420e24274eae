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

//! Ordering of chart versions and registry tags.
//!
//! Tags are compared as semantic versions once a leading `v` is stripped.
//! Anything that does not parse falls back to plain string order, and a
//! parsable version always sorts above an unparsable one.

use semver::Version;
use std::cmp::Ordering;

pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(bare).ok()
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Highest tag, or `None` for an empty listing
pub fn latest_version<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    tags.iter()
        .map(AsRef::as_ref)
        .max_by(|a, b| compare_versions(a, b))
        .map(str::to_string)
}

/// True only when `available` is strictly newer than `installed`.
pub fn is_update_available(installed: &str, available: &str) -> bool {
    compare_versions(installed, available) == Ordering::Less
}
