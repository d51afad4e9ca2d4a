// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Location identifiers
//!
//! Every node gets an opaque identifier that external tooling matches to a
//! source position:
//!
//! ```text
//! test://<root-identity>-<16-hex-digest>::<segment-1>::...::<segment-n>
//! ```
//!
//! The digest disambiguates targets that share a display name but live in
//! different workspaces or build configurations.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use xxhash_rust::xxh3::xxh3_64;

use crate::SEGMENT_DELIMITER;

/// URL scheme of location identifiers
pub const LOCATION_SCHEME: &str = "test://";

/// Supplies the identity of a test target
///
/// Implemented by whatever knows the resolved workspace (manifest paths,
/// build profile, features).
pub trait WorkspaceIdentity: Send + Sync {
    /// Human-readable name of the target
    fn root_identity(&self, target: &str) -> String;

    /// Bytes that uniquely identify the resolved target
    fn identity_bytes(&self, target: &str) -> Vec<u8>;
}

/// Identity derived from the workspace root and build profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFingerprint {
    /// Workspace root directory
    pub workspace_root: PathBuf,
    /// Build profile or configuration name
    pub profile: String,
}

impl WorkspaceFingerprint {
    /// Create a fingerprint for a workspace and profile
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            profile: profile.into(),
        }
    }
}

impl Default for WorkspaceFingerprint {
    fn default() -> Self {
        Self::new(".", "test")
    }
}

impl WorkspaceIdentity for WorkspaceFingerprint {
    fn root_identity(&self, target: &str) -> String {
        target.to_string()
    }

    fn identity_bytes(&self, target: &str) -> Vec<u8> {
        let root = self.workspace_root.to_string_lossy();
        let mut bytes = Vec::with_capacity(root.len() + self.profile.len() + target.len() + 2);
        bytes.extend_from_slice(root.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.profile.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(target.as_bytes());
        bytes
    }
}

/// Fixed-width lowercase hex digest of an identity
#[must_use]
pub fn identity_digest(bytes: &[u8]) -> String {
    format!("{:016x}", xxh3_64(bytes))
}

/// Builds location identifiers, memoizing one digest per target
pub struct LocationResolver {
    identity: Box<dyn WorkspaceIdentity>,
    prefix: String,
    targets: HashMap<String, String>,
}

impl LocationResolver {
    /// Create a resolver backed by a workspace identity
    #[must_use]
    pub fn new(identity: impl WorkspaceIdentity + 'static) -> Self {
        Self {
            identity: Box::new(identity),
            prefix: String::new(),
            targets: HashMap::new(),
        }
    }

    /// Prepend a protocol prefix (such as `cargo:`) to every identifier
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// `<prefix>test://<root-identity>-<digest>` for a target
    fn target_base(&mut self, target: &str) -> &str {
        if !self.targets.contains_key(target) {
            let base = format!(
                "{}{LOCATION_SCHEME}{}-{}",
                self.prefix,
                self.identity.root_identity(target),
                identity_digest(&self.identity.identity_bytes(target)),
            );
            self.targets.insert(target.to_string(), base);
        }
        self.targets.get(target).map_or("", String::as_str)
    }

    /// Location identifier for a full tree path (target first)
    ///
    /// The synthetic root (empty path) has an empty identifier.
    pub fn resolve<S: AsRef<str>>(&mut self, path: &[S]) -> String {
        let Some((target, rest)) = path.split_first() else {
            return String::new();
        };
        let mut location = self.target_base(target.as_ref()).to_string();
        for segment in rest {
            location.push_str(SEGMENT_DELIMITER);
            location.push_str(segment.as_ref());
        }
        location
    }
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new(WorkspaceFingerprint::default())
    }
}

impl fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationResolver")
            .field("prefix", &self.prefix)
            .field("targets", &self.targets.len())
            .finish()
    }
}
