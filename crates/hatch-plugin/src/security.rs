// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability-keyed critical section and caller permission checks.
//!
//! The gate guards two things:
//!
//! - A single advisory lock flag that brackets entry-point instantiation.
//!   Only a holder of the [`CapabilityKey`] created with the gate can take
//!   or release it. The lock is not reentrant: taking it while it is held
//!   reports failure instead of blocking.
//! - Permission checks for privileged engine calls. Callers identify
//!   themselves with a [`CallerToken`], which only the key holder can mint.
//!   Engine tokens always pass; plugin tokens are mapped back to a
//!   registered plugin by archive origin and handed to the policy.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hatch_core::{CodeOrigin, Permission, SecurityViolation};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{error, warn};
use zeroize::Zeroizing;

use crate::descriptor::PluginDescriptor;
use crate::registry::LoaderRegistry;

/// Secret capability required to operate the gate. Zeroed on drop.
#[derive(Clone)]
pub struct CapabilityKey {
    bytes: Zeroizing<[u8; 32]>,
}

impl CapabilityKey {
    /// Generate a fresh key from the system CSPRNG.
    pub fn generate() -> io::Result<Self> {
        let rng = SystemRandom::new();
        let mut bytes = Zeroizing::new([0u8; 32]);
        rng.fill(&mut bytes[..])
            .map_err(|_| io::Error::other("failed to generate capability key"))?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    fn matches(&self, other: &CapabilityKey) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes[..], &other.bytes[..])
            .is_ok()
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapabilityKey([REDACTED])")
    }
}

/// Identity of the code making a privileged call.
///
/// Tokens can only be obtained from the [`SecurityGate`] by the key holder,
/// so plugin code cannot claim an origin it was not given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerToken {
    origin: CodeOrigin,
}

impl CallerToken {
    pub(crate) fn new(origin: CodeOrigin) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &CodeOrigin {
        &self.origin
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Per-plugin permission policy consulted for recognized plugin callers.
pub trait PermissionPolicy: Send + Sync {
    fn check(&self, plugin: &PluginDescriptor, permission: &Permission) -> Decision;
}

/// Policy that grants everything to registered plugins.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionPolicy for AllowAll {
    fn check(&self, _plugin: &PluginDescriptor, _permission: &Permission) -> Decision {
        Decision::Allow
    }
}

/// Capability-locked critical section plus origin-based permission checks.
pub struct SecurityGate {
    key: CapabilityKey,
    locked: AtomicBool,
    engine_origin: CodeOrigin,
    registry: LoaderRegistry,
    policy: Arc<dyn PermissionPolicy>,
}

impl SecurityGate {
    pub fn new(
        key: CapabilityKey,
        engine_origin: CodeOrigin,
        registry: LoaderRegistry,
        policy: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            key,
            locked: AtomicBool::new(false),
            engine_origin,
            registry,
            policy,
        }
    }

    /// Take the lock. Returns true only if this call moved the gate from
    /// unlocked to locked.
    pub fn lock(&self, key: &CapabilityKey) -> bool {
        if !self.key.matches(key) {
            warn!("security gate lock attempted with a foreign key");
            return false;
        }
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the lock. A mismatched key changes nothing.
    pub fn unlock(&self, key: &CapabilityKey) {
        if !self.key.matches(key) {
            warn!("security gate unlock attempted with a foreign key");
            return;
        }
        self.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Take the lock for the lifetime of the returned guard.
    ///
    /// The guard releases the lock on drop only if it was the one that took
    /// it, so a nested section never releases an outer one.
    pub fn critical_section(&self, key: &CapabilityKey) -> GateGuard<'_> {
        let acquired = self.lock(key);
        GateGuard {
            gate: self,
            acquired,
        }
    }

    /// Token identifying engine code.
    pub fn engine_token(&self, key: &CapabilityKey) -> Option<CallerToken> {
        self.issue_token(key, self.engine_origin.clone())
    }

    /// Token identifying code from `origin`.
    pub fn issue_token(&self, key: &CapabilityKey, origin: CodeOrigin) -> Option<CallerToken> {
        if !self.key.matches(key) {
            warn!(origin = %origin, "token requested with a foreign key");
            return None;
        }
        Some(CallerToken::new(origin))
    }

    pub fn engine_origin(&self) -> &CodeOrigin {
        &self.engine_origin
    }

    /// Decide whether the caller may perform `permission`.
    pub fn check_permission(
        &self,
        caller: &CallerToken,
        permission: &Permission,
    ) -> Result<(), SecurityViolation> {
        if caller.origin == self.engine_origin {
            return Ok(());
        }

        let Some(loader) = self.registry.find_by_origin(&caller.origin) else {
            error!(origin = %caller.origin, permission = %permission, "unrecognized caller attempted a privileged action");
            return Err(SecurityViolation::UnrecognizedCaller {
                origin: caller.origin.clone(),
                permission: permission.clone(),
            });
        };

        match self.policy.check(loader.descriptor(), permission) {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => {
                warn!(plugin = %loader.name(), permission = %permission, reason = %reason, "permission denied");
                Err(SecurityViolation::Denied {
                    plugin: loader.name().to_string(),
                    permission: permission.clone(),
                    reason,
                })
            }
        }
    }
}

impl fmt::Debug for SecurityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityGate")
            .field("locked", &self.is_locked())
            .field("engine_origin", &self.engine_origin)
            .finish_non_exhaustive()
    }
}

/// Holds the gate's lock for a scope.
#[must_use = "the critical section ends when the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a SecurityGate,
    acquired: bool,
}

impl GateGuard<'_> {
    /// Whether this guard took the lock (false if it was already held).
    pub fn acquired(&self) -> bool {
        self.acquired
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.gate.locked.store(false, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::loader_for;

    struct DenyNetwork;

    impl PermissionPolicy for DenyNetwork {
        fn check(&self, _plugin: &PluginDescriptor, permission: &Permission) -> Decision {
            if permission.name().starts_with("net.") {
                Decision::Deny("network access is disabled".into())
            } else {
                Decision::Allow
            }
        }
    }

    fn gate_with(policy: Arc<dyn PermissionPolicy>) -> (SecurityGate, CapabilityKey, LoaderRegistry) {
        let key = CapabilityKey::generate().unwrap();
        let registry = LoaderRegistry::new();
        let gate = SecurityGate::new(
            key.clone(),
            CodeOrigin::new("engine:test"),
            registry.clone(),
            policy,
        );
        (gate, key, registry)
    }

    fn gate() -> (SecurityGate, CapabilityKey, LoaderRegistry) {
        gate_with(Arc::new(AllowAll))
    }

    #[test]
    fn lock_is_not_reentrant() {
        let (gate, key, _) = gate();
        assert!(gate.lock(&key));
        assert!(!gate.lock(&key));
        assert!(gate.is_locked());
    }

    #[test]
    fn unlock_with_wrong_key_keeps_gate_locked() {
        let (gate, key, _) = gate();
        let wrong = CapabilityKey::from_bytes([7u8; 32]);

        assert!(gate.lock(&key));
        gate.unlock(&wrong);
        assert!(gate.is_locked());

        gate.unlock(&key);
        assert!(!gate.is_locked());
    }

    #[test]
    fn lock_with_wrong_key_changes_nothing() {
        let (gate, _, _) = gate();
        let wrong = CapabilityKey::from_bytes([0u8; 32]);
        assert!(!gate.lock(&wrong));
        assert!(!gate.is_locked());
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn fails(gate: &SecurityGate, key: &CapabilityKey) -> Result<(), &'static str> {
            let _guard = gate.critical_section(key);
            Err("instantiation failed")
        }

        let (gate, key, _) = gate();
        assert!(fails(&gate, &key).is_err());
        assert!(!gate.is_locked());
    }

    #[test]
    fn nested_guard_does_not_release_outer() {
        let (gate, key, _) = gate();
        let outer = gate.critical_section(&key);
        {
            let inner = gate.critical_section(&key);
            assert!(!inner.acquired());
        }
        assert!(gate.is_locked());
        drop(outer);
        assert!(!gate.is_locked());
    }

    #[test]
    fn only_one_thread_takes_the_lock() {
        let (gate, key, _) = gate();
        let winners: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| gate.lock(&key))).collect();
            handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn tokens_require_the_key() {
        let (gate, key, _) = gate();
        let wrong = CapabilityKey::from_bytes([1u8; 32]);
        assert!(gate.engine_token(&wrong).is_none());
        assert!(gate.issue_token(&wrong, CodeOrigin::new("file:///x")).is_none());
        assert_eq!(
            gate.engine_token(&key).unwrap().origin(),
            &CodeOrigin::new("engine:test")
        );
    }

    #[test]
    fn engine_caller_always_passes() {
        let (gate, key, _) = gate_with(Arc::new(DenyNetwork));
        let token = gate.engine_token(&key).unwrap();
        assert!(gate.check_permission(&token, &Permission::new("net.connect")).is_ok());
    }

    #[test]
    fn unregistered_origin_is_a_violation() {
        let (gate, key, _) = gate();
        let token = gate
            .issue_token(&key, CodeOrigin::new("file:///rogue"))
            .unwrap();
        let err = gate
            .check_permission(&token, &Permission::new("fs.delete"))
            .unwrap_err();
        assert!(matches!(err, SecurityViolation::UnrecognizedCaller { .. }));
    }

    #[test]
    fn registered_plugin_defers_to_policy() {
        let (gate, key, registry) = gate_with(Arc::new(DenyNetwork));
        let core = loader_for(&registry, "Core", &[], &[], &[]);
        registry.insert(core.clone()).unwrap();
        let token = gate.issue_token(&key, core.origin().clone()).unwrap();

        assert!(gate.check_permission(&token, &Permission::new("fs.read")).is_ok());
        let err = gate
            .check_permission(&token, &Permission::new("net.connect").with_target("example.com:80"))
            .unwrap_err();
        match err {
            SecurityViolation::Denied { plugin, reason, .. } => {
                assert_eq!(plugin, "Core");
                assert!(reason.contains("network"));
            }
            other => panic!("expected Denied, got {other:?}"),
        }
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = CapabilityKey::from_bytes([42u8; 32]);
        assert_eq!(format!("{key:?}"), "CapabilityKey([REDACTED])");
    }
}
