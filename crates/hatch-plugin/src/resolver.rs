// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency checks and load ordering.
//!
//! [`DependencyResolver`] answers one question: is every name a descriptor
//! depends on already registered? It never loads anything itself.
//!
//! Batch loading orders archives by trial: every pending archive is tried
//! once per pass, and archives that fail only because a dependency is not
//! there yet are kept for the next pass. When a pass makes no progress, a
//! rescue pass tries again with soft-dependency checks skipped and stops at
//! the first archive that loads, then normal passes resume. Whatever is
//! still pending after a rescue pass that loads nothing is reported as
//! failed.

use std::collections::HashSet;

use hatch_core::LoadError;
use tracing::debug;

use crate::descriptor::PluginDescriptor;
use crate::registry::{LoaderRegistry, PluginKey};

/// Anything that can tell whether a plugin name is registered.
pub trait KnownPlugins {
    fn is_known(&self, name: &str) -> bool;
}

impl KnownPlugins for LoaderRegistry {
    fn is_known(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl KnownPlugins for HashSet<PluginKey> {
    fn is_known(&self, name: &str) -> bool {
        self.contains(&PluginKey::new(name))
    }
}

/// Validates declared dependencies against the set of registered plugins.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Fail on the first hard dependency (in declared order) that is not
    /// registered.
    pub fn check_hard(
        descriptor: &PluginDescriptor,
        known: &impl KnownPlugins,
    ) -> Result<(), LoadError> {
        match descriptor.depend.iter().find(|dep| !known.is_known(dep)) {
            Some(missing) => Err(LoadError::UnknownDependency(missing.clone())),
            None => Ok(()),
        }
    }

    /// Fail on the first soft dependency (in declared order) that is not
    /// registered.
    pub fn check_soft(
        descriptor: &PluginDescriptor,
        known: &impl KnownPlugins,
    ) -> Result<(), LoadError> {
        match descriptor.softdepend.iter().find(|dep| !known.is_known(dep)) {
            Some(missing) => Err(LoadError::UnknownSoftDependency(missing.clone())),
            None => Ok(()),
        }
    }

    /// Hard check, then soft check unless `skip_soft` is set.
    pub fn check(
        descriptor: &PluginDescriptor,
        known: &impl KnownPlugins,
        skip_soft: bool,
    ) -> Result<(), LoadError> {
        Self::check_hard(descriptor, known)?;
        if !skip_soft {
            Self::check_soft(descriptor, known)?;
        }
        Ok(())
    }
}

/// Result of running load passes over a batch.
#[derive(Debug)]
pub(crate) struct Passes<T, R> {
    pub(crate) done: Vec<(T, R)>,
    pub(crate) failed: Vec<(T, LoadError)>,
}

/// Drive `attempt` over `items` in passes until nothing more can load.
///
/// `attempt` receives the item and whether soft-dependency checks should be
/// skipped. Items failing with a missing-dependency error are retried;
/// any other error is final. With `skip_soft` set, every pass skips soft
/// checks and there is no rescue pass.
pub(crate) fn run_passes<T, R>(
    items: Vec<T>,
    skip_soft: bool,
    mut attempt: impl FnMut(&T, bool) -> Result<R, LoadError>,
) -> Passes<T, R> {
    let mut pending: Vec<(T, Option<LoadError>)> = items.into_iter().map(|i| (i, None)).collect();
    let mut done = Vec::new();
    let mut failed = Vec::new();
    let mut pass = 0usize;

    while !pending.is_empty() {
        pass += 1;
        let mut progressed = false;
        let mut retry = Vec::new();
        for (item, _) in std::mem::take(&mut pending) {
            match attempt(&item, skip_soft) {
                Ok(r) => {
                    done.push((item, r));
                    progressed = true;
                }
                Err(e) if e.is_missing_dependency() => retry.push((item, Some(e))),
                Err(e) => failed.push((item, e)),
            }
        }
        pending = retry;
        if progressed || pending.is_empty() {
            continue;
        }
        if skip_soft {
            failed.extend(
                std::mem::take(&mut pending)
                    .into_iter()
                    .filter_map(|(item, last)| last.map(|e| (item, e))),
            );
            break;
        }

        debug!(pass, pending = pending.len(), "no progress, retrying without soft dependencies");
        let mut rescued = false;
        let mut retry = Vec::new();
        for (item, last) in std::mem::take(&mut pending) {
            if rescued {
                retry.push((item, last));
                continue;
            }
            match attempt(&item, true) {
                Ok(r) => {
                    done.push((item, r));
                    rescued = true;
                }
                Err(e) if e.is_missing_dependency() => retry.push((item, Some(e))),
                Err(e) => failed.push((item, e)),
            }
        }
        pending = retry;
        if !rescued {
            for (item, last) in std::mem::take(&mut pending) {
                if let Some(e) = last {
                    failed.push((item, e));
                }
            }
        }
    }

    Passes { done, failed }
}

/// Load order computed from descriptors alone.
#[derive(Debug)]
pub struct LoadPlan<T> {
    /// Items in an order in which each one's dependencies come first.
    pub order: Vec<T>,
    /// Items that could never load, with the reason.
    pub unresolved: Vec<(T, LoadError)>,
}

/// Order `items` so that every hard dependency (and, where possible, every
/// soft dependency) precedes its dependents.
///
/// `registered` names plugins that are already loaded. Two items with the
/// same case-folded name: the second one is reported as already loaded.
/// `skip_soft` ignores soft dependencies entirely, as batch loading does
/// when configured to.
pub fn plan_load_order<T: AsRef<PluginDescriptor>>(
    items: Vec<T>,
    registered: impl IntoIterator<Item = PluginKey>,
    skip_soft: bool,
) -> LoadPlan<T> {
    let mut known: HashSet<PluginKey> = registered.into_iter().collect();

    let passes = run_passes(items, skip_soft, |item, skip_soft| {
        let descriptor = item.as_ref();
        if known.contains(&descriptor.key()) {
            return Err(LoadError::AlreadyLoaded(descriptor.name.clone()));
        }
        DependencyResolver::check(descriptor, &known, skip_soft)?;
        known.insert(descriptor.key());
        Ok(())
    });

    LoadPlan {
        order: passes.done.into_iter().map(|(item, ())| item).collect(),
        unresolved: passes.failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::descriptor as desc;

    fn known(names: &[&str]) -> HashSet<PluginKey> {
        names.iter().map(|n| PluginKey::new(n)).collect()
    }

    fn names(plan: &LoadPlan<PluginDescriptor>) -> Vec<&str> {
        plan.order.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn check_hard_reports_first_missing_in_declared_order() {
        let d = desc("Addon", &["Core", "Economy", "Chat"], &[]);
        let err = DependencyResolver::check_hard(&d, &known(&["core"])).unwrap_err();
        assert!(matches!(err, LoadError::UnknownDependency(ref n) if n == "Economy"));
    }

    #[test]
    fn check_hard_is_case_insensitive() {
        let d = desc("Addon", &["CORE"], &[]);
        assert!(DependencyResolver::check_hard(&d, &known(&["Core"])).is_ok());
    }

    #[test]
    fn check_soft_reports_unknown_soft_dependency() {
        let d = desc("Addon", &[], &["Maps"]);
        let err = DependencyResolver::check_soft(&d, &known(&[])).unwrap_err();
        assert!(matches!(err, LoadError::UnknownSoftDependency(ref n) if n == "Maps"));
        assert!(DependencyResolver::check(&d, &known(&[]), true).is_ok());
    }

    #[test]
    fn check_hard_runs_before_soft() {
        let d = desc("Addon", &["Core"], &["Maps"]);
        let err = DependencyResolver::check(&d, &known(&[]), false).unwrap_err();
        assert!(matches!(err, LoadError::UnknownDependency(_)));
    }

    #[test]
    fn registry_is_a_known_set() {
        let registry = LoaderRegistry::new();
        registry
            .insert(crate::testing::loader_for(&registry, "Core", &[], &[], &[]))
            .unwrap();
        let d = desc("Addon", &["core"], &["Maps"]);
        assert!(DependencyResolver::check_hard(&d, &registry).is_ok());
        assert!(DependencyResolver::check_soft(&d, &registry).is_err());
    }

    #[test]
    fn plan_puts_dependencies_first() {
        let plan = plan_load_order(
            vec![
                desc("Addon", &["Core"], &[]),
                desc("Extra", &["Addon"], &[]),
                desc("Core", &[], &[]),
            ],
            [],
            false,
        );
        assert_eq!(names(&plan), vec!["Core", "Addon", "Extra"]);
        assert!(plan.unresolved.is_empty());
    }

    #[test]
    fn plan_honours_soft_dependencies_when_present() {
        let plan = plan_load_order(
            vec![desc("Addon", &[], &["Maps"]), desc("Maps", &[], &[])],
            [],
            false,
        );
        assert_eq!(names(&plan), vec!["Maps", "Addon"]);
    }

    #[test]
    fn plan_rescues_missing_soft_dependency() {
        let plan = plan_load_order(
            vec![desc("Addon", &[], &["Maps"]), desc("Extra", &["Addon"], &[])],
            [],
            false,
        );
        assert_eq!(names(&plan), vec!["Addon", "Extra"]);
    }

    #[test]
    fn plan_rescue_loads_only_one_before_resuming() {
        // B is rescued despite its missing soft dependency; A then loads in
        // a normal pass because its soft dependency B is now present.
        let plan = plan_load_order(
            vec![desc("B", &[], &["Ghost"]), desc("A", &[], &["B"])],
            [],
            false,
        );
        assert_eq!(names(&plan), vec!["B", "A"]);
    }

    #[test]
    fn plan_skipping_soft_dependencies_keeps_input_order() {
        let plan = plan_load_order(
            vec![desc("Addon", &[], &["Maps"]), desc("Maps", &[], &[])],
            [],
            true,
        );
        assert_eq!(names(&plan), vec!["Addon", "Maps"]);
    }

    #[test]
    fn plan_skipping_soft_dependencies_still_fails_hard_ones() {
        let plan = plan_load_order(
            vec![desc("Addon", &["Core"], &[]), desc("Extra", &[], &["Ghost"])],
            [],
            true,
        );
        assert_eq!(names(&plan), vec!["Extra"]);
        assert!(matches!(plan.unresolved[0].1, LoadError::UnknownDependency(ref n) if n == "Core"));
    }

    #[test]
    fn plan_reports_missing_hard_dependency() {
        let plan = plan_load_order(
            vec![desc("Core", &[], &[]), desc("Addon", &["Missing"], &[])],
            [],
            false,
        );
        assert_eq!(names(&plan), vec!["Core"]);
        assert_eq!(plan.unresolved.len(), 1);
        let (item, err) = &plan.unresolved[0];
        assert_eq!(item.name, "Addon");
        assert!(matches!(err, LoadError::UnknownDependency(n) if n == "Missing"));
    }

    #[test]
    fn plan_reports_dependency_cycle() {
        let plan = plan_load_order(
            vec![desc("A", &["B"], &[]), desc("B", &["A"], &[])],
            [],
            false,
        );
        assert!(plan.order.is_empty());
        assert_eq!(plan.unresolved.len(), 2);
    }

    #[test]
    fn plan_respects_already_registered_plugins() {
        let plan = plan_load_order(
            vec![desc("Addon", &["Core"], &[]), desc("core", &[], &[])],
            [PluginKey::new("Core")],
            false,
        );
        assert_eq!(names(&plan), vec!["Addon"]);
        assert!(matches!(plan.unresolved[0].1, LoadError::AlreadyLoaded(ref n) if n == "core"));
    }
}
