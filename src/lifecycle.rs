//! Tracks one live effect per host container.
//!
//! The registry is the only place that knows which containers already have
//! an effect. Entries are added by [`EffectRegistry::initialize`] (directly or
//! through a [`EffectRegistry::rescan`] pass) and removed by
//! [`EffectRegistry::dispose`], [`EffectRegistry::prune`] or
//! [`EffectRegistry::dispose_all`].

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::backend::RenderBackend;
use crate::effect::EffectInstance;
use crate::error::EffectError;
use crate::scheduler::FrameHost;

/// Synchronous, idempotent release of everything an entry owns.
pub trait Teardown {
    fn teardown(&self);
}

impl<B: RenderBackend, H: FrameHost> Teardown for Rc<RefCell<EffectInstance<B, H>>> {
    fn teardown(&self) {
        match self.try_borrow_mut() {
            Ok(mut instance) => instance.dispose(),
            // only possible if teardown is reached from inside the instance's own callback
            Err(_) => log::error!("effect busy during teardown; disposal skipped"),
        }
    }
}

/// What one discovery pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Entries torn down because their container left the page.
    pub pruned: usize,
    /// Containers that got a new entry.
    pub started: usize,
}

/// Container identity -> live entry.
///
/// Keys only need equality: host element handles compare by identity and
/// do not hash, and a page holds a handful of containers at most.
pub struct EffectRegistry<K, T> {
    entries: Vec<(K, T)>,
}

impl<K, T> Default for EffectRegistry<K, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq + Debug, T: Teardown> EffectRegistry<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, t)| t)
    }

    /// Run `build` for `key` unless it already has an entry.
    ///
    /// Returns the new entry, or `None` if the container was already
    /// initialized or `build` failed. Failures are logged, not returned:
    /// one broken container never affects the others.
    pub fn initialize<F>(&mut self, key: K, build: F) -> Option<&T>
    where
        F: FnOnce(&K) -> Result<T, EffectError>,
    {
        if self.contains(&key) {
            log::debug!("{key:?} already initialized");
            return None;
        }
        match build(&key) {
            Ok(entry) => {
                log::info!("{key:?} initialized");
                self.entries.push((key, entry));
                self.entries.last().map(|(_, t)| t)
            }
            Err(err) => {
                log::warn!("failed to initialize {key:?}: {err}");
                None
            }
        }
    }

    /// Tear down and forget `key`. Returns whether it had an entry.
    pub fn dispose(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                let (_, entry) = self.entries.remove(pos);
                entry.teardown();
                true
            }
            None => false,
        }
    }

    /// Tear down every entry whose key fails `keep`.
    pub fn prune(&mut self, mut keep: impl FnMut(&K) -> bool) -> usize {
        let mut removed = 0;
        self.entries.retain(|(key, entry)| {
            if keep(key) {
                return true;
            }
            entry.teardown();
            removed += 1;
            false
        });
        removed
    }

    /// One discovery pass: drop entries whose container fails `connected`,
    /// then, only if `allowed`, initialize every container without an entry.
    ///
    /// Pruning happens even when `allowed` is false so detached effects never
    /// keep running while activation is switched off.
    pub fn rescan<I, C, F>(&mut self, allowed: bool, containers: I, connected: C, mut build: F) -> ScanReport
    where
        I: IntoIterator<Item = K>,
        C: FnMut(&K) -> bool,
        F: FnMut(&K) -> Result<T, EffectError>,
    {
        let pruned = self.prune(connected);
        let mut started = 0;
        if allowed {
            for key in containers {
                if self.initialize(key, &mut build).is_some() {
                    started += 1;
                }
            }
        }
        ScanReport { pruned, started }
    }

    pub fn dispose_all(&mut self) {
        for (_, entry) in self.entries.drain(..) {
            entry.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectKind;
    use crate::geometry::Viewport;
    use crate::gate::CapabilityGate;
    use crate::palette::{Palette, AURORA_DEFAULT};
    use crate::testing::{ManualFrames, RecordingBackend, StubEnvironment};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    type Shared = Rc<RefCell<EffectInstance<RecordingBackend, ManualFrames>>>;

    fn build(backend: &RecordingBackend) -> Result<Shared, EffectError> {
        let instance = EffectInstance::new(
            EffectKind::Aurora,
            backend.clone(),
            ManualFrames::default(),
            EffectKind::Aurora.config().default_palette,
            Viewport::new(800.0, 600.0, 1.0),
            SmallRng::seed_from_u64(3),
        )?;
        Ok(Rc::new(RefCell::new(instance)))
    }

    #[test]
    fn initialize_is_idempotent() {
        let backend = RecordingBackend::default();
        let builds = Cell::new(0);
        let mut registry: EffectRegistry<&str, Shared> = EffectRegistry::new();

        for _ in 0..2 {
            registry.initialize("hero", |_| {
                builds.set(builds.get() + 1);
                build(&backend)
            });
        }
        assert_eq!(builds.get(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(backend.log().created, 1);
    }

    #[test]
    fn failed_build_leaves_no_entry_and_others_unaffected() {
        let broken = RecordingBackend::failing_create();
        let good = RecordingBackend::default();
        let mut registry: EffectRegistry<u32, Shared> = EffectRegistry::new();

        assert!(registry.initialize(1, |_| build(&broken)).is_none());
        assert!(registry.initialize(2, |_| build(&good)).is_some());
        assert!(!registry.contains(&1));
        assert!(registry.contains(&2));
    }

    #[test]
    fn dispose_tears_down_once() {
        let backend = RecordingBackend::default();
        let mut registry: EffectRegistry<u32, Shared> = EffectRegistry::new();
        let instance = registry.initialize(7, |_| build(&backend)).cloned().unwrap();

        assert!(registry.dispose(&7));
        assert!(!registry.dispose(&7));
        assert!(instance.borrow().is_disposed());
        assert!(backend.log().context_released);

        // a disposed container can be initialized again
        let fresh = RecordingBackend::default();
        assert!(registry.initialize(7, |_| build(&fresh)).is_some());
    }

    #[test]
    fn prune_drops_detached_containers() {
        let backends: Vec<RecordingBackend> = (0..4).map(|_| RecordingBackend::default()).collect();
        let mut registry: EffectRegistry<usize, Shared> = EffectRegistry::new();
        for (key, backend) in backends.iter().enumerate() {
            registry.initialize(key, |_| build(backend));
        }
        let removed = registry.prune(|key| key % 2 == 0);
        assert_eq!(removed, 2);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&1).is_none());
        let released: Vec<bool> = backends.iter().map(|b| b.log().context_released).collect();
        assert_eq!(released, vec![false, true, false, true]);
    }

    #[test]
    fn dispose_all_empties_registry() {
        let a = RecordingBackend::default();
        let b = RecordingBackend::default();
        let mut registry: EffectRegistry<u32, Shared> = EffectRegistry::new();
        registry.initialize(1, |_| build(&a));
        registry.initialize(2, |_| build(&b));
        assert_eq!(registry.values().filter(|fx| !fx.borrow().is_disposed()).count(), 2);
        registry.dispose_all();
        assert!(registry.is_empty());
        assert!(a.log().context_released && b.log().context_released);
    }

    #[test]
    fn closed_gate_never_builds() {
        let env = StubEnvironment {
            gpu: Ok(false),
            reduced_motion: false,
        };
        let gate = CapabilityGate::probe(&env);
        let builds = Cell::new(0);
        let mut registry: EffectRegistry<&str, Shared> = EffectRegistry::new();

        let report = registry.rescan(gate.can_run(&env), ["hero", "footer"], |_| true, |_| {
            builds.set(builds.get() + 1);
            build(&RecordingBackend::default())
        });
        assert_eq!(builds.get(), 0);
        assert_eq!(report, ScanReport::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn detached_entries_pruned_while_gate_closed() {
        let backend = RecordingBackend::default();
        let mut registry: EffectRegistry<&str, Shared> = EffectRegistry::new();
        registry.rescan(true, ["hero"], |_| true, |_| build(&backend));
        assert_eq!(registry.len(), 1);

        let env = StubEnvironment {
            gpu: Ok(true),
            reduced_motion: true,
        };
        let allowed = CapabilityGate::probe(&env).can_run(&env);
        let report = registry.rescan(allowed, ["hero"], |_| false, |_| build(&backend));
        assert_eq!(report, ScanReport { pruned: 1, started: 0 });
        assert!(registry.is_empty());
        assert!(backend.log().context_released);
    }

    #[test]
    fn marked_container_without_colors_runs_with_default_palette() {
        let backend = RecordingBackend::default();
        let frames = ManualFrames::default();
        let env = StubEnvironment {
            gpu: Ok(true),
            reduced_motion: false,
        };
        let gate = CapabilityGate::probe(&env);
        // the container carries the marker but no color attribute
        let colors: Option<&str> = None;
        let mut registry: EffectRegistry<&str, Shared> = EffectRegistry::new();

        let report = registry.rescan(gate.can_run(&env), ["hero"], |_| true, |_| {
            let instance = EffectInstance::new(
                EffectKind::Aurora,
                backend.clone(),
                frames.clone(),
                Palette::from_attribute(colors, AURORA_DEFAULT),
                Viewport::new(800.0, 600.0, 1.0),
                SmallRng::seed_from_u64(5),
            )?;
            let shared = Rc::new(RefCell::new(instance));
            shared.borrow_mut().start()?;
            Ok(shared)
        });
        assert_eq!(report, ScanReport { pruned: 0, started: 1 });

        let hero = registry.get(&"hero").cloned().unwrap();
        hero.borrow_mut().frame(16.0).unwrap();
        assert_eq!(hero.borrow().uniforms().colors(), &AURORA_DEFAULT);
        assert!(backend.log().draws >= 1);
        assert_eq!(backend.log().last_vertex_count, 65 * 65);
        assert_eq!(frames.requested(), 2);
    }
}
