// SPDX-FileCopyrightText: 2026 Hatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hooks that call back into the manager, and lifecycle serialization
//! across threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::Duration;

use hatch_core::{LifecycleState, PluginError};
use hatch_plugin::{
    Archive, CodeLinker, Plugin, PluginDescriptor, PluginHandle, PluginLifecycleManager,
    SymbolTable,
};
use hatch_test_utils::PluginSpec;
use tracing_test::traced_test;

/// What a plugin's `on_enable` does besides succeeding.
#[derive(Debug, Clone, Copy)]
enum OnEnable {
    Nothing,
    /// Disable the plugin itself.
    DisableSelf,
    /// Enable the plugin called `Helper`.
    EnableHelper,
    /// Report that the hook started, then wait to be released.
    Block,
}

/// State shared between the test body and the plugins it loads.
#[derive(Default)]
struct Wiring {
    manager: OnceLock<Weak<PluginLifecycleManager>>,
    plugins: Mutex<HashMap<String, PluginHandle>>,
    nested: Mutex<Vec<(String, bool)>>,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl Wiring {
    fn handle(&self, name: &str) -> Option<PluginHandle> {
        self.plugins.lock().unwrap().get(name).cloned()
    }

    fn manager(&self) -> Option<Arc<PluginLifecycleManager>> {
        self.manager.get().and_then(Weak::upgrade)
    }
}

struct WiredPlugin {
    name: String,
    action: OnEnable,
    wiring: Arc<Wiring>,
}

impl Plugin for WiredPlugin {
    fn on_enable(&mut self) -> Result<(), PluginError> {
        match self.action {
            OnEnable::Nothing => {}
            OnEnable::DisableSelf => {
                let (Some(manager), Some(me)) =
                    (self.wiring.manager(), self.wiring.handle(&self.name))
                else {
                    return Err(PluginError::failed("wiring incomplete"));
                };
                let changed = manager.disable(&me);
                let entry = (format!("disable {}", self.name), changed);
                self.wiring.nested.lock().unwrap().push(entry);
            }
            OnEnable::EnableHelper => {
                let (Some(manager), Some(helper)) =
                    (self.wiring.manager(), self.wiring.handle("Helper"))
                else {
                    return Err(PluginError::failed("wiring incomplete"));
                };
                let changed = manager.enable(&helper);
                let entry = ("enable Helper".to_string(), changed);
                self.wiring.nested.lock().unwrap().push(entry);
            }
            OnEnable::Block => {
                if let Some(entered) = self.wiring.entered.lock().unwrap().take() {
                    let _ = entered.send(());
                }
                let release = self.wiring.release.lock().unwrap().take();
                if let Some(release) = release {
                    let _ = release.recv_timeout(Duration::from_secs(10));
                }
            }
        }
        Ok(())
    }
}

struct WiredLinker {
    actions: HashMap<String, OnEnable>,
    wiring: Arc<Wiring>,
}

impl CodeLinker for WiredLinker {
    fn link(
        &self,
        descriptor: &PluginDescriptor,
        _archive: &dyn Archive,
        table: &mut SymbolTable,
    ) -> Result<(), PluginError> {
        let name = descriptor.name.clone();
        let action = self.actions.get(&name).copied().unwrap_or(OnEnable::Nothing);
        let wiring = Arc::clone(&self.wiring);
        table.define_plugin(descriptor.main.clone(), move || WiredPlugin {
            name: name.clone(),
            action,
            wiring: Arc::clone(&wiring),
        });
        Ok(())
    }
}

fn wired(actions: &[(&str, OnEnable)]) -> (Arc<PluginLifecycleManager>, Arc<Wiring>) {
    let wiring = Arc::new(Wiring::default());
    let linker = WiredLinker {
        actions: actions.iter().map(|(n, a)| (n.to_string(), *a)).collect(),
        wiring: Arc::clone(&wiring),
    };
    let manager = Arc::new(
        PluginLifecycleManager::builder(Arc::new(linker))
            .build()
            .expect("manager should build"),
    );
    let _ = wiring.manager.set(Arc::downgrade(&manager));
    (manager, wiring)
}

fn load(manager: &PluginLifecycleManager, wiring: &Wiring, name: &str) -> PluginHandle {
    let plugin = manager
        .load(&PluginSpec::new(name).memory(), false)
        .expect("plugin should load");
    wiring
        .plugins
        .lock()
        .unwrap()
        .insert(name.to_string(), Arc::clone(&plugin));
    plugin
}

#[test]
#[traced_test]
fn hook_disabling_its_own_plugin_is_refused() {
    let (manager, wiring) = wired(&[("Loop", OnEnable::DisableSelf)]);
    let plugin = load(&manager, &wiring, "Loop");

    assert!(manager.enable(&plugin));
    assert_eq!(plugin.state(), LifecycleState::Enabled);
    assert_eq!(
        *wiring.nested.lock().unwrap(),
        vec![("disable Loop".to_string(), false)]
    );
    assert!(logs_contain("tried to change its own lifecycle state"));

    assert!(manager.disable(&plugin));
    assert_eq!(plugin.state(), LifecycleState::Disabled);
}

#[test]
fn hook_may_enable_another_plugin() {
    let (manager, wiring) = wired(&[("Starter", OnEnable::EnableHelper)]);
    let helper = load(&manager, &wiring, "Helper");
    let starter = load(&manager, &wiring, "Starter");

    assert!(manager.enable(&starter));
    assert!(helper.is_enabled());
    assert_eq!(
        *wiring.nested.lock().unwrap(),
        vec![("enable Helper".to_string(), true)]
    );
}

#[test]
fn load_waits_for_a_running_hook_on_another_thread() {
    let (manager, wiring) = wired(&[("Slow", OnEnable::Block)]);
    let slow = load(&manager, &wiring, "Slow");

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    *wiring.entered.lock().unwrap() = Some(entered_tx);
    *wiring.release.lock().unwrap() = Some(release_rx);

    let loaded = AtomicBool::new(false);
    std::thread::scope(|s| {
        let enabling = s.spawn(|| manager.enable(&slow));
        entered_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("hook should start");

        let loading = s.spawn(|| {
            let result = manager.load(&PluginSpec::new("Later").memory(), false);
            loaded.store(true, Ordering::SeqCst);
            result
        });

        std::thread::sleep(Duration::from_millis(150));
        assert!(!loaded.load(Ordering::SeqCst), "load ran while a hook held the lifecycle");

        release_tx.send(()).unwrap();
        assert!(enabling.join().unwrap());
        assert!(loading.join().unwrap().is_ok());
    });

    assert!(loaded.load(Ordering::SeqCst));
    assert_eq!(manager.registry().names(), vec!["Slow", "Later"]);
}
