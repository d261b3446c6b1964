//! Shared fixtures for navigation integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lattice_nav::prelude::*;
use parking_lot::Mutex;
use tokio::sync::Notify;

/// An ordered record of everything the fixtures observed.
#[derive(Clone, Default)]
pub struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Lines recorded for one screen, without the screen prefix.
    pub fn of(&self, screen: &str) -> Vec<String> {
        let prefix = format!("{screen}:");
        self.lines
            .lock()
            .iter()
            .filter_map(|line| line.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn count(&self, line: &str) -> usize {
        self.lines.lock().iter().filter(|l| *l == line).count()
    }

    pub fn position(&self, line: &str) -> Option<usize> {
        self.lines.lock().iter().position(|l| l == line)
    }
}

/// A screen whose every lifecycle call is journaled.
pub struct Scripted {
    name: String,
    journal: Journal,
    fail_construct: bool,
    fail_initialize: bool,
    panic_initialize: bool,
    initialize_gate: Option<Arc<Notify>>,
    enter_gate: Option<Arc<Notify>>,
    assets: Vec<&'static str>,
}

impl Scripted {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            fail_construct: false,
            fail_initialize: false,
            panic_initialize: false,
            initialize_gate: None,
            enter_gate: None,
            assets: Vec::new(),
        }
    }

    pub fn failing_construct(mut self) -> Self {
        self.fail_construct = true;
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn panicking_initialize(mut self) -> Self {
        self.panic_initialize = true;
        self
    }

    /// Hold `initialize` until the gate is notified.
    pub fn gate_initialize(mut self, gate: &Arc<Notify>) -> Self {
        self.initialize_gate = Some(gate.clone());
        self
    }

    /// Hold `enter` until the gate is notified.
    pub fn gate_enter(mut self, gate: &Arc<Notify>) -> Self {
        self.enter_gate = Some(gate.clone());
        self
    }

    /// Load `key` during initialization.
    pub fn loading(mut self, key: &'static str) -> Self {
        self.assets.push(key);
        self
    }

    fn log(&self, what: impl std::fmt::Display) {
        self.journal.record(format!("{}:{what}", self.name));
    }
}

impl Screen for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, cx: &ScreenContext) -> NavResult<()> {
        self.log("construct");
        if self.fail_construct {
            return Err(NavError::screen("construct failed"));
        }
        let journal = self.journal.clone();
        let name = self.name.clone();
        cx.scope().register(move || journal.record(format!("{name}:release")))?;
        Ok(())
    }

    fn initialize<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            self.log("initialize");
            if let Some(gate) = &self.initialize_gate {
                gate.notified().await;
            }
            for key in &self.assets {
                cx.load_asset(key).await?;
            }
            if self.fail_initialize {
                return Err(NavError::screen("initialize failed"));
            }
            if self.panic_initialize {
                panic!("{} blew up while initializing", self.name);
            }
            Ok(())
        })
    }

    fn enter<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.log("enter");
            if let Some(gate) = &self.enter_gate {
                gate.notified().await;
            }
        })
    }

    fn exit<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.log("exit");
        })
    }

    fn set_interactive(&self, interactive: bool) {
        self.log(format!("interactive={interactive}"));
    }

    fn dispose(&self, _cx: &ScreenContext) {
        self.log("dispose");
    }
}

/// Intents used by routed tests.
#[derive(Debug, Clone)]
pub enum Intent {
    Show(ContainerKind, &'static str),
    Close(ContainerKind),
    Back,
    Unknown,
}

/// A router that builds a [`Scripted`] screen per `Show` intent.
pub fn scripted_router(
    journal: &Journal,
) -> impl Fn(Intent, &TransitionHandle<Intent>) -> NavResult<NavCommand> + Send + Sync + 'static {
    let journal = journal.clone();
    move |intent: Intent, _: &TransitionHandle<Intent>| -> NavResult<NavCommand> {
        match intent {
            Intent::Show(kind, name) => Ok(NavCommand::push(kind, Scripted::new(name, &journal))),
            Intent::Close(kind) => Ok(NavCommand::pop(kind)),
            Intent::Back => Ok(NavCommand::PopActive),
            Intent::Unknown => Err(NavError::InvalidIntent("unknown intent".into())),
        }
    }
}

/// An authority with default config and a throwaway journal for routed screens.
pub fn authority() -> TransitionAuthority<Intent> {
    TransitionAuthority::new(scripted_router(&Journal::new()))
}

/// An in-memory asset resolver that counts loads and releases.
#[derive(Default)]
pub struct MemoryAssets {
    assets: HashMap<&'static str, &'static str>,
    pub loads: AtomicUsize,
    pub releases: AtomicUsize,
}

impl MemoryAssets {
    pub fn with(entries: &[(&'static str, &'static str)]) -> Arc<Self> {
        Arc::new(Self {
            assets: entries.iter().copied().collect(),
            ..Default::default()
        })
    }

    pub fn live(&self) -> usize {
        self.loads.load(Ordering::SeqCst) - self.releases.load(Ordering::SeqCst)
    }
}

impl AssetResolver for MemoryAssets {
    fn load<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<AssetHandle, AssetError>> {
        let found = self
            .assets
            .get(key)
            .map(|value| AssetHandle::new(key.to_string(), value.to_string()))
            .ok_or_else(|| AssetError::AssetNotFound(key.to_string()));
        if found.is_ok() {
            self.loads.fetch_add(1, Ordering::SeqCst);
        }
        ready(found)
    }

    fn release(&self, _handle: &AssetHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
