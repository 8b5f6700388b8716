//! Common test helper functions.
//!
//! Scenario file serialization and an event recorder for integration tests.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use pkgprobe::engine::{EventListener, Stage};
use pkgprobe::model::Scenario;

/// Write scenarios to a JSON file as a bare array.
///
/// # Panics
///
/// Panics if serialization or file writing fails.
pub fn write_scenarios(path: &Path, scenarios: &[Scenario]) {
    let data = serde_json::to_vec_pretty(scenarios).expect("failed to serialize scenarios");
    fs::write(path, data).expect("failed to write scenario file");
}

/// A listener that records every event for assertions.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<(Stage, String)>>,
}

impl CollectingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Stage, String)> {
        self.events
            .lock()
            .expect("listener mutex poisoned - prior panic during event collection")
            .clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.events().into_iter().map(|(stage, _)| stage).collect()
    }
}

impl EventListener for CollectingListener {
    fn on_event(&self, stage: Stage, message: &str) {
        self.events
            .lock()
            .expect("listener mutex poisoned")
            .push((stage, message.to_string()));
    }
}
