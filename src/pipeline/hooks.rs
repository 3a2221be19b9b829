//! Hook library lifecycle: load, register, unload.

use std::sync::Arc;

use tracing::{error, info};

use super::{Callouts, PipelineController};
use crate::config::Config;
use crate::error::Result;
use crate::sink::{AuditSink, FileAuditSink};

/// Callouts may run concurrently on several host worker threads.
pub const MULTI_THREADING_COMPATIBLE: bool = true;

/// The host's extension point for stage callouts.
pub trait CalloutRegistry {
    fn register(&mut self, callouts: Arc<dyn Callouts>);
}

impl CalloutRegistry for Vec<Arc<dyn Callouts>> {
    fn register(&mut self, callouts: Arc<dyn Callouts>) {
        self.push(callouts);
    }
}

/// A loaded hook: the controller the host was given, kept for unload.
pub struct Engine<S: AuditSink = FileAuditSink> {
    controller: Arc<PipelineController<S>>,
}

impl<S: AuditSink + 'static> Engine<S> {
    /// Build a controller over an already-started sink and register it.
    pub fn with_sink(config: &Config, sink: S, registry: &mut dyn CalloutRegistry) -> Self {
        let controller = Arc::new(PipelineController::from_config(config, Arc::new(sink)));
        registry.register(controller.clone());
        info!(
            "Relay hook registered ({} rule(s), {} matching, multi-threaded: {})",
            config.rules.len(),
            config.match_mode,
            MULTI_THREADING_COMPATIBLE
        );
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<PipelineController<S>> {
        &self.controller
    }

    /// Flush and close the sink.
    pub fn unload(self) {
        self.controller.sink().on_stop();
        info!("Relay hook unloaded");
    }
}

/// Start the audit file and register the pipeline with `registry`.
///
/// Fails without registering anything if the audit file cannot be opened.
pub fn load(config: &Config, registry: &mut dyn CalloutRegistry) -> Result<Engine> {
    let sink = FileAuditSink::start(&config.audit_path).map_err(|e| {
        error!("Relay hook failed to load: {}", e);
        e
    })?;
    Ok(Engine::with_sink(config, sink, registry))
}

/// Status code for a C-style `load` entry point: 0 on success, 1 on failure.
pub fn load_status<T, E>(result: &std::result::Result<T, E>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, InitError};
    use tempfile::TempDir;

    #[test]
    fn test_load_registers_once() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            audit_path: temp.path().join("audit.log"),
            ..Config::default()
        };
        let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();

        let result = load(&config, &mut registry);
        assert_eq!(load_status(&result), 0);
        assert_eq!(registry.len(), 1);

        result.unwrap().unload();
        let content = std::fs::read_to_string(&config.audit_path).unwrap();
        assert!(content.ends_with("Relay hook unloaded\n"));
    }

    #[test]
    fn test_load_fails_without_registering() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            audit_path: temp.path().join("missing").join("audit.log"),
            ..Config::default()
        };
        let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();

        let result = load(&config, &mut registry);
        assert_eq!(load_status(&result), 1);
        assert!(matches!(result, Err(Error::Init(InitError::Open { .. }))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declares_multi_threading() {
        assert!(MULTI_THREADING_COMPATIBLE);
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineController<FileAuditSink>>();
    }
}
