//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use docsieve::core::config::ExtractionConfig;
use docsieve::plugins::{DocumentExtractor, NativeLockScope, Plugin};
use docsieve::types::ExtractionResult;
use docsieve::{DocsieveError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

type Script = dyn Fn(usize, &[u8], &ExtractionConfig) -> Result<String> + Send + Sync;

/// Extractor whose output is decided by a closure.
///
/// The closure receives the zero-based call number, the input bytes and the
/// config. Calls, and the peak number of calls running at once, are counted.
pub struct ScriptedExtractor {
    name: &'static str,
    mime_types: Vec<&'static str>,
    delay: Duration,
    lock: NativeLockScope,
    task_memory_mb: Option<f64>,
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    script: Box<Script>,
}

impl ScriptedExtractor {
    pub fn new(name: &'static str, mime_type: &'static str) -> Self {
        Self {
            name,
            mime_types: vec![mime_type],
            delay: Duration::ZERO,
            lock: NativeLockScope::None,
            task_memory_mb: None,
            calls: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            script: Box::new(|_, bytes, _| Ok(String::from_utf8_lossy(bytes).into_owned())),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn native_lock(mut self, lock: NativeLockScope, task_memory_mb: Option<f64>) -> Self {
        self.lock = lock;
        self.task_memory_mb = task_memory_mb;
        self
    }

    pub fn script(
        mut self,
        script: impl Fn(usize, &[u8], &ExtractionConfig) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.script = Box::new(script);
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn peak(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }

    fn enter(&self) -> usize {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst)
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn finish(&self, call: usize, content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let outcome = (self.script)(call, content, config).map(|text| ExtractionResult::new(text, mime_type));
        self.leave();
        outcome
    }
}

impl Plugin for ScriptedExtractor {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> String {
        "0.0.1".to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DocumentExtractor for ScriptedExtractor {
    async fn extract_bytes(&self, content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let call = self.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.finish(call, content, mime_type, config)
    }

    fn extract_bytes_sync(&self, content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let call = self.enter();
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.finish(call, content, mime_type, config)
    }

    fn supported_mime_types(&self) -> &[&str] {
        &self.mime_types
    }

    fn priority(&self) -> i32 {
        100
    }

    fn native_lock(&self) -> NativeLockScope {
        self.lock
    }

    fn task_memory_mb(&self) -> Option<f64> {
        self.task_memory_mb
    }
}

/// Register `extractor` and return its call counter.
pub fn register(extractor: ScriptedExtractor) -> Arc<AtomicUsize> {
    let calls = extractor.calls();
    docsieve::plugins::register_extractor(Arc::new(extractor)).expect("register extractor");
    calls
}

pub fn parsing_error(message: &str) -> DocsieveError {
    DocsieveError::parsing(message)
}

pub fn no_cache() -> ExtractionConfig {
    ExtractionConfig {
        use_cache: false,
        ..Default::default()
    }
}
