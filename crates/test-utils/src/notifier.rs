use std::path::PathBuf;
use std::sync::Mutex;

use assetflow::notifier::Notifier;

/// Notifier that remembers every reload request.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<Vec<PathBuf>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changed paths of each reload, in call order.
    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn reload(&self, changed: &[PathBuf]) {
        self.calls.lock().unwrap().push(changed.to_vec());
    }
}
