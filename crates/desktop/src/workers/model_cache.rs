use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use facetone_core::analysis::face_analyzer::DetectAndClassify;
use facetone_core::shared::constants::{
    EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facetone_core::shared::model_resolver;

/// Resolves both models on a background thread at startup so workers
/// rarely have to wait for a download.
pub struct ModelCache {
    detector: Arc<ModelSlot>,
    expression: Arc<ModelSlot>,
}

struct ModelSlot {
    result: Mutex<Option<Result<PathBuf, String>>>,
    ready: Condvar,
    progress: Mutex<(u64, u64)>,
}

impl ModelCache {
    pub fn new() -> Arc<Self> {
        let cache = Arc::new(Self {
            detector: Arc::new(ModelSlot::new()),
            expression: Arc::new(ModelSlot::new()),
        });

        let detector = cache.detector.clone();
        let expression = cache.expression.clone();
        thread::spawn(move || {
            detector.resolve(YOLO_MODEL_NAME, YOLO_MODEL_URL);
            expression.resolve(EXPRESSION_MODEL_NAME, EXPRESSION_MODEL_URL);
        });

        cache
    }

    /// Blocks until both models are available and loads them into an analyzer.
    ///
    /// `on_progress(downloaded, total)` is forwarded while a download runs.
    /// Returns early with an error once `cancelled` is set.
    pub fn analyzer(
        &self,
        confidence: f64,
        on_progress: &dyn Fn(u64, u64),
        cancelled: &AtomicBool,
    ) -> Result<DetectAndClassify, String> {
        let detector_model = self.detector.wait(on_progress, cancelled)?;
        let expression_model = self.expression.wait(on_progress, cancelled)?;
        DetectAndClassify::from_models(&detector_model, &expression_model, confidence)
            .map_err(|e| e.to_string())
    }
}

impl ModelSlot {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
            progress: Mutex::new((0, 0)),
        }
    }

    fn resolve(self: &Arc<Self>, name: &str, url: &str) {
        let slot = self.clone();
        let result = model_resolver::resolve(
            name,
            url,
            None,
            Some(Box::new(move |downloaded, total| {
                *slot.progress.lock().unwrap_or_else(PoisonError::into_inner) = (downloaded, total);
            })),
        );
        if let Err(ref e) = result {
            log::error!("Failed to resolve {name}: {e}");
        }
        self.fill(result.map_err(|e| e.to_string()));
    }

    fn fill(&self, result: Result<PathBuf, String>) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        self.ready.notify_all();
    }

    fn wait(
        &self,
        on_progress: &dyn Fn(u64, u64),
        cancelled: &AtomicBool,
    ) -> Result<PathBuf, String> {
        let mut guard = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if cancelled.load(Ordering::Relaxed) {
                return Err("Cancelled".into());
            }
            if let Some(ref result) = *guard {
                return result.clone();
            }
            if let Ok(progress) = self.progress.try_lock() {
                let (downloaded, total) = *progress;
                if total > 0 {
                    on_progress(downloaded, total);
                }
            }
            guard = self
                .ready
                .wait_timeout(guard, Duration::from_millis(100))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_wait_returns_filled_result() {
        let slot = ModelSlot::new();
        slot.fill(Ok(PathBuf::from("/models/a.onnx")));
        let path = slot.wait(&|_, _| {}, &AtomicBool::new(false)).unwrap();
        assert_eq!(path, PathBuf::from("/models/a.onnx"));
    }

    #[test]
    fn test_wait_returns_resolve_error() {
        let slot = ModelSlot::new();
        slot.fill(Err("offline".into()));
        let err = slot.wait(&|_, _| {}, &AtomicBool::new(false)).unwrap_err();
        assert_eq!(err, "offline");
    }

    #[test]
    fn test_wait_stops_when_cancelled() {
        let slot = ModelSlot::new();
        let err = slot.wait(&|_, _| {}, &AtomicBool::new(true)).unwrap_err();
        assert_eq!(err, "Cancelled");
    }

    #[test]
    fn test_wait_wakes_when_filled_from_another_thread() {
        let slot = Arc::new(ModelSlot::new());
        let filler = slot.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            filler.fill(Ok(PathBuf::from("late.onnx")));
        });
        let path = slot.wait(&|_, _| {}, &AtomicBool::new(false)).unwrap();
        handle.join().unwrap();
        assert_eq!(path, PathBuf::from("late.onnx"));
    }

    #[test]
    fn test_wait_forwards_download_progress() {
        let slot = Arc::new(ModelSlot::new());
        *slot.progress.lock().unwrap() = (10, 100);
        let filler = slot.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            filler.fill(Ok(PathBuf::from("m.onnx")));
        });
        let calls = AtomicUsize::new(0);
        slot.wait(
            &|downloaded, total| {
                assert_eq!((downloaded, total), (10, 100));
                calls.fetch_add(1, Ordering::Relaxed);
            },
            &AtomicBool::new(false),
        )
        .unwrap();
        handle.join().unwrap();
        assert!(calls.load(Ordering::Relaxed) >= 1);
    }
}
