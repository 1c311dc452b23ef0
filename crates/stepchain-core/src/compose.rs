//! # Composition Helpers
//!
//! Small synchronous callbacks meant to be handed to `then`.

use std::fmt::Debug;

/// A boxed value-to-value callback.
pub type Callback<T> = Box<dyn FnOnce(T) -> T + Send>;

/// Combine callbacks into one that applies them left to right.
#[must_use]
pub fn in_order<T: 'static>(
    callbacks: Vec<Callback<T>>,
) -> impl FnOnce(T) -> T + Send + 'static {
    move |initial| callbacks.into_iter().fold(initial, |value, callback| callback(value))
}

/// A pass-through callback that logs the value it sees.
#[must_use]
pub fn log_value<T: Debug + 'static>(
    label: &'static str,
) -> impl Fn(T) -> T + Send + Sync + Clone + 'static {
    move |value| {
        tracing::info!(stage = label, value = ?value, "chain value");
        value
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::writer::MakeWriter;

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct CaptureMakeWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    struct CaptureWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl<'a> MakeWriter<'a> for CaptureMakeWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CaptureWriter {
                buffer: self.buffer.clone(),
            }
        }
    }

    impl Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buffer.lock().expect("mutex poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CaptureMakeWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buffer.lock().expect("mutex poisoned")).into_owned()
        }
    }

    #[test]
    fn in_order_applies_left_to_right() {
        let steps: Vec<Callback<i32>> = vec![Box::new(|v| v + 1), Box::new(|v| v * 7)];
        let combined = in_order(steps);
        assert_eq!(combined(2), 21);
    }

    #[test]
    fn in_order_empty_is_identity() {
        let combined = in_order::<&str>(Vec::new());
        assert_eq!(combined("same"), "same");
    }

    #[test]
    fn log_value_is_identity() {
        let log = log_value::<Vec<u8>>("bytes");
        assert_eq!(log(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn log_value_emits_label_and_value() {
        let capture = CaptureMakeWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();

        let log = log_value::<i32>("logger");
        let passed = tracing::subscriber::with_default(subscriber, || log(3));
        assert_eq!(passed, 3);

        let output = capture.contents();
        assert!(output.contains("INFO"), "missing level: {output}");
        assert!(output.contains("logger"), "missing label: {output}");
        assert!(output.contains("value=3"), "missing value: {output}");
    }
}
