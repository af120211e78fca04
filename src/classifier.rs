// Tilt Guard: Gesture Classifier Interface
//
// The gesture model is treated as an opaque function from a window of
// accelerometer samples to one probability per gesture.
//
// Back-ends:
//   1. STUB (default): a motion heuristic so the rest of the runtime can be
//      developed and tested without the C++ inference SDK compiled in.
//   2. FFI: enable the `edge-impulse` feature; build.rs compiles the exported
//      magic-wand model and `EdgeImpulseClassifier` links against it.
//
// The gesture loop feeds the classifier a flattened window of
// `seq_length × 3` floats (x, y, z interleaved, oldest first).

use crate::config::{GestureConfig, GESTURE_CHANNELS, GESTURE_LABEL_COUNT};
use crate::error::{Error, Result};
use crate::events::AccelSample;

/// Shape a model was exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub input_len: usize,
    pub label_count: usize,
}

pub trait Classifier {
    fn spec(&self) -> ModelSpec;

    /// Run one inference. `input.len() == spec().input_len`,
    /// `output.len() == spec().label_count`.
    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<()>;
}

/// One-time startup check: the model must match the configured window and
/// gesture set, otherwise the gesture loop cannot run at all.
pub fn verify_model(spec: ModelSpec, config: &GestureConfig) -> Result<()> {
    let expected_input = config.input_len();
    if spec.input_len != expected_input || spec.label_count != GESTURE_LABEL_COUNT {
        return Err(Error::ModelSchema {
            expected_input,
            expected_labels: GESTURE_LABEL_COUNT,
            input: spec.input_len,
            labels: spec.label_count,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rolling input window
// ---------------------------------------------------------------------------

/// Ring buffer of the most recent `seq_length` samples.
#[derive(Debug, Clone)]
pub struct GestureWindow {
    samples: Vec<[f32; GESTURE_CHANNELS]>,
    head: usize,
    filled: usize,
}

impl GestureWindow {
    pub fn new(seq_length: usize) -> Self {
        Self {
            samples: vec![[0.0; GESTURE_CHANNELS]; seq_length],
            head: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, sample: AccelSample) {
        if self.samples.is_empty() {
            return;
        }
        self.samples[self.head] = [sample.x as f32, sample.y as f32, sample.z as f32];
        self.head = (self.head + 1) % self.samples.len();
        self.filled = (self.filled + 1).min(self.samples.len());
    }

    /// A full window of fresh samples is available.
    pub fn is_ready(&self) -> bool {
        !self.samples.is_empty() && self.filled == self.samples.len()
    }

    /// Forget everything; the next inference waits for a whole new window.
    pub fn clear(&mut self) {
        self.head = 0;
        self.filled = 0;
    }

    /// Copy the window, oldest sample first, into `out`.
    pub fn flatten_into(&self, out: &mut [f32]) {
        let len = self.samples.len();
        let oldest = if self.filled == len { self.head } else { 0 };
        let frames = (0..self.filled).map(|i| &self.samples[(oldest + i) % len]);
        for (dst, frame) in out.chunks_exact_mut(GESTURE_CHANNELS).zip(frames) {
            dst.copy_from_slice(frame);
        }
    }
}

// ---------------------------------------------------------------------------
// Stub back-end: development / testing without the C++ SDK
// ---------------------------------------------------------------------------

/// Guesses a gesture from which axis moved the most over the window.
/// Quiet windows produce a flat distribution that never clears the cutoff.
#[derive(Debug, Clone)]
pub struct StubClassifier {
    input_len: usize,
    /// Peak-to-peak swing (raw units) below which the board counts as still.
    pub motion_floor: f32,
}

impl StubClassifier {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            input_len: config.input_len(),
            motion_floor: 2000.0,
        }
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new(&GestureConfig::default())
    }
}

impl Classifier for StubClassifier {
    fn spec(&self) -> ModelSpec {
        ModelSpec {
            input_len: self.input_len,
            label_count: GESTURE_LABEL_COUNT,
        }
    }

    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        if input.len() != self.input_len || output.len() != GESTURE_LABEL_COUNT {
            return Err(Error::Inference(-1));
        }

        let mut swing = [0.0f32; GESTURE_CHANNELS];
        for (axis, s) in swing.iter_mut().enumerate() {
            let values = input.iter().skip(axis).step_by(GESTURE_CHANNELS);
            let (lo, hi) = values.fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            *s = hi - lo;
        }

        let (axis, &peak) = swing
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .ok_or(Error::Inference(-2))?;

        if peak < self.motion_floor {
            output.fill(1.0 / GESTURE_LABEL_COUNT as f32);
        } else {
            output.fill(0.05);
            output[axis % GESTURE_LABEL_COUNT] = 0.9;
        }

        log::debug!("STUB inference: swing = {:?}, preds = {:?}", swing, output);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Real FFI back-end: calls the compiled C++ inference library
// ---------------------------------------------------------------------------
#[cfg(feature = "edge-impulse")]
mod ffi {
    use std::ffi::c_char;

    #[repr(C)]
    pub struct EiSignal {
        pub get_data: Option<unsafe extern "C" fn(usize, usize, *mut f32) -> i32>,
        pub total_length: usize,
    }

    #[repr(C)]
    pub struct EiClassification {
        pub label: *const c_char,
        pub value: f32,
    }

    // Only the leading `classification` block is read.
    #[repr(C)]
    pub struct EiImpulseResult {
        pub classification: [EiClassification; super::GESTURE_LABEL_COUNT],
        pub anomaly: f32,
    }

    extern "C" {
        pub fn run_classifier(signal: *mut EiSignal, result: *mut EiImpulseResult, debug: bool) -> i32;
    }
}

/// Classifier backed by the linked model. The exported model's shape is
/// fixed at build time.
#[cfg(feature = "edge-impulse")]
#[derive(Debug, Default)]
pub struct EdgeImpulseClassifier;

#[cfg(feature = "edge-impulse")]
impl Classifier for EdgeImpulseClassifier {
    fn spec(&self) -> ModelSpec {
        ModelSpec {
            input_len: crate::config::GESTURE_INPUT_LEN,
            label_count: GESTURE_LABEL_COUNT,
        }
    }

    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        use std::cell::Cell;
        use std::ffi::CStr;

        // The SDK pulls input through a C callback; the window is parked in a
        // thread-local for the duration of the call.
        thread_local! {
            static SIGNAL: Cell<(*const f32, usize)> = const { Cell::new((std::ptr::null(), 0)) };
        }

        unsafe extern "C" fn get_data(offset: usize, length: usize, out: *mut f32) -> i32 {
            SIGNAL.with(|s| {
                let (buf, len) = s.get();
                if buf.is_null() || offset + length > len {
                    return -1;
                }
                // SAFETY: bounds checked above; `buf` outlives the run_classifier call.
                unsafe { core::ptr::copy_nonoverlapping(buf.add(offset), out, length) };
                0
            })
        }

        if input.len() != crate::config::GESTURE_INPUT_LEN || output.len() != GESTURE_LABEL_COUNT {
            return Err(Error::Inference(-1));
        }

        SIGNAL.with(|s| s.set((input.as_ptr(), input.len())));
        let mut signal = ffi::EiSignal {
            get_data: Some(get_data),
            total_length: input.len(),
        };
        // SAFETY: plain C struct, all-zero is a valid initial state.
        let mut result: ffi::EiImpulseResult = unsafe { core::mem::zeroed() };
        // SAFETY: `signal` and `result` are valid for the whole call.
        let err = unsafe { ffi::run_classifier(&mut signal, &mut result, false) };
        SIGNAL.with(|s| s.set((std::ptr::null(), 0)));

        if err != 0 {
            return Err(Error::Inference(err));
        }

        for (slot, class) in output.iter_mut().zip(result.classification.iter()) {
            *slot = class.value;
            // SAFETY: the SDK hands out static, NUL-terminated label strings.
            let label = unsafe { CStr::from_ptr(class.label) };
            log::debug!("{}: {:.4}", label.to_str().unwrap_or("?"), class.value);
        }
        Ok(())
    }
}
