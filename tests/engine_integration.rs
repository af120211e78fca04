//! End-to-end tests for the Tilt Guard engine.
//!
//! The tasks are driven one `step()` at a time against scripted hardware so
//! every poll is deterministic:
//!
//! - Detection: baseline, crossings, session cap, auto-idle and re-entry
//! - Gesture: windowing, debouncing, threshold stepping, model schema check
//! - Commands and button: mode selection and threshold report over the queue

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tiltguard::classifier::{Classifier, ModelSpec};
use tiltguard::config::{GestureConfig, TiltConfig, CELL_ANGLE_VALUE, CELL_THRESHOLD_VALUE};
use tiltguard::gateway::CommandGateway;
use tiltguard::input::{ButtonInput, ButtonLine};
use tiltguard::mode::ModeController;
use tiltguard::peripherals::{AccelerometerSource, Display, EventPublisher, FlagIndicator};
use tiltguard::tasks::command::{command_task, ButtonTask};
use tiltguard::tasks::detection::DetectionTask;
use tiltguard::tasks::gesture::GestureTask;
use tiltguard::tasks::publish::{self, PublishQueue, PublishTask};
use tiltguard::threshold::ThresholdStore;
use tiltguard::tilt::TiltMonitor;
use tiltguard::{AccelSample, Error, Gesture, Mode, PublishEvent, PublishRequest, Result};

// ===== TEST CONSTANTS =====

const TOPIC: &str = "tiltguard";

/// Board lying flat: 1 g on Z.
const FLAT: AccelSample = AccelSample::new(0, 0, 16384);
/// Rotated 45° about X.
const TILTED_45: AccelSample = AccelSample::new(0, 11585, 11585);

// ===== SCRIPTED HARDWARE =====

/// Plays back a script; once exhausted, keeps returning the last entry.
#[derive(Clone)]
struct ScriptedImu {
    script: Arc<Mutex<VecDeque<Result<AccelSample>>>>,
    last: Arc<Mutex<Result<AccelSample>>>,
    reads: Arc<Mutex<usize>>,
}

impl ScriptedImu {
    fn new(script: impl IntoIterator<Item = Result<AccelSample>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            last: Arc::new(Mutex::new(Err(Error::SensorMiss))),
            reads: Arc::new(Mutex::new(0)),
        }
    }

    fn steady(sample: AccelSample) -> Self {
        let imu = Self::new([]);
        *imu.last.lock().unwrap() = Ok(sample);
        imu
    }

    fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

impl AccelerometerSource for ScriptedImu {
    fn read(&mut self) -> Result<AccelSample> {
        *self.reads.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Emits whatever probabilities the test last put into `output`.
#[derive(Clone)]
struct ScriptedClassifier {
    spec: ModelSpec,
    output: Arc<Mutex<Vec<f32>>>,
    inferences: Arc<Mutex<usize>>,
}

impl ScriptedClassifier {
    fn new(config: &GestureConfig) -> Self {
        Self {
            spec: ModelSpec {
                input_len: config.input_len(),
                label_count: 3,
            },
            output: Arc::new(Mutex::new(vec![0.34, 0.33, 0.33])),
            inferences: Arc::new(Mutex::new(0)),
        }
    }

    fn emit(&self, gesture: Option<Gesture>) {
        let mut out = vec![0.05; 3];
        match gesture {
            Some(g) => out[g.index()] = 0.9,
            None => out = vec![0.34, 0.33, 0.33],
        }
        *self.output.lock().unwrap() = out;
    }

    fn inferences(&self) -> usize {
        *self.inferences.lock().unwrap()
    }
}

impl Classifier for ScriptedClassifier {
    fn spec(&self) -> ModelSpec {
        self.spec
    }

    fn infer(&mut self, input: &[f32], output: &mut [f32]) -> Result<()> {
        assert_eq!(input.len(), self.spec.input_len);
        *self.inferences.lock().unwrap() += 1;
        output.copy_from_slice(&self.output.lock().unwrap());
        Ok(())
    }
}

/// Remembers the latest text written to each cell.
#[derive(Clone, Default)]
struct Screen(Arc<Mutex<Vec<((u8, u8), String)>>>);

impl Screen {
    fn cell(&self, cell: (u8, u8)) -> Option<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, _)| *c == cell)
            .map(|(_, t)| t.clone())
    }
}

impl Display for Screen {
    fn write_at(&mut self, col: u8, row: u8, text: &str) -> Result<()> {
        self.0.lock().unwrap().push(((col, row), text.to_string()));
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.0.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    events: Vec<PublishEvent>,
}

impl EventPublisher for Recorder {
    fn publish(&mut self, event: PublishEvent) -> Result<()> {
        self.events.push(event);
        Ok(())
    }
}

// ===== HELPERS =====

struct Shared {
    threshold: Arc<ThresholdStore>,
    mode: Arc<ModeController>,
}

impl Shared {
    fn new() -> Self {
        Self {
            threshold: Arc::new(ThresholdStore::default()),
            mode: Arc::new(ModeController::new()),
        }
    }
}

type Detection = DetectionTask<ScriptedImu, Screen, FlagIndicator, FlagIndicator, PublishQueue>;

fn detection(shared: &Shared, imu: ScriptedImu, screen: Screen) -> (Detection, FlagIndicator, FlagIndicator, Receiver<PublishRequest>) {
    let (queue, rx) = publish::queue();
    let monitor = TiltMonitor::new(
        TiltConfig::default(),
        TOPIC,
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
        queue,
    );
    let led = FlagIndicator::new();
    let resting = FlagIndicator::new();
    let task = DetectionTask::new(
        monitor,
        imu,
        screen,
        led.clone(),
        resting.clone(),
        Arc::clone(&shared.mode),
        Duration::from_millis(250),
    );
    (task, led, resting, rx)
}

fn drain(shared: &Shared, rx: &Receiver<PublishRequest>) -> Vec<String> {
    let mut worker = PublishTask::new(Recorder::default(), TOPIC, Arc::clone(&shared.threshold), Arc::clone(&shared.mode));
    while let Ok(request) = rx.try_recv() {
        worker.handle(request);
    }
    worker.backend().events.iter().map(|e| e.payload.clone()).collect()
}

fn small_gesture_config() -> GestureConfig {
    GestureConfig {
        seq_length: 4,
        consecutive: [3, 2, 2],
        ..GestureConfig::default()
    }
}

// ===== DETECTION =====

#[test]
fn detection_session_publishes_five_then_idles() {
    let shared = Shared::new();
    let screen = Screen::default();
    let imu = ScriptedImu::new([Ok(FLAT), Ok(TILTED_45)]);
    let (mut task, led, resting, rx) = detection(&shared, imu, screen.clone());

    shared.mode.set(Mode::Detection);

    // First sample becomes the baseline and reads as resting.
    let first = task.step().expect("baseline reading");
    assert!(first.angle.abs() < 0.01);
    assert!(first.resting);
    assert!(first.crossing.is_none());
    assert!(led.is_on());
    assert!(resting.is_on());

    for n in 1..=5 {
        let reading = task.step().expect("tilted reading");
        assert!((reading.angle - 45.0).abs() < 0.1, "angle {}", reading.angle);
        assert_eq!(reading.crossing.map(|t| t.count), Some(n));
    }
    assert_eq!(shared.mode.get(), Mode::Idle);
    assert_eq!(screen.cell(CELL_ANGLE_VALUE).as_deref(), Some("45.0"));

    // Idle: nothing measured, light off.
    assert!(task.step().is_none());
    assert!(!led.is_on());

    assert_eq!(
        drain(&shared, &rx),
        ["The 1 time(s)", "The 2 time(s)", "The 3 time(s)", "The 4 time(s)", "The 5 time(s)"]
    );
}

#[test]
fn reentering_detection_starts_a_new_session() {
    let shared = Shared::new();
    let imu = ScriptedImu::new([Ok(FLAT), Ok(TILTED_45)]);
    let (mut task, _, _, rx) = detection(&shared, imu, Screen::default());

    shared.mode.set(Mode::Detection);
    task.step();
    task.step();
    task.step();
    assert_eq!(task.monitor().session().count(), 2);

    shared.mode.set(Mode::Idle);
    task.step();
    shared.mode.set(Mode::Detection);

    // The board is still tilted, but that is the new baseline.
    let reading = task.step().expect("new baseline");
    assert!(reading.angle.abs() < 0.01);
    assert_eq!(task.monitor().session().count(), 0);
    assert_eq!(task.monitor().baseline(), Some(TILTED_45));
    assert_eq!(drain(&shared, &rx).len(), 2);
}

#[test]
fn threshold_change_applies_to_next_sample() {
    let shared = Shared::new();
    let imu = ScriptedImu::new([Ok(FLAT), Ok(TILTED_45)]);
    let (mut task, _, _, _rx) = detection(&shared, imu, Screen::default());
    for _ in 0..4 {
        shared.threshold.advance(); // 50°
    }

    shared.mode.set(Mode::Detection);
    task.step();
    assert!(task.step().unwrap().crossing.is_none());

    shared.threshold.reset(); // back to 30°
    assert!(task.step().unwrap().crossing.is_some());
}

#[test]
fn sensor_miss_skips_the_tick() {
    let shared = Shared::new();
    let imu = ScriptedImu::new([Err(Error::SensorMiss), Ok(FLAT)]);
    let (mut task, _, _, _rx) = detection(&shared, imu, Screen::default());

    shared.mode.set(Mode::Detection);
    assert!(task.step().is_none());
    assert_eq!(task.monitor().baseline(), None);
    assert!(task.step().is_some());
    assert_eq!(task.monitor().baseline(), Some(FLAT));
}

#[test]
fn mode_switch_mid_session_stops_detection() {
    let shared = Shared::new();
    let imu = ScriptedImu::new([Ok(FLAT), Ok(TILTED_45)]);
    let (mut task, _, _, _rx) = detection(&shared, imu, Screen::default());
    let gateway = CommandGateway::new(Arc::clone(&shared.mode));

    gateway.handle(2);
    for _ in 0..5 {
        task.step();
    }
    assert_eq!(task.monitor().session().count(), 4);

    gateway.handle(1);
    assert!(task.step().is_none());
    assert_eq!(task.monitor().session().count(), 4);
    assert_eq!(shared.mode.get(), Mode::Gui);
}

// ===== GESTURE =====

#[test]
fn left_to_right_steps_threshold_and_refreshes_screen() {
    let shared = Shared::new();
    let config = small_gesture_config();
    let classifier = ScriptedClassifier::new(&config);
    let screen = Screen::default();
    let led = FlagIndicator::new();
    let mut task = GestureTask::new(
        &config,
        ScriptedImu::steady(FLAT),
        classifier.clone(),
        screen.clone(),
        led.clone(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    )
    .unwrap();

    shared.mode.set(Mode::Gui);
    classifier.emit(Some(Gesture::LeftToRight));

    // Three samples to fill the window, no inference yet.
    for _ in 0..3 {
        assert_eq!(task.step(), None);
    }
    assert_eq!(classifier.inferences(), 0);
    assert!(led.is_on());

    assert_eq!(task.step(), None); // 1st consecutive
    assert_eq!(task.step(), Some(Gesture::LeftToRight)); // 2nd confirms
    assert_eq!(shared.threshold.current(), 35);
    assert_eq!(screen.cell(CELL_THRESHOLD_VALUE).as_deref(), Some("35"));

    // Window restarted: the next inference waits for four fresh samples.
    assert!(!task.window().is_ready());
    for _ in 0..3 {
        task.step();
    }
    assert_eq!(classifier.inferences(), 2);
}

#[test]
fn other_gestures_leave_threshold_alone() {
    let shared = Shared::new();
    let config = small_gesture_config();
    let classifier = ScriptedClassifier::new(&config);
    let screen = Screen::default();
    let mut task = GestureTask::new(
        &config,
        ScriptedImu::steady(FLAT),
        classifier.clone(),
        screen.clone(),
        FlagIndicator::new(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    )
    .unwrap();

    shared.mode.set(Mode::Gui);
    classifier.emit(Some(Gesture::Ring));
    let confirmed: Vec<_> = (0..6).filter_map(|_| task.step()).collect();
    assert_eq!(confirmed, [Gesture::Ring]);
    assert_eq!(shared.threshold.current(), 30);
    assert_eq!(screen.cell(CELL_THRESHOLD_VALUE).as_deref(), Some("30"));
}

#[test]
fn interrupted_run_does_not_confirm() {
    let shared = Shared::new();
    let config = small_gesture_config();
    let classifier = ScriptedClassifier::new(&config);
    let mut task = GestureTask::new(
        &config,
        ScriptedImu::steady(FLAT),
        classifier.clone(),
        Screen::default(),
        FlagIndicator::new(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    )
    .unwrap();

    shared.mode.set(Mode::Gui);
    for _ in 0..3 {
        task.step();
    }
    classifier.emit(Some(Gesture::LeftToRight));
    assert_eq!(task.step(), None);
    classifier.emit(None);
    assert_eq!(task.step(), None);
    classifier.emit(Some(Gesture::LeftToRight));
    assert_eq!(task.step(), None);
    assert_eq!(task.debouncer().state().consecutive, 1);
    assert_eq!(shared.threshold.current(), 30);
}

#[test]
fn gesture_task_is_dormant_outside_gui() {
    let shared = Shared::new();
    let config = small_gesture_config();
    let classifier = ScriptedClassifier::new(&config);
    let imu = ScriptedImu::steady(FLAT);
    let led = FlagIndicator::new();
    let mut task = GestureTask::new(
        &config,
        imu.clone(),
        classifier.clone(),
        Screen::default(),
        led.clone(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    )
    .unwrap();

    classifier.emit(Some(Gesture::LeftToRight));
    for mode in [Mode::Idle, Mode::Detection] {
        shared.mode.set(mode);
        for _ in 0..10 {
            assert_eq!(task.step(), None);
        }
    }
    assert_eq!(imu.reads(), 0);
    assert!(!led.is_on());
    assert_eq!(shared.threshold.current(), 30);
}

#[test]
fn mismatched_model_is_rejected_at_startup() {
    let shared = Shared::new();
    let config = small_gesture_config();
    let mut classifier = ScriptedClassifier::new(&config);
    classifier.spec.label_count = 4;

    let result = GestureTask::new(
        &config,
        ScriptedImu::steady(FLAT),
        classifier,
        Screen::default(),
        FlagIndicator::new(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    );
    assert!(matches!(result, Err(Error::ModelSchema { labels: 4, .. })));
}

#[test]
fn gesture_startup_resets_threshold() {
    let shared = Shared::new();
    shared.threshold.advance();
    let config = small_gesture_config();
    GestureTask::new(
        &config,
        ScriptedImu::steady(FLAT),
        ScriptedClassifier::new(&config),
        Screen::default(),
        FlagIndicator::new(),
        Arc::clone(&shared.threshold),
        Arc::clone(&shared.mode),
    )
    .unwrap();
    assert_eq!(shared.threshold.current(), 30);
}

// ===== COMMANDS AND BUTTON =====

struct Held;

impl ButtonLine for Held {
    fn is_pressed(&mut self) -> bool {
        true
    }
}

#[test]
fn button_reports_threshold_and_forces_idle() {
    let shared = Shared::new();
    shared.threshold.advance();
    shared.threshold.advance();
    shared.mode.set(Mode::Detection);

    let (queue, rx) = publish::queue();
    let t0 = Instant::now();
    let mut button = ButtonTask::new(ButtonInput::starting_at(Held, Duration::from_millis(50), t0), queue);
    button.poll_at(t0).unwrap();
    assert!(button.poll_at(t0 + Duration::from_millis(60)).unwrap());

    assert_eq!(drain(&shared, &rx), ["Angle threshold is 40"]);
    assert_eq!(shared.mode.get(), Mode::Idle);
}

#[test]
fn serial_commands_drive_the_loops() {
    let shared = Shared::new();
    let gateway = CommandGateway::new(Arc::clone(&shared.mode));
    let imu = ScriptedImu::new([Ok(FLAT), Ok(TILTED_45)]);
    let (mut task, _, _, rx) = detection(&shared, imu, Screen::default());

    let mut out = Vec::new();
    command_task(&gateway, Cursor::new("/MODESelect/run 2\n"), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "DETECTION MODE\n");
    task.step();
    task.step();

    let mut out = Vec::new();
    command_task(&gateway, Cursor::new("/MODESelect/run 0\n"), &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "SAFE MODE\n");
    assert!(task.step().is_none());

    assert_eq!(drain(&shared, &rx), ["The 1 time(s)"]);
}
