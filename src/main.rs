// Tilt Guard: Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the sensor, display, LEDs and button.
//   2. Join Wi-Fi and connect to the MQTT broker (ESP32 only).
//   3. Spawn the publish, gesture, detection and button tasks.
//   4. Serve mode commands from the serial console on the main thread.
//
// The board starts in IDLE; nothing happens until a MODESelect command
// arrives. On a development machine the same engine runs against simulated
// hardware and logs its publishes instead of sending them.

#[cfg(target_os = "espidf")]
mod drivers;
#[cfg(not(target_os = "espidf"))]
mod sim;

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tiltguard::classifier::Classifier;
use tiltguard::config::*;
use tiltguard::display::draw_home;
use tiltguard::gateway::CommandGateway;
use tiltguard::input::{ButtonInput, ButtonLine};
use tiltguard::mode::ModeController;
use tiltguard::peripherals::{AccelerometerSource, Display, EventPublisher, Indicator};
use tiltguard::tasks::command::{command_task, ButtonTask};
use tiltguard::tasks::detection::DetectionTask;
use tiltguard::tasks::gesture::GestureTask;
use tiltguard::tasks::publish::{self, PublishTask};
use tiltguard::threshold::ThresholdStore;
use tiltguard::tilt::TiltMonitor;

// ---------------------------------------------------------------------------
// Board wiring shared by both targets
// ---------------------------------------------------------------------------

struct Board<A, C, D, L, B, P> {
    accel: A,
    classifier: C,
    display: D,
    led_gui: L,
    led_detection: L,
    led_resting: L,
    button: B,
    publisher: P,
}

/// Spawn every task and hand back the gateway the command interface drives.
fn start<A, C, D, L, B, P>(config: &RuntimeConfig, board: Board<A, C, D, L, B, P>) -> anyhow::Result<CommandGateway>
where
    A: AccelerometerSource + Clone + Send + 'static,
    C: Classifier + Send + 'static,
    D: Display + Clone + Send + 'static,
    L: Indicator + Send + 'static,
    B: ButtonLine + Send + 'static,
    P: EventPublisher + Send + 'static,
{
    config.validate()?;

    // ---- Shared state -----------------------------------------------------
    let threshold = Arc::new(ThresholdStore::new(config.threshold));
    let mode = Arc::new(ModeController::new());

    // ---- Publish task (sole owner of the telemetry client) ----------------
    let (queue, requests) = publish::queue();
    let publisher = PublishTask::new(board.publisher, config.topic.clone(), Arc::clone(&threshold), Arc::clone(&mode));
    thread::Builder::new()
        .name("publish".into())
        .stack_size(STACK_PUBLISH)
        .spawn(move || {
            publisher.run(requests);
        })?;

    // ---- Gesture task -----------------------------------------------------
    match GestureTask::new(
        &config.gesture,
        board.accel.clone(),
        board.classifier,
        board.display.clone(),
        board.led_gui,
        Arc::clone(&threshold),
        Arc::clone(&mode),
    ) {
        Ok(task) => {
            thread::Builder::new()
                .name("gesture".into())
                .stack_size(STACK_GESTURE)
                .spawn(move || {
                    task.run();
                })?;
        }
        Err(e) => log::error!("Gesture task disabled: {}", e),
    }

    let mut display = board.display;
    if let Err(e) = draw_home(&mut display, threshold.current()) {
        log::error!("Display error: {}", e);
    }

    // ---- Detection task ---------------------------------------------------
    let monitor = TiltMonitor::new(
        config.tilt.clone(),
        config.topic.clone(),
        Arc::clone(&threshold),
        Arc::clone(&mode),
        queue.clone(),
    );
    let detection = DetectionTask::new(
        monitor,
        board.accel,
        display,
        board.led_detection,
        board.led_resting,
        Arc::clone(&mode),
        config.tilt.sample_interval,
    );
    thread::Builder::new()
        .name("detection".into())
        .stack_size(STACK_DETECTION)
        .spawn(move || {
            detection.run();
        })?;

    // ---- Button task ------------------------------------------------------
    let button = ButtonTask::new(
        ButtonInput::new(board.button, Duration::from_millis(BUTTON_DEBOUNCE_MS)),
        queue,
    );
    thread::Builder::new()
        .name("button".into())
        .stack_size(STACK_BUTTON)
        .spawn(move || {
            button.run(Duration::from_millis(BUTTON_POLL_INTERVAL_MS));
        })?;

    log::info!("All tasks running, mode {}", mode.get());
    Ok(CommandGateway::new(mode))
}

// ---------------------------------------------------------------------------
// ESP32-C3
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use std::sync::Mutex;

    use esp_idf_hal::gpio::{IOPin, OutputPin};
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;

    use tiltguard::display::TextPanel;
    use tiltguard::peripherals::LogPublisher;

    use crate::drivers::gpio::{ButtonPin, Led};
    use crate::drivers::imu::Mpu6050;
    use crate::drivers::mqtt::MqttPublisher;
    use crate::drivers::oled::OledPanel;

    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Tilt Guard firmware starting…");

    let config = RuntimeConfig::default();
    let peripherals = Peripherals::take()?;

    // ---- I2C bus (shared between OLED and MPU6050) ------------------------
    let i2c_config = I2cConfig::new().baudrate(400u32.kHz().into());
    let i2c: I2cDriver<'static> = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    let i2c_bus: &'static Mutex<I2cDriver<'static>> = Box::leak(Box::new(Mutex::new(i2c)));

    // ---- Sensor and display -----------------------------------------------
    let imu = Mpu6050::new(i2c_bus);
    if !imu.is_connected() {
        log::error!("MPU6050 not responding at {:#04x}", I2C_ADDR_MPU6050);
    }
    imu.init()?;

    let mut oled = OledPanel::new(i2c_bus);
    if !oled.is_connected() {
        log::error!("OLED not responding at {:#04x}", I2C_ADDR_OLED);
    }
    if let Err(e) = oled.init() {
        // Keep running so the board can still be driven over serial.
        log::error!("OLED init failed: {}", e);
    }
    let display = Arc::new(Mutex::new(TextPanel::new(oled)));

    // ---- Network ----------------------------------------------------------
    let _wifi = drivers::wifi::connect(peripherals.modem)?;
    let publisher: Box<dyn EventPublisher + Send> = match MqttPublisher::connect(&config.topic) {
        Ok(mqtt) => Box::new(mqtt),
        Err(e) => {
            log::error!("MQTT unavailable, publishes go to the log only: {}", e);
            Box::new(LogPublisher::default())
        }
    };

    #[cfg(feature = "edge-impulse")]
    let classifier = tiltguard::classifier::EdgeImpulseClassifier;
    #[cfg(not(feature = "edge-impulse"))]
    let classifier = tiltguard::classifier::StubClassifier::new(&config.gesture);

    let board = Board {
        accel: imu,
        classifier,
        display,
        led_gui: Led::new(peripherals.pins.gpio2.downgrade_output())?,
        led_detection: Led::new(peripherals.pins.gpio4.downgrade_output())?,
        led_resting: Led::new(peripherals.pins.gpio5.downgrade_output())?,
        button: ButtonPin::new(peripherals.pins.gpio3.downgrade())?,
        publisher,
    };
    let gateway = start(&config, board)?;

    // ---- Serial command console -------------------------------------------
    // Route stdin through the UART driver so reads block instead of
    // returning end-of-file while the line is idle.
    esp_idf_svc::sys::esp!(unsafe {
        esp_idf_svc::sys::uart_driver_install(0, 512, 0, 0, core::ptr::null_mut(), 0)
    })?;
    unsafe { esp_idf_svc::sys::esp_vfs_dev_uart_use_driver(0) };

    serve_console(&gateway)
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use std::sync::Mutex;

    use tiltguard::classifier::StubClassifier;
    use tiltguard::display::{FrameBuffer, TextPanel};
    use tiltguard::peripherals::{FlagIndicator, LogPublisher};

    use crate::sim::{LoggedDisplay, SimulatedButton, SimulatedImu};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Tilt Guard starting on simulated hardware");

    let config = RuntimeConfig::default();
    let board = Board {
        accel: SimulatedImu::new(),
        classifier: StubClassifier::new(&config.gesture),
        display: Arc::new(Mutex::new(LoggedDisplay::new(TextPanel::new(FrameBuffer::new())))),
        led_gui: FlagIndicator::new(),
        led_detection: FlagIndicator::new(),
        led_resting: FlagIndicator::new(),
        button: SimulatedButton::new(),
        publisher: LogPublisher::default(),
    };
    let gateway = start(&config, board)?;

    log::info!("Type commands such as `/MODESelect/run 1`");
    serve_console(&gateway)
}

/// Run the command interface on stdin/stdout. Once the console closes the
/// tasks keep running on their own, so the main thread just parks.
fn serve_console(gateway: &CommandGateway) -> anyhow::Result<()> {
    let stdin = io::stdin();
    if let Err(e) = command_task(gateway, stdin.lock(), io::stdout()) {
        log::error!("Command console failed: {}", e);
    }

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}
