// Calendurr: Hardware & System Configuration
// Target: ESP32-S3-DevKitC-1 (Xtensa), resistive sensor sheet + SSD1306 OLED

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_SENSE: i32 = 1;       // ADC1_CH0, shared sense line of the sensor sheet
pub const PIN_BATTERY_ADC: i32 = 2; // ADC1_CH1, battery voltage through a 1:2 divider
pub const PIN_SEND_BUTTON: i32 = 4; // Send button (active LOW)
pub const PIN_BLE_BUTTON: i32 = 5;  // BLE button, hold to disconnect (active LOW)
pub const PIN_DAY_A: i32 = 6;       // Day encoder, interrupt channel
pub const PIN_DAY_B: i32 = 7;       // Day encoder, direction channel
pub const PIN_I2C_SDA: i32 = 8;
pub const PIN_I2C_SCL: i32 = 9;
pub const PIN_TOP_R: i32 = 11;      // Electrodes
pub const PIN_TOP_L: i32 = 12;
pub const PIN_BOTTOM_L: i32 = 13;
pub const PIN_BOTTOM_R: i32 = 14;
pub const PIN_MONTH_A: i32 = 15;    // Month encoder, interrupt channel
pub const PIN_MONTH_B: i32 = 16;    // Month encoder, direction channel

// ADC1 channel numbers matching PIN_SENSE / PIN_BATTERY_ADC on the S3.
pub const ADC_CHANNEL_SENSE: u32 = 0;
pub const ADC_CHANNEL_BATTERY: u32 = 1;

// ---------------------------------------------------------------------------
// I2C Bus / Display (SSD1306 OLED)
// ---------------------------------------------------------------------------
pub const I2C_ADDR_OLED: u8 = 0x3D;
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const SCREEN_WIDTH: u32 = 128;
pub const SCREEN_HEIGHT: u32 = 64;

// ---------------------------------------------------------------------------
// Sensor Calibration (14-bit scale)
// ---------------------------------------------------------------------------
pub const CONTACT_THRESHOLD: u16 = 8000;
pub const X_RAW_MIN: u16 = 7000;
pub const Y_RAW_MIN: u16 = 7000;
pub const X_DIVISOR: u16 = 25;
pub const Y_DIVISOR: u16 = 25;
pub const NOISE_THRESHOLD: i32 = 250;
pub const SMOOTHING_COEFF: f32 = 0.1;
pub const ADC_NATIVE_BITS: u32 = 12;
pub const ADC_CALIBRATION_BITS: u32 = 14;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SETTLE_DELAY_MS: u32 = 1;
pub const ENCODER_DEBOUNCE_MS: u32 = 10;
pub const SEND_DEBOUNCE_MS: u32 = 300;
pub const DISCONNECT_HOLD_MS: u64 = 2000;
pub const BUTTON_POLL_MS: u64 = 10;
pub const COORD_SEND_INTERVAL_MS: u32 = 10;
pub const MESSAGE_GAP_MS: u64 = 20;
pub const CYCLE_YIELD_MS: u64 = 1;
pub const BATTERY_CHECK_INTERVAL_MS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------
pub const BATTERY_DIVIDER: f32 = 2.0;
pub const ADC_REFERENCE_V: f32 = 3.3;
pub const ADC_FULL_SCALE: f32 = 4095.0;
pub const BATTERY_EMPTY_V: f32 = 3.3;
pub const BATTERY_FULL_V: f32 = 4.2;

// ---------------------------------------------------------------------------
// BLE identity (Nordic UART Service)
// ---------------------------------------------------------------------------
pub const BLE_DEVICE_NAME: &str = "very cool calendar we made";
pub const BLE_APP_ID: u16 = 0;
pub const NUS_SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const NUS_RX_UUID: u128 = 0x6e400002_b5a3_f393_e0a9_e50e24dcca9e;
pub const NUS_TX_UUID: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;
pub const BLE_MANUFACTURER: &str = "Aeris";
pub const BLE_MODEL: &str = "beta";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------
pub const STORAGE_MOUNT: &str = "/spiffs";
pub const DATE_FILE: &str = "/spiffs/date.txt";

// ---------------------------------------------------------------------------
// Runtime-adjustable parameters
// ---------------------------------------------------------------------------

/// Per-sensor mapping and filter constants.  Hand-tuned for each physical
/// sensor build; the defaults match the reference sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Minimum raw reading on both axes for a contact.
    pub contact_threshold: u16,
    pub x_min: u16,
    pub y_min: u16,
    pub x_divisor: u16,
    pub y_divisor: u16,
    /// Per-cycle jump (in mapped units) treated as a glitch.
    pub noise_threshold: i32,
    /// Exponential filter coefficient, 0.0..=1.0.
    pub smoothing: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            contact_threshold: CONTACT_THRESHOLD,
            x_min: X_RAW_MIN,
            y_min: Y_RAW_MIN,
            x_divisor: X_DIVISOR,
            y_divisor: Y_DIVISOR,
            noise_threshold: NOISE_THRESHOLD,
            smoothing: SMOOTHING_COEFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitConfig {
    pub send_interval_ms: u32,
    pub message_gap_ms: u64,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: COORD_SEND_INTERVAL_MS,
            message_gap_ms: MESSAGE_GAP_MS,
        }
    }
}
