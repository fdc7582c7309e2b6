// Calendurr: Firmware Entry Point
//
// ESP32-S3 desk calendar with a resistive touch strip: the user dials a date
// with two rotary encoders, drags a finger across the sensor sheet, and the
// averaged touch position streams to a phone over BLE.  The send button
// closes the batch with the selected date and stores it on flash.
//
// The hardware-independent core lives in the `calendurr` library; this
// binary wires it to ESP-IDF drivers.  On any other target it only prints a
// notice, so the library tests build on the host.

#[cfg(target_os = "espidf")]
mod drivers;
#[cfg(target_os = "espidf")]
mod firmware;
#[cfg(target_os = "espidf")]
mod tasks;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    println!("calendurr is ESP-IDF firmware; build it for an espidf target (host builds only run the library tests)");
}
