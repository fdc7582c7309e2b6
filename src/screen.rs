// Calendurr: Status Screen
//
// Layout for the 128x64 OLED, drawn onto any monochrome DrawTarget:
//
//   Month: <name>
//   Day: <n>
//
//   BLE: Connected | Not Connected
//   Battery: <volts>

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use heapless::String;

use crate::calendar::Date;
use crate::config::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub type Line = String<24>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub date: Date,
    pub connected: bool,
    pub battery_volts: Option<f32>,
}

impl Status {
    /// Text rows with their y offset from the top of the screen.
    pub fn lines(&self) -> [(i32, Line); 4] {
        let mut month = Line::new();
        let _ = write!(month, "Month: {}", self.date.month_name());

        let mut day = Line::new();
        let _ = write!(day, "Day: {}", self.date.day);

        let mut ble = Line::new();
        let _ = ble.push_str(if self.connected { "BLE: Connected" } else { "BLE: Not Connected" });

        let mut battery = Line::new();
        match self.battery_volts {
            Some(v) => {
                let _ = write!(battery, "Battery: {:.2}V", v);
            }
            None => {
                let _ = battery.push_str("Battery: --");
            }
        }

        [(5, month), (15, day), (40, ble), (50, battery)]
    }
}

fn style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

pub fn draw_status<D>(target: &mut D, status: &Status) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    for (y, line) in status.lines() {
        Text::with_baseline(&line, Point::new(5, y), style(), Baseline::Top).draw(target)?;
    }
    Ok(())
}

/// One line of text in the middle of the screen (boot banner, faults).
pub fn draw_message<D>(target: &mut D, text: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    let centered = TextStyleBuilder::new().alignment(Alignment::Center).baseline(Baseline::Middle).build();
    let center = Point::new(SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32 / 2);
    Text::with_text_style(text, center, style(), centered).draw(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;

    fn status(connected: bool, battery_volts: Option<f32>) -> Status {
        Status { date: Date { month: 9, day: 27 }, connected, battery_volts }
    }

    fn texts(status: &Status) -> Vec<(i32, std::string::String)> {
        status.lines().iter().map(|(y, l)| (*y, l.as_str().to_owned())).collect()
    }

    #[test]
    fn lines_show_date_link_and_battery() {
        assert_eq!(
            texts(&status(true, Some(3.987))),
            vec![
                (5, "Month: September".to_owned()),
                (15, "Day: 27".to_owned()),
                (40, "BLE: Connected".to_owned()),
                (50, "Battery: 3.99V".to_owned()),
            ]
        );
    }

    #[test]
    fn unknown_battery_and_no_link() {
        let lines = texts(&status(false, None));
        assert_eq!(lines[2].1, "BLE: Not Connected");
        assert_eq!(lines[3].1, "Battery: --");
    }

    #[test]
    fn status_draws_inside_the_screen() {
        let mut display: MockDisplay<BinaryColor> = MockDisplay::new();
        display.set_allow_out_of_bounds_drawing(true);
        display.set_allow_overdraw(true);
        draw_status(&mut display, &status(true, Some(4.1))).unwrap();
        assert!(display.affected_area().size.width > 0);
    }
}
