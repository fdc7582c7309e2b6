// Calendurr: SSD1306 OLED Driver
//
// 128x64 panel on its own I2C bus, buffered: draw into RAM, then flush.

use anyhow::anyhow;
use esp_idf_hal::i2c::I2cDriver;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use calendurr::config::I2C_ADDR_OLED;
use calendurr::screen::{self, Status};

type Panel = Ssd1306<I2CInterface<I2cDriver<'static>>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub struct OledDisplay {
    panel: Panel,
}

impl OledDisplay {
    pub fn new(i2c: I2cDriver<'static>) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, I2C_ADDR_OLED);
        let panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0).into_buffered_graphics_mode();
        Self { panel }
    }

    pub fn init(&mut self) -> anyhow::Result<()> {
        self.panel.init().map_err(|e| anyhow!("SSD1306 init failed: {:?}", e))
    }

    pub fn show_status(&mut self, status: &Status) -> anyhow::Result<()> {
        screen::draw_status(&mut self.panel, status).map_err(|e| anyhow!("draw failed: {:?}", e))?;
        self.flush()
    }

    pub fn show_message(&mut self, text: &str) -> anyhow::Result<()> {
        screen::draw_message(&mut self.panel, text).map_err(|e| anyhow!("draw failed: {:?}", e))?;
        self.flush()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.panel.flush().map_err(|e| anyhow!("display flush failed: {:?}", e))
    }
}
