//! Kiosk hardware bridge
//!
//! The deck runs inside a kiosk browser that can switch the screen off,
//! change brightness, reload the start page and report battery level.
//! The bridge is optional: with none configured, commands are skipped.

mod fully;

use async_trait::async_trait;

use crate::Result;

pub use fully::FullyKioskBridge;

/// A side effect requested by a directive token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareCommand {
    /// Turn the display off
    ScreenOff,
    /// Set screen brightness (0-255)
    SetBrightness(u8),
    /// Reload the dashboard page
    Reload,
}

/// Device-side controls exposed by the kiosk
#[async_trait]
pub trait HardwareBridge: Send + Sync {
    /// Turn the screen off
    async fn turn_screen_off(&self) -> Result<()>;

    /// Set brightness in the 0-255 range
    async fn set_screen_brightness(&self, level: u8) -> Result<()>;

    /// Reload the kiosk start page
    async fn reload(&self) -> Result<()>;

    /// Current battery percentage
    async fn battery_level(&self) -> Result<u8>;

    /// Apply a single command
    async fn apply(&self, command: HardwareCommand) -> Result<()> {
        match command {
            HardwareCommand::ScreenOff => self.turn_screen_off().await,
            HardwareCommand::SetBrightness(level) => self.set_screen_brightness(level).await,
            HardwareCommand::Reload => self.reload().await,
        }
    }
}
