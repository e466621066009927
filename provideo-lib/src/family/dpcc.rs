//! Defect pixel cluster correction (DPCC).
//!
//! Besides the usual enable/mode/level settings the device keeps a table of
//! known defect pixels. Reading it back streams one `dpc_add_px <x> <y>` line
//! per pixel, reassembled by [`crate::reassembly`].

use crate::command::Command;
use crate::config::Timeouts;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::reassembly::{Record, Table, read_table};
use crate::transport::{Transport, flag, narrow};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DPC_ENABLE: Command = Command::new("dpc_enable", 1);
pub const DPC_MODE: Command = Command::new("dpc_mode", 1);
pub const DPC_LEVEL: Command = Command::new("dpc_level", 1);
pub const DPC_TEST_MODE: Command = Command::new("dpc_test_mode", 1);
pub const DPC_ADD_PX: Command = Command::new("dpc_add_px", 2);
pub const DPC_TABLE: Command = Command::new("dpc_table", 0);
pub const DPC_CLEAR: Command = Command::new("dpc_clear", 0);
pub const DPC_SAVE: Command = Command::new("dpc_save", 0);
pub const DPC_LOAD: Command = Command::new("dpc_load", 0);
pub const DPC_AUTO_LOAD: Command = Command::new("dpc_auto_load", 0);

/// Largest defect pixel table a device holds.
pub const MAX_PIXELS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DpccMode {
    /// Correct only pixels listed in the table.
    #[strum(to_string = "fixed")]
    Fixed = 0,
    /// Detect and correct defects per frame.
    #[strum(to_string = "dynamic")]
    Dynamic = 1,
    /// Table pixels plus dynamic detection.
    #[strum(to_string = "combined")]
    Combined = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DpccTestMode {
    #[strum(to_string = "off")]
    Off = 0,
    /// Paint corrected pixels in a marker color.
    #[strum(to_string = "mark corrected")]
    MarkCorrected = 1,
    /// Paint table pixels in a marker color without correcting them.
    #[strum(to_string = "mark table")]
    MarkTable = 2,
}

/// Sensor coordinate of one defect pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DpccPixel {
    pub x: u16,
    pub y: u16,
}

impl DpccPixel {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl Record for DpccPixel {
    const FIELDS: usize = 2;

    fn from_fields(fields: &[i64]) -> Option<Self> {
        match fields {
            [x, y] => Some(Self {
                x: u16::try_from(*x).ok()?,
                y: u16::try_from(*y).ok()?,
            }),
            _ => None,
        }
    }
}

pub type PixelTable = Table<DpccPixel>;

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Dpcc, operation)
}

/// Driver interface of the DPCC family.
///
/// Every operation defaults to "not supported"; a driver overrides what its
/// device implements.
#[allow(unused_variables)]
pub trait DpccDriver: Send + Sync {
    fn get_enable(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        Err(unsupported("get_enable"))
    }

    fn set_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        Err(unsupported("set_enable"))
    }

    fn get_mode(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<DpccMode> {
        Err(unsupported("get_mode"))
    }

    fn set_mode(&self, ctx: &UserContext, t: &mut Transport<'_>, mode: DpccMode) -> Result<()> {
        Err(unsupported("set_mode"))
    }

    fn get_level(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u8> {
        Err(unsupported("get_level"))
    }

    fn set_level(&self, ctx: &UserContext, t: &mut Transport<'_>, level: u8) -> Result<()> {
        Err(unsupported("set_level"))
    }

    fn add_pixel(&self, ctx: &UserContext, t: &mut Transport<'_>, pixel: DpccPixel) -> Result<()> {
        Err(unsupported("add_pixel"))
    }

    fn get_table(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<PixelTable> {
        Err(unsupported("get_table"))
    }

    /// Replace the device table, one pixel at a time.
    ///
    /// Coordinate lists of different length leave the device untouched and
    /// report success.
    fn set_table(&self, ctx: &UserContext, t: &mut Transport<'_>, xs: &[u16], ys: &[u16]) -> Result<()> {
        if xs.len() != ys.len() {
            warn!(xs = xs.len(), ys = ys.len(), "coordinate lists differ in length, table not written");
            return Ok(());
        }
        self.clear_table(ctx, t)?;
        for (&x, &y) in xs.iter().zip(ys) {
            self.add_pixel(ctx, t, DpccPixel { x, y })?;
        }
        debug!(pixels = xs.len(), "table written");
        Ok(())
    }

    fn clear_table(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("clear_table"))
    }

    fn save_table(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("save_table"))
    }

    fn load_table(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("load_table"))
    }

    fn auto_load_table(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("auto_load_table"))
    }

    fn get_test_mode(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<DpccTestMode> {
        Err(unsupported("get_test_mode"))
    }

    fn set_test_mode(&self, ctx: &UserContext, t: &mut Transport<'_>, mode: DpccTestMode) -> Result<()> {
        Err(unsupported("set_test_mode"))
    }
}

impl FamilyInterface for dyn DpccDriver {
    const FAMILY: Family = Family::Dpcc;
}

pub type DpccProtocol = Protocol<dyn DpccDriver>;

impl Protocol<dyn DpccDriver> {
    pub fn get_enable(&self) -> Result<bool> {
        self.call("get_enable", |d, ctx, t| d.get_enable(ctx, t))
    }

    pub fn set_enable(&self, enable: bool) -> Result<()> {
        self.call("set_enable", |d, ctx, t| d.set_enable(ctx, t, enable))
    }

    pub fn get_mode(&self) -> Result<DpccMode> {
        self.call("get_mode", |d, ctx, t| d.get_mode(ctx, t))
    }

    pub fn set_mode(&self, mode: DpccMode) -> Result<()> {
        self.call("set_mode", |d, ctx, t| d.set_mode(ctx, t, mode))
    }

    pub fn get_level(&self) -> Result<u8> {
        self.call("get_level", |d, ctx, t| d.get_level(ctx, t))
    }

    pub fn set_level(&self, level: u8) -> Result<()> {
        self.call("set_level", |d, ctx, t| d.set_level(ctx, t, level))
    }

    pub fn add_pixel(&self, x: u16, y: u16) -> Result<()> {
        self.call("add_pixel", |d, ctx, t| d.add_pixel(ctx, t, DpccPixel { x, y }))
    }

    pub fn get_table(&self) -> Result<PixelTable> {
        self.call("get_table", |d, ctx, t| d.get_table(ctx, t))
    }

    pub fn set_table(&self, xs: &[u16], ys: &[u16]) -> Result<()> {
        self.call("set_table", |d, ctx, t| d.set_table(ctx, t, xs, ys))
    }

    /// [`Self::set_table`] from coordinate pairs.
    pub fn set_pixels(&self, pixels: &[DpccPixel]) -> Result<()> {
        let (xs, ys): (Vec<u16>, Vec<u16>) = pixels.iter().map(|p| (p.x, p.y)).unzip();
        self.set_table(&xs, &ys)
    }

    pub fn clear_table(&self) -> Result<()> {
        self.call("clear_table", |d, ctx, t| d.clear_table(ctx, t))
    }

    pub fn save_table(&self) -> Result<()> {
        self.call("save_table", |d, ctx, t| d.save_table(ctx, t))
    }

    pub fn load_table(&self) -> Result<()> {
        self.call("load_table", |d, ctx, t| d.load_table(ctx, t))
    }

    pub fn auto_load_table(&self) -> Result<()> {
        self.call("auto_load_table", |d, ctx, t| d.auto_load_table(ctx, t))
    }

    pub fn get_test_mode(&self) -> Result<DpccTestMode> {
        self.call("get_test_mode", |d, ctx, t| d.get_test_mode(ctx, t))
    }

    pub fn set_test_mode(&self, mode: DpccTestMode) -> Result<()> {
        self.call("set_test_mode", |d, ctx, t| d.set_test_mode(ctx, t, mode))
    }
}

/// DPCC over the provideo line protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoDpcc;

impl DpccDriver for ProvideoDpcc {
    fn get_enable(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        let [value] = t.query::<1>(&DPC_ENABLE, &[])?;
        flag(&DPC_ENABLE, value)
    }

    fn set_enable(&self, _: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        t.execute(&DPC_ENABLE, &[i64::from(enable)], false)
    }

    fn get_mode(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<DpccMode> {
        let [value] = t.query::<1>(&DPC_MODE, &[])?;
        DpccMode::try_from(narrow::<u8>(&DPC_MODE, value)?)
            .map_err(|e| Error::Protocol(format!("unknown dpcc mode {}", e.number)))
    }

    fn set_mode(&self, _: &UserContext, t: &mut Transport<'_>, mode: DpccMode) -> Result<()> {
        t.execute(&DPC_MODE, &[i64::from(u8::from(mode))], false)
    }

    fn get_level(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u8> {
        let [value] = t.query::<1>(&DPC_LEVEL, &[])?;
        narrow(&DPC_LEVEL, value)
    }

    fn set_level(&self, _: &UserContext, t: &mut Transport<'_>, level: u8) -> Result<()> {
        t.execute(&DPC_LEVEL, &[i64::from(level)], false)
    }

    fn add_pixel(&self, _: &UserContext, t: &mut Transport<'_>, pixel: DpccPixel) -> Result<()> {
        t.execute_with_timeout(
            &DPC_ADD_PX,
            &[i64::from(pixel.x), i64::from(pixel.y)],
            false,
            Timeouts::DPCC_ADD_PIXEL,
        )
    }

    fn get_table(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<PixelTable> {
        read_table(t, &DPC_TABLE.format(&[], false), DPC_ADD_PX.name, MAX_PIXELS)
    }

    fn clear_table(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute(&DPC_CLEAR, &[], false)
    }

    fn save_table(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&DPC_SAVE, &[], false, Timeouts::DPCC_STORAGE)
    }

    fn load_table(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&DPC_LOAD, &[], false, Timeouts::DPCC_STORAGE)
    }

    fn auto_load_table(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&DPC_AUTO_LOAD, &[], false, Timeouts::DPCC_AUTO_LOAD)
    }

    fn get_test_mode(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<DpccTestMode> {
        let [value] = t.query::<1>(&DPC_TEST_MODE, &[])?;
        DpccTestMode::try_from(narrow::<u8>(&DPC_TEST_MODE, value)?)
            .map_err(|e| Error::Protocol(format!("unknown dpcc test mode {}", e.number)))
    }

    fn set_test_mode(&self, _: &UserContext, t: &mut Transport<'_>, mode: DpccTestMode) -> Result<()> {
        t.execute(&DPC_TEST_MODE, &[i64::from(u8::from(mode))], false)
    }
}
