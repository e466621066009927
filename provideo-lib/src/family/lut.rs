//! Gamma look-up tables.
//!
//! Each color channel has its own curve defined by interpolation samples.
//! Reading a curve back streams one `lut_sample <x> <y>` line per sample.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::reassembly::{Record, Table, read_table};
use crate::transport::{Transport, flag, narrow};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const LUT_ENABLE: Command = Command::new("lut_enable", 1).copyable();
pub const LUT_MODE: Command = Command::new("lut_mode", 1).copyable();
pub const LUT_READ: Command = Command::new("lut_read", 0);
pub const LUT_SAMPLE: Command = Command::new("lut_sample", 2);
pub const LUT_WRITE: Command = Command::new("lut_write", 3);
pub const LUT_RESET: Command = Command::new("lut_reset", 1);

pub const MAX_SAMPLES: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum LutChannel {
    Master = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum LutMode {
    /// Curves interpolated from the stored samples.
    #[strum(to_string = "interpolate")]
    Interpolate = 0,
    /// Parametric gamma curve, samples ignored.
    #[strum(to_string = "fast gamma")]
    FastGamma = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LutSample {
    pub x: u16,
    pub y: u16,
}

impl Record for LutSample {
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

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Lut, operation)
}

#[allow(unused_variables)]
pub trait LutDriver: Send + Sync {
    fn get_enable(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        Err(unsupported("get_enable"))
    }

    fn set_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        Err(unsupported("set_enable"))
    }

    fn get_mode(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<LutMode> {
        Err(unsupported("get_mode"))
    }

    fn set_mode(&self, ctx: &UserContext, t: &mut Transport<'_>, mode: LutMode) -> Result<()> {
        Err(unsupported("set_mode"))
    }

    fn get_samples(&self, ctx: &UserContext, t: &mut Transport<'_>, channel: LutChannel) -> Result<Table<LutSample>> {
        Err(unsupported("get_samples"))
    }

    fn set_sample(&self, ctx: &UserContext, t: &mut Transport<'_>, channel: LutChannel, sample: LutSample) -> Result<()> {
        Err(unsupported("set_sample"))
    }

    fn reset(&self, ctx: &UserContext, t: &mut Transport<'_>, channel: LutChannel) -> Result<()> {
        Err(unsupported("reset"))
    }
}

impl FamilyInterface for dyn LutDriver {
    const FAMILY: Family = Family::Lut;
}

pub type LutProtocol = Protocol<dyn LutDriver>;

impl Protocol<dyn LutDriver> {
    pub fn get_enable(&self) -> Result<bool> {
        self.call("get_enable", |d, ctx, t| d.get_enable(ctx, t))
    }

    pub fn set_enable(&self, enable: bool) -> Result<()> {
        self.call("set_enable", |d, ctx, t| d.set_enable(ctx, t, enable))
    }

    pub fn get_mode(&self) -> Result<LutMode> {
        self.call("get_mode", |d, ctx, t| d.get_mode(ctx, t))
    }

    pub fn set_mode(&self, mode: LutMode) -> Result<()> {
        self.call("set_mode", |d, ctx, t| d.set_mode(ctx, t, mode))
    }

    pub fn get_samples(&self, channel: LutChannel) -> Result<Table<LutSample>> {
        self.call("get_samples", |d, ctx, t| d.get_samples(ctx, t, channel))
    }

    pub fn set_sample(&self, channel: LutChannel, x: u16, y: u16) -> Result<()> {
        self.call("set_sample", |d, ctx, t| d.set_sample(ctx, t, channel, LutSample { x, y }))
    }

    pub fn reset(&self, channel: LutChannel) -> Result<()> {
        self.call("reset", |d, ctx, t| d.reset(ctx, t, channel))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoLut;

impl LutDriver for ProvideoLut {
    fn get_enable(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        let [value] = t.query::<1>(&LUT_ENABLE, &[])?;
        flag(&LUT_ENABLE, value)
    }

    fn set_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        t.execute(&LUT_ENABLE, &[i64::from(enable)], ctx.copy_flag())
    }

    fn get_mode(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<LutMode> {
        let [value] = t.query::<1>(&LUT_MODE, &[])?;
        LutMode::try_from(narrow::<u8>(&LUT_MODE, value)?)
            .map_err(|e| Error::Protocol(format!("unknown lut mode {}", e.number)))
    }

    fn set_mode(&self, ctx: &UserContext, t: &mut Transport<'_>, mode: LutMode) -> Result<()> {
        t.execute(&LUT_MODE, &[i64::from(u8::from(mode))], ctx.copy_flag())
    }

    fn get_samples(&self, _: &UserContext, t: &mut Transport<'_>, channel: LutChannel) -> Result<Table<LutSample>> {
        let request = LUT_READ.format(&[i64::from(u8::from(channel))], false);
        read_table(t, &request, LUT_SAMPLE.name, MAX_SAMPLES)
    }

    fn set_sample(&self, _: &UserContext, t: &mut Transport<'_>, channel: LutChannel, sample: LutSample) -> Result<()> {
        t.execute(
            &LUT_WRITE,
            &[i64::from(u8::from(channel)), i64::from(sample.x), i64::from(sample.y)],
            false,
        )
    }

    fn reset(&self, _: &UserContext, t: &mut Transport<'_>, channel: LutChannel) -> Result<()> {
        t.execute(&LUT_RESET, &[i64::from(u8::from(channel))], false)
    }
}
