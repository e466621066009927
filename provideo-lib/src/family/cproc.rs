//! Color processing: brightness, contrast, saturation and hue.
//!
//! All setters honour the instance copy flag.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, narrow};

pub const CPROC_BRIGHT: Command = Command::new("cproc_bright", 1).copyable();
pub const CPROC_CONTRAST: Command = Command::new("cproc_contrast", 1).copyable();
pub const CPROC_SATURATION: Command = Command::new("cproc_saturation", 1).copyable();
pub const CPROC_HUE: Command = Command::new("cproc_hue", 1).copyable();

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Cproc, operation)
}

#[allow(unused_variables)]
pub trait CprocDriver: Send + Sync {
    fn get_brightness(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<i16> {
        Err(unsupported("get_brightness"))
    }

    fn set_brightness(&self, ctx: &UserContext, t: &mut Transport<'_>, value: i16) -> Result<()> {
        Err(unsupported("set_brightness"))
    }

    fn get_contrast(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u16> {
        Err(unsupported("get_contrast"))
    }

    fn set_contrast(&self, ctx: &UserContext, t: &mut Transport<'_>, value: u16) -> Result<()> {
        Err(unsupported("set_contrast"))
    }

    fn get_saturation(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u16> {
        Err(unsupported("get_saturation"))
    }

    fn set_saturation(&self, ctx: &UserContext, t: &mut Transport<'_>, value: u16) -> Result<()> {
        Err(unsupported("set_saturation"))
    }

    fn get_hue(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<i16> {
        Err(unsupported("get_hue"))
    }

    fn set_hue(&self, ctx: &UserContext, t: &mut Transport<'_>, value: i16) -> Result<()> {
        Err(unsupported("set_hue"))
    }
}

impl FamilyInterface for dyn CprocDriver {
    const FAMILY: Family = Family::Cproc;
}

pub type CprocProtocol = Protocol<dyn CprocDriver>;

impl Protocol<dyn CprocDriver> {
    pub fn get_brightness(&self) -> Result<i16> {
        self.call("get_brightness", |d, ctx, t| d.get_brightness(ctx, t))
    }

    pub fn set_brightness(&self, value: i16) -> Result<()> {
        self.call("set_brightness", |d, ctx, t| d.set_brightness(ctx, t, value))
    }

    pub fn get_contrast(&self) -> Result<u16> {
        self.call("get_contrast", |d, ctx, t| d.get_contrast(ctx, t))
    }

    pub fn set_contrast(&self, value: u16) -> Result<()> {
        self.call("set_contrast", |d, ctx, t| d.set_contrast(ctx, t, value))
    }

    pub fn get_saturation(&self) -> Result<u16> {
        self.call("get_saturation", |d, ctx, t| d.get_saturation(ctx, t))
    }

    pub fn set_saturation(&self, value: u16) -> Result<()> {
        self.call("set_saturation", |d, ctx, t| d.set_saturation(ctx, t, value))
    }

    pub fn get_hue(&self) -> Result<i16> {
        self.call("get_hue", |d, ctx, t| d.get_hue(ctx, t))
    }

    pub fn set_hue(&self, value: i16) -> Result<()> {
        self.call("set_hue", |d, ctx, t| d.set_hue(ctx, t, value))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoCproc;

impl ProvideoCproc {
    fn read<T: TryFrom<i64>>(t: &mut Transport<'_>, cmd: &Command) -> Result<T> {
        let [value] = t.query::<1>(cmd, &[])?;
        narrow(cmd, value)
    }

    fn write(ctx: &UserContext, t: &mut Transport<'_>, cmd: &Command, value: i64) -> Result<()> {
        t.execute(cmd, &[value], ctx.copy_flag())
    }
}

impl CprocDriver for ProvideoCproc {
    fn get_brightness(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<i16> {
        Self::read(t, &CPROC_BRIGHT)
    }

    fn set_brightness(&self, ctx: &UserContext, t: &mut Transport<'_>, value: i16) -> Result<()> {
        Self::write(ctx, t, &CPROC_BRIGHT, value.into())
    }

    fn get_contrast(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u16> {
        Self::read(t, &CPROC_CONTRAST)
    }

    fn set_contrast(&self, ctx: &UserContext, t: &mut Transport<'_>, value: u16) -> Result<()> {
        Self::write(ctx, t, &CPROC_CONTRAST, value.into())
    }

    fn get_saturation(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u16> {
        Self::read(t, &CPROC_SATURATION)
    }

    fn set_saturation(&self, ctx: &UserContext, t: &mut Transport<'_>, value: u16) -> Result<()> {
        Self::write(ctx, t, &CPROC_SATURATION, value.into())
    }

    fn get_hue(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<i16> {
        Self::read(t, &CPROC_HUE)
    }

    fn set_hue(&self, ctx: &UserContext, t: &mut Transport<'_>, value: i16) -> Result<()> {
        Self::write(ctx, t, &CPROC_HUE, value.into())
    }
}
