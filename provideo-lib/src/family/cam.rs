//! Sensor gain and exposure.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, narrow};

pub const CAM_GAIN: Command = Command::new("cam_gain", 1);
pub const CAM_EXPOSURE: Command = Command::new("cam_exposure", 1);

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Cam, operation)
}

#[allow(unused_variables)]
pub trait CamDriver: Send + Sync {
    /// Analog gain in thousandths (1000 = 1.0x).
    fn get_gain(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        Err(unsupported("get_gain"))
    }

    fn set_gain(&self, ctx: &UserContext, t: &mut Transport<'_>, gain: u32) -> Result<()> {
        Err(unsupported("set_gain"))
    }

    /// Exposure time in microseconds.
    fn get_exposure(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        Err(unsupported("get_exposure"))
    }

    fn set_exposure(&self, ctx: &UserContext, t: &mut Transport<'_>, exposure_us: u32) -> Result<()> {
        Err(unsupported("set_exposure"))
    }
}

impl FamilyInterface for dyn CamDriver {
    const FAMILY: Family = Family::Cam;
}

pub type CamProtocol = Protocol<dyn CamDriver>;

impl Protocol<dyn CamDriver> {
    pub fn get_gain(&self) -> Result<u32> {
        self.call("get_gain", |d, ctx, t| d.get_gain(ctx, t))
    }

    pub fn set_gain(&self, gain: u32) -> Result<()> {
        self.call("set_gain", |d, ctx, t| d.set_gain(ctx, t, gain))
    }

    pub fn get_exposure(&self) -> Result<u32> {
        self.call("get_exposure", |d, ctx, t| d.get_exposure(ctx, t))
    }

    pub fn set_exposure(&self, exposure_us: u32) -> Result<()> {
        self.call("set_exposure", |d, ctx, t| d.set_exposure(ctx, t, exposure_us))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoCam;

impl CamDriver for ProvideoCam {
    fn get_gain(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        let [value] = t.query::<1>(&CAM_GAIN, &[])?;
        narrow(&CAM_GAIN, value)
    }

    fn set_gain(&self, _: &UserContext, t: &mut Transport<'_>, gain: u32) -> Result<()> {
        t.execute(&CAM_GAIN, &[i64::from(gain)], false)
    }

    fn get_exposure(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        let [value] = t.query::<1>(&CAM_EXPOSURE, &[])?;
        narrow(&CAM_EXPOSURE, value)
    }

    fn set_exposure(&self, _: &UserContext, t: &mut Transport<'_>, exposure_us: u32) -> Result<()> {
        t.execute(&CAM_EXPOSURE, &[i64::from(exposure_us)], false)
    }
}
