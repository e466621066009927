//! Auto exposure.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, flag, narrow};

pub const AE_ENABLE: Command = Command::new("ae_enable", 1).copyable();
pub const AE_SETPOINT: Command = Command::new("ae_setpoint", 1).copyable();

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Auto, operation)
}

#[allow(unused_variables)]
pub trait AutoDriver: Send + Sync {
    fn get_ae_enable(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        Err(unsupported("get_ae_enable"))
    }

    fn set_ae_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        Err(unsupported("set_ae_enable"))
    }

    /// Target mean brightness the controller converges to.
    fn get_ae_setpoint(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u8> {
        Err(unsupported("get_ae_setpoint"))
    }

    fn set_ae_setpoint(&self, ctx: &UserContext, t: &mut Transport<'_>, setpoint: u8) -> Result<()> {
        Err(unsupported("set_ae_setpoint"))
    }
}

impl FamilyInterface for dyn AutoDriver {
    const FAMILY: Family = Family::Auto;
}

pub type AutoProtocol = Protocol<dyn AutoDriver>;

impl Protocol<dyn AutoDriver> {
    pub fn get_ae_enable(&self) -> Result<bool> {
        self.call("get_ae_enable", |d, ctx, t| d.get_ae_enable(ctx, t))
    }

    pub fn set_ae_enable(&self, enable: bool) -> Result<()> {
        self.call("set_ae_enable", |d, ctx, t| d.set_ae_enable(ctx, t, enable))
    }

    pub fn get_ae_setpoint(&self) -> Result<u8> {
        self.call("get_ae_setpoint", |d, ctx, t| d.get_ae_setpoint(ctx, t))
    }

    pub fn set_ae_setpoint(&self, setpoint: u8) -> Result<()> {
        self.call("set_ae_setpoint", |d, ctx, t| d.set_ae_setpoint(ctx, t, setpoint))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoAuto;

impl AutoDriver for ProvideoAuto {
    fn get_ae_enable(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        let [value] = t.query::<1>(&AE_ENABLE, &[])?;
        flag(&AE_ENABLE, value)
    }

    fn set_ae_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        t.execute(&AE_ENABLE, &[i64::from(enable)], ctx.copy_flag())
    }

    fn get_ae_setpoint(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u8> {
        let [value] = t.query::<1>(&AE_SETPOINT, &[])?;
        narrow(&AE_SETPOINT, value)
    }

    fn set_ae_setpoint(&self, ctx: &UserContext, t: &mut Transport<'_>, setpoint: u8) -> Result<()> {
        t.execute(&AE_SETPOINT, &[i64::from(setpoint)], ctx.copy_flag())
    }
}
