//! Device-wide settings: identification, settings flash, and the
//! instance-wide copy flag.

use crate::command::Command;
use crate::config::Timeouts;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, narrow};
use tracing::info;

pub const VERSION: Command = Command::new("version", 1);
pub const RUNTIME: Command = Command::new("runtime", 1);
pub const SAVE_SETTINGS: Command = Command::new("save_settings", 0);
pub const LOAD_SETTINGS: Command = Command::new("load_settings", 0);
pub const RESET_SETTINGS: Command = Command::new("reset_settings", 0);
pub const REBOOT: Command = Command::new("reboot", 0);

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::System, operation)
}

#[allow(unused_variables)]
pub trait SystemDriver: Send + Sync {
    fn get_version(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<String> {
        Err(unsupported("get_version"))
    }

    /// Seconds since power-up.
    fn get_runtime(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        Err(unsupported("get_runtime"))
    }

    fn save_settings(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("save_settings"))
    }

    fn load_settings(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("load_settings"))
    }

    fn reset_settings(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("reset_settings"))
    }

    fn reboot(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("reboot"))
    }

    fn get_copy_flag(&self, ctx: &UserContext) -> Result<bool> {
        Ok(ctx.copy_flag())
    }

    fn set_copy_flag(&self, ctx: &UserContext, enabled: bool) -> Result<()> {
        ctx.set_copy_flag(enabled);
        Ok(())
    }
}

impl FamilyInterface for dyn SystemDriver {
    const FAMILY: Family = Family::System;
}

pub type SystemProtocol = Protocol<dyn SystemDriver>;

impl Protocol<dyn SystemDriver> {
    pub fn get_version(&self) -> Result<String> {
        self.call("get_version", |d, ctx, t| d.get_version(ctx, t))
    }

    pub fn get_runtime(&self) -> Result<u32> {
        self.call("get_runtime", |d, ctx, t| d.get_runtime(ctx, t))
    }

    pub fn save_settings(&self) -> Result<()> {
        self.call("save_settings", |d, ctx, t| d.save_settings(ctx, t))
    }

    pub fn load_settings(&self) -> Result<()> {
        self.call("load_settings", |d, ctx, t| d.load_settings(ctx, t))
    }

    pub fn reset_settings(&self) -> Result<()> {
        self.call("reset_settings", |d, ctx, t| d.reset_settings(ctx, t))
    }

    pub fn reboot(&self) -> Result<()> {
        self.call("reboot", |d, ctx, t| d.reboot(ctx, t))
    }

    pub fn get_copy_flag(&self) -> Result<bool> {
        self.call_local("get_copy_flag", |d, ctx| d.get_copy_flag(ctx))
    }

    /// Make copyable setters of every family of this instance also write
    /// the other user banks.
    pub fn set_copy_flag(&self, enabled: bool) -> Result<()> {
        self.call_local("set_copy_flag", |d, ctx| d.set_copy_flag(ctx, enabled))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoSystem;

impl SystemDriver for ProvideoSystem {
    fn get_version(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<String> {
        t.query_text(&VERSION)
    }

    fn get_runtime(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        let [value] = t.query::<1>(&RUNTIME, &[])?;
        narrow(&RUNTIME, value)
    }

    fn save_settings(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&SAVE_SETTINGS, &[], false, Timeouts::FLASH)
    }

    fn load_settings(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&LOAD_SETTINGS, &[], false, Timeouts::FLASH)
    }

    fn reset_settings(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute_with_timeout(&RESET_SETTINGS, &[], false, Timeouts::FLASH)
    }

    fn reboot(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        info!(instance = ctx.name(), "rebooting device");
        t.execute(&REBOOT, &[], false)
    }
}
