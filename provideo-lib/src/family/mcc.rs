//! Multi-channel color correction (MCC).
//!
//! The hue circle is split into [`MCC_PHASES`] segments, each with its own
//! saturation and hue adjustment.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, flag, narrow};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MCC_ENABLE: Command = Command::new("mcc_enable", 1).copyable();
/// Queried with the phase index; the value line repeats it.
pub const MCC_PHASE: Command = Command::new("mcc_phase", 3).copyable();

pub const MCC_PHASES: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MccPhase {
    pub saturation: u16,
    pub hue: i16,
}

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Mcc, operation)
}

#[allow(unused_variables)]
pub trait MccDriver: Send + Sync {
    fn get_enable(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        Err(unsupported("get_enable"))
    }

    fn set_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        Err(unsupported("set_enable"))
    }

    fn get_phase(&self, ctx: &UserContext, t: &mut Transport<'_>, index: u8) -> Result<MccPhase> {
        Err(unsupported("get_phase"))
    }

    fn set_phase(&self, ctx: &UserContext, t: &mut Transport<'_>, index: u8, phase: MccPhase) -> Result<()> {
        Err(unsupported("set_phase"))
    }
}

impl FamilyInterface for dyn MccDriver {
    const FAMILY: Family = Family::Mcc;
}

pub type MccProtocol = Protocol<dyn MccDriver>;

fn check_index(index: u8) -> Result<()> {
    if index >= MCC_PHASES {
        return Err(Error::InvalidArgument(format!(
            "mcc phase {index} out of range 0..{MCC_PHASES}"
        )));
    }
    Ok(())
}

impl Protocol<dyn MccDriver> {
    pub fn get_enable(&self) -> Result<bool> {
        self.call("get_enable", |d, ctx, t| d.get_enable(ctx, t))
    }

    pub fn set_enable(&self, enable: bool) -> Result<()> {
        self.call("set_enable", |d, ctx, t| d.set_enable(ctx, t, enable))
    }

    pub fn get_phase(&self, index: u8) -> Result<MccPhase> {
        check_index(index)?;
        self.call("get_phase", |d, ctx, t| d.get_phase(ctx, t, index))
    }

    pub fn set_phase(&self, index: u8, phase: MccPhase) -> Result<()> {
        check_index(index)?;
        self.call("set_phase", |d, ctx, t| d.set_phase(ctx, t, index, phase))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoMcc;

impl MccDriver for ProvideoMcc {
    fn get_enable(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<bool> {
        let [value] = t.query::<1>(&MCC_ENABLE, &[])?;
        flag(&MCC_ENABLE, value)
    }

    fn set_enable(&self, ctx: &UserContext, t: &mut Transport<'_>, enable: bool) -> Result<()> {
        t.execute(&MCC_ENABLE, &[i64::from(enable)], ctx.copy_flag())
    }

    fn get_phase(&self, _: &UserContext, t: &mut Transport<'_>, index: u8) -> Result<MccPhase> {
        let [echoed, saturation, hue] = t.query::<3>(&MCC_PHASE, &[i64::from(index)])?;
        if echoed != i64::from(index) {
            return Err(Error::Protocol(format!("asked for mcc phase {index}, device answered {echoed}")));
        }
        Ok(MccPhase {
            saturation: narrow(&MCC_PHASE, saturation)?,
            hue: narrow(&MCC_PHASE, hue)?,
        })
    }

    fn set_phase(&self, ctx: &UserContext, t: &mut Transport<'_>, index: u8, phase: MccPhase) -> Result<()> {
        t.execute(
            &MCC_PHASE,
            &[i64::from(index), i64::from(phase.saturation), i64::from(phase.hue)],
            ctx.copy_flag(),
        )
    }
}
