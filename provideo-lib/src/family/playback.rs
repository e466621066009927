//! Playback transport control of the recording buffer.

use crate::command::Command;
use crate::dispatch::{Family, FamilyInterface, Protocol, UserContext};
use crate::error::{Error, Result};
use crate::transport::{Transport, narrow};

pub const PLAY_POS: Command = Command::new("play_pos", 1);
pub const PLAY_FWD: Command = Command::new("play_fwd", 1);
pub const PLAY_REW: Command = Command::new("play_rew", 1);
pub const PLAY: Command = Command::new("play", 0);
pub const RECORD: Command = Command::new("record", 0);
pub const PAUSE: Command = Command::new("pause", 0);
pub const STOP: Command = Command::new("stop", 0);

fn unsupported(operation: &str) -> Error {
    Error::unsupported(Family::Playback, operation)
}

#[allow(unused_variables)]
pub trait PlaybackDriver: Send + Sync {
    /// Current frame index within the buffer.
    fn get_position(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        Err(unsupported("get_position"))
    }

    fn seek(&self, ctx: &UserContext, t: &mut Transport<'_>, position: u32) -> Result<()> {
        Err(unsupported("seek"))
    }

    fn forward(&self, ctx: &UserContext, t: &mut Transport<'_>, speed: u8) -> Result<()> {
        Err(unsupported("forward"))
    }

    fn rewind(&self, ctx: &UserContext, t: &mut Transport<'_>, speed: u8) -> Result<()> {
        Err(unsupported("rewind"))
    }

    fn play(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("play"))
    }

    fn record(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("record"))
    }

    fn pause(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("pause"))
    }

    fn stop(&self, ctx: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        Err(unsupported("stop"))
    }
}

impl FamilyInterface for dyn PlaybackDriver {
    const FAMILY: Family = Family::Playback;
}

pub type PlaybackProtocol = Protocol<dyn PlaybackDriver>;

impl Protocol<dyn PlaybackDriver> {
    pub fn get_position(&self) -> Result<u32> {
        self.call("get_position", |d, ctx, t| d.get_position(ctx, t))
    }

    pub fn seek(&self, position: u32) -> Result<()> {
        self.call("seek", |d, ctx, t| d.seek(ctx, t, position))
    }

    /// Fast forward at `speed` times the recording rate.
    pub fn forward(&self, speed: u8) -> Result<()> {
        if speed == 0 {
            return Err(Error::InvalidArgument("forward speed must be at least 1".into()));
        }
        self.call("forward", |d, ctx, t| d.forward(ctx, t, speed))
    }

    pub fn rewind(&self, speed: u8) -> Result<()> {
        if speed == 0 {
            return Err(Error::InvalidArgument("rewind speed must be at least 1".into()));
        }
        self.call("rewind", |d, ctx, t| d.rewind(ctx, t, speed))
    }

    pub fn play(&self) -> Result<()> {
        self.call("play", |d, ctx, t| d.play(ctx, t))
    }

    pub fn record(&self) -> Result<()> {
        self.call("record", |d, ctx, t| d.record(ctx, t))
    }

    pub fn pause(&self) -> Result<()> {
        self.call("pause", |d, ctx, t| d.pause(ctx, t))
    }

    pub fn stop(&self) -> Result<()> {
        self.call("stop", |d, ctx, t| d.stop(ctx, t))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProvideoPlayback;

impl PlaybackDriver for ProvideoPlayback {
    fn get_position(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<u32> {
        let [value] = t.query::<1>(&PLAY_POS, &[])?;
        narrow(&PLAY_POS, value)
    }

    fn seek(&self, _: &UserContext, t: &mut Transport<'_>, position: u32) -> Result<()> {
        t.execute(&PLAY_POS, &[i64::from(position)], false)
    }

    fn forward(&self, _: &UserContext, t: &mut Transport<'_>, speed: u8) -> Result<()> {
        t.execute(&PLAY_FWD, &[i64::from(speed)], false)
    }

    fn rewind(&self, _: &UserContext, t: &mut Transport<'_>, speed: u8) -> Result<()> {
        t.execute(&PLAY_REW, &[i64::from(speed)], false)
    }

    fn play(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute(&PLAY, &[], false)
    }

    fn record(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute(&RECORD, &[], false)
    }

    fn pause(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute(&PAUSE, &[], false)
    }

    fn stop(&self, _: &UserContext, t: &mut Transport<'_>) -> Result<()> {
        t.execute(&STOP, &[], false)
    }
}
