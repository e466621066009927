use crate::channel::{Channel, SharedChannel};
use crate::config::TransportConfig;
use crate::dispatch::{ProtocolBase, UserContext};
use crate::family::auto::{AutoDriver, AutoProtocol, ProvideoAuto};
use crate::family::cam::{CamDriver, CamProtocol, ProvideoCam};
use crate::family::cproc::{CprocDriver, CprocProtocol, ProvideoCproc};
use crate::family::dpcc::{DpccDriver, DpccProtocol, ProvideoDpcc};
use crate::family::lut::{LutDriver, LutProtocol, ProvideoLut};
use crate::family::mcc::{MccDriver, MccProtocol, ProvideoMcc};
use crate::family::playback::{PlaybackDriver, PlaybackProtocol, ProvideoPlayback};
use crate::family::system::{ProvideoSystem, SystemDriver, SystemProtocol};
use std::sync::{Arc, Mutex};
use tracing::info;

#[cfg(feature = "serial")]
use crate::{channel::SerialChannel, config::SerialConfig, error::Result};

/// One physical connection to a device.
///
/// Owns the channel. Instances and protocol handles only refer to it and
/// report [`crate::Error::Fault`] once the connection is dropped.
pub struct Connection {
    channel: SharedChannel,
    config: TransportConfig,
}

impl Connection {
    pub fn new(channel: impl Channel + 'static, config: TransportConfig) -> Self {
        let channel: Box<dyn Channel> = Box::new(channel);
        Self {
            channel: Arc::new(Mutex::new(channel)),
            config,
        }
    }

    /// Open a serial port and wrap it in a connection.
    #[cfg(feature = "serial")]
    pub fn open_serial(serial: &SerialConfig, config: TransportConfig) -> Result<Self> {
        let channel = SerialChannel::open(serial)?;
        info!("Connected on {}", serial.port);
        Ok(Self::new(channel, config))
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    pub fn base(&self) -> ProtocolBase {
        ProtocolBase::new(&self.channel, self.config)
    }

    /// Create a logical device instance with every provideo family bound.
    pub fn open_instance(&self, name: &str) -> Instance {
        info!(instance = name, "opening instance");
        let context = Arc::new(UserContext::new(name));
        let base = self.base();

        let mut system = base.clone_family::<dyn SystemDriver>();
        system.register(&context, Box::new(ProvideoSystem));
        let mut cam = base.clone_family::<dyn CamDriver>();
        cam.register(&context, Box::new(ProvideoCam));
        let mut auto = base.clone_family::<dyn AutoDriver>();
        auto.register(&context, Box::new(ProvideoAuto));
        let mut cproc = base.clone_family::<dyn CprocDriver>();
        cproc.register(&context, Box::new(ProvideoCproc));
        let mut mcc = base.clone_family::<dyn MccDriver>();
        mcc.register(&context, Box::new(ProvideoMcc));
        let mut lut = base.clone_family::<dyn LutDriver>();
        lut.register(&context, Box::new(ProvideoLut));
        let mut dpcc = base.clone_family::<dyn DpccDriver>();
        dpcc.register(&context, Box::new(ProvideoDpcc));
        let mut playback = base.clone_family::<dyn PlaybackDriver>();
        playback.register(&context, Box::new(ProvideoPlayback));

        Instance {
            system,
            cam,
            auto,
            cproc,
            mcc,
            lut,
            dpcc,
            playback,
            context,
        }
    }
}

/// One logical device instance (e.g. one processing chain) on a connection.
///
/// Fields drop in declaration order: every family handle goes before the
/// shared context they refer to.
pub struct Instance {
    system: SystemProtocol,
    cam: CamProtocol,
    auto: AutoProtocol,
    cproc: CprocProtocol,
    mcc: MccProtocol,
    lut: LutProtocol,
    dpcc: DpccProtocol,
    playback: PlaybackProtocol,
    context: Arc<UserContext>,
}

impl Instance {
    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn context(&self) -> &Arc<UserContext> {
        &self.context
    }

    pub fn system(&self) -> &SystemProtocol {
        &self.system
    }

    pub fn cam(&self) -> &CamProtocol {
        &self.cam
    }

    pub fn auto(&self) -> &AutoProtocol {
        &self.auto
    }

    pub fn cproc(&self) -> &CprocProtocol {
        &self.cproc
    }

    pub fn mcc(&self) -> &MccProtocol {
        &self.mcc
    }

    pub fn lut(&self) -> &LutProtocol {
        &self.lut
    }

    pub fn dpcc(&self) -> &DpccProtocol {
        &self.dpcc
    }

    pub fn playback(&self) -> &PlaybackProtocol {
        &self.playback
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        info!(instance = self.context.name(), "closing instance");
    }
}
