//! Per-family protocol handles sharing one channel.
//!
//! A [`ProtocolBase`] refers to the connection's channel. Cloning it for a
//! family yields a [`Protocol`] handle that carries its own driver and a
//! reference to the instance's [`UserContext`]. Driver and context are
//! installed and removed together, so a handle is either fully bound or not
//! bound at all.
//!
//! Handles never own the channel or the context. Callers must not issue
//! requests from several handles of one channel concurrently; the channel
//! lock only protects the bytes, not the request/response pairing across
//! threads that interleave whole operations.

use crate::channel::{Channel, SharedChannel};
use crate::config::TransportConfig;
use crate::error::{Error, Result};
use crate::transport::Transport;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use strum_macros::Display;
use tracing::{trace, warn};

/// Feature family a protocol handle serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive, TryFromPrimitive)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Family {
    System,
    Cam,
    Isp,
    Auto,
    Cproc,
    Mcc,
    Chain,
    Lut,
    Tflt,
    Fpnc,
    Playback,
    Osd,
    Iris,
    Knee,
    Dpcc,
    Lens,
    Roi,
}

/// Interface type of a family's driver, i.e. `dyn XxxDriver`.
pub trait FamilyInterface {
    const FAMILY: Family;
}

/// State shared by every family handle of one logical device instance.
#[derive(Debug, Default)]
pub struct UserContext {
    name: String,
    copy_flag: AtomicBool,
}

impl UserContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            copy_flag: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether copyable setters also apply their value to the other banks.
    pub fn copy_flag(&self) -> bool {
        self.copy_flag.load(Ordering::Relaxed)
    }

    pub fn set_copy_flag(&self, enabled: bool) {
        self.copy_flag.store(enabled, Ordering::Relaxed);
    }
}

/// Unbound reference to a connection's channel.
#[derive(Clone)]
pub struct ProtocolBase {
    channel: Weak<Mutex<Box<dyn Channel>>>,
    config: TransportConfig,
}

impl ProtocolBase {
    pub fn new(channel: &SharedChannel, config: TransportConfig) -> Self {
        Self {
            channel: Arc::downgrade(channel),
            config,
        }
    }

    /// New handle for family `D` on the same channel, without a driver.
    pub fn clone_family<D: ?Sized + FamilyInterface>(&self) -> Protocol<D> {
        Protocol {
            family: D::FAMILY,
            channel: self.channel.clone(),
            config: self.config,
            binding: None,
        }
    }
}

struct Binding<D: ?Sized> {
    context: Weak<UserContext>,
    driver: Box<D>,
}

/// Handle for one feature family.
pub struct Protocol<D: ?Sized> {
    family: Family,
    channel: Weak<Mutex<Box<dyn Channel>>>,
    config: TransportConfig,
    binding: Option<Binding<D>>,
}

impl<D: ?Sized> Protocol<D> {
    pub fn family(&self) -> Family {
        self.family
    }

    pub fn is_registered(&self) -> bool {
        self.binding.is_some()
    }

    /// Install `driver` together with `context`, replacing any earlier pair.
    pub fn register(&mut self, context: &Arc<UserContext>, driver: Box<D>) {
        trace!(family = %self.family, instance = context.name(), "register driver");
        self.binding = Some(Binding {
            context: Arc::downgrade(context),
            driver,
        });
    }

    /// Remove driver and context, returning the driver.
    pub fn unregister(&mut self) -> Option<Box<D>> {
        trace!(family = %self.family, "unregister driver");
        self.binding.take().map(|binding| binding.driver)
    }

    /// The instance context, while both handle binding and instance live.
    pub fn context(&self) -> Result<Arc<UserContext>> {
        let binding = self.binding.as_ref().ok_or(Error::Fault)?;
        binding.context.upgrade().ok_or(Error::Fault)
    }

    /// Validate the handle and run one driver operation on the channel.
    pub(crate) fn call<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&D, &UserContext, &mut Transport<'_>) -> Result<T>,
    ) -> Result<T> {
        let channel = self.channel.upgrade().ok_or(Error::Fault)?;
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| Error::unsupported(self.family, operation))?;
        let context = binding.context.upgrade().ok_or(Error::Fault)?;

        trace!(family = %self.family, operation, "dispatch");
        // a panicked exchange leaves at most stale input, flushed by the next request
        let mut guard = channel.lock().unwrap_or_else(|poisoned| {
            warn!(family = %self.family, "channel lock poisoned, recovering");
            poisoned.into_inner()
        });
        let mut transport = Transport::new(guard.as_mut(), self.config);
        f(binding.driver.as_ref(), &context, &mut transport)
    }

    /// Like [`Self::call`] for operations that only touch the context.
    pub(crate) fn call_local<T>(&self, operation: &'static str, f: impl FnOnce(&D, &UserContext) -> Result<T>) -> Result<T> {
        if self.channel.strong_count() == 0 {
            return Err(Error::Fault);
        }
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| Error::unsupported(self.family, operation))?;
        let context = binding.context.upgrade().ok_or(Error::Fault)?;
        f(binding.driver.as_ref(), &context)
    }
}
