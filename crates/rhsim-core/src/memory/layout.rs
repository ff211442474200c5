use std::fmt::Debug;
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;
use thiserror::Error;

use super::{DRAMAddr, PhysAddr};

/// Trait for resolving DRAM addresses to physical addresses.
///
/// Implementors encode the address mapping of one memory configuration
/// (channel/rank/bank functions of the memory controller). A layout is shared
/// read-only between every [`Fliptable`](crate::Fliptable) captured on that
/// configuration, hence the `Send + Sync` bound.
pub trait MemLayout: Debug + Send + Sync {
    /// Translates a DRAM address to the physical address it maps to.
    fn to_phys(&self, addr: &DRAMAddr) -> PhysAddr;
}

/// Errors that can occur while initializing or accessing the memory layout.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The layout was requested before any experiment initialized it.
    #[error("Memory layout has not been initialized")]
    Uninitialized,
    /// A different memory configuration is already active.
    #[error("Memory layout already initialized with a different configuration (pass overwrite to replace it)")]
    AlreadyInitialized,
    /// The resolver rejected the memory configuration.
    #[error("Invalid memory configuration: {0}")]
    InvalidConfig(Box<dyn std::error::Error + Send + Sync>),
}

/// Factory turning an opaque memory configuration into a [`MemLayout`].
pub type LayoutBuilder =
    Box<dyn Fn(&Value) -> Result<Arc<dyn MemLayout>, LayoutError> + Send + Sync>;

struct ActiveLayout {
    config: Value,
    layout: Arc<dyn MemLayout>,
}

/// Holder of the process-wide memory layout.
///
/// The registry is initialized once per memory configuration from experiment
/// metadata and handed out as a shared, read-only [`Arc`] afterwards.
/// Re-initializing with an identical configuration is a no-op, replacing it
/// with a different one requires an explicit overwrite.
pub struct LayoutRegistry {
    builder: LayoutBuilder,
    active: Option<ActiveLayout>,
}

impl LayoutRegistry {
    /// Creates an empty registry using `builder` to resolve configurations.
    pub fn new(builder: LayoutBuilder) -> Self {
        LayoutRegistry {
            builder,
            active: None,
        }
    }

    /// Initializes the layout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::AlreadyInitialized`] if a different
    /// configuration is active and `overwrite` is not set, or the builder's
    /// error if the configuration is rejected.
    pub fn init_layout(
        &mut self,
        config: &Value,
        overwrite: bool,
    ) -> Result<Arc<dyn MemLayout>, LayoutError> {
        if let Some(active) = &self.active {
            if active.config == *config {
                return Ok(active.layout.clone());
            }
            if !overwrite {
                return Err(LayoutError::AlreadyInitialized);
            }
            warn!("Overwriting active memory layout");
        }
        let layout = (self.builder)(config)?;
        info!("Initialized memory layout: {:?}", layout);
        self.active = Some(ActiveLayout {
            config: config.clone(),
            layout: layout.clone(),
        });
        Ok(layout)
    }

    /// Returns the active layout.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::Uninitialized`] if no layout was initialized yet.
    pub fn layout(&self) -> Result<Arc<dyn MemLayout>, LayoutError> {
        self.active
            .as_ref()
            .map(|active| active.layout.clone())
            .ok_or(LayoutError::Uninitialized)
    }

    /// Returns whether a layout is active.
    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }
}
