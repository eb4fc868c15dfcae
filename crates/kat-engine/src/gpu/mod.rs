//! wgpu backend for the [`Device`](crate::device::Device) model.
//!
//! [`Gpu`] owns adapter, device, queue and the frame target (a window surface
//! or an offscreen texture). [`WgpuDevice`] layers GL-style object state on
//! top and turns recorded clears and draws into render passes.

mod context;
mod device;
mod frame;
mod init;
mod reflect;
mod state;
mod surface;
mod topology;

pub use context::{Gpu, OFFSCREEN_FORMAT};
pub use device::WgpuDevice;
pub use frame::GpuFrame;
pub use init::GpuInit;
pub use surface::{present_mode_for_interval, SurfaceErrorAction};
