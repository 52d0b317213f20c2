//! Repositories over the device store.

pub mod device;

pub use device::{DeviceRepository, DeviceUpdate, SqlxDeviceRepository};
