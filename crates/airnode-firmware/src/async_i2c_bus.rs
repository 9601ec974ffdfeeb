//! Shared async I2C bus
//!
//! The power management chip, the GPIO expander, the SHT40 and the SCD41 all
//! hang off I2C0. Each gets its own [`AsyncI2cDevice`] handle; the handles
//! take an Embassy mutex around every transaction, so a slow sensor read
//! yields to the executor instead of blocking the network stack.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// The bus type shared by every I2C peripheral on the board
pub type SharedI2c = esp_hal::i2c::master::I2c<'static, esp_hal::Async>;

/// Handle to one device on the shared bus
pub type BoardI2cDevice = AsyncI2cDevice<'static, SharedI2c>;

pub struct AsyncI2cDevice<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> AsyncI2cDevice<'a, T> {
    #[inline]
    pub const fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for AsyncI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for AsyncI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.write_read(address, write, read).await
    }

    /// Runs all operations under a single lock so no other device can
    /// interleave with a multi-part transaction.
    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}
