use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::time::Duration;
use std::{io, thread};

use crate::registers::READ_FLAG;
use crate::scale::FullScale;

/// Register level access to the sensor, everything the driver needs from the platform.
pub trait SensorPort {
	type Error;

	/// Reads `buffer.len()` consecutive registers starting at `address`.
	fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

	/// Writes `data` to consecutive registers starting at `address`.
	fn write_registers(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

	/// Selects a full-scale range and returns its LSB per unit divider.
	fn configure_full_scale(&mut self, scale: FullScale) -> Result<f32, Self::Error> {
		self.write_registers(scale.register(), &[scale.config_bits()])?;
		Ok(scale.divider())
	}

	fn delay_ms(&mut self, ms: u32);
}

/// [`SensorPort`] over Linux `spidev`.
pub struct SpidevPort {
	spi: Spidev,
}

impl SpidevPort {
	pub fn open(path: &str) -> Result<Self, io::Error> {
		let options = SpidevOptions::new()
			.bits_per_word(8)
			.max_speed_hz(1_000_000) // datasheet: 1 MHz for configuration registers
			.mode(SpiModeFlags::SPI_MODE_3)
			.build();

		let mut spi = Spidev::open(path)?;
		spi.configure(&options)?;

		Ok(Self { spi })
	}

	pub fn release(self) -> Spidev {
		self.spi
	}
}

impl SensorPort for SpidevPort {
	type Error = io::Error;

	fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), io::Error> {
		let mut tx_buffer = vec![0u8; buffer.len() + 1];
		let mut rx_buffer = vec![0u8; buffer.len() + 1];
		tx_buffer[0] = address | READ_FLAG;

		self.spi.transfer(&mut SpidevTransfer::read_write(&tx_buffer, &mut rx_buffer))?;

		buffer.copy_from_slice(&rx_buffer[1..]);
		Ok(())
	}

	fn write_registers(&mut self, address: u8, data: &[u8]) -> Result<(), io::Error> {
		let mut tx_buffer = Vec::with_capacity(data.len() + 1);
		tx_buffer.push(address & !READ_FLAG);
		tx_buffer.extend_from_slice(data);

		self.spi.transfer(&mut SpidevTransfer::write(&tx_buffer))
	}

	fn delay_ms(&mut self, ms: u32) {
		thread::sleep(Duration::from_millis(ms as u64));
	}
}
