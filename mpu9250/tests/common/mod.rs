#![allow(dead_code)]

use mpu9250::registers::*;
use mpu9250::{encode_axes, SensorPort};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    Read,
    Write,
}

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MockError::Read => write!(f, "mock read failure"),
            MockError::Write => write!(f, "mock write failure"),
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub registers: HashMap<u8, u8>,
    /// Registers whose writes are dropped, to fake a chip that ignores configuration
    pub read_only: HashSet<u8>,
    /// Samples served on `ACCEL_XOUT_H`, the last one repeats
    pub accel: VecDeque<[i16; 3]>,
    /// Samples served on `GYRO_XOUT_H`, the last one repeats
    pub gyro: VecDeque<[i16; 3]>,
    pub writes: Vec<(u8, Vec<u8>)>,
    pub fail_next_read: bool,
    pub fail_next_write: bool,
    pub delay_ms: u64,
}

impl MockState {
    pub fn register_pair(&self, address: u8) -> i16 {
        i16::from_be_bytes([self.register(address), self.register(address + 1)])
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers.get(&address).copied().unwrap_or(0)
    }

    pub fn set_register_pair(&mut self, address: u8, value: i16) {
        let [h, l] = value.to_be_bytes();
        self.registers.insert(address, h);
        self.registers.insert(address + 1, l);
    }

    pub fn accel_offsets(&self) -> [i16; 3] {
        [
            self.register_pair(XA_OFFSET_H),
            self.register_pair(YA_OFFSET_H),
            self.register_pair(ZA_OFFSET_H),
        ]
    }

    pub fn gyro_offsets(&self) -> [i16; 3] {
        [
            self.register_pair(XG_OFFSET_H),
            self.register_pair(YG_OFFSET_H),
            self.register_pair(ZG_OFFSET_H),
        ]
    }

    /// Writes that landed in one of the offset pairs starting at `addresses`.
    pub fn writes_to(&self, addresses: &[u8; 3]) -> Vec<(u8, Vec<u8>)> {
        self.writes
            .iter()
            .filter(|(address, _)| addresses.contains(address))
            .cloned()
            .collect()
    }

    fn next_sample(samples: &mut VecDeque<[i16; 3]>) -> [i16; 3] {
        if samples.len() > 1 {
            samples.pop_front().unwrap()
        } else {
            samples.front().copied().unwrap_or([0; 3])
        }
    }
}

/// Register file backed fake of the sensor, shared with the test through `state`.
#[derive(Clone)]
pub struct MockPort {
    pub state: Rc<RefCell<MockState>>,
}

impl MockPort {
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.registers.insert(WHO_AM_I, WHO_AM_I_MPU9250);

        MockPort {
            state: Rc::new(RefCell::new(state)),
        }
    }

    pub fn with_factory_accel_bias(bias: [i16; 3]) -> Self {
        let port = MockPort::new();
        {
            let mut state = port.state.borrow_mut();
            for (&address, &value) in ACCEL_OFFSET_H.iter().zip(bias.iter()) {
                state.set_register_pair(address, value);
            }
        }
        port
    }

    pub fn push_accel(&self, sample: [i16; 3]) {
        self.state.borrow_mut().accel.push_back(sample);
    }

    pub fn push_gyro(&self, sample: [i16; 3]) {
        self.state.borrow_mut().gyro.push_back(sample);
    }
}

impl SensorPort for MockPort {
    type Error = MockError;

    fn read_registers(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), MockError> {
        let mut state = self.state.borrow_mut();

        if state.fail_next_read {
            state.fail_next_read = false;
            return Err(MockError::Read);
        }

        let bytes = match address {
            ACCEL_XOUT_H if buffer.len() == 6 => encode_axes(MockState::next_sample(&mut state.accel)).to_vec(),
            GYRO_XOUT_H if buffer.len() == 6 => encode_axes(MockState::next_sample(&mut state.gyro)).to_vec(),
            _ => (0..buffer.len())
                .map(|i| state.register(address + i as u8))
                .collect(),
        };

        buffer.copy_from_slice(&bytes);
        Ok(())
    }

    fn write_registers(&mut self, address: u8, data: &[u8]) -> Result<(), MockError> {
        let mut state = self.state.borrow_mut();

        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(MockError::Write);
        }

        state.writes.push((address, data.to_vec()));

        for (i, &byte) in data.iter().enumerate() {
            let register = address + i as u8;
            if !state.read_only.contains(&register) {
                state.registers.insert(register, byte);
            }
        }

        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().delay_ms += ms as u64;
    }
}
