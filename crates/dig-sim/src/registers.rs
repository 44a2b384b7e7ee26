//! Simulated register file
//!
//! Records every read, write and delay in one ordered trace so tests can
//! assert on bring-up sequences, and can script the values returned by
//! successive reads of a status register.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dig_hw::{Delay, RegisterIo};
use serde::{Deserialize, Serialize};

/// One bus event seen by the simulated register file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read { reg: u32, value: u32 },
    Write { reg: u32, value: u32 },
    Delay { us: u32 },
}

#[derive(Debug, Default)]
struct RegisterState {
    values: BTreeMap<u32, u32>,
    trace: Vec<Access>,
    scripted: HashMap<u32, VecDeque<u32>>,
}

/// A register file that remembers what was done to it
#[derive(Debug, Default)]
pub struct SimRegisters {
    state: Mutex<RegisterState>,
}

impl SimRegisters {
    /// Create an empty register file (all registers read as zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a register file with initial values
    pub fn with_values(values: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let sim = Self::new();
        for (reg, value) in values {
            sim.set(reg, value);
        }
        sim
    }

    fn lock(&self) -> MutexGuard<'_, RegisterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a register without recording an access
    pub fn set(&self, reg: u32, value: u32) {
        self.lock().values.insert(reg, value);
    }

    /// Current value of a register without recording an access
    pub fn get(&self, reg: u32) -> u32 {
        self.lock().values.get(&reg).copied().unwrap_or(0)
    }

    /// Queue values returned by the next reads of `reg`
    ///
    /// Once the queue is drained, reads return the stored value again.
    pub fn script_reads(&self, reg: u32, values: impl IntoIterator<Item = u32>) {
        self.lock()
            .scripted
            .entry(reg)
            .or_default()
            .extend(values);
    }

    /// Full access trace in order
    pub fn trace(&self) -> Vec<Access> {
        self.lock().trace.clone()
    }

    /// Forget the recorded trace, keeping register values
    pub fn clear_trace(&self) {
        self.lock().trace.clear();
    }

    /// All writes as (register, value) pairs
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.lock()
            .trace
            .iter()
            .filter_map(|a| match *a {
                Access::Write { reg, value } => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    /// Values written to one register, in order
    pub fn writes_to(&self, reg: u32) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| v)
            .collect()
    }

    /// Whether any write hit `reg`
    pub fn was_written(&self, reg: u32) -> bool {
        !self.writes_to(reg).is_empty()
    }

    /// Delays in order, in microseconds
    pub fn delays(&self) -> Vec<u32> {
        self.lock()
            .trace
            .iter()
            .filter_map(|a| match *a {
                Access::Delay { us } => Some(us),
                _ => None,
            })
            .collect()
    }

    /// Number of reads of `reg`
    pub fn read_count(&self, reg: u32) -> usize {
        self.lock()
            .trace
            .iter()
            .filter(|a| matches!(a, Access::Read { reg: r, .. } if *r == reg))
            .count()
    }

    /// Sum of all delays, in microseconds
    pub fn total_delay_us(&self) -> u64 {
        self.delays().iter().map(|&us| u64::from(us)).sum()
    }
}

impl RegisterIo for SimRegisters {
    fn read(&self, reg: u32) -> u32 {
        let mut state = self.lock();
        let scripted = state.scripted.get_mut(&reg).and_then(VecDeque::pop_front);
        let value = scripted.unwrap_or_else(|| state.values.get(&reg).copied().unwrap_or(0));
        state.trace.push(Access::Read { reg, value });
        value
    }

    fn write(&self, reg: u32, value: u32) {
        let mut state = self.lock();
        state.values.insert(reg, value);
        state.trace.push(Access::Write { reg, value });
    }
}

impl Delay for SimRegisters {
    fn delay_us(&self, us: u32) {
        self.lock().trace.push(Access::Delay { us });
    }
}
