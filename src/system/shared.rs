//! Latest-value cells
//!
//! Hardware tasks publish their newest reading into a [`SharedCell`]; the
//! control loop reads it synchronously from inside a control tick. Readers
//! never wait and always see one complete value.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

pub struct SharedCell<T: Copy> {
    storage: Mutex<CriticalSectionRawMutex, Cell<T>>,
}

impl<T: Copy> SharedCell<T> {
    pub const fn new(init: T) -> Self {
        Self {
            storage: Mutex::new(Cell::new(init)),
        }
    }

    /// Replaces the published value
    pub fn publish(&self, value: T) {
        self.storage.lock(|cell| cell.set(value));
    }

    /// Newest published value
    pub fn read(&self) -> T {
        self.storage.lock(|cell| cell.get())
    }

    /// Read-modify-write under one lock
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        self.storage.lock(|cell| {
            let mut value = cell.get();
            f(&mut value);
            cell.set(value);
        });
    }
}
