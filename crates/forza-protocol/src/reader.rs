//! Little-endian field reader

use crate::frame::Wheels;

/// Sequential reader over a datagram whose length was already checked
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        bytes
    }

    pub(crate) fn f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    pub(crate) fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    pub(crate) fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    pub(crate) fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    pub(crate) fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub(crate) fn i8(&mut self) -> i8 {
        i8::from_le_bytes(self.take())
    }

    /// Four consecutive f32 values in FL, FR, RL, RR order
    pub(crate) fn wheels_f32(&mut self) -> Wheels<f32> {
        Wheels {
            front_left: self.f32(),
            front_right: self.f32(),
            rear_left: self.f32(),
            rear_right: self.f32(),
        }
    }

    /// Four consecutive i32 values in FL, FR, RL, RR order
    pub(crate) fn wheels_i32(&mut self) -> Wheels<i32> {
        Wheels {
            front_left: self.i32(),
            front_right: self.i32(),
            rear_left: self.i32(),
            rear_right: self.i32(),
        }
    }
}
