use std::io::Write;

use crate::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct WriteAdaptor<W: Write> {
    writer: W,
}

impl<W: Write> WriteAdaptor<W> {
    pub fn new(w: W) -> Self {
        Self { writer: w }
    }
}

macro_rules! impl_write_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                let buf = value.to_be_bytes();
                self.writer.write_all(&buf).map_err(Error::Incomplete)?;
                Ok(())
            }
        )*
    };
}

impl<W: Write> WriteAdaptor<W> {
    impl_write_be!(
        write_u8_be => u8,
        write_i8_be => i8,
        write_u16_be => u16,
        write_i16_be => i16,
        write_i32_be => i32,
        write_i64_be => i64,
        write_f32_be => f32,
        write_f64_be => f64,
    );

    pub fn write_slice(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value).map_err(Error::Incomplete)?;
        Ok(())
    }

    /// Writes an `i32` length prefix.
    pub fn write_length(&mut self, len: usize) -> Result<()> {
        if len > i32::MAX as usize {
            return Err(Error::LargeLength(len));
        }
        self.write_i32_be(len as i32)
    }
}
