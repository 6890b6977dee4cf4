use std::io::Read;

use crate::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct ReadAdaptor<R: Read> {
    reader: R,
}

impl<R: Read> ReadAdaptor<R> {
    pub fn new(r: R) -> Self {
        Self { reader: r }
    }
}

macro_rules! impl_get_be {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                self.reader
                    .read_exact(&mut buf)
                    .map_err(Error::Incomplete)?;

                Ok(<$ty>::from_be_bytes(buf))
            }
        )*
    };
}

impl<R: Read> ReadAdaptor<R> {
    impl_get_be!(
        get_u8_be => u8,
        get_i8_be => i8,
        get_u16_be => u16,
        get_i16_be => i16,
        get_i32_be => i32,
        get_i64_be => i64,
        get_f32_be => f32,
        get_f64_be => f64,
    );

    pub fn read_boxed_slice(&mut self, count: usize) -> Result<Box<[u8]>> {
        let mut buf = vec![0u8; count];
        self.reader
            .read_exact(&mut buf)
            .map_err(Error::Incomplete)?;

        Ok(buf.into())
    }

    /// Reads a length prefix, rejecting negative values.
    pub fn get_length(&mut self) -> Result<usize> {
        let len = self.get_i32_be()?;
        if len < 0 {
            return Err(Error::NegativeLength(len));
        }
        Ok(len as usize)
    }
}
