//! Little-endian byte-level reading and writing for container and chunk
//! headers. Bit-granular payload packing lives in [`crate::bitio`].

use crate::error::SeaError;

pub(crate) struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn read_u8(&mut self) -> Result<u8, SeaError> {
        if self.data.is_empty() {
            return Err(SeaError::Truncated);
        }
        let value = self.data[0];
        self.data = &self.data[1..];
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, SeaError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, SeaError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, SeaError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SeaError> {
        if self.data.len() < N {
            return Err(SeaError::Truncated);
        }
        let bytes: [u8; N] = self.data[..N].try_into().unwrap();
        self.data = &self.data[N..];
        Ok(bytes)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], SeaError> {
        if self.data.len() < len {
            return Err(SeaError::Truncated);
        }
        let value = &self.data[..len];
        self.data = &self.data[len..];
        Ok(value)
    }

    /// Take everything that has not been read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let value = self.data;
        self.data = &[];
        value
    }
}

pub(crate) struct Writer<'a> {
    data: &'a mut Vec<u8>,
}

impl<'a> Writer<'a> {
    pub fn new(data: &'a mut Vec<u8>) -> Self {
        Self { data }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_slice(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_writer_round_trip() {
        let mut bytes = Vec::new();
        let mut writer = Writer::new(&mut bytes);
        writer.write_u8(0x5A);
        writer.write_u16(0x1234);
        writer.write_u32(0xDEADBEEF);
        writer.write_i16(-12345);
        writer.write_slice(b"tail");

        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 0x5A);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_i16().unwrap(), -12345);
        assert_eq!(reader.rest(), b"tail");
    }

    #[test]
    fn test_reader_is_little_endian() {
        let mut reader = Reader::new(&[0x01, 0x02]);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
    }

    #[test]
    fn test_reader_truncated() {
        let mut reader = Reader::new(&[0x01]);
        assert_eq!(reader.read_u32(), Err(SeaError::Truncated));

        let mut reader = Reader::new(&[]);
        assert_eq!(reader.read_u8(), Err(SeaError::Truncated));

        let mut reader = Reader::new(&[0x01, 0x02]);
        assert_eq!(reader.read_slice(3), Err(SeaError::Truncated));
    }
}
