use crate::encoding::error::Error;
use bytes::{Buf, BufMut};

mod entry;
pub mod error;

pub type EncoderVecLen = u32;

pub trait Encoder: Sized {
    type Error;
    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut;
}

pub trait Decoder: Sized {
    type Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf;
}

fn ensure_remaining<B: Buf>(buf: &B, needed: usize, what: &str) -> Result<(), Error> {
    if buf.remaining() < needed {
        return Err(Error::Decode(format!(
            "{what} needs {needed} bytes, {} left",
            buf.remaining()
        )));
    }
    Ok(())
}

impl Encoder for u8 {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        buf.put_u8(*self);
        Ok(())
    }
}

impl Decoder for u8 {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        ensure_remaining(buf, 1, "u8")?;
        Ok(buf.get_u8())
    }
}

impl Encoder for u32 {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        buf.put_u32(*self);
        Ok(())
    }
}

impl Decoder for u32 {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        ensure_remaining(buf, 4, "u32")?;
        Ok(buf.get_u32())
    }
}

impl Encoder for bool {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        (*self as u8).encode(buf)
    }
}

impl Decoder for bool {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        match u8::decode(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::Decode(format!("bool tag {} invalid", other))),
        }
    }
}

impl Encoder for String {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        let len = EncoderVecLen::try_from(self.len())
            .map_err(|_| Error::Encode(format!("string of {} bytes too long", self.len())))?;
        len.encode(buf)?;
        buf.put_slice(self.as_bytes());
        Ok(())
    }
}

impl Decoder for String {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let len = EncoderVecLen::decode(buf)? as usize;
        ensure_remaining(buf, len, "string")?;
        let mut bytes = vec![0; len];
        buf.copy_to_slice(&mut bytes);
        String::from_utf8(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

impl Encoder for Option<String> {
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        match self {
            None => false.encode(buf),
            Some(value) => {
                true.encode(buf)?;
                value.encode(buf)
            }
        }
    }
}

impl Decoder for Option<String> {
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        Ok(match bool::decode(buf)? {
            false => None,
            true => Some(String::decode(buf)?),
        })
    }
}

impl<T> Encoder for Vec<T>
where
    T: Encoder<Error = Error>,
{
    type Error = Error;

    fn encode<B>(&self, buf: &mut B) -> Result<(), Self::Error>
    where
        B: BufMut,
    {
        let len = EncoderVecLen::try_from(self.len())
            .map_err(|_| Error::Encode(format!("{} items too many", self.len())))?;
        len.encode(buf)?;
        for item in self {
            item.encode(buf)?;
        }
        Ok(())
    }
}

impl<T> Decoder for Vec<T>
where
    T: Decoder<Error = Error>,
{
    type Error = Error;

    fn decode<B>(buf: &mut B) -> Result<Self, Self::Error>
    where
        B: Buf,
    {
        let len = EncoderVecLen::decode(buf)? as usize;
        // every item takes at least one byte, bound the allocation by what is left
        let mut items = Vec::with_capacity(len.min(buf.remaining()));
        for _ in 0..len {
            items.push(T::decode(buf)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string() {
        let mut buffer = Vec::new();
        let str = String::from("Hello world");
        str.encode(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 4 + str.len());
        assert_eq!(String::decode(&mut buffer.as_slice()).unwrap(), str);
    }

    #[test]
    fn truncated() {
        let mut buffer = Vec::new();
        String::from("schema").encode(&mut buffer).unwrap();
        let truncated = &buffer[..buffer.len() - 1];
        assert!(matches!(
            String::decode(&mut &truncated[..]),
            Err(Error::Decode(_))
        ));
        assert!(matches!(u32::decode(&mut &[0u8, 1][..]), Err(Error::Decode(_))));
        assert!(matches!(bool::decode(&mut &[7u8][..]), Err(Error::Decode(_))));
    }
}
