use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io, str,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::proto::command::Command;

/// Line terminator used in both directions.
pub const TERMINATOR: &str = "\r\n";

/// Frames commands and reply lines for the IM3536.
///
/// Outgoing commands are written as ASCII text followed by CR LF.
/// Incoming bytes are split at LF; each line is returned with the
/// terminator and surrounding whitespace removed.
#[derive(Default)]
pub struct LineCodec;

impl LineCodec {
    fn convert_string(payload: impl AsRef<[u8]>) -> io::Result<String> {
        Ok(str::from_utf8(payload.as_ref())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
            .to_string())
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == b'\n') {
            Some(n) => {
                let line = src.split_to(n + 1);
                let text = Self::convert_string(&line)?;
                Ok(Some(text.trim().to_string()))
            }
            None => Ok(None),
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_fmt_guarded(dst, format_args!("{}{}", item, TERMINATOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::command::ParameterCode;

    fn encoded(cmd: Command) -> BytesMut {
        let mut buf = BytesMut::new();
        LineCodec::default().encode(cmd, &mut buf).unwrap();
        buf
    }

    #[test]
    fn encode_appends_terminator() {
        assert_eq!(&encoded(Command::Trigger)[..], b"*TRG\r\n");
        assert_eq!(&encoded(Command::GetMeasurement)[..], b"MEAS?\r\n");
    }

    #[test]
    fn parameters_in_one_line() {
        let buf = encoded(Command::SetParameters([
            ParameterCode::Z,
            ParameterCode::Phase,
            ParameterCode::Off,
            ParameterCode::Off,
        ]));
        assert_eq!(&buf[..], b":PAR1 Z;:PAR2 PHASE;:PAR3 OFF;:PAR4 OFF\r\n");
    }

    #[test]
    fn encoded_text_decodes_back() {
        let text = ":FREQ 1000";
        let mut buf = encoded(Command::Raw(text.to_string()));
        let decoded = LineCodec::default().decode(&mut buf).unwrap();
        assert_eq!(decoded.as_deref(), Some(text));
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut codec = LineCodec::default();
        let mut buf = BytesMut::from(&b"12.3,45"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b".6\r\nRS\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("12.3,45.6"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("RS"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn surrounding_whitespace_is_stripped() {
        let mut buf = BytesMut::from(&b"  1.000E+03 \r\n"[..]);
        let line = LineCodec::default().decode(&mut buf).unwrap();
        assert_eq!(line.as_deref(), Some("1.000E+03"));
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut buf = BytesMut::from(&[0xff, 0xfe, b'\r', b'\n'][..]);
        assert!(LineCodec::default().decode(&mut buf).is_err());
    }
}
