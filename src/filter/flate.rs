use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{PostScriptError, PostScriptResult};

pub fn decode_flate(stream: &[u8]) -> PostScriptResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(stream);
    let mut buffer = Vec::new();

    decoder.read_to_end(&mut buffer).map_err(|err| {
        anyhow::anyhow!(PostScriptError::IoError(
            format!("flate decode failed: {}", err).into()
        ))
    })?;

    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::decode_flate;

    use std::io::Write;

    use flate2::{write::ZlibEncoder, Compression};

    #[test]
    fn round_trip() {
        let plain = b"0 0 moveto 100 100 lineto stroke";

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(plain).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decode_flate(&compressed).unwrap(), plain);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_flate(b"not a zlib stream").is_err());
    }
}
