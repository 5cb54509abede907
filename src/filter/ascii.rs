use crate::error::{PostScriptError, PostScriptResult};

use crate::lex::hex_digit;

pub fn decode_ascii_hex(stream: &[u8]) -> PostScriptResult<Vec<u8>> {
    let mut buffer = Vec::with_capacity(stream.len() / 2);
    let mut nibble: Option<u8> = None;

    for &b in stream {
        if b == b'>' {
            break;
        }

        if b.is_ascii_whitespace() || b == b'\0' {
            continue;
        }

        let digit = hex_digit(b).ok_or_else(|| {
            anyhow::anyhow!(PostScriptError::IoError("invalid hex digit".into()))
        })?;

        match nibble.take() {
            Some(high) => buffer.push(high << 4 | digit),
            None => nibble = Some(digit),
        }
    }

    // an odd final nibble is padded with zero
    if let Some(high) = nibble {
        buffer.push(high << 4);
    }

    Ok(buffer)
}

pub fn decode_ascii_85(mut stream: &[u8]) -> PostScriptResult<Vec<u8>> {
    if stream.starts_with(b"<~") {
        stream = &stream[2..];
    }

    let mut buffer = Vec::with_capacity((stream.len() / 5) * 4);

    let mut group: u32 = 0;
    let mut count: u8 = 0;

    let mut iter = stream.iter().filter(|&&b| !b.is_ascii_whitespace());

    while let Some(&digit) = iter.next() {
        match digit {
            b'~' => {
                if iter.next() != Some(&b'>') {
                    anyhow::bail!(PostScriptError::IoError(
                        "malformed base-85 end-of-data marker".into()
                    ));
                }

                break;
            }
            // `z` encodes four zero bytes, and is only legal between groups
            b'z' => {
                if count != 0 {
                    anyhow::bail!(PostScriptError::IoError(
                        "'z' inside base-85 group".into()
                    ));
                }

                buffer.extend_from_slice(&[0, 0, 0, 0]);
            }
            b'!'..=b'u' => {
                group = group * 85 + u32::from(digit - b'!');
                count += 1;

                if count == 5 {
                    buffer.extend_from_slice(&group.to_be_bytes());
                    group = 0;
                    count = 0;
                }
            }
            _ => anyhow::bail!(PostScriptError::IoError("invalid base-85 digit".into())),
        }
    }

    // a partial final group of n digits encodes n - 1 bytes
    if count > 0 {
        if count == 1 {
            anyhow::bail!(PostScriptError::IoError(
                "single-digit final base-85 group".into()
            ));
        }

        let missing = 5 - count;

        for _ in 0..missing {
            group = group * 85 + 84;
        }

        let bytes = group.to_be_bytes();
        buffer.extend_from_slice(&bytes[..(count - 1) as usize]);
    }

    Ok(buffer)
}

#[cfg(test)]
mod test {
    use super::{decode_ascii_85, decode_ascii_hex};

    #[test]
    fn ascii_85() {
        assert_eq!(
            decode_ascii_85(b"<~9jqo^F*2M7/c~>").unwrap(),
            [77, 97, 110, 32, 115, 117, 114, 101, 46],
        );

        assert_eq!(
            String::from_utf8(
                decode_ascii_85(
                    br#"9jqo^BlbD-BleB1DJ+*+F(f,q/0JhKF<GL>Cj@.4Gp$d7F!,L7@<6@)/0JDEF<G%<+EV:2F!,
            O<DJ+*.@<*K0@<6L(Df-\0Ec5e;DffZ(EZee.Bl.9pF"AGXBPCsi+DGm>@3BB/F*&OCAfu2/AKY
            i(DIb:@FD,*)+C]U=@3BN#EcYf8ATD3s@q?d$AftVqCh[NqF<G:8+EV:.+Cf>-FD5W8ARlolDIa
            l(DId<j@<?3r@:F%a+D58'ATD4$Bl@l3De:,-DJs`8ARoFb/0JMK@qB4^F!,R<AKZ&-DfTqBG%G
            >uD.RTpAKYo'+CT/5+Cei#DII?(E,9)oF*2M7/c~>"#
                )
                .unwrap()
            )
            .unwrap(),
            r#"Man is distinguished, not only by his reason, but by this singular passion from other animals, which is a lust of the mind, that by a perseverance of delight in the continued and indefatigable generation of knowledge, exceeds the short vehemence of any carnal pleasure."#
        );
    }

    #[test]
    fn ascii_85_z_group() {
        assert_eq!(decode_ascii_85(b"z~>").unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn ascii_85_rejects_z_mid_group() {
        assert!(decode_ascii_85(b"9z~>").is_err());
    }

    #[test]
    fn ascii_hex() {
        assert_eq!(decode_ascii_hex(b"48 65 6c6C 6f>").unwrap(), b"Hello");

        // odd nibble is zero padded
        assert_eq!(decode_ascii_hex(b"7>").unwrap(), [0x70]);
    }

    #[test]
    fn ascii_hex_rejects_garbage() {
        assert!(decode_ascii_hex(b"4g>").is_err());
    }
}
