//! Shallow ASN.1 inspection used to classify DER payloads before decoding

use der::{Decode, Encode, Header, Reader, SliceReader, Tag};

/// Top-level structure recognised from the first few DER elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DerShape {
    /// `SEQUENCE { tbs SEQUENCE, algorithm SEQUENCE, signature BIT STRING }`
    Certificate,
    /// `SEQUENCE { algorithm SEQUENCE { OID, .. }, data OCTET STRING }`
    EncryptedPkcs8,
    /// `SEQUENCE { version INTEGER, algorithm SEQUENCE, key OCTET STRING, .. }`
    Pkcs8,
    /// `SEQUENCE { version INTEGER, modulus INTEGER, .. }`
    Pkcs1Rsa,
    /// `SEQUENCE { version INTEGER, key OCTET STRING, .. }`
    Sec1Ec,
}

/// Read one TLV and return its tag and value bytes
pub(crate) fn read_tlv<'a>(reader: &mut SliceReader<'a>) -> Option<(Tag, &'a [u8])> {
    let header = Header::decode(reader).ok()?;
    let value = reader.read_slice(header.length).ok()?;
    Some((header.tag, value))
}

fn first_tag(bytes: &[u8]) -> Option<Tag> {
    let mut reader = SliceReader::new(bytes).ok()?;
    read_tlv(&mut reader).map(|(tag, _)| tag)
}

/// Classify the first DER element of `bytes`
pub(crate) fn classify(bytes: &[u8]) -> Option<DerShape> {
    let mut outer = SliceReader::new(bytes).ok()?;
    let (tag, body) = read_tlv(&mut outer)?;
    if tag != Tag::Sequence {
        return None;
    }

    let mut inner = SliceReader::new(body).ok()?;
    let (t0, v0) = read_tlv(&mut inner)?;
    let (t1, _) = read_tlv(&mut inner)?;
    let t2 = read_tlv(&mut inner).map(|(t, _)| t);

    match (t0, t1, t2) {
        (Tag::Sequence, Tag::Sequence, Some(Tag::BitString)) => Some(DerShape::Certificate),
        (Tag::Sequence, Tag::OctetString, _) if first_tag(v0) == Some(Tag::ObjectIdentifier) => {
            Some(DerShape::EncryptedPkcs8)
        }
        (Tag::Integer, Tag::Sequence, Some(Tag::OctetString)) => Some(DerShape::Pkcs8),
        (Tag::Integer, Tag::Integer, _) => Some(DerShape::Pkcs1Rsa),
        (Tag::Integer, Tag::OctetString, _) => Some(DerShape::Sec1Ec),
        _ => None,
    }
}

/// Raw encoding (header included) of the first child of the outer SEQUENCE
pub(crate) fn first_child(bytes: &[u8]) -> Option<&[u8]> {
    let mut outer = SliceReader::new(bytes).ok()?;
    let (tag, body) = read_tlv(&mut outer)?;
    if tag != Tag::Sequence {
        return None;
    }
    let len = element_len(body)?;
    body.get(..len)
}

/// Total encoded length of the first DER element, if it fits in `bytes`
pub(crate) fn element_len(bytes: &[u8]) -> Option<usize> {
    let mut reader = SliceReader::new(bytes).ok()?;
    let header = Header::decode(&mut reader).ok()?;
    let total = (header.encoded_len().ok()? + header.length).ok()?;
    let total: usize = total.try_into().ok()?;
    (total <= bytes.len()).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_pkcs1_shape() {
        // SEQUENCE { INTEGER 0, INTEGER 5 }
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x05];
        assert_eq!(classify(&bytes), Some(DerShape::Pkcs1Rsa));
    }

    #[test]
    fn test_classify_sec1_shape() {
        // SEQUENCE { INTEGER 1, OCTET STRING 0xAA }
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x01, 0x04, 0x01, 0xAA];
        assert_eq!(classify(&bytes), Some(DerShape::Sec1Ec));
    }

    #[test]
    fn test_classify_encrypted_shape() {
        // SEQUENCE { SEQUENCE { OID 1.2 }, OCTET STRING 0xAA }
        let bytes = [
            0x30, 0x09, 0x30, 0x03, 0x06, 0x01, 0x2A, 0x04, 0x02, 0xAA, 0xBB,
        ];
        assert_eq!(classify(&bytes), Some(DerShape::EncryptedPkcs8));
    }

    #[test]
    fn test_classify_rejects_non_sequence() {
        assert_eq!(classify(&[0x02, 0x01, 0x00]), None);
        assert_eq!(classify(b"not der"), None);
        assert_eq!(classify(&[]), None);
    }

    #[test]
    fn test_first_child_keeps_header() {
        let bytes = [0x30, 0x06, 0x02, 0x01, 0x00, 0x02, 0x01, 0x05];
        assert_eq!(first_child(&bytes), Some(&[0x02, 0x01, 0x00][..]));
    }

    #[test]
    fn test_element_len() {
        let bytes = [0x30, 0x03, 0x02, 0x01, 0x00, 0xFF];
        assert_eq!(element_len(&bytes), Some(5));
        // Declared length runs past the buffer
        assert_eq!(element_len(&[0x30, 0x10, 0x02]), None);
    }
}
