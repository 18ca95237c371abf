//! Lazy iteration over the certificates of a blob

use std::io::Cursor;

use rustls_pemfile::Item;

use super::blob::{ContainerFormat, EncodedBlob, is_pem, sniff};
use super::certificate::{ParsedCertificate, parse_certificate_der};
use super::der_probe::element_len;
use crate::error::{PkiError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

type CertDecoder = fn(&mut CertificateSequence<'_>) -> Option<Result<ParsedCertificate>>;

/// Decoders for each container format
const CERT_DECODERS: [(ContainerFormat, CertDecoder); 3] = [
    (ContainerFormat::Der, next_der),
    (ContainerFormat::Pem, next_pem),
    (ContainerFormat::Protected, next_protected),
];

/// Finite, restartable sequence of the certificates in a blob
///
/// Certificates are decoded one at a time as the iterator advances. After the
/// first error the sequence is fused; `restart` rewinds it to the beginning.
#[derive(Debug, Clone)]
pub struct CertificateSequence<'a> {
    bytes: &'a [u8],
    format: Option<ContainerFormat>,
    start: usize,
    offset: usize,
    done: bool,
}

impl<'a> CertificateSequence<'a> {
    /// Start a sequence over the certificates of `blob`
    #[must_use]
    pub fn new(blob: &'a EncodedBlob) -> Self {
        let bytes = blob.bytes();
        let format = blob.detect().ok();
        let start = if bytes.starts_with(UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Self {
            bytes,
            format,
            start,
            offset: start,
            done: false,
        }
    }

    /// Rewind to the first certificate
    pub fn restart(&mut self) {
        self.offset = self.start;
        self.done = false;
    }

    fn remaining(&self) -> &'a [u8] {
        self.bytes.get(self.offset..).unwrap_or_default()
    }

    fn fail(&mut self, err: PkiError) -> Option<Result<ParsedCertificate>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for CertificateSequence<'_> {
    type Item = Result<ParsedCertificate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(format) = self.format else {
            let err = sniff(self.bytes)
                .err()
                .unwrap_or_else(|| PkiError::malformed("Unrecognised certificate container"));
            return self.fail(err);
        };

        let decoder = CERT_DECODERS
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, decoder)| *decoder)?;
        decoder(self)
    }
}

fn next_der(seq: &mut CertificateSequence<'_>) -> Option<Result<ParsedCertificate>> {
    let rest = seq.remaining();
    if rest.is_empty() {
        seq.done = true;
        return None;
    }

    let Some(len) = element_len(rest) else {
        return seq.fail(PkiError::malformed(format!(
            "Truncated or trailing DER data at offset {}",
            seq.offset
        )));
    };

    seq.offset += len;
    match parse_certificate_der(&rest[..len]) {
        Ok(cert) => Some(Ok(cert)),
        Err(e) => seq.fail(e),
    }
}

fn next_pem(seq: &mut CertificateSequence<'_>) -> Option<Result<ParsedCertificate>> {
    loop {
        let mut cursor = Cursor::new(seq.remaining());
        let item = rustls_pemfile::read_one(&mut cursor);
        seq.offset += usize::try_from(cursor.position()).unwrap_or(usize::MAX);

        match item {
            Ok(Some(Item::X509Certificate(der))) => {
                return match parse_certificate_der(der.as_ref()) {
                    Ok(cert) => Some(Ok(cert)),
                    Err(e) => seq.fail(e),
                };
            }
            Ok(Some(_)) => {
                tracing::debug!("Skipping non-certificate PEM section");
            }
            Ok(None) => {
                seq.done = true;
                return None;
            }
            Err(e) => return seq.fail(PkiError::malformed(format!("Failed to parse PEM: {e}"))),
        }
    }
}

/// Armored protected blobs may still carry certificates after the key block
fn next_protected(seq: &mut CertificateSequence<'_>) -> Option<Result<ParsedCertificate>> {
    if is_pem(seq.bytes) {
        return next_pem(seq);
    }
    seq.fail(PkiError::malformed(
        "Password-protected container holds a private key, not certificates",
    ))
}

/// Parse every certificate of a blob
///
/// # Errors
///
/// Returns the first decoding error, or `MalformedEncoding` when the blob
/// contains no certificate at all.
pub fn parse_certificates(blob: &EncodedBlob) -> Result<Vec<ParsedCertificate>> {
    let certs = CertificateSequence::new(blob).collect::<Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(PkiError::malformed("No certificates found"));
    }
    tracing::debug!("Decoded {} certificate(s)", certs.len());
    Ok(certs)
}
