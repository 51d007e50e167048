//! NTLM negotiate, challenge and authenticate messages (NTLMv2 only).

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;

use crate::auth::AuthError;

type HmacMd5 = Hmac<Md5>;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_OEM_DOMAIN_SUPPLIED: u32 = 0x0000_1000;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
const NEGOTIATE_VERSION: u32 = 0x0200_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_KEY_EXCH: u32 = 0x4000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

const DEFAULT_FLAGS: u32 = NEGOTIATE_UNICODE
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_128
    | NEGOTIATE_56;

const NEGOTIATE_HEADER_LEN: usize = 32;
const AUTHENTICATE_HEADER_LEN: usize = 64;

const AV_EOL: u16 = 0;
const AV_TIMESTAMP: u16 = 7;

/// Seconds between 1601-01-01 and 1970-01-01, in 100ns ticks.
const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;

// ============================================================================
// Credentials
// ============================================================================

/// Split `DOMAIN\user` into its parts. Without a backslash the domain is empty.
pub(crate) fn split_domain(username: &str) -> (&str, &str) {
    username.split_once('\\').unwrap_or(("", username))
}

fn utf16le(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 16], AuthError> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|err| AuthError::Ntlm(format!("invalid hmac key: {err}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// `MD4(UTF-16LE(password))`.
pub(crate) fn ntowf_v1(password: &str) -> [u8; 16] {
    Md4::digest(utf16le(password)).into()
}

/// `HMAC_MD5(NTOWFv1, UTF-16LE(UPPER(user) + domain))`.
pub(crate) fn ntowf_v2(user: &str, password: &str, domain: &str) -> Result<[u8; 16], AuthError> {
    let identity = utf16le(&format!("{}{domain}", user.to_uppercase()));
    hmac_md5(&ntowf_v1(password), &[&identity])
}

/// Current time as a Windows FILETIME.
pub(crate) fn filetime_now() -> u64 {
    let ticks = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() / 100)
        .unwrap_or_default();
    u64::try_from(ticks).unwrap_or(u64::MAX) + FILETIME_UNIX_OFFSET
}

// ============================================================================
// Wire helpers
// ============================================================================

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Payload referenced by the `(len, max len, offset)` field at `at`.
fn read_field(data: &[u8], at: usize) -> Option<&[u8]> {
    let len = usize::from(read_u16(data, at)?);
    let offset = usize::try_from(read_u32(data, at + 4)?).ok()?;
    data.get(offset..offset.checked_add(len)?)
}

/// Write a `(len, max len, offset)` field.
fn write_field(buf: &mut Vec<u8>, len: usize, offset: usize) -> Result<(), AuthError> {
    let len = u16::try_from(len).map_err(|_| AuthError::Ntlm("field too long".to_string()))?;
    let offset = u32::try_from(offset).map_err(|_| AuthError::Ntlm("message too long".to_string()))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    Ok(())
}

fn write_header(buf: &mut Vec<u8>, message_type: u32) {
    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&message_type.to_le_bytes());
}

// ============================================================================
// Messages
// ============================================================================

/// Type 1 message opening the handshake.
pub(crate) fn negotiate(domain: &str) -> Result<Vec<u8>, AuthError> {
    let mut flags = DEFAULT_FLAGS;
    if !domain.is_empty() {
        flags |= NEGOTIATE_OEM_DOMAIN_SUPPLIED;
    }

    let mut buf = Vec::with_capacity(NEGOTIATE_HEADER_LEN + domain.len());
    write_header(&mut buf, 1);
    buf.extend_from_slice(&flags.to_le_bytes());
    write_field(&mut buf, domain.len(), NEGOTIATE_HEADER_LEN)?;
    write_field(&mut buf, 0, NEGOTIATE_HEADER_LEN + domain.len())?;
    buf.extend_from_slice(domain.as_bytes());
    Ok(buf)
}

/// Type 2 message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Challenge {
    pub(crate) flags: u32,
    pub(crate) server_challenge: [u8; 8],
    pub(crate) target_info: Vec<u8>,
}

impl Challenge {
    /// Parse a challenge message. Returns `None` for anything else.
    pub(crate) fn parse(data: &[u8]) -> Option<Self> {
        if data.get(..8)? != SIGNATURE || read_u32(data, 8)? != 2 {
            return None;
        }

        let flags = read_u32(data, 20)?;
        let server_challenge = data.get(24..32)?.try_into().ok()?;
        let target_info = if flags & NEGOTIATE_TARGET_INFO == 0 {
            Vec::new()
        } else {
            read_field(data, 40)?.to_vec()
        };

        Some(Self {
            flags,
            server_challenge,
            target_info,
        })
    }

    /// Server timestamp from the target information, if provided.
    pub(crate) fn timestamp(&self) -> Option<u64> {
        let mut at = 0;
        loop {
            let id = read_u16(&self.target_info, at)?;
            let len = usize::from(read_u16(&self.target_info, at + 2)?);
            if id == AV_EOL {
                return None;
            }
            if id == AV_TIMESTAMP {
                let value = self.target_info.get(at + 4..at + 4 + len)?;
                return Some(u64::from_le_bytes(value.try_into().ok()?));
            }
            at += 4 + len;
        }
    }
}

/// Responses computed from a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Responses {
    pub(crate) lm: Vec<u8>,
    pub(crate) nt: Vec<u8>,
}

/// Compute the `LMv2` and `NTLMv2` responses.
///
/// A challenge carrying `MsvAvTimestamp` gets an all-zero LM response.
pub(crate) fn responses(
    ntowf: &[u8; 16],
    challenge: &Challenge,
    client_challenge: [u8; 8],
    timestamp: u64,
) -> Result<Responses, AuthError> {
    let mut blob = Vec::with_capacity(32 + challenge.target_info.len());
    blob.extend_from_slice(&[0x01, 0x01, 0, 0, 0, 0, 0, 0]);
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(&client_challenge);
    blob.extend_from_slice(&[0; 4]);
    blob.extend_from_slice(&challenge.target_info);
    blob.extend_from_slice(&[0; 4]);

    let proof = hmac_md5(ntowf, &[&challenge.server_challenge, &blob])?;
    let mut nt = proof.to_vec();
    nt.extend_from_slice(&blob);

    let lm = if challenge.timestamp().is_some() {
        vec![0; 24]
    } else {
        let mut lm = hmac_md5(ntowf, &[&challenge.server_challenge, &client_challenge])?.to_vec();
        lm.extend_from_slice(&client_challenge);
        lm
    };

    Ok(Responses { lm, nt })
}

/// Type 3 message answering the challenge.
pub(crate) fn authenticate(
    challenge: &Challenge,
    domain: &str,
    user: &str,
    workstation: &str,
    responses: &Responses,
) -> Result<Vec<u8>, AuthError> {
    let domain = utf16le(domain);
    let user = utf16le(user);
    let workstation = utf16le(workstation);
    let flags = challenge.flags & !(NEGOTIATE_KEY_EXCH | NEGOTIATE_VERSION);

    let payload: [&[u8]; 5] = [&domain, &user, &workstation, &responses.lm, &responses.nt];
    let mut offsets = [0_usize; 5];
    let mut offset = AUTHENTICATE_HEADER_LEN;
    for (slot, part) in offsets.iter_mut().zip(payload) {
        *slot = offset;
        offset += part.len();
    }
    let [domain_at, user_at, workstation_at, lm_at, nt_at] = offsets;

    let mut buf = Vec::with_capacity(offset);
    write_header(&mut buf, 3);
    write_field(&mut buf, responses.lm.len(), lm_at)?;
    write_field(&mut buf, responses.nt.len(), nt_at)?;
    write_field(&mut buf, domain.len(), domain_at)?;
    write_field(&mut buf, user.len(), user_at)?;
    write_field(&mut buf, workstation.len(), workstation_at)?;
    write_field(&mut buf, 0, offset)?;
    buf.extend_from_slice(&flags.to_le_bytes());
    for part in payload {
        buf.extend_from_slice(part);
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn unhex(value: &str) -> Vec<u8> {
        (0..value.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&value[i..i + 2], 16).expect("hex digit"))
            .collect()
    }

    /// `NbDomainName` "Domain", `NbComputerName` "Server", end of list.
    const TARGET_INFO: &str =
        "02000c0044006f006d00610069006e0001000c0053006500720076006500720000000000";

    fn challenge_message(flags: u32, target_info: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_header(&mut buf, 2);
        write_field(&mut buf, 0, 56).expect("field");
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&unhex("0123456789abcdef"));
        buf.extend_from_slice(&[0; 8]);
        write_field(&mut buf, target_info.len(), 56).expect("field");
        buf.extend_from_slice(&[0; 8]);
        buf.extend_from_slice(target_info);
        buf
    }

    #[test]
    fn splits_domain() {
        assert_eq!(split_domain("CORP\\alice"), ("CORP", "alice"));
        assert_eq!(split_domain("alice"), ("", "alice"));
    }

    #[test]
    fn ntowf_known_vectors() {
        assert_eq!(hex(&ntowf_v1("Password")), "a4f49c406510bdcab6824ee7c30fd852");
        let v2 = ntowf_v2("User", "Password", "Domain").expect("hmac");
        assert_eq!(hex(&v2), "0c868a403bfd7a93a3001ef22ef02e3f");
    }

    #[test]
    fn ntlmv2_known_responses() {
        let ntowf = ntowf_v2("User", "Password", "Domain").expect("hmac");
        let challenge =
            Challenge::parse(&challenge_message(DEFAULT_FLAGS, &unhex(TARGET_INFO))).expect("challenge");

        let responses = responses(&ntowf, &challenge, [0xaa; 8], 0).expect("responses");

        assert_eq!(
            hex(&responses.lm),
            "86c35097ac9cec102554764a57cccc19aaaaaaaaaaaaaaaa"
        );
        assert_eq!(hex(&responses.nt[..16]), "68cd0ab851e51c96aabc927bebef6a1c");
        assert_eq!(responses.nt.len(), 16 + 28 + unhex(TARGET_INFO).len() + 4);
    }

    #[test]
    fn negotiate_layout() {
        let message = negotiate("CORP").expect("message");

        assert_eq!(&message[..8], b"NTLMSSP\0");
        assert_eq!(read_u32(&message, 8), Some(1));
        let flags = read_u32(&message, 12).expect("flags");
        assert_eq!(flags & NEGOTIATE_UNICODE, NEGOTIATE_UNICODE);
        assert_eq!(flags & NEGOTIATE_OEM_DOMAIN_SUPPLIED, NEGOTIATE_OEM_DOMAIN_SUPPLIED);
        assert_eq!(read_field(&message, 16), Some(&b"CORP"[..]));
        assert_eq!(message.len(), 36);
    }

    #[test]
    fn parses_challenge() {
        let data = challenge_message(DEFAULT_FLAGS, &unhex(TARGET_INFO));
        let challenge = Challenge::parse(&data).expect("challenge");

        assert_eq!(challenge.flags, DEFAULT_FLAGS);
        assert_eq!(hex(&challenge.server_challenge), "0123456789abcdef");
        assert_eq!(challenge.target_info, unhex(TARGET_INFO));
        assert_eq!(challenge.timestamp(), None);
    }

    #[test]
    fn reads_server_timestamp() {
        let mut target_info = vec![0x07, 0x00, 0x08, 0x00];
        target_info.extend_from_slice(&42_u64.to_le_bytes());
        target_info.extend_from_slice(&[0; 4]);

        let challenge =
            Challenge::parse(&challenge_message(DEFAULT_FLAGS, &target_info)).expect("challenge");
        assert_eq!(challenge.timestamp(), Some(42));
    }

    #[test]
    fn server_timestamp_zeroes_lm_response() {
        let mut target_info = vec![0x07, 0x00, 0x08, 0x00];
        target_info.extend_from_slice(&42_u64.to_le_bytes());
        target_info.extend_from_slice(&[0; 4]);
        let challenge =
            Challenge::parse(&challenge_message(DEFAULT_FLAGS, &target_info)).expect("challenge");
        let ntowf = ntowf_v2("User", "Password", "Domain").expect("hmac");

        let responses = responses(&ntowf, &challenge, [0xaa; 8], 42).expect("responses");

        assert_eq!(responses.lm, vec![0; 24]);
        assert_eq!(responses.nt.len(), 16 + 28 + target_info.len() + 4);
    }

    #[test]
    fn rejects_other_messages() {
        assert_eq!(Challenge::parse(b"garbage"), None);
        assert_eq!(Challenge::parse(&negotiate("").expect("message")), None);

        let truncated = challenge_message(DEFAULT_FLAGS, &unhex(TARGET_INFO));
        assert_eq!(Challenge::parse(&truncated[..50]), None);
    }

    #[test]
    fn authenticate_layout() {
        let challenge = Challenge::parse(&challenge_message(
            DEFAULT_FLAGS | NEGOTIATE_KEY_EXCH,
            &unhex(TARGET_INFO),
        ))
        .expect("challenge");
        let ntowf = ntowf_v2("alice", "secret", "CORP").expect("hmac");
        let responses = responses(&ntowf, &challenge, [1; 8], filetime_now()).expect("responses");

        let message =
            authenticate(&challenge, "CORP", "alice", "", &responses).expect("message");

        assert_eq!(&message[..8], b"NTLMSSP\0");
        assert_eq!(read_u32(&message, 8), Some(3));
        assert_eq!(read_field(&message, 12), Some(responses.lm.as_slice()));
        assert_eq!(read_field(&message, 20), Some(responses.nt.as_slice()));
        assert_eq!(read_field(&message, 28), Some(utf16le("CORP").as_slice()));
        assert_eq!(read_field(&message, 36), Some(utf16le("alice").as_slice()));
        assert_eq!(read_field(&message, 44), Some(&[][..]));
        assert_eq!(read_field(&message, 52), Some(&[][..]));
        assert_eq!(read_u32(&message, 60), Some(DEFAULT_FLAGS));
        assert_eq!(read_u32(&message, 32), Some(64));
    }
}
