// SPDX-License-Identifier: AGPL-3.0-or-later

//! Game-server identification (C3, spec §4.3): while no flow is selected,
//! inspect every payload for one of two fixed signatures and lock onto the
//! first matching 5-tuple direction.

const SIGNATURE_A: [u8; 6] = [0x00, 0x63, 0x33, 0x53, 0x42, 0x00];
const SIGNATURE_A_OFFSET: usize = 15;

const SIGNATURE_B_PREFIX: [u8; 10] = [0x00, 0x00, 0x00, 0x62, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01];
const SIGNATURE_B_MID: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x0a, 0x4e];
const SIGNATURE_B_LEN: usize = 0x62;

fn matches_signature_a(payload: &[u8]) -> bool {
    payload.len() >= 21
        && payload[4] == 0x00
        && payload.get(SIGNATURE_A_OFFSET..SIGNATURE_A_OFFSET + 6) == Some(&SIGNATURE_A[..])
}

fn matches_signature_b(payload: &[u8]) -> bool {
    payload.len() == SIGNATURE_B_LEN
        && payload.get(0..10) == Some(&SIGNATURE_B_PREFIX[..])
        && payload.get(14..20) == Some(&SIGNATURE_B_MID[..])
}

/// Whether a payload carries either server-identification signature.
pub fn is_server_signature(payload: &[u8]) -> bool {
    matches_signature_a(payload) || matches_signature_b(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_a_requires_exact_offset_and_marker_byte() {
        let mut payload = vec![0u8; 21];
        payload[4] = 0x00;
        payload[15..21].copy_from_slice(&SIGNATURE_A);
        assert!(is_server_signature(&payload));

        payload[4] = 0x01;
        assert!(!is_server_signature(&payload));
    }

    #[test]
    fn signature_a_rejects_short_payload() {
        let payload = vec![0u8; 20];
        assert!(!is_server_signature(&payload));
    }

    #[test]
    fn signature_b_requires_exact_length_and_markers() {
        let mut payload = vec![0u8; SIGNATURE_B_LEN];
        payload[0..10].copy_from_slice(&SIGNATURE_B_PREFIX);
        payload[14..20].copy_from_slice(&SIGNATURE_B_MID);
        assert!(is_server_signature(&payload));

        payload.push(0);
        assert!(!is_server_signature(&payload));
    }
}
