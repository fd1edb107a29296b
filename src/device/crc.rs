//! Sensirion CRC-8 (polynomial 0x31, init 0xFF, no reflection, no final xor).

const POLYNOMIAL: u8 = 0x31;
const INIT: u8 = 0xFF;

pub(crate) fn crc8(data: &[u8]) -> u8 {
    let mut crc = INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasheet_vector() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_empty_is_init() {
        assert_eq!(crc8(&[]), INIT);
    }
}
