// 🧾 CNPJ Validator - national 14-digit organization tax id
//
// Layout: 12 base digits + 2 check digits (mod 11, weights restart at 9).
//   33.000.167/0001-01  →  base "330001670001", check "01"

/// Number of digits in a CNPJ
pub const CNPJ_LEN: usize = 14;

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Validate a CNPJ checksum.
///
/// Formatting punctuation (`.`, `/`, `-`, spaces) is ignored. Anything else that
/// is not a digit, a wrong length, or a run of identical digits is rejected.
/// Never panics.
pub fn is_valid_cnpj(input: &str) -> bool {
    let mut digits = Vec::with_capacity(CNPJ_LEN);
    for c in input.chars() {
        match c {
            '0'..='9' => digits.push(c as u32 - '0' as u32),
            '.' | '/' | '-' | ' ' => {}
            _ => return false,
        }
    }

    if digits.len() != CNPJ_LEN {
        return false;
    }

    // "00000000000000" passes the arithmetic, the others do not, all are invalid
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_WEIGHTS);
    let second = check_digit(&digits[..13], &SECOND_WEIGHTS);

    first == digits[12] && second == digits[13]
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}
