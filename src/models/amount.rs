use std::error::Error as StdError;
use std::fmt;
use std::io::prelude::*;
use std::str::FromStr;

use diesel::deserialize::{self, FromSql};
use diesel::pg::data_types::PgNumeric;
use diesel::pg::Pg;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Numeric;
use num::{BigUint, ToPrimitive};
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, Serializer};

/// Number of fractional decimal digits kept by `Amount`.
pub const AMOUNT_SCALE: u32 = 10;
const UNITS_IN_ONE: u128 = 10_000_000_000;
// 10^20 units, the first value with 11 integer digits
const LEDGER_LIMIT: u128 = 100_000_000_000_000_000_000;

/// Non negative fixed point decimal with 10 fractional digits, i.e. units of 1e-10.
/// Backed by `u128` so it holds up to 38 significant digits.
///
/// It's (de)serialized from / to decimal strings (json numbers are also accepted).
/// Parsing rounds half up to 10 fractional digits, the way a NUMERIC(20, 10) column does
/// on insert. Negative values and NaN are errors, both when parsing and when reading
/// postgres NUMERIC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromSqlRow, AsExpression, Default, PartialOrd, Ord, Hash)]
#[sql_type = "Numeric"]
pub struct Amount(u128);

impl Amount {
    /// Amount from raw units of 1e-10
    pub fn new(units: u128) -> Self {
        Amount(units)
    }

    pub fn units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Ledger values are NUMERIC(20, 10), i.e. at most 10 integer digits
    pub fn fits_ledger(&self) -> bool {
        self.0 < LEDGER_LIMIT
    }

    ///Make addition, return None on overflow
    pub fn checked_add(&self, other: Amount) -> Option<Self> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Make subtraction, return None on overflow
    pub fn checked_sub(&self, other: Amount) -> Option<Self> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiplies by a rate (also a fixed point decimal), rounding half up to 10 fractional digits.
    /// Returns None on overflow.
    pub fn mul_rate(&self, rate: Amount) -> Option<Self> {
        let units = BigUint::from(UNITS_IN_ONE);
        let half = BigUint::from(UNITS_IN_ONE / 2);
        let product = BigUint::from(self.0) * BigUint::from(rate.0);
        ((product + half) / units).to_u128().map(Amount)
    }

    /// Rounds half up to `places` fractional digits, `places` above 10 is a no-op.
    pub fn round_half_up(&self, places: u32) -> Option<Self> {
        if places >= AMOUNT_SCALE {
            return Some(*self);
        }
        let quantum = 10u128.pow(AMOUNT_SCALE - places);
        let rem = self.0 % quantum;
        let floor = self.0 - rem;
        if rem * 2 >= quantum {
            floor.checked_add(quantum).map(Amount)
        } else {
            Some(Amount(floor))
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let int = self.0 / UNITS_IN_ONE;
        let frac = self.0 % UNITS_IN_ONE;
        if frac == 0 {
            write!(f, "{}", int)
        } else {
            let frac = format!("{:010}", frac);
            write!(f, "{}.{}", int, frac.trim_right_matches('0'))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Fail)]
#[fail(display = "invalid amount `{}`: {}", value, reason)]
pub struct ParseAmountError {
    pub value: String,
    pub reason: &'static str,
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts plain decimals (`12`, `0.0001`, `.5`) and exponent notation (`1.5e-4`).
    /// Digits past the 10th fractional one are rounded half up.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &'static str| ParseAmountError {
            value: s.to_string(),
            reason,
        };
        let trimmed = s.trim();
        let trimmed = if trimmed.starts_with('+') { &trimmed[1..] } else { trimmed };
        if trimmed.starts_with('-') {
            return Err(err("negative amounts are not supported"));
        }
        let (mantissa, exp) = match trimmed.find(|c| c == 'e' || c == 'E') {
            Some(pos) => {
                let exp = trimmed[pos + 1..].parse::<i32>().map_err(|_| err("bad exponent"))?;
                (&trimmed[..pos], exp)
            }
            None => (trimmed, 0),
        };
        let (int_part, frac_part) = match mantissa.find('.') {
            Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err("no digits"));
        }
        let digits: Vec<u8> = int_part.bytes().chain(frac_part.bytes()).collect();
        if digits.iter().any(|b| !b.is_ascii_digit()) {
            return Err(err("unexpected symbol"));
        }
        // power of ten to apply to `digits` to get units of 1e-10
        let shift = AMOUNT_SCALE as i64 - (frac_part.len() as i64 - i64::from(exp));
        let (significant, round_up) = if shift >= 0 {
            (&digits[..], false)
        } else {
            let cut = (-shift) as usize;
            if cut > digits.len() {
                (&digits[..0], false)
            } else {
                let keep = digits.len() - cut;
                (&digits[..keep], digits[keep] >= b'5')
            }
        };
        let mut value = significant.iter().try_fold(0u128, |acc, b| {
            acc.checked_mul(10).and_then(|acc| acc.checked_add(u128::from(b - b'0')))
        });
        if round_up {
            value = value.and_then(|value| value.checked_add(1));
        }
        if shift > 0 {
            value = value.and_then(|value| {
                if value == 0 {
                    Some(0)
                } else if shift > 38 {
                    None
                } else {
                    value.checked_mul(10u128.pow(shift as u32))
                }
            });
        }
        value.map(Amount).ok_or_else(|| err("overflow"))
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non negative decimal as a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        self.visit_u128(u128::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
        v.checked_mul(UNITS_IN_ONE).map(Amount).ok_or_else(|| E::custom("amount overflow"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        if v < 0 {
            return Err(E::custom("negative amounts are not supported"));
        }
        self.visit_u64(v as u64)
    }

    // serde_json hands over numbers that survive a round trip through f64 as floats,
    // their shortest representation is the original text
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom("amount is not a finite number"));
        }
        v.to_string().parse().map_err(E::custom)
    }

    // serde_json with `arbitrary_precision` hands numbers over as a single entry map
    // holding the number's original text
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Amount, A::Error> {
        let _key: Option<String> = map.next_key()?;
        let value: String = map.next_value()?;
        value.parse().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

impl<'a> From<&'a Amount> for PgNumeric {
    fn from(amount: &'a Amount) -> Self {
        amount_to_pg_decimal(amount.0)
    }
}

impl From<Amount> for PgNumeric {
    fn from(amount: Amount) -> Self {
        (&amount).into()
    }
}

impl ToSql<Numeric, Pg> for Amount {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        let numeric = PgNumeric::from(self);
        ToSql::<Numeric, Pg>::to_sql(&numeric, out)
    }
}

impl FromSql<Numeric, Pg> for Amount {
    fn from_sql(numeric: Option<&[u8]>) -> deserialize::Result<Self> {
        let numeric = PgNumeric::from_sql(numeric)?;
        pg_decimal_to_amount(&numeric).map(Amount)
    }
}

// Iterator over the digits of a big uint in base 10k.
// The digits will be returned in little endian order.
struct ToBase10000(Option<u128>);

impl Iterator for ToBase10000 {
    type Item = i16;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.take().map(|v| {
            let rem = v % 10_000u128;
            let div = v / 10_000u128;
            if div != 0 {
                self.0 = Some(div);
            }
            rem as i16
        })
    }
}

// Digit `i` of a numeric is worth 10000^(weight - i), so in units of 1e-10
// it's multiplied by 10^(4 * (weight - i) + 10).
fn pg_decimal_to_amount(numeric: &PgNumeric) -> deserialize::Result<u128> {
    let (weight, digits) = match *numeric {
        PgNumeric::Positive { weight, ref digits, .. } => (weight, digits),
        PgNumeric::Negative { ref digits, .. } if digits.iter().all(|d| *d == 0) => return Ok(0),
        PgNumeric::Negative { .. } => return Err(Box::from(format!("Negative is not supported in Amount: {:#?}", numeric))),
        PgNumeric::NaN => return Err(Box::from(format!("NaN is not supported in Amount: {:#?}", numeric))),
    };

    let overflow = || Box::from(format!("Overflow in PgNumeric to Amount: {:#?}", numeric)) as Box<StdError + Send + Sync>;
    let mut result = 0u128;
    for (i, digit) in digits.iter().enumerate() {
        if *digit == 0 {
            continue;
        }
        let digit = *digit as u128;
        let exp = 4 * (i32::from(weight) - i as i32) + AMOUNT_SCALE as i32;
        let value = if exp >= 0 {
            if exp > 38 {
                return Err(overflow());
            }
            digit.checked_mul(10u128.pow(exp as u32)).ok_or_else(overflow)?
        } else {
            let divisor = if exp < -4 { 100_000u128 } else { 10u128.pow((-exp) as u32) };
            if digit % divisor != 0 {
                return Err(Box::from(format!(
                    "More than {} fractional digits are not supported in Amount: {:#?}",
                    AMOUNT_SCALE, numeric
                )));
            }
            digit / divisor
        };
        result = result.checked_add(value).ok_or_else(overflow)?;
    }
    Ok(result)
}

fn amount_to_pg_decimal(value: u128) -> PgNumeric {
    let int = value / UNITS_IN_ONE;
    // 10 fractional digits padded to 12, i.e. 3 base 10k digits
    let frac = (value % UNITS_IN_ONE) * 100;

    let mut digits: Vec<i16> = if int == 0 {
        vec![]
    } else {
        let mut int_digits = ToBase10000(Some(int)).collect::<Vec<_>>();
        int_digits.reverse();
        int_digits
    };
    let mut weight = digits.len() as i16 - 1;
    digits.push((frac / 100_000_000) as i16);
    digits.push(((frac / 10_000) % 10_000) as i16);
    digits.push((frac % 10_000) as i16);

    let leading_zeros = digits.iter().take_while(|digit| **digit == 0).count();
    if leading_zeros == digits.len() {
        return PgNumeric::Positive {
            digits: vec![],
            scale: AMOUNT_SCALE as u16,
            weight: 0,
        };
    }
    weight -= leading_zeros as i16;
    let mut digits: Vec<i16> = digits.into_iter().skip(leading_zeros).collect();
    while digits.last() == Some(&0) {
        digits.pop();
    }

    PgNumeric::Positive {
        digits,
        scale: AMOUNT_SCALE as u16,
        weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json;

    // This thing converts binary postgres representation to PgNumeric
    // psql -U postgres -d <your_db_name> -c 'COPY ( SELECT CAST (0.0001 AS NUMERIC) ) TO STDOUT WITH ( FORMAT BINARY );' |   od --skip-bytes=25 -h --endian big
    // bytes are: digits_count, weight, sign, scale, digit1, digit2, ...
    struct PgBinary(&'static str);

    impl Into<PgNumeric> for PgBinary {
        fn into(self) -> PgNumeric {
            let bytes: Vec<i64> = self.0.split(" ").map(|x| i64::from_str_radix(x, 16).unwrap()).collect();
            let weight = bytes[1] as i16;
            let sign = bytes[2];
            let scale = bytes[3] as u16;
            let digits: Vec<i16> = bytes[4..].iter().map(|x| *x as i16).collect();

            match sign {
                0 => PgNumeric::Positive { weight, scale, digits },
                0x4000 => PgNumeric::Negative { weight, scale, digits },
                _ => PgNumeric::NaN,
            }
        }
    }

    fn amount(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_pg_numeric_happy_conversions() {
        let cases = [
            ("0000 0000 0000 0000", 0u128),
            ("0001 0000 0000 0000 0001", 10_000_000_000u128),
            ("0001 ffff 0000 0004 0001", 1_000_000u128),
            ("0002 0000 0000 0001 0001 1388", 15_000_000_000u128),
            ("0001 fffe 0000 0008 0001", 100u128),
            ("0001 fffd 0000 000a 0064", 1u128),
            ("0003 0001 0000 0002 0001 0000 0c1c", 100_003_100_000_000u128),
        ];
        for &(binary, units) in cases.iter() {
            let pg_num: PgNumeric = PgBinary(binary).into();
            assert_eq!(units, pg_decimal_to_amount(&pg_num).unwrap(), "PgDecimal -> Amount: {}", binary);
        }
    }

    #[test]
    fn test_pg_numeric_round_trip() {
        let cases = ["0", "1", "0.0001", "0.0000000001", "1.5", "10000.00001", "123456789012345678.9876543211"];
        for case in cases.iter() {
            let value = amount(case);
            let pg_num: PgNumeric = value.into();
            assert_eq!(pg_decimal_to_amount(&pg_num).unwrap(), value.units(), "Case: {}", case);
        }
    }

    #[test]
    fn test_pg_numeric_error_conversions() {
        let error_cases = [
            // Nan
            "0000 0000 C000 0000",
            // -1
            "0001 0000 4000 0000 0001",
            // 0.00000000001
            "0001 fffd 0000 000b 000a",
            // 10^40
            "0001 000a 0000 0000 0001",
        ];
        for case in error_cases.iter() {
            let pg_num: PgNumeric = PgBinary(case).into();
            assert!(pg_decimal_to_amount(&pg_num).is_err(), "Case: {}", case);
        }
    }

    #[test]
    fn test_parse_and_display() {
        let cases = [
            ("0", 0u128, "0"),
            ("0.0001", 1_000_000u128, "0.0001"),
            (".5", 5_000_000_000u128, "0.5"),
            ("12.3400", 123_400_000_000u128, "12.34"),
            ("1.5e-4", 1_500_000u128, "0.00015"),
            ("2E3", 20_000_000_000_000u128, "2000"),
            ("0.00000000010", 1u128, "0.0000000001"),
            // rounded to 10 fractional digits
            ("0.00000000005", 1u128, "0.0000000001"),
            ("0.000000000049", 0u128, "0"),
            ("1.000000000000000001", 10_000_000_000u128, "1"),
            ("0.123456789012345678", 1_234_567_890u128, "0.123456789"),
            ("1e-20", 0u128, "0"),
        ];
        for &(input, units, printed) in cases.iter() {
            let parsed = amount(input);
            assert_eq!(parsed, Amount::new(units), "Case: {}", input);
            assert_eq!(parsed.to_string(), printed, "Case: {}", input);
        }
    }

    #[test]
    fn test_parse_errors() {
        let error_cases = ["", "-1", "abc", "1.2.3", "-0.00000000001", "1e", "340282366920938463463374607431768211455"];
        for case in error_cases.iter() {
            assert!(case.parse::<Amount>().is_err(), "Case: {}", case);
        }
    }

    #[test]
    fn test_serde_conversions() {
        let parsed: Amount = serde_json::from_str("\"0.0001\"").unwrap();
        assert_eq!(parsed, amount("0.0001"));
        let parsed: Amount = serde_json::from_str("0.0001").unwrap();
        assert_eq!(parsed, amount("0.0001"));
        let parsed: Amount = serde_json::from_str("6500").unwrap();
        assert_eq!(parsed, amount("6500"));
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert_eq!(serde_json::from_str::<Amount>("\"0.00000000001\"").unwrap(), amount("0"));
        assert_eq!(serde_json::to_string(&amount("1.25")).unwrap(), "\"1.25\"");
    }

    #[test]
    fn test_numbers_inside_json_values() {
        // numbers go through `Value` when a payload is inspected before being decoded
        let value: serde_json::Value = serde_json::from_str(r#"{"a": 1.25, "b": 0.0001, "c": 7, "d": 0.000000000000000001}"#).unwrap();
        let parsed: Amount = serde_json::from_value(value["a"].clone()).unwrap();
        assert_eq!(parsed, amount("1.25"));
        let parsed: Amount = serde_json::from_value(value["b"].clone()).unwrap();
        assert_eq!(parsed, amount("0.0001"));
        let parsed: Amount = serde_json::from_value(value["c"].clone()).unwrap();
        assert_eq!(parsed, amount("7"));
        let parsed: Amount = serde_json::from_value(value["d"].clone()).unwrap();
        assert_eq!(parsed, amount("0"));
    }

    #[test]
    fn test_fits_ledger() {
        assert!(amount("9999999999.9999999999").fits_ledger());
        assert!(!amount("10000000000").fits_ledger());
        assert!(!amount("1e25").fits_ledger());
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(Amount(5).checked_add(Amount(8)), Some(Amount(13)));
        assert_eq!(Amount(u128::max_value()).checked_add(Amount(1)), None);
        assert_eq!(Amount(13).checked_sub(Amount(11)), Some(Amount(2)));
        assert_eq!(Amount(8).checked_sub(Amount(11)), None);
    }

    #[test]
    fn test_mul_rate_and_rounding() {
        assert_eq!(amount("0.5").mul_rate(amount("6500.25")), Some(amount("3250.125")));
        assert_eq!(amount("0.0000000001").mul_rate(amount("0.5")), Some(amount("0.0000000001")));
        assert_eq!(amount("0.0000000001").mul_rate(amount("0.4")), Some(amount("0")));
        assert_eq!(Amount(u128::max_value()).mul_rate(amount("2")), None);
        assert_eq!(amount("3250.1245").round_half_up(3), Some(amount("3250.125")));
        assert_eq!(amount("3250.1244").round_half_up(3), Some(amount("3250.124")));
        assert_eq!(amount("0.0005").round_half_up(3), Some(amount("0.001")));
        assert_eq!(amount("1.25").round_half_up(10), Some(amount("1.25")));
    }
}
