//! A fixed scale decimal type for vote arithmetic. Unlike jurisdictions where the number of
//! digits is fixed by legislation, the scale here is chosen at run time by the contest
//! configuration, so it is a field of the value rather than a const generic parameter.
//! All rounding is towards zero.

use std::ops::{AddAssign, SubAssign, Sub, Add};
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use num::{BigUint, ToPrimitive};
use serde::{Serialize, Serializer, Deserialize, Deserializer};

/// The smallest scale the configuration may select.
pub const MIN_SCALE : u8 = 1;
/// The largest scale the configuration may select.
pub const MAX_SCALE : u8 = 20;

/// Stores a non-negative fixed scale decimal number as an integer mantissa scaled by 10^scale.
///
/// Two values from the same tabulation always carry the same scale; a zero is compatible
/// with any scale so that sums can start from nothing. Equality, ordering and hashing
/// are on the represented value, so the scale-agnostic zeros behave.
#[derive(Copy, Clone)]
pub struct FixedDecimal {
    scaled_value : u128,
    scale : u8,
}

impl PartialEq for FixedDecimal {
    fn eq(&self, other: &Self) -> bool {
        debug_assert!(self.compatible_scale(*other));
        self.scaled_value==other.scaled_value
    }
}
impl Eq for FixedDecimal {}
impl std::hash::Hash for FixedDecimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.scaled_value.hash(state); }
}

fn pow10(scale:u8) -> u128 {
    let mut res : u128 = 1;
    let mut togo = scale;
    while togo > 0 {
        res*=10;
        togo-=1;
    }
    res
}

impl FixedDecimal {
    pub fn zero(scale:u8) -> Self { FixedDecimal{scaled_value:0,scale} }
    pub fn is_zero(&self) -> bool { self.scaled_value==0 }
    /// the multiplicative identity at the given scale, the initial fractional transfer value of a ballot.
    pub fn one(scale:u8) -> Self { FixedDecimal{scaled_value:pow10(scale),scale} }

    /// return scale()*the value this number represents.
    pub fn get_scaled_value(&self) -> u128 { self.scaled_value }
    pub fn scale(&self) -> u8 { self.scale }
    pub fn from_scaled_value(scaled_value:u128,scale:u8) -> Self { FixedDecimal{scaled_value,scale} }

    pub fn from_usize(v:usize,scale:u8) -> Self {
        let v = v as u128;
        if v>u128::MAX/pow10(scale) { panic!("Can only represent integers up to {}, and {} was too big.",u128::MAX/pow10(scale),v)}
        FixedDecimal{scaled_value:v*pow10(scale),scale}
    }

    /// `a/b` rounded towards zero at the given scale. Everything that turns one vote
    /// quantity into another goes through this or [FixedDecimal::multiply] so that a run
    /// is reproducible bit for bit. A zero divisor yields zero; callers guard against it.
    pub fn divide(a:Self,b:Self,scale:u8) -> Self {
        debug_assert!(a.compatible_scale(b));
        if b.is_zero() { return FixedDecimal::zero(scale); }
        let numerator = BigUint::from(a.scaled_value)*BigUint::from(pow10(scale));
        let quotient = numerator/BigUint::from(b.scaled_value);
        FixedDecimal{scaled_value:quotient.to_u128().expect("fixed decimal quotient overflowed 128 bits"),scale}
    }

    /// `a*b` rounded towards zero at the given scale.
    pub fn multiply(a:Self,b:Self,scale:u8) -> Self {
        debug_assert!(a.compatible_scale(b));
        let product = BigUint::from(a.scaled_value)*BigUint::from(b.scaled_value);
        let descaled = product/BigUint::from(pow10(scale));
        FixedDecimal{scaled_value:descaled.to_u128().expect("fixed decimal product overflowed 128 bits"),scale}
    }

    /// parse a decimal string such as `45.25`, truncating fractional digits beyond the scale.
    pub fn parse_with_scale(buf:&str,scale:u8) -> Result<Self,<u128 as std::str::FromStr>::Err> {
        if let Some((int_part,frac_part)) = buf.split_once('.') {
            let int_part : u128 = int_part.parse()?;
            let frac_part = if frac_part.len()>scale as usize { &frac_part[..scale as usize] } else { frac_part };
            let mut frac_part_u128 : u128 = frac_part.parse()?;
            for _ in frac_part.len()..scale as usize { frac_part_u128*=10; }
            Ok(FixedDecimal{ scaled_value: frac_part_u128+pow10(scale)*int_part, scale })
        } else {
            let int_part : u128 = buf.parse()?;
            Ok(FixedDecimal{ scaled_value: pow10(scale)*int_part, scale })
        }
    }

    /// the full width string, all scale digits present. Used for serialization, where the
    /// digit count must round trip the scale, unlike [Display] which trims.
    pub fn to_full_string(&self) -> String {
        if self.scale==0 { self.scaled_value.to_string() }
        else {
            let int_portion = self.scaled_value/pow10(self.scale);
            let frac_portion = self.scaled_value%pow10(self.scale);
            format!("{}.{:02$}",int_portion,frac_portion,self.scale as usize)
        }
    }

    fn compatible_scale(&self,other:Self) -> bool {
        self.scale==other.scale || self.is_zero() || other.is_zero()
    }
    fn join_scale(&self,other:Self) -> u8 {
        if self.is_zero() { other.scale.max(self.scale) } else { self.scale }
    }
}

impl AddAssign for FixedDecimal {
    fn add_assign(&mut self, rhs: Self) {
        debug_assert!(self.compatible_scale(rhs));
        self.scale=self.join_scale(rhs);
        self.scaled_value+=rhs.scaled_value;
    }
}
impl SubAssign for FixedDecimal {
    fn sub_assign(&mut self, rhs: Self) {
        debug_assert!(self.compatible_scale(rhs));
        self.scale=self.join_scale(rhs);
        self.scaled_value-=rhs.scaled_value;
    }
}

impl Sub for FixedDecimal {
    type Output = Self;
    fn sub(mut self, rhs: Self) -> Self::Output { self-=rhs; self }
}

impl Add for FixedDecimal {
    type Output = Self;
    fn add(mut self, rhs: Self) -> Self::Output { self+=rhs; self }
}

impl Sum for FixedDecimal {
    fn sum<I: Iterator<Item=Self>>(iter: I) -> Self {
        let mut res = FixedDecimal::zero(0);
        for v in iter {
            res+=v
        }
        res
    }
}

impl <'a> Sum<&'a Self> for FixedDecimal {
    fn sum<I: Iterator<Item=&'a Self>>(iter: I) -> Self {
        let mut res = FixedDecimal::zero(0);
        for v in iter {
            res+=*v
        }
        res
    }
}

impl PartialOrd for FixedDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}
impl Ord for FixedDecimal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        debug_assert!(self.compatible_scale(*other));
        self.scaled_value.cmp(&other.scaled_value)
    }
}

impl Display for FixedDecimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let int_portion = self.scaled_value/pow10(self.scale);
        let frac_portion = self.scaled_value%pow10(self.scale);
        if frac_portion==0 { write!(f,"{}",int_portion)}
        else {
            let decimal_digits : String = format!("{:01$}",frac_portion,self.scale as usize);
            write!(f,"{}.{}",int_portion,decimal_digits.trim_end_matches('0'))
        }
    }
}

impl std::fmt::Debug for FixedDecimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f,"{}",self) }
}

impl Serialize for FixedDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: Serializer {
        serializer.serialize_str(&self.to_full_string())
    }
}

impl <'de> Deserialize<'de> for FixedDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        let buf = String::deserialize(deserializer)?;
        let scale = buf.split_once('.').map(|(_,frac)|frac.len() as u8).unwrap_or(0);
        FixedDecimal::parse_with_scale(&buf,scale).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixed_decimal::FixedDecimal;

    #[test]
    fn test_four_digit_decimal() {
        assert!(FixedDecimal::zero(4).is_zero());

        let mut d_42 = FixedDecimal::from_usize(42,4);
        assert_eq!("42",format!("{}",d_42));
        d_42+=FixedDecimal::zero(4);
        assert_eq!("42",format!("{}",d_42));
        let d_1 = FixedDecimal::from_usize(1,4);
        assert_eq!("43",format!("{}",d_42+d_1));
        assert_eq!("41",format!("{}",d_42-d_1));
        let sum : FixedDecimal = [d_42,d_1].iter().sum();
        assert_eq!("43",format!("{}",sum));
        let parsed = FixedDecimal::parse_with_scale("45.25",4).unwrap();
        assert_eq!("45.25",format!("{}",parsed));
        assert_eq!("45.2500",parsed.to_full_string());
    }

    #[test]
    fn test_rounding_towards_zero() {
        let hundred = FixedDecimal::from_usize(100,4);
        let three = FixedDecimal::from_usize(3,4);
        let third = FixedDecimal::divide(hundred,three,4);
        assert_eq!("33.3333",format!("{}",third));
        // a surplus fraction: 36.6667 votes of surplus over 70 votes
        let seventy = FixedDecimal::from_usize(70,4);
        let surplus = seventy-third;
        assert_eq!("36.6667",format!("{}",surplus));
        let fraction = FixedDecimal::divide(surplus,seventy,4);
        assert_eq!("0.5238",format!("{}",fraction));
        let reduced = FixedDecimal::multiply(FixedDecimal::one(4),fraction,4);
        assert_eq!("0.5238",format!("{}",reduced));
        let reduced_again = FixedDecimal::multiply(reduced,fraction,4);
        assert_eq!("0.2743",format!("{}",reduced_again)); // 0.5238^2 = 0.27436644, truncated
    }

    #[test]
    fn test_extreme_scale_does_not_overflow() {
        let million = FixedDecimal::from_usize(1_000_000,20);
        let seven = FixedDecimal::from_usize(7,20);
        let ratio = FixedDecimal::divide(million,seven,20);
        assert_eq!("142857.14285714285714285714",format!("{}",ratio));
        let back = FixedDecimal::multiply(ratio,seven,20);
        assert!(back<=million);
    }

    #[test]
    fn test_serde_round_trip() {
        let parsed = FixedDecimal::parse_with_scale("5.0200",4).unwrap();
        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!("\"5.0200\"",json);
        let back : FixedDecimal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed,back);
        assert_eq!(4,back.scale());
    }
}
