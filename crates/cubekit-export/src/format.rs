//! Number and map encoding shared by the model and animation documents
//!
//! Documents must be byte-identical between runs, so numbers are rounded
//! before they are written and maps keep their insertion order.

use cubekit_core::{round_to, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Decimals kept for geometry numbers
pub const NUMBER_DECIMALS: i32 = 3;

/// Decimals kept for animation times
pub const TIME_DECIMALS: i32 = 4;

/// A document number: rounded to [`NUMBER_DECIMALS`] and written as an
/// integer when it has no fractional part
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Num(pub f64);

impl Num {
    pub fn new(value: f64) -> Self {
        Num(round_to(value, NUMBER_DECIMALS))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Num {
    fn from(value: f64) -> Self {
        Num::new(value)
    }
}

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = round_to(self.0, NUMBER_DECIMALS);
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Num)
    }
}

/// Vector as three document numbers
pub fn num3(v: Vec3) -> [Num; 3] {
    [Num::new(v.x), Num::new(v.y), Num::new(v.z)]
}

pub fn vec3(v: [Num; 3]) -> Vec3 {
    Vec3::new(v[0].0, v[1].0, v[2].0)
}

/// Rotation triple; a component of exactly -180 is written as 180
pub fn rotation3(v: Vec3) -> [Num; 3] {
    let fix = |a: f64| {
        let a = round_to(a, NUMBER_DECIMALS);
        if a == -180.0 {
            180.0
        } else {
            a
        }
    };
    num3(v.map(fix))
}

/// Time key: seconds rounded to [`TIME_DECIMALS`], always with a decimal
/// point (`0.0`, `0.25`, `2.0`)
pub fn format_time(seconds: f64) -> String {
    let t = round_to(seconds, TIME_DECIMALS);
    if t.fract() == 0.0 {
        format!("{:.1}", t)
    } else {
        format!("{}", t)
    }
}

pub fn parse_time(key: &str) -> Option<f64> {
    key.trim().parse::<f64>().ok().filter(|t| t.is_finite())
}

/// String-keyed map that serializes in insertion order
pub type OrderedMap<V> = IndexMap<String, V>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_encoding() {
        assert_eq!(serde_json::to_string(&Num::new(8.0)).unwrap(), "8");
        assert_eq!(serde_json::to_string(&Num::new(0.12345)).unwrap(), "0.123");
        assert_eq!(serde_json::to_string(&Num::new(-0.0001)).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Num::new(-2.5)).unwrap(), "-2.5");
    }

    #[test]
    fn test_rotation_minus_180() {
        let r = rotation3(Vec3::new(-180.0, 90.0, -180.0004));
        assert_eq!(serde_json::to_string(&r).unwrap(), "[180,90,180]");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0.0");
        assert_eq!(format_time(0.25), "0.25");
        assert_eq!(format_time(2.0), "2.0");
        assert_eq!(format_time(1.0 / 3.0), "0.3333");
        assert_eq!(format_time(0.1 + 0.2), "0.3");
        assert_eq!(parse_time("0.3333"), Some(0.3333));
        assert_eq!(parse_time("later"), None);
    }

    #[test]
    fn test_ordered_map_keeps_order() {
        let mut map = OrderedMap::new();
        map.insert("10.0".to_string(), 1);
        map.insert("2.0".to_string(), 2);
        map.insert("10.0".to_string(), 3);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"10.0":3,"2.0":2}"#);

        let back: OrderedMap<i32> = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
        assert_eq!(back.keys().map(String::as_str).collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
