//! Unit-tagged scalar quantities.
//!
//! A `Quantity` keeps its magnitude normalized to the base unit of its
//! dimension (centimeters for distance, milliseconds for time) and only
//! remembers the unit it was expressed in for display. Converting therefore
//! never touches the stored magnitude, so repeated conversions cannot drift.
//!
//! Arithmetic and comparison across dimensions is a `UnitError`, never a
//! silent coercion.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::UnitError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Distance,
    Time,
}

impl Dimension {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Time => "time",
        }
    }

    pub const fn base_unit(self) -> Unit {
        match self {
            Self::Distance => Unit::Centimeter,
            Self::Time => Unit::Millisecond,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Millimeter,
    Centimeter,
    Inch,
    Foot,
    Millisecond,
    Second,
}

impl Unit {
    pub const fn dimension(self) -> Dimension {
        match self {
            Self::Millimeter | Self::Centimeter | Self::Inch | Self::Foot => Dimension::Distance,
            Self::Millisecond | Self::Second => Dimension::Time,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Inch => "in",
            Self::Foot => "ft",
            Self::Millisecond => "ms",
            Self::Second => "s",
        }
    }

    // Metric submultiples divide so that decimal mm inputs land exactly on cm.
    fn to_base(self, magnitude: f64) -> f64 {
        match self {
            Self::Millimeter => magnitude / 10.0,
            Self::Centimeter | Self::Millisecond => magnitude,
            Self::Inch => magnitude * 2.54,
            Self::Foot => magnitude * 30.48,
            Self::Second => magnitude * 1000.0,
        }
    }

    fn from_base(self, base: f64) -> f64 {
        match self {
            Self::Millimeter => base * 10.0,
            Self::Centimeter | Self::Millisecond => base,
            Self::Inch => base / 2.54,
            Self::Foot => base / 30.48,
            Self::Second => base / 1000.0,
        }
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "mm" | "millimeter" | "millimeters" | "millimetre" | "millimetres" => Self::Millimeter,
            "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => Self::Centimeter,
            "in" | "inch" | "inches" => Self::Inch,
            "ft" | "foot" | "feet" => Self::Foot,
            "ms" | "millisecond" | "milliseconds" => Self::Millisecond,
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Second,
            _ => return Err(UnitError::Unknown(s.trim().to_string())),
        };
        Ok(unit)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Which distance unit a bay prefers when presenting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub const fn distance_unit(self) -> Unit {
        match self {
            Self::Metric => Unit::Centimeter,
            Self::Imperial => Unit::Inch,
        }
    }

    /// Re-express a distance in this system's unit; other dimensions pass through.
    pub fn present(self, q: Quantity) -> Quantity {
        match q.dimension() {
            Dimension::Distance => q.in_unit(self.distance_unit()),
            Dimension::Time => q,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Quantity {
    base: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        Self {
            base: unit.to_base(magnitude),
            unit,
        }
    }

    pub fn with_unit_str(magnitude: f64, unit: &str) -> Result<Self, UnitError> {
        Ok(Self::new(magnitude, unit.parse()?))
    }

    pub fn centimeters(v: f64) -> Self {
        Self::new(v, Unit::Centimeter)
    }

    pub fn millimeters(v: f64) -> Self {
        Self::new(v, Unit::Millimeter)
    }

    pub fn inches(v: f64) -> Self {
        Self::new(v, Unit::Inch)
    }

    pub fn milliseconds(v: f64) -> Self {
        Self::new(v, Unit::Millisecond)
    }

    pub fn seconds(v: f64) -> Self {
        Self::new(v, Unit::Second)
    }

    /// Parse `"30 cm"`, `"30cm"`, `"-2.5 in"` or `"120 s"`.
    pub fn parse(s: &str) -> Result<Self, UnitError> {
        let text = s.trim();
        let split = text
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| UnitError::Parse(text.to_string()))?;
        let (num, unit) = text.split_at(split);
        let magnitude: f64 = num
            .trim()
            .parse()
            .map_err(|_| UnitError::Parse(text.to_string()))?;
        if !magnitude.is_finite() {
            return Err(UnitError::Parse(text.to_string()));
        }
        Self::with_unit_str(magnitude, unit)
    }

    /// Magnitude expressed in the quantity's own unit.
    pub fn magnitude(&self) -> f64 {
        self.unit.from_base(self.base)
    }

    /// Magnitude in the dimension's base unit (cm or ms).
    pub fn base_magnitude(&self) -> f64 {
        self.base
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    /// Re-express in `target`. Fails when `target` measures something else.
    pub fn convert(&self, target: Unit) -> Result<Self, UnitError> {
        if target.dimension() != self.dimension() {
            return Err(self.mismatch(target));
        }
        Ok(self.in_unit(target))
    }

    /// Magnitude in `target`, checked like `convert`.
    pub fn magnitude_in(&self, target: Unit) -> Result<f64, UnitError> {
        Ok(self.convert(target)?.magnitude())
    }

    // Caller guarantees matching dimensions.
    fn in_unit(&self, target: Unit) -> Self {
        Self {
            base: self.base,
            unit: target,
        }
    }

    fn mismatch(&self, other: Unit) -> UnitError {
        UnitError::Incompatible {
            from: self.unit.symbol(),
            from_dim: self.dimension().name(),
            to: other.symbol(),
            to_dim: other.dimension().name(),
        }
    }

    fn ensure_same(&self, other: &Self) -> Result<(), UnitError> {
        if self.dimension() == other.dimension() {
            Ok(())
        } else {
            Err(self.mismatch(other.unit))
        }
    }

    pub fn try_cmp(&self, other: &Self) -> Result<Ordering, UnitError> {
        self.ensure_same(other)?;
        Ok(self.base.total_cmp(&other.base))
    }

    pub fn try_eq(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? == Ordering::Equal)
    }

    pub fn try_ne(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? != Ordering::Equal)
    }

    pub fn try_lt(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }

    pub fn try_le(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? != Ordering::Greater)
    }

    pub fn try_gt(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? == Ordering::Greater)
    }

    pub fn try_ge(&self, other: &Self) -> Result<bool, UnitError> {
        Ok(self.try_cmp(other)? != Ordering::Less)
    }

    /// `self + other`, expressed in `self`'s unit.
    pub fn checked_add(&self, other: &Self) -> Result<Self, UnitError> {
        self.ensure_same(other)?;
        Ok(Self {
            base: self.base + other.base,
            unit: self.unit,
        })
    }

    /// `self - other`, expressed in `self`'s unit.
    pub fn checked_sub(&self, other: &Self) -> Result<Self, UnitError> {
        self.ensure_same(other)?;
        Ok(Self {
            base: self.base - other.base,
            unit: self.unit,
        })
    }

    /// Dimensionless `self / other`.
    pub fn ratio(&self, other: &Self) -> Result<f64, UnitError> {
        self.ensure_same(other)?;
        Ok(self.base / other.base)
    }

    pub fn abs(&self) -> Self {
        Self {
            base: self.base.abs(),
            unit: self.unit,
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            base: self.base * factor,
            unit: self.unit,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.base < 0.0
    }

    pub fn is_zero(&self) -> bool {
        self.base == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.base.is_finite()
    }

    /// Time quantities as a `Duration`; negative times clamp to zero.
    pub fn as_duration(&self) -> Result<Duration, UnitError> {
        if self.dimension() != Dimension::Time {
            return Err(self.mismatch(Unit::Millisecond));
        }
        Duration::try_from_secs_f64(self.base.max(0.0) / 1000.0)
            .map_err(|_| UnitError::OutOfRange(self.to_string()))
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.dimension() == other.dimension() && self.base == other.base
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.dimension() != other.dimension() {
            return None;
        }
        self.base.partial_cmp(&other.base)
    }
}

impl FromStr for Quantity {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*} {}", p, self.magnitude(), self.unit),
            None => write!(f, "{} {}", self.magnitude(), self.unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn parses_with_and_without_space() {
        let a = Quantity::parse("30 cm").unwrap();
        let b: Quantity = "300mm".parse().unwrap();
        assert_eq!(a, b);
        assert!(close(Quantity::parse("-2.5 in").unwrap().base_magnitude(), -6.35));
    }

    #[test]
    fn rejects_unknown_units_and_garbage() {
        assert_eq!(
            Quantity::parse("3 furlongs"),
            Err(UnitError::Unknown("furlongs".to_string()))
        );
        assert!(matches!(Quantity::parse("cm"), Err(UnitError::Parse(_))));
        assert!(matches!(Quantity::parse("12"), Err(UnitError::Parse(_))));
        assert!("parsec".parse::<Unit>().is_err());
    }

    #[test]
    fn convert_within_dimension_only() {
        let d = Quantity::inches(12.0);
        let ft = d.convert(Unit::Foot).unwrap();
        assert!(close(ft.magnitude(), 1.0));
        let err = d.convert(Unit::Second).unwrap_err();
        assert!(matches!(err, UnitError::Incompatible { from_dim: "distance", to_dim: "time", .. }));
    }

    #[test]
    fn chained_conversions_do_not_drift() {
        let start = Quantity::centimeters(123.456);
        let mut q = start;
        for _ in 0..1000 {
            q = q.convert(Unit::Inch).unwrap();
            q = q.convert(Unit::Millimeter).unwrap();
            q = q.convert(Unit::Foot).unwrap();
        }
        assert_eq!(q.base_magnitude(), start.base_magnitude());
    }

    #[test]
    fn comparisons_normalize_before_comparing() {
        let a = Quantity::millimeters(25.4);
        let b = Quantity::inches(1.0);
        assert!(close(a.base_magnitude(), b.base_magnitude()));
        assert!(Quantity::centimeters(10.0).try_lt(&Quantity::inches(4.0)).unwrap());
        assert!(Quantity::centimeters(10.0).try_ge(&Quantity::millimeters(100.0)).unwrap());
        assert!(Quantity::centimeters(10.0).try_le(&Quantity::millimeters(100.0)).unwrap());
        assert!(Quantity::new(1.0, Unit::Foot).try_gt(&Quantity::inches(11.0)).unwrap());
        assert!(Quantity::centimeters(1.0).try_ne(&Quantity::millimeters(1.0)).unwrap());
    }

    #[test]
    fn cross_dimension_comparison_fails() {
        let d = Quantity::centimeters(5.0);
        let t = Quantity::seconds(5.0);
        assert!(d.try_cmp(&t).is_err());
        assert!(d.try_eq(&t).is_err());
        assert!(d.checked_sub(&t).is_err());
        assert_eq!(d.partial_cmp(&t), None);
        assert_ne!(d, t);
    }

    #[test]
    fn arithmetic_keeps_left_unit() {
        let r = Quantity::centimeters(50.0)
            .checked_sub(&Quantity::millimeters(100.0))
            .unwrap();
        assert_eq!(r.unit(), Unit::Centimeter);
        assert!(close(r.magnitude(), 40.0));
        assert!(close(r.ratio(&Quantity::centimeters(100.0)).unwrap(), 0.4));
    }

    #[test]
    fn time_to_duration() {
        let t = Quantity::parse("1.5 s").unwrap();
        assert_eq!(t.as_duration().unwrap(), Duration::from_millis(1500));
        assert!(Quantity::centimeters(1.0).as_duration().is_err());
    }

    #[test]
    fn huge_times_are_an_error_not_a_panic() {
        let t = Quantity::parse("100000000000000000000 s").unwrap();
        assert!(matches!(t.as_duration(), Err(UnitError::OutOfRange(_))));
        let inf = Quantity::new(f64::INFINITY, Unit::Second);
        assert!(matches!(inf.as_duration(), Err(UnitError::OutOfRange(_))));
    }

    #[test]
    fn decimal_millimeters_land_exactly_on_centimeters() {
        for (mm, cm) in [(3.0, 0.3), (7.0, 0.7), (11.0, 1.1), (503.0, 50.3)] {
            let q = Quantity::millimeters(mm);
            assert_eq!(q.base_magnitude(), cm, "{mm} mm");
            assert!(q.try_le(&Quantity::centimeters(cm)).unwrap());
            assert!(q.try_ge(&Quantity::centimeters(cm)).unwrap());
            assert_eq!(q.magnitude(), mm);
        }
    }

    #[test]
    fn unit_system_presents_distances() {
        let q = UnitSystem::Imperial.present(Quantity::centimeters(2.54));
        assert_eq!(q.unit(), Unit::Inch);
        assert!(close(q.magnitude(), 1.0));
        let t = UnitSystem::Imperial.present(Quantity::seconds(1.0));
        assert_eq!(t.unit(), Unit::Second);
        assert_eq!(format!("{:.1}", Quantity::centimeters(40.0)), "40.0 cm");
    }
}
