use serde_json::Value;
use std::fmt;

#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct Set(u32);

pub const INVALID: Set = Set(0b0000000);
pub const ARRAY: Set = Set(0b0000001);
pub const BOOLEAN: Set = Set(0b0000010);
pub const FRACTIONAL: Set = Set(0b0000100);
pub const INTEGER: Set = Set(0b0001000);
pub const NULL: Set = Set(0b0010000);
pub const OBJECT: Set = Set(0b0100000);
pub const STRING: Set = Set(0b1000000);
// NUMBER is a composite of integers and numbers having a fractional part,
// matching the draft-07 "number" type which also admits integers.
pub const NUMBER: Set = Set(INTEGER.0 | FRACTIONAL.0);

impl std::ops::BitOr for Set {
    type Output = Self;

    #[inline]
    fn bitor(self, other: Self) -> Self::Output {
        Set(self.0 | other.0)
    }
}

impl std::ops::BitAnd for Set {
    type Output = Self;

    #[inline]
    fn bitand(self, other: Self) -> Self::Output {
        Set(self.0 & other.0)
    }
}

impl std::ops::Sub for Set {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self::Output {
        Set(self.0 & !other.0)
    }
}

/// Iterator that returns the draft-07 type names for all of the types in a `Set`.
/// You get this iterator by calling `Set::iter`.
pub struct Iter {
    types: Set,
    index: usize,
}

impl Iterator for Iter {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        let Iter {
            types,
            ref mut index,
        } = self;

        const ITER_ORDER: &[Set] = &[ARRAY, BOOLEAN, INTEGER, NULL, NUMBER, OBJECT, STRING];

        loop {
            let ty = ITER_ORDER.get(*index)?;
            *index += 1;

            // Is |ty| a subset of |types|?
            if *ty - *types == INVALID {
                match *ty {
                    ARRAY => return Some("array"),
                    BOOLEAN => return Some("boolean"),
                    INTEGER if !types.overlaps(FRACTIONAL) => return Some("integer"),
                    INTEGER => (),
                    NULL => return Some("null"),
                    NUMBER => return Some("number"),
                    OBJECT => return Some("object"),
                    STRING => return Some("string"),
                    _ => unreachable!(),
                }
            }
        }
    }
}

impl Set {
    /// Returns an iterator over the type names as static strings.
    ///
    /// ```
    /// use json::schema::types::*;
    ///
    /// let ty = ARRAY | OBJECT | NULL;
    ///
    /// let names = ty.iter().collect::<Vec<&'static str>>();
    /// assert_eq!(vec!["array", "null", "object"], names);
    ///
    /// let names = (INTEGER | STRING).iter().collect::<Vec<_>>();
    /// assert_eq!(vec!["integer", "string"], names);
    ///
    /// let names = (INTEGER | NUMBER).iter().collect::<Vec<_>>();
    /// assert_eq!(vec!["number"], names);
    /// ```
    pub fn iter(&self) -> Iter {
        Iter {
            types: *self,
            index: 0,
        }
    }

    /// Returns the `Set` value for a single draft-07 type name.
    ///
    /// ```
    /// use json::schema::types::*;
    /// assert_eq!(Some(NUMBER), Set::for_type_name("number"));
    /// assert_eq!(Some(INTEGER), Set::for_type_name("integer"));
    /// assert_eq!(Some(NULL), Set::for_type_name("null"));
    /// assert!(Set::for_type_name("fractional").is_none());
    /// ```
    pub fn for_type_name(str_val: &str) -> Option<Set> {
        match str_val {
            "array" => Some(ARRAY),
            "boolean" => Some(BOOLEAN),
            "integer" => Some(INTEGER),
            "null" => Some(NULL),
            "number" => Some(NUMBER),
            "object" => Some(OBJECT),
            "string" => Some(STRING),
            _ => None,
        }
    }

    /// Returns the `Set` of a `type` keyword value, which is either a single
    /// type name or an array of type names. Returns None if the value is
    /// neither, or names an unknown type.
    pub fn for_keyword(v: &Value) -> Option<Set> {
        match v {
            Value::String(name) => Set::for_type_name(name),
            Value::Array(names) => names.iter().try_fold(INVALID, |set, name| {
                name.as_str().and_then(Set::for_type_name).map(|ty| set | ty)
            }),
            _ => None,
        }
    }

    #[inline]
    pub fn overlaps(&self, other: Self) -> bool {
        *self & other != INVALID
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use itertools::Itertools;
        write!(f, "{:?}", self.iter().format(", "))
    }
}
