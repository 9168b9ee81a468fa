//! Local variable table of one script.

use std::io::{self, Write};

use super::value_type::ValueType;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
    shorts: Vec<String>,
    longs: Vec<String>,
    floats: Vec<String>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of one kind in declaration order.
    pub fn get(&self, ty: ValueType) -> &[String] {
        match ty {
            ValueType::Short => &self.shorts,
            ValueType::Long => &self.longs,
            ValueType::Float => &self.floats,
        }
    }

    fn get_mut(&mut self, ty: ValueType) -> &mut Vec<String> {
        match ty {
            ValueType::Short => &mut self.shorts,
            ValueType::Long => &mut self.longs,
            ValueType::Float => &mut self.floats,
        }
    }

    /// Index of `name` among the locals of type `ty`.
    pub fn search_index(&self, ty: ValueType, name: &str) -> Option<usize> {
        self.get(ty).iter().position(|local| local == name)
    }

    pub fn search(&self, ty: ValueType, name: &str) -> bool {
        self.search_index(ty, name).is_some()
    }

    /// Type of `name`. Shorts shadow longs, longs shadow floats.
    pub fn get_type(&self, name: &str) -> Option<ValueType> {
        [ValueType::Short, ValueType::Long, ValueType::Float]
            .into_iter()
            .find(|ty| self.search(*ty, name))
    }

    pub fn get_index(&self, name: &str) -> Option<usize> {
        let ty = self.get_type(name)?;
        self.search_index(ty, name)
    }

    /// Adds a local. The name is stored lower case; re-declaration is not
    /// checked here.
    pub fn declare(&mut self, ty: ValueType, name: &str) {
        self.get_mut(ty).push(name.to_lowercase());
    }

    /// Writes `"<shorts> <longs> <floats>\n"` followed by every name, each
    /// followed by a single space.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(
            out,
            "{} {} {}",
            self.shorts.len(),
            self.longs.len(),
            self.floats.len()
        )?;
        for name in self.shorts.iter().chain(&self.longs).chain(&self.floats) {
            write!(out, "{name} ")?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.shorts.clear();
        self.longs.clear();
        self.floats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_precedence() {
        let mut locals = Locals::new();
        locals.declare(ValueType::Float, "x");
        locals.declare(ValueType::Long, "y");
        locals.declare(ValueType::Long, "x");
        locals.declare(ValueType::Short, "Z");

        let test_cases = vec![
            ("x", Some(ValueType::Long), Some(1)),
            ("y", Some(ValueType::Long), Some(0)),
            ("z", Some(ValueType::Short), Some(0)),
            ("w", None, None),
        ];

        for (name, ty, index) in test_cases {
            assert_eq!(locals.get_type(name), ty, "{name}");
            assert_eq!(locals.get_index(name), index, "{name}");
        }
    }

    #[test]
    fn test_write() {
        let mut locals = Locals::new();
        locals.declare(ValueType::Short, "a");
        locals.declare(ValueType::Float, "c");
        locals.declare(ValueType::Short, "b");

        let mut out = Vec::new();
        locals.write(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "2 0 1\na b c ");

        locals.clear();
        assert_eq!(locals.get_type("a"), None);
    }
}
