use super::extensions::Extensions;
use super::value_type::ValueType;

/// What the compiler needs to know about the world a script runs in.
pub trait Context {
    /// May the script being compiled declare local variables?
    fn can_declare_locals(&self) -> bool;

    fn extensions(&self) -> Option<&Extensions>;

    /// Type of a global variable, `None` if there is no such global.
    fn global_type(&self, name: &str) -> Option<ValueType>;

    /// Type of the member variable `name` of the script attached to `id`,
    /// together with a flag telling whether `id` is a reference (`true`) or
    /// a global script (`false`).
    fn member_type(&self, name: &str, id: &str) -> Option<(ValueType, bool)>;

    /// Does `name` match an object id?
    fn is_id(&self, name: &str) -> bool;
}
