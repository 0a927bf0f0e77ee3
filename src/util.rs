/// Elements with a width measured in JVM slots (locals and operand stack entries)
///
/// `long` and `double` take up two slots, everything else takes up one.
pub trait Width {
    fn width(&self) -> usize;
}
