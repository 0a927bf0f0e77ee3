/// Knobs for method body generation
#[derive(Clone, Debug)]
pub struct Settings {
    /// Minimum ratio of cases to the key range for a switch to become a `tableswitch`
    ///
    /// A `tableswitch` has one jump offset for every value in the key range while a
    /// `lookupswitch` has a key and an offset for every case, so density 0.5 is roughly where the
    /// two are equally large.
    pub switch_density_threshold: f64,

    /// Record line numbers (when disabled, `line_number` does nothing)
    pub line_numbers: bool,

    /// Record local variables in the local variable table
    ///
    /// Locals are allocated either way, they just don't get debug entries.
    pub local_variable_table: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            switch_density_threshold: 0.5,
            line_numbers: true,
            local_variable_table: true,
        }
    }
}
