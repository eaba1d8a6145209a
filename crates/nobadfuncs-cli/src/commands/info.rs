//! Checker metadata commands.

/// Prints the checker type name.
pub fn print_type() {
    println!("{}", nobadfuncs_go::TYPE_NAME);
}

/// Prints the checker priority.
pub fn print_priority() {
    println!("{}", nobadfuncs_go::PRIORITY);
}
