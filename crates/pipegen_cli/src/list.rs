//! `pipegen list`: print the operators that can be generated.

use pipegen_ops::operator_names;

use crate::GlobalArgs;

/// Runs the `pipegen list` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let width = operator_names()
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, description) in operator_names() {
        if global.quiet {
            println!("{name}");
        } else {
            println!("  {name:<width$}  {description}");
        }
    }
    Ok(0)
}
